//! Compiling global scripts to QuickJS bytecode and running it back
//!
//! rquickjs only exposes bytecode serialization for modules, while cached
//! evaluation must keep plain global-script semantics (completion value, `var`
//! bindings on the global object). These helpers go through the raw engine API
//! for that one path.

use std::ffi::CString;

use rquickjs::{Ctx, Error, Result, Value, qjs};

fn eval_flags(strict: bool) -> i32 {
    let mut flags = qjs::JS_EVAL_TYPE_GLOBAL | qjs::JS_EVAL_FLAG_COMPILE_ONLY;
    if strict {
        flags |= qjs::JS_EVAL_FLAG_STRICT;
    }
    flags as i32
}

/// Compile `script` without running it and serialize the resulting function
///
/// On a syntax error the exception is left pending on `ctx` and `Error::Exception` is returned.
pub fn compile(ctx: &Ctx<'_>, script: &str, file_name: &str, strict: bool) -> Result<Vec<u8>> {
    let source = CString::new(script)?;
    let file_name = CString::new(file_name)?;
    let raw_ctx = ctx.as_raw().as_ptr();

    // SAFETY: `raw_ctx` is alive for the borrow of `ctx`; both C strings are NUL-terminated
    // and outlive the calls. Every owned JSValue and buffer is released before returning.
    unsafe {
        let function = qjs::JS_Eval(
            raw_ctx,
            source.as_ptr(),
            script.len() as _,
            file_name.as_ptr(),
            eval_flags(strict),
        );
        if qjs::JS_IsException(function) {
            return Err(Error::Exception);
        }

        let mut len: qjs::size_t = 0;
        let buffer = qjs::JS_WriteObject(
            raw_ctx,
            &mut len,
            function,
            qjs::JS_WRITE_OBJ_BYTECODE as i32,
        );
        qjs::JS_FreeValue(raw_ctx, function);
        if buffer.is_null() {
            return Err(Error::Exception);
        }

        let bytes = std::slice::from_raw_parts(buffer, len as usize).to_vec();
        qjs::js_free(raw_ctx, buffer.cast());
        Ok(bytes)
    }
}

/// Deserialize bytecode produced by [`compile`] into a function value
///
/// Fails with `Error::Exception` (pending on `ctx`) when the bytes are not valid bytecode.
pub fn load<'js>(ctx: &Ctx<'js>, bytes: &[u8]) -> Result<Value<'js>> {
    let raw_ctx = ctx.as_raw().as_ptr();

    // SAFETY: the buffer is only read for `bytes.len()` bytes; the returned value is owned
    // and handed to `Value`, which releases it on drop.
    unsafe {
        let function = qjs::JS_ReadObject(
            raw_ctx,
            bytes.as_ptr(),
            bytes.len() as _,
            qjs::JS_READ_OBJ_BYTECODE as i32,
        );
        if qjs::JS_IsException(function) {
            return Err(Error::Exception);
        }
        Ok(Value::from_raw(ctx.clone(), function))
    }
}

/// Run a function value returned by [`load`] as global code and return its completion value
pub fn run<'js>(ctx: &Ctx<'js>, function: Value<'js>) -> Result<Value<'js>> {
    let raw_ctx = ctx.as_raw().as_ptr();

    // SAFETY: JS_EvalFunction consumes one reference, so it gets its own duplicate and
    // `function` keeps the reference it owns.
    unsafe {
        let function = qjs::JS_DupValue(raw_ctx, function.as_raw());
        let result = qjs::JS_EvalFunction(raw_ctx, function);
        if qjs::JS_IsException(result) {
            return Err(Error::Exception);
        }
        Ok(Value::from_raw(ctx.clone(), result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rquickjs::{Context, Runtime};

    #[test]
    fn test_compiled_script_keeps_completion_value() {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();

        context.with(|ctx| {
            let bytes = compile(&ctx, "var answer = 40; answer + 2", "answer.js", false).unwrap();
            assert!(!bytes.is_empty());

            let function = load(&ctx, &bytes).unwrap();
            let result = run(&ctx, function).unwrap();
            assert_eq!(result.as_int(), Some(42));

            let global: i32 = ctx.globals().get("answer").unwrap();
            assert_eq!(global, 40);
        });
    }

    #[test]
    fn test_compile_reports_syntax_error() {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();

        context.with(|ctx| {
            let result = compile(&ctx, "function (", "broken.js", false);
            assert!(matches!(result, Err(Error::Exception)));
            assert!(ctx.catch().is_error());
        });
    }

    #[test]
    fn test_load_rejects_garbage() {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();

        context.with(|ctx| {
            let result = load(&ctx, b"definitely not bytecode");
            assert!(result.is_err());
            let _ = ctx.catch();
        });
    }
}
