//! Host-built exceptions and inspection of caught exception values

use rquickjs::function::Constructor;
use rquickjs::{Coerced, Ctx, Value};

/// Wrap `text` into an engine value suitable for throwing back to script code
///
/// The text is boxed into a `String` object, so the result is an object whose
/// string value is `text`.
pub fn make_exception<'js>(ctx: &Ctx<'js>, text: &str) -> rquickjs::Result<Value<'js>> {
    let string_ctor: Constructor = ctx.globals().get("String")?;
    string_ctor.construct((text,))
}

/// Build an exception with [`make_exception`] and make it the pending exception
///
/// Always returns `rquickjs::Error::Exception`, ready to be returned from a native callback.
pub fn throw_exception(ctx: &Ctx<'_>, text: &str) -> rquickjs::Error {
    match make_exception(ctx, text) {
        Ok(value) => ctx.throw(value),
        Err(e) => e,
    }
}

/// String conversion of a caught exception, same as `String(exn)` in script
pub fn exception_text(ctx: &Ctx<'_>, exception: &Value<'_>) -> String {
    match exception.get::<Coerced<String>>() {
        Ok(text) => text.0,
        Err(_) => {
            // toString itself threw; drop that secondary exception
            let _ = ctx.catch();
            "<unprintable exception>".to_string()
        }
    }
}

/// Line number the exception was raised at within `file`, if the engine recorded one
///
/// Looks at a numeric `line` property, then `lineNumber`, then the first frame of
/// `stack` located in `file`. Frames from other scripts or native helpers are skipped.
pub fn exception_line(ctx: &Ctx<'_>, exception: &Value<'_>, file: &str) -> Option<i32> {
    let object = exception.as_object()?;

    for key in ["line", "lineNumber"] {
        match object.get::<_, Value>(key) {
            Ok(value) => {
                if let Some(line) = value.as_number() {
                    return Some(line as i32);
                }
            }
            // Throwing getter; leave nothing pending behind
            Err(_) => {
                let _ = ctx.catch();
            }
        }
    }

    let stack = match object.get::<_, Option<String>>("stack") {
        Ok(stack) => stack?,
        Err(_) => {
            let _ = ctx.catch();
            return None;
        }
    };
    stack.lines()
        .filter_map(parse_stack_line)
        .find(|(frame_file, _)| *frame_file == file)
        .map(|(_, line)| line)
}

/// Parse one backtrace frame into `(file, line)`
///
/// Accepts `    at fn (file:line:col)` and `    at file:line:col`.
pub fn parse_stack_line(frame: &str) -> Option<(&str, i32)> {
    let frame = frame.trim().strip_prefix("at ")?;
    let location = match (frame.rfind('('), frame.strip_suffix(')')) {
        (Some(open), Some(inner)) => &inner[open + 1..],
        _ => frame,
    };

    let mut parts = location.rsplitn(3, ':');
    let _column = parts.next()?;
    let line = parts.next()?.parse().ok()?;
    let file = parts.next()?;
    Some((file, line))
}
