//! Script evaluation with exception translation and optional bytecode caching

use std::path::Path;

use rquickjs::context::EvalOptions;
use rquickjs::{Ctx, Value};
use tracing::{debug, error, warn};

use crate::bytecode;
use crate::cache::{BytecodeCache, CacheKey};
use crate::error::{ExecutionError, Result, SourceLocation, UNKNOWN_FILE};
use crate::exception::{exception_line, exception_text};

/// Options controlling how a script is evaluated
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluateOptions {
    pub strict: bool,
}

/// Evaluate `script` as global code in `ctx`
///
/// `source` is the file name reported in backtraces and error locations. When both
/// `source` and `cache_path` are given, bytecode is loaded from (or written to) the
/// cache file instead of parsing the text; the observable result is the same.
///
/// A thrown exception becomes [`ExecutionError::Script`], displayed as
/// `<message> (<file>:<line>)`.
pub fn evaluate_script<'js>(
    ctx: &Ctx<'js>,
    script: &str,
    source: Option<&str>,
    cache_path: Option<&Path>,
) -> Result<Value<'js>> {
    evaluate_script_with_options(ctx, script, source, cache_path, EvaluateOptions::default())
}

pub fn evaluate_script_with_options<'js>(
    ctx: &Ctx<'js>,
    script: &str,
    source: Option<&str>,
    cache_path: Option<&Path>,
    options: EvaluateOptions,
) -> Result<Value<'js>> {
    let result = match (source, cache_path) {
        (Some(source), Some(cache_path)) => {
            evaluate_cached(ctx, script, source, &BytecodeCache::new(cache_path), options)
        }
        _ => evaluate_plain(ctx, script, source, options),
    };

    result.map_err(|e| translate_error(ctx, e, source))
}

fn evaluate_plain<'js>(
    ctx: &Ctx<'js>,
    script: &str,
    source: Option<&str>,
    options: EvaluateOptions,
) -> rquickjs::Result<Value<'js>> {
    let mut eval_options = EvalOptions::default();
    eval_options.strict = options.strict;
    eval_options.filename = Some(source.unwrap_or(UNKNOWN_FILE).to_string());
    ctx.eval_with_options(script, eval_options)
}

fn evaluate_cached<'js>(
    ctx: &Ctx<'js>,
    script: &str,
    source: &str,
    cache: &BytecodeCache,
    options: EvaluateOptions,
) -> rquickjs::Result<Value<'js>> {
    let key = CacheKey::new(source, script, options.strict);

    let cached = match cache.load(&key) {
        Ok(cached) => cached,
        Err(e) => {
            warn!("Failed to read bytecode cache '{}': {}", cache.path().display(), e);
            None
        }
    };

    if let Some(bytes) = cached {
        match bytecode::load(ctx, &bytes) {
            Ok(function) => {
                debug!("Evaluating '{}' from bytecode cache '{}'", source, cache.path().display());
                return bytecode::run(ctx, function);
            }
            Err(_) => {
                let _ = ctx.catch();
                debug!("Discarding unreadable bytecode cache '{}'", cache.path().display());
            }
        }
    }

    // Syntax errors surface here exactly as plain evaluation would report them
    let bytes = bytecode::compile(ctx, script, source, options.strict)?;
    if let Err(e) = cache.store(&key, &bytes) {
        warn!("Failed to write bytecode cache '{}': {}", cache.path().display(), e);
    } else {
        debug!("Stored bytecode for '{}' in '{}'", source, cache.path().display());
    }

    let function = bytecode::load(ctx, &bytes)?;
    bytecode::run(ctx, function)
}

fn translate_error(ctx: &Ctx<'_>, error: rquickjs::Error, source: Option<&str>) -> ExecutionError {
    if !error.is_exception() {
        return ExecutionError::Engine(error);
    }

    let exception = ctx.catch();
    let message = exception_text(ctx, &exception);
    error!("Got JS Exception: {}", message);

    ExecutionError::Script {
        message,
        location: SourceLocation::new(source, exception_line(ctx, &exception, source.unwrap_or(UNKNOWN_FILE))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rquickjs::{Context, Runtime};
    use tempfile::tempdir;

    fn with_context<F: FnOnce(Ctx<'_>)>(f: F) {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        context.with(f);
    }

    #[test]
    fn test_valid_script_returns_result() {
        with_context(|ctx| {
            let value = evaluate_script(&ctx, "[1, 2, 3].map(x => x * 2).join(',')", Some("main.js"), None).unwrap();
            assert_eq!(value.get::<String>().unwrap(), "2,4,6");

            let value = evaluate_script(&ctx, "var unused = 1;", None, None).unwrap();
            assert!(value.is_undefined());
        });
    }

    #[test]
    fn test_thrown_exception_with_line_property() {
        with_context(|ctx| {
            let script = "throw { toString: function() { return 'Bridge failure'; }, line: 7 };";
            let err = evaluate_script(&ctx, script, Some("index.android.bundle"), None).unwrap_err();

            assert_eq!(err.to_string(), "Bridge failure (index.android.bundle:7)");
        });
    }

    #[test]
    fn test_thrown_error_reports_stack_line() {
        with_context(|ctx| {
            let script = "var a = 1;\nvar b = 2;\nthrow new Error('boom');";
            let err = evaluate_script(&ctx, script, Some("main.js"), None).unwrap_err();

            assert_eq!(err.script_message(), Some("Error: boom"));
            assert_eq!(err.to_string(), "Error: boom (main.js:3)");
        });
    }

    #[test]
    fn test_json_parse_failure_reports_script_line() {
        with_context(|ctx| {
            let err = evaluate_script(&ctx, "\n\n\nJSON.parse('{')", Some("main.js"), None).unwrap_err();

            assert!(err.script_message().unwrap().starts_with("SyntaxError"));
            assert_eq!(err.location().and_then(|l| l.line), Some(4));
        });
    }

    #[test]
    fn test_error_from_earlier_script_has_no_foreign_line() {
        with_context(|ctx| {
            evaluate_script(&ctx, "\n\n\n\n\n\n\nfunction explode() { throw new Error('deep'); }", Some("lib.js"), None).unwrap();

            let err = evaluate_script(&ctx, "explode()", Some("main.js"), None).unwrap_err();
            assert_eq!(err.to_string(), "Error: deep (main.js:1)");
        });
    }

    #[test]
    fn test_throwing_line_getter_leaves_no_pending_exception() {
        with_context(|ctx| {
            let script = "throw { get line() { throw new Error('getter'); }, toString() { return 'outer'; } };";
            let err = evaluate_script(&ctx, script, Some("main.js"), None).unwrap_err();

            assert_eq!(err.to_string(), "outer (main.js)");
            assert!(ctx.catch().type_of() == rquickjs::Type::Uninitialized);
        });
    }

    #[test]
    fn test_thrown_string_without_source() {
        with_context(|ctx| {
            let err = evaluate_script(&ctx, "throw 'oops'", None, None).unwrap_err();
            assert_eq!(err.to_string(), "oops (<unknown file>)");
        });
    }

    #[test]
    fn test_exception_is_cleared_after_failure() {
        with_context(|ctx| {
            assert!(evaluate_script(&ctx, "throw 1", None, None).is_err());

            let value = evaluate_script(&ctx, "2 + 2", None, None).unwrap();
            assert_eq!(value.as_int(), Some(4));
        });
    }

    #[test]
    fn test_sloppy_mode_by_default() {
        with_context(|ctx| {
            let value = evaluate_script(&ctx, "implicitGlobal = 5; implicitGlobal", None, None).unwrap();
            assert_eq!(value.as_int(), Some(5));

            let options = EvaluateOptions { strict: true };
            let err = evaluate_script_with_options(&ctx, "undeclared = 5", None, None, options).unwrap_err();
            assert!(err.script_message().unwrap().contains("ReferenceError"));
        });
    }

    #[test]
    fn test_cache_path_ignored_without_source() {
        let temp = tempdir().unwrap();
        let cache_path = temp.path().join("anon.jsbc");

        with_context(|ctx| {
            let value = evaluate_script(&ctx, "6 * 7", None, Some(cache_path.as_path())).unwrap();
            assert_eq!(value.as_int(), Some(42));
        });
        assert!(!cache_path.exists());
    }

    #[test]
    fn test_cached_evaluation_matches_plain() {
        let temp = tempdir().unwrap();
        let cache_path = temp.path().join("bundle.jsbc");
        let script = "var counter = (typeof counter === 'number' ? counter : 0) + 1; 'count=' + counter";

        with_context(|ctx| {
            let first = evaluate_script(&ctx, script, Some("bundle.js"), Some(cache_path.as_path())).unwrap();
            assert_eq!(first.get::<String>().unwrap(), "count=1");
        });
        assert!(cache_path.exists());
        let stored = std::fs::read(&cache_path).unwrap();

        // A fresh context reuses the entry and sees the same result
        with_context(|ctx| {
            let second = evaluate_script(&ctx, script, Some("bundle.js"), Some(cache_path.as_path())).unwrap();
            assert_eq!(second.get::<String>().unwrap(), "count=1");
            let third = evaluate_script(&ctx, script, Some("bundle.js"), Some(cache_path.as_path())).unwrap();
            assert_eq!(third.get::<String>().unwrap(), "count=2");
        });
        assert_eq!(std::fs::read(&cache_path).unwrap(), stored);
    }

    #[test]
    fn test_stale_cache_is_replaced() {
        let temp = tempdir().unwrap();
        let cache_path = temp.path().join("bundle.jsbc");

        with_context(|ctx| {
            let old = evaluate_script(&ctx, "'old'", Some("bundle.js"), Some(cache_path.as_path())).unwrap();
            assert_eq!(old.get::<String>().unwrap(), "old");

            let new = evaluate_script(&ctx, "'new'", Some("bundle.js"), Some(cache_path.as_path())).unwrap();
            assert_eq!(new.get::<String>().unwrap(), "new");
        });
    }

    #[test]
    fn test_corrupt_cache_falls_back_to_source() {
        let temp = tempdir().unwrap();
        let cache_path = temp.path().join("bundle.jsbc");
        let script = "'fresh'";
        let key = CacheKey::new("bundle.js", script, false);
        BytecodeCache::new(&cache_path).store(&key, b"not bytecode").unwrap();

        with_context(|ctx| {
            let value = evaluate_script(&ctx, script, Some("bundle.js"), Some(cache_path.as_path())).unwrap();
            assert_eq!(value.get::<String>().unwrap(), "fresh");
        });
    }

    #[test]
    fn test_tampered_cache_payload_is_recompiled() {
        let temp = tempdir().unwrap();
        let cache_path = temp.path().join("bundle.jsbc");
        let script = "'result=' + 12345";

        with_context(|ctx| {
            evaluate_script(&ctx, script, Some("bundle.js"), Some(cache_path.as_path())).unwrap();
        });

        let mut data = std::fs::read(&cache_path).unwrap();
        let at = data.windows(6).position(|w| w == b"result").unwrap();
        data[at] = b'X';
        std::fs::write(&cache_path, &data).unwrap();

        with_context(|ctx| {
            let value = evaluate_script(&ctx, script, Some("bundle.js"), Some(cache_path.as_path())).unwrap();
            assert_eq!(value.get::<String>().unwrap(), "result=12345");
        });
        assert_ne!(std::fs::read(&cache_path).unwrap(), data);
    }

    #[test]
    fn test_cached_failures_match_plain() {
        let temp = tempdir().unwrap();
        let cache_path = temp.path().join("bundle.jsbc");
        let script = "throw { toString: function() { return 'cached failure'; }, line: 3 };";

        with_context(|ctx| {
            let plain = evaluate_script(&ctx, script, Some("bundle.js"), None).unwrap_err();
            let cached = evaluate_script(&ctx, script, Some("bundle.js"), Some(cache_path.as_path())).unwrap_err();
            let reused = evaluate_script(&ctx, script, Some("bundle.js"), Some(cache_path.as_path())).unwrap_err();

            assert_eq!(plain.to_string(), "cached failure (bundle.js:3)");
            assert_eq!(cached.to_string(), plain.to_string());
            assert_eq!(reused.to_string(), plain.to_string());

            let syntax = evaluate_script(&ctx, "let = = 1;", Some("bundle.js"), Some(cache_path.as_path())).unwrap_err();
            assert!(syntax.script_message().unwrap().starts_with("SyntaxError"));
        });
    }
}
