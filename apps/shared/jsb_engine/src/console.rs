//! Native logging hook and the `console` object built on top of it
//!
//! Script output is routed into `tracing` with `runtime_type = "js"` and the
//! script's source label, which the log formatter renders as `js::<source>:`.

use rquickjs::function::Opt;
use rquickjs::{Coerced, Ctx};
use tracing::{debug, error, info, trace, warn};

use crate::globals::install_global_function;

/// Global name of the native logging function
pub const LOGGING_HOOK: &str = "nativeLoggingHook";

/// JavaScript glue that defines `console` over [`LOGGING_HOOK`]
const CONSOLE_GLUE: &str = include_str!("glue/console.js");

/// Severity passed as the second argument of the logging hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Map the numeric level used by scripts; unknown values log as info
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => LogLevel::Trace,
            2 => LogLevel::Warn,
            3 => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

/// Forwards script log lines from one source to `tracing`
#[derive(Debug, Clone)]
pub struct ConsoleApi {
    source: String,
}

impl ConsoleApi {
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into() }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        let source = self.source.as_str();
        match level {
            LogLevel::Trace => trace!(runtime_type = "js", source = source, "{}", message),
            LogLevel::Info => info!(runtime_type = "js", source = source, "{}", message),
            LogLevel::Warn => warn!(runtime_type = "js", source = source, "{}", message),
            LogLevel::Error => error!(runtime_type = "js", source = source, "{}", message),
        }
    }
}

/// Install `nativeLoggingHook(message, level)` and a `console` object that uses it
///
/// `source` tags every line logged from this context.
pub fn install_logging_hook(ctx: &Ctx<'_>, source: &str) -> rquickjs::Result<()> {
    let console = ConsoleApi::new(source);
    install_global_function(ctx, LOGGING_HOOK, move |message: Coerced<String>, level: Opt<i32>| {
        console.log(LogLevel::from_code(level.0.unwrap_or(1)), &message.0);
    })?;

    ctx.eval::<(), _>(CONSOLE_GLUE)?;
    debug!("Console API installed for '{}'", source);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rquickjs::{Context, Runtime};

    #[test]
    fn test_level_codes() {
        assert_eq!(LogLevel::from_code(0), LogLevel::Trace);
        assert_eq!(LogLevel::from_code(1), LogLevel::Info);
        assert_eq!(LogLevel::from_code(2), LogLevel::Warn);
        assert_eq!(LogLevel::from_code(3), LogLevel::Error);
        assert_eq!(LogLevel::from_code(42), LogLevel::Info);
    }

    #[test]
    fn test_console_api_keeps_source() {
        let console = ConsoleApi::new("index.bundle");
        assert_eq!(console.source(), "index.bundle");
        console.log(LogLevel::Warn, "logged without a subscriber");
    }

    #[test]
    fn test_console_is_installed() {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();

        context.with(|ctx| {
            install_logging_hook(&ctx, "main.js").unwrap();

            let kinds: String = ctx
                .eval("[typeof nativeLoggingHook, typeof console.log, typeof console.error].join(',')")
                .unwrap();
            assert_eq!(kinds, "function,function,function");

            ctx.eval::<(), _>("console.log('hello', 1, { a: [1, 2] }); console.warn(new Error('careful'));")
                .unwrap();
            ctx.eval::<(), _>("nativeLoggingHook('no level given')").unwrap();
        });
    }
}
