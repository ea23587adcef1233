//! jsbridge engine adapter
//!
//! A thin layer between a host application and the embedded QuickJS engine.
//! Everything interesting is done by the engine; this crate only forwards
//! arguments and translates failures into host-side errors.
//!
//! # Operations
//!
//! - [`install_global_function`]: expose a native callback under a global name
//! - [`make_exception`] / [`throw_exception`]: build an exception value from host text
//! - [`evaluate_script`]: run a script, turning a thrown exception into
//!   [`ExecutionError::Script`] (`"<message> (<file>:<line>)"`), optionally
//!   through an on-disk bytecode cache
//!
//! [`JsEngine`] owns a runtime and context for hosts that don't manage their own,
//! and [`install_logging_hook`] routes script logging into `tracing`.

pub mod bytecode;
pub mod cache;
pub mod config;
pub mod console;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod exception;
pub mod globals;

pub use cache::{BytecodeCache, CacheKey};
pub use config::{ByteSize, EngineConfig};
pub use console::{ConsoleApi, LOGGING_HOOK, LogLevel, install_logging_hook};
pub use engine::{JsEngine, ScriptValue};
pub use error::{ExecutionError, Result, SourceLocation, UNKNOWN_FILE};
pub use evaluate::{EvaluateOptions, evaluate_script, evaluate_script_with_options};
pub use exception::{exception_line, exception_text, make_exception, throw_exception};
pub use globals::install_global_function;
