use rquickjs::{Context, Ctx, Runtime, Value};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::evaluate::{EvaluateOptions, evaluate_script_with_options};

/// Host-side copy of a script result
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// Objects and arrays, as produced by `JSON.stringify`
    Json(String),
}

impl ScriptValue {
    /// Copy an engine value out of the context
    pub fn from_value<'js>(ctx: &Ctx<'js>, value: &Value<'js>) -> rquickjs::Result<Self> {
        if value.is_undefined() {
            return Ok(ScriptValue::Undefined);
        }
        if value.is_null() {
            return Ok(ScriptValue::Null);
        }
        if let Some(b) = value.as_bool() {
            return Ok(ScriptValue::Bool(b));
        }
        if let Some(n) = value.as_number() {
            return Ok(ScriptValue::Number(n));
        }
        if value.is_string() {
            return Ok(ScriptValue::String(value.get::<String>()?));
        }

        match ctx.json_stringify(value.clone())? {
            Some(json) => Ok(ScriptValue::Json(json.to_string()?)),
            None => Ok(ScriptValue::Undefined),
        }
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Undefined => write!(f, "undefined"),
            ScriptValue::Null => write!(f, "null"),
            ScriptValue::Bool(b) => write!(f, "{}", b),
            ScriptValue::Number(n) => write!(f, "{}", n),
            ScriptValue::String(s) | ScriptValue::Json(s) => write!(f, "{}", s),
        }
    }
}

/// An owned QuickJS runtime with a single full context
///
/// Not `Send`: the engine is driven from the thread that created it.
pub struct JsEngine {
    // Field order matters: the context must be dropped before its runtime
    context: Context,
    #[allow(dead_code)]
    runtime: Runtime,
    config: EngineConfig,
}

impl JsEngine {
    /// Create a runtime and context with the limits from `config`
    pub fn new(config: EngineConfig) -> Result<Self> {
        debug!("Initializing QuickJS runtime");

        let runtime = Runtime::new()?;
        if let Some(limit) = config.memory_limit {
            runtime.set_memory_limit(limit.as_bytes());
        }
        if let Some(size) = config.max_stack_size {
            runtime.set_max_stack_size(size.as_bytes());
        }
        if let Some(threshold) = config.gc_threshold {
            runtime.set_gc_threshold(threshold.as_bytes());
        }

        let context = Context::full(&runtime)?;

        info!("JavaScript engine initialized");
        Ok(Self { context, runtime, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `f` with access to the engine context
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: for<'js> FnOnce(Ctx<'js>) -> R,
    {
        self.context.with(f)
    }

    /// Evaluate a script and copy its result out of the engine
    ///
    /// Same semantics as [`crate::evaluate_script`], using the configured strict mode.
    pub fn evaluate(&self, script: &str, source: Option<&str>, cache_path: Option<&Path>) -> Result<ScriptValue> {
        let options = EvaluateOptions { strict: self.config.strict };
        self.with(|ctx| {
            let value = evaluate_script_with_options(&ctx, script, source, cache_path, options)?;
            Ok(ScriptValue::from_value(&ctx, &value)?)
        })
    }
}
