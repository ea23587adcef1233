use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use jsb_engine::{EngineConfig, ExecutionError, JsEngine, ScriptValue, install_global_function, install_logging_hook};
use rquickjs::function::Opt;
use tracing::{debug, error, info};

/// Global a script can call to request a process exit code
pub const EXIT_HOOK: &str = "nativeExit";

/// What to run and how
pub struct RunRequest {
    pub script_path: PathBuf,
    pub source: Option<String>,
    pub cache_path: Option<PathBuf>,
}

impl RunRequest {
    /// Source label: explicit `--source`, otherwise the script's file name
    pub fn source_label(&self) -> String {
        self.source.clone().unwrap_or_else(|| {
            self.script_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }
}

/// Result of running a script file
#[derive(Debug)]
pub struct RunOutcome {
    pub result: Result<ScriptValue, ExecutionError>,
    /// Code passed to `nativeExit`, if the script called it
    pub requested_exit: Option<i32>,
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match (&self.result, self.requested_exit) {
            (Err(_), _) => 1,
            (Ok(_), Some(code)) => code,
            (Ok(_), None) => 0,
        }
    }
}

fn read_script(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read script '{}': {}", path.display(), e).into())
}

/// Create an engine, install the host globals and evaluate the script
pub fn run_script(request: &RunRequest, engine_config: EngineConfig) -> Result<RunOutcome, Box<dyn std::error::Error>> {
    let script = read_script(&request.script_path)?;
    let source = request.source_label();
    debug!("Running '{}' as '{}'", request.script_path.display(), source);

    let engine = JsEngine::new(engine_config)?;
    debug!("Engine config: {:?}", engine.config());
    let requested_exit = Rc::new(Cell::new(None));

    let exit_slot = Rc::clone(&requested_exit);
    engine.with(|ctx| {
        install_logging_hook(&ctx, &source)?;
        install_global_function(&ctx, EXIT_HOOK, move |code: Opt<i32>| {
            exit_slot.set(Some(code.0.unwrap_or(0)));
        })
    })?;

    if let Some(cache_path) = &request.cache_path {
        debug!("Bytecode cache: {}", cache_path.display());
    }

    let result = engine.evaluate(&script, Some(&source), request.cache_path.as_deref());
    match &result {
        Ok(value) => info!("Script '{}' finished: {}", source, value),
        Err(e) => error!("Script '{}' failed: {}", source, e),
    }

    Ok(RunOutcome {
        result,
        requested_exit: requested_exit.get(),
    })
}
