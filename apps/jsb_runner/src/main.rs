use std::path::PathBuf;

use clap::Parser;
use tracing::{debug, info};

use jsb_log::{LogConfig, init_logging};

mod config;
use config::Config;

mod runner;
use runner::{RunRequest, run_script};

const VERSION: &str = "0.1.0";

/// jsbridge script runner
#[derive(Parser, Debug)]
#[command(name = "jsb_runner")]
#[command(version = VERSION)]
#[command(about = "Evaluate a script file in an embedded QuickJS engine", long_about = None)]
struct Args {
    /// Script file to evaluate
    script: PathBuf,

    /// Source label used in backtraces and error locations (defaults to the file name)
    #[arg(short, long)]
    source: Option<String>,

    /// Bytecode cache file; reused when the script is unchanged
    #[arg(long, env = "JSB_CACHE")]
    cache: Option<PathBuf>,

    /// Path to configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable logging to file (jsb_runner.log in current directory)
    #[arg(long, env = "JSB_LOG_FILE")]
    log_file: bool,

    /// Print the script's completion value to stdout
    #[arg(long)]
    print: bool,
}

fn main() {
    let args = Args::parse();

    // Logging isn't up yet, early failures go to stderr
    let config = match &args.config {
        Some(path) => match Config::from_json_file(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Failed to load config from '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    let log_config = if args.log_file {
        match std::fs::File::create("jsb_runner.log") {
            Ok(file) => LogConfig::new("jsb_runner::")
                .with_level(config.level())
                .with_log_file(file),
            Err(e) => {
                eprintln!("Unable to create jsb_runner.log: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        LogConfig::<std::fs::File>::new("jsb_runner::").with_level(config.level())
    };

    if let Err(e) = init_logging(log_config) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("jsb_runner v{}", VERSION);
    debug!("Settings:");
    debug!("  Log Level: {}", config.log_level);
    debug!("  Memory Limit: {:?}", config.engine.memory_limit.map(|s| s.to_string()));
    debug!("  Max Stack Size: {:?}", config.engine.max_stack_size.map(|s| s.to_string()));
    debug!("  Strict: {}", config.engine.strict);

    let request = RunRequest {
        script_path: args.script,
        source: args.source,
        cache_path: args.cache,
    };

    let outcome = match run_script(&request, config.engine) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    match &outcome.result {
        Ok(value) if args.print => println!("{}", value),
        Ok(_) => {}
        Err(e) => eprintln!("{}", e),
    }

    std::process::exit(outcome.exit_code());
}
