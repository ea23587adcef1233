use jsb_engine::EngineConfig;
use serde::Deserialize;
use std::path::Path;
use tracing::Level;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Runner configuration, loaded from an optional JSON file
///
/// Engine limits sit at the top level next to `log_level`:
///
/// ```json
/// { "log_level": "debug", "memory_limit": "64M", "max_stack_size": "1M", "strict": false }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    #[serde(flatten)]
    pub engine: EngineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            engine: EngineConfig::default(),
        }
    }
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let config: Config = serde_json::from_str(json)
            .map_err(|e| format!("Invalid configuration: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid log_level '{}', expected one of: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            ));
        }
        self.engine.validate()
    }

    pub fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsb_engine::ByteSize;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.level(), Level::INFO);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_valid_json() {
        let json = r#"{
            "log_level": "DEBUG",
            "memory_limit": "32M",
            "strict": true
        }"#;

        let config = Config::from_json_str(json).unwrap();
        assert_eq!(config.level(), Level::DEBUG);
        assert_eq!(config.engine.memory_limit, Some(ByteSize(32 * 1024 * 1024)));
        assert!(config.engine.strict);
    }

    #[test]
    fn test_invalid_log_level() {
        let result = Config::from_json_str(r#"{ "log_level": "loud" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_stack_size() {
        let result = Config::from_json_str(r#"{ "max_stack_size": 0 }"#);
        assert!(result.is_err());
    }
}
