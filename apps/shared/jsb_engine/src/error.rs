use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExecutionError>;

/// Placeholder shown when a script was evaluated without a source label
pub const UNKNOWN_FILE: &str = "<unknown file>";

/// Where a script exception was raised, rendered as `(file:line)`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: Option<String>,
    pub line: Option<i32>,
}

impl SourceLocation {
    pub fn new(file: Option<&str>, line: Option<i32>) -> Self {
        Self {
            file: file.filter(|f| !f.is_empty()).map(str::to_string),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.file.as_deref().unwrap_or(UNKNOWN_FILE))?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
        }
        write!(f, ")")
    }
}

#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The script threw. `message` is the stringified exception value.
    #[error("{message} {location}")]
    Script {
        message: String,
        location: SourceLocation,
    },

    #[error("Engine error: {0}")]
    Engine(#[from] rquickjs::Error),
}

impl ExecutionError {
    /// Exception text without the location suffix, if this is a script failure
    pub fn script_message(&self) -> Option<&str> {
        match self {
            ExecutionError::Script { message, .. } => Some(message),
            ExecutionError::Engine(_) => None,
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            ExecutionError::Script { location, .. } => Some(location),
            ExecutionError::Engine(_) => None,
        }
    }
}
