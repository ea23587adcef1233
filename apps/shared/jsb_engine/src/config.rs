use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

const UNITS: [(char, usize); 3] = [('G', 1 << 30), ('M', 1 << 20), ('K', 1 << 10)];

/// Engine memory amount, written in config as `1048576` or `"1M"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawByteSize")]
pub struct ByteSize(pub usize);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawByteSize {
    Bytes(u64),
    Text(String),
}

impl TryFrom<RawByteSize> for ByteSize {
    type Error = String;

    fn try_from(raw: RawByteSize) -> Result<Self, Self::Error> {
        match raw {
            RawByteSize::Bytes(bytes) => usize::try_from(bytes)
                .map(ByteSize)
                .map_err(|_| format!("byte size {} is too large", bytes)),
            RawByteSize::Text(text) => text.parse(),
        }
    }
}

impl FromStr for ByteSize {
    type Err = String;

    /// Accepts a plain byte count or a count with a `K`, `M` or `G` suffix (any case)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (digits, multiplier) = match s.chars().last().map(|c| c.to_ascii_uppercase()) {
            None => return Err("byte size is empty".to_string()),
            Some(suffix) => match UNITS.iter().find(|(unit, _)| *unit == suffix) {
                Some((_, multiplier)) => (&s[..s.len() - 1], *multiplier),
                None => (s, 1),
            },
        };

        let count: usize = digits.trim().parse()
            .map_err(|e| format!("invalid byte size '{}': {}", s, e))?;
        Ok(ByteSize(count.saturating_mul(multiplier)))
    }
}

impl ByteSize {
    pub fn as_bytes(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match UNITS.iter().find(|(_, size)| self.0 >= *size && self.0 % size == 0) {
            Some((unit, size)) => write!(f, "{}{}", self.0 / size, unit),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Configuration applied to the QuickJS runtime backing a [`crate::JsEngine`]
///
/// Every limit is optional; an unset limit keeps the engine default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Heap limit for the runtime
    pub memory_limit: Option<ByteSize>,
    /// Native stack budget for script execution
    pub max_stack_size: Option<ByteSize>,
    /// Allocation threshold that triggers a GC cycle
    pub gc_threshold: Option<ByteSize>,
    /// Evaluate scripts in strict mode
    pub strict: bool,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_memory_limit(mut self, limit: ByteSize) -> Self {
        self.memory_limit = Some(limit);
        self
    }

    pub fn with_max_stack_size(mut self, size: ByteSize) -> Self {
        self.max_stack_size = Some(size);
        self
    }

    pub fn with_gc_threshold(mut self, threshold: ByteSize) -> Self {
        self.gc_threshold = Some(threshold);
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Reject limits the engine cannot run with
    pub fn validate(&self) -> Result<(), String> {
        if self.max_stack_size.is_some_and(|s| s.as_bytes() == 0) {
            return Err("max_stack_size must be greater than zero".to_string());
        }
        if self.memory_limit.is_some_and(|s| s.as_bytes() == 0) {
            return Err("memory_limit must be greater than zero".to_string());
        }
        Ok(())
    }
}
