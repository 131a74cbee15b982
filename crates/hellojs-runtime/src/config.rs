//! Host Configuration

/// Host configuration options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Engine heap limit (bytes)
    pub memory_limit: usize,

    /// Engine stack limit (bytes)
    pub max_stack_size: usize,

    /// Filename shown in diagnostics for the evaluated script
    pub script_name: String,

    /// Line number of the first line of the script
    pub first_line: u32,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            memory_limit: 8 * 1024 * 1024, // 8MB
            max_stack_size: 1024 * 1024,   // 1MB
            script_name: "<command line>".to_string(),
            first_line: 1,
        }
    }
}

/// Invalid configuration value
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidSize { var: &'static str, value: String },
}

impl HostConfig {
    /// Environment variable overriding [`HostConfig::memory_limit`]
    pub const MEMORY_LIMIT_VAR: &'static str = "HELLOJS_MEMORY_LIMIT";

    /// Environment variable overriding [`HostConfig::max_stack_size`]
    pub const STACK_SIZE_VAR: &'static str = "HELLOJS_STACK_SIZE";

    /// Defaults with overrides taken from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(Self::MEMORY_LIMIT_VAR) {
            self.memory_limit = parse_size(Self::MEMORY_LIMIT_VAR, &value)?;
        }
        if let Some(value) = lookup(Self::STACK_SIZE_VAR) {
            self.max_stack_size = parse_size(Self::STACK_SIZE_VAR, &value)?;
        }
        Ok(self)
    }

    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = bytes;
        self
    }

    pub fn with_max_stack_size(mut self, bytes: usize) -> Self {
        self.max_stack_size = bytes;
        self
    }

    pub fn with_script_name(mut self, name: impl Into<String>) -> Self {
        self.script_name = name.into();
        self
    }

    pub fn with_first_line(mut self, line: u32) -> Self {
        self.first_line = line;
        self
    }
}

fn parse_size(var: &'static str, value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidSize {
            var,
            value: value.to_string(),
        }),
    }
}
