//! Host errors

use std::fmt;

/// Errors produced while driving the engine
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("failed to initialize JavaScript engine: {0}")]
    Init(String),

    #[error("failed to register native function `{name}`: {reason}")]
    Register { name: String, reason: String },

    #[error(transparent)]
    Script(#[from] ScriptError),
}

/// An error reported by the engine while evaluating a script.
///
/// Covers syntax errors, uncaught exceptions and internal engine errors
/// alike. Displays as `file:line:message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    pub file: String,
    pub line: u32,
    pub message: String,
}

impl ScriptError {
    pub fn new(file: impl Into<String>, line: u32, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = if self.file.is_empty() { "[no filename]" } else { &self.file };
        write!(f, "{}:{}:{}", file, self.line, self.message)
    }
}

impl std::error::Error for ScriptError {}

/// Failure of a native function, raised in the script as an exception
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NativeError {
    /// The engine already has an exception pending (e.g. a throwing
    /// `toString`); it is rethrown unchanged.
    #[error("exception pending in engine")]
    Pending,

    /// Raised as a `TypeError`
    #[error("{0}")]
    Type(String),

    /// Raised as a plain `Error`
    #[error("{0}")]
    Failed(String),
}
