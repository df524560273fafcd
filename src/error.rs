//! Error handling module for the charm
//!
//! Provides the crate-wide error type used by the hook glue. Operator-facing
//! configuration problems are not errors at this level: they are
//! [`ConfigError`](crate::context::ConfigError) values that end up as a
//! `blocked` workload status.

use thiserror::Error;

use crate::options::OptionsError;

/// Main error type for hook execution
#[derive(Error, Debug)]
pub enum CharmError {
    /// IO errors (spawning hook tools, reading option files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The option document handed over by the agent could not be parsed
    #[error("Options error: {0}")]
    Options(#[from] OptionsError),

    /// A Juju hook tool (or apt-get) could not be run or exited non-zero
    #[error("Hook tool `{tool}` failed: {message}")]
    HookTool { tool: String, message: String },

    /// The hook environment is missing something we need
    #[error("Environment error: {0}")]
    Environment(String),

    /// Runtime settings errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for hook operations
pub type Result<T> = std::result::Result<T, CharmError>;

// Convenient error constructors
impl CharmError {
    /// Create a hook tool error
    pub fn hook_tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HookTool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create an environment error
    pub fn environment(msg: impl Into<String>) -> Self {
        Self::Environment(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
