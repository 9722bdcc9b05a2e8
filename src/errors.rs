use thiserror::Error;

use crate::safety::SafetyViolation;

/// Errors that can occur while serving schema exploration requests.
#[derive(Error, Debug)]
pub enum SchemaGraphError {
    #[error("graph store error: {message} (operation: {operation})")]
    Driver { message: String, operation: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("tool not found: {name}")]
    ToolNotFound { name: String },

    #[error("tool execution failed: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("query execution failed: {message}")]
    QueryExecution { message: String },

    #[error("unsafe query: {0}")]
    UnsafeQuery(#[from] SafetyViolation),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SchemaGraphError {
    /// Shorthand for building an `InvalidArgument` error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Shorthand for building a `Driver` error.
    pub fn driver(message: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
            operation: operation.into(),
        }
    }
}

/// Convenience alias for results using `SchemaGraphError`.
pub type Result<T> = std::result::Result<T, SchemaGraphError>;
