//! Error types for simpledb

use std::time::Duration;
use thiserror::Error;

/// Result type alias for simpledb operations
pub type DbResult<T> = Result<T, DbError>;

/// Error types for command construction and execution
#[derive(Debug, Error)]
pub enum DbError {
    /// Null/empty command text, malformed template, missing collaborator
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The same named parameter was bound to two different values in one pass
    #[error("Parameter conflict: '{name}' is already bound to a different value")]
    ParameterConflict { name: String },

    /// A reference slot names a parameter that was never bound in the pass
    #[error("Unresolved parameter reference: '{name}'")]
    UnresolvedReference { name: String },

    /// The dialect cannot inline a value of this kind
    #[error("Unsupported literal of kind {kind}")]
    UnsupportedLiteral { kind: &'static str },

    /// Named connection string missing from the resolver
    #[error("Connection string '{name}' not found")]
    ConfigurationNotFound { name: String },

    /// Configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unknown provider, or the provider factory failed to produce a connection
    #[error("Provider error: {0}")]
    Provider(String),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[cfg(feature = "postgres")]
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Scalar/value conversion error
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Operation not valid in the current state (e.g. after close)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Command timeout error
    #[error("Command timeout after {0:?}")]
    Timeout(Duration),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl DbError {
    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a parameter conflict error
    pub fn parameter_conflict(name: impl Into<String>) -> Self {
        Self::ParameterConflict { name: name.into() }
    }

    /// Create an unresolved reference error
    pub fn unresolved_reference(name: impl Into<String>) -> Self {
        Self::UnresolvedReference { name: name.into() }
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a conversion error
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion(message.into())
    }

    /// Check if this error was raised while formatting a command
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_)
                | Self::ParameterConflict { .. }
                | Self::UnresolvedReference { .. }
                | Self::UnsupportedLiteral { .. }
        )
    }

    /// Check if this is a parameter conflict error
    pub fn is_parameter_conflict(&self) -> bool {
        matches!(self, Self::ParameterConflict { .. })
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
