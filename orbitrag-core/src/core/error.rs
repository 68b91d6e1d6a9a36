//! Unified error handling for the retrieval core
//!
//! Every fallible operation in the crate returns [`OrbitRagError`]. None of
//! the variants is fatal to the process: lookups that miss, embeddings of the
//! wrong shape and encoder timeouts all narrow retrieval instead of aborting it.

use std::fmt;

/// Main error type for the retrieval core
#[derive(Debug)]
pub enum OrbitRagError {
    /// Configuration-related errors
    Config {
        /// Error message
        message: String,
    },

    /// I/O errors from file operations
    Io(std::io::Error),

    /// Serde JSON errors
    SerdeJson(serde_json::Error),

    /// TOML parsing errors
    Toml(toml::de::Error),

    /// Entity and relation extraction errors
    EntityExtraction {
        /// Error message
        message: String,
    },

    /// Vector search errors
    VectorSearch {
        /// Error message
        message: String,
    },

    /// Embedding shape violation: the vector length differs from the index dimension
    DimensionMismatch {
        /// Dimension fixed by the index
        expected: usize,
        /// Dimension of the rejected vector
        actual: usize,
    },

    /// Embedding provider errors
    Embedding {
        /// Error message
        message: String,
    },

    /// Storage errors
    Storage {
        /// Error message
        message: String,
    },

    /// Serialization errors
    Serialization {
        /// Error message
        message: String,
    },

    /// Validation errors
    Validation {
        /// Error message
        message: String,
    },

    /// Resource not found errors
    NotFound {
        /// Resource type
        resource: String,
        /// Resource identifier
        id: String,
    },

    /// Operation timeout errors
    Timeout {
        /// Operation name
        operation: String,
        /// Timeout duration
        duration: std::time::Duration,
    },
}

impl fmt::Display for OrbitRagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrbitRagError::Config { message } => {
                write!(
                    f,
                    "Configuration error: {message}. \
                          Solution: Check your config file or start from Config::default()"
                )
            },
            OrbitRagError::Io(err) => {
                write!(
                    f,
                    "I/O error: {err}. \
                          Solution: Check file permissions and that paths exist"
                )
            },
            OrbitRagError::SerdeJson(err) => {
                write!(
                    f,
                    "JSON serialization error: {err}. \
                          Solution: Verify data structure compatibility"
                )
            },
            OrbitRagError::Toml(err) => {
                write!(
                    f,
                    "TOML parsing error: {err}. \
                          Solution: Verify TOML syntax and section names"
                )
            },
            OrbitRagError::EntityExtraction { message } => {
                write!(
                    f,
                    "Entity extraction error: {message}. \
                          Solution: Check the extraction rule table"
                )
            },
            OrbitRagError::VectorSearch { message } => {
                write!(f, "Vector search error: {message}")
            },
            OrbitRagError::DimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "Embedding dimension mismatch: expected {expected}, got {actual}. \
                          Solution: Use one embedding provider per index"
                )
            },
            OrbitRagError::Embedding { message } => {
                write!(f, "Embedding error: {message}")
            },
            OrbitRagError::Storage { message } => {
                write!(f, "Storage error: {message}")
            },
            OrbitRagError::Serialization { message } => {
                write!(f, "Serialization error: {message}")
            },
            OrbitRagError::Validation { message } => {
                write!(f, "Validation error: {message}")
            },
            OrbitRagError::NotFound { resource, id } => {
                write!(f, "{resource} not found: {id}")
            },
            OrbitRagError::Timeout {
                operation,
                duration,
            } => {
                write!(f, "Operation '{operation}' timed out after {duration:?}")
            },
        }
    }
}

impl std::error::Error for OrbitRagError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OrbitRagError::Io(err) => Some(err),
            OrbitRagError::SerdeJson(err) => Some(err),
            OrbitRagError::Toml(err) => Some(err),
            _ => None,
        }
    }
}

// Automatic conversions from common error types
impl From<std::io::Error> for OrbitRagError {
    fn from(err: std::io::Error) -> Self {
        OrbitRagError::Io(err)
    }
}

impl From<serde_json::Error> for OrbitRagError {
    fn from(err: serde_json::Error) -> Self {
        OrbitRagError::SerdeJson(err)
    }
}

impl From<toml::de::Error> for OrbitRagError {
    fn from(err: toml::de::Error) -> Self {
        OrbitRagError::Toml(err)
    }
}

impl From<regex::Error> for OrbitRagError {
    fn from(err: regex::Error) -> Self {
        OrbitRagError::Validation {
            message: format!("Regex error: {err}"),
        }
    }
}

impl From<crate::entity::rules::RuleError> for OrbitRagError {
    fn from(err: crate::entity::rules::RuleError) -> Self {
        OrbitRagError::EntityExtraction {
            message: format!("Rule table error: {err}"),
        }
    }
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, OrbitRagError>;

/// Trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn with_context(self, context: &str) -> Result<T>;

    /// Add context using a closure
    fn with_context_lazy<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<OrbitRagError>,
{
    fn with_context(self, context: &str) -> Result<T> {
        self.map_err(|e| match e.into() {
            OrbitRagError::Config { message } => OrbitRagError::Config {
                message: format!("{context}: {message}"),
            },
            OrbitRagError::EntityExtraction { message } => OrbitRagError::EntityExtraction {
                message: format!("{context}: {message}"),
            },
            OrbitRagError::VectorSearch { message } => OrbitRagError::VectorSearch {
                message: format!("{context}: {message}"),
            },
            OrbitRagError::Embedding { message } => OrbitRagError::Embedding {
                message: format!("{context}: {message}"),
            },
            OrbitRagError::Storage { message } => OrbitRagError::Storage {
                message: format!("{context}: {message}"),
            },
            OrbitRagError::Serialization { message } => OrbitRagError::Serialization {
                message: format!("{context}: {message}"),
            },
            OrbitRagError::Validation { message } => OrbitRagError::Validation {
                message: format!("{context}: {message}"),
            },
            other => other, // For errors that don't have a message field
        })
    }

    fn with_context_lazy<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        match self {
            Ok(value) => Ok(value),
            Err(e) => {
                let context = f();
                Err(e).with_context(&context)
            },
        }
    }
}

/// Helper macros for creating specific error types
///
/// Creates a configuration error with a message
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::OrbitRagError::Config {
            message: $msg.to_string(),
        }
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::OrbitRagError::Config {
            message: format!($fmt, $($arg)*),
        }
    };
}

/// Creates a storage error with a message
#[macro_export]
macro_rules! storage_error {
    ($msg:expr) => {
        $crate::OrbitRagError::Storage {
            message: $msg.to_string(),
        }
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::OrbitRagError::Storage {
            message: format!($fmt, $($arg)*),
        }
    };
}

/// Error severity levels for logging and monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Informational - not actually an error
    Info,
    /// Warning - something unexpected but recoverable
    Warning,
    /// Error - operation failed but system can continue
    Error,
    /// Critical - system integrity compromised
    Critical,
}

impl OrbitRagError {
    /// Get the severity level of this error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            OrbitRagError::Config { .. } => ErrorSeverity::Critical,
            OrbitRagError::Io(_) => ErrorSeverity::Error,
            OrbitRagError::SerdeJson(_) | OrbitRagError::Toml(_) => ErrorSeverity::Error,
            OrbitRagError::EntityExtraction { .. } => ErrorSeverity::Warning,
            OrbitRagError::VectorSearch { .. } => ErrorSeverity::Warning,
            OrbitRagError::DimensionMismatch { .. } => ErrorSeverity::Warning,
            OrbitRagError::Embedding { .. } => ErrorSeverity::Warning,
            OrbitRagError::Storage { .. } => ErrorSeverity::Error,
            OrbitRagError::Serialization { .. } => ErrorSeverity::Error,
            OrbitRagError::Validation { .. } => ErrorSeverity::Error,
            OrbitRagError::NotFound { .. } => ErrorSeverity::Warning,
            OrbitRagError::Timeout { .. } => ErrorSeverity::Warning,
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self.severity() {
            ErrorSeverity::Info | ErrorSeverity::Warning => true,
            ErrorSeverity::Error => false,
            ErrorSeverity::Critical => false,
        }
    }

    /// Shorthand for a missing entity lookup
    pub fn entity_not_found(id: impl Into<String>) -> Self {
        OrbitRagError::NotFound {
            resource: "Entity".to_string(),
            id: id.into(),
        }
    }
}
