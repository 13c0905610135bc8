//! Error types for experiment bookkeeping

use thiserror::Error;

/// Result type alias using the experiment Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for run-folder management and flag handling
#[derive(Error, Debug)]
pub enum Error {
    // Checkpoint root / run folder errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // Checkpoint file name errors
    #[error("Failed to parse '{input}': {reason}")]
    Parse { input: String, reason: String },

    // Flag registry errors
    #[error("Flag registry error: {message}")]
    Registry { message: String },

    #[error("Failed to parse following flags: {flags:?}")]
    UnparsedFlags { flags: Vec<String> },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Shorthand for a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Shorthand for a parse error
    pub fn parse(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Parse {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a registry error
    pub fn registry(message: impl Into<String>) -> Self {
        Error::Registry {
            message: message.into(),
        }
    }

    /// Returns true if the caller supplied something unusable (bad root,
    /// bad flags, malformed names) rather than hitting an environment fault
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::Configuration { .. }
                | Error::Parse { .. }
                | Error::Registry { .. }
                | Error::UnparsedFlags { .. }
        )
    }

    /// Returns true if this error must terminate the calling script
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Configuration { .. } | Error::Registry { .. } | Error::UnparsedFlags { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// The current source revision could not be determined.
///
/// Never propagated: callers treat it as "omit the revision field".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("revision not available: {reason}")]
pub struct NotAvailable {
    pub reason: String,
}
