//! LinkKeeper error types

use crate::storage::StorageError;
use thiserror::Error;

/// LinkKeeper error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Channel error
    #[error("Channel error: {0}")]
    Channel(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Malformed callback payload
    #[error("Payload error: {0}")]
    Payload(String),

    /// Event processing exceeded its deadline
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A high-level step failed; the cause is kept as the source
    #[error("{context}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Storage error at the bottom of a context chain, if any
    pub fn storage_cause(&self) -> Option<&StorageError> {
        match self {
            Error::Storage(e) => Some(e),
            Error::Context { source, .. } => source.storage_cause(),
            _ => None,
        }
    }

    /// One-line rendering of the context chain down to the root cause
    pub fn report(&self) -> String {
        let mut out = String::new();
        let mut current = self;
        while let Error::Context { context, source } = current {
            out.push_str(context);
            out.push_str(": ");
            current = source;
        }
        out.push_str(&current.to_string());
        out
    }
}

/// Result type alias for LinkKeeper operations
pub type Result<T> = std::result::Result<T, Error>;

/// Attach "what step failed" context to an error
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Context {
            context: context.into(),
            source: Box::new(e.into()),
        })
    }
}
