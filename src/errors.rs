use std::path::PathBuf;

use thiserror::Error;

/// A durable write (or read) of one of the JSON files failed.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PersistenceError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PersistenceError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors surfaced by the ledger store. "Not found" is not an error; lookups
/// return `Option` and mutations return `Ok(false)`.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }
}

/// A single remote source failed to produce a usable rate set. Never leaves
/// the rate cache.
#[derive(Debug, Error)]
pub enum RemoteFetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("response is missing rates for {0:?}")]
    Incomplete(Vec<String>),
    #[error("response has an unusable rate for {code}: {value}")]
    InvalidRate { code: String, value: f64 },
}
