use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("generic error: {0}")]
    Generic(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Dissector could not be spawned, exited with an error, or produced
    /// output with an unexpected shape
    #[error("dissector error: {0}")]
    Dissector(String),

    #[error("layer '{layer}' has no field '{field}'")]
    MissingField { layer: String, field: String },

    #[error("invalid value '{value}' for field '{field}'")]
    InvalidFieldValue { field: String, value: String },

    #[error("unsupported protocol '{0}'")]
    UnsupportedProtocol(String),

    #[error("duplicate counter name '{0}'")]
    DuplicateCounter(String),
}

impl From<&'static str> for Error {
    fn from(s: &'static str) -> Self {
        Error::Generic(s)
    }
}
