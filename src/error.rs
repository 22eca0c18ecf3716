// ⚠️ Error taxonomy for the budgeting core
//
// Validation and Index errors are raised before any store call is issued.
// Persistence errors come back from the store untouched: no retry, and the
// in-memory aggregate stays as the user's visible truth.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad user input (quantity, percent, prices, required fields)
    #[error("validation failed: {0}")]
    Validation(String),

    /// Line item removal outside 0..len
    #[error("item index {index} out of range (budget has {len} items)")]
    Index { index: usize, len: usize },

    /// A store call failed
    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("no project selected")]
    NoActiveProject,

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// User-facing errors: shown as a blocking message, nothing was written
    pub fn is_user_error(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::NotFound { .. } | Error::NoActiveProject)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Persistence(err.to_string())
    }
}
