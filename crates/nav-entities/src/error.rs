//! Errors produced while loading entity datasets.
//!
//! Searching never fails; only loaders return these.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EntityError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type EntityResult<T> = Result<T, EntityError>;
