//! Core error type.
//!
//! Sub-crates define their own error enums and convert `NavError` into them
//! via `From` where a core operation can fail inside them.

use thiserror::Error;

/// The error type for `nav-core`.
#[derive(Debug, Error)]
pub enum NavError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Shorthand result type for `nav-core`.
pub type NavResult<T> = Result<T, NavError>;
