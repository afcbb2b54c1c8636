//! Error types for nav-layers.

use thiserror::Error;

use crate::LayerKind;

/// Errors raised while mutating the map surface.
#[derive(Debug, Error)]
pub enum LayerError {
    /// The surface already holds a layer, source or marker with this id that
    /// the synchronizer did not create.  Upsert discipline makes this
    /// unreachable in a correct program.
    #[error("duplicate layer id {0:?}")]
    DuplicateLayerId(String),

    #[error("layer {id:?} of kind {kind:?} cannot display {data} data")]
    KindMismatch {
        id:   String,
        kind: LayerKind,
        data: &'static str,
    },

    /// The surface rejected an operation for a reason of its own.
    #[error("map surface error: {0}")]
    Surface(String),
}

/// Alias for `Result<T, LayerError>`.
pub type LayerResult<T> = Result<T, LayerError>;
