use nav_core::EntityId;
use nav_entities::EntityError;
use nav_layers::LayerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),

    #[error("selection binding is already running")]
    AlreadyRunning,

    #[error("layer error: {0}")]
    Layer(#[from] LayerError),

    #[error("entity error: {0}")]
    Entity(#[from] EntityError),
}

pub type SessionResult<T> = Result<T, SessionError>;
