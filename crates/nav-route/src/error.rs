//! Route-resolution error type.
//!
//! Cancellation is deliberately absent: a superseded request is a
//! [`RouteOutcome::Cancelled`][crate::RouteOutcome::Cancelled], not a failure.

use std::time::Duration;

use thiserror::Error;

/// Why a current route request failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    /// The service answered but had no route between the two points.
    #[error("no route available")]
    NotFound,

    #[error("network failure: {0}")]
    Network(String),

    #[error("directions service returned HTTP {status}")]
    Service { status: u16 },

    #[error("malformed directions response: {0}")]
    Decode(String),

    #[error("route request timed out after {0:?}")]
    Timeout(Duration),
}

impl RouteError {
    /// Short text suitable for a non-blocking notice.
    pub fn user_message(&self) -> &'static str {
        match self {
            RouteError::NotFound => "No route available",
            RouteError::Timeout(_) => "Route request timed out",
            RouteError::Network(_) | RouteError::Service { .. } | RouteError::Decode(_) => {
                "Route service unavailable, please try again"
            }
        }
    }
}
