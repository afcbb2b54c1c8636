//! Device geolocation with a bounded wait and a deterministic fallback.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use nav_core::Coordinate;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GeolocationError {
    #[error("geolocation permission denied")]
    Denied,

    #[error("geolocation unavailable: {0}")]
    Unavailable(String),
}

/// Source of the device's current position.
pub trait GeolocationProvider: Send + Sync {
    fn current_position(&self) -> impl Future<Output = Result<Coordinate, GeolocationError>> + Send;
}

/// A provider that always reports the same position.
pub struct FixedPosition(pub Coordinate);

impl GeolocationProvider for FixedPosition {
    async fn current_position(&self) -> Result<Coordinate, GeolocationError> {
        Ok(self.0)
    }
}

/// Where an origin came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OriginSource {
    Device,
    Fallback,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct OriginFix {
    pub coordinate: Coordinate,
    pub source:     OriginSource,
}

/// Ask `provider` for a position, giving up after `timeout`.
///
/// Never fails: denial, unavailability, an out-of-range fix and timeout all
/// yield `fallback`.
pub async fn acquire_origin<P: GeolocationProvider>(
    provider: &P,
    timeout:  Duration,
    fallback: Coordinate,
) -> OriginFix {
    let fallback_fix = OriginFix { coordinate: fallback, source: OriginSource::Fallback };
    match tokio::time::timeout(timeout, provider.current_position()).await {
        Ok(Ok(coordinate)) if coordinate.is_valid() => {
            debug!(%coordinate, "device position acquired");
            OriginFix { coordinate, source: OriginSource::Device }
        }
        Ok(Ok(coordinate)) => {
            warn!(%coordinate, %fallback, "device reported an invalid position; using fallback");
            fallback_fix
        }
        Ok(Err(error)) => {
            warn!(%error, %fallback, "geolocation failed; using fallback");
            fallback_fix
        }
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, %fallback, "geolocation timed out; using fallback");
            fallback_fix
        }
    }
}
