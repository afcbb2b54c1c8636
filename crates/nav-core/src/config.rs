//! Engine configuration.

use std::time::Duration;

use crate::{Coordinate, NavError, NavResult};

/// Top-level engine configuration.
///
/// Typically loaded from a JSON file by the application crate and passed to
/// the controller and the directions adapter.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NavConfig {
    /// Base URL of the directions service, without a trailing slash.
    pub directions_base_url: String,

    /// Routing profile path segment, e.g. `"mapbox/driving"`.
    pub directions_profile: String,

    /// Access token appended to every directions request.  May be empty for
    /// self-hosted services.
    pub access_token: String,

    /// Hard upper bound on a single route resolution.  Default: 10 s.
    pub route_timeout_secs: u64,

    /// Upper bound on geolocation acquisition.  Default: 5000 ms.
    pub geolocation_timeout_ms: u64,

    /// Origin used when geolocation times out or is denied.
    pub fallback_origin: Coordinate,

    /// Padding (pixels) passed to `fitBounds` after a route is drawn.
    pub fit_padding_px: u32,

    /// Zoom used when flying to the user's own position.
    pub fly_to_zoom: f64,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            directions_base_url:    "https://api.mapbox.com".to_string(),
            directions_profile:     "mapbox/driving".to_string(),
            access_token:           String::new(),
            route_timeout_secs:     10,
            geolocation_timeout_ms: 5_000,
            fallback_origin:        Coordinate::new(-74.006, 40.7128),
            fit_padding_px:         50,
            fly_to_zoom:            12.0,
        }
    }
}

impl NavConfig {
    #[inline]
    pub fn route_timeout(&self) -> Duration {
        Duration::from_secs(self.route_timeout_secs)
    }

    #[inline]
    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_millis(self.geolocation_timeout_ms)
    }

    /// Reject configurations that would make the engine misbehave silently.
    pub fn validate(&self) -> NavResult<()> {
        if self.directions_base_url.trim().is_empty() {
            return Err(NavError::Config("directions_base_url is empty".into()));
        }
        if self.directions_profile.trim().is_empty() {
            return Err(NavError::Config("directions_profile is empty".into()));
        }
        if self.route_timeout_secs == 0 {
            return Err(NavError::Config("route_timeout_secs must be > 0".into()));
        }
        if self.geolocation_timeout_ms == 0 {
            return Err(NavError::Config("geolocation_timeout_ms must be > 0".into()));
        }
        if !self.fallback_origin.is_valid() {
            return Err(NavError::Config(format!(
                "fallback_origin {} is outside WGS-84 range",
                self.fallback_origin
            )));
        }
        Ok(())
    }
}
