//! Directions-service trait and the HTTP adapter.
//!
//! # Pluggability
//!
//! [`RouteClient`][crate::RouteClient] calls the service through the
//! [`DirectionsService`] trait, so tests inject canned routes and
//! applications can swap providers without touching the client.
//!
//! # Wire format
//!
//! [`HttpDirections`] speaks the Mapbox Directions v5 format:
//!
//! ```text
//! GET {base}/directions/v5/{profile}/{lon},{lat};{lon},{lat}?geometries=geojson&overview=full&access_token=…
//!
//! { "routes": [ { "distance": 1520.3, "duration": 245.1,
//!                 "geometry": { "coordinates": [[lon, lat], …] } } ] }
//! ```
//!
//! Absent or empty `routes` means [`RouteError::NotFound`].

use std::future::Future;
use std::sync::Arc;

use serde::Deserialize;
use tracing::trace;

use nav_core::{Coordinate, NavConfig};

use crate::{HttpClient, RouteError, RouteResult};

// ── DirectionsService trait ───────────────────────────────────────────────────

/// Resolves one origin/destination pair into a route.
pub trait DirectionsService: Send + Sync {
    fn directions(
        &self,
        origin:      Coordinate,
        destination: Coordinate,
    ) -> impl Future<Output = Result<RouteResult, RouteError>> + Send;

    /// Whether dropping the in-flight future actually aborts the request.
    ///
    /// When `false`, the client lets a superseded call run to completion and
    /// discards its result by request id instead.
    fn supports_abort(&self) -> bool {
        true
    }
}

impl<T: DirectionsService> DirectionsService for Arc<T> {
    fn directions(
        &self,
        origin:      Coordinate,
        destination: Coordinate,
    ) -> impl Future<Output = Result<RouteResult, RouteError>> + Send {
        (**self).directions(origin, destination)
    }

    fn supports_abort(&self) -> bool {
        (**self).supports_abort()
    }
}

// ── HttpDirections ────────────────────────────────────────────────────────────

/// [`DirectionsService`] over HTTP.
pub struct HttpDirections<C: HttpClient> {
    client:       C,
    base_url:     String,
    profile:      String,
    access_token: String,
}

impl<C: HttpClient> HttpDirections<C> {
    pub fn new(
        client:       C,
        base_url:     impl Into<String>,
        profile:      impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url:     base_url.into().trim_end_matches('/').to_string(),
            profile:      profile.into().trim_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    /// Adapter configured from the directions fields of `config`.
    pub fn from_config(client: C, config: &NavConfig) -> Self {
        Self::new(
            client,
            config.directions_base_url.as_str(),
            config.directions_profile.as_str(),
            config.access_token.as_str(),
        )
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Request URL for one origin/destination pair.
    pub fn url_for(&self, origin: Coordinate, destination: Coordinate) -> String {
        let mut url = format!(
            "{}/directions/v5/{}/{};{}?geometries=geojson&overview=full",
            self.base_url, self.profile, origin, destination
        );
        if !self.access_token.is_empty() {
            url.push_str("&access_token=");
            url.push_str(&self.access_token);
        }
        url
    }
}

impl<C: HttpClient> DirectionsService for HttpDirections<C> {
    async fn directions(
        &self,
        origin:      Coordinate,
        destination: Coordinate,
    ) -> Result<RouteResult, RouteError> {
        let url = self.url_for(origin, destination);
        let body = self.client.get(&url).await?;
        trace!(bytes = body.len(), "directions response received");
        parse_directions(&body)
    }
}

// ── Response parsing ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Option<Vec<RouteRecord>>,
}

#[derive(Deserialize)]
struct RouteRecord {
    distance: f64,
    duration: f64,
    geometry: GeometryRecord,
}

#[derive(Deserialize)]
struct GeometryRecord {
    coordinates: Vec<[f64; 2]>,
}

/// Decode a directions response body, taking the first route.
pub fn parse_directions(body: &[u8]) -> Result<RouteResult, RouteError> {
    let response: DirectionsResponse =
        serde_json::from_slice(body).map_err(|e| RouteError::Decode(e.to_string()))?;

    let route = response
        .routes
        .and_then(|routes| routes.into_iter().next())
        .ok_or(RouteError::NotFound)?;

    Ok(RouteResult {
        distance_meters:  route.distance,
        duration_seconds: route.duration,
        geometry:         route.geometry.coordinates.into_iter().map(Coordinate::from).collect(),
    })
}
