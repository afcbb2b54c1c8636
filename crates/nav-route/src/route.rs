//! Route request and result values.

use std::time::Instant;

use nav_core::{Bounds, Coordinate, RequestId};

use crate::RouteError;

/// One navigation attempt.  Created by [`RouteClient`][crate::RouteClient]
/// when `resolve` is called.
#[derive(Clone, Debug)]
pub struct RouteRequest {
    pub id:          RequestId,
    pub origin:      Coordinate,
    pub destination: Coordinate,
    pub issued_at:   Instant,
}

/// A driving route exactly as reported by the directions service.
///
/// Units are untouched: metres and seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteResult {
    pub distance_meters:  f64,
    pub duration_seconds: f64,
    /// Ordered polyline from origin to destination.
    pub geometry:         Vec<Coordinate>,
}

impl RouteResult {
    /// Rectangle covering the whole polyline, `None` for an empty geometry.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::covering(self.geometry.iter().copied())
    }
}

/// The three possible ends of a `resolve` call.
#[derive(Clone, Debug, PartialEq)]
pub enum RouteOutcome {
    Success(RouteResult),
    /// Superseded by a newer request or an explicit cancel.  Not an error.
    Cancelled,
    Failed(RouteError),
}

impl RouteOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RouteOutcome::Cancelled)
    }

    pub fn route(&self) -> Option<&RouteResult> {
        match self {
            RouteOutcome::Success(r) => Some(r),
            _ => None,
        }
    }
}
