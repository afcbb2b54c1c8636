//! Navigation session state.

use std::fmt;

use nav_core::{GeoEntity, RequestId, format_distance, format_duration};
use nav_route::{RouteError, RouteResult};

/// Lifecycle of the single route shown on a map surface.
///
/// ```text
/// Idle ──navigate──▶ Resolving ──success──▶ Active
///                        │    └──failure──▶ Failed
/// any ──clear──▶ Idle
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum NavState {
    #[default]
    Idle,
    Resolving,
    Active,
    Failed,
}

impl NavState {
    /// `true` while a route is being resolved or shown.
    pub fn is_engaged(self) -> bool {
        matches!(self, NavState::Resolving | NavState::Active)
    }
}

/// Snapshot of the navigation state.  Owned and mutated by
/// [`NavigationController`][crate::NavigationController]; everyone else
/// receives clones.
#[derive(Clone, Debug, Default)]
pub struct NavigationSession {
    pub state:           NavState,
    pub selected_entity: Option<GeoEntity>,
    pub current_route:   Option<RouteResult>,
    /// Bumped by every `navigate_to` and `clear`; a completion whose
    /// generation no longer matches is stale.
    pub generation:      RequestId,
    pub last_failure:    Option<RouteError>,
}

/// Human-readable distance and duration of the active route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteSummary {
    pub distance: String,
    pub duration: String,
}

impl RouteSummary {
    pub fn of(route: &RouteResult) -> Self {
        Self {
            distance: format_distance(route.distance_meters),
            duration: format_duration(route.duration_seconds),
        }
    }
}

impl fmt::Display for RouteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} · {}", self.distance, self.duration)
    }
}
