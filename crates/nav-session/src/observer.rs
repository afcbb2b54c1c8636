//! Navigation observer trait for UI notices and state tracking.

use parking_lot::Mutex;

use nav_route::RouteResult;

use crate::NavState;

/// Callbacks invoked by [`NavigationController`][crate::NavigationController]
/// after each state change has been committed.
///
/// All methods have default no-op implementations.  They take `&self`
/// because the controller is shared across concurrent navigations; use
/// interior mutability to record anything.
pub trait NavigationObserver: Send + Sync {
    fn on_state_change(&self, _from: NavState, _to: NavState) {}

    /// A route was accepted and drawn.
    fn on_route_applied(&self, _route: &RouteResult) {}

    /// A non-blocking, user-facing message (toast), e.g. "No route available".
    fn on_notice(&self, _message: &str) {}
}

/// A [`NavigationObserver`] that does nothing.
pub struct NoopObserver;

impl NavigationObserver for NoopObserver {}

/// Records notices and state transitions in memory.
#[derive(Default)]
pub struct NoticeLog {
    notices:     Mutex<Vec<String>>,
    transitions: Mutex<Vec<(NavState, NavState)>>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().clone()
    }

    pub fn transitions(&self) -> Vec<(NavState, NavState)> {
        self.transitions.lock().clone()
    }
}

impl NavigationObserver for NoticeLog {
    fn on_state_change(&self, from: NavState, to: NavState) {
        self.transitions.lock().push((from, to));
    }

    fn on_notice(&self, message: &str) {
        self.notices.lock().push(message.to_string());
    }
}
