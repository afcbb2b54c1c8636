//! `nav-session` — the navigation session and the selection binding that
//! drives it.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                    |
//! |-----------------|-------------------------------------------------------------|
//! | [`state`]       | `NavState`, `NavigationSession`, `RouteSummary`             |
//! | [`controller`]  | `NavigationController<D, S, O>`, `PendingNavigation`        |
//! | [`binding`]     | `SelectionBinding`, `SelectionSource`, `SelectionEvent`     |
//! | [`geolocation`] | `GeolocationProvider` trait, origin acquisition w/ fallback |
//! | [`observer`]    | `NavigationObserver`, `NoopObserver`, `NoticeLog`           |
//! | [`error`]       | `SessionError`, `SessionResult<T>`                          |
//!
//! # Locking
//!
//! The controller guards the session and the layer synchronizer with
//! separate `parking_lot` mutexes.  They are always taken in the order
//! session → layers and never held across an `.await`.

pub mod binding;
pub mod controller;
pub mod error;
pub mod geolocation;
pub mod observer;
pub mod state;

#[cfg(test)]
mod tests;

pub use binding::{SelectionBinding, SelectionEvent, SelectionSource};
pub use controller::{NavigationController, PendingNavigation};
pub use error::{SessionError, SessionResult};
pub use geolocation::{FixedPosition, GeolocationError, GeolocationProvider, OriginFix, OriginSource, acquire_origin};
pub use observer::{NavigationObserver, NoopObserver, NoticeLog};
pub use state::{NavState, NavigationSession, RouteSummary};
