//! `nav-core` — foundational types for the `rust_nav` route-synchronization
//! engine.
//!
//! This crate is a dependency of every other `nav-*` crate.  It has no
//! `nav-*` dependencies and minimal external ones (only `thiserror`, plus
//! optional `serde`).
//!
//! # What lives here
//!
//! | Module       | Contents                                                 |
//! |--------------|----------------------------------------------------------|
//! | [`ids`]      | `EntityId`, `RequestId`                                  |
//! | [`geo`]      | `Coordinate`, `Bounds`, haversine distance               |
//! | [`entity`]   | `GeoEntity`, `EntityCategory`                            |
//! | [`config`]   | `NavConfig`                                              |
//! | [`format`]   | `format_distance`, `format_duration`                     |
//! | [`error`]    | `NavError`, `NavResult`                                  |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod config;
pub mod entity;
pub mod error;
pub mod format;
pub mod geo;
pub mod ids;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::NavConfig;
pub use entity::{EntityCategory, GeoEntity};
pub use error::{NavError, NavResult};
pub use format::{format_distance, format_duration};
pub use geo::{Bounds, Coordinate};
pub use ids::{EntityId, RequestId};
