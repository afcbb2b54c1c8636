//! `nav-layers` — the sole mutator of the shared map surface.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                     |
//! |---------------|--------------------------------------------------------------|
//! | [`surface`]   | `MapSurface` trait, `LayerData`, `LayerKind`, `PointFeature` |
//! | [`handle`]    | `LayerHandle` and the fixed logical ids                      |
//! | [`sync`]      | `LayerSynchronizer<S>`, `SyncPass`, `UpsertAction`           |
//! | [`recording`] | `RecordingSurface`, in-memory surface with an op log         |
//! | [`error`]     | `LayerError`, `LayerResult<T>`                               |
//!
//! Every other component expresses intents ("upsert route", "remove marker")
//! through [`LayerSynchronizer`]; nothing else holds the surface.

pub mod error;
pub mod handle;
pub mod recording;
pub mod surface;
pub mod sync;


pub use error::{LayerError, LayerResult};
pub use handle::{LayerHandle, ids};
pub use recording::{MarkerState, RecordingSurface, SurfaceOp};
pub use surface::{LayerData, LayerKind, MapSurface, PointFeature};
pub use sync::{LayerSynchronizer, SyncPass, UpsertAction};
