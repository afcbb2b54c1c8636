//! `nav-entities` — the searchable point-of-interest index.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                     |
//! |------------|--------------------------------------------------------------|
//! | [`index`]  | `GeoEntityIndex`: ordered store, name search, R-tree lookup  |
//! | [`loader`] | CSV / JSON dataset loaders                                   |
//! | [`error`]  | `EntityError`, `EntityResult<T>`                             |
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                    |
//! |------------|-----------------------------------------------------------|
//! | `parallel` | Name search runs on Rayon's pool (order preserved).       |
//! | `fx-hash`  | FxHash for the id map.                                    |

pub mod error;
pub mod index;
pub mod loader;


pub use error::{EntityError, EntityResult};
pub use index::GeoEntityIndex;
pub use loader::{load_entities_csv, load_entities_json, load_entities_json_reader, load_entities_reader};
