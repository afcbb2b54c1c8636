//! The `MapSurface` trait implemented by map backends.
//!
//! The surface is an external imperative handle (a WebGL map in the browser,
//! a native map view, or [`RecordingSurface`][crate::RecordingSurface] for
//! headless runs).  It is injected into [`LayerSynchronizer`][crate::LayerSynchronizer]
//! rather than reached through global state.

use nav_core::{Bounds, Coordinate, EntityId};

use crate::LayerResult;

/// How a layer is rendered.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Line,
    Circle,
    Symbol,
    /// A DOM-style marker with an optional popup.  Has no separate source.
    Marker,
}

/// A labelled point inside a circle or symbol source.
#[derive(Clone, Debug, PartialEq)]
pub struct PointFeature {
    pub id:         EntityId,
    pub coordinate: Coordinate,
    pub label:      String,
}

/// The payload of a source (or the position of a marker).
#[derive(Clone, Debug, PartialEq)]
pub enum LayerData {
    Line(Vec<Coordinate>),
    Points(Vec<PointFeature>),
    Marker {
        at:    Coordinate,
        popup: Option<String>,
    },
}

impl LayerData {
    /// `true` if a layer of `kind` can display this payload.
    pub fn fits(&self, kind: LayerKind) -> bool {
        matches!(
            (self, kind),
            (LayerData::Line(_), LayerKind::Line)
                | (LayerData::Points(_), LayerKind::Circle | LayerKind::Symbol)
                | (LayerData::Marker { .. }, LayerKind::Marker)
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            LayerData::Line(_) => "line",
            LayerData::Points(_) => "points",
            LayerData::Marker { .. } => "marker",
        }
    }
}

/// Imperative operations exposed by a map backend.
///
/// Adding an id that already exists, or updating/removing one that does not,
/// is an error from the surface's point of view; the synchronizer never does
/// either.
pub trait MapSurface: Send {
    fn has_source(&self, source_id: &str) -> bool;
    fn add_source(&mut self, source_id: &str, data: &LayerData) -> LayerResult<()>;
    /// Replace the data of an existing source in place (`getSource().setData`).
    fn set_source_data(&mut self, source_id: &str, data: &LayerData) -> LayerResult<()>;
    fn remove_source(&mut self, source_id: &str) -> LayerResult<()>;

    fn has_layer(&self, layer_id: &str) -> bool;
    fn add_layer(&mut self, layer_id: &str, source_id: &str, kind: LayerKind) -> LayerResult<()>;
    fn remove_layer(&mut self, layer_id: &str) -> LayerResult<()>;

    fn has_marker(&self, marker_id: &str) -> bool;
    fn add_marker(&mut self, marker_id: &str, at: Coordinate, popup: Option<&str>) -> LayerResult<()>;
    fn set_marker_position(&mut self, marker_id: &str, at: Coordinate, popup: Option<&str>) -> LayerResult<()>;
    fn remove_marker(&mut self, marker_id: &str) -> LayerResult<()>;

    fn fly_to(&mut self, center: Coordinate, zoom: f64);
    fn fit_bounds(&mut self, bounds: Bounds, padding_px: u32);
}
