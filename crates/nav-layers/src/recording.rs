//! `RecordingSurface`, an in-memory `MapSurface` for headless runs and tests.
//!
//! Holds the current sources, layers and markers and appends every mutation to
//! an operation log.  Adding an id twice or touching an absent id returns
//! `LayerError::Surface`, so an upsert-discipline bug shows up as an error
//! instead of silently duplicating state.

use std::collections::BTreeMap;

use nav_core::{Bounds, Coordinate};

use crate::{LayerData, LayerError, LayerKind, LayerResult, MapSurface};

/// One mutation observed by a [`RecordingSurface`].
#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceOp {
    AddSource(String),
    SetSourceData(String),
    RemoveSource(String),
    AddLayer(String),
    RemoveLayer(String),
    AddMarker(String),
    MoveMarker(String),
    RemoveMarker(String),
    FlyTo { center: Coordinate, zoom: f64 },
    FitBounds { bounds: Bounds, padding_px: u32 },
}

impl SurfaceOp {
    /// `true` for operations that take something off the surface.
    pub fn is_removal(&self) -> bool {
        matches!(self, SurfaceOp::RemoveSource(_) | SurfaceOp::RemoveLayer(_) | SurfaceOp::RemoveMarker(_))
    }

    /// `true` for operations that put something new on the surface.
    pub fn is_addition(&self) -> bool {
        matches!(self, SurfaceOp::AddSource(_) | SurfaceOp::AddLayer(_) | SurfaceOp::AddMarker(_))
    }
}

/// A marker as currently shown.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerState {
    pub at:    Coordinate,
    pub popup: Option<String>,
}

#[derive(Default)]
pub struct RecordingSurface {
    sources: BTreeMap<String, LayerData>,
    layers:  BTreeMap<String, (String, LayerKind)>,
    markers: BTreeMap<String, MarkerState>,
    camera:  Option<(Coordinate, f64)>,
    fitted:  Option<(Bounds, u32)>,
    ops:     Vec<SurfaceOp>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self, source_id: &str) -> Option<&LayerData> {
        self.sources.get(source_id)
    }

    /// Source id and kind of a layer.
    pub fn layer(&self, layer_id: &str) -> Option<(&str, LayerKind)> {
        self.layers.get(layer_id).map(|(src, kind)| (src.as_str(), *kind))
    }

    pub fn marker(&self, marker_id: &str) -> Option<&MarkerState> {
        self.markers.get(marker_id)
    }

    /// Marker ids in lexical order.
    pub fn marker_ids(&self) -> Vec<&str> {
        self.markers.keys().map(String::as_str).collect()
    }

    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.keys().map(String::as_str).collect()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Last `fly_to` target and zoom.
    pub fn camera(&self) -> Option<(Coordinate, f64)> {
        self.camera
    }

    /// Last `fit_bounds` call.
    pub fn fitted(&self) -> Option<(Bounds, u32)> {
        self.fitted
    }

    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    /// Drain the operation log, leaving state untouched.
    pub fn take_ops(&mut self) -> Vec<SurfaceOp> {
        std::mem::take(&mut self.ops)
    }
}

fn missing(what: &str, id: &str) -> LayerError {
    LayerError::Surface(format!("{what} {id:?} does not exist"))
}

fn exists(what: &str, id: &str) -> LayerError {
    LayerError::Surface(format!("{what} {id:?} already exists"))
}

impl MapSurface for RecordingSurface {
    fn has_source(&self, source_id: &str) -> bool {
        self.sources.contains_key(source_id)
    }

    fn add_source(&mut self, source_id: &str, data: &LayerData) -> LayerResult<()> {
        if self.sources.contains_key(source_id) {
            return Err(exists("source", source_id));
        }
        self.sources.insert(source_id.to_string(), data.clone());
        self.ops.push(SurfaceOp::AddSource(source_id.to_string()));
        Ok(())
    }

    fn set_source_data(&mut self, source_id: &str, data: &LayerData) -> LayerResult<()> {
        let slot = self.sources.get_mut(source_id).ok_or_else(|| missing("source", source_id))?;
        *slot = data.clone();
        self.ops.push(SurfaceOp::SetSourceData(source_id.to_string()));
        Ok(())
    }

    fn remove_source(&mut self, source_id: &str) -> LayerResult<()> {
        if self.layers.values().any(|(src, _)| src == source_id) {
            return Err(LayerError::Surface(format!("source {source_id:?} is still in use by a layer")));
        }
        self.sources.remove(source_id).ok_or_else(|| missing("source", source_id))?;
        self.ops.push(SurfaceOp::RemoveSource(source_id.to_string()));
        Ok(())
    }

    fn has_layer(&self, layer_id: &str) -> bool {
        self.layers.contains_key(layer_id)
    }

    fn add_layer(&mut self, layer_id: &str, source_id: &str, kind: LayerKind) -> LayerResult<()> {
        if self.layers.contains_key(layer_id) {
            return Err(exists("layer", layer_id));
        }
        if !self.sources.contains_key(source_id) {
            return Err(missing("source", source_id));
        }
        self.layers.insert(layer_id.to_string(), (source_id.to_string(), kind));
        self.ops.push(SurfaceOp::AddLayer(layer_id.to_string()));
        Ok(())
    }

    fn remove_layer(&mut self, layer_id: &str) -> LayerResult<()> {
        self.layers.remove(layer_id).ok_or_else(|| missing("layer", layer_id))?;
        self.ops.push(SurfaceOp::RemoveLayer(layer_id.to_string()));
        Ok(())
    }

    fn has_marker(&self, marker_id: &str) -> bool {
        self.markers.contains_key(marker_id)
    }

    fn add_marker(&mut self, marker_id: &str, at: Coordinate, popup: Option<&str>) -> LayerResult<()> {
        if self.markers.contains_key(marker_id) {
            return Err(exists("marker", marker_id));
        }
        let state = MarkerState { at, popup: popup.map(str::to_string) };
        self.markers.insert(marker_id.to_string(), state);
        self.ops.push(SurfaceOp::AddMarker(marker_id.to_string()));
        Ok(())
    }

    fn set_marker_position(&mut self, marker_id: &str, at: Coordinate, popup: Option<&str>) -> LayerResult<()> {
        let marker = self.markers.get_mut(marker_id).ok_or_else(|| missing("marker", marker_id))?;
        marker.at = at;
        marker.popup = popup.map(str::to_string);
        self.ops.push(SurfaceOp::MoveMarker(marker_id.to_string()));
        Ok(())
    }

    fn remove_marker(&mut self, marker_id: &str) -> LayerResult<()> {
        self.markers.remove(marker_id).ok_or_else(|| missing("marker", marker_id))?;
        self.ops.push(SurfaceOp::RemoveMarker(marker_id.to_string()));
        Ok(())
    }

    fn fly_to(&mut self, center: Coordinate, zoom: f64) {
        self.camera = Some((center, zoom));
        self.ops.push(SurfaceOp::FlyTo { center, zoom });
    }

    fn fit_bounds(&mut self, bounds: Bounds, padding_px: u32) {
        self.fitted = Some((bounds, padding_px));
        self.ops.push(SurfaceOp::FitBounds { bounds, padding_px });
    }
}
