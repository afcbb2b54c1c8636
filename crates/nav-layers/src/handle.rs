//! Layer handles and the logical ids used across the engine.

use crate::LayerKind;

/// Fixed logical ids.  Each maps to at most one live handle.
pub mod ids {
    /// Driving route polyline.
    pub const ROUTE: &str = "route";
    /// Business symbol layer.
    pub const BUSINESS_ICONS: &str = "business-icons";
    /// Business circle layer.
    pub const BUSINESS_CIRCLES: &str = "business-circles";
    /// Point source shared by the two business layers.
    pub const BUSINESS_SOURCE: &str = "businesses";
    /// The user's own position.
    pub const SELF_MARKER: &str = "self-marker";
    /// The currently selected entity.
    pub const SELECTION_MARKER: &str = "selection-marker";
    /// Prefix of per-entity markers; the full id is `entity-marker:<id>`.
    pub const ENTITY_MARKER_PREFIX: &str = "entity-marker:";
}

/// A mutation applied to the map surface, identified by `layer_id`.
///
/// Several layers may draw from one source (icons and circles over the same
/// points); the source is removed only when its last layer goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerHandle {
    pub layer_id:  String,
    pub source_id: String,
    pub kind:      LayerKind,
}

impl LayerHandle {
    /// A handle whose source shares the layer's id.
    pub fn new(layer_id: impl Into<String>, kind: LayerKind) -> Self {
        let layer_id = layer_id.into();
        Self { source_id: layer_id.clone(), layer_id, kind }
    }

    /// A handle drawing from a named (possibly shared) source.
    pub fn with_source(layer_id: impl Into<String>, source_id: impl Into<String>, kind: LayerKind) -> Self {
        Self { layer_id: layer_id.into(), source_id: source_id.into(), kind }
    }

    pub fn line(layer_id: impl Into<String>) -> Self {
        Self::new(layer_id, LayerKind::Line)
    }

    pub fn marker(marker_id: impl Into<String>) -> Self {
        Self::new(marker_id, LayerKind::Marker)
    }

    /// `entity-marker:<id>` handle for a per-entity marker.
    pub fn entity_marker(entity: nav_core::EntityId) -> Self {
        Self::marker(format!("{}{}", ids::ENTITY_MARKER_PREFIX, entity.0))
    }
}
