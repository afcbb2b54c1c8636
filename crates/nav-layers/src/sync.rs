//! `LayerSynchronizer`: idempotent upsert/remove over a [`MapSurface`].
//!
//! # Registry
//!
//! The synchronizer keeps a registry of every handle it has put on the
//! surface, keyed by logical id.  The registry is authoritative: an id is
//! either registered (and live on the surface) or absent from both.
//!
//! # Upsert
//!
//! | Registry state                | Action                                   |
//! |-------------------------------|------------------------------------------|
//! | absent                        | add source (unless shared) + layer       |
//! | live, same source and kind    | `set_source_data` / `set_marker_position` |
//! | live, different source/kind   | remove, then add                         |
//!
//! Markers have no source; their handle's `source_id` equals the marker id.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use tracing::{debug, error, trace};

use nav_core::{Bounds, Coordinate};

use crate::{LayerData, LayerError, LayerHandle, LayerKind, LayerResult, MapSurface};

/// What an [`upsert`][LayerSynchronizer::upsert] did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UpsertAction {
    Created,
    Updated,
    /// The id was live with a different kind or source and was rebuilt.
    Replaced,
}

/// A batch of mutations applied by [`LayerSynchronizer::apply`].
///
/// Every removal in the pass (explicit ids and stale prefix matches) reaches
/// the surface before any addition.
#[derive(Clone, Debug, Default)]
pub struct SyncPass {
    removals: Vec<String>,
    prefixes: Vec<String>,
    upserts:  Vec<(LayerHandle, LayerData)>,
}

impl SyncPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove(mut self, layer_id: impl Into<String>) -> Self {
        self.removals.push(layer_id.into());
        self
    }

    /// Remove every registered id under `prefix` that this pass does not
    /// upsert again.  Re-upserted ids are updated in place.
    pub fn replace_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    pub fn upsert(mut self, handle: LayerHandle, data: LayerData) -> Self {
        self.upserts.push((handle, data));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.prefixes.is_empty() && self.upserts.is_empty()
    }
}

/// Sole mutator of a map surface.
pub struct LayerSynchronizer<S: MapSurface> {
    surface: S,
    live:    BTreeMap<String, LayerHandle>,
}

impl<S: MapSurface> LayerSynchronizer<S> {
    pub fn new(surface: S) -> Self {
        Self { surface, live: BTreeMap::new() }
    }

    /// Read-only view of the surface.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Consume the synchronizer and hand the surface back.
    pub fn into_surface(self) -> S {
        self.surface
    }

    // ── Mutations ─────────────────────────────────────────────────────────

    /// Create or update the layer identified by `handle.layer_id`.
    ///
    /// Never creates a second layer for a live id.
    pub fn upsert(&mut self, handle: LayerHandle, data: &LayerData) -> LayerResult<UpsertAction> {
        if !data.fits(handle.kind) {
            return Err(LayerError::KindMismatch {
                id:   handle.layer_id,
                kind: handle.kind,
                data: data.label(),
            });
        }

        let replaced = match self.live.get(&handle.layer_id) {
            Some(live) if live.kind == handle.kind && live.source_id == handle.source_id => {
                self.update(&handle, data)?;
                trace!(layer_id = %handle.layer_id, "layer updated in place");
                return Ok(UpsertAction::Updated);
            }
            Some(_) => {
                self.remove(&handle.layer_id)?;
                true
            }
            None => false,
        };

        self.create(&handle, data)?;
        debug!(layer_id = %handle.layer_id, kind = ?handle.kind, replaced, "layer created");
        self.live.insert(handle.layer_id.clone(), handle);
        Ok(if replaced { UpsertAction::Replaced } else { UpsertAction::Created })
    }

    /// Remove a layer and, once no other layer draws from it, its source.
    /// Returns `false` (and touches nothing) if the id is not live.
    pub fn remove(&mut self, layer_id: &str) -> LayerResult<bool> {
        let Some(handle) = self.live.remove(layer_id) else {
            return Ok(false);
        };

        if handle.kind == LayerKind::Marker {
            self.surface.remove_marker(&handle.layer_id)?;
        } else {
            self.surface.remove_layer(&handle.layer_id)?;
            let shared = self.live.values().any(|h| h.kind != LayerKind::Marker && h.source_id == handle.source_id);
            if !shared {
                self.surface.remove_source(&handle.source_id)?;
            }
        }
        debug!(layer_id, "layer removed");
        Ok(true)
    }

    /// Remove every live id that starts with `prefix`.  Returns how many were
    /// removed.
    pub fn clear_by_prefix(&mut self, prefix: &str) -> LayerResult<usize> {
        let doomed: Vec<String> = self.ids_with_prefix(prefix).map(str::to_string).collect();
        for id in &doomed {
            self.remove(id)?;
        }
        if !doomed.is_empty() {
            debug!(prefix, removed = doomed.len(), "prefix cleared");
        }
        Ok(doomed.len())
    }

    /// Apply a [`SyncPass`]: explicit removals, then stale prefix matches,
    /// then upserts in the order given.
    pub fn apply(&mut self, pass: SyncPass) -> LayerResult<()> {
        let kept: BTreeSet<&str> = pass.upserts.iter().map(|(h, _)| h.layer_id.as_str()).collect();

        let mut stale = pass.removals;
        for prefix in &pass.prefixes {
            stale.extend(
                self.ids_with_prefix(prefix)
                    .filter(|id| !kept.contains(id))
                    .map(str::to_string),
            );
        }

        for id in &stale {
            self.remove(id)?;
        }
        for (handle, data) in pass.upserts {
            self.upsert(handle, &data)?;
        }
        Ok(())
    }

    pub fn fly_to(&mut self, center: Coordinate, zoom: f64) {
        trace!(%center, zoom, "fly to");
        self.surface.fly_to(center, zoom);
    }

    pub fn fit_bounds(&mut self, bounds: Bounds, padding_px: u32) {
        trace!(?bounds, padding_px, "fit bounds");
        self.surface.fit_bounds(bounds, padding_px);
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn is_live(&self, layer_id: &str) -> bool {
        self.live.contains_key(layer_id)
    }

    pub fn handle(&self, layer_id: &str) -> Option<&LayerHandle> {
        self.live.get(layer_id)
    }

    /// Live ids in lexical order.
    pub fn live_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.live.keys().map(String::as_str)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn ids_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        // Keys are sorted, so matches form one contiguous run.
        self.live
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .map(|(id, _)| id.as_str())
            .take_while(move |id| id.starts_with(prefix))
    }

    fn update(&mut self, handle: &LayerHandle, data: &LayerData) -> LayerResult<()> {
        match data {
            LayerData::Marker { at, popup } => {
                self.surface.set_marker_position(&handle.layer_id, *at, popup.as_deref())
            }
            _ => self.surface.set_source_data(&handle.source_id, data),
        }
    }

    fn create(&mut self, handle: &LayerHandle, data: &LayerData) -> LayerResult<()> {
        if let LayerData::Marker { at, popup } = data {
            if self.surface.has_marker(&handle.layer_id) {
                return Err(self.duplicate(&handle.layer_id));
            }
            return self.surface.add_marker(&handle.layer_id, *at, popup.as_deref());
        }

        if self.surface.has_layer(&handle.layer_id) {
            return Err(self.duplicate(&handle.layer_id));
        }

        let owned_source = self.live.values().any(|h| h.kind != LayerKind::Marker && h.source_id == handle.source_id);
        if owned_source {
            self.surface.set_source_data(&handle.source_id, data)?;
        } else if self.surface.has_source(&handle.source_id) {
            return Err(self.duplicate(&handle.source_id));
        } else {
            self.surface.add_source(&handle.source_id, data)?;
        }
        self.surface.add_layer(&handle.layer_id, &handle.source_id, handle.kind)
    }

    fn duplicate(&self, id: &str) -> LayerError {
        error!(id, "map surface already holds an id this synchronizer did not create");
        LayerError::DuplicateLayerId(id.to_string())
    }
}
