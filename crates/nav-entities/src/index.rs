//! The `GeoEntityIndex`: ordered entity storage with name search and a
//! spatial index.
//!
//! # Data layout
//!
//! Entities live in a `Vec` in load order; every query that returns a list
//! preserves that order.  Two side tables are rebuilt on every [`load`]:
//!
//! - `folded[i]`: the lowercase name of `entities[i]`, so search does not
//!   re-fold every name per query.
//! - an R-tree (via `rstar`) of `[lon, lat]` points for nearest-entity
//!   lookups.
//!
//! # Change notification
//!
//! Every [`load`] bumps a revision counter published on a
//! `tokio::sync::watch` channel.  Layer synchronisation subscribes to it and
//! performs a full resync when the revision moves.  Dropping the receiver is
//! the unsubscription.
//!
//! [`load`]: GeoEntityIndex::load

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use tokio::sync::watch;
use tracing::{debug, warn};

use nav_core::{Coordinate, EntityCategory, EntityId, GeoEntity};

#[cfg(feature = "fx-hash")]
type IdMap = rustc_hash::FxHashMap<EntityId, usize>;
#[cfg(not(feature = "fx-hash"))]
type IdMap = std::collections::HashMap<EntityId, usize>;

// ── R-tree entry ──────────────────────────────────────────────────────────────

/// Entry stored in the R-tree: a `[lon, lat]` point and its slot in the
/// ordered entity vector.
#[derive(Clone)]
struct EntityEntry {
    point: [f64; 2],
    slot:  usize,
}

impl RTreeObject for EntityEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for EntityEntry {
    /// Squared Euclidean distance in lon/lat space.  Good enough for ranking
    /// neighbours within a city.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlon = self.point[0] - point[0];
        let dlat = self.point[1] - point[1];
        dlon * dlon + dlat * dlat
    }
}

// ── GeoEntityIndex ────────────────────────────────────────────────────────────

/// In-memory searchable collection of points of interest.
pub struct GeoEntityIndex {
    entities: Vec<GeoEntity>,
    folded:   Vec<String>,
    by_id:    IdMap,
    spatial:  RTree<EntityEntry>,
    revision: watch::Sender<u64>,
}

impl Default for GeoEntityIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl GeoEntityIndex {
    /// An empty index at revision 0.
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            entities: Vec::new(),
            folded:   Vec::new(),
            by_id:    IdMap::default(),
            spatial:  RTree::new(),
            revision,
        }
    }

    /// Replace the entire index with `entities`.
    ///
    /// If an id occurs more than once, the last occurrence wins and the
    /// earlier ones are dropped.  Returns the new revision, which is also
    /// published to every [`subscribe`][Self::subscribe]r.
    pub fn load<I>(&mut self, entities: I) -> u64
    where
        I: IntoIterator<Item = GeoEntity>,
    {
        let incoming: Vec<GeoEntity> = entities.into_iter().collect();

        // Last occurrence of each id decides which copy is kept.
        let mut last_seen = IdMap::default();
        for (i, e) in incoming.iter().enumerate() {
            last_seen.insert(e.id, i);
        }
        let duplicates = incoming.len() - last_seen.len();
        if duplicates > 0 {
            warn!(duplicates, "entity dataset contains duplicate ids; keeping the last occurrence");
        }

        let kept: Vec<GeoEntity> = incoming
            .into_iter()
            .enumerate()
            .filter(|(i, e)| last_seen.get(&e.id) == Some(i))
            .map(|(_, e)| e)
            .collect();

        self.folded = kept.iter().map(|e| e.name.to_lowercase()).collect();
        self.by_id = kept.iter().enumerate().map(|(slot, e)| (e.id, slot)).collect();
        self.spatial = RTree::bulk_load(
            kept.iter()
                .enumerate()
                .map(|(slot, e)| EntityEntry { point: e.coordinate.to_array(), slot })
                .collect(),
        );
        self.entities = kept;

        let mut next = 0;
        self.revision.send_modify(|r| {
            *r += 1;
            next = *r;
        });
        debug!(revision = next, count = self.entities.len(), "entity index reloaded");
        next
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// Every entity whose name contains `query`, case-insensitively, in load
    /// order.  An empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<GeoEntity> {
        self.matching(&query.to_lowercase(), None)
    }

    /// Like [`search`][Self::search], restricted to one category.
    pub fn search_category(&self, category: EntityCategory, query: &str) -> Vec<GeoEntity> {
        self.matching(&query.to_lowercase(), Some(category))
    }

    pub fn get(&self, id: EntityId) -> Option<&GeoEntity> {
        self.by_id.get(&id).map(|&slot| &self.entities[slot])
    }

    /// Up to `k` entities closest to `pos`, nearest first.
    pub fn nearest(&self, pos: Coordinate, k: usize) -> Vec<GeoEntity> {
        self.spatial
            .nearest_neighbor_iter(&pos.to_array())
            .take(k)
            .map(|e| self.entities[e.slot].clone())
            .collect()
    }

    /// Up to `k` entities of `category` closest to `pos`, nearest first.
    pub fn nearest_in(&self, category: EntityCategory, pos: Coordinate, k: usize) -> Vec<GeoEntity> {
        self.spatial
            .nearest_neighbor_iter(&pos.to_array())
            .map(|e| &self.entities[e.slot])
            .filter(|e| e.category == category)
            .take(k)
            .cloned()
            .collect()
    }

    /// All entities in load order.
    pub fn iter(&self) -> impl Iterator<Item = &GeoEntity> + '_ {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    // ── Change notification ───────────────────────────────────────────────

    /// Current revision; 0 until the first [`load`][Self::load].
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Receiver that observes every subsequent revision.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    // ── Internals ─────────────────────────────────────────────────────────

    #[cfg(not(feature = "parallel"))]
    fn matching(&self, needle: &str, category: Option<EntityCategory>) -> Vec<GeoEntity> {
        self.entities
            .iter()
            .zip(&self.folded)
            .filter(|(e, name)| category.is_none_or(|c| e.category == c) && name.contains(needle))
            .map(|(e, _)| e.clone())
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn matching(&self, needle: &str, category: Option<EntityCategory>) -> Vec<GeoEntity> {
        use rayon::prelude::*;

        // Indexed parallel iterators collect in source order.
        self.entities
            .par_iter()
            .zip(self.folded.par_iter())
            .filter(|(e, name)| category.is_none_or(|c| e.category == c) && name.contains(needle))
            .map(|(e, _)| e.clone())
            .collect()
    }
}
