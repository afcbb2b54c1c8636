//! `SelectionBinding` turns selection events into navigations and keeps
//! the self and selection markers in sync.
//!
//! # Sources
//!
//! Each producer of selection events (search box, business list, deep-link
//! router) calls [`SelectionBinding::register_source`] and emits through the
//! returned [`SelectionSource`].  Dropping the source unregisters it; events
//! it queued but that were not yet dispatched are discarded.
//!
//! # Readiness
//!
//! Entity layers need both a map that can take layers and a loaded dataset.
//! The two arrive in either order:
//!
//! ```text
//! map_ready()      ─┐
//!                   ├─▶ sync_entities()  (and again on every index revision)
//! dataset_ready()  ─┘
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use nav_core::{Coordinate, EntityCategory, EntityId, GeoEntity, NavConfig};
use nav_entities::{GeoEntityIndex, load_entities_csv};
use nav_layers::{LayerData, LayerHandle, LayerKind, MapSurface, PointFeature, SyncPass, ids};
use nav_route::{DirectionsService, RouteOutcome};

use crate::{
    GeolocationProvider, NavigationController, NavigationObserver, NoopObserver, OriginFix, PendingNavigation,
    SessionError, SessionResult, acquire_origin,
};

/// Popup text of the self marker.
const SELF_POPUP: &str = "You are here";

/// An external selection.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectionEvent {
    /// A text-search result was picked.
    SearchResult(EntityId),
    /// A row in an entity list was clicked.
    ListClick(EntityId),
    /// An origin/destination pair supplied from outside, e.g. a deep link.
    DeepLink {
        origin:      Coordinate,
        destination: EntityId,
    },
    Clear,
}

struct Envelope {
    source: u64,
    event:  SelectionEvent,
}

type Registry = Arc<Mutex<BTreeMap<u64, String>>>;

/// Registration handle for one selection producer.  Unregisters on drop.
pub struct SelectionSource {
    id:       u64,
    name:     String,
    tx:       mpsc::UnboundedSender<Envelope>,
    registry: Registry,
}

impl SelectionSource {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue `event` for the binding.  Returns `false` if the binding is gone.
    pub fn emit(&self, event: SelectionEvent) -> bool {
        self.tx.send(Envelope { source: self.id, event }).is_ok()
    }
}

impl Drop for SelectionSource {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.id);
        debug!(source = %self.name, "selection source unregistered");
    }
}

#[derive(Default)]
struct Readiness {
    map:             bool,
    dataset:         bool,
    synced_revision: Option<u64>,
}

/// Couples selected entities to a [`NavigationController`] and the map
/// markers.
pub struct SelectionBinding<D, S, O = NoopObserver>
where
    D: DirectionsService,
    S: MapSurface,
    O: NavigationObserver,
{
    controller:  Arc<NavigationController<D, S, O>>,
    index:       Arc<RwLock<GeoEntityIndex>>,
    config:      NavConfig,
    tx:          mpsc::UnboundedSender<Envelope>,
    rx:          Mutex<Option<mpsc::UnboundedReceiver<Envelope>>>,
    registry:    Registry,
    next_source: AtomicU64,
    readiness:   Mutex<Readiness>,
}

impl<D, S, O> SelectionBinding<D, S, O>
where
    D: DirectionsService,
    S: MapSurface,
    O: NavigationObserver,
{
    pub fn new(
        controller: Arc<NavigationController<D, S, O>>,
        index:      Arc<RwLock<GeoEntityIndex>>,
        config:     &NavConfig,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            controller,
            index,
            config:      config.clone(),
            tx,
            rx:          Mutex::new(Some(rx)),
            registry:    Registry::default(),
            next_source: AtomicU64::new(1),
            readiness:   Mutex::new(Readiness::default()),
        }
    }

    pub fn controller(&self) -> &Arc<NavigationController<D, S, O>> {
        &self.controller
    }

    pub fn index(&self) -> &Arc<RwLock<GeoEntityIndex>> {
        &self.index
    }

    /// Case-insensitive name search over the current dataset.
    pub fn search(&self, query: &str) -> Vec<GeoEntity> {
        self.index.read().search(query)
    }

    // ── Sources ───────────────────────────────────────────────────────────

    pub fn register_source(&self, name: impl Into<String>) -> SelectionSource {
        let id = self.next_source.fetch_add(1, Ordering::Relaxed);
        let name = name.into();
        self.registry.lock().insert(id, name.clone());
        debug!(source = %name, "selection source registered");
        SelectionSource { id, name, tx: self.tx.clone(), registry: Arc::clone(&self.registry) }
    }

    /// Names of the currently registered sources, in registration order.
    pub fn sources(&self) -> Vec<String> {
        self.registry.lock().values().cloned().collect()
    }

    // ── Selection ─────────────────────────────────────────────────────────

    /// Move the selection marker to `id` and navigate there.
    pub async fn navigate_to(&self, id: EntityId) -> SessionResult<RouteOutcome> {
        let pending = self.begin_navigation(id)?;
        self.controller.finish_navigation(pending).await
    }

    /// Clear the route and remove the selection marker.
    pub fn clear(&self) -> SessionResult<()> {
        self.controller.clear_with(|layers| layers.remove(ids::SELECTION_MARKER).map(drop))
    }

    /// Commit the selection of `id`: the selection marker moves in the same
    /// critical section that makes this the current navigation.
    fn begin_navigation(&self, id: EntityId) -> SessionResult<PendingNavigation> {
        let entity = self.index.read().get(id).cloned().ok_or(SessionError::UnknownEntity(id))?;
        let marker = LayerData::Marker { at: entity.coordinate, popup: Some(entity.name.clone()) };
        self.controller.begin_navigation(entity, |layers| {
            layers.upsert(LayerHandle::marker(ids::SELECTION_MARKER), &marker).map(drop)
        })
    }

    /// Apply one event directly, bypassing the source queue.  Returns the
    /// route outcome for navigating events.
    pub async fn handle(&self, event: SelectionEvent) -> SessionResult<Option<RouteOutcome>> {
        match event {
            SelectionEvent::SearchResult(id) | SelectionEvent::ListClick(id) => {
                self.navigate_to(id).await.map(Some)
            }
            SelectionEvent::DeepLink { origin, destination } => {
                self.set_origin(origin)?;
                self.navigate_to(destination).await.map(Some)
            }
            SelectionEvent::Clear => self.clear().map(|()| None),
        }
    }

    // ── Origin ────────────────────────────────────────────────────────────

    /// Use `origin` for future navigations and move the self marker there.
    pub fn set_origin(&self, origin: Coordinate) -> SessionResult<()> {
        let marker = LayerData::Marker { at: origin, popup: Some(SELF_POPUP.to_string()) };
        self.controller
            .with_layers(|layers| layers.upsert(LayerHandle::marker(ids::SELF_MARKER), &marker))?;
        self.controller.set_origin(origin);
        Ok(())
    }

    /// Acquire the device position (falling back per config), place the self
    /// marker and fly to it.
    pub async fn init_origin<P: GeolocationProvider>(&self, provider: &P) -> SessionResult<OriginFix> {
        let fix = acquire_origin(provider, self.config.geolocation_timeout(), self.config.fallback_origin).await;
        self.set_origin(fix.coordinate)?;
        self.controller.with_layers(|layers| layers.fly_to(fix.coordinate, self.config.fly_to_zoom));
        info!(origin = %fix.coordinate, source = ?fix.source, "origin initialised");
        Ok(fix)
    }

    // ── Readiness ─────────────────────────────────────────────────────────

    /// The map can take layers.  Returns `true` if entity layers were
    /// populated by this call.
    pub fn map_ready(&self) -> SessionResult<bool> {
        self.readiness.lock().map = true;
        debug!("map ready");
        self.sync_entities()
    }

    /// The entity dataset is loaded into the index.  Returns `true` if entity
    /// layers were populated by this call.
    pub fn dataset_ready(&self) -> SessionResult<bool> {
        self.readiness.lock().dataset = true;
        debug!("dataset ready");
        self.sync_entities()
    }

    /// Replace the index with a CSV dataset and mark the dataset ready.
    /// Returns the new index revision.
    pub fn load_dataset_csv(&self, path: &Path) -> SessionResult<u64> {
        let entities = load_entities_csv(path)?;
        let revision = self.index.write().load(entities);
        self.dataset_ready()?;
        Ok(revision)
    }

    pub fn is_ready(&self) -> bool {
        let r = self.readiness.lock();
        r.map && r.dataset
    }

    /// Index revision the entity layers currently reflect.
    pub fn synced_revision(&self) -> Option<u64> {
        self.readiness.lock().synced_revision
    }

    /// Rebuild the business layers and per-entity markers from the index.
    /// A no-op returning `false` until both readiness flags are set.
    pub fn sync_entities(&self) -> SessionResult<bool> {
        if !self.is_ready() {
            return Ok(false);
        }

        let (pass, revision, businesses, markers) = {
            let index = self.index.read();
            let businesses: Vec<PointFeature> = index
                .iter()
                .filter(|e| e.category == EntityCategory::Business)
                .map(|e| PointFeature { id: e.id, coordinate: e.coordinate, label: e.name.clone() })
                .collect();
            let count = businesses.len();
            let points = LayerData::Points(businesses);

            let mut pass = SyncPass::new()
                .replace_prefix(ids::ENTITY_MARKER_PREFIX)
                .upsert(
                    LayerHandle::with_source(ids::BUSINESS_CIRCLES, ids::BUSINESS_SOURCE, LayerKind::Circle),
                    points.clone(),
                )
                .upsert(
                    LayerHandle::with_source(ids::BUSINESS_ICONS, ids::BUSINESS_SOURCE, LayerKind::Symbol),
                    points,
                );
            let mut markers = 0;
            for e in index.iter().filter(|e| e.category != EntityCategory::Business) {
                pass = pass.upsert(
                    LayerHandle::entity_marker(e.id),
                    LayerData::Marker { at: e.coordinate, popup: Some(e.name.clone()) },
                );
                markers += 1;
            }
            (pass, index.revision(), count, markers)
        };

        self.controller.with_layers(|layers| layers.apply(pass))?;
        self.readiness.lock().synced_revision = Some(revision);
        info!(revision, businesses, markers, "entity layers synced");
        Ok(true)
    }

    /// Clear the session and remove both markers.
    pub fn teardown(&self) -> SessionResult<()> {
        self.controller.clear_with(|layers| {
            layers.remove(ids::SELECTION_MARKER)?;
            layers.remove(ids::SELF_MARKER).map(drop)
        })?;
        debug!("selection binding torn down");
        Ok(())
    }
}

impl<D, S, O> SelectionBinding<D, S, O>
where
    D: DirectionsService + 'static,
    S: MapSurface + 'static,
    O: NavigationObserver + 'static,
{
    /// Dispatch events from registered sources until `shutdown` fires, then
    /// tear down.
    ///
    /// Events take effect in arrival order: selections are committed (marker
    /// moved, request registered) before the next event is read, and only
    /// the wait for directions runs as its own task.  A failing event is
    /// logged and the loop carries on.  Index reloads re-sync the entity
    /// layers.  May be called once per binding.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) -> SessionResult<()> {
        let mut rx = self.rx.lock().take().ok_or(SessionError::AlreadyRunning)?;
        let mut revisions = self.index.read().subscribe();
        let mut tasks: JoinSet<SessionResult<Option<RouteOutcome>>> = JoinSet::new();
        debug!("selection binding running");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                Some(envelope) = rx.recv() => {
                    if let Err(error) = Self::dispatch(&self, envelope, &mut tasks) {
                        warn!(%error, "selection event failed");
                    }
                }
                Ok(()) = revisions.changed() => {
                    if let Err(error) = self.sync_entities() {
                        warn!(%error, "entity layer resync failed");
                    }
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => match joined {
                    Ok(Err(error)) => warn!(%error, "selection failed"),
                    Err(error) if !error.is_cancelled() => warn!(%error, "selection task panicked"),
                    _ => {}
                },
            }
        }

        tasks.shutdown().await;
        self.teardown()
    }

    fn dispatch(
        this:     &Arc<Self>,
        envelope: Envelope,
        tasks:    &mut JoinSet<SessionResult<Option<RouteOutcome>>>,
    ) -> SessionResult<()> {
        let Some(source) = this.registry.lock().get(&envelope.source).cloned() else {
            debug!("dropping event from unregistered source");
            return Ok(());
        };
        debug!(%source, event = ?envelope.event, "selection event");

        match envelope.event {
            SelectionEvent::Clear => {
                tasks.abort_all();
                this.clear()
            }
            SelectionEvent::DeepLink { origin, destination } => {
                this.set_origin(origin)?;
                Self::spawn_navigation(this, destination, tasks)
            }
            SelectionEvent::SearchResult(id) | SelectionEvent::ListClick(id) => {
                Self::spawn_navigation(this, id, tasks)
            }
        }
    }

    fn spawn_navigation(
        this:  &Arc<Self>,
        id:    EntityId,
        tasks: &mut JoinSet<SessionResult<Option<RouteOutcome>>>,
    ) -> SessionResult<()> {
        let pending = this.begin_navigation(id)?;
        let controller = Arc::clone(&this.controller);
        tasks.spawn(async move { controller.finish_navigation(pending).await.map(Some) });
        Ok(())
    }
}
