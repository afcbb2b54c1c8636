//! Unit tests for nav-session.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;

use nav_core::{Coordinate, EntityCategory, EntityId, GeoEntity, NavConfig};
use nav_entities::GeoEntityIndex;
use nav_layers::{LayerData, MapSurface, RecordingSurface, ids};
use nav_route::{DirectionsService, RouteError, RouteResult};

use crate::{
    GeolocationError, GeolocationProvider, NavState, NavigationController, NavigationObserver, NoticeLog,
    SelectionBinding,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

const ORIGIN: Coordinate = Coordinate::new(-88.043, 30.694);
const X:      Coordinate = Coordinate::new(-88.051, 30.712);
const Y:      Coordinate = Coordinate::new(-88.039, 30.688);
const SHOP:   Coordinate = Coordinate::new(-88.047, 30.701);

fn station_x() -> GeoEntity {
    GeoEntity::new(EntityId(1), "Northside Charger", EntityCategory::Station, X)
}

fn pickup_y() -> GeoEntity {
    GeoEntity::new(EntityId(2), "Dock 4 Pickup", EntityCategory::ShipmentEndpoint, Y)
}

fn bakery() -> GeoEntity {
    GeoEntity::new(EntityId(3), "Bayside Bakery", EntityCategory::Business, SHOP)
}

/// Two-point route with the haversine length and a 10 m/s duration.
fn straight(origin: Coordinate, destination: Coordinate) -> RouteResult {
    let d = origin.distance_m(destination);
    RouteResult {
        distance_meters:  d,
        duration_seconds: d / 10.0,
        geometry:         vec![origin, destination],
    }
}

/// Directions stub answering with [`straight`] routes.  Destinations can be
/// gated (no answer until notified) or scripted to fail.
#[derive(Default)]
struct StubDirections {
    gates:    Mutex<HashMap<String, Arc<Notify>>>,
    failures: Mutex<HashMap<String, RouteError>>,
    calls:    AtomicUsize,
}

impl StubDirections {
    fn gate(&self, destination: Coordinate) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().insert(destination.to_string(), Arc::clone(&gate));
        gate
    }

    fn fail(&self, destination: Coordinate, error: RouteError) {
        self.failures.lock().insert(destination.to_string(), error);
    }
}

impl DirectionsService for StubDirections {
    async fn directions(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteResult, RouteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = destination.to_string();
        let gate = self.gates.lock().get(&key).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let failure = self.failures.lock().get(&key).cloned();
        match failure {
            Some(error) => Err(error),
            None => Ok(straight(origin, destination)),
        }
    }
}

type Controller = NavigationController<Arc<StubDirections>, RecordingSurface, NoticeLog>;
type Binding = SelectionBinding<Arc<StubDirections>, RecordingSurface, NoticeLog>;

fn config() -> NavConfig {
    NavConfig { fallback_origin: ORIGIN, ..NavConfig::default() }
}

fn controller(svc: &Arc<StubDirections>) -> Arc<Controller> {
    controller_on(svc, RecordingSurface::new())
}

/// Controller over a surface that may already hold ids of its own.
fn controller_on(svc: &Arc<StubDirections>, surface: RecordingSurface) -> Arc<Controller> {
    Arc::new(NavigationController::from_config(Arc::clone(svc), surface, &config()).with_observer(NoticeLog::new()))
}

fn binding(svc: &Arc<StubDirections>) -> Arc<Binding> {
    binding_for(controller(svc))
}

fn binding_for(controller: Arc<Controller>) -> Arc<Binding> {
    let mut index = GeoEntityIndex::new();
    index.load(vec![station_x(), pickup_y(), bakery()]);
    Arc::new(SelectionBinding::new(controller, Arc::new(RwLock::new(index)), &config()))
}

fn markers(c: &Controller) -> Vec<String> {
    c.with_layers(|l| l.surface().marker_ids().into_iter().map(String::from).collect())
}

fn marker_position(c: &Controller, id: &str) -> Option<Coordinate> {
    c.with_layers(|l| l.surface().marker(id).map(|m| m.at))
}

/// Geometry currently drawn on the route layer.
fn drawn_route(c: &Controller) -> Option<Vec<Coordinate>> {
    c.with_layers(|l| match l.surface().source(ids::ROUTE) {
        Some(LayerData::Line(points)) => Some(points.clone()),
        _ => None,
    })
}

/// Yield until `done` holds, failing after a bounded number of polls.
async fn settle(mut done: impl FnMut() -> bool) {
    for _ in 0..200 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

async fn yield_many() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Real-time polling for multi-threaded tests.
async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..200 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

/// Observer that blocks its thread on the first transition into
/// `Resolving`, after signalling `entered`.
#[derive(Default)]
struct StallOnFirstResolve {
    stalled: AtomicBool,
    entered: Notify,
}

impl NavigationObserver for StallOnFirstResolve {
    fn on_state_change(&self, _from: NavState, to: NavState) {
        if to == NavState::Resolving && !self.stalled.swap(true, Ordering::SeqCst) {
            self.entered.notify_one();
            std::thread::sleep(Duration::from_millis(300));
        }
    }
}

// ── NavigationController ──────────────────────────────────────────────────────

#[cfg(test)]
mod controller {
    use nav_core::Bounds;
    use nav_layers::LayerError;
    use nav_route::RouteOutcome;

    use super::*;
    use crate::SessionError;

    #[tokio::test]
    async fn success_draws_route_and_fits_bounds() {
        let svc = Arc::new(StubDirections::default());
        let c = controller(&svc);

        let outcome = c.navigate_to(station_x()).await.unwrap();
        assert_eq!(outcome, RouteOutcome::Success(straight(ORIGIN, X)));

        let s = c.session();
        assert_eq!(s.state, NavState::Active);
        assert_eq!(s.selected_entity.unwrap().id, EntityId(1));
        assert_eq!(s.current_route, Some(straight(ORIGIN, X)));
        assert_eq!(drawn_route(&c), Some(vec![ORIGIN, X]));

        let fitted = c.with_layers(|l| l.surface().fitted());
        assert_eq!(fitted, Some((Bounds::covering([ORIGIN, X]).unwrap(), 50)));
        assert!(c.route_summary().is_some());
        assert!(!c.is_resolving());
    }

    #[tokio::test]
    async fn latest_navigation_wins() {
        let svc = Arc::new(StubDirections::default());
        let gate_x = svc.gate(X);
        let c = controller(&svc);

        let first = tokio::spawn({
            let c = Arc::clone(&c);
            async move { c.navigate_to(station_x()).await }
        });
        tokio::task::yield_now().await;
        assert_eq!(c.state(), NavState::Resolving);

        let second = c.navigate_to(pickup_y()).await.unwrap();
        assert_eq!(second.route(), Some(&straight(ORIGIN, Y)));

        // X's answer arrives late and must have no effect.
        gate_x.notify_one();
        assert!(first.await.unwrap().unwrap().is_cancelled());

        let s = c.session();
        assert_eq!(s.state, NavState::Active);
        assert_eq!(s.selected_entity.unwrap().id, EntityId(2));
        assert_eq!(drawn_route(&c), Some(vec![ORIGIN, Y]));
        assert_eq!(
            c.observer().transitions(),
            vec![(NavState::Idle, NavState::Resolving), (NavState::Resolving, NavState::Active)]
        );
    }

    #[tokio::test]
    async fn clear_then_navigate_reproduces_route() {
        let svc = Arc::new(StubDirections::default());
        let c = controller(&svc);

        let before = c.navigate_to(station_x()).await.unwrap();
        c.clear().unwrap();

        let s = c.session();
        assert_eq!(s.state, NavState::Idle);
        assert!(s.selected_entity.is_none());
        assert!(s.current_route.is_none());
        assert_eq!(drawn_route(&c), None);
        assert!(c.route_summary().is_none());

        let after = c.navigate_to(station_x()).await.unwrap();
        assert_eq!(before, after);
        assert_eq!(drawn_route(&c), Some(vec![ORIGIN, X]));
    }

    #[tokio::test]
    async fn clear_beats_in_flight_success() {
        let svc = Arc::new(StubDirections::default());
        let gate_x = svc.gate(X);
        let c = controller(&svc);

        let pending = tokio::spawn({
            let c = Arc::clone(&c);
            async move { c.navigate_to(station_x()).await }
        });
        tokio::task::yield_now().await;

        c.clear().unwrap();
        gate_x.notify_one();
        assert!(pending.await.unwrap().unwrap().is_cancelled());

        assert_eq!(c.state(), NavState::Idle);
        assert_eq!(drawn_route(&c), None);
        assert!(c.session().generation.0 >= 2);
    }

    #[tokio::test]
    async fn failure_removes_route_and_notifies() {
        let svc = Arc::new(StubDirections::default());
        svc.fail(Y, RouteError::NotFound);
        let c = controller(&svc);

        c.navigate_to(station_x()).await.unwrap();
        assert!(drawn_route(&c).is_some());

        let outcome = c.navigate_to(pickup_y()).await.unwrap();
        assert_eq!(outcome, RouteOutcome::Failed(RouteError::NotFound));

        let s = c.session();
        assert_eq!(s.state, NavState::Failed);
        assert!(s.current_route.is_none());
        assert_eq!(s.last_failure, Some(RouteError::NotFound));
        assert_eq!(drawn_route(&c), None);
        assert_eq!(c.observer().notices(), vec!["No route available".to_string()]);
    }

    #[tokio::test]
    async fn failure_on_first_request_leaves_surface_alone() {
        let svc = Arc::new(StubDirections::default());
        svc.fail(X, RouteError::Service { status: 503 });
        let c = controller(&svc);

        c.navigate_to(station_x()).await.unwrap();
        assert_eq!(c.state(), NavState::Failed);
        assert!(c.with_layers(|l| l.surface().ops().is_empty()));
        assert_eq!(c.observer().notices().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_reported_as_failure() {
        let svc = Arc::new(StubDirections::default());
        let _never = svc.gate(X);
        let c = controller(&svc);

        let outcome = c.navigate_to(station_x()).await.unwrap();
        assert_eq!(outcome, RouteOutcome::Failed(RouteError::Timeout(Duration::from_secs(10))));
        assert_eq!(c.observer().notices(), vec!["Route request timed out".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn slow_observer_cannot_reorder_requests() {
        let svc = Arc::new(StubDirections::default());
        let gate_y = svc.gate(Y);
        let c = Arc::new(
            NavigationController::from_config(Arc::clone(&svc), RecordingSurface::new(), &config())
                .with_observer(StallOnFirstResolve::default()),
        );

        let first = tokio::spawn({
            let c = Arc::clone(&c);
            async move { c.navigate_to(station_x()).await }
        });
        c.observer().entered.notified().await;

        // Y is selected while X's caller is still stuck in its observer.
        let second = tokio::spawn({
            let c = Arc::clone(&c);
            async move { c.navigate_to(pickup_y()).await }
        });
        wait_until(|| c.session().selected_entity.is_some_and(|e| e.id == EntityId(2))).await;

        assert!(first.await.unwrap().unwrap().is_cancelled());
        assert!(c.is_resolving(), "Y's request must survive X resuming");

        gate_y.notify_one();
        let second = second.await.unwrap().unwrap();
        assert_eq!(second.route(), Some(&straight(ORIGIN, Y)));

        let s = c.session();
        assert_eq!(s.state, NavState::Active);
        assert_eq!(s.selected_entity.unwrap().id, EntityId(2));
        assert!(!c.is_resolving());
    }

    #[tokio::test]
    async fn unapplied_route_fails_the_session() {
        let svc = Arc::new(StubDirections::default());
        let mut surface = RecordingSurface::new();
        surface.add_source(ids::ROUTE, &LayerData::Line(vec![])).unwrap();
        let c = controller_on(&svc, surface);

        let err = c.navigate_to(station_x()).await.unwrap_err();
        assert!(matches!(err, SessionError::Layer(LayerError::DuplicateLayerId(_))));

        let s = c.session();
        assert_eq!(s.state, NavState::Failed);
        assert!(s.current_route.is_none());
        assert!(!c.is_resolving());
        assert_eq!(
            c.observer().transitions(),
            vec![(NavState::Idle, NavState::Resolving), (NavState::Resolving, NavState::Failed)]
        );
    }

    #[tokio::test]
    async fn rejected_commit_leaves_session_untouched() {
        let svc = Arc::new(StubDirections::default());
        let c = controller(&svc);
        c.navigate_to(station_x()).await.unwrap();
        let before = c.session();

        let err = c
            .begin_navigation(pickup_y(), |_| Err(LayerError::Surface("map detached".into())))
            .unwrap_err();
        assert!(matches!(err, SessionError::Layer(LayerError::Surface(_))));

        let after = c.session();
        assert_eq!(after.state, NavState::Active);
        assert_eq!(after.generation, before.generation);
        assert_eq!(after.selected_entity.unwrap().id, EntityId(1));
        assert_eq!(drawn_route(&c), Some(vec![ORIGIN, X]));
        assert_eq!(svc.calls.load(Ordering::SeqCst), 1);
        assert!(!c.is_resolving());
    }

    #[tokio::test]
    async fn origin_feeds_next_request() {
        let svc = Arc::new(StubDirections::default());
        let c = controller(&svc);
        assert_eq!(c.origin(), ORIGIN);

        c.set_origin(SHOP);
        c.navigate_to(station_x()).await.unwrap();
        assert_eq!(drawn_route(&c), Some(vec![SHOP, X]));
    }
}

// ── SelectionBinding ──────────────────────────────────────────────────────────

#[cfg(test)]
mod binding {
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::{SelectionEvent, SessionError};

    #[tokio::test]
    async fn selection_marker_never_duplicates() {
        let svc = Arc::new(StubDirections::default());
        let b = binding(&svc);

        b.navigate_to(EntityId(1)).await.unwrap();
        b.navigate_to(EntityId(2)).await.unwrap();

        let c = b.controller();
        assert_eq!(markers(c), vec![ids::SELECTION_MARKER]);
        assert_eq!(marker_position(c, ids::SELECTION_MARKER), Some(Y));

        b.clear().unwrap();
        assert!(markers(c).is_empty());
        assert_eq!(c.state(), NavState::Idle);
    }

    #[tokio::test]
    async fn unknown_entity_is_reported() {
        let svc = Arc::new(StubDirections::default());
        let b = binding(&svc);
        let err = b.navigate_to(EntityId(404)).await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownEntity(EntityId(404))));
        assert_eq!(svc.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn deep_link_moves_origin_then_navigates() {
        let svc = Arc::new(StubDirections::default());
        let b = binding(&svc);

        let outcome = b
            .handle(SelectionEvent::DeepLink { origin: SHOP, destination: EntityId(2) })
            .await
            .unwrap();
        assert_eq!(outcome.unwrap().route(), Some(&straight(SHOP, Y)));
        assert_eq!(marker_position(b.controller(), ids::SELF_MARKER), Some(SHOP));
        assert_eq!(b.handle(SelectionEvent::Clear).await.unwrap(), None);
    }

    #[test]
    fn search_is_pure() {
        let svc = Arc::new(StubDirections::default());
        let b = binding(&svc);
        let hits = b.search("dock");
        assert_eq!(hits.len(), 1);
        assert_eq!(b.controller().state(), NavState::Idle);
        assert!(markers(b.controller()).is_empty());
    }

    #[test]
    fn entity_layers_wait_for_both_flags() {
        let svc = Arc::new(StubDirections::default());
        let b = binding(&svc);
        let c = b.controller();

        assert!(!b.map_ready().unwrap());
        assert!(markers(c).is_empty());
        assert_eq!(b.synced_revision(), None);

        assert!(b.dataset_ready().unwrap());
        assert_eq!(markers(c), vec!["entity-marker:1", "entity-marker:2"]);
        let layers = c.with_layers(|l| l.surface().layer_ids().into_iter().map(String::from).collect::<Vec<_>>());
        assert_eq!(layers, vec![ids::BUSINESS_CIRCLES, ids::BUSINESS_ICONS]);
        let businesses = c.with_layers(|l| match l.surface().source(ids::BUSINESS_SOURCE) {
            Some(LayerData::Points(points)) => points.len(),
            _ => 0,
        });
        assert_eq!(businesses, 1);
        assert_eq!(b.synced_revision(), Some(1));
    }

    #[test]
    fn dataset_first_then_map() {
        let svc = Arc::new(StubDirections::default());
        let b = binding(&svc);
        assert!(!b.dataset_ready().unwrap());
        assert!(b.map_ready().unwrap());
        assert!(b.is_ready());
    }

    #[test]
    fn reload_drops_vanished_markers() {
        let svc = Arc::new(StubDirections::default());
        let b = binding(&svc);
        b.map_ready().unwrap();
        b.dataset_ready().unwrap();

        b.index().write().load(vec![station_x(), bakery()]);
        assert!(b.sync_entities().unwrap());
        assert_eq!(markers(b.controller()), vec!["entity-marker:1"]);
        assert_eq!(b.synced_revision(), Some(2));
    }

    #[test]
    fn missing_dataset_file_is_entity_error() {
        let svc = Arc::new(StubDirections::default());
        let b = binding(&svc);
        let err = b.load_dataset_csv(std::path::Path::new("/nonexistent/entities.csv")).unwrap_err();
        assert!(matches!(err, SessionError::Entity(nav_entities::EntityError::Io(_))));
        assert!(!b.is_ready());
        assert_eq!(b.index().read().len(), 3);
    }

    #[test]
    fn source_unregisters_on_drop() {
        let svc = Arc::new(StubDirections::default());
        let b = binding(&svc);

        let search = b.register_source("search");
        let list = b.register_source("business-list");
        assert_eq!(b.sources(), vec!["search", "business-list"]);

        drop(search);
        assert_eq!(b.sources(), vec!["business-list"]);
        assert_eq!(list.name(), "business-list");
    }

    #[tokio::test]
    async fn run_dispatches_until_shutdown() {
        let svc = Arc::new(StubDirections::default());
        let b = binding(&svc);
        b.set_origin(ORIGIN).unwrap();
        let list = b.register_source("business-list");

        let shutdown = CancellationToken::new();
        let running = tokio::spawn(Arc::clone(&b).run(shutdown.clone()));

        assert!(list.emit(SelectionEvent::ListClick(EntityId(1))));
        settle(|| b.controller().state() == NavState::Active).await;
        assert_eq!(markers(b.controller()), vec![ids::SELECTION_MARKER, ids::SELF_MARKER]);

        shutdown.cancel();
        running.await.unwrap().unwrap();
        assert!(markers(b.controller()).is_empty());
        assert_eq!(b.controller().state(), NavState::Idle);
    }

    #[tokio::test]
    async fn newer_selection_supersedes_while_running() {
        let svc = Arc::new(StubDirections::default());
        let gate_x = svc.gate(X);
        let b = binding(&svc);
        let search = b.register_source("search");

        let shutdown = CancellationToken::new();
        let running = tokio::spawn(Arc::clone(&b).run(shutdown.clone()));

        search.emit(SelectionEvent::SearchResult(EntityId(1)));
        settle(|| b.controller().is_resolving()).await;
        search.emit(SelectionEvent::SearchResult(EntityId(2)));
        settle(|| b.controller().state() == NavState::Active).await;

        gate_x.notify_one();
        yield_many().await;
        assert_eq!(drawn_route(b.controller()), Some(vec![ORIGIN, Y]));
        assert_eq!(marker_position(b.controller(), ids::SELECTION_MARKER), Some(Y));

        shutdown.cancel();
        running.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn clear_queued_after_click_wins() {
        let svc = Arc::new(StubDirections::default());
        let b = binding(&svc);
        let list = b.register_source("business-list");
        list.emit(SelectionEvent::ListClick(EntityId(1)));
        list.emit(SelectionEvent::Clear);

        let shutdown = CancellationToken::new();
        let running = tokio::spawn(Arc::clone(&b).run(shutdown.clone()));
        yield_many().await;

        let c = b.controller();
        assert_eq!(c.state(), NavState::Idle);
        assert_eq!(drawn_route(c), None);
        assert!(markers(c).is_empty());
        assert!(!c.is_resolving());

        shutdown.cancel();
        running.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn click_queued_after_clear_navigates() {
        let svc = Arc::new(StubDirections::default());
        let b = binding(&svc);
        let list = b.register_source("business-list");
        list.emit(SelectionEvent::Clear);
        list.emit(SelectionEvent::ListClick(EntityId(2)));

        let shutdown = CancellationToken::new();
        let running = tokio::spawn(Arc::clone(&b).run(shutdown.clone()));
        settle(|| b.controller().state() == NavState::Active).await;
        assert_eq!(drawn_route(b.controller()), Some(vec![ORIGIN, Y]));

        shutdown.cancel();
        running.await.unwrap().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_selections_keep_marker_with_session() {
        let svc = Arc::new(StubDirections::default());
        let b = binding(&svc);

        let tasks: Vec<_> = (0..32u32)
            .map(|i| {
                let b = Arc::clone(&b);
                tokio::spawn(async move { b.navigate_to(EntityId(1 + i % 2)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let c = b.controller();
        let selected = c.session().selected_entity.unwrap();
        assert_eq!(c.state(), NavState::Active);
        assert_eq!(markers(c), vec![ids::SELECTION_MARKER]);
        assert_eq!(marker_position(c, ids::SELECTION_MARKER), Some(selected.coordinate));
        assert_eq!(drawn_route(c).and_then(|r| r.last().copied()), Some(selected.coordinate));
    }

    #[tokio::test]
    async fn failing_event_does_not_stop_run() {
        let svc = Arc::new(StubDirections::default());
        let mut surface = RecordingSurface::new();
        surface.add_marker(ids::SELF_MARKER, SHOP, None).unwrap();
        let b = binding_for(controller_on(&svc, surface));
        let link = b.register_source("deep-link");

        let shutdown = CancellationToken::new();
        let running = tokio::spawn(Arc::clone(&b).run(shutdown.clone()));

        // The surface already holds a self marker the binding did not create.
        link.emit(SelectionEvent::DeepLink { origin: SHOP, destination: EntityId(2) });
        link.emit(SelectionEvent::ListClick(EntityId(404)));
        link.emit(SelectionEvent::ListClick(EntityId(1)));
        settle(|| b.controller().state() == NavState::Active).await;

        let c = b.controller();
        assert_eq!(c.origin(), ORIGIN);
        assert_eq!(drawn_route(c), Some(vec![ORIGIN, X]));

        shutdown.cancel();
        running.await.unwrap().unwrap();
        assert_eq!(c.state(), NavState::Idle);
        assert_eq!(markers(c), vec![ids::SELF_MARKER], "only the foreign marker is left");
    }

    #[tokio::test]
    async fn events_from_dropped_source_are_ignored() {
        let svc = Arc::new(StubDirections::default());
        let b = binding(&svc);

        let link = b.register_source("deep-link");
        link.emit(SelectionEvent::DeepLink { origin: SHOP, destination: EntityId(2) });
        drop(link);

        let shutdown = CancellationToken::new();
        let running = tokio::spawn(Arc::clone(&b).run(shutdown.clone()));
        yield_many().await;

        assert_eq!(b.controller().state(), NavState::Idle);
        assert_eq!(b.controller().origin(), ORIGIN);
        assert_eq!(svc.calls.load(Ordering::SeqCst), 0);

        shutdown.cancel();
        running.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn second_run_is_rejected() {
        let svc = Arc::new(StubDirections::default());
        let b = binding(&svc);

        let shutdown = CancellationToken::new();
        let running = tokio::spawn(Arc::clone(&b).run(shutdown.clone()));
        yield_many().await;

        let again = Arc::clone(&b).run(CancellationToken::new()).await;
        assert!(matches!(again, Err(SessionError::AlreadyRunning)));

        shutdown.cancel();
        running.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn index_revision_triggers_resync() {
        let svc = Arc::new(StubDirections::default());
        let b = binding(&svc);
        b.map_ready().unwrap();
        b.dataset_ready().unwrap();

        let shutdown = CancellationToken::new();
        let running = tokio::spawn(Arc::clone(&b).run(shutdown.clone()));
        yield_many().await;

        b.index().write().load(vec![pickup_y()]);
        settle(|| b.synced_revision() == Some(2)).await;
        assert_eq!(markers(b.controller()), vec!["entity-marker:2"]);

        shutdown.cancel();
        running.await.unwrap().unwrap();
    }
}

// ── Geolocation ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod geolocation {
    use crate::{FixedPosition, OriginFix, OriginSource, acquire_origin};

    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(5_000);

    struct NeverAnswers;

    impl GeolocationProvider for NeverAnswers {
        async fn current_position(&self) -> Result<Coordinate, GeolocationError> {
            std::future::pending().await
        }
    }

    struct Denied;

    impl GeolocationProvider for Denied {
        async fn current_position(&self) -> Result<Coordinate, GeolocationError> {
            Err(GeolocationError::Denied)
        }
    }

    #[tokio::test]
    async fn device_position_used() {
        let fix = acquire_origin(&FixedPosition(SHOP), TIMEOUT, ORIGIN).await;
        assert_eq!(fix, OriginFix { coordinate: SHOP, source: OriginSource::Device });
    }

    #[tokio::test]
    async fn denial_falls_back() {
        let fix = acquire_origin(&Denied, TIMEOUT, ORIGIN).await;
        assert_eq!(fix, OriginFix { coordinate: ORIGIN, source: OriginSource::Fallback });
    }

    #[tokio::test]
    async fn invalid_fix_falls_back() {
        let fix = acquire_origin(&FixedPosition(Coordinate::new(500.0, 0.0)), TIMEOUT, ORIGIN).await;
        assert_eq!(fix.source, OriginSource::Fallback);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_provider_falls_back_within_timeout() {
        let start = tokio::time::Instant::now();
        let fix = acquire_origin(&NeverAnswers, TIMEOUT, ORIGIN).await;
        let waited = start.elapsed();

        assert_eq!(fix.source, OriginSource::Fallback);
        assert!(waited >= TIMEOUT && waited < TIMEOUT + Duration::from_millis(100), "{waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn init_origin_completes_with_fallback() {
        let svc = Arc::new(StubDirections::default());
        let b = binding(&svc);

        let fix = b.init_origin(&NeverAnswers).await.unwrap();
        assert_eq!(fix.coordinate, ORIGIN);

        let c = b.controller();
        assert_eq!(marker_position(c, ids::SELF_MARKER), Some(ORIGIN));
        assert_eq!(c.with_layers(|l| l.surface().camera()), Some((ORIGIN, 12.0)));
    }

    #[tokio::test]
    async fn init_origin_uses_device() {
        let svc = Arc::new(StubDirections::default());
        let b = binding(&svc);

        b.init_origin(&FixedPosition(SHOP)).await.unwrap();
        assert_eq!(b.controller().origin(), SHOP);
        assert_eq!(marker_position(b.controller(), ids::SELF_MARKER), Some(SHOP));
    }
}

// ── Summaries ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod summary {
    use crate::RouteSummary;

    use super::*;

    #[test]
    fn banner_text() {
        let route = RouteResult { distance_meters: 1_500.0, duration_seconds: 125.0, geometry: vec![] };
        let summary = RouteSummary::of(&route);
        assert_eq!(summary.distance, "1.5 km");
        assert_eq!(summary.duration, "2 min");
        assert_eq!(summary.to_string(), "1.5 km · 2 min");
    }

    #[test]
    fn engaged_states() {
        assert!(NavState::Resolving.is_engaged());
        assert!(NavState::Active.is_engaged());
        assert!(!NavState::Failed.is_engaged());
        assert!(!NavState::Idle.is_engaged());
    }
}
