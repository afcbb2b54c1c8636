//! The navigation controller, owner of the session and the "at most one
//! live route" invariant.

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use nav_core::{Bounds, Coordinate, EntityId, GeoEntity, NavConfig, RequestId};
use nav_layers::{LayerData, LayerHandle, LayerResult, LayerSynchronizer, MapSurface, ids};
use nav_route::{DirectionsService, RouteClient, RouteOutcome, RouteResult, RouteTicket};

use crate::{NavState, NavigationObserver, NavigationSession, NoopObserver, RouteSummary, SessionResult};

struct SessionSlot {
    session:     NavigationSession,
    origin:      Coordinate,
    /// Number of `navigate_to` calls so far.
    navigations: u64,
}

/// A navigation whose generation is committed and whose directions request
/// is registered, waiting for [`NavigationController::finish_navigation`].
#[derive(Debug)]
pub struct PendingNavigation {
    ticket:      RouteTicket,
    generation:  RequestId,
    entity_id:   EntityId,
    origin:      Coordinate,
    destination: Coordinate,
    first:       bool,
}

impl PendingNavigation {
    pub fn generation(&self) -> RequestId {
        self.generation
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }
}

/// Orchestrates the route lifecycle for one map surface.
///
/// Every method takes `&self`; share the controller behind an `Arc` and
/// call `navigate_to` from as many tasks as needed.  Only the most recent
/// navigation can change the session or the map.
///
/// # Example
///
/// ```rust,ignore
/// let controller = NavigationController::from_config(directions, RecordingSurface::new(), &config)
///     .with_observer(NoticeLog::new());
/// controller.set_origin(origin);
/// let outcome = controller.navigate_to(entity).await?;
/// println!("{}", controller.route_summary().unwrap());
/// ```
pub struct NavigationController<D, S, O = NoopObserver>
where
    D: DirectionsService,
    S: MapSurface,
    O: NavigationObserver,
{
    routes:         RouteClient<D>,
    session:        Mutex<SessionSlot>,
    layers:         Mutex<LayerSynchronizer<S>>,
    observer:       O,
    fit_padding_px: u32,
}

impl<D: DirectionsService, S: MapSurface> NavigationController<D, S, NoopObserver> {
    /// Build a controller from an existing client and synchronizer.  The
    /// origin starts at `config.fallback_origin`.
    pub fn new(routes: RouteClient<D>, layers: LayerSynchronizer<S>, config: &NavConfig) -> Self {
        Self {
            routes,
            session: Mutex::new(SessionSlot {
                session:     NavigationSession::default(),
                origin:      config.fallback_origin,
                navigations: 0,
            }),
            layers: Mutex::new(layers),
            observer: NoopObserver,
            fit_padding_px: config.fit_padding_px,
        }
    }

    /// Wrap `service` in a [`RouteClient`] with the configured timeout and
    /// `surface` in a fresh [`LayerSynchronizer`].
    pub fn from_config(service: D, surface: S, config: &NavConfig) -> Self {
        Self::new(
            RouteClient::new(service, config.route_timeout()),
            LayerSynchronizer::new(surface),
            config,
        )
    }
}

impl<D, S, O> NavigationController<D, S, O>
where
    D: DirectionsService,
    S: MapSurface,
    O: NavigationObserver,
{
    /// Replace the observer.
    pub fn with_observer<O2: NavigationObserver>(self, observer: O2) -> NavigationController<D, S, O2> {
        NavigationController {
            routes:         self.routes,
            session:        self.session,
            layers:         self.layers,
            observer,
            fit_padding_px: self.fit_padding_px,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Resolve and draw a route from the current origin to `entity`.
    ///
    /// Navigating while a route is resolving or shown first clears it.
    /// Returns [`RouteOutcome::Cancelled`] without touching the session if a
    /// newer `navigate_to` or a `clear` happened while this one was waiting.
    pub async fn navigate_to(&self, entity: GeoEntity) -> SessionResult<RouteOutcome> {
        let pending = self.begin_navigation(entity, |_| Ok(()))?;
        self.finish_navigation(pending).await
    }

    /// The synchronous half of [`navigate_to`][Self::navigate_to].
    ///
    /// In one critical section: runs `on_commit` on the layers, removes a
    /// stale route, registers the directions request and commits the new
    /// generation.  Navigations therefore take effect in the order this is
    /// called, whatever order their `finish_navigation` futures run in.  If a
    /// layer mutation fails the session is left untouched.
    pub fn begin_navigation(
        &self,
        entity:    GeoEntity,
        on_commit: impl FnOnce(&mut LayerSynchronizer<S>) -> LayerResult<()>,
    ) -> SessionResult<PendingNavigation> {
        let destination = entity.coordinate;
        let entity_id = entity.id;

        let (pending, from) = {
            let mut guard = self.session.lock();
            let slot = &mut *guard;
            let from = slot.session.state;
            {
                let mut layers = self.layers.lock();
                on_commit(&mut layers)?;
                if from.is_engaged() {
                    layers.remove(ids::ROUTE)?;
                }
            }

            let ticket = self.routes.begin(slot.origin, destination);
            slot.navigations += 1;
            let s = &mut slot.session;
            s.generation = s.generation.next();
            s.state = NavState::Resolving;
            s.selected_entity = Some(entity);
            s.current_route = None;
            s.last_failure = None;
            let pending = PendingNavigation {
                ticket,
                generation: s.generation,
                entity_id,
                origin: slot.origin,
                destination,
                first: slot.navigations == 1,
            };
            (pending, from)
        };

        if from != NavState::Resolving {
            self.observer.on_state_change(from, NavState::Resolving);
        }
        debug!(
            generation = %pending.generation,
            entity = %entity_id,
            origin = %pending.origin,
            %destination,
            "navigation started"
        );
        Ok(pending)
    }

    /// Await the directions request of `pending` and apply the result if
    /// no newer navigation or `clear` has happened since.
    pub async fn finish_navigation(&self, pending: PendingNavigation) -> SessionResult<RouteOutcome> {
        let PendingNavigation { ticket, generation, entity_id, origin, destination, first } = pending;
        let outcome = self.routes.finish(ticket).await;

        let applied = {
            let mut guard = self.session.lock();
            let s = &mut guard.session;
            if s.generation != generation {
                debug!(%generation, current = %s.generation, "dropping result of superseded navigation");
                return Ok(RouteOutcome::Cancelled);
            }

            match &outcome {
                RouteOutcome::Success(route) => {
                    let drawn = self.draw_route(route, origin, destination);
                    s.current_route = drawn.is_ok().then(|| route.clone());
                    s.state = if drawn.is_ok() { NavState::Active } else { NavState::Failed };
                    drawn
                }
                RouteOutcome::Failed(error) => {
                    s.state = NavState::Failed;
                    s.current_route = None;
                    s.last_failure = Some(error.clone());
                    if first { Ok(()) } else { self.layers.lock().remove(ids::ROUTE).map(drop) }
                }
                RouteOutcome::Cancelled => return Ok(RouteOutcome::Cancelled),
            }
        };

        if let Err(error) = applied {
            warn!(%generation, entity = %entity_id, %error, "route could not be applied to the map");
            self.observer.on_state_change(NavState::Resolving, NavState::Failed);
            return Err(error.into());
        }

        match &outcome {
            RouteOutcome::Success(route) => {
                info!(
                    %generation,
                    entity = %entity_id,
                    summary = %RouteSummary::of(route),
                    "route applied"
                );
                self.observer.on_state_change(NavState::Resolving, NavState::Active);
                self.observer.on_route_applied(route);
            }
            RouteOutcome::Failed(error) => {
                self.observer.on_state_change(NavState::Resolving, NavState::Failed);
                self.observer.on_notice(error.user_message());
            }
            RouteOutcome::Cancelled => {}
        }
        Ok(outcome)
    }

    /// Cancel any pending request, remove the route and return to `Idle`.
    ///
    /// A resolution still in flight becomes stale and will not redraw.
    pub fn clear(&self) -> SessionResult<()> {
        self.clear_with(|_| Ok(()))
    }

    /// [`clear`][Self::clear], running `on_commit` on the layers in the same
    /// critical section.  If a layer mutation fails the session is left
    /// untouched.
    pub fn clear_with(&self, on_commit: impl FnOnce(&mut LayerSynchronizer<S>) -> LayerResult<()>) -> SessionResult<()> {
        let from = {
            let mut guard = self.session.lock();
            {
                let mut layers = self.layers.lock();
                layers.remove(ids::ROUTE)?;
                on_commit(&mut layers)?;
            }

            self.routes.cancel();
            let s = &mut guard.session;
            let from = s.state;
            s.generation = s.generation.next();
            s.state = NavState::Idle;
            s.selected_entity = None;
            s.current_route = None;
            s.last_failure = None;
            from
        };

        if from != NavState::Idle {
            self.observer.on_state_change(from, NavState::Idle);
        }
        debug!(?from, "navigation cleared");
        Ok(())
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    /// Cloned snapshot of the session.
    pub fn session(&self) -> NavigationSession {
        self.session.lock().session.clone()
    }

    pub fn state(&self) -> NavState {
        self.session.lock().session.state
    }

    pub fn origin(&self) -> Coordinate {
        self.session.lock().origin
    }

    /// Origin for subsequent navigations.  Does not re-route an active
    /// navigation.
    pub fn set_origin(&self, origin: Coordinate) {
        self.session.lock().origin = origin;
        debug!(%origin, "origin set");
    }

    /// Formatted distance and duration of the active route.
    pub fn route_summary(&self) -> Option<RouteSummary> {
        self.session.lock().session.current_route.as_ref().map(RouteSummary::of)
    }

    /// `true` while a directions request is in flight.
    pub fn is_resolving(&self) -> bool {
        self.routes.is_pending()
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Run `f` with exclusive access to the layer synchronizer.
    ///
    /// Must not be called while holding the session (it never is from
    /// outside this type).
    pub fn with_layers<R>(&self, f: impl FnOnce(&mut LayerSynchronizer<S>) -> R) -> R {
        f(&mut self.layers.lock())
    }

    fn draw_route(&self, route: &RouteResult, origin: Coordinate, destination: Coordinate) -> LayerResult<()> {
        let mut layers = self.layers.lock();
        layers.upsert(LayerHandle::line(ids::ROUTE), &LayerData::Line(route.geometry.clone()))?;
        if let Some(bounds) = Bounds::covering([origin, destination]) {
            layers.fit_bounds(bounds, self.fit_padding_px);
        }
        Ok(())
    }
}
