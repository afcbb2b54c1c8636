//! The latest-wins route client.

use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use nav_core::{Coordinate, RequestId};

use crate::{DirectionsService, RouteError, RouteOutcome, RouteRequest};

/// The request currently allowed to report a result.
struct Pending {
    request: RouteRequest,
    cancel:  CancellationToken,
}

/// A request registered by [`RouteClient::begin`] and not yet awaited.
///
/// Holding a ticket does not keep the request current: a later `begin` or
/// [`cancel`][RouteClient::cancel] supersedes it, and
/// [`finish`][RouteClient::finish] then reports `Cancelled`.
#[derive(Debug)]
pub struct RouteTicket {
    request: RouteRequest,
    cancel:  CancellationToken,
}

impl RouteTicket {
    pub fn request(&self) -> &RouteRequest {
        &self.request
    }
}

struct ClientState {
    last_issued: RequestId,
    pending:     Option<Pending>,
}

/// Issues directions requests such that only the most recent one can ever
/// produce a result.
///
/// Two mechanisms cooperate:
///
/// 1. **Abort**: every request carries a [`CancellationToken`]; issuing a new
///    request (or calling [`cancel`][Self::cancel]) fires the previous token,
///    and the in-flight service future is dropped.
/// 2. **Stale-check**: on completion the request id is compared against the
///    pending one.  A mismatch means the request was superseded, and the
///    result is discarded even when the transport could not be aborted.
///
/// All methods take `&self`; the client is meant to be shared by the
/// navigation controller across overlapping `resolve` calls.
pub struct RouteClient<D: DirectionsService> {
    service: D,
    timeout: Duration,
    state:   Mutex<ClientState>,
}

impl<D: DirectionsService> RouteClient<D> {
    /// Create a client that fails any single resolution after `timeout`.
    pub fn new(service: D, timeout: Duration) -> Self {
        Self {
            service,
            timeout,
            state: Mutex::new(ClientState {
                last_issued: RequestId::default(),
                pending:     None,
            }),
        }
    }

    pub fn service(&self) -> &D {
        &self.service
    }

    /// Resolve a route from `origin` to `destination`.
    ///
    /// Any request still pending on this client is cancelled first.  Returns
    /// [`RouteOutcome::Cancelled`] if this request is itself superseded
    /// before it completes.
    pub async fn resolve(&self, origin: Coordinate, destination: Coordinate) -> RouteOutcome {
        let ticket = self.begin(origin, destination);
        self.finish(ticket).await
    }

    /// Register a new request, superseding any pending one, without waiting
    /// for the service.
    ///
    /// Requests become current in the order `begin` is called, so a caller
    /// that must order requests against its own state calls this while
    /// holding the lock that guards that state.
    pub fn begin(&self, origin: Coordinate, destination: Coordinate) -> RouteTicket {
        let mut state = self.state.lock();
        if let Some(prev) = state.pending.take() {
            prev.cancel.cancel();
            debug!(request_id = %prev.request.id, "route request superseded");
        }

        state.last_issued = state.last_issued.next();
        let request = RouteRequest {
            id: state.last_issued,
            origin,
            destination,
            issued_at: std::time::Instant::now(),
        };
        let cancel = CancellationToken::new();
        state.pending = Some(Pending { request: request.clone(), cancel: cancel.clone() });
        debug!(request_id = %request.id, %origin, %destination, "route request issued");
        RouteTicket { request, cancel }
    }

    /// Call the directions service for `ticket` and report the outcome.
    pub async fn finish(&self, ticket: RouteTicket) -> RouteOutcome {
        let RouteTicket { request, cancel } = ticket;
        if cancel.is_cancelled() {
            debug!(request_id = %request.id, "route request superseded before dispatch");
            return RouteOutcome::Cancelled;
        }

        let call = tokio::time::timeout(self.timeout, self.service.directions(request.origin, request.destination));

        let result = if self.service.supports_abort() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(request_id = %request.id, "route request aborted in flight");
                    return RouteOutcome::Cancelled;
                }
                result = call => result,
            }
        } else {
            call.await
        };

        if !self.complete(request.id) {
            debug!(request_id = %request.id, "discarding stale route response");
            return RouteOutcome::Cancelled;
        }

        let elapsed_ms = request.issued_at.elapsed().as_millis() as u64;
        match result {
            Ok(Ok(route)) => {
                debug!(
                    request_id = %request.id,
                    distance_m = route.distance_meters,
                    duration_s = route.duration_seconds,
                    points = route.geometry.len(),
                    elapsed_ms,
                    "route resolved"
                );
                RouteOutcome::Success(route)
            }
            Ok(Err(error)) => {
                warn!(request_id = %request.id, %error, elapsed_ms, "route request failed");
                RouteOutcome::Failed(error)
            }
            Err(_) => {
                warn!(request_id = %request.id, timeout_ms = self.timeout.as_millis() as u64, "route request timed out");
                RouteOutcome::Failed(RouteError::Timeout(self.timeout))
            }
        }
    }

    /// Cancel the pending request, if any.  Returns `true` if one was pending.
    pub fn cancel(&self) -> bool {
        let mut state = self.state.lock();
        match state.pending.take() {
            Some(p) => {
                p.cancel.cancel();
                debug!(request_id = %p.request.id, "route request cancelled");
                true
            }
            None => false,
        }
    }

    /// `true` while a request is awaiting its response.
    pub fn is_pending(&self) -> bool {
        self.state.lock().pending.is_some()
    }

    /// The request currently allowed to report a result.
    pub fn current_request(&self) -> Option<RouteRequest> {
        self.state.lock().pending.as_ref().map(|p| p.request.clone())
    }

    /// Id of the most recently issued request (`RequestId(0)` if none).
    pub fn last_issued(&self) -> RequestId {
        self.state.lock().last_issued
    }

    // ── Internals ─────────────────────────────────────────────────────────

    /// Retire `id` if it is still the pending request.  `false` means stale.
    fn complete(&self, id: RequestId) -> bool {
        let mut state = self.state.lock();
        let current = state.pending.as_ref().is_some_and(|p| p.request.id == id);
        if current {
            state.pending = None;
        }
        current
    }
}
