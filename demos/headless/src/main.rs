//! headless — drives the navigation engine against an in-memory map surface.
//!
//! Loads a small logistics dataset around Mobile, Alabama, populates the
//! entity layers, then replays a burst of selections the way a dashboard
//! would: a search pick immediately overridden by a list click, then a clear.
//!
//! Usage: `headless [config.json]`.  With an empty `access_token` routes are
//! straight lines computed locally; with a token they come from the
//! configured directions service.  Set `RUST_LOG=debug` to watch the
//! request lifecycle.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nav_core::{Coordinate, EntityCategory, NavConfig};
use nav_entities::{GeoEntityIndex, load_entities_reader};
use nav_layers::RecordingSurface;
use nav_route::{DirectionsService, HttpDirections, ReqwestClient, RouteError, RouteResult};
use nav_session::{
    FixedPosition, NavState, NavigationController, NoticeLog, SelectionBinding, SelectionEvent,
};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Where the demo user stands (downtown Mobile).
const DEVICE_POSITION: Coordinate = Coordinate::new(-88.0431, 30.6944);

/// Average urban driving speed used by the offline router.
const OFFLINE_SPEED_MPS: f64 = 11.0;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

const DATASET_CSV: &str = "\
id,name,category,lon,lat,phone\n\
1,Harbor Fuel & Supply,business,-88.0402,30.6901,251-555-0101\n\
2,Bayside Bakery,business,-88.0469,30.7010,251-555-0177\n\
3,Government St Charger,station,-88.0485,30.6862,\n\
4,Northside Charger,station,-88.0512,30.7120,\n\
5,Dock 4 Pickup,shipment-endpoint,-88.0390,30.6880,\n\
6,Airport Blvd Drop-off,shipment-endpoint,-88.1240,30.6718,\n\
";

// ── Offline directions ────────────────────────────────────────────────────────

/// Routes along the straight line between the endpoints.
struct StraightLineDirections;

impl DirectionsService for StraightLineDirections {
    async fn directions(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteResult, RouteError> {
        let distance = origin.distance_m(destination);
        Ok(RouteResult {
            distance_meters:  distance,
            duration_seconds: distance / OFFLINE_SPEED_MPS,
            geometry:         vec![origin, destination],
        })
    }
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => load_config(Path::new(&path))?,
        None => NavConfig::default(),
    };
    config.validate()?;

    if config.access_token.is_empty() {
        info!("no access token configured; using offline straight-line routes");
        run(StraightLineDirections, &config).await
    } else {
        let client = ReqwestClient::new(config.route_timeout())?;
        run(HttpDirections::from_config(client, &config), &config).await
    }
}

fn load_config(path: &Path) -> Result<NavConfig> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

async fn run<D: DirectionsService + 'static>(directions: D, config: &NavConfig) -> Result<()> {
    // ── Engine ────────────────────────────────────────────────────────────
    let controller = Arc::new(
        NavigationController::from_config(directions, RecordingSurface::new(), config)
            .with_observer(NoticeLog::new()),
    );
    let index = Arc::new(RwLock::new(GeoEntityIndex::new()));
    let binding = Arc::new(SelectionBinding::new(Arc::clone(&controller), Arc::clone(&index), config));

    // ── Two-phase init: the map comes up before the data ─────────────────
    binding.map_ready()?;
    binding.init_origin(&FixedPosition(DEVICE_POSITION)).await?;

    let entities = load_entities_reader(Cursor::new(DATASET_CSV))?;
    index.write().load(entities);
    binding.dataset_ready()?;
    info!(entities = index.read().len(), "dataset loaded");

    let nearest = index.read().nearest_in(EntityCategory::Station, DEVICE_POSITION, 1);
    if let Some(station) = nearest.first() {
        info!(station = %station.name, "nearest charging station");
    }

    // ── Event loop ────────────────────────────────────────────────────────
    let search = binding.register_source("search");
    let list = binding.register_source("business-list");
    let shutdown = CancellationToken::new();
    let running = tokio::spawn(Arc::clone(&binding).run(shutdown.clone()));

    let hits = binding.search("charger");
    info!(hits = hits.len(), "search \"charger\"");
    if let Some(first) = hits.first() {
        search.emit(SelectionEvent::SearchResult(first.id));
    }
    // A list click right behind the search pick supersedes it.
    if let Some(dock) = binding.search("dock").first() {
        list.emit(SelectionEvent::ListClick(dock.id));
    }

    wait_until_settled(&binding, config.route_timeout()).await;
    let session = controller.session();
    match (&session.selected_entity, controller.route_summary()) {
        (Some(entity), Some(summary)) => info!(destination = %entity.name, %summary, "route active"),
        _ => info!(state = ?session.state, "no active route"),
    }

    list.emit(SelectionEvent::Clear);
    tokio::time::sleep(POLL_INTERVAL).await;

    shutdown.cancel();
    running.await??;

    // ── Report ────────────────────────────────────────────────────────────
    controller.with_layers(|layers| {
        let surface = layers.surface();
        println!("Surface operations: {}", surface.ops().len());
        println!("Layers left:        {:?}", surface.layer_ids());
        println!("Markers left:       {}", surface.marker_ids().len());
    });
    for notice in controller.observer().notices() {
        println!("Notice: {notice}");
    }
    Ok(())
}

/// Poll until no navigation is resolving, or `limit` elapses.
async fn wait_until_settled<D>(
    binding: &SelectionBinding<D, RecordingSurface, NoticeLog>,
    limit:   Duration,
) where
    D: DirectionsService,
{
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        tokio::time::sleep(POLL_INTERVAL).await;
        let state = binding.controller().state();
        if state != NavState::Resolving && !binding.controller().is_resolving() {
            return;
        }
    }
}
