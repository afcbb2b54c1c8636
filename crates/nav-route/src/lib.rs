//! `nav-route` — route resolution with latest-wins cancellation.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                    |
//! |----------------|-------------------------------------------------------------|
//! | [`route`]      | `RouteRequest`, `RouteResult`, `RouteOutcome`               |
//! | [`directions`] | `DirectionsService` trait, `HttpDirections` adapter         |
//! | [`http`]       | `HttpClient` trait, `ReqwestClient`                         |
//! | [`client`]     | `RouteClient<D>`, `RouteTicket`: one current request        |
//! | [`error`]      | `RouteError`                                                |
//!
//! `RouteResult` names the route value itself, so unlike the other `nav-*`
//! crates there is no `*Result<T>` alias here.
//!
//! # Latest-wins
//!
//! ```text
//! Idle ──resolve()──▶ Pending ──(response, still current)──▶ Idle  (Success / Failed)
//! Pending ──resolve() again──▶ Pending   (old request cancelled, new one starts)
//! Pending ──(response, superseded)──▶ Idle  (discarded → Cancelled)
//! ```

pub mod client;
pub mod directions;
pub mod error;
pub mod http;
pub mod route;


pub use client::{RouteClient, RouteTicket};
pub use directions::{DirectionsService, HttpDirections, parse_directions};
pub use error::RouteError;
pub use http::{HttpClient, ReqwestClient};
pub use route::{RouteOutcome, RouteRequest, RouteResult};
