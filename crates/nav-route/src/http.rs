//! HTTP client abstraction for testability.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::RouteError;

/// Asynchronous HTTP GET, injected into [`HttpDirections`][crate::HttpDirections]
/// so tests can substitute canned responses.
pub trait HttpClient: Send + Sync {
    /// Fetch `url` and return the body of a 2xx response.
    ///
    /// Non-2xx statuses map to [`RouteError::Service`]; transport failures to
    /// [`RouteError::Network`].
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, RouteError>> + Send;
}

/// Async HTTP client backed by `reqwest`.
///
/// Dropping the future returned by [`get`][HttpClient::get] aborts the
/// underlying connection, which is what makes in-flight route cancellation
/// real rather than merely a stale-check.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

const USER_AGENT: &str = concat!("rust_nav/", env!("CARGO_PKG_VERSION"));

impl ReqwestClient {
    /// Build a client whose transport-level timeout is `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, RouteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| RouteError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, RouteError> {
        trace!(url = url, "HTTP GET request starting");

        let response = match self.client.get(url).send().await {
            Ok(resp) => {
                debug!(status = resp.status().as_u16(), "HTTP response received");
                resp
            }
            Err(e) => {
                warn!(
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(RouteError::Network(e.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "HTTP error status");
            return Err(RouteError::Service { status: status.as_u16() });
        }

        match response.bytes().await {
            Ok(bytes) => {
                trace!(bytes = bytes.len(), "HTTP response body read");
                Ok(bytes.to_vec())
            }
            Err(e) => {
                warn!(error = %e, "failed to read response body");
                Err(RouteError::Network(format!("failed to read response: {e}")))
            }
        }
    }
}
