//! ---
//! lt_section: "02-remote-availability"
//! lt_subsection: "module"
//! lt_type: "source"
//! lt_scope: "code"
//! lt_description: "Time-bounded reachability probes against remote manifests."
//! lt_version: "v0.0.0-prealpha"
//! lt_owner: "tbd"
//! ---
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tokio::time::Instant;
use url::Url;

/// Probe deadline used when configuration does not say otherwise.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(3000);

/// Why a probe concluded that a remote is unreachable.
///
/// Purely diagnostic. It is logged and reported, but gating only ever looks at
/// [`ProbeReport::verdict`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeFailure {
    #[error("invalid manifest url: {reason}")]
    InvalidUrl { reason: String },
    #[error("probe timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
    #[error("remote responded with status {status}")]
    Status { status: u16 },
    #[error("network error: {reason}")]
    Network { reason: String },
}

/// Outcome of a single probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    pub verdict: bool,
    pub failure: Option<ProbeFailure>,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub probed_at: DateTime<Utc>,
}

impl ProbeReport {
    pub fn reachable(elapsed: Duration) -> Self {
        Self {
            verdict: true,
            failure: None,
            elapsed,
            probed_at: Utc::now(),
        }
    }

    pub fn unreachable(failure: ProbeFailure, elapsed: Duration) -> Self {
        Self {
            verdict: false,
            failure: Some(failure),
            elapsed,
            probed_at: Utc::now(),
        }
    }
}

fn serialize_millis<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_millis() as u64)
}

/// A reachability check against a remote's manifest URL.
///
/// Implementations must never fail or panic on remote misbehaviour: every
/// failure path is folded into an unreachable [`ProbeReport`].
#[async_trait]
pub trait RemoteProbe: Send + Sync + 'static {
    /// Probe `url`, giving up after `timeout`.
    async fn check(&self, url: &str, timeout: Duration) -> ProbeReport;

    /// Boolean view of [`RemoteProbe::check`].
    async fn probe(&self, url: &str, timeout: Duration) -> bool {
        self.check(url, timeout).await.verdict
    }
}

/// Probe issuing a plain HTTP GET through a shared, pooled client.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new() -> Result<Self> {
        // No client-wide timeout: each probe carries its own deadline.
        let client = Client::builder()
            .build()
            .context("failed to build probe http client")?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteProbe for HttpProbe {
    async fn check(&self, url: &str, timeout: Duration) -> ProbeReport {
        let started = Instant::now();
        let target = match parse_probe_url(url) {
            Ok(target) => target,
            Err(failure) => return ProbeReport::unreachable(failure, started.elapsed()),
        };

        // On expiry the request future is dropped, which aborts the connection.
        let response = tokio::time::timeout(timeout, self.client.get(target).send()).await;
        let elapsed = started.elapsed();
        match response {
            Err(_) => ProbeReport::unreachable(
                ProbeFailure::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                },
                elapsed,
            ),
            Ok(Err(err)) => ProbeReport::unreachable(
                ProbeFailure::Network {
                    reason: err.to_string(),
                },
                elapsed,
            ),
            Ok(Ok(resp)) if resp.status().is_success() => ProbeReport::reachable(elapsed),
            Ok(Ok(resp)) => ProbeReport::unreachable(
                ProbeFailure::Status {
                    status: resp.status().as_u16(),
                },
                elapsed,
            ),
        }
    }
}

fn parse_probe_url(raw: &str) -> Result<Url, ProbeFailure> {
    let url = Url::parse(raw.trim()).map_err(|err| ProbeFailure::InvalidUrl {
        reason: err.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ProbeFailure::InvalidUrl {
            reason: format!("unsupported scheme {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    async fn serve(router: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn remote_router() -> Router {
        Router::new()
            .route("/assets/remoteEntry.js", get(|| async { "export default {}" }))
            .route(
                "/broken/remoteEntry.js",
                get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            )
            .route(
                "/slow/remoteEntry.js",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            )
    }

    #[tokio::test]
    async fn ok_response_is_reachable() {
        let addr = serve(remote_router()).await;
        let probe = HttpProbe::new().unwrap();
        let report = probe
            .check(&format!("http://{addr}/assets/remoteEntry.js"), DEFAULT_PROBE_TIMEOUT)
            .await;
        assert!(report.verdict);
        assert!(report.failure.is_none());
    }

    #[tokio::test]
    async fn server_error_is_unreachable() {
        let addr = serve(remote_router()).await;
        let probe = HttpProbe::new().unwrap();
        let report = probe
            .check(&format!("http://{addr}/broken/remoteEntry.js"), DEFAULT_PROBE_TIMEOUT)
            .await;
        assert!(!report.verdict);
        assert_eq!(report.failure, Some(ProbeFailure::Status { status: 500 }));
    }

    #[tokio::test]
    async fn missing_manifest_is_unreachable() {
        let addr = serve(remote_router()).await;
        let probe = HttpProbe::new().unwrap();
        assert!(
            !probe
                .probe(&format!("http://{addr}/nope.js"), DEFAULT_PROBE_TIMEOUT)
                .await
        );
    }

    #[tokio::test]
    async fn slow_remote_times_out_at_deadline() {
        let addr = serve(remote_router()).await;
        let probe = HttpProbe::new().unwrap();
        let started = std::time::Instant::now();
        let report = probe
            .check(
                &format!("http://{addr}/slow/remoteEntry.js"),
                Duration::from_millis(200),
            )
            .await;
        assert!(!report.verdict);
        assert_eq!(report.failure, Some(ProbeFailure::Timeout { timeout_ms: 200 }));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn refused_connection_is_network_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let probe = HttpProbe::new().unwrap();
        let report = probe
            .check(&format!("http://{addr}/assets/remoteEntry.js"), DEFAULT_PROBE_TIMEOUT)
            .await;
        assert!(matches!(report.failure, Some(ProbeFailure::Network { .. })));
    }

    #[tokio::test]
    async fn malformed_urls_resolve_false_without_request() {
        let probe = HttpProbe::new().unwrap();
        for raw in ["not a url", "", "ftp://example.com/remoteEntry.js", "http//missing"] {
            let report = probe.check(raw, DEFAULT_PROBE_TIMEOUT).await;
            assert!(!report.verdict, "{raw:?} should be unreachable");
            assert!(matches!(report.failure, Some(ProbeFailure::InvalidUrl { .. })));
        }
    }
}
