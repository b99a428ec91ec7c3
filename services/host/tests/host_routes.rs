//! End-to-end checks of the host router over a loopback listener, driven by
//! scripted probes and a recording loader.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use logtrack_host::{bootstrap, spawn_bootstrap, spawn_host, HostServer, HostState};
use logtrack_remotes::testing::{RecordingLoader, ScriptedProbe, ScriptedResponse};
use logtrack_remotes::{
    new_registry, LoadError, RegistryBuilder, RegistrySlot, RemoteCatalog, RemoteDescriptor,
    RemoteMetrics,
};
use reqwest::StatusCode;
use serde_json::Value;

fn catalog() -> RemoteCatalog {
    RemoteCatalog::new(vec![
        RemoteDescriptor::new("users", "Users", "/users", "http://users/m", "http://users/e"),
        RemoteDescriptor::new("audit", "Audit", "/audit", "http://audit/m", "http://audit/e"),
    ])
    .unwrap()
}

fn probe() -> ScriptedProbe {
    ScriptedProbe::new()
        .respond("http://users/m", ScriptedResponse::ok())
        .respond("http://audit/m", ScriptedResponse::status(500))
}

struct Host {
    server: HostServer,
    loader: RecordingLoader,
    slot: RegistrySlot,
}

impl Host {
    async fn start(loader: RecordingLoader, ready: bool) -> Self {
        let catalog = catalog();
        let exporter = new_registry();
        let metrics = RemoteMetrics::new(exporter.clone()).unwrap();
        let slot = RegistrySlot::new();
        let state = HostState::new(catalog.clone(), slot.clone(), Arc::new(loader.clone()))
            .with_metrics(exporter, metrics.clone());
        let server = spawn_host(state, SocketAddr::from(([127, 0, 0, 1], 0))).unwrap();
        if ready {
            let builder = RegistryBuilder::new(Arc::new(probe())).with_metrics(metrics);
            bootstrap(&catalog, &builder, &slot).await;
        }
        Self {
            server,
            loader,
            slot,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.server.addr(), path)
    }

    async fn get(&self, path: &str) -> (StatusCode, String) {
        let response = reqwest::get(self.url(path)).await.unwrap();
        let status = response.status();
        (status, response.text().await.unwrap())
    }
}

#[tokio::test]
async fn interim_page_is_served_until_registry_is_published() {
    let host = Host::start(RecordingLoader::new().serve("users", "<p>users</p>"), false).await;

    for path in ["/", "/users", "/audit", "/remotes/users/widget"] {
        let response = reqwest::get(host.url(path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE, "{path}");
        assert!(response.headers().contains_key("retry-after"));
        assert!(response.headers().contains_key("refresh"));
        assert!(response.text().await.unwrap().contains("Checking remotes"));
    }
    let (status, body) = host.get("/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("checking"));
    assert_eq!(host.loader.total_calls(), 0);

    let builder = RegistryBuilder::new(Arc::new(probe()));
    bootstrap(&catalog(), &builder, &host.slot).await;
    let (status, body) = host.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Welcome to the Host App"));

    host.server.shutdown().await.unwrap();
}

#[tokio::test]
async fn background_bootstrap_flips_a_serving_listener_to_ready() {
    let host = Host::start(RecordingLoader::new(), false).await;
    let slow = ScriptedProbe::new()
        .respond(
            "http://users/m",
            ScriptedResponse::ok().after(Duration::from_millis(400)),
        )
        .respond("http://audit/m", ScriptedResponse::status(500));
    let builder = RegistryBuilder::new(Arc::new(slow));
    let handle = spawn_bootstrap(catalog(), builder, host.slot.clone());

    // The listener answers while the users manifest is still pending.
    let (status, body) = host.get("/").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("Checking remotes"));

    let registry = handle.await.unwrap();
    assert_eq!(registry.online_count(), 1);
    let (status, body) = host.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Users: online"));
    let (status, _) = host.get("/readyz").await;
    assert_eq!(status, StatusCode::OK);
    host.server.shutdown().await.unwrap();
}

#[tokio::test]
async fn welcome_page_lists_every_remote_with_its_verdict() {
    let host = Host::start(RecordingLoader::new(), true).await;
    let (status, body) = host.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Users: online"));
    assert!(body.contains("Audit: offline"));
    assert_eq!(body.matches("badge offline").count(), 1);
    assert_eq!(host.loader.total_calls(), 0);
    host.server.shutdown().await.unwrap();
}

#[tokio::test]
async fn denied_route_never_loads_the_remote() {
    let host = Host::start(RecordingLoader::new().serve("audit", "<p>audit</p>"), true).await;

    let (status, body) = host.get("/audit").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Audit remote offline"));
    assert!(!body.contains("hx-get"));

    let (status, body) = host.get("/remotes/audit/widget").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Audit remote offline"));
    assert_eq!(host.loader.calls("audit"), 0);
    host.server.shutdown().await.unwrap();
}

#[tokio::test]
async fn allowed_route_mounts_the_remote_fragment_once_per_entry() {
    let host = Host::start(
        RecordingLoader::new().serve("users", "<table><td>alice</td></table>"),
        true,
    )
    .await;

    let (status, body) = host.get("/users").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("hx-get=\"/remotes/users/widget\""));
    assert!(body.contains("Loading users"));
    assert_eq!(host.loader.calls("users"), 0);

    let (status, body) = host.get("/remotes/users/widget").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<td>alice</td>"));
    assert_eq!(host.loader.calls("users"), 1);

    host.get("/remotes/users/widget").await;
    assert_eq!(host.loader.calls("users"), 2);
    host.server.shutdown().await.unwrap();
}

#[tokio::test]
async fn load_failure_after_online_verdict_renders_failure_notice() {
    let host = Host::start(
        RecordingLoader::new().fail("users", LoadError::Status { status: 503 }),
        true,
    )
    .await;
    let (status, body) = host.get("/remotes/users/widget").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("remote failed to load"));
    assert_eq!(host.loader.calls("users"), 1);

    // The verdict itself is not revised.
    let (_, page) = host.get("/").await;
    assert!(page.contains("Users: online"));
    host.server.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_remote_is_not_found() {
    let host = Host::start(RecordingLoader::new(), true).await;
    let (status, _) = host.get("/remotes/billing/widget").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = host.get("/billing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    host.server.shutdown().await.unwrap();
}

#[tokio::test]
async fn api_and_probes_report_the_registry() {
    let host = Host::start(RecordingLoader::new(), true).await;

    let (status, body) = host.get("/api/remotes").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["ready"], true);
    let remotes = json["remotes"].as_array().unwrap();
    assert_eq!(remotes.len(), 2);
    assert_eq!(remotes[0]["id"], "users");
    assert_eq!(remotes[0]["available"], true);
    assert_eq!(remotes[0]["gate"], "allowed");
    assert_eq!(remotes[1]["available"], false);
    assert_eq!(remotes[1]["failure"]["kind"], "status");
    assert_eq!(remotes[1]["failure"]["status"], 500);

    let (status, body) = host.get("/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("ok"));
    let (status, body) = host.get("/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("ready"));

    let (status, body) = host.get("/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("logtrack_remote_available{remote=\"users\"} 1"));
    assert!(body.contains("logtrack_remote_available{remote=\"audit\"} 0"));
    host.server.shutdown().await.unwrap();
}
