// ---
// lt_section: "15-testing-qa-runbook"
// lt_subsection: "integration-tests"
// lt_type: "test"
// lt_scope: "code"
// lt_description: "Bootstrap and gating scenarios against real loopback remotes."
// lt_version: "v0.0.0-prealpha"
// lt_owner: "tbd"
// ---
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use logtrack_host::{bootstrap, spawn_host, HostServer, HostState};
use logtrack_remotes::{
    HttpModuleLoader, HttpProbe, RegistryBuilder, RegistrySlot, RemoteCatalog, RemoteDescriptor,
};
use tokio::net::TcpListener;

/// How a fake remote answers its manifest request.
#[derive(Clone, Copy)]
enum Manifest {
    Ok { delay: Duration },
    Status(u16),
}

struct FakeRemote {
    base: String,
    widget_hits: Arc<AtomicUsize>,
}

async fn spawn_remote(name: &'static str, manifest: Manifest) -> FakeRemote {
    let widget_hits = Arc::new(AtomicUsize::new(0));
    let hits = Arc::clone(&widget_hits);
    let app = Router::new()
        .route(
            "/assets/remoteEntry.js",
            get(move || async move {
                match manifest {
                    Manifest::Ok { delay } => {
                        tokio::time::sleep(delay).await;
                        (StatusCode::OK, "export default {}")
                    }
                    Manifest::Status(code) => (
                        StatusCode::from_u16(code).unwrap(),
                        "manifest unavailable",
                    ),
                }
            }),
        )
        .route(
            "/widget",
            get(move || {
                let hits = Arc::clone(&hits);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    format!("<section>{name} widget</section>")
                }
            }),
        );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    FakeRemote {
        base: format!("http://{addr}"),
        widget_hits,
    }
}

fn descriptor(id: &str, label: &str, manifest_url: String, entry_url: String) -> RemoteDescriptor {
    RemoteDescriptor::new(id, label, format!("/{id}"), manifest_url, entry_url)
}

fn remote_descriptor(id: &str, label: &str, remote: &FakeRemote) -> RemoteDescriptor {
    descriptor(
        id,
        label,
        format!("{}/assets/remoteEntry.js", remote.base),
        format!("{}/widget", remote.base),
    )
}

async fn start_host(catalog: RemoteCatalog, probe_timeout: Duration) -> (HostServer, Duration) {
    let slot = RegistrySlot::new();
    let loader = Arc::new(HttpModuleLoader::new(Duration::from_secs(5)).unwrap());
    let state = HostState::new(catalog.clone(), slot.clone(), loader);
    let server = spawn_host(state, SocketAddr::from(([127, 0, 0, 1], 0))).unwrap();

    let builder = RegistryBuilder::new(Arc::new(HttpProbe::new().unwrap())).with_timeout(probe_timeout);
    let started = Instant::now();
    bootstrap(&catalog, &builder, &slot).await;
    (server, started.elapsed())
}

async fn fetch(server: &HostServer, path: &str) -> (reqwest::StatusCode, String) {
    let response = reqwest::get(format!("http://{}{}", server.addr(), path))
        .await
        .unwrap();
    let status = response.status();
    (status, response.text().await.unwrap())
}

#[tokio::test]
async fn both_remotes_online_mount_their_widgets() {
    let users = spawn_remote("users", Manifest::Ok { delay: Duration::ZERO }).await;
    let audit = spawn_remote("audit", Manifest::Ok { delay: Duration::from_millis(50) }).await;
    let catalog = RemoteCatalog::new(vec![
        remote_descriptor("users", "Users", &users),
        remote_descriptor("audit", "Audit", &audit),
    ])
    .unwrap();

    let (server, elapsed) = start_host(catalog, Duration::from_millis(3000)).await;
    assert!(elapsed < Duration::from_millis(3000));

    let (_, home) = fetch(&server, "/").await;
    assert!(home.contains("Users: online"));
    assert!(home.contains("Audit: online"));
    assert!(!home.contains("badge offline"));

    for id in ["users", "audit"] {
        let (status, page) = fetch(&server, &format!("/{id}")).await;
        assert_eq!(status, reqwest::StatusCode::OK);
        assert!(page.contains(&format!("hx-get=\"/remotes/{id}/widget\"")));

        let (status, widget) = fetch(&server, &format!("/remotes/{id}/widget")).await;
        assert_eq!(status, reqwest::StatusCode::OK);
        assert!(widget.contains(&format!("<section>{id} widget</section>")));
    }
    assert_eq!(users.widget_hits.load(Ordering::SeqCst), 1);
    assert_eq!(audit.widget_hits.load(Ordering::SeqCst), 1);
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn slow_remote_times_out_and_bounds_bootstrap() {
    let slow = spawn_remote("users", Manifest::Ok { delay: Duration::from_secs(10) }).await;
    let fast = spawn_remote("audit", Manifest::Ok { delay: Duration::from_millis(100) }).await;
    let catalog = RemoteCatalog::new(vec![
        remote_descriptor("users", "Users", &slow),
        remote_descriptor("audit", "Audit", &fast),
    ])
    .unwrap();

    let (server, elapsed) = start_host(catalog, Duration::from_millis(3000)).await;
    assert!(elapsed >= Duration::from_millis(3000), "bootstrap finished early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(10), "timeout not enforced: {elapsed:?}");

    let (_, home) = fetch(&server, "/").await;
    assert!(home.contains("Users: offline"));
    assert!(home.contains("Audit: online"));

    let (_, page) = fetch(&server, "/users").await;
    assert!(page.contains("Users remote offline"));
    assert_eq!(slow.widget_hits.load(Ordering::SeqCst), 0);
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn server_error_denies_the_route_without_loading() {
    let broken = spawn_remote("users", Manifest::Status(500)).await;
    let healthy = spawn_remote("audit", Manifest::Ok { delay: Duration::ZERO }).await;
    let catalog = RemoteCatalog::new(vec![
        remote_descriptor("users", "Users", &broken),
        remote_descriptor("audit", "Audit", &healthy),
    ])
    .unwrap();

    let (server, _) = start_host(catalog, Duration::from_millis(3000)).await;

    let (status, page) = fetch(&server, "/users").await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert!(page.contains("Users remote offline"));
    assert!(!page.contains("hx-get"));

    let (_, notice) = fetch(&server, "/remotes/users/widget").await;
    assert!(notice.contains("Users remote offline"));
    assert_eq!(broken.widget_hits.load(Ordering::SeqCst), 0);
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn malformed_manifest_url_resolves_offline() {
    let healthy = spawn_remote("users", Manifest::Ok { delay: Duration::ZERO }).await;
    let catalog = RemoteCatalog::new(vec![
        remote_descriptor("users", "Users", &healthy),
        descriptor(
            "audit",
            "Audit",
            "not a url at all".to_owned(),
            "also not a url".to_owned(),
        ),
    ])
    .unwrap();

    let (server, _) = start_host(catalog, Duration::from_millis(3000)).await;

    let (status, home) = fetch(&server, "/").await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert!(home.contains("Users: online"));
    assert!(home.contains("Audit: offline"));

    let (_, snapshot) = fetch(&server, "/api/remotes").await;
    assert!(snapshot.contains("invalid_url"));
    server.shutdown().await.unwrap();
}
