//! HTTP surface of the host shell.
//!
//! Every presentation route first checks whether the availability registry
//! has been published. Until it has, the interim "Checking remotes…" page is
//! served and no route decision is made at all.

use std::sync::Arc;

use anyhow::Context;
use askama::Template;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use logtrack_remotes::{AvailabilityRegistry, LoadState, RouteGate, RouteView};
use prometheus::TextEncoder;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, instrument};

use crate::error::AppError;
use crate::state::HostState;
use crate::views::{
    CheckingTemplate, RemoteFailedTemplate, RemoteOfflineTemplate, RemoteRouteTemplate,
    RemoteStatus, RemoteWidgetTemplate, ShellView, WelcomeTemplate,
};

const CHECKING_REFRESH_SECS: u32 = 1;

/// Build the router: fixed host routes plus one gated route per remote.
pub fn router(state: HostState) -> Router {
    let mut router = Router::new()
        .route("/", get(welcome))
        .route("/remotes/:id/widget", get(remote_widget))
        .route("/api/remotes", get(remotes_json))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics));

    for remote in state.catalog().iter() {
        let remote_id: Arc<str> = Arc::from(remote.id.as_str());
        router = router.route(
            &remote.route,
            get(move |State(state): State<HostState>| {
                let remote_id = Arc::clone(&remote_id);
                async move { gated_route(state, &remote_id).await }
            }),
        );
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

fn render<T: Template>(template: &T, what: &'static str) -> Result<String, AppError> {
    Ok(template.render().with_context(|| format!("render {what}"))?)
}

/// Interim response while the registry is still being built.
///
/// 503 keeps caches and HTMX swaps from treating the page as final.
/// `Refresh` reloads browsers and `Retry-After` paces other clients until
/// the registry is published.
fn checking() -> Result<Response, AppError> {
    let body = render(
        &CheckingTemplate {
            refresh_secs: CHECKING_REFRESH_SECS,
        },
        "checking page",
    )?;
    Ok((
        StatusCode::SERVICE_UNAVAILABLE,
        [
            (header::RETRY_AFTER, HeaderValue::from(CHECKING_REFRESH_SECS)),
            (header::REFRESH, HeaderValue::from(CHECKING_REFRESH_SECS)),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ],
        Html(body),
    )
        .into_response())
}

#[instrument(skip_all)]
async fn welcome(State(state): State<HostState>) -> Result<Response, AppError> {
    let Some(registry) = state.registry() else {
        return checking();
    };
    let template = WelcomeTemplate {
        shell: ShellView::new(state.catalog(), registry, "/"),
    };
    Ok(Html(render(&template, "welcome page")?).into_response())
}

/// Page for one gated route. The gate is re-read from the registry on every
/// request; the mount itself happens through [`remote_widget`].
///
/// This handler never calls the loader. An allowed page only carries the
/// `hx-get` trigger, and a denied page renders the offline notice without it.
#[instrument(skip(state))]
async fn gated_route(state: HostState, remote_id: &str) -> Result<Response, AppError> {
    let Some(registry) = state.registry() else {
        return checking();
    };
    // Routes are mounted from the catalog, so a miss means a stale closure.
    let remote = state
        .catalog()
        .get(remote_id)
        .ok_or_else(|| AppError::UnknownRemote(remote_id.to_owned()))?;
    let shell = ShellView::new(state.catalog(), registry, &remote.route);
    let status = RemoteStatus::new(remote, registry);
    let template = RemoteRouteTemplate {
        shell,
        remote: status,
    };
    Ok(Html(render(&template, "remote route")?).into_response())
}

/// Fragment endpoint that performs the dynamic load of a remote's UI.
#[instrument(skip_all, fields(remote = %id))]
async fn remote_widget(
    State(state): State<HostState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let Some(registry) = state.registry() else {
        return checking();
    };
    let remote = state
        .catalog()
        .get(&id)
        .ok_or_else(|| AppError::UnknownRemote(id.clone()))?;
    let status = RemoteStatus::new(remote, registry);

    // The verdict is consulted before the loader is touched.
    let handle = match RouteView::enter(registry, remote, state.loader(), state.metrics()) {
        RouteView::Offline { .. } => {
            let body = render(&RemoteOfflineTemplate { remote: status }, "offline notice")?;
            return Ok(Html(body).into_response());
        }
        RouteView::Mounting(handle) => handle,
    };

    match handle.settled().await {
        LoadState::Loaded(module) => {
            let template = RemoteWidgetTemplate {
                remote: status,
                markup: module.markup,
            };
            Ok(Html(render(&template, "remote widget")?).into_response())
        }
        LoadState::Failed(err) => {
            error!(remote = %id, error = %err, "rendering load failure notice");
            let body = render(&RemoteFailedTemplate { remote: status }, "load failure notice")?;
            // The shell's beforeSwap handler still swaps 502 fragments in.
            Ok((StatusCode::BAD_GATEWAY, Html(body)).into_response())
        }
        LoadState::Pending => Err(AppError::Internal(anyhow::anyhow!(
            "mount for '{id}' settled while pending"
        ))),
    }
}

#[derive(Debug, Serialize)]
struct RegistrySnapshot {
    ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    elapsed_ms: Option<u64>,
    remotes: Vec<RemoteEntry>,
}

#[derive(Debug, Serialize)]
struct RemoteEntry {
    id: String,
    label: String,
    route: String,
    available: bool,
    gate: RouteGate,
    #[serde(flatten)]
    report: Option<logtrack_remotes::ProbeReport>,
}

impl RegistrySnapshot {
    fn from_registry(state: &HostState, registry: &AvailabilityRegistry) -> Self {
        let remotes = state
            .catalog()
            .iter()
            .map(|remote| {
                let gate = RouteGate::evaluate(registry, &remote.id);
                RemoteEntry {
                    id: remote.id.clone(),
                    label: remote.label.clone(),
                    route: remote.route.clone(),
                    available: gate.is_allowed(),
                    gate,
                    report: registry.report(&remote.id).cloned(),
                }
            })
            .collect();
        Self {
            ready: true,
            completed_at: Some(registry.completed_at().to_rfc3339()),
            elapsed_ms: Some(registry.elapsed().as_millis() as u64),
            remotes,
        }
    }
}

#[instrument(skip_all)]
async fn remotes_json(State(state): State<HostState>) -> Response {
    match state.registry() {
        Some(registry) => Json(RegistrySnapshot::from_registry(&state, registry)).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(RegistrySnapshot {
                ready: false,
                completed_at: None,
                elapsed_ms: None,
                remotes: Vec::new(),
            }),
        )
            .into_response(),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn readyz(State(state): State<HostState>) -> Response {
    if state.registry().is_some() {
        Json(HealthResponse { status: "ready" }).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse { status: "checking" }),
        )
            .into_response()
    }
}

/// Prometheus scrape endpoint.
async fn metrics(State(state): State<HostState>) -> Response {
    let Some(registry) = state.exporter() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics registry unavailable",
        )
            .into_response();
    };
    let encoder = TextEncoder::new();
    match encoder.encode_to_string(&registry.gather()) {
        Ok(body) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static(prometheus::TEXT_FORMAT),
            )],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
