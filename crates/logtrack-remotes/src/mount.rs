//! ---
//! lt_section: "02-remote-availability"
//! lt_subsection: "module"
//! lt_type: "source"
//! lt_scope: "code"
//! lt_description: "Per-route mount state machine."
//! lt_version: "v0.0.0-prealpha"
//! lt_owner: "tbd"
//! ---
//! Two-step route gating. [`RouteView::enter`] first takes the pure
//! [`RouteGate`] decision; only an allowed gate starts a load, which then
//! reports through a [`MountHandle`] as pending, loaded or failed.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::descriptor::RemoteDescriptor;
use crate::gate::RouteGate;
use crate::loader::{LoadError, ModuleLoader, RemoteModule};
use crate::metrics::RemoteMetrics;
use crate::registry::AvailabilityRegistry;

/// Observable progress of a permitted load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Pending,
    Loaded(RemoteModule),
    Failed(LoadError),
}

impl LoadState {
    pub fn is_pending(&self) -> bool {
        matches!(self, LoadState::Pending)
    }

    pub fn outcome_label(&self) -> &'static str {
        match self {
            LoadState::Pending => "pending",
            LoadState::Loaded(_) => "loaded",
            LoadState::Failed(_) => "failed",
        }
    }
}

/// What a gated route renders on entry.
#[derive(Debug)]
pub enum RouteView {
    /// Denied: show the offline notice. No load was attempted.
    Offline { remote: RemoteDescriptor },
    /// Allowed: exactly one load is in flight behind the handle.
    Mounting(MountHandle),
}

impl RouteView {
    pub fn enter(
        registry: &AvailabilityRegistry,
        remote: &RemoteDescriptor,
        loader: Arc<dyn ModuleLoader>,
        metrics: Option<RemoteMetrics>,
    ) -> Self {
        match RouteGate::evaluate(registry, &remote.id) {
            RouteGate::Denied => {
                debug!(target: "logtrack::remotes::mount", remote = %remote.id, "gate denied; rendering offline notice");
                RouteView::Offline {
                    remote: remote.clone(),
                }
            }
            RouteGate::Allowed => {
                RouteView::Mounting(MountHandle::spawn(remote.clone(), loader, metrics))
            }
        }
    }

    pub fn gate(&self) -> RouteGate {
        match self {
            RouteView::Offline { .. } => RouteGate::Denied,
            RouteView::Mounting(_) => RouteGate::Allowed,
        }
    }
}

/// Handle to a single in-flight module load.
///
/// Dropping the handle before the load settles aborts it.
#[derive(Debug)]
pub struct MountHandle {
    remote_id: String,
    state: watch::Receiver<LoadState>,
    task: JoinHandle<()>,
}

impl MountHandle {
    fn spawn(
        remote: RemoteDescriptor,
        loader: Arc<dyn ModuleLoader>,
        metrics: Option<RemoteMetrics>,
    ) -> Self {
        let (tx, rx) = watch::channel(LoadState::Pending);
        let remote_id = remote.id.clone();
        let task = tokio::spawn(async move {
            debug!(target: "logtrack::remotes::mount", remote = %remote.id, url = %remote.entry_url, "loading remote module");
            let state = match loader.load(&remote).await {
                Ok(module) => {
                    info!(target: "logtrack::remotes::mount", remote = %remote.id, bytes = module.markup.len(), "remote module loaded");
                    LoadState::Loaded(module)
                }
                Err(err) => {
                    error!(target: "logtrack::remotes::mount", remote = %remote.id, error = %err, "remote module failed to load after positive verdict");
                    LoadState::Failed(err)
                }
            };
            if let Some(metrics) = &metrics {
                metrics.record_load(&remote.id, state.outcome_label());
            }
            let _ = tx.send(state);
        });
        Self {
            remote_id,
            state: rx,
            task,
        }
    }

    pub fn remote_id(&self) -> &str {
        &self.remote_id
    }

    /// Current state without waiting.
    pub fn state(&self) -> LoadState {
        self.state.borrow().clone()
    }

    /// Wait for the load to settle.
    pub async fn settled(mut self) -> LoadState {
        match self.state.wait_for(|state| !state.is_pending()).await {
            Ok(state) => state.clone(),
            Err(_) => LoadState::Failed(LoadError::Aborted),
        }
    }
}

impl Drop for MountHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
