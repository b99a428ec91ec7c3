use std::sync::Arc;

use logtrack_remotes::{
    AvailabilityRegistry, ModuleLoader, RegistrySlot, RemoteCatalog, RemoteMetrics,
    SharedRegistry,
};

/// State shared by every handler. Cloning is cheap.
#[derive(Clone)]
pub struct HostState {
    catalog: RemoteCatalog,
    slot: RegistrySlot,
    loader: Arc<dyn ModuleLoader>,
    metrics: Option<RemoteMetrics>,
    exporter: Option<SharedRegistry>,
}

impl HostState {
    pub fn new(catalog: RemoteCatalog, slot: RegistrySlot, loader: Arc<dyn ModuleLoader>) -> Self {
        Self {
            catalog,
            slot,
            loader,
            metrics: None,
            exporter: None,
        }
    }

    /// Attach the Prometheus registry exposed at `/metrics` along with the
    /// remote metrics registered on it.
    pub fn with_metrics(mut self, exporter: SharedRegistry, metrics: RemoteMetrics) -> Self {
        self.exporter = Some(exporter);
        self.metrics = Some(metrics);
        self
    }

    pub fn catalog(&self) -> &RemoteCatalog {
        &self.catalog
    }

    /// `None` while the bootstrap probes are still running.
    pub fn registry(&self) -> Option<&AvailabilityRegistry> {
        self.slot.get()
    }

    pub fn loader(&self) -> Arc<dyn ModuleLoader> {
        Arc::clone(&self.loader)
    }

    pub fn metrics(&self) -> Option<RemoteMetrics> {
        self.metrics.clone()
    }

    pub fn exporter(&self) -> Option<&SharedRegistry> {
        self.exporter.as_ref()
    }
}

impl std::fmt::Debug for HostState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostState")
            .field("catalog", &self.catalog)
            .field("ready", &self.slot.is_ready())
            .finish_non_exhaustive()
    }
}
