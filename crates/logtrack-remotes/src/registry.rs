//! ---
//! lt_section: "02-remote-availability"
//! lt_subsection: "module"
//! lt_type: "source"
//! lt_scope: "code"
//! lt_description: "Bootstrap-time availability registry."
//! lt_version: "v0.0.0-prealpha"
//! lt_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::descriptor::{RemoteCatalog, RemoteDescriptor};
use crate::metrics::RemoteMetrics;
use crate::probe::{ProbeReport, RemoteProbe, DEFAULT_PROBE_TIMEOUT};

#[derive(Debug)]
struct RegistryInner {
    reports: IndexMap<String, ProbeReport>,
    elapsed: Duration,
    completed_at: DateTime<Utc>,
}

/// Frozen snapshot of every remote's verdict.
///
/// The only way to obtain one is [`RegistryBuilder::build`], which settles a
/// probe for every catalog entry first. The handle is read-only and cheap to
/// clone.
#[derive(Debug, Clone)]
pub struct AvailabilityRegistry {
    inner: Arc<RegistryInner>,
}

impl AvailabilityRegistry {
    /// Verdict for `remote_id`, or `None` for a remote outside the catalog.
    pub fn is_available(&self, remote_id: &str) -> Option<bool> {
        self.inner.reports.get(remote_id).map(|report| report.verdict)
    }

    pub fn report(&self, remote_id: &str) -> Option<&ProbeReport> {
        self.inner.reports.get(remote_id)
    }

    /// Entries in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProbeReport)> {
        self.inner
            .reports
            .iter()
            .map(|(id, report)| (id.as_str(), report))
    }

    pub fn len(&self) -> usize {
        self.inner.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.reports.is_empty()
    }

    pub fn online_count(&self) -> usize {
        self.inner.reports.values().filter(|r| r.verdict).count()
    }

    pub fn offline_count(&self) -> usize {
        self.len() - self.online_count()
    }

    /// Wall time of the bootstrap barrier, bounded by the slowest probe.
    pub fn elapsed(&self) -> Duration {
        self.inner.elapsed
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.inner.completed_at
    }
}

/// Runs the bootstrap probes and assembles the registry.
pub struct RegistryBuilder {
    probe: Arc<dyn RemoteProbe>,
    timeout: Duration,
    metrics: Option<RemoteMetrics>,
}

impl RegistryBuilder {
    pub fn new(probe: Arc<dyn RemoteProbe>) -> Self {
        Self {
            probe,
            timeout: DEFAULT_PROBE_TIMEOUT,
            metrics: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_metrics(mut self, metrics: RemoteMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Probe every remote concurrently and resolve once all of them settled.
    pub async fn build(&self, catalog: &RemoteCatalog) -> AvailabilityRegistry {
        let started = Instant::now();
        let probes = catalog.iter().map(|remote| self.probe_one(remote));
        let reports: IndexMap<String, ProbeReport> = join_all(probes).await.into_iter().collect();
        let elapsed = started.elapsed();

        if let Some(metrics) = &self.metrics {
            metrics.record_bootstrap(elapsed);
        }
        let registry = AvailabilityRegistry {
            inner: Arc::new(RegistryInner {
                reports,
                elapsed,
                completed_at: Utc::now(),
            }),
        };
        info!(
            target: "logtrack::remotes::registry",
            online = registry.online_count(),
            offline = registry.offline_count(),
            elapsed_ms = elapsed.as_millis() as u64,
            verdicts = ?registry.iter().map(|(id, r)| (id, r.verdict)).collect::<Vec<_>>(),
            "availability registry built",
        );
        registry
    }

    async fn probe_one(&self, remote: &RemoteDescriptor) -> (String, ProbeReport) {
        let report = self.probe.check(&remote.manifest_url, self.timeout).await;
        match &report.failure {
            None => info!(
                target: "logtrack::remotes::probe",
                remote = %remote.id,
                url = %remote.manifest_url,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "remote reachable",
            ),
            Some(failure) => warn!(
                target: "logtrack::remotes::probe",
                remote = %remote.id,
                url = %remote.manifest_url,
                elapsed_ms = report.elapsed.as_millis() as u64,
                reason = %failure,
                "remote unreachable; marking offline",
            ),
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_probe(&remote.id, &report);
        }
        (remote.id.clone(), report)
    }
}

/// Probe every descriptor with `probe` and the given deadline.
pub async fn build_registry(
    catalog: &RemoteCatalog,
    probe: Arc<dyn RemoteProbe>,
    timeout: Duration,
) -> AvailabilityRegistry {
    RegistryBuilder::new(probe)
        .with_timeout(timeout)
        .build(catalog)
        .await
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("availability registry has already been published")]
    AlreadyPublished,
}

/// Set-once holder through which the bootstrap routine hands the registry to
/// request handlers. Empty means the host is still checking remotes.
#[derive(Debug, Clone, Default)]
pub struct RegistrySlot {
    cell: Arc<OnceCell<AvailabilityRegistry>>,
}

impl RegistrySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, registry: AvailabilityRegistry) -> Result<(), RegistryError> {
        self.cell
            .set(registry)
            .map_err(|_| RegistryError::AlreadyPublished)
    }

    pub fn get(&self) -> Option<&AvailabilityRegistry> {
        self.cell.get()
    }

    pub fn is_ready(&self) -> bool {
        self.cell.get().is_some()
    }
}
