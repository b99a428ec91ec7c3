//! ---
//! lt_section: "03-persistence-logging"
//! lt_subsection: "module"
//! lt_type: "source"
//! lt_scope: "code"
//! lt_description: "Prometheus instrumentation for probes, bootstrap and module loads."
//! lt_version: "v0.0.0-prealpha"
//! lt_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use prometheus::{Gauge, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry};

use crate::probe::ProbeReport;

/// Shared registry type used across the host.
pub type SharedRegistry = Arc<Registry>;

/// Produce a new shared registry.
pub fn new_registry() -> SharedRegistry {
    Arc::new(Registry::new())
}

/// Metrics describing remote availability.
#[derive(Clone, Debug)]
pub struct RemoteMetrics {
    available: IntGaugeVec,
    probe_seconds: HistogramVec,
    module_loads: IntCounterVec,
    bootstrap_seconds: Gauge,
}

impl RemoteMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let available = IntGaugeVec::new(
            Opts::new(
                "logtrack_remote_available",
                "Bootstrap verdict per remote (1 reachable, 0 offline)",
            ),
            &["remote"],
        )?;
        registry.register(Box::new(available.clone()))?;

        let probe_seconds = HistogramVec::new(
            HistogramOpts::new(
                "logtrack_probe_duration_seconds",
                "Latency of remote manifest probes",
            )
            .buckets(prometheus::exponential_buckets(0.005, 2.0, 12)?),
            &["remote"],
        )?;
        registry.register(Box::new(probe_seconds.clone()))?;

        let module_loads = IntCounterVec::new(
            Opts::new(
                "logtrack_module_loads_total",
                "Dynamic module loads by remote and outcome",
            ),
            &["remote", "outcome"],
        )?;
        registry.register(Box::new(module_loads.clone()))?;

        let bootstrap_seconds = Gauge::with_opts(Opts::new(
            "logtrack_bootstrap_seconds",
            "Time spent building the availability registry",
        ))?;
        registry.register(Box::new(bootstrap_seconds.clone()))?;

        Ok(Self {
            available,
            probe_seconds,
            module_loads,
            bootstrap_seconds,
        })
    }

    pub fn record_probe(&self, remote_id: &str, report: &ProbeReport) {
        self.available
            .with_label_values(&[remote_id])
            .set(i64::from(report.verdict));
        self.probe_seconds
            .with_label_values(&[remote_id])
            .observe(report.elapsed.as_secs_f64());
    }

    pub fn record_load(&self, remote_id: &str, outcome: &str) {
        self.module_loads
            .with_label_values(&[remote_id, outcome])
            .inc();
    }

    pub fn record_bootstrap(&self, elapsed: Duration) {
        self.bootstrap_seconds.set(elapsed.as_secs_f64());
    }
}
