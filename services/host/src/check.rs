//! One-shot availability check behind `logtrack-host check`.

use anyhow::Result;
use logtrack_remotes::{AvailabilityRegistry, ProbeReport, RegistryBuilder, RemoteCatalog};
use serde::Serialize;

/// Result of a check run: the rendered verdicts and whether every remote
/// answered. The binary maps `healthy == false` to a failing exit code.
#[derive(Debug)]
pub struct CheckSummary {
    pub output: String,
    pub healthy: bool,
    pub registry: AvailabilityRegistry,
}

#[derive(Serialize)]
struct CheckEntry<'a> {
    id: &'a str,
    manifest_url: &'a str,
    report: Option<&'a ProbeReport>,
}

/// Probe every remote once and render the verdicts as a table or as JSON.
pub async fn run_check(
    catalog: &RemoteCatalog,
    builder: &RegistryBuilder,
    json: bool,
) -> Result<CheckSummary> {
    let registry = builder.build(catalog).await;
    let output = if json {
        render_json(catalog, &registry)?
    } else {
        render_table(catalog, &registry)
    };
    Ok(CheckSummary {
        output,
        healthy: registry.offline_count() == 0,
        registry,
    })
}

fn render_json(catalog: &RemoteCatalog, registry: &AvailabilityRegistry) -> Result<String> {
    let entries: Vec<_> = catalog
        .iter()
        .map(|remote| CheckEntry {
            id: &remote.id,
            manifest_url: &remote.manifest_url,
            report: registry.report(&remote.id),
        })
        .collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}

fn render_table(catalog: &RemoteCatalog, registry: &AvailabilityRegistry) -> String {
    let mut out = String::new();
    for remote in catalog.iter() {
        let Some(report) = registry.report(&remote.id) else {
            continue;
        };
        let verdict = if report.verdict { "online" } else { "offline" };
        let reason = report
            .failure
            .as_ref()
            .map(|failure| format!(" ({failure})"))
            .unwrap_or_default();
        out.push_str(&format!(
            "{:<12} {:<8} {:>6} ms  {}{}\n",
            remote.id,
            verdict,
            report.elapsed.as_millis(),
            remote.manifest_url,
            reason
        ));
    }
    out
}
