//! ---
//! lt_section: "15-testing-qa-runbook"
//! lt_subsection: "module"
//! lt_type: "source"
//! lt_scope: "code"
//! lt_description: "Scripted probes and loaders for deterministic tests."
//! lt_version: "v0.0.0-prealpha"
//! lt_owner: "tbd"
//! ---
//! Test doubles for the availability core. Both doubles are driven by the
//! tokio clock, so suites running with paused time stay deterministic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::descriptor::RemoteDescriptor;
use crate::loader::{LoadError, ModuleLoader, RemoteModule};
use crate::probe::{ProbeFailure, ProbeReport, RemoteProbe};

#[derive(Debug, Clone)]
enum Outcome {
    Ok,
    Status(u16),
    Network(String),
}

/// Canned answer for one probed URL.
#[derive(Debug, Clone)]
pub struct ScriptedResponse {
    outcome: Outcome,
    delay: Duration,
}

impl ScriptedResponse {
    pub fn ok() -> Self {
        Self {
            outcome: Outcome::Ok,
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            outcome: Outcome::Status(status),
            delay: Duration::ZERO,
        }
    }

    pub fn network(reason: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Network(reason.into()),
            delay: Duration::ZERO,
        }
    }

    /// Respond only after `delay`; a delay beyond the probe deadline times out.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Probe answering from a script keyed by URL. Unscripted URLs fail as
/// network errors.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProbe {
    script: Arc<Mutex<HashMap<String, ScriptedResponse>>>,
    calls: Arc<Mutex<HashMap<String, usize>>>,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, url: impl Into<String>, response: ScriptedResponse) -> Self {
        self.script
            .lock()
            .expect("probe script poisoned")
            .insert(url.into(), response);
        self
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls
            .lock()
            .expect("probe calls poisoned")
            .get(url)
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl RemoteProbe for ScriptedProbe {
    async fn check(&self, url: &str, timeout: Duration) -> ProbeReport {
        let started = Instant::now();
        *self
            .calls
            .lock()
            .expect("probe calls poisoned")
            .entry(url.to_owned())
            .or_default() += 1;
        let response = self
            .script
            .lock()
            .expect("probe script poisoned")
            .get(url)
            .cloned()
            .unwrap_or_else(|| ScriptedResponse::network("connection refused"));

        if response.delay > timeout {
            tokio::time::sleep(timeout).await;
            return ProbeReport::unreachable(
                ProbeFailure::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                },
                started.elapsed(),
            );
        }
        tokio::time::sleep(response.delay).await;
        let elapsed = started.elapsed();
        match response.outcome {
            Outcome::Ok => ProbeReport::reachable(elapsed),
            Outcome::Status(status) => {
                ProbeReport::unreachable(ProbeFailure::Status { status }, elapsed)
            }
            Outcome::Network(reason) => {
                ProbeReport::unreachable(ProbeFailure::Network { reason }, elapsed)
            }
        }
    }
}

/// Loader that records every attempt and answers per remote id.
#[derive(Debug, Clone, Default)]
pub struct RecordingLoader {
    responses: Arc<Mutex<HashMap<String, Result<String, LoadError>>>>,
    calls: Arc<Mutex<HashMap<String, usize>>>,
    hold: Option<Arc<Notify>>,
}

impl RecordingLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(self, remote_id: impl Into<String>, markup: impl Into<String>) -> Self {
        self.responses
            .lock()
            .expect("loader script poisoned")
            .insert(remote_id.into(), Ok(markup.into()));
        self
    }

    pub fn fail(self, remote_id: impl Into<String>, error: LoadError) -> Self {
        self.responses
            .lock()
            .expect("loader script poisoned")
            .insert(remote_id.into(), Err(error));
        self
    }

    /// Keep every load pending until [`RecordingLoader::release`] is called.
    pub fn held(mut self) -> Self {
        self.hold = Some(Arc::new(Notify::new()));
        self
    }

    /// Let one held load settle.
    pub fn release(&self) {
        if let Some(hold) = &self.hold {
            hold.notify_one();
        }
    }

    pub fn calls(&self, remote_id: &str) -> usize {
        self.calls
            .lock()
            .expect("loader calls poisoned")
            .get(remote_id)
            .copied()
            .unwrap_or_default()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().expect("loader calls poisoned").values().sum()
    }
}

#[async_trait]
impl ModuleLoader for RecordingLoader {
    async fn load(&self, remote: &RemoteDescriptor) -> Result<RemoteModule, LoadError> {
        *self
            .calls
            .lock()
            .expect("loader calls poisoned")
            .entry(remote.id.clone())
            .or_default() += 1;
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        let response = self
            .responses
            .lock()
            .expect("loader script poisoned")
            .get(&remote.id)
            .cloned()
            .unwrap_or(Err(LoadError::Status { status: 404 }));
        response.map(|markup| RemoteModule {
            remote_id: remote.id.clone(),
            markup,
        })
    }
}
