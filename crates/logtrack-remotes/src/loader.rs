//! ---
//! lt_section: "02-remote-availability"
//! lt_subsection: "module"
//! lt_type: "source"
//! lt_scope: "code"
//! lt_description: "Dynamic module loader seam and its HTTP implementation."
//! lt_version: "v0.0.0-prealpha"
//! lt_owner: "tbd"
//! ---
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::descriptor::RemoteDescriptor;

/// A remote's UI entry point, ready to be mounted by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteModule {
    pub remote_id: String,
    /// HTML fragment rendered by the remote.
    pub markup: String,
}

/// Failure of a dynamic load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadError {
    #[error("module load timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
    #[error("remote entry responded with status {status}")]
    Status { status: u16 },
    #[error("module transport failed: {reason}")]
    Transport { reason: String },
    #[error("module load aborted before settling")]
    Aborted,
}

/// Resolves a remote descriptor into its UI module.
#[async_trait]
pub trait ModuleLoader: Send + Sync + 'static {
    async fn load(&self, remote: &RemoteDescriptor) -> Result<RemoteModule, LoadError>;
}

/// Loads the remote's fragment from its `entry_url`.
#[derive(Debug, Clone)]
pub struct HttpModuleLoader {
    client: Client,
    timeout: Duration,
}

impl HttpModuleLoader {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("failed to build module loader http client")?;
        Ok(Self { client, timeout })
    }

    pub fn with_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    async fn fetch(&self, remote: &RemoteDescriptor) -> Result<RemoteModule, LoadError> {
        let response = self
            .client
            .get(&remote.entry_url)
            .header(reqwest::header::ACCEPT, "text/html")
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                status: status.as_u16(),
            });
        }
        let markup = response.text().await.map_err(transport)?;
        Ok(RemoteModule {
            remote_id: remote.id.clone(),
            markup,
        })
    }
}

fn transport(err: reqwest::Error) -> LoadError {
    LoadError::Transport {
        reason: err.to_string(),
    }
}

#[async_trait]
impl ModuleLoader for HttpModuleLoader {
    async fn load(&self, remote: &RemoteDescriptor) -> Result<RemoteModule, LoadError> {
        tokio::time::timeout(self.timeout, self.fetch(remote))
            .await
            .unwrap_or(Err(LoadError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }))
    }
}
