//! ---
//! lt_section: "02-remote-availability"
//! lt_subsection: "module"
//! lt_type: "source"
//! lt_scope: "code"
//! lt_description: "Remote descriptors and the validated remote catalog."
//! lt_version: "v0.0.0-prealpha"
//! lt_owner: "tbd"
//! ---
use std::collections::HashSet;
use std::sync::Arc;

use logtrack_common::config::HostConfig;
use logtrack_common::route::{check_remote_route, RouteRuleError};
use serde::Serialize;

/// Static description of one remote micro-frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteDescriptor {
    /// Unique remote name, used as the registry key.
    pub id: String,
    /// Human readable name rendered in navigation.
    pub label: String,
    /// Host route that mounts this remote.
    pub route: String,
    /// Target of the availability probe.
    pub manifest_url: String,
    /// Target of the dynamic module load.
    pub entry_url: String,
    pub description: Option<String>,
}

impl RemoteDescriptor {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        route: impl Into<String>,
        manifest_url: impl Into<String>,
        entry_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            route: route.into(),
            manifest_url: manifest_url.into(),
            entry_url: entry_url.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Errors raised while assembling a [`RemoteCatalog`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("remote catalog must contain at least one remote")]
    Empty,
    #[error("remote id '{0}' is declared more than once")]
    DuplicateId(String),
    #[error("route {route} is claimed by both '{first}' and '{second}'")]
    DuplicateRoute {
        route: String,
        first: String,
        second: String,
    },
    /// The route could not be mounted next to the host's own endpoints.
    #[error("remote '{remote}' cannot claim route {route:?}: {reason}")]
    InvalidRoute {
        remote: String,
        route: String,
        #[source]
        reason: RouteRuleError,
    },
}

/// Ordered, immutable set of remotes known to the host.
///
/// Every route in a catalog is a static absolute path that the host router
/// can register as-is. Cloning is cheap; all clones share the same descriptors.
#[derive(Debug, Clone)]
pub struct RemoteCatalog {
    remotes: Arc<[RemoteDescriptor]>,
}

impl RemoteCatalog {
    pub fn new(remotes: Vec<RemoteDescriptor>) -> Result<Self, CatalogError> {
        if remotes.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut ids = HashSet::new();
        for remote in &remotes {
            if !ids.insert(remote.id.as_str()) {
                return Err(CatalogError::DuplicateId(remote.id.clone()));
            }
            check_remote_route(&remote.route).map_err(|reason| CatalogError::InvalidRoute {
                remote: remote.id.clone(),
                route: remote.route.clone(),
                reason,
            })?;
        }
        for (index, remote) in remotes.iter().enumerate() {
            if let Some(other) = remotes[..index].iter().find(|r| r.route == remote.route) {
                return Err(CatalogError::DuplicateRoute {
                    route: remote.route.clone(),
                    first: other.id.clone(),
                    second: remote.id.clone(),
                });
            }
        }
        Ok(Self {
            remotes: remotes.into(),
        })
    }

    /// Build the catalog from the `remotes` table, preserving declaration order.
    pub fn from_config(config: &HostConfig) -> Result<Self, CatalogError> {
        let remotes = config
            .remotes
            .iter()
            .map(|(id, remote)| RemoteDescriptor {
                id: id.clone(),
                label: remote.label.clone(),
                route: remote.route.clone(),
                manifest_url: remote.manifest_url.clone(),
                entry_url: remote.entry_url.clone(),
                description: remote.description.clone(),
            })
            .collect();
        Self::new(remotes)
    }

    pub fn get(&self, id: &str) -> Option<&RemoteDescriptor> {
        self.remotes.iter().find(|remote| remote.id == id)
    }

    pub fn by_route(&self, route: &str) -> Option<&RemoteDescriptor> {
        self.remotes.iter().find(|remote| remote.route == route)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteDescriptor> {
        self.remotes.iter()
    }

    pub fn len(&self) -> usize {
        self.remotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remotes.is_empty()
    }
}
