//! ---
//! lt_section: "02-remote-availability"
//! lt_subsection: "module"
//! lt_type: "source"
//! lt_scope: "code"
//! lt_description: "Per-route load decision derived from the registry."
//! lt_version: "v0.0.0-prealpha"
//! lt_owner: "tbd"
//! ---
use serde::Serialize;

use crate::registry::AvailabilityRegistry;

/// Whether a route may attempt to load its remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteGate {
    Allowed,
    Denied,
}

impl RouteGate {
    /// Pure read of the registry. Remotes without a verdict are denied.
    pub fn evaluate(registry: &AvailabilityRegistry, remote_id: &str) -> Self {
        match registry.is_available(remote_id) {
            Some(true) => RouteGate::Allowed,
            Some(false) | None => RouteGate::Denied,
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, RouteGate::Allowed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteGate::Allowed => "allowed",
            RouteGate::Denied => "denied",
        }
    }
}

impl std::fmt::Display for RouteGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
