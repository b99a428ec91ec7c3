//! View models and Askama templates for the host shell.
//!
//! Everything here is a pure function of the catalog and the frozen
//! availability registry, so rendering the same page twice yields the same
//! badges.

use askama::Template;
use logtrack_remotes::{AvailabilityRegistry, RemoteCatalog, RemoteDescriptor, RouteGate};

/// Availability of one remote as presented by navigation and status rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStatus {
    pub id: String,
    pub label: String,
    pub route: String,
    pub description: Option<String>,
    pub online: bool,
}

impl RemoteStatus {
    pub fn new(remote: &RemoteDescriptor, registry: &AvailabilityRegistry) -> Self {
        Self {
            id: remote.id.clone(),
            label: remote.label.clone(),
            route: remote.route.clone(),
            description: remote.description.clone(),
            online: RouteGate::evaluate(registry, &remote.id).is_allowed(),
        }
    }

    pub fn state_label(&self) -> &'static str {
        if self.online {
            "online"
        } else {
            "offline"
        }
    }
}

/// Header chrome shared by every page: nav entries and status rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellView {
    pub remotes: Vec<RemoteStatus>,
    /// Route of the page being rendered, used to highlight the nav entry.
    pub active: String,
}

impl ShellView {
    pub fn new(catalog: &RemoteCatalog, registry: &AvailabilityRegistry, active: &str) -> Self {
        Self {
            remotes: catalog
                .iter()
                .map(|remote| RemoteStatus::new(remote, registry))
                .collect(),
            active: active.to_owned(),
        }
    }

    pub fn remote(&self, id: &str) -> Option<&RemoteStatus> {
        self.remotes.iter().find(|remote| remote.id == id)
    }
}

/// Interim page served until every probe has settled.
#[derive(Template)]
#[template(path = "checking.html")]
pub struct CheckingTemplate {
    pub refresh_secs: u32,
}

#[derive(Template)]
#[template(path = "welcome.html")]
pub struct WelcomeTemplate {
    pub shell: ShellView,
}

/// Gated route page. Allowed routes render the loading indicator that mounts
/// the remote, denied routes render the offline notice in place.
#[derive(Template)]
#[template(path = "remote_route.html")]
pub struct RemoteRouteTemplate {
    pub shell: ShellView,
    pub remote: RemoteStatus,
}

#[derive(Template)]
#[template(path = "remote_offline.html")]
pub struct RemoteOfflineTemplate {
    pub remote: RemoteStatus,
}

#[derive(Template)]
#[template(path = "remote_failed.html")]
pub struct RemoteFailedTemplate {
    pub remote: RemoteStatus,
}

#[derive(Template)]
#[template(path = "remote_widget.html")]
pub struct RemoteWidgetTemplate {
    pub remote: RemoteStatus,
    pub markup: String,
}
