//! ---
//! lt_section: "01-core-functionality"
//! lt_subsection: "module"
//! lt_type: "source"
//! lt_scope: "code"
//! lt_description: "Shape rules for the host routes claimed by remotes."
//! lt_version: "v0.0.0-prealpha"
//! lt_owner: "tbd"
//! ---
//! A remote route becomes a literal axum route next to the host's own
//! endpoints, so it must be an absolute static path that shadows none of them.

use thiserror::Error;

/// Path segments owned by the host itself. Remote routes may not shadow them.
pub const RESERVED_SEGMENTS: &[&str] = &["api", "remotes", "healthz", "readyz", "metrics"];

/// Why a route cannot be claimed by a remote.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteRuleError {
    #[error("route must start with '/'")]
    NotAbsolute,
    #[error("the landing route '/' belongs to the host")]
    LandingRoute,
    #[error("route may not contain path parameters or wildcards")]
    PathParameter,
    #[error("route collides with reserved host route /{0}")]
    Reserved(String),
}

/// Check `route` against the rules every remote route must satisfy.
pub fn check_remote_route(route: &str) -> Result<(), RouteRuleError> {
    let path = route.strip_prefix('/').ok_or(RouteRuleError::NotAbsolute)?;
    if path.is_empty() {
        return Err(RouteRuleError::LandingRoute);
    }
    if path.contains(|c| matches!(c, ':' | '*' | '{' | '}')) {
        return Err(RouteRuleError::PathParameter);
    }
    let first = path.split('/').next().unwrap_or_default();
    if RESERVED_SEGMENTS.contains(&first) {
        return Err(RouteRuleError::Reserved(first.to_owned()));
    }
    Ok(())
}
