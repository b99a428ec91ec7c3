//! ---
//! lt_section: "01-core-functionality"
//! lt_subsection: "module"
//! lt_type: "source"
//! lt_scope: "code"
//! lt_description: "Shared primitives for the host shell."
//! lt_version: "v0.0.0-prealpha"
//! lt_owner: "tbd"
//! ---
//! Shared primitives for the Log Track host shell.
//! This crate exposes configuration loading and tracing setup consumed by the
//! availability core and the host service.

pub mod config;
pub mod logging;
pub mod route;

pub use config::{
    HostConfig, LoadedHostConfig, LoaderConfig, LoggingConfig, ProbeConfig, RemoteConfig,
    ServerConfig,
};
pub use logging::{init_tracing, LogFormat};
pub use route::{check_remote_route, RouteRuleError, RESERVED_SEGMENTS};
