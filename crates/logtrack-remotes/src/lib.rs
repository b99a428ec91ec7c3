//! ---
//! lt_section: "02-remote-availability"
//! lt_subsection: "module"
//! lt_type: "source"
//! lt_scope: "code"
//! lt_description: "Remote availability gating core."
//! lt_version: "v0.0.0-prealpha"
//! lt_owner: "tbd"
//! ---
//! Remote availability gating for the Log Track host shell.
//!
//! The flow is strictly ordered: every configured remote is probed once,
//! concurrently, and the results are frozen into an [`AvailabilityRegistry`]
//! before any route decision is made. Routes then derive a [`RouteGate`] from
//! the registry and only an allowed gate ever reaches the [`ModuleLoader`].

pub mod descriptor;
pub mod gate;
pub mod loader;
pub mod metrics;
pub mod mount;
pub mod probe;
pub mod registry;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use descriptor::{CatalogError, RemoteCatalog, RemoteDescriptor};
pub use gate::RouteGate;
pub use loader::{HttpModuleLoader, LoadError, ModuleLoader, RemoteModule};
pub use metrics::{new_registry, RemoteMetrics, SharedRegistry};
pub use mount::{LoadState, MountHandle, RouteView};
pub use probe::{HttpProbe, ProbeFailure, ProbeReport, RemoteProbe, DEFAULT_PROBE_TIMEOUT};
pub use registry::{
    build_registry, AvailabilityRegistry, RegistryBuilder, RegistryError, RegistrySlot,
};
