//! Startup sequencing: probe every remote, then publish the registry.

use logtrack_remotes::{AvailabilityRegistry, RegistryBuilder, RegistrySlot, RemoteCatalog};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Build the registry and publish it into `slot`.
///
/// Resolves only after every probe has settled; the slot stays empty until
/// then, so no route decision can observe a partial picture.
pub async fn bootstrap(
    catalog: &RemoteCatalog,
    builder: &RegistryBuilder,
    slot: &RegistrySlot,
) -> AvailabilityRegistry {
    info!(remotes = catalog.len(), "checking remotes");
    let registry = builder.build(catalog).await;
    if let Err(err) = slot.publish(registry.clone()) {
        warn!(error = %err, "registry already published; keeping the first snapshot");
    }
    info!(
        online = registry.online_count(),
        offline = registry.offline_count(),
        elapsed_ms = registry.elapsed().as_millis() as u64,
        "host ready"
    );
    registry
}

/// Run [`bootstrap`] on its own task so the listener can serve the interim
/// page meanwhile.
pub fn spawn_bootstrap(
    catalog: RemoteCatalog,
    builder: RegistryBuilder,
    slot: RegistrySlot,
) -> JoinHandle<AvailabilityRegistry> {
    tokio::spawn(async move { bootstrap(&catalog, &builder, &slot).await })
}
