use std::net::{SocketAddr, TcpListener as StdTcpListener};

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::routes::router;
use crate::state::HostState;

/// Handle to the running host server.
#[derive(Debug)]
pub struct HostServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl HostServer {
    /// Address actually bound, which differs from the request for port 0.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(result) => result,
            Err(err) => Err(err.into()),
        }
    }
}

/// Bind `addr` and start serving. The router answers immediately, showing the
/// interim page until the registry is published into the state's slot.
pub fn spawn_host(state: HostState, addr: SocketAddr) -> Result<HostServer> {
    let app = router(state);

    let listener = StdTcpListener::bind(addr)
        .with_context(|| format!("failed to bind host listener {addr}"))?;
    listener
        .set_nonblocking(true)
        .context("failed to configure host listener as non-blocking")?;
    let local_addr = listener
        .local_addr()
        .context("failed to read host listener address")?;
    let tcp_listener =
        TcpListener::from_std(listener).context("failed to create tokio listener")?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let task: JoinHandle<Result<()>> = tokio::spawn(async move {
        info!(address = %local_addr, "host listening for HTTP traffic");
        if let Err(err) = axum::serve(tcp_listener, app.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
        {
            error!(address = %local_addr, error = %err, "host server exited with error");
            return Err(err.into());
        }
        Ok(())
    });

    Ok(HostServer {
        addr: local_addr,
        shutdown: Some(shutdown_tx),
        task,
    })
}
