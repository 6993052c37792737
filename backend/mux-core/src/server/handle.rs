//! Handle to a running RPC server.

use std::net::SocketAddr;

use log::{info, warn};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Returned by [`start_rpc_server`](crate::server::start_rpc_server).
///
/// Dropping the handle stops the server as [`shutdown`](RpcServerHandle::shutdown)
/// does, without waiting for the connections to close.
#[derive(Debug)]
pub struct RpcServerHandle {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl RpcServerHandle {
    pub(crate) fn new(local_addr: SocketAddr, shutdown: oneshot::Sender<()>, task: JoinHandle<()>) -> Self {
        Self {
            local_addr,
            shutdown,
            task,
        }
    }

    /// Bound address; reports the real port when the config asked for port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// `ws://` URL a client can pass to [`connect`](crate::server::connect).
    pub fn url(&self) -> String {
        format!("ws://{}", self.local_addr)
    }

    /// Stop accepting, close every live connection and wait for the listener
    /// task to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            warn!("RPC server task ended abnormally: {e}");
        }
        info!("RPC server on {} stopped", self.local_addr);
    }
}
