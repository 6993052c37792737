use crate::channel::WsChannel;
use crate::config::BridgeConfig;
use crate::endpoint::Endpoint;
use crate::error::transport::TransportError;
use crate::server::handle::RpcServerHandle;
use crate::service::ServiceTable;

use common::ErrorLocation;
use models::Codec;

use std::net::SocketAddr;
use std::panic::Location;

use log::{error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinSet;
use tokio_tungstenite::accept_async;

/// Bind `config.server` and serve `services` to every connection.
///
/// Each accepted connection is upgraded to a WebSocket and gets its own
/// [`Endpoint`] over a clone of `services`, with the codec sized by
/// `config.limits`. When `loopback_only` is set, peers that are not on a
/// loopback address are dropped before the handshake.
///
/// # Errors
///
/// Returns [`TransportError::Io`] if the address cannot be bound (port in
/// use, insufficient permissions).
pub async fn start_rpc_server(
    config: &BridgeConfig,
    services: ServiceTable,
) -> Result<RpcServerHandle, TransportError> {
    let address = config.server.bind_address();
    let listener = TcpListener::bind(&address).await?;
    let local_addr = listener.local_addr()?;

    info!("RPC server listening on {local_addr}");

    let codec = Codec::new(config.limits.max_frame_bytes);
    let loopback_only = config.server.loopback_only;
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let task = tokio::spawn(accept_loop(
        listener,
        services,
        codec,
        loopback_only,
        shutdown_rx,
    ));

    Ok(RpcServerHandle::new(local_addr, shutdown_tx, task))
}

async fn accept_loop(
    listener: TcpListener,
    services: ServiceTable,
    codec: Codec,
    loopback_only: bool,
    mut shutdown: oneshot::Receiver<()>,
) {
    let (stop_tx, stop_rx) = watch::channel(false);
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            Some(finished) = connections.join_next() => {
                if let Err(e) = finished {
                    warn!("Connection task ended abnormally: {e}");
                }
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    info!("Client connecting from {addr}");
                    connections.spawn(serve_connection(
                        stream,
                        addr,
                        services.clone(),
                        codec,
                        loopback_only,
                        stop_rx.clone(),
                    ));
                }
                Err(e) => warn!("Accept failed: {e}"),
            },
        }
    }

    drop(listener);
    info!("RPC server shutting down, closing {} connections", connections.len());
    let _ = stop_tx.send(true);
    while let Some(finished) = connections.join_next().await {
        if let Err(e) = finished {
            warn!("Connection task ended abnormally: {e}");
        }
    }
}

/// Own one connection from handshake to close. A stop signal drops a
/// connection still in its handshake and closes an established endpoint.
async fn serve_connection(
    stream: TcpStream,
    addr: SocketAddr,
    services: ServiceTable,
    codec: Codec,
    loopback_only: bool,
    mut stop: watch::Receiver<bool>,
) {
    let endpoint = tokio::select! {
        _ = stopped(&mut stop) => {
            info!("Dropping connection from {addr} during shutdown");
            return;
        }
        connected = handle_connection(stream, addr, services, codec, loopback_only) => {
            match connected {
                Ok(Some(endpoint)) => endpoint,
                Ok(None) => return,
                Err(e) => {
                    error!("Connection from {addr} failed: {e}");
                    return;
                }
            }
        }
    };

    tokio::select! {
        _ = stopped(&mut stop) => endpoint.close().await,
        _ = endpoint.closed() => {}
    }
    info!("Client {addr} disconnected");
}

async fn stopped(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stop| *stop).await;
}

/// Upgrade one connection and start its endpoint. `Ok(None)` means the peer
/// was rejected.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    services: ServiceTable,
    codec: Codec,
    loopback_only: bool,
) -> Result<Option<Endpoint>, TransportError> {
    if loopback_only && !addr.ip().is_loopback() {
        warn!("Rejected non-loopback connection from {addr}");
        return Ok(None);
    }

    let ws_stream = accept_async(stream)
        .await
        .map_err(|e| TransportError::Handshake {
            message: format!("WebSocket handshake with {addr} failed: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let endpoint = Endpoint::with_codec(WsChannel::new(ws_stream), services, codec);
    info!("Client {addr} connected");

    Ok(Some(endpoint))
}
