use crate::channel::WsChannel;
use crate::endpoint::Endpoint;
use crate::error::transport::TransportError;
use crate::service::ServiceTable;

use common::ErrorLocation;
use models::Codec;

use std::panic::Location;

use log::info;
use tokio_tungstenite::connect_async;
use url::Url;

/// Connect to an RPC server and return an endpoint that can call its
/// services while serving `services` back to it.
///
/// # Errors
///
/// - [`TransportError::InvalidUrl`] if `url` does not parse or is not `ws://`/`wss://`
/// - [`TransportError::Connect`] if the connection or handshake fails
pub async fn connect(url: &str, services: ServiceTable) -> Result<Endpoint, TransportError> {
    connect_with_codec(url, services, Codec::default()).await
}

pub async fn connect_with_codec(
    url: &str,
    services: ServiceTable,
    codec: Codec,
) -> Result<Endpoint, TransportError> {
    let parsed = Url::parse(url)?;

    if !matches!(parsed.scheme(), "ws" | "wss") {
        return Err(TransportError::InvalidUrl {
            message: format!("unsupported scheme '{}' in {url}", parsed.scheme()),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    let (ws_stream, _) = connect_async(parsed.as_str())
        .await
        .map_err(|e| TransportError::Connect {
            message: format!("failed to connect to {url}: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

    info!("Connected to {url}");
    Ok(Endpoint::with_codec(WsChannel::new(ws_stream), services, codec))
}
