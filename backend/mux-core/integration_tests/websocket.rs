use crate::helpers::{echo_table, numbers, within};

use mux_core::{BridgeConfig, ServiceTable, TransportError, connect, start_rpc_server};

use models::ErrorCode;

use std::time::Duration;

use serde_json::json;
use tokio::net::TcpStream;

fn ephemeral_config() -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.server.port = 0;
    config
}

/// **VALUE**: Verifies calls work end to end over a real WebSocket.
///
/// **WHY THIS MATTERS**: The memory channel hides framing problems; this is
/// the path the bridge binary actually serves.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Envelopes are not carried as binary messages
/// - The server does not spawn an endpoint per connection
/// - The bound port is not reported for port 0
#[tokio::test]
async fn given_rpc_server_when_client_connects_then_unary_and_stream_calls_succeed() {
    // GIVEN: A server on an ephemeral port serving Echo
    let handle = start_rpc_server(&ephemeral_config(), echo_table())
        .await
        .expect("Failed to start RPC server");
    assert_ne!(handle.local_addr().port(), 0);

    // WHEN: A client connects and makes calls
    let client = within(connect(&handle.url(), ServiceTable::new()))
        .await
        .expect("Failed to connect");
    let reply = within(client.unary("Echo/run", json!({"x": 1}), None)).await;
    let items = within(
        client
            .server_stream("Echo/count", json!({"n": 3}), None)
            .collect_all(),
    )
    .await;

    // THEN: Both succeed
    assert_eq!(reply, Ok(json!({"x": 1})));
    assert_eq!(numbers(&items.expect("stream should succeed")), vec![1, 2, 3]);

    handle.shutdown().await;
}

/// **VALUE**: Verifies server shutdown closes live connections and fails
/// their outstanding calls.
#[tokio::test]
async fn given_connected_client_when_server_shuts_down_then_client_endpoint_closes() {
    // GIVEN: A connected client with a client stream left open
    let handle = start_rpc_server(&ephemeral_config(), echo_table())
        .await
        .expect("Failed to start RPC server");
    let client = within(connect(&handle.url(), ServiceTable::new()))
        .await
        .expect("Failed to connect");
    assert_eq!(
        within(client.unary("Echo/run", json!(1), None)).await,
        Ok(json!(1))
    );
    let call = client.client_stream("Echo/sum", None);

    // WHEN: The server shuts down
    within(handle.shutdown()).await;

    // THEN: The client endpoint closes and the open call fails with CHANNEL_CLOSED
    within(client.closed()).await;
    let error = within(call.response).await.expect_err("call should fail");
    assert_eq!(error.code, ErrorCode::ChannelClosed);
}

/// **VALUE**: Verifies shutdown also drops connections that never finished
/// the WebSocket handshake.
///
/// **WHY THIS MATTERS**: A peer that opens a socket and goes quiet would
/// otherwise keep a connection, and later an endpoint, alive after the
/// server reported itself stopped.
///
/// **BUG THIS CATCHES**: Would catch connection tasks that are not tracked by
/// the listener and outlive `shutdown()`.
#[tokio::test]
async fn given_connection_stuck_in_handshake_when_server_shuts_down_then_socket_closed() {
    // GIVEN: A raw TCP connection that never sends the upgrade request
    let handle = start_rpc_server(&ephemeral_config(), echo_table())
        .await
        .expect("Failed to start RPC server");
    let raw = within(TcpStream::connect(handle.local_addr()))
        .await
        .expect("Failed to connect");
    tokio::time::sleep(Duration::from_millis(20)).await;

    // WHEN: The server shuts down
    within(handle.shutdown()).await;

    // THEN: The server side of the socket is closed
    within(peer_closed(&raw)).await;
}

/// Resolves once the peer has closed or reset `stream`.
async fn peer_closed(stream: &TcpStream) {
    let mut buf = [0u8; 64];
    loop {
        if stream.readable().await.is_err() {
            return;
        }
        match stream.try_read(&mut buf) {
            Ok(0) => return,
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(_) => return,
        }
    }
}

#[tokio::test]
async fn given_invalid_urls_when_connecting_then_invalid_url_error() {
    let not_a_url = connect("not a url", ServiceTable::new()).await;
    let wrong_scheme = connect("http://127.0.0.1:1", ServiceTable::new()).await;

    assert!(matches!(not_a_url, Err(TransportError::InvalidUrl { .. })));
    assert!(matches!(wrong_scheme, Err(TransportError::InvalidUrl { .. })));
}

#[tokio::test]
async fn given_no_server_when_connecting_then_connect_error() {
    // GIVEN: A port that was bound and released, so nothing listens on it
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);

    // WHEN: Connecting to it
    let result = connect(&format!("ws://127.0.0.1:{port}"), ServiceTable::new()).await;

    // THEN: The connection error is reported
    assert!(matches!(result, Err(TransportError::Connect { .. })));
}
