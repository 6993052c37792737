//! Test helpers for endpoint integration tests.
//!
//! - An `Echo` service covering all four call shapes
//! - Endpoint pairs over an in-memory channel
//! - A raw peer that speaks envelopes directly, for protocol-level checks

use mux_core::channel::{ChannelAdapter, FrameSink, FrameSource, MemorySink, MemorySource};
use mux_core::{Endpoint, ServiceDescriptor, ServiceTable, memory_channel};

use models::{Codec, Envelope, RpcError};

use std::future::Future;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::{Value, json};

/// Upper bound for any single await in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Test helper: Await `future`, failing the test if it takes too long.
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(TEST_TIMEOUT, future)
        .await
        .expect("Timed out waiting for future")
}

/// Test helper: `Echo` with one method per call shape.
///
/// - `Echo/run` (unary): returns its payload
/// - `Echo/count` (server-stream): writes `1..=n` for payload `{"n": n}`
/// - `Echo/sum` (client-stream): sums the numbers it receives
/// - `Echo/chat` (duplex): writes back every item it receives
/// - `Echo/meta` (unary): returns the call metadata as an object
pub fn echo_service() -> ServiceDescriptor {
    ServiceDescriptor::new("Echo")
        .and_then(|service| service.unary("run", |request| async move { Ok(request.payload) }))
        .and_then(|service| {
            service.server_stream("count", |request, mut sink| async move {
                let n = request.payload["n"].as_u64().unwrap_or(0);
                for i in 1..=n {
                    sink.write(json!(i))
                        .map_err(|e| RpcError::handler(e.to_string()))?;
                }
                Ok(())
            })
        })
        .and_then(|service| {
            service.client_stream("sum", |mut requests| async move {
                let mut total = 0_i64;
                while let Some(item) = requests.next().await {
                    total += item?.as_i64().unwrap_or(0);
                }
                Ok(json!(total))
            })
        })
        .and_then(|service| {
            service.duplex("chat", |mut requests, mut sink| async move {
                while let Some(item) = requests.next().await {
                    sink.write(item?)
                        .map_err(|e| RpcError::handler(e.to_string()))?;
                }
                Ok(())
            })
        })
        .and_then(|service| {
            service.unary("meta", |request| async move {
                Ok(serde_json::to_value(request.metadata)?)
            })
        })
        .expect("Echo service should be valid")
}

pub fn echo_table() -> ServiceTable {
    ServiceTable::new()
        .with_service(echo_service())
        .expect("Echo registration should succeed")
}

/// Test helper: `(server, client)` endpoints joined by a memory channel. The
/// server serves `services`; the client serves nothing.
pub fn endpoint_pair(services: ServiceTable) -> (Endpoint, Endpoint) {
    let (server_end, client_end) = memory_channel();
    let server = Endpoint::spawn(server_end, services);
    let client = Endpoint::spawn(client_end, ServiceTable::new());
    (server, client)
}

/// Test helper: Wait until both registries of `endpoint` are empty.
pub async fn wait_idle(endpoint: &Endpoint) {
    within(async {
        while !endpoint.active_calls().await.is_idle() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
}

/// One end of a memory channel driven by hand.
pub struct RawPeer {
    sink: MemorySink,
    source: MemorySource,
    codec: Codec,
}

impl RawPeer {
    /// Test helper: A raw peer connected to a fresh endpoint serving `services`.
    pub fn with_endpoint(services: ServiceTable) -> (RawPeer, Endpoint) {
        let (raw_end, endpoint_end) = memory_channel();
        let (sink, source) = raw_end.split();
        let endpoint = Endpoint::spawn(endpoint_end, services);
        let peer = RawPeer {
            sink,
            source,
            codec: Codec::default(),
        };
        (peer, endpoint)
    }

    pub async fn send(&mut self, envelope: &Envelope) {
        let frame = self.codec.encode(envelope).expect("Failed to encode envelope");
        self.send_raw(frame).await;
    }

    pub async fn send_raw(&mut self, frame: Vec<u8>) {
        self.sink
            .send_frame(frame)
            .await
            .expect("Failed to send frame");
    }

    pub async fn receive(&mut self) -> Envelope {
        let frame = within(self.source.next_frame())
            .await
            .expect("Channel closed")
            .expect("Error receiving frame");
        self.codec.decode(&frame).expect("Failed to decode envelope")
    }

    /// Test helper: Nothing arrives within a short grace period.
    pub async fn assert_silent(&mut self) {
        let next = tokio::time::timeout(Duration::from_millis(100), self.source.next_frame()).await;
        assert!(next.is_err(), "Expected no frame, got {next:?}");
    }
}

pub fn numbers(values: &[Value]) -> Vec<i64> {
    values.iter().filter_map(Value::as_i64).collect()
}
