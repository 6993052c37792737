//! Multiplexed call transport over a single bidirectional channel.
//!
//! Any number of concurrent calls, in four shapes (unary, server-stream,
//! client-stream, duplex), share one message channel between two peers.
//! Every envelope carries a call id; each endpoint keeps a caller registry
//! for the calls it originated and a callee registry for the calls it
//! serves, and routes inbound envelopes by id and direction.
//!
//! ## Architecture
//!
//! - **models**: envelopes, call ids, error codes, the wire codec
//! - **mux-core** (this crate): registries, dispatcher, call API, channel adapters
//! - **bridge**: host binary serving demo services over WebSocket
//!
//! ## Example
//!
//! ```ignore
//! let (a, b) = memory_channel();
//! let services = ServiceTable::new().with_service(
//!     ServiceDescriptor::new("Echo")?.unary("run", |request| async move { Ok(request.payload) })?,
//! )?;
//! let _server = Endpoint::spawn(a, services);
//! let client = Endpoint::spawn(b, ServiceTable::new());
//! let reply = client.unary("Echo/run", json!({"x": 1}), None).await?;
//! ```

pub mod channel;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod registry;
pub mod server;
pub mod service;
pub mod stream;

pub use channel::{ChannelAdapter, FrameSink, FrameSource, MemoryChannel, WsChannel, memory_channel};
pub use config::BridgeConfig;
pub use endpoint::{
    ActiveCalls, CallPrimitive, ClientStreamCall, CloseSummary, DuplexCall, Endpoint,
};
pub use error::{
    ChannelError, ConfigError, CoreError, RegistrationError, RegistryError, SinkError,
    TransportError,
};
pub use registry::CallRegistry;
pub use server::{RpcServerHandle, connect, start_rpc_server};
pub use service::{Handler, Request, ServiceDescriptor, ServiceTable};
pub use stream::{CallSink, CallStream, ResponseFuture};

#[cfg(test)]
mod tests;
