//! WebSocket hosting for endpoints.
//!
//! - [`start_rpc_server`]: listener that serves a [`ServiceTable`](crate::service::ServiceTable)
//!   to every accepted connection, one [`Endpoint`](crate::endpoint::Endpoint) each
//! - [`connect`]: client side, one endpoint over an outgoing connection
//!
//! Every binary WebSocket message carries one encoded envelope.

mod client;
mod handle;
mod listener;

pub use client::{connect, connect_with_codec};
pub use handle::RpcServerHandle;
pub use listener::start_rpc_server;
