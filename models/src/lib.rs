//! Wire-level data model for callmux.
//!
//! This crate contains the data that crosses the channel: envelopes, call
//! identifiers, call shapes and the call error carried back to callers. It
//! has no runtime behaviour beyond conversion to and from the wire format.
//!
//! ## Architecture
//!
//! - **models** (this crate): envelopes, wire messages, codec
//! - **mux-core**: registries, dispatcher, stub factory, channel adapters
//! - **bridge**: host binary wiring services to a WebSocket listener

pub mod call_id;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod method_path;
pub mod rpc_error;
pub mod wire;

pub use call_id::CallId;
pub use codec::Codec;
pub use envelope::{CallShape, Direction, Envelope, EnvelopeKind, Metadata};
pub use error::codec_error::CodecError;
pub use error::model_error::ModelError;
pub use method_path::MethodPath;
pub use rpc_error::{ErrorCode, RpcError};

pub use common::ErrorLocation;

#[cfg(test)]
mod tests;
