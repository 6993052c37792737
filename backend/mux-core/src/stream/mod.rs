//! The two primitives every call shape is built from.
//!
//! - [`CallSink`]: push-based producer (`write`, `end`, `error`)
//! - [`CallStream`]: consumable async sequence with cancellation
//!
//! A server-stream handler gets a sink, a client-stream handler gets a
//! stream, a duplex handler gets one of each; callers get the mirror image.
//! [`ResponseFuture`] is the single-value continuation for unary and
//! client-stream calls.

pub(crate) mod call_stream;
pub(crate) mod response;
pub(crate) mod sink;

pub use call_stream::CallStream;
pub use response::ResponseFuture;
pub use sink::CallSink;
