//! Channel adapter boundary.
//!
//! The transport asks very little of the underlying channel: an ordered,
//! reliable way to send a frame, the frames the peer sent in arrival order,
//! and a single notification that nothing more will arrive. A
//! [`ChannelAdapter`] splits into a [`FrameSink`] and a [`FrameSource`];
//! the source returning `None` is that close notification.

mod memory;
mod websocket;

pub use memory::{MemoryChannel, MemorySink, MemorySource, memory_channel};
pub use websocket::{WsChannel, WsSink, WsSource};

use crate::error::channel::ChannelError;

use std::future::Future;

/// Sending half of a channel.
pub trait FrameSink: Send + 'static {
    /// Deliver one frame to the peer. An error means the channel is closed.
    fn send_frame(&mut self, frame: Vec<u8>) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Close the channel from this side. Best effort; the default does
    /// nothing and relies on the sink being dropped.
    fn close(&mut self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

/// Receiving half of a channel.
pub trait FrameSource: Send + 'static {
    /// Next frame from the peer; `None` once the channel can deliver no more.
    fn next_frame(&mut self) -> impl Future<Output = Option<Result<Vec<u8>, ChannelError>>> + Send;
}

/// A bidirectional, message-oriented channel to exactly one peer.
pub trait ChannelAdapter: Send + 'static {
    type Sink: FrameSink;
    type Source: FrameSource;

    fn split(self) -> (Self::Sink, Self::Source);
}
