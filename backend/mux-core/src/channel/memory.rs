//! In-process channel pair.

use crate::channel::{ChannelAdapter, FrameSink, FrameSource};
use crate::error::channel::ChannelError;

use common::ErrorLocation;

use std::panic::Location;

use tokio::sync::mpsc;

/// One end of an in-memory channel created by [`memory_channel`].
pub struct MemoryChannel {
    sink: MemorySink,
    source: MemorySource,
}

pub struct MemorySink {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

pub struct MemorySource {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

/// Two connected ends. Dropping one end's sink closes the other end's source.
pub fn memory_channel() -> (MemoryChannel, MemoryChannel) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();

    let a = MemoryChannel {
        sink: MemorySink { tx: a_tx },
        source: MemorySource { rx: a_rx },
    };
    let b = MemoryChannel {
        sink: MemorySink { tx: b_tx },
        source: MemorySource { rx: b_rx },
    };

    (a, b)
}

impl ChannelAdapter for MemoryChannel {
    type Sink = MemorySink;
    type Source = MemorySource;

    fn split(self) -> (MemorySink, MemorySource) {
        (self.sink, self.source)
    }
}

impl FrameSink for MemorySink {
    async fn send_frame(&mut self, frame: Vec<u8>) -> Result<(), ChannelError> {
        self.tx.send(frame).map_err(|_| ChannelError::Closed {
            message: String::from("peer dropped the memory channel"),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

impl FrameSource for MemorySource {
    async fn next_frame(&mut self) -> Option<Result<Vec<u8>, ChannelError>> {
        self.rx.recv().await.map(Ok)
    }
}
