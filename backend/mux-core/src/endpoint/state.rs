//! Registry entries for both roles.

use crate::stream::call_stream::ItemSender;
use crate::stream::response::ReplySender;
use crate::stream::sink::CallClosed;

use models::{CallShape, RpcError};

use serde_json::Value;
use tokio::task::AbortHandle;

/// Where responses for a caller-side call are delivered.
#[derive(Debug)]
pub(crate) enum Pending {
    /// Single response: unary and client-stream.
    Reply(ReplySender),
    /// Response sequence: server-stream and duplex.
    Stream(ItemSender),
    /// The response sequence already ended; only the request half is open.
    Drained,
}

impl Pending {
    pub(crate) fn resolve(self, result: Result<Value, RpcError>) {
        match self {
            Pending::Reply(reply) => {
                let _ = reply.send(result);
            }
            Pending::Stream(items) => {
                if let Err(error) = result {
                    let _ = items.send(Err(error));
                }
            }
            Pending::Drained => {}
        }
    }

    pub(crate) fn fail(self, error: RpcError) {
        self.resolve(Err(error));
    }
}

/// Marks the call's sink closed when the registry entry holding it is
/// dropped, whichever way the call ended.
#[derive(Debug)]
pub(crate) struct SinkGuard(CallClosed);

impl SinkGuard {
    pub(crate) fn new(call_closed: CallClosed) -> Self {
        Self(call_closed)
    }
}

impl Drop for SinkGuard {
    fn drop(&mut self) {
        self.0.mark();
    }
}

#[derive(Debug)]
pub(crate) struct CallerCall {
    pub pending: Pending,
    /// The request direction is still writable.
    pub outbound_open: bool,
    pub sink: Option<SinkGuard>,
}

impl CallerCall {
    pub(crate) fn new(shape: CallShape, pending: Pending, sink: Option<SinkGuard>) -> Self {
        Self {
            pending,
            outbound_open: shape.streams_requests(),
            sink,
        }
    }

    pub(crate) fn is_drained(&self) -> bool {
        matches!(self.pending, Pending::Drained)
    }

    /// Close the request sink, then hand back the continuation so the
    /// caller observes the terminal only after further writes are refused.
    pub(crate) fn into_pending(self) -> Pending {
        let CallerCall { pending, sink, .. } = self;
        drop(sink);
        pending
    }
}

#[derive(Debug)]
pub(crate) struct CalleeCall {
    pub shape: CallShape,
    /// Request items for client-stream and duplex handlers, until the
    /// caller half-closes.
    pub inbound: Option<ItemSender>,
    /// The response direction is still writable.
    pub outbound_open: bool,
    pub task: Option<AbortHandle>,
    pub sink: Option<SinkGuard>,
}

impl CalleeCall {
    pub(crate) fn new(shape: CallShape, inbound: Option<ItemSender>, sink: Option<SinkGuard>) -> Self {
        Self {
            shape,
            inbound,
            outbound_open: true,
            task: None,
            sink,
        }
    }

    /// Both directions are done.
    pub(crate) fn is_settled(&self) -> bool {
        self.inbound.is_none() && !self.outbound_open
    }

    /// Stop the handler and close its sink.
    pub(crate) fn abort(&mut self) {
        self.sink.take();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
