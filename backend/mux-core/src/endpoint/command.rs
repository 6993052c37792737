//! Messages into the endpoint loop.

use crate::endpoint::state::Pending;
use crate::error::registration::RegistrationError;
use crate::service::ServiceDescriptor;
use crate::stream::sink::CallClosed;

use models::{CallId, CallShape, Metadata, RpcError};

use serde_json::Value;
use tokio::sync::oneshot;

/// Which registry a sink-originated frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Caller,
    Callee,
}

/// What a [`CallSink`](crate::stream::CallSink) pushed.
#[derive(Debug)]
pub(crate) enum Outbound {
    Data(Value),
    End,
    Error(RpcError),
}

#[derive(Debug)]
pub(crate) struct OpenCall {
    pub call_id: CallId,
    pub shape: CallShape,
    pub method: String,
    pub payload: Value,
    pub metadata: Option<Metadata>,
    pub pending: Pending,
    /// Request sink of client-stream and duplex calls.
    pub sink: Option<CallClosed>,
}

impl OpenCall {
    /// The call will never open; close its sink and fail it.
    pub(crate) fn fail(self, error: RpcError) {
        if let Some(sink) = &self.sink {
            sink.mark();
        }
        self.pending.fail(error);
    }
}

/// Registry sizes of one endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveCalls {
    /// Calls this endpoint originated and that are still in progress.
    pub caller: usize,
    /// Calls this endpoint is serving.
    pub callee: usize,
}

impl ActiveCalls {
    pub fn is_idle(&self) -> bool {
        self.caller == 0 && self.callee == 0
    }
}

/// Reported by an endpoint once its loop has exited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloseSummary {
    /// Calls that were still in progress and got `CHANNEL_CLOSED`.
    pub terminated: ActiveCalls,
    /// Registry sizes after shutdown.
    pub remaining: ActiveCalls,
}

#[derive(Debug)]
pub(crate) enum Command {
    /// Register caller-side state, then send the opening envelope.
    Open(OpenCall),

    Outbound {
        call_id: CallId,
        side: Side,
        frame: Outbound,
    },

    /// A callee handler task returned (or panicked).
    HandlerFinished {
        call_id: CallId,
        outcome: Result<Value, RpcError>,
    },

    Register {
        descriptor: ServiceDescriptor,
        reply: oneshot::Sender<Result<(), RegistrationError>>,
    },

    Snapshot {
        reply: oneshot::Sender<ActiveCalls>,
    },

    Close,
}
