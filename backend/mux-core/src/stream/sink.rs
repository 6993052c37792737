use crate::endpoint::command::{Command, Outbound, Side};
use crate::error::sink::SinkError;

use common::ErrorLocation;
use models::{CallId, RpcError};

use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tokio::sync::mpsc;

/// Write half of a call.
///
/// Writes are queued to the endpoint loop in order, so everything written
/// before [`end`](CallSink::end) or [`error`](CallSink::error) reaches the
/// peer before the terminal envelope. Any call after the sink has
/// terminated, or after the endpoint has finished the call for another
/// reason (a response, a peer error, channel close), is rejected with
/// [`SinkError::Closed`].
///
/// A caller-side sink dropped without being terminated half-closes the
/// request direction, as if `end()` had been called.
#[derive(Debug)]
pub struct CallSink {
    call_id: CallId,
    side: Side,
    commands: mpsc::UnboundedSender<Command>,
    terminated: bool,
    call_closed: CallClosed,
}

/// Set by the endpoint once the registry entry of a sink's call is gone.
#[derive(Debug, Clone, Default)]
pub(crate) struct CallClosed(Arc<AtomicBool>);

impl CallClosed {
    pub(crate) fn mark(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub(crate) fn is_marked(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl CallSink {
    pub(crate) fn new(call_id: CallId, side: Side, commands: mpsc::UnboundedSender<Command>) -> Self {
        Self {
            call_id,
            side,
            commands,
            terminated: false,
            call_closed: CallClosed::default(),
        }
    }

    /// Flag the endpoint sets when it finishes this sink's call.
    pub(crate) fn call_closed(&self) -> CallClosed {
        self.call_closed.clone()
    }

    pub fn call_id(&self) -> &CallId {
        &self.call_id
    }

    /// No further writes are accepted.
    pub fn is_terminated(&self) -> bool {
        self.terminated || self.call_closed.is_marked()
    }

    /// Queue one data item.
    #[track_caller]
    pub fn write(&mut self, payload: impl Into<Value>) -> Result<(), SinkError> {
        self.push(Outbound::Data(payload.into()), false)
    }

    /// Close this direction of the call.
    #[track_caller]
    pub fn end(&mut self) -> Result<(), SinkError> {
        self.push(Outbound::End, true)
    }

    /// Terminate the whole call with `error`.
    #[track_caller]
    pub fn error(&mut self, error: RpcError) -> Result<(), SinkError> {
        self.push(Outbound::Error(error), true)
    }

    #[track_caller]
    fn push(&mut self, frame: Outbound, terminal: bool) -> Result<(), SinkError> {
        if self.is_terminated() {
            return Err(SinkError::Closed {
                call_id: self.call_id.clone(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if terminal {
            self.terminated = true;
        }

        self.commands
            .send(Command::Outbound {
                call_id: self.call_id.clone(),
                side: self.side,
                frame,
            })
            .map_err(|_| SinkError::EndpointGone {
                call_id: self.call_id.clone(),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}

impl Drop for CallSink {
    fn drop(&mut self) {
        if !self.is_terminated() && self.side == Side::Caller {
            let _ = self.commands.send(Command::Outbound {
                call_id: self.call_id.clone(),
                side: self.side,
                frame: Outbound::End,
            });
        }
    }
}
