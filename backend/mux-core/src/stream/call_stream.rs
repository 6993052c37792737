use crate::endpoint::command::{Command, Outbound, Side};

use models::{CallId, Metadata, RpcError};

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;

/// Read half of a call: the items the peer writes, in order.
///
/// Yields `Ok` items until the peer ends its direction (`None`) or the call
/// fails (one `Err`, then `None`). Nothing is yielded after a terminal.
///
/// On the caller side, dropping the stream before it finished, or calling
/// [`cancel`](CallStream::cancel), cancels the call.
#[derive(Debug)]
pub struct CallStream {
    call_id: CallId,
    metadata: Metadata,
    receiver: mpsc::UnboundedReceiver<Result<Value, RpcError>>,
    cancel: Option<mpsc::UnboundedSender<Command>>,
    finished: bool,
}

pub(crate) type ItemSender = mpsc::UnboundedSender<Result<Value, RpcError>>;

impl CallStream {
    /// Callee-side stream; carries the call-opening metadata.
    pub(crate) fn inbound(call_id: CallId, metadata: Metadata) -> (ItemSender, Self) {
        let (tx, receiver) = mpsc::unbounded_channel();
        let stream = Self {
            call_id,
            metadata,
            receiver,
            cancel: None,
            finished: false,
        };
        (tx, stream)
    }

    /// Caller-side stream; cancels the call when dropped early.
    pub(crate) fn responses(
        call_id: CallId,
        commands: mpsc::UnboundedSender<Command>,
    ) -> (ItemSender, Self) {
        let (tx, receiver) = mpsc::unbounded_channel();
        let stream = Self {
            call_id,
            metadata: Metadata::new(),
            receiver,
            cancel: Some(commands),
            finished: false,
        };
        (tx, stream)
    }

    pub fn call_id(&self) -> &CallId {
        &self.call_id
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Next item, or `None` once the stream has finished.
    pub async fn message(&mut self) -> Option<Result<Value, RpcError>> {
        self.next().await
    }

    /// Drain the stream, failing on the first error.
    pub async fn collect_all(mut self) -> Result<Vec<Value>, RpcError> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item?);
        }
        Ok(items)
    }

    /// Stop consuming and cancel the call. A no-op on the callee side.
    pub fn cancel(mut self) {
        self.send_cancel();
    }

    fn send_cancel(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        if let Some(commands) = self.cancel.take() {
            let _ = commands.send(Command::Outbound {
                call_id: self.call_id.clone(),
                side: Side::Caller,
                frame: Outbound::Error(RpcError::cancelled()),
            });
        }
    }
}

impl Stream for CallStream {
    type Item = Result<Value, RpcError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }

        match self.receiver.poll_recv(cx) {
            Poll::Ready(Some(Ok(item))) => Poll::Ready(Some(Ok(item))),
            Poll::Ready(Some(Err(error))) => {
                self.finished = true;
                Poll::Ready(Some(Err(error)))
            }
            Poll::Ready(None) => {
                self.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for CallStream {
    fn drop(&mut self) {
        self.send_cancel();
    }
}
