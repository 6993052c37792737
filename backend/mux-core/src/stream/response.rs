use models::{CallId, RpcError};

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde_json::Value;
use tokio::sync::oneshot;

/// Eventual single response of a unary or client-stream call.
///
/// Resolves exactly once. If the endpoint shuts down without answering, the
/// future resolves with `CHANNEL_CLOSED`.
#[derive(Debug)]
pub struct ResponseFuture {
    call_id: CallId,
    receiver: oneshot::Receiver<Result<Value, RpcError>>,
}

pub(crate) type ReplySender = oneshot::Sender<Result<Value, RpcError>>;

impl ResponseFuture {
    pub(crate) fn pending(call_id: CallId) -> (ReplySender, Self) {
        let (tx, receiver) = oneshot::channel();
        (tx, Self { call_id, receiver })
    }

    pub fn call_id(&self) -> &CallId {
        &self.call_id
    }
}

impl Future for ResponseFuture {
    type Output = Result<Value, RpcError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.unwrap_or_else(|_| Err(RpcError::channel_closed())))
    }
}
