//! Caller role: one call constructor per shape.
//!
//! Each constructor generates a fresh [`CallId`] and queues the open to the
//! endpoint loop, which registers the caller-side state before the opening
//! envelope is sent. Writes on the returned sink are queued behind the open,
//! so they can never overtake it.

use crate::endpoint::Endpoint;
use crate::endpoint::command::{Command, OpenCall, Side};
use crate::endpoint::state::Pending;
use crate::stream::{CallSink, CallStream, ResponseFuture};

use models::{CallId, CallShape, Metadata, RpcError};

use log::debug;
use serde_json::Value;
use tokio::sync::mpsc::error::SendError;

/// Request sink plus the eventual single response.
#[derive(Debug)]
pub struct ClientStreamCall {
    pub sink: CallSink,
    pub response: ResponseFuture,
}

/// Independent request sink and response stream.
#[derive(Debug)]
pub struct DuplexCall {
    pub sink: CallSink,
    pub stream: CallStream,
}

/// Whatever [`Endpoint::open_call`] produced for the requested shape.
#[derive(Debug)]
pub enum CallPrimitive {
    Unary(ResponseFuture),
    ServerStream(CallStream),
    ClientStream(ClientStreamCall),
    Duplex(DuplexCall),
}

impl Endpoint {
    /// Single request, single response.
    pub fn unary(
        &self,
        method: impl Into<String>,
        payload: impl Into<Value>,
        metadata: Option<Metadata>,
    ) -> ResponseFuture {
        let call_id = CallId::generate();
        let (reply, response) = ResponseFuture::pending(call_id.clone());

        self.open(OpenCall {
            call_id,
            shape: CallShape::Unary,
            method: method.into(),
            payload: payload.into(),
            metadata,
            pending: Pending::Reply(reply),
            sink: None,
        });
        response
    }

    /// Single request, stream of responses.
    pub fn server_stream(
        &self,
        method: impl Into<String>,
        payload: impl Into<Value>,
        metadata: Option<Metadata>,
    ) -> CallStream {
        let call_id = CallId::generate();
        let (items, stream) = CallStream::responses(call_id.clone(), self.commands.clone());

        self.open(OpenCall {
            call_id,
            shape: CallShape::ServerStream,
            method: method.into(),
            payload: payload.into(),
            metadata,
            pending: Pending::Stream(items),
            sink: None,
        });
        stream
    }

    /// Stream of requests, single response once the sink is ended.
    pub fn client_stream(&self, method: impl Into<String>, metadata: Option<Metadata>) -> ClientStreamCall {
        self.start_client_stream(method.into(), Value::Null, metadata)
    }

    /// Independent request and response streams.
    pub fn duplex(&self, method: impl Into<String>, metadata: Option<Metadata>) -> DuplexCall {
        self.start_duplex(method.into(), Value::Null, metadata)
    }

    /// Open a call with an explicit shape.
    ///
    /// For client-stream and duplex calls a non-null `payload` is delivered
    /// to the handler as the first request item.
    pub fn open_call(
        &self,
        method: impl Into<String>,
        shape: CallShape,
        payload: impl Into<Value>,
        metadata: Option<Metadata>,
    ) -> CallPrimitive {
        let method = method.into();
        let payload = payload.into();

        match shape {
            CallShape::Unary => CallPrimitive::Unary(self.unary(method, payload, metadata)),
            CallShape::ServerStream => {
                CallPrimitive::ServerStream(self.server_stream(method, payload, metadata))
            }
            CallShape::ClientStream => {
                CallPrimitive::ClientStream(self.start_client_stream(method, payload, metadata))
            }
            CallShape::Duplex => CallPrimitive::Duplex(self.start_duplex(method, payload, metadata)),
        }
    }

    fn start_client_stream(
        &self,
        method: String,
        payload: Value,
        metadata: Option<Metadata>,
    ) -> ClientStreamCall {
        let call_id = CallId::generate();
        let (reply, response) = ResponseFuture::pending(call_id.clone());
        let sink = CallSink::new(call_id.clone(), Side::Caller, self.commands.clone());

        self.open(OpenCall {
            call_id,
            shape: CallShape::ClientStream,
            method,
            payload,
            metadata,
            pending: Pending::Reply(reply),
            sink: Some(sink.call_closed()),
        });

        ClientStreamCall { sink, response }
    }

    fn start_duplex(&self, method: String, payload: Value, metadata: Option<Metadata>) -> DuplexCall {
        let call_id = CallId::generate();
        let (items, stream) = CallStream::responses(call_id.clone(), self.commands.clone());
        let sink = CallSink::new(call_id.clone(), Side::Caller, self.commands.clone());

        self.open(OpenCall {
            call_id,
            shape: CallShape::Duplex,
            method,
            payload,
            metadata,
            pending: Pending::Stream(items),
            sink: Some(sink.call_closed()),
        });

        DuplexCall { sink, stream }
    }

    fn open(&self, open: OpenCall) {
        if let Err(SendError(Command::Open(open))) = self.commands.send(Command::Open(open)) {
            debug!("Endpoint closed before call {} could open", open.call_id);
            open.fail(RpcError::channel_closed());
        }
    }
}
