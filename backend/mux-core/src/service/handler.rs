use crate::stream::{CallSink, CallStream};

use models::{CallShape, Metadata, RpcError};

use std::fmt::{Debug, Formatter, Result as FormatResult};
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::Value;

/// Payload and metadata of a call-opening envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub payload: Value,
    pub metadata: Metadata,
}

pub type HandlerFuture<T> = BoxFuture<'static, Result<T, RpcError>>;

pub type UnaryFn = Arc<dyn Fn(Request) -> HandlerFuture<Value> + Send + Sync>;
pub type ServerStreamFn = Arc<dyn Fn(Request, CallSink) -> HandlerFuture<()> + Send + Sync>;
pub type ClientStreamFn = Arc<dyn Fn(CallStream) -> HandlerFuture<Value> + Send + Sync>;
pub type DuplexFn = Arc<dyn Fn(CallStream, CallSink) -> HandlerFuture<()> + Send + Sync>;

/// A method implementation, tagged by the call shape it serves.
///
/// - `Unary`: request in, value out.
/// - `ServerStream`: request in, items written to the sink. Returning `Ok`
///   without ending the sink ends it; returning `Err` terminates the call
///   with that error.
/// - `ClientStream`: consumes the request stream, value out.
/// - `Duplex`: request stream plus response sink, same completion rules as
///   `ServerStream`.
#[derive(Clone)]
pub enum Handler {
    Unary(UnaryFn),
    ServerStream(ServerStreamFn),
    ClientStream(ClientStreamFn),
    Duplex(DuplexFn),
}

impl Handler {
    pub fn unary<F, Fut>(handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RpcError>> + Send + 'static,
    {
        Handler::Unary(Arc::new(move |request| handler(request).boxed()))
    }

    pub fn server_stream<F, Fut>(handler: F) -> Self
    where
        F: Fn(Request, CallSink) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), RpcError>> + Send + 'static,
    {
        Handler::ServerStream(Arc::new(move |request, sink| handler(request, sink).boxed()))
    }

    pub fn client_stream<F, Fut>(handler: F) -> Self
    where
        F: Fn(CallStream) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RpcError>> + Send + 'static,
    {
        Handler::ClientStream(Arc::new(move |requests| handler(requests).boxed()))
    }

    pub fn duplex<F, Fut>(handler: F) -> Self
    where
        F: Fn(CallStream, CallSink) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), RpcError>> + Send + 'static,
    {
        Handler::Duplex(Arc::new(move |requests, sink| handler(requests, sink).boxed()))
    }

    pub fn shape(&self) -> CallShape {
        match self {
            Handler::Unary(_) => CallShape::Unary,
            Handler::ServerStream(_) => CallShape::ServerStream,
            Handler::ClientStream(_) => CallShape::ClientStream,
            Handler::Duplex(_) => CallShape::Duplex,
        }
    }
}

impl Debug for Handler {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        write!(formatter, "Handler::{}", self.shape())
    }
}
