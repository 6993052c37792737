//! The envelope: one unit of wire communication.

use crate::{CallId, RpcError};

use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FormatResult};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Call-opening key/value metadata.
pub type Metadata = HashMap<String, String>;

/// The four interaction patterns a call can follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallShape {
    Unary,
    ServerStream,
    ClientStream,
    Duplex,
}

impl CallShape {
    /// Caller sends a sequence of requests.
    pub fn streams_requests(self) -> bool {
        matches!(self, CallShape::ClientStream | CallShape::Duplex)
    }

    /// Callee sends a sequence of responses.
    pub fn streams_responses(self) -> bool {
        matches!(self, CallShape::ServerStream | CallShape::Duplex)
    }
}

impl Display for CallShape {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        let name = match self {
            CallShape::Unary => "unary",
            CallShape::ServerStream => "server-stream",
            CallShape::ClientStream => "client-stream",
            CallShape::Duplex => "duplex",
        };
        formatter.write_str(name)
    }
}

/// Which role an envelope travels towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    ToCallee,
    ToCaller,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvelopeKind {
    UnaryRequest,
    UnaryResponse,
    StreamStart { shape: CallShape },
    StreamData { direction: Direction },
    /// Half-close of one direction.
    StreamEnd { direction: Direction },
    /// Terminates the whole call.
    StreamError { direction: Direction },
}

impl EnvelopeKind {
    pub fn direction(self) -> Direction {
        match self {
            EnvelopeKind::UnaryRequest | EnvelopeKind::StreamStart { .. } => Direction::ToCallee,
            EnvelopeKind::UnaryResponse => Direction::ToCaller,
            EnvelopeKind::StreamData { direction }
            | EnvelopeKind::StreamEnd { direction }
            | EnvelopeKind::StreamError { direction } => direction,
        }
    }

    pub fn opens_call(self) -> bool {
        matches!(
            self,
            EnvelopeKind::UnaryRequest | EnvelopeKind::StreamStart { .. }
        )
    }
}

/// A typed envelope.
///
/// `method` and `metadata` are only set on call-opening envelopes; every
/// later envelope for the same call is routed by `call_id` alone.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub call_id: CallId,
    pub kind: EnvelopeKind,
    pub method: Option<String>,
    pub payload: Value,
    pub error: Option<RpcError>,
    pub metadata: Option<Metadata>,
}

impl Envelope {
    fn bare(call_id: CallId, kind: EnvelopeKind) -> Self {
        Self {
            call_id,
            kind,
            method: None,
            payload: Value::Null,
            error: None,
            metadata: None,
        }
    }

    pub fn unary_request(
        call_id: CallId,
        method: impl Into<String>,
        payload: Value,
        metadata: Option<Metadata>,
    ) -> Self {
        Self {
            method: Some(method.into()),
            payload,
            metadata: metadata.filter(|m| !m.is_empty()),
            ..Self::bare(call_id, EnvelopeKind::UnaryRequest)
        }
    }

    pub fn stream_start(
        call_id: CallId,
        shape: CallShape,
        method: impl Into<String>,
        payload: Value,
        metadata: Option<Metadata>,
    ) -> Self {
        Self {
            method: Some(method.into()),
            payload,
            metadata: metadata.filter(|m| !m.is_empty()),
            ..Self::bare(call_id, EnvelopeKind::StreamStart { shape })
        }
    }

    /// Opening envelope for `shape`: a UnaryRequest for unary calls,
    /// otherwise a StreamStart.
    pub fn open(
        call_id: CallId,
        shape: CallShape,
        method: impl Into<String>,
        payload: Value,
        metadata: Option<Metadata>,
    ) -> Self {
        match shape {
            CallShape::Unary => Self::unary_request(call_id, method, payload, metadata),
            shape => Self::stream_start(call_id, shape, method, payload, metadata),
        }
    }

    pub fn unary_response(call_id: CallId, result: Result<Value, RpcError>) -> Self {
        let envelope = Self::bare(call_id, EnvelopeKind::UnaryResponse);
        match result {
            Ok(payload) => Self {
                payload,
                ..envelope
            },
            Err(error) => Self {
                error: Some(error),
                ..envelope
            },
        }
    }

    pub fn stream_data(call_id: CallId, direction: Direction, payload: Value) -> Self {
        Self {
            payload,
            ..Self::bare(call_id, EnvelopeKind::StreamData { direction })
        }
    }

    pub fn stream_end(call_id: CallId, direction: Direction) -> Self {
        Self::bare(call_id, EnvelopeKind::StreamEnd { direction })
    }

    pub fn stream_error(call_id: CallId, direction: Direction, error: RpcError) -> Self {
        Self {
            error: Some(error),
            ..Self::bare(call_id, EnvelopeKind::StreamError { direction })
        }
    }

    pub fn direction(&self) -> Direction {
        self.kind.direction()
    }

    /// UnaryResponse or StreamError: nothing follows for this call.
    pub fn ends_call(&self) -> bool {
        matches!(
            self.kind,
            EnvelopeKind::UnaryResponse | EnvelopeKind::StreamError { .. }
        )
    }

    /// Response payload or error, for envelopes that carry a result.
    pub fn into_result(self) -> Result<Value, RpcError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.payload),
        }
    }
}
