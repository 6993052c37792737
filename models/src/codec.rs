//! Envelope codec: typed [`Envelope`] to protobuf frame and back.
//!
//! Payloads are JSON documents carried as protobuf bytes. Decoding enforces
//! the envelope invariants, so anything that comes out of [`Codec::decode`]
//! can be routed without further shape checks.

use crate::error::codec_error::CodecError;
use crate::wire::{WireDirection, WireEnvelope, WireError, WireKind, WireShape};
use crate::{CallId, CallShape, Direction, Envelope, EnvelopeKind, ErrorCode, ErrorLocation, RpcError};

use std::panic::Location;

use prost::Message as ProstMessage;
use serde_json::Value;

/// Default upper bound for an inbound frame (16 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct Codec {
    max_frame_bytes: usize,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_BYTES)
    }
}

impl Codec {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self { max_frame_bytes }
    }

    pub fn max_frame_bytes(&self) -> usize {
        self.max_frame_bytes
    }

    /// Encode an envelope into a transmissible frame.
    ///
    /// `method` and `metadata` are written only for call-opening kinds.
    pub fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, CodecError> {
        let (kind, shape, direction) = match envelope.kind {
            EnvelopeKind::UnaryRequest => (WireKind::UnaryRequest, None, None),
            EnvelopeKind::UnaryResponse => (WireKind::UnaryResponse, None, None),
            EnvelopeKind::StreamStart { shape } => (WireKind::StreamStart, Some(shape), None),
            EnvelopeKind::StreamData { direction } => {
                (WireKind::StreamData, None, Some(direction))
            }
            EnvelopeKind::StreamEnd { direction } => (WireKind::StreamEnd, None, Some(direction)),
            EnvelopeKind::StreamError { direction } => {
                (WireKind::StreamError, None, Some(direction))
            }
        };

        let opens = envelope.kind.opens_call();

        let payload = if envelope.payload.is_null() {
            Vec::new()
        } else {
            serde_json::to_vec(&envelope.payload)?
        };

        let wire = WireEnvelope {
            call_id: envelope.call_id.as_str().to_string(),
            kind: kind as i32,
            shape: shape.map_or(WireShape::Unspecified, shape_to_wire) as i32,
            direction: direction.map_or(WireDirection::Unspecified, direction_to_wire) as i32,
            method: if opens { envelope.method.clone() } else { None },
            payload,
            error: envelope.error.as_ref().map(|error| WireError {
                code: error.code.as_u32(),
                message: error.message.clone(),
                detail: error.detail.clone(),
            }),
            metadata: if opens {
                envelope.metadata.clone().unwrap_or_default()
            } else {
                Default::default()
            },
        };

        Ok(wire.encode_to_vec())
    }

    /// Reconstruct a typed envelope from a received frame.
    #[track_caller]
    pub fn decode(&self, frame: &[u8]) -> Result<Envelope, CodecError> {
        if frame.len() > self.max_frame_bytes {
            return Err(CodecError::FrameTooLarge {
                size: frame.len(),
                limit: self.max_frame_bytes,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let wire = WireEnvelope::decode(frame)?;

        if wire.call_id.is_empty() {
            return Err(CodecError::MissingCallId {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let call_id = CallId::parse(wire.call_id).map_err(|e| CodecError::InvalidCallId {
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let kind = match WireKind::try_from(wire.kind) {
            Ok(WireKind::UnaryRequest) => EnvelopeKind::UnaryRequest,
            Ok(WireKind::UnaryResponse) => EnvelopeKind::UnaryResponse,
            Ok(WireKind::StreamStart) => EnvelopeKind::StreamStart {
                shape: shape_from_wire(wire.shape)?,
            },
            Ok(WireKind::StreamData) => EnvelopeKind::StreamData {
                direction: direction_from_wire(wire.direction)?,
            },
            Ok(WireKind::StreamEnd) => EnvelopeKind::StreamEnd {
                direction: direction_from_wire(wire.direction)?,
            },
            Ok(WireKind::StreamError) => EnvelopeKind::StreamError {
                direction: direction_from_wire(wire.direction)?,
            },
            Ok(WireKind::Unspecified) | Err(_) => {
                return Err(CodecError::UnknownKind {
                    value: wire.kind,
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        let (method, metadata) = if kind.opens_call() {
            let method = wire
                .method
                .filter(|m| !m.is_empty())
                .ok_or_else(|| CodecError::MissingMethod {
                    call_id: call_id.to_string(),
                    location: ErrorLocation::from(Location::caller()),
                })?;
            let metadata = Some(wire.metadata).filter(|m| !m.is_empty());
            (Some(method), metadata)
        } else {
            (None, None)
        };

        let error = match wire.error {
            Some(error) => Some(error_from_wire(error)?),
            None => None,
        };

        if matches!(kind, EnvelopeKind::StreamError { .. }) && error.is_none() {
            return Err(CodecError::MissingError {
                call_id: call_id.to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let payload = if wire.payload.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&wire.payload)?
        };

        Ok(Envelope {
            call_id,
            kind,
            method,
            payload,
            error,
            metadata,
        })
    }
}

fn shape_to_wire(shape: CallShape) -> WireShape {
    match shape {
        CallShape::Unary => WireShape::Unary,
        CallShape::ServerStream => WireShape::ServerStream,
        CallShape::ClientStream => WireShape::ClientStream,
        CallShape::Duplex => WireShape::Duplex,
    }
}

fn direction_to_wire(direction: Direction) -> WireDirection {
    match direction {
        Direction::ToCallee => WireDirection::ToCallee,
        Direction::ToCaller => WireDirection::ToCaller,
    }
}

#[track_caller]
fn shape_from_wire(value: i32) -> Result<CallShape, CodecError> {
    match WireShape::try_from(value) {
        Ok(WireShape::Unary) => Ok(CallShape::Unary),
        Ok(WireShape::ServerStream) => Ok(CallShape::ServerStream),
        Ok(WireShape::ClientStream) => Ok(CallShape::ClientStream),
        Ok(WireShape::Duplex) => Ok(CallShape::Duplex),
        Ok(WireShape::Unspecified) | Err(_) => Err(CodecError::UnknownShape {
            value,
            location: ErrorLocation::from(Location::caller()),
        }),
    }
}

#[track_caller]
fn direction_from_wire(value: i32) -> Result<Direction, CodecError> {
    match WireDirection::try_from(value) {
        Ok(WireDirection::ToCallee) => Ok(Direction::ToCallee),
        Ok(WireDirection::ToCaller) => Ok(Direction::ToCaller),
        Ok(WireDirection::Unspecified) | Err(_) => Err(CodecError::UnknownDirection {
            value,
            location: ErrorLocation::from(Location::caller()),
        }),
    }
}

#[track_caller]
fn error_from_wire(error: WireError) -> Result<RpcError, CodecError> {
    let code = ErrorCode::from_u32(error.code).ok_or_else(|| CodecError::UnknownErrorCode {
        code: error.code,
        location: ErrorLocation::from(Location::caller()),
    })?;

    Ok(RpcError {
        code,
        message: error.message,
        detail: error.detail,
    })
}
