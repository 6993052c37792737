//! Errors raised while turning raw frames into envelopes and back.
//!
//! Every variant classifies as [`ErrorCode::ProtocolError`]: the receiving
//! endpoint logs the failure and drops the frame.

use crate::{ErrorCode, ErrorLocation, RpcError};

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum CodecError {
    #[error("Protobuf Decode Error: {message} {location}")]
    Protobuf {
        message: String,
        location: ErrorLocation,
    },

    #[error("Frame Too Large Error: {size} bytes exceeds limit of {limit} bytes {location}")]
    FrameTooLarge {
        size: usize,
        limit: usize,
        location: ErrorLocation,
    },

    #[error("Missing Call Id Error: envelope has no call id {location}")]
    MissingCallId { location: ErrorLocation },

    #[error("Invalid Call Id Error: {message} {location}")]
    InvalidCallId {
        message: String,
        location: ErrorLocation,
    },

    #[error("Unknown Kind Error: envelope kind {value} is not recognised {location}")]
    UnknownKind { value: i32, location: ErrorLocation },

    #[error("Unknown Shape Error: call shape {value} is not recognised {location}")]
    UnknownShape { value: i32, location: ErrorLocation },

    #[error("Unknown Direction Error: direction {value} is not recognised {location}")]
    UnknownDirection { value: i32, location: ErrorLocation },

    #[error("Missing Method Error: call {call_id} opens without a method {location}")]
    MissingMethod {
        call_id: String,
        location: ErrorLocation,
    },

    #[error("Missing Error Error: stream error for call {call_id} carries no error {location}")]
    MissingError {
        call_id: String,
        location: ErrorLocation,
    },

    #[error("Unknown Error Code Error: error code {code} is not recognised {location}")]
    UnknownErrorCode { code: u32, location: ErrorLocation },

    #[error("Payload Error: {message} {location}")]
    Payload {
        message: String,
        location: ErrorLocation,
    },
}

impl CodecError {
    /// Wire classification of a codec failure.
    pub fn code(&self) -> ErrorCode {
        ErrorCode::ProtocolError
    }
}

impl From<&CodecError> for RpcError {
    fn from(error: &CodecError) -> Self {
        RpcError::new(error.code(), error.to_string())
    }
}

impl From<prost::DecodeError> for CodecError {
    #[track_caller]
    fn from(error: prost::DecodeError) -> Self {
        CodecError::Protobuf {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for CodecError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        CodecError::Payload {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
