//! Call-level error carried on the wire and surfaced to callers.

use std::fmt::{Display, Formatter, Result as FormatResult};

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

/// Numeric error classification shared by both endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum ErrorCode {
    /// Addressed service or method is not registered.
    NotFound = 1,
    /// Handler returned an error or panicked.
    HandlerError = 2,
    /// Undecodable message or a call shape that contradicts the registration.
    ProtocolError = 3,
    /// Channel terminated with the call outstanding.
    ChannelClosed = 4,
    /// Caller cancelled or abandoned the call.
    Cancelled = 5,
}

impl ErrorCode {
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn from_u32(code: u32) -> Option<Self> {
        match code {
            1 => Some(ErrorCode::NotFound),
            2 => Some(ErrorCode::HandlerError),
            3 => Some(ErrorCode::ProtocolError),
            4 => Some(ErrorCode::ChannelClosed),
            5 => Some(ErrorCode::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::HandlerError => "HANDLER_ERROR",
            ErrorCode::ProtocolError => "PROTOCOL_ERROR",
            ErrorCode::ChannelClosed => "CHANNEL_CLOSED",
            ErrorCode::Cancelled => "CANCELLED",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(self.as_str())
    }
}

/// Error terminating a single call.
///
/// Unlike the crate-internal error enums this type carries no source
/// location: it is data that crosses the channel.
#[derive(Debug, Clone, PartialEq, Eq, ThisError, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct RpcError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl RpcError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn handler(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::HandlerError, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ProtocolError, message)
    }

    pub fn channel_closed() -> Self {
        Self::new(ErrorCode::ChannelClosed, "channel closed")
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorCode::Cancelled, "call cancelled")
    }
}

/// Lets handlers `?` payload (de)serialisation failures.
impl From<serde_json::Error> for RpcError {
    fn from(error: serde_json::Error) -> Self {
        RpcError::handler(format!("payload conversion failed: {error}"))
    }
}
