use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;
use tokio_tungstenite::tungstenite::Error as WsError;

/// Failures reported by a channel adapter. Any of them means the channel is
/// considered closed.
#[derive(Debug, ThisError)]
pub enum ChannelError {
    #[error("Channel Closed Error: {message} {location}")]
    Closed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },

    #[error("Read Error: {message} {location}")]
    Read {
        message: String,
        location: ErrorLocation,
    },
}

impl From<WsError> for ChannelError {
    #[track_caller]
    fn from(error: WsError) -> Self {
        match error {
            WsError::ConnectionClosed | WsError::AlreadyClosed => ChannelError::Closed {
                message: error.to_string(),
                location: ErrorLocation::from(Location::caller()),
            },
            other => ChannelError::Read {
                message: other.to_string(),
                location: ErrorLocation::from(Location::caller()),
            },
        }
    }
}
