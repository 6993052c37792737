use common::ErrorLocation;
use mux_core::{ConfigError, RegistrationError, TransportError};

use std::panic::Location;

use serde::Serialize;
use thiserror::Error;

/// Errors that stop the bridge from starting or running.
///
/// Serializable so a fatal startup error can be reported as one JSON line.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum BridgeError {
    /// Error from the bridge itself (logging, directories, signals)
    #[error("Bridge Error: {message} {location}")]
    Bridge {
        message: String,
        location: ErrorLocation,
    },

    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    /// A demo service failed to register
    #[error("Registration Error: {message} {location}")]
    Registration {
        message: String,
        location: ErrorLocation,
    },

    /// Listener could not be started
    #[error("Transport Error: {message} {location}")]
    Transport {
        message: String,
        location: ErrorLocation,
    },
}

impl From<ConfigError> for BridgeError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        BridgeError::Config {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<RegistrationError> for BridgeError {
    #[track_caller]
    fn from(error: RegistrationError) -> Self {
        BridgeError::Registration {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<TransportError> for BridgeError {
    #[track_caller]
    fn from(error: TransportError) -> Self {
        BridgeError::Transport {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
