use crate::ErrorLocation;
use crate::error::model_error::ModelError;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest call id accepted from the wire.
pub const MAX_CALL_ID_LEN: usize = 128;

/// Caller-generated token correlating every envelope of one call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    /// Fresh random id (UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Validate an id received from a peer.
    #[track_caller]
    pub fn parse(value: impl Into<String>) -> Result<Self, ModelError> {
        let value = value.into();

        if value.is_empty() {
            return Err(ModelError::Validation {
                message: String::from("call id cannot be empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if value.len() > MAX_CALL_ID_LEN {
            return Err(ModelError::Validation {
                message: format!(
                    "call id is {} bytes (maximum {MAX_CALL_ID_LEN})",
                    value.len()
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for CallId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(&self.0)
    }
}
