use common::ErrorLocation;
use models::CallId;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum RegistryError {
    /// An entry for this id is still registered: an id collision or a peer
    /// reopening a live call.
    #[error("Duplicate Call Error: call {call_id} is already registered {location}")]
    DuplicateCall {
        call_id: CallId,
        location: ErrorLocation,
    },
}
