use common::ErrorLocation;
use models::CallId;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum SinkError {
    /// `write`, `end` or `error` after the sink already ended or errored.
    #[error("Sink Closed Error: call {call_id} sink already terminated {location}")]
    Closed {
        call_id: CallId,
        location: ErrorLocation,
    },

    /// The endpoint loop is gone; nothing can be sent any more.
    #[error("Endpoint Gone Error: call {call_id} endpoint has shut down {location}")]
    EndpointGone {
        call_id: CallId,
        location: ErrorLocation,
    },
}
