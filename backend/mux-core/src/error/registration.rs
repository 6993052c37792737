use common::ErrorLocation;
use models::CallShape;

use thiserror::Error as ThisError;

/// Rejected service or method registrations. Raised at registration time so
/// that no call can ever reach an inconsistent method table.
#[derive(Debug, ThisError)]
pub enum RegistrationError {
    #[error("Invalid Name Error: {message} {location}")]
    InvalidName {
        message: String,
        location: ErrorLocation,
    },

    #[error("Duplicate Method Error: {service}/{method} is already declared {location}")]
    DuplicateMethod {
        service: String,
        method: String,
        location: ErrorLocation,
    },

    #[error(
        "Shape Mismatch Error: {service}/{method} is declared {declared} but its handler is {handler} {location}"
    )]
    ShapeMismatch {
        service: String,
        method: String,
        declared: CallShape,
        handler: CallShape,
        location: ErrorLocation,
    },

    #[error("Empty Service Error: service {service} declares no methods {location}")]
    EmptyService {
        service: String,
        location: ErrorLocation,
    },

    #[error("Duplicate Service Error: service {service} is already registered {location}")]
    DuplicateService {
        service: String,
        location: ErrorLocation,
    },

    #[error("Endpoint Closed Error: {message} {location}")]
    EndpointClosed {
        message: String,
        location: ErrorLocation,
    },
}
