use crate::ErrorLocation;
use crate::error::model_error::ModelError;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location;

/// A `"service/method"` address split into its two halves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodPath {
    pub service: String,
    pub method: String,
}

impl MethodPath {
    /// Parse a qualified method name. Both halves must be non-empty and the
    /// method half must not contain a further `/`.
    #[track_caller]
    pub fn parse(qualified: &str) -> Result<Self, ModelError> {
        let Some((service, method)) = qualified.split_once('/') else {
            return Err(ModelError::Validation {
                message: format!("'{qualified}' is not of the form service/method"),
                location: ErrorLocation::from(Location::caller()),
            });
        };

        if service.is_empty() || method.is_empty() || method.contains('/') {
            return Err(ModelError::Validation {
                message: format!("'{qualified}' is not of the form service/method"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(Self {
            service: service.to_string(),
            method: method.to_string(),
        })
    }
}

impl Display for MethodPath {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        write!(formatter, "{}/{}", self.service, self.method)
    }
}
