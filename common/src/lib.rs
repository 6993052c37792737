//! Shared building blocks for the callmux workspace.
//!
//! Every error enum in the workspace records where it was raised through
//! [`ErrorLocation`], so a failure deep inside the endpoint loop still points
//! at the line that produced it.

pub mod error;

pub use error::error_location::ErrorLocation;

#[cfg(test)]
mod tests;
