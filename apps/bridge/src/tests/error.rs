use crate::error::BridgeError;

use common::ErrorLocation;
use mux_core::ConfigError;

use std::panic::Location;

/// **VALUE**: Verifies bridge errors serialize to tagged JSON.
///
/// **WHY THIS MATTERS**: A fatal startup error is reported as one JSON line on
/// stderr; supervisors parse it to tell config problems from port clashes.
///
/// **BUG THIS CATCHES**: Would catch the `Serialize` derive or the serde tag
/// layout being dropped.
#[test]
fn given_bridge_error_when_serialized_then_tagged_json() {
    // GIVEN: A transport error
    let err = BridgeError::Transport {
        message: String::from("port in use"),
        location: ErrorLocation::from(Location::caller()),
    };

    // WHEN: Serializing to JSON
    let json = serde_json::to_value(&err).expect("Error should be serializable");

    // THEN: The variant is the tag and the message is in the data
    assert_eq!(json["type"], "Transport");
    assert_eq!(json["data"]["message"], "port in use");
}

#[test]
fn given_config_error_when_converted_then_config_variant_with_message() {
    let source = ConfigError::Validation {
        location: ErrorLocation::from(Location::caller()),
        reason: String::from("server.host cannot be empty"),
    };

    let err = BridgeError::from(source);

    match err {
        BridgeError::Config { message, .. } => {
            assert!(message.contains("server.host cannot be empty"))
        }
        other => panic!("expected Config variant, got {other:?}"),
    }
}
