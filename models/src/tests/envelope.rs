use crate::{CallId, CallShape, Direction, Envelope, EnvelopeKind, Metadata, RpcError};

use serde_json::json;

/// **VALUE**: Verifies the routing direction derived from each envelope kind.
///
/// **WHY THIS MATTERS**: An endpoint is both caller and callee; direction decides
/// whether an envelope goes to the caller or the callee registry.
#[test]
fn given_each_kind_when_direction_queried_then_matches_role() {
    let id = CallId::generate();

    assert_eq!(
        Envelope::unary_request(id.clone(), "Echo/run", json!(1), None).direction(),
        Direction::ToCallee
    );
    assert_eq!(
        Envelope::stream_start(id.clone(), CallShape::Duplex, "Echo/chat", json!(null), None)
            .direction(),
        Direction::ToCallee
    );
    assert_eq!(
        Envelope::unary_response(id.clone(), Ok(json!(1))).direction(),
        Direction::ToCaller
    );
    assert_eq!(
        Envelope::stream_end(id, Direction::ToCaller).direction(),
        Direction::ToCaller
    );
}

#[test]
fn given_unary_shape_when_opening_then_builds_unary_request() {
    // GIVEN/WHEN: Opening envelopes for each shape
    let unary = Envelope::open(CallId::generate(), CallShape::Unary, "A/b", json!(1), None);
    let stream = Envelope::open(CallId::generate(), CallShape::ClientStream, "A/b", json!(null), None);

    // THEN: Unary uses UnaryRequest, every other shape uses StreamStart
    assert_eq!(unary.kind, EnvelopeKind::UnaryRequest);
    assert_eq!(
        stream.kind,
        EnvelopeKind::StreamStart {
            shape: CallShape::ClientStream
        }
    );
}

/// **VALUE**: Verifies empty metadata is normalised to `None`.
///
/// **BUG THIS CATCHES**: The wire cannot tell an empty map from an absent one; if
/// constructors kept `Some(empty)`, codec round trips would not be lossless.
#[test]
fn given_empty_metadata_when_opening_then_stored_as_none() {
    let envelope = Envelope::unary_request(
        CallId::generate(),
        "Echo/run",
        json!(null),
        Some(Metadata::new()),
    );

    assert!(envelope.metadata.is_none(), "Empty metadata should be dropped");
}

#[test]
fn given_error_result_when_building_response_then_error_is_carried() {
    // GIVEN: A failed result
    let error = RpcError::handler("boom");

    // WHEN: Building the response envelope
    let envelope = Envelope::unary_response(CallId::generate(), Err(error.clone()));

    // THEN: The envelope ends the call and yields the error back
    assert!(envelope.ends_call());
    assert_eq!(envelope.into_result(), Err(error));
}
