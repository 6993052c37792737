use crate::wire::{WireEnvelope, WireError, WireKind};
use crate::{CallId, CallShape, Codec, CodecError, Direction, Envelope, ErrorCode, Metadata, RpcError};

use prost::Message as ProstMessage;
use serde_json::json;

fn round_trip(envelope: &Envelope) -> Envelope {
    let codec = Codec::default();
    let frame = codec.encode(envelope).expect("encode should succeed");
    codec.decode(&frame).expect("decode should succeed")
}

/// **VALUE**: Verifies the codec round trip preserves payload and metadata.
///
/// **WHY THIS MATTERS**: Handlers receive exactly what callers sent. Any lossy field
/// in the codec corrupts application data silently.
#[test]
fn given_opening_envelope_with_metadata_when_round_tripped_then_equal() {
    // GIVEN: A call-opening envelope with a nested payload and metadata
    let mut metadata = Metadata::new();
    metadata.insert(String::from("trace-id"), String::from("abc123"));
    metadata.insert(String::from("tenant"), String::from("blue"));
    let envelope = Envelope::stream_start(
        CallId::generate(),
        CallShape::ServerStream,
        "Echo/count",
        json!({"x": 1, "nested": [true, null, "s", 2.5]}),
        Some(metadata),
    );

    // WHEN: Encoding then decoding
    let decoded = round_trip(&envelope);

    // THEN: Every field survives
    assert_eq!(decoded, envelope);
}

/// **VALUE**: Verifies error code, message and detail survive the round trip.
#[test]
fn given_stream_error_with_detail_when_round_tripped_then_equal() {
    // GIVEN: A StreamError carrying detail
    let envelope = Envelope::stream_error(
        CallId::generate(),
        Direction::ToCaller,
        RpcError::handler("disk full").with_detail("/var/tmp"),
    );

    // WHEN/THEN: Round trip is lossless
    assert_eq!(round_trip(&envelope), envelope);
}

/// **VALUE**: Verifies `method` and `metadata` are stripped from non-opening envelopes.
///
/// **BUG THIS CATCHES**: Would catch if follow-up envelopes leaked routing fields,
/// which the receiver must ignore and which waste bandwidth on every data frame.
#[test]
fn given_data_envelope_with_method_when_encoded_then_method_omitted() {
    // GIVEN: A data envelope with stray method/metadata set
    let mut envelope = Envelope::stream_data(CallId::generate(), Direction::ToCallee, json!(7));
    envelope.method = Some(String::from("Echo/run"));
    envelope.metadata = Some(Metadata::from([(String::from("k"), String::from("v"))]));

    // WHEN: Encoding
    let frame = Codec::default().encode(&envelope).expect("encode");
    let wire = WireEnvelope::decode(&frame[..]).expect("protobuf decode");

    // THEN: Neither field is on the wire
    assert!(wire.method.is_none(), "method should be omitted");
    assert!(wire.metadata.is_empty(), "metadata should be omitted");
}

#[test]
fn given_null_payload_when_round_tripped_then_still_null() {
    let envelope = Envelope::stream_end(CallId::generate(), Direction::ToCallee);

    let decoded = round_trip(&envelope);

    assert!(decoded.payload.is_null());
    assert_eq!(decoded, envelope);
}

/// **VALUE**: Verifies frames without a call id are classified as protocol errors.
#[test]
fn given_frame_without_call_id_when_decoded_then_missing_call_id() {
    // GIVEN: A wire envelope with an empty call id
    let wire = WireEnvelope {
        kind: WireKind::UnaryResponse as i32,
        ..Default::default()
    };

    // WHEN: Decoding
    let error = Codec::default()
        .decode(&wire.encode_to_vec())
        .expect_err("should fail");

    // THEN: Missing call id, classified as PROTOCOL_ERROR
    assert!(matches!(error, CodecError::MissingCallId { .. }));
    assert_eq!(error.code(), ErrorCode::ProtocolError);
}

#[test]
fn given_unknown_kind_when_decoded_then_unknown_kind() {
    let wire = WireEnvelope {
        call_id: String::from("c1"),
        kind: 42,
        ..Default::default()
    };

    let error = Codec::default()
        .decode(&wire.encode_to_vec())
        .expect_err("should fail");

    assert!(matches!(error, CodecError::UnknownKind { value: 42, .. }));
}

/// **VALUE**: Verifies the structural checks that keep routing code simple.
///
/// **BUG THIS CATCHES**: Would catch if a StreamStart without a method or a
/// StreamError without an error reached the dispatcher and caused a hang.
#[test]
fn given_structurally_invalid_envelopes_when_decoded_then_rejected() {
    let codec = Codec::default();

    // StreamStart without a shape
    let no_shape = WireEnvelope {
        call_id: String::from("c1"),
        kind: WireKind::StreamStart as i32,
        method: Some(String::from("A/b")),
        ..Default::default()
    };
    assert!(matches!(
        codec.decode(&no_shape.encode_to_vec()),
        Err(CodecError::UnknownShape { .. })
    ));

    // UnaryRequest without a method
    let no_method = WireEnvelope {
        call_id: String::from("c1"),
        kind: WireKind::UnaryRequest as i32,
        ..Default::default()
    };
    assert!(matches!(
        codec.decode(&no_method.encode_to_vec()),
        Err(CodecError::MissingMethod { .. })
    ));

    // StreamError without a direction
    let no_direction = WireEnvelope {
        call_id: String::from("c1"),
        kind: WireKind::StreamError as i32,
        error: Some(WireError {
            code: 2,
            message: String::from("x"),
            detail: None,
        }),
        ..Default::default()
    };
    assert!(matches!(
        codec.decode(&no_direction.encode_to_vec()),
        Err(CodecError::UnknownDirection { .. })
    ));

    // Unknown error code
    let bad_code = WireEnvelope {
        call_id: String::from("c1"),
        kind: WireKind::UnaryResponse as i32,
        error: Some(WireError {
            code: 999,
            message: String::from("x"),
            detail: None,
        }),
        ..Default::default()
    };
    assert!(matches!(
        codec.decode(&bad_code.encode_to_vec()),
        Err(CodecError::UnknownErrorCode { code: 999, .. })
    ));
}

#[test]
fn given_garbage_bytes_when_decoded_then_protocol_error() {
    let error = Codec::default()
        .decode(&[0xff, 0xff, 0xff, 0xff, 0x0f])
        .expect_err("garbage should not decode");

    assert_eq!(error.code(), ErrorCode::ProtocolError);
}

/// **VALUE**: Verifies the inbound frame size limit.
#[test]
fn given_frame_over_limit_when_decoded_then_frame_too_large() {
    // GIVEN: A codec with a tiny limit and a frame above it
    let codec = Codec::new(16);
    let envelope = Envelope::unary_request(CallId::generate(), "Echo/run", json!("a long enough payload"), None);
    let frame = Codec::default().encode(&envelope).expect("encode");

    // WHEN/THEN: Decoding reports the size and limit
    match codec.decode(&frame) {
        Err(CodecError::FrameTooLarge { size, limit, .. }) => {
            assert_eq!(size, frame.len());
            assert_eq!(limit, 16);
        }
        other => panic!("expected FrameTooLarge, got {other:?}"),
    }
}
