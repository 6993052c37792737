use crate::helpers::{RawPeer, echo_table, wait_idle, within};

use mux_core::ServiceTable;

use models::{CallId, CallShape, Direction, Envelope, EnvelopeKind, ErrorCode, RpcError};

use serde_json::json;

/// **VALUE**: Verifies a malformed frame is dropped without disturbing other calls.
///
/// **WHY THIS MATTERS**: One corrupt message must not take down the calls
/// sharing its channel.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - A decode failure closes the channel
/// - A decode failure fails unrelated outstanding calls
#[tokio::test]
async fn given_outstanding_call_when_garbage_frame_arrives_then_dropped_and_call_completes() {
    // GIVEN: A client endpoint with one unary call outstanding to a raw peer
    let (mut peer, client) = RawPeer::with_endpoint(ServiceTable::new());
    let response = client.unary("Remote/run", json!({"x": 1}), None);
    let opened = peer.receive().await;
    assert_eq!(opened.kind, EnvelopeKind::UnaryRequest);
    assert_eq!(opened.method.as_deref(), Some("Remote/run"));

    // WHEN: The peer sends garbage, then a frame without a call id, then the real response
    peer.send_raw(vec![0xff, 0x00, 0x13, 0x37]).await;
    peer.send_raw(Vec::new()).await;
    peer.send(&Envelope::unary_response(opened.call_id.clone(), Ok(json!("done"))))
        .await;

    // THEN: The call completes normally and the endpoint stays open
    assert_eq!(within(response).await, Ok(json!("done")));
    assert!(!client.is_closed());
    wait_idle(&client).await;
}

/// **VALUE**: Verifies a repeated terminal for a finished call is ignored.
///
/// **WHY THIS MATTERS**: Exactly one terminal event reaches each caller; a
/// duplicate must neither be delivered nor break the endpoint.
#[tokio::test]
async fn given_answered_call_when_terminal_repeated_then_ignored() {
    // GIVEN: A unary call the peer has already answered
    let (mut peer, client) = RawPeer::with_endpoint(ServiceTable::new());
    let response = client.unary("Remote/run", json!(1), None);
    let opened = peer.receive().await;
    peer.send(&Envelope::unary_response(opened.call_id.clone(), Ok(json!("first"))))
        .await;
    assert_eq!(within(response).await, Ok(json!("first")));

    // WHEN: The peer answers again and also errors the call
    peer.send(&Envelope::unary_response(opened.call_id.clone(), Ok(json!("second"))))
        .await;
    peer.send(&Envelope::stream_error(
        opened.call_id.clone(),
        Direction::ToCaller,
        RpcError::handler("late"),
    ))
    .await;

    // THEN: Nothing changes and new calls still work
    wait_idle(&client).await;
    let next = client.unary("Remote/run", json!(2), None);
    let reopened = peer.receive().await;
    assert_ne!(reopened.call_id, opened.call_id);
    peer.send(&Envelope::unary_response(reopened.call_id, Ok(json!("again"))))
        .await;
    assert_eq!(within(next).await, Ok(json!("again")));
}

/// **VALUE**: Verifies the envelopes a server stream produces on the wire.
///
/// **BUG THIS CATCHES**: Would catch data after the terminal envelope, or a
/// missing terminal when the handler returns without ending its sink.
#[tokio::test]
async fn given_count_call_from_raw_peer_when_served_then_data_then_single_end() {
    // GIVEN: An endpoint serving Echo and a raw peer acting as caller
    let (mut peer, server) = RawPeer::with_endpoint(echo_table());
    let call_id = CallId::generate();

    // WHEN: The peer opens Echo/count for two items
    peer.send(&Envelope::stream_start(
        call_id.clone(),
        CallShape::ServerStream,
        "Echo/count",
        json!({"n": 2}),
        None,
    ))
    .await;

    // THEN: Two StreamData envelopes, one StreamEnd, then silence
    let first = peer.receive().await;
    let second = peer.receive().await;
    let end = peer.receive().await;
    for (envelope, expected) in [(&first, 1), (&second, 2)] {
        assert_eq!(envelope.call_id, call_id);
        assert_eq!(
            envelope.kind,
            EnvelopeKind::StreamData {
                direction: Direction::ToCaller
            }
        );
        assert_eq!(envelope.payload, json!(expected));
        assert!(envelope.method.is_none());
        assert!(envelope.metadata.is_none());
    }
    assert_eq!(
        end.kind,
        EnvelopeKind::StreamEnd {
            direction: Direction::ToCaller
        }
    );
    peer.assert_silent().await;
    wait_idle(&server).await;
}

/// **VALUE**: Verifies a peer reopening a live call id cannot hijack the call.
#[tokio::test]
async fn given_live_callee_call_when_same_id_reopened_then_duplicate_dropped() {
    // GIVEN: A client stream opened by the raw peer and still running
    let (mut peer, server) = RawPeer::with_endpoint(echo_table());
    let call_id = CallId::generate();
    let open = Envelope::stream_start(
        call_id.clone(),
        CallShape::ClientStream,
        "Echo/sum",
        json!(null),
        None,
    );
    peer.send(&open).await;

    // WHEN: The same opening envelope arrives again, followed by data and end
    peer.send(&open).await;
    peer.send(&Envelope::stream_data(call_id.clone(), Direction::ToCallee, json!(4)))
        .await;
    peer.send(&Envelope::stream_end(call_id.clone(), Direction::ToCallee))
        .await;

    // THEN: Exactly one response, for the original call
    let response = peer.receive().await;
    assert_eq!(response.kind, EnvelopeKind::UnaryResponse);
    assert_eq!(response.call_id, call_id);
    assert_eq!(response.payload, json!(4));
    peer.assert_silent().await;
    wait_idle(&server).await;
}

#[tokio::test]
async fn given_unknown_method_from_raw_peer_when_stream_started_then_stream_error_not_found() {
    let (mut peer, _server) = RawPeer::with_endpoint(echo_table());
    let call_id = CallId::generate();

    peer.send(&Envelope::stream_start(
        call_id.clone(),
        CallShape::Duplex,
        "Foo/bar",
        json!(null),
        None,
    ))
    .await;

    let reply = peer.receive().await;
    assert_eq!(
        reply.kind,
        EnvelopeKind::StreamError {
            direction: Direction::ToCaller
        }
    );
    assert_eq!(reply.error.map(|error| error.code), Some(ErrorCode::NotFound));
}

#[tokio::test]
async fn given_stream_start_with_unary_shape_when_received_then_protocol_error() {
    let (mut peer, _server) = RawPeer::with_endpoint(echo_table());
    let call_id = CallId::generate();

    peer.send(&Envelope::stream_start(
        call_id.clone(),
        CallShape::Unary,
        "Echo/run",
        json!(1),
        None,
    ))
    .await;

    let reply = peer.receive().await;
    assert_eq!(reply.call_id, call_id);
    assert_eq!(reply.error.map(|error| error.code), Some(ErrorCode::ProtocolError));
}

/// **VALUE**: Verifies data for unknown calls is dropped and the endpoint keeps serving.
#[tokio::test]
async fn given_data_for_unknown_call_when_received_then_ignored() {
    // GIVEN: An endpoint serving Echo
    let (mut peer, _server) = RawPeer::with_endpoint(echo_table());

    // WHEN: Data, end and error arrive for ids nobody opened
    for direction in [Direction::ToCallee, Direction::ToCaller] {
        peer.send(&Envelope::stream_data(CallId::generate(), direction, json!(1)))
            .await;
        peer.send(&Envelope::stream_end(CallId::generate(), direction))
            .await;
        peer.send(&Envelope::stream_error(
            CallId::generate(),
            direction,
            RpcError::handler("stray"),
        ))
        .await;
    }
    peer.assert_silent().await;

    // THEN: A real call is still served
    let call_id = CallId::generate();
    peer.send(&Envelope::unary_request(call_id.clone(), "Echo/run", json!("ok"), None))
        .await;
    let reply = peer.receive().await;
    assert_eq!(reply.call_id, call_id);
    assert_eq!(reply.into_result(), Ok(json!("ok")));
}
