use crate::helpers::{echo_table, endpoint_pair, numbers, wait_idle, within};

use mux_core::CallPrimitive;

use models::{CallShape, Metadata};

use futures_util::StreamExt;
use serde_json::json;

/// **VALUE**: Verifies the basic unary round trip.
///
/// **WHY THIS MATTERS**: Unary is the most common call shape; if it fails
/// nothing else built on the transport can work.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The request payload is lost or altered on the way to the handler
/// - The response is not correlated back to the waiting caller
/// - Either registry keeps the entry after the response
#[tokio::test]
async fn given_echo_run_when_called_with_object_then_same_object_returned() {
    // GIVEN: A server exposing Echo/run
    let (server, client) = endpoint_pair(echo_table());

    // WHEN: Calling it with {"x": 1}
    let reply = within(client.unary("Echo/run", json!({"x": 1}), None)).await;

    // THEN: The payload comes back unchanged and both sides are idle
    assert_eq!(reply, Ok(json!({"x": 1})));
    wait_idle(&client).await;
    wait_idle(&server).await;
}

/// **VALUE**: Verifies a server stream delivers every item in order and then ends.
///
/// **BUG THIS CATCHES**: Would catch items reordered, a missing terminal, or a
/// handler returning `Ok` without the implicit end being sent.
#[tokio::test]
async fn given_count_handler_when_streamed_then_one_two_three_then_end() {
    // GIVEN: A server exposing Echo/count
    let (server, client) = endpoint_pair(echo_table());

    // WHEN: Streaming three items
    let stream = client.server_stream("Echo/count", json!({"n": 3}), None);
    let items = within(stream.collect_all()).await.expect("stream should succeed");

    // THEN: 1, 2, 3 in order, then the stream ended cleanly
    assert_eq!(numbers(&items), vec![1, 2, 3]);
    wait_idle(&client).await;
    wait_idle(&server).await;
}

#[tokio::test]
async fn given_empty_count_when_streamed_then_ends_without_items() {
    let (_server, client) = endpoint_pair(echo_table());

    let mut stream = client.server_stream("Echo/count", json!({"n": 0}), None);

    assert_eq!(within(stream.message()).await, None);
}

/// **VALUE**: Verifies a client stream's single response arrives after the
/// caller ends the request stream.
///
/// **WHY THIS MATTERS**: The response must reflect every item the caller wrote;
/// responding early would drop data.
#[tokio::test]
async fn given_sum_handler_when_client_streams_numbers_then_total_returned() {
    // GIVEN: A client-stream call to Echo/sum
    let (server, client) = endpoint_pair(echo_table());
    let mut call = client.client_stream("Echo/sum", None);

    // WHEN: Writing 1..=4 and ending
    for i in 1..=4 {
        call.sink.write(json!(i)).expect("write should succeed");
    }
    call.sink.end().expect("end should succeed");

    // THEN: The total is the single response
    assert_eq!(within(call.response).await, Ok(json!(10)));
    wait_idle(&client).await;
    wait_idle(&server).await;
}

/// **VALUE**: Verifies both directions of a duplex call work independently.
///
/// **BUG THIS CATCHES**: Would catch the call being torn down when only the
/// request direction has ended.
#[tokio::test]
async fn given_chat_handler_when_duplex_items_written_then_echoed_and_closed() {
    // GIVEN: A duplex call to Echo/chat
    let (server, client) = endpoint_pair(echo_table());
    let mut call = client.duplex("Echo/chat", None);

    // WHEN: Writing two items and reading each echo before ending
    call.sink.write(json!("a")).expect("write a");
    assert_eq!(within(call.stream.message()).await, Some(Ok(json!("a"))));
    call.sink.write(json!("b")).expect("write b");
    assert_eq!(within(call.stream.message()).await, Some(Ok(json!("b"))));
    call.sink.end().expect("end");

    // THEN: The handler finishes once the request stream ends, closing the response stream
    assert_eq!(within(call.stream.message()).await, None);
    wait_idle(&client).await;
    wait_idle(&server).await;
}

#[tokio::test]
async fn given_caller_sink_dropped_when_duplex_open_then_request_stream_half_closed() {
    let (_server, client) = endpoint_pair(echo_table());
    let call = client.duplex("Echo/chat", None);

    drop(call.sink);

    let remaining = within(call.stream.collect_all()).await;
    assert_eq!(remaining, Ok(vec![]));
    wait_idle(&client).await;
}

/// **VALUE**: Verifies call metadata reaches the handler.
#[tokio::test]
async fn given_metadata_when_unary_called_then_handler_sees_it() {
    // GIVEN: Metadata with a trace id
    let (_server, client) = endpoint_pair(echo_table());
    let mut metadata = Metadata::new();
    metadata.insert(String::from("trace-id"), String::from("t-42"));

    // WHEN: Calling Echo/meta
    let reply = within(client.unary("Echo/meta", json!(null), Some(metadata))).await;

    // THEN: The handler echoes the metadata
    assert_eq!(reply, Ok(json!({"trace-id": "t-42"})));
}

/// **VALUE**: Verifies `open_call` produces the primitive matching the declared
/// shape and that an opening payload seeds a client stream.
#[tokio::test]
async fn given_explicit_shapes_when_open_call_then_matching_primitives() {
    // GIVEN: A server exposing every Echo method
    let (_server, client) = endpoint_pair(echo_table());

    // WHEN: Opening a server stream and a client stream by explicit shape
    let counted = client.open_call("Echo/count", CallShape::ServerStream, json!({"n": 2}), None);
    let summed = client.open_call("Echo/sum", CallShape::ClientStream, json!(5), None);

    // THEN: Each primitive behaves like its dedicated constructor
    let CallPrimitive::ServerStream(stream) = counted else {
        panic!("expected a server stream");
    };
    let items = within(stream.collect_all()).await.expect("stream should succeed");
    assert_eq!(numbers(&items), vec![1, 2]);

    let CallPrimitive::ClientStream(mut call) = summed else {
        panic!("expected a client stream");
    };
    call.sink.write(json!(7)).expect("write");
    call.sink.end().expect("end");
    assert_eq!(within(call.response).await, Ok(json!(12)));
}

/// **VALUE**: Verifies interleaved calls on one channel never cross-deliver.
///
/// **WHY THIS MATTERS**: Multiplexing is the whole point of the transport;
/// responses must reach exactly the call that asked for them.
///
/// **BUG THIS CATCHES**: Would catch routing by arrival order instead of call id.
#[tokio::test]
async fn given_many_concurrent_calls_when_interleaved_then_each_gets_its_own_results() {
    // GIVEN: Twenty unary calls and twenty server streams started together
    let (server, client) = endpoint_pair(echo_table());
    let unary_calls: Vec<_> = (0..20)
        .map(|i| client.unary("Echo/run", json!({"i": i}), None))
        .collect();
    let streams: Vec<_> = (1..=20)
        .map(|n| client.server_stream("Echo/count", json!({"n": n}), None))
        .collect();

    // WHEN: Awaiting all of them concurrently
    let (replies, streamed) = within(async {
        futures_util::join!(
            futures_util::future::join_all(unary_calls),
            futures_util::future::join_all(streams.into_iter().map(|s| s.collect_all())),
        )
    })
    .await;

    // THEN: Every call saw exactly its own data
    for (i, reply) in replies.into_iter().enumerate() {
        assert_eq!(reply, Ok(json!({"i": i})));
    }
    for (index, items) in streamed.into_iter().enumerate() {
        let n = index as i64 + 1;
        assert_eq!(numbers(&items.expect("stream should succeed")), (1..=n).collect::<Vec<_>>());
    }
    wait_idle(&client).await;
    wait_idle(&server).await;
}

/// **VALUE**: Verifies one channel carries calls in both directions at once.
#[tokio::test]
async fn given_both_endpoints_serving_when_each_calls_the_other_then_both_succeed() {
    // GIVEN: Two endpoints that both serve Echo
    let (a_end, b_end) = mux_core::memory_channel();
    let a = mux_core::Endpoint::spawn(a_end, echo_table());
    let b = mux_core::Endpoint::spawn(b_end, echo_table());

    // WHEN: Each calls the other
    let (from_a, from_b) = within(async {
        futures_util::join!(
            a.unary("Echo/run", json!("from a"), None),
            b.server_stream("Echo/count", json!({"n": 2}), None).collect::<Vec<_>>(),
        )
    })
    .await;

    // THEN: Both succeed over the same channel
    assert_eq!(from_a, Ok(json!("from a")));
    assert_eq!(from_b, vec![Ok(json!(1)), Ok(json!(2))]);
}
