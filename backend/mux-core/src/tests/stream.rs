use crate::endpoint::command::{Command, Outbound, Side};
use crate::endpoint::state::SinkGuard;
use crate::error::sink::SinkError;
use crate::stream::{CallSink, CallStream, ResponseFuture};

use models::{CallId, ErrorCode, Metadata, RpcError};

use futures_util::StreamExt;
use serde_json::json;
use tokio::sync::mpsc;

fn drain_frames(rx: &mut mpsc::UnboundedReceiver<Command>) -> Vec<(Side, Outbound)> {
    let mut frames = Vec::new();
    while let Ok(command) = rx.try_recv() {
        if let Command::Outbound { side, frame, .. } = command {
            frames.push((side, frame));
        }
    }
    frames
}

/// **VALUE**: Verifies writes after `end()` are rejected, not silently dropped.
///
/// **WHY THIS MATTERS**: A handler that keeps writing after ending its stream
/// has a bug; swallowing the writes hides it.
///
/// **BUG THIS CATCHES**: Would catch a sink that queues data after its
/// terminal envelope.
#[test]
fn given_ended_sink_when_written_then_closed_error_and_nothing_queued() {
    // GIVEN: A callee sink that wrote one item and ended
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut sink = CallSink::new(CallId::generate(), Side::Callee, tx);
    sink.write(json!(1)).expect("write before end");
    sink.end().expect("end");

    // WHEN: Writing, ending and erroring again
    let write = sink.write(json!(2));
    let end = sink.end();
    let error = sink.error(RpcError::handler("late"));

    // THEN: All three are rejected and only data + end were queued
    assert!(matches!(write, Err(SinkError::Closed { .. })));
    assert!(matches!(end, Err(SinkError::Closed { .. })));
    assert!(matches!(error, Err(SinkError::Closed { .. })));
    assert!(sink.is_terminated());

    let frames = drain_frames(&mut rx);
    assert_eq!(frames.len(), 2);
    assert!(matches!(frames[0], (Side::Callee, Outbound::Data(ref value)) if *value == json!(1)));
    assert!(matches!(frames[1], (Side::Callee, Outbound::End)));
}

#[test]
fn given_dropped_caller_sink_when_not_terminated_then_end_queued() {
    // GIVEN: A caller sink that was never ended
    let (tx, mut rx) = mpsc::unbounded_channel();
    let sink = CallSink::new(CallId::generate(), Side::Caller, tx);

    // WHEN: Dropping it
    drop(sink);

    // THEN: An implicit end was queued
    let frames = drain_frames(&mut rx);
    assert_eq!(frames.len(), 1);
    assert!(matches!(frames[0], (Side::Caller, Outbound::End)));
}

/// **VALUE**: Verifies a sink whose call the endpoint finished rejects
/// further writes and does not half-close on drop.
///
/// **BUG THIS CATCHES**: Would catch a sink that only consults its own
/// `end()`/`error()` and keeps queuing data for a call that no longer exists.
#[test]
fn given_call_closed_by_endpoint_when_written_then_closed_error_and_nothing_queued() {
    // GIVEN: A caller sink whose registry entry has gone away
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut sink = CallSink::new(CallId::generate(), Side::Caller, tx);
    drop(SinkGuard::new(sink.call_closed()));

    // WHEN: Writing, then dropping the sink
    let write = sink.write(json!(1));
    let terminated = sink.is_terminated();
    drop(sink);

    // THEN: The write is rejected and no frame (not even an implicit end) is queued
    assert!(matches!(write, Err(SinkError::Closed { .. })));
    assert!(terminated);
    assert!(drain_frames(&mut rx).is_empty());
}

#[test]
fn given_dropped_callee_sink_when_not_terminated_then_nothing_queued() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    drop(CallSink::new(CallId::generate(), Side::Callee, tx));

    assert!(drain_frames(&mut rx).is_empty());
}

#[test]
fn given_endpoint_gone_when_written_then_endpoint_gone_error() {
    let (tx, rx) = mpsc::unbounded_channel();
    drop(rx);
    let mut sink = CallSink::new(CallId::generate(), Side::Callee, tx);

    assert!(matches!(
        sink.write(json!("x")),
        Err(SinkError::EndpointGone { .. })
    ));
}

/// **VALUE**: Verifies a stream yields nothing after its error.
///
/// **BUG THIS CATCHES**: Would catch consumers seeing items that raced in
/// after the terminal.
#[tokio::test]
async fn given_stream_with_error_when_consumed_then_items_error_then_none() {
    // GIVEN: A stream fed one item, an error, and a late item
    let (items, mut stream) = CallStream::inbound(CallId::generate(), Metadata::new());
    items.send(Ok(json!(1))).expect("send item");
    items.send(Err(RpcError::handler("boom"))).expect("send error");
    items.send(Ok(json!(2))).expect("send late item");

    // WHEN/THEN: One item, the error, then the end
    assert_eq!(stream.message().await, Some(Ok(json!(1))));
    let error = stream.message().await.expect("an item").expect_err("an error");
    assert_eq!(error.code, ErrorCode::HandlerError);
    assert_eq!(stream.next().await, None);
}

/// **VALUE**: Verifies dropping an unfinished caller stream cancels the call.
///
/// **WHY THIS MATTERS**: An abandoned server stream would otherwise keep the
/// callee producing data nobody reads.
#[test]
fn given_unfinished_caller_stream_when_dropped_then_cancel_queued() {
    // GIVEN: A caller-side response stream that has not finished
    let (commands, mut rx) = mpsc::unbounded_channel();
    let (_items, stream) = CallStream::responses(CallId::generate(), commands);

    // WHEN: Dropping it
    drop(stream);

    // THEN: A CANCELLED error was queued on the caller side
    let frames = drain_frames(&mut rx);
    assert_eq!(frames.len(), 1);
    assert!(matches!(
        frames[0],
        (Side::Caller, Outbound::Error(ref error)) if error.code == ErrorCode::Cancelled
    ));
}

#[tokio::test]
async fn given_finished_caller_stream_when_dropped_then_no_cancel() {
    let (commands, mut rx) = mpsc::unbounded_channel();
    let (items, mut stream) = CallStream::responses(CallId::generate(), commands);
    drop(items);

    assert_eq!(stream.next().await, None);
    drop(stream);

    assert!(drain_frames(&mut rx).is_empty());
}

#[tokio::test]
async fn given_reply_sender_dropped_when_awaited_then_channel_closed() {
    let (reply, response) = ResponseFuture::pending(CallId::generate());
    drop(reply);

    let error = response.await.expect_err("no reply");

    assert_eq!(error.code, ErrorCode::ChannelClosed);
}
