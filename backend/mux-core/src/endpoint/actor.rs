//! The endpoint loop.
//!
//! One task per endpoint owns both call registries, the service table and
//! the frame sink. Inbound frames and local commands (call opens, sink
//! writes, handler completions) are handled one at a time, so registry state
//! needs no locking and every call sees its envelopes in channel order.

use crate::channel::{ChannelAdapter, FrameSink, FrameSource};
use crate::endpoint::command::{ActiveCalls, CloseSummary, Command, OpenCall, Outbound, Side};
use crate::endpoint::state::{CalleeCall, CallerCall, Pending, SinkGuard};
use crate::error::channel::ChannelError;
use crate::error::registration::RegistrationError;
use crate::registry::CallRegistry;
use crate::service::{Handler, Request, ServiceTable};
use crate::stream::call_stream::ItemSender;
use crate::stream::{CallSink, CallStream};

use common::ErrorLocation;
use models::{CallId, CallShape, Codec, Direction, Envelope, EnvelopeKind, RpcError};

use std::any::Any;
use std::mem;
use std::panic::{AssertUnwindSafe, Location};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use log::{debug, error, info, warn};
use serde_json::Value;
use tokio::sync::{mpsc, watch};

type HandlerWork = BoxFuture<'static, Result<Value, RpcError>>;

/// A handler bound to one call, not yet running.
struct PreparedCall {
    inbound: Option<ItemSender>,
    sink: Option<SinkGuard>,
    work: HandlerWork,
}

enum Event {
    Command(Option<Command>),
    Frame(Option<Result<Vec<u8>, ChannelError>>),
}

struct EndpointActor<K> {
    sink: K,
    codec: Codec,
    services: ServiceTable,
    callers: CallRegistry<CallerCall>,
    callees: CallRegistry<CalleeCall>,
    /// Handed to callee sinks and handler tasks.
    commands: mpsc::UnboundedSender<Command>,
}

/// Drive one endpoint until its channel closes.
///
/// On exit every outstanding call on both registries has been terminated
/// with `CHANNEL_CLOSED`, `closed` holds the [`CloseSummary`], and commands
/// still queued have been answered.
pub(crate) async fn run<C: ChannelAdapter>(
    channel: C,
    services: ServiceTable,
    codec: Codec,
    commands: mpsc::UnboundedSender<Command>,
    mut command_rx: mpsc::UnboundedReceiver<Command>,
    closed: watch::Sender<Option<CloseSummary>>,
) {
    let (sink, mut source) = channel.split();
    let mut actor = EndpointActor {
        sink,
        codec,
        services,
        callers: CallRegistry::new(),
        callees: CallRegistry::new(),
        commands,
    };

    info!("Endpoint started");

    let reason = loop {
        let event = tokio::select! {
            command = command_rx.recv() => Event::Command(command),
            frame = source.next_frame() => Event::Frame(frame),
        };

        let outcome = match event {
            Event::Command(Some(Command::Close)) => break "closed locally",
            Event::Command(Some(command)) => actor.handle_command(command).await,
            Event::Command(None) => break "command queue closed",
            Event::Frame(Some(Ok(frame))) => actor.handle_frame(&frame).await,
            Event::Frame(Some(Err(e))) => {
                error!("Channel read failed: {e}");
                break "read failure";
            }
            Event::Frame(None) => break "peer closed the channel",
        };

        if let Err(e) = outcome {
            error!("Channel send failed: {e}");
            break "send failure";
        }
    };

    let terminated = actor.shutdown(reason).await;
    let summary = CloseSummary {
        terminated,
        remaining: actor.active_calls(),
    };
    drop(source);
    drop(actor);

    let _ = closed.send(Some(summary));

    command_rx.close();
    while let Ok(command) = command_rx.try_recv() {
        reject_after_close(command, summary.remaining);
    }
}

impl<K: FrameSink> EndpointActor<K> {
    async fn handle_command(&mut self, command: Command) -> Result<(), ChannelError> {
        match command {
            Command::Open(open) => self.open_call(open).await,
            Command::Outbound {
                call_id,
                side: Side::Caller,
                frame,
            } => self.caller_outbound(call_id, frame).await,
            Command::Outbound {
                call_id,
                side: Side::Callee,
                frame,
            } => self.callee_outbound(call_id, frame).await,
            Command::HandlerFinished { call_id, outcome } => {
                self.handler_finished(call_id, outcome).await
            }
            Command::Register { descriptor, reply } => {
                let _ = reply.send(self.services.register_service(descriptor));
                Ok(())
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.active_calls());
                Ok(())
            }
            // Handled by the loop before dispatch.
            Command::Close => Ok(()),
        }
    }

    async fn handle_frame(&mut self, frame: &[u8]) -> Result<(), ChannelError> {
        let envelope = match self.codec.decode(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Dropping malformed frame ({} bytes): {e}", frame.len());
                return Ok(());
            }
        };

        debug!("<- {:?} call {}", envelope.kind, envelope.call_id);

        let call_id = envelope.call_id.clone();
        match envelope.kind {
            EnvelopeKind::UnaryRequest | EnvelopeKind::StreamStart { .. } => {
                self.accept_call(envelope).await
            }
            EnvelopeKind::UnaryResponse => {
                self.caller_response(envelope);
                Ok(())
            }
            EnvelopeKind::StreamData {
                direction: Direction::ToCaller,
            } => self.caller_data(call_id, envelope.payload).await,
            EnvelopeKind::StreamData {
                direction: Direction::ToCallee,
            } => {
                self.callee_data(call_id, envelope.payload);
                Ok(())
            }
            EnvelopeKind::StreamEnd {
                direction: Direction::ToCaller,
            } => {
                self.caller_end(call_id);
                Ok(())
            }
            EnvelopeKind::StreamEnd {
                direction: Direction::ToCallee,
            } => {
                self.callee_end(call_id);
                Ok(())
            }
            EnvelopeKind::StreamError { direction } => {
                let error = envelope
                    .error
                    .unwrap_or_else(|| RpcError::protocol("stream error without an error"));
                match direction {
                    Direction::ToCaller => self.caller_error(call_id, error),
                    Direction::ToCallee => self.callee_error(call_id, error),
                }
                Ok(())
            }
        }
    }

    fn active_calls(&self) -> ActiveCalls {
        ActiveCalls {
            caller: self.callers.len(),
            callee: self.callees.len(),
        }
    }

    async fn transmit(&mut self, envelope: Envelope) -> Result<(), ChannelError> {
        let frame = match self.codec.encode(&envelope) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Dropping outbound envelope for call {}: {e}", envelope.call_id);
                return Ok(());
            }
        };

        debug!("-> {:?} call {}", envelope.kind, envelope.call_id);
        self.sink.send_frame(frame).await
    }

    // ============================================
    // CALLEE ROLE
    // ============================================

    async fn accept_call(&mut self, envelope: Envelope) -> Result<(), ChannelError> {
        let call_id = envelope.call_id.clone();
        let method = envelope.method.clone().unwrap_or_default();

        if self.callees.contains(&call_id) {
            warn!("Dropping repeated open for live call {call_id}");
            return Ok(());
        }

        let shape = match envelope.kind {
            EnvelopeKind::StreamStart {
                shape: CallShape::Unary,
            } => {
                let error = RpcError::protocol("a stream start cannot open a unary call");
                warn!("Rejecting call {call_id} to {method}: {error}");
                return self.reject(call_id, CallShape::Unary, error).await;
            }
            EnvelopeKind::StreamStart { shape } => shape,
            _ => CallShape::Unary,
        };

        let entry = match self.services.resolve(&method) {
            Ok(entry) => entry,
            Err(error) => {
                info!("Rejecting call {call_id}: {error}");
                return self.reject(call_id, shape, error).await;
            }
        };

        if entry.shape != shape {
            let error = RpcError::protocol(format!(
                "{method} is a {} method but was called as {shape}",
                entry.shape
            ));
            warn!("Rejecting call {call_id}: {error}");
            return self.reject(call_id, shape, error).await;
        }

        let request = Request {
            payload: envelope.payload,
            metadata: envelope.metadata.unwrap_or_default(),
        };
        let PreparedCall {
            inbound,
            sink,
            work,
        } = self.prepare(&call_id, entry.handler, request);

        if let Err(e) = self
            .callees
            .open(call_id.clone(), CalleeCall::new(shape, inbound, sink))
        {
            warn!("{e}");
            return Ok(());
        }

        let commands = self.commands.clone();
        let finished_id = call_id.clone();
        let task = tokio::spawn(async move {
            let outcome = match AssertUnwindSafe(work).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(panic) => Err(RpcError::handler("handler panicked")
                    .with_detail(panic_message(panic.as_ref()))),
            };
            let _ = commands.send(Command::HandlerFinished {
                call_id: finished_id,
                outcome,
            });
        });

        if let Some(call) = self.callees.lookup_mut(&call_id) {
            call.task = Some(task.abort_handle());
        }

        debug!("Dispatched {shape} call {call_id} to {method}");
        Ok(())
    }

    /// Build the handler future. The handler itself is only invoked once the
    /// future is polled on its own task.
    fn prepare(&self, call_id: &CallId, handler: Handler, request: Request) -> PreparedCall {
        match handler {
            Handler::Unary(handler) => PreparedCall {
                inbound: None,
                sink: None,
                work: async move { handler(request).await }.boxed(),
            },
            Handler::ServerStream(handler) => {
                let sink = self.callee_sink(call_id);
                let guard = SinkGuard::new(sink.call_closed());
                let work = async move { handler(request, sink).await.map(|()| Value::Null) };
                PreparedCall {
                    inbound: None,
                    sink: Some(guard),
                    work: work.boxed(),
                }
            }
            Handler::ClientStream(handler) => {
                let (items, stream) = inbound_stream(call_id, request);
                PreparedCall {
                    inbound: Some(items),
                    sink: None,
                    work: async move { handler(stream).await }.boxed(),
                }
            }
            Handler::Duplex(handler) => {
                let (items, stream) = inbound_stream(call_id, request);
                let sink = self.callee_sink(call_id);
                let guard = SinkGuard::new(sink.call_closed());
                let work = async move { handler(stream, sink).await.map(|()| Value::Null) };
                PreparedCall {
                    inbound: Some(items),
                    sink: Some(guard),
                    work: work.boxed(),
                }
            }
        }
    }

    fn callee_sink(&self, call_id: &CallId) -> CallSink {
        CallSink::new(call_id.clone(), Side::Callee, self.commands.clone())
    }

    /// Answer a call that will never reach a handler.
    async fn reject(
        &mut self,
        call_id: CallId,
        shape: CallShape,
        error: RpcError,
    ) -> Result<(), ChannelError> {
        self.transmit(callee_terminal(call_id, shape, error)).await
    }

    async fn callee_outbound(&mut self, call_id: CallId, frame: Outbound) -> Result<(), ChannelError> {
        let Some(call) = self.callees.lookup_mut(&call_id) else {
            debug!("Ignoring response frame for finished call {call_id}");
            return Ok(());
        };

        match frame {
            Outbound::Data(payload) => {
                if !call.outbound_open {
                    return Ok(());
                }
                self.transmit(Envelope::stream_data(call_id, Direction::ToCaller, payload))
                    .await
            }
            Outbound::End => {
                if !call.outbound_open {
                    return Ok(());
                }
                call.outbound_open = false;
                if call.is_settled() {
                    self.callees.close(&call_id);
                }
                self.transmit(Envelope::stream_end(call_id, Direction::ToCaller))
                    .await
            }
            Outbound::Error(error) => {
                let shape = call.shape;
                self.callees.close(&call_id);
                self.transmit(callee_terminal(call_id, shape, error)).await
            }
        }
    }

    async fn handler_finished(
        &mut self,
        call_id: CallId,
        outcome: Result<Value, RpcError>,
    ) -> Result<(), ChannelError> {
        let Some(call) = self.callees.close(&call_id) else {
            if let Err(error) = outcome {
                debug!("Handler for already terminated call {call_id} returned: {error}");
            }
            return Ok(());
        };

        if let Err(error) = &outcome {
            info!("Handler for call {call_id} failed: {error}");
        }

        if !call.shape.streams_responses() {
            return self
                .transmit(Envelope::unary_response(call_id, outcome))
                .await;
        }

        match outcome {
            Ok(_) if call.outbound_open => {
                self.transmit(Envelope::stream_end(call_id, Direction::ToCaller))
                    .await
            }
            Ok(_) => Ok(()),
            Err(error) => {
                self.transmit(Envelope::stream_error(call_id, Direction::ToCaller, error))
                    .await
            }
        }
    }

    fn callee_data(&mut self, call_id: CallId, payload: Value) {
        match self.callees.lookup(&call_id) {
            Some(CalleeCall {
                inbound: Some(items),
                ..
            }) => {
                // The handler may have stopped reading; that is its choice.
                let _ = items.send(Ok(payload));
            }
            Some(_) => warn!("Call {call_id} got request data after its request stream ended"),
            None => debug!("Dropping request data for unknown call {call_id}"),
        }
    }

    fn callee_end(&mut self, call_id: CallId) {
        let Some(call) = self.callees.lookup_mut(&call_id) else {
            debug!("Dropping request end for unknown call {call_id}");
            return;
        };

        if call.inbound.take().is_none() {
            debug!("Duplicate request end for call {call_id}");
        }
        if call.is_settled() {
            self.callees.close(&call_id);
        }
    }

    fn callee_error(&mut self, call_id: CallId, error: RpcError) {
        let Some(mut call) = self.callees.close(&call_id) else {
            debug!("Dropping error for unknown call {call_id}");
            return;
        };

        info!("Call {call_id} terminated by caller: {error}");
        if let Some(items) = call.inbound.take() {
            let _ = items.send(Err(error));
        }
        call.abort();
    }

    // ============================================
    // CALLER ROLE
    // ============================================

    async fn open_call(&mut self, open: OpenCall) -> Result<(), ChannelError> {
        if self.callers.contains(&open.call_id) {
            warn!("Refusing to reuse live call id {}", open.call_id);
            let error = RpcError::protocol(format!("call id {} is already in use", open.call_id));
            open.fail(error);
            return Ok(());
        }

        let OpenCall {
            call_id,
            shape,
            method,
            payload,
            metadata,
            pending,
            sink,
        } = open;
        let call = CallerCall::new(shape, pending, sink.map(SinkGuard::new));

        if let Err(e) = self.callers.open(call_id.clone(), call) {
            warn!("{e}");
            return Ok(());
        }

        debug!("Opening {shape} call {call_id} to {method}");
        self.transmit(Envelope::open(call_id, shape, method, payload, metadata))
            .await
    }

    async fn caller_outbound(&mut self, call_id: CallId, frame: Outbound) -> Result<(), ChannelError> {
        let Some(call) = self.callers.lookup_mut(&call_id) else {
            debug!("Ignoring request frame for finished call {call_id}");
            return Ok(());
        };

        match frame {
            Outbound::Data(payload) => {
                if !call.outbound_open {
                    return Ok(());
                }
                self.transmit(Envelope::stream_data(call_id, Direction::ToCallee, payload))
                    .await
            }
            Outbound::End => {
                if !call.outbound_open {
                    return Ok(());
                }
                call.outbound_open = false;
                if call.is_drained() {
                    self.callers.close(&call_id);
                }
                self.transmit(Envelope::stream_end(call_id, Direction::ToCallee))
                    .await
            }
            Outbound::Error(error) => {
                if let Some(call) = self.callers.close(&call_id) {
                    call.into_pending().fail(error.clone());
                }
                self.transmit(Envelope::stream_error(call_id, Direction::ToCallee, error))
                    .await
            }
        }
    }

    fn caller_response(&mut self, envelope: Envelope) {
        let call_id = envelope.call_id.clone();
        let Some(call) = self.callers.close(&call_id) else {
            debug!("Dropping response for unknown call {call_id}");
            return;
        };

        match call.into_pending() {
            Pending::Reply(reply) => {
                let _ = reply.send(envelope.into_result());
            }
            pending => {
                warn!("Call {call_id} expects a response stream but got a single response");
                let error = envelope.into_result().err().unwrap_or_else(|| {
                    RpcError::protocol("single response to a streaming call")
                });
                pending.fail(error);
            }
        }
    }

    async fn caller_data(&mut self, call_id: CallId, payload: Value) -> Result<(), ChannelError> {
        let Some(call) = self.callers.lookup(&call_id) else {
            debug!("Dropping response data for unknown call {call_id}");
            return Ok(());
        };

        match &call.pending {
            Pending::Stream(items) => {
                if items.send(Ok(payload)).is_err() {
                    debug!("Response stream for call {call_id} was dropped, cancelling");
                    self.callers.close(&call_id);
                    return self
                        .transmit(Envelope::stream_error(
                            call_id,
                            Direction::ToCallee,
                            RpcError::cancelled(),
                        ))
                        .await;
                }
            }
            Pending::Reply(_) => {
                warn!("Call {call_id} expects a single response, dropping stream data")
            }
            Pending::Drained => {
                warn!("Call {call_id} got response data after its response stream ended")
            }
        }

        Ok(())
    }

    fn caller_end(&mut self, call_id: CallId) {
        let Some(call) = self.callers.lookup_mut(&call_id) else {
            debug!("Dropping response end for unknown call {call_id}");
            return;
        };

        let outbound_open = call.outbound_open;
        match mem::replace(&mut call.pending, Pending::Drained) {
            Pending::Stream(_) => {
                if !outbound_open {
                    self.callers.close(&call_id);
                }
            }
            Pending::Reply(reply) => {
                warn!("Call {call_id} expects a single response but its stream ended");
                self.callers.close(&call_id);
                let _ = reply.send(Err(RpcError::protocol(
                    "stream end on a call expecting a single response",
                )));
            }
            Pending::Drained => debug!("Duplicate response end for call {call_id}"),
        }
    }

    fn caller_error(&mut self, call_id: CallId, error: RpcError) {
        match self.callers.close(&call_id) {
            Some(call) => call.into_pending().fail(error),
            None => debug!("Dropping error for unknown call {call_id}: {error}"),
        }
    }

    // ============================================
    // SHUTDOWN
    // ============================================

    /// Terminate every outstanding call and close the sink. Returns how many
    /// calls each role had in progress.
    async fn shutdown(&mut self, reason: &str) -> ActiveCalls {
        let callers = self.callers.drain();
        let callees = self.callees.drain();
        let terminated = ActiveCalls {
            caller: callers.len(),
            callee: callees.len(),
        };

        info!(
            "Endpoint closing ({reason}); terminating {} caller and {} callee calls",
            callers.len(),
            callees.len()
        );

        for (call_id, call) in callers {
            debug!("Call {call_id} terminated by channel close");
            call.into_pending().fail(RpcError::channel_closed());
        }

        for (call_id, mut call) in callees {
            debug!("Aborting handler for call {call_id}");
            if let Some(items) = call.inbound.take() {
                let _ = items.send(Err(RpcError::channel_closed()));
            }
            call.abort();
        }

        self.sink.close().await;
        terminated
    }
}

/// The envelope that terminates a callee-side call with `error`.
fn callee_terminal(call_id: CallId, shape: CallShape, error: RpcError) -> Envelope {
    if shape.streams_responses() {
        Envelope::stream_error(call_id, Direction::ToCaller, error)
    } else {
        Envelope::unary_response(call_id, Err(error))
    }
}

/// Request stream for client-stream and duplex handlers. A non-null opening
/// payload becomes the first item.
fn inbound_stream(call_id: &CallId, request: Request) -> (ItemSender, CallStream) {
    let (items, stream) = CallStream::inbound(call_id.clone(), request.metadata);
    if !request.payload.is_null() {
        let _ = items.send(Ok(request.payload));
    }
    (items, stream)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("non-string panic payload")
    }
}

fn reject_after_close(command: Command, remaining: ActiveCalls) {
    match command {
        Command::Open(open) => open.fail(RpcError::channel_closed()),
        Command::Register { reply, .. } => {
            let _ = reply.send(Err(RegistrationError::EndpointClosed {
                message: String::from("endpoint closed before the service was registered"),
                location: ErrorLocation::from(Location::caller()),
            }));
        }
        Command::Snapshot { reply } => {
            let _ = reply.send(remaining);
        }
        Command::Outbound { .. } | Command::HandlerFinished { .. } | Command::Close => {}
    }
}
