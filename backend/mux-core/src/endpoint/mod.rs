//! A live endpoint: one channel, both roles.
//!
//! An [`Endpoint`] is a cheap, cloneable handle to the loop that owns the
//! channel. Through it a process can call methods on the peer (see the
//! call API in `caller.rs`) while serving the methods of its own
//! [`ServiceTable`] to the same peer.

mod actor;
mod caller;
pub(crate) mod command;
pub(crate) mod state;

pub use caller::{CallPrimitive, ClientStreamCall, DuplexCall};
pub use command::{ActiveCalls, CloseSummary};

use crate::channel::ChannelAdapter;
use crate::endpoint::command::Command;
use crate::error::registration::RegistrationError;
use crate::service::{ServiceDescriptor, ServiceTable};

use common::ErrorLocation;
use models::Codec;

use std::panic::Location;

use tokio::sync::{mpsc, oneshot, watch};

#[derive(Debug, Clone)]
pub struct Endpoint {
    commands: mpsc::UnboundedSender<Command>,
    closed: watch::Receiver<Option<CloseSummary>>,
}

impl Endpoint {
    /// Start serving `services` over `channel` with the default codec.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<C: ChannelAdapter>(channel: C, services: ServiceTable) -> Self {
        Self::with_codec(channel, services, Codec::default())
    }

    pub fn with_codec<C: ChannelAdapter>(channel: C, services: ServiceTable, codec: Codec) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed) = watch::channel(None);

        tokio::spawn(actor::run(
            channel,
            services,
            codec,
            commands.clone(),
            command_rx,
            closed_tx,
        ));

        Self { commands, closed }
    }

    /// Add a service to this endpoint's table while it is running.
    ///
    /// Only this endpoint sees the service; other endpoints built from the
    /// same [`ServiceTable`] keep their own copy.
    ///
    /// # Errors
    ///
    /// The validation errors of [`ServiceTable::register_service`], or
    /// [`RegistrationError::EndpointClosed`] once the channel has closed.
    pub async fn register_service(&self, descriptor: ServiceDescriptor) -> Result<(), RegistrationError> {
        let (reply, response) = oneshot::channel();

        self.commands
            .send(Command::Register { descriptor, reply })
            .map_err(|_| endpoint_closed())?;

        response.await.map_err(|_| endpoint_closed())?
    }

    /// Sizes of the caller and callee registries. Once the endpoint has
    /// closed, the sizes its loop reported on exit.
    pub async fn active_calls(&self) -> ActiveCalls {
        let (reply, response) = oneshot::channel();

        if self.commands.send(Command::Snapshot { reply }).is_err() {
            return self.remaining_calls().await;
        }

        match response.await {
            Ok(calls) => calls,
            Err(_) => self.remaining_calls().await,
        }
    }

    async fn remaining_calls(&self) -> ActiveCalls {
        self.closed().await;
        self.close_summary()
            .map(|summary| summary.remaining)
            .unwrap_or_default()
    }

    /// Close the channel locally and wait until every outstanding call has
    /// been terminated with `CHANNEL_CLOSED`.
    pub async fn close(&self) {
        let _ = self.commands.send(Command::Close);
        self.closed().await;
    }

    /// Resolves once the channel has closed, for whatever reason.
    pub async fn closed(&self) {
        let mut closed = self.closed.clone();
        let _ = closed.wait_for(Option::is_some).await;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.borrow().is_some()
    }

    /// What the endpoint terminated when it closed; `None` while it is open.
    pub fn close_summary(&self) -> Option<CloseSummary> {
        *self.closed.borrow()
    }
}

#[track_caller]
fn endpoint_closed() -> RegistrationError {
    RegistrationError::EndpointClosed {
        message: String::from("endpoint has shut down"),
        location: ErrorLocation::from(Location::caller()),
    }
}
