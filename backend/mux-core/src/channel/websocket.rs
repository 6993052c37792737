//! WebSocket channel adapter.
//!
//! Each binary message carries exactly one encoded envelope. Text, ping and
//! pong messages are not part of the protocol and are skipped.

use crate::channel::{ChannelAdapter, FrameSink, FrameSource};
use crate::error::channel::ChannelError;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

pub struct WsChannel<S> {
    stream: WebSocketStream<S>,
}

impl<S> WsChannel<S> {
    pub fn new(stream: WebSocketStream<S>) -> Self {
        Self { stream }
    }
}

pub struct WsSink<S> {
    write: SplitSink<WebSocketStream<S>, Message>,
}

pub struct WsSource<S> {
    read: SplitStream<WebSocketStream<S>>,
}

impl<S> ChannelAdapter for WsChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    type Sink = WsSink<S>;
    type Source = WsSource<S>;

    fn split(self) -> (WsSink<S>, WsSource<S>) {
        let (write, read) = self.stream.split();
        (WsSink { write }, WsSource { read })
    }
}

impl<S> FrameSink for WsSink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send_frame(&mut self, frame: Vec<u8>) -> Result<(), ChannelError> {
        self.write.send(Message::Binary(frame.into())).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.write.close().await {
            debug!("WebSocket close failed: {e}");
        }
    }
}

impl<S> FrameSource for WsSource<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn next_frame(&mut self) -> Option<Result<Vec<u8>, ChannelError>> {
        loop {
            match self.read.next().await? {
                Ok(Message::Binary(data)) => return Some(Ok(data.to_vec())),
                Ok(Message::Close(frame)) => {
                    debug!("WebSocket peer sent close: {frame:?}");
                    return None;
                }
                Ok(Message::Text(_)) => {
                    warn!("Ignoring text message on envelope channel");
                }
                Ok(_) => {}
                Err(e) => return Some(Err(ChannelError::from(e))),
            }
        }
    }
}
