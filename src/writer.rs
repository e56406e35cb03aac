//! Dedicated writer task for outbound gateway frames.
//!
//! The socket's write half is owned by one task that receives frames over
//! an mpsc channel. Identify, heartbeats and the close frame all go through
//! a [`WriterHandle`], so no two tasks ever write to the socket at once.
//!
//! # Architecture
//!
//! ```text
//! Read loop (Identify) ─┐
//! Heartbeat task       ─┼─► mpsc::Sender<OutboundFrame> ─► Writer Task ─► WebSocket
//! Gateway::close()     ─┘
//! ```

use futures_util::{Sink, SinkExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

use crate::error::{KanteleError, Result};
use crate::protocol::GatewayCommand;

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Maximum frames to feed before a flush.
const MAX_BATCH_SIZE: usize = 16;

/// A frame ready to be written to the socket.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    /// JSON text frame.
    Text(String),
    /// Close frame. The writer stops after sending it.
    Close(Option<CloseFrame<'static>>),
}

impl OutboundFrame {
    /// Encode a gateway command into a text frame.
    pub fn command(command: &GatewayCommand) -> Result<Self> {
        Ok(Self::Text(command.encode()?))
    }

    /// Normal-closure close frame.
    pub fn normal_close() -> Self {
        Self::Close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        }))
    }

    fn into_message(self) -> Message {
        match self {
            Self::Text(text) => Message::Text(text),
            Self::Close(frame) => Message::Close(frame),
        }
    }
}

/// Configuration for the writer task.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Channel capacity for the frame queue. Senders wait when it is full.
    pub channel_capacity: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Handle for sending frames to the writer task.
///
/// Cheaply cloneable.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<OutboundFrame>,
}

impl WriterHandle {
    /// Queue a frame. Waits if the queue is full.
    ///
    /// Fails with `ConnectionClosed` once the writer task has stopped.
    pub async fn send(&self, frame: OutboundFrame) -> Result<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| KanteleError::ConnectionClosed)
    }

    /// Encode and queue a gateway command.
    pub async fn send_command(&self, command: &GatewayCommand) -> Result<()> {
        self.send(OutboundFrame::command(command)?).await
    }
}

/// Spawn the writer task and return a handle for sending frames.
///
/// The task ends when `cancel` fires, after a close frame is written, when
/// every handle is dropped, or on the first write error (returned from the
/// join handle).
pub fn spawn_writer_task<S>(
    sink: S,
    config: WriterConfig,
    cancel: CancellationToken,
) -> (WriterHandle, JoinHandle<Result<()>>)
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    let task = tokio::spawn(writer_loop(rx, sink, cancel));

    (WriterHandle { tx }, task)
}

async fn writer_loop<S>(
    mut rx: mpsc::Receiver<OutboundFrame>,
    mut sink: S,
    cancel: CancellationToken,
) -> Result<()>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    loop {
        // Queued frames win over cancellation so a close frame sent right
        // before cancel still goes out.
        let first = tokio::select! {
            biased;
            frame = rx.recv() => match frame {
                Some(f) => f,
                None => return Ok(()),
            },
            _ = cancel.cancelled() => return Ok(()),
        };

        let mut batch = Vec::with_capacity(MAX_BATCH_SIZE);
        batch.push(first);
        while batch.len() < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(frame) => batch.push(frame),
                Err(_) => break,
            }
        }

        let mut closing = false;
        for frame in batch {
            closing = matches!(frame, OutboundFrame::Close(_));
            sink.feed(frame.into_message()).await?;
            if closing {
                break;
            }
        }
        sink.flush().await?;

        if closing {
            tracing::debug!("Close frame written, writer stopping");
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use tokio::io::{duplex, DuplexStream};
    use tokio_tungstenite::tungstenite::protocol::Role;
    use tokio_tungstenite::WebSocketStream;

    async fn ws_pair() -> (WebSocketStream<DuplexStream>, WebSocketStream<DuplexStream>) {
        let (client, server) = duplex(64 * 1024);
        let client = WebSocketStream::from_raw_socket(client, Role::Client, None).await;
        let server = WebSocketStream::from_raw_socket(server, Role::Server, None).await;
        (client, server)
    }

    #[test]
    fn test_writer_config_default() {
        let config = WriterConfig::default();
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_outbound_frame_command() {
        let frame = OutboundFrame::command(&GatewayCommand::Heartbeat(3)).unwrap();
        assert_eq!(frame, OutboundFrame::Text(r#"{"op":1,"d":3}"#.to_string()));
    }

    #[tokio::test]
    async fn test_writer_preserves_order() {
        let (client, mut server) = ws_pair().await;
        let (handle, _task) =
            spawn_writer_task(client, WriterConfig::default(), CancellationToken::new());

        for i in 0..20u64 {
            handle
                .send_command(&GatewayCommand::Heartbeat(i))
                .await
                .unwrap();
        }

        for i in 0..20u64 {
            let msg = server.next().await.unwrap().unwrap();
            assert_eq!(msg, Message::Text(format!(r#"{{"op":1,"d":{}}}"#, i)));
        }
    }

    #[tokio::test]
    async fn test_writer_stops_after_close_frame() {
        let (client, mut server) = ws_pair().await;
        let (handle, task) =
            spawn_writer_task(client, WriterConfig::default(), CancellationToken::new());

        handle.send(OutboundFrame::normal_close()).await.unwrap();

        let msg = server.next().await.unwrap().unwrap();
        assert!(msg.is_close());

        assert!(task.await.unwrap().is_ok());
        let result = handle.send(OutboundFrame::Text("{}".to_string())).await;
        assert!(matches!(result, Err(KanteleError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_writer_stops_on_cancel() {
        let (client, _server) = ws_pair().await;
        let cancel = CancellationToken::new();
        let (handle, task) = spawn_writer_task(client, WriterConfig::default(), cancel.clone());

        cancel.cancel();

        assert!(task.await.unwrap().is_ok());
        let result = handle.send(OutboundFrame::Text("{}".to_string())).await;
        assert!(matches!(result, Err(KanteleError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_writer_shutdown_on_channel_close() {
        let (client, _server) = ws_pair().await;
        let (handle, task) =
            spawn_writer_task(client, WriterConfig::default(), CancellationToken::new());

        drop(handle);

        assert!(task.await.unwrap().is_ok());
    }
}
