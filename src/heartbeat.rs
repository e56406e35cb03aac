//! Heartbeat scheduler.
//!
//! Started once per connection after Identify has been queued. Every
//! `interval` it sends `{"op":1,"d":<last sequence or 0>}`. The first beat
//! goes out one full interval after Hello.
//!
//! The task stops when the connection's cancellation token fires. A failed
//! send ends it with an error, which the read loop treats as fatal.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::protocol::GatewayCommand;
use crate::writer::WriterHandle;

/// Spawn the heartbeat task.
pub(crate) fn spawn_heartbeat(
    period: Duration,
    sequence: watch::Receiver<Option<u64>>,
    writer: WriterHandle,
    cancel: CancellationToken,
) -> JoinHandle<Result<()>> {
    tokio::spawn(run_heartbeat(period, sequence, writer, cancel))
}

async fn run_heartbeat(
    period: Duration,
    sequence: watch::Receiver<Option<u64>>,
    writer: WriterHandle,
    cancel: CancellationToken,
) -> Result<()> {
    tracing::info!("Starting heartbeat every {:?}", period);

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("Heartbeat stopped");
                return Ok(());
            }
            _ = ticker.tick() => {}
        }

        let seq = (*sequence.borrow()).unwrap_or(0);
        if let Err(e) = writer.send_command(&GatewayCommand::Heartbeat(seq)).await {
            tracing::error!("Heartbeat send failed: {}", e);
            return Err(e);
        }

        tracing::debug!("Heartbeat sent (seq {})", seq);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KanteleError;
    use crate::writer::{spawn_writer_task, WriterConfig};
    use futures_util::StreamExt;
    use tokio::io::{duplex, DuplexStream};
    use tokio_tungstenite::tungstenite::protocol::Role;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::WebSocketStream;

    async fn ws_pair() -> (WebSocketStream<DuplexStream>, WebSocketStream<DuplexStream>) {
        let (client, server) = duplex(64 * 1024);
        let client = WebSocketStream::from_raw_socket(client, Role::Client, None).await;
        let server = WebSocketStream::from_raw_socket(server, Role::Server, None).await;
        (client, server)
    }

    async fn next_heartbeat(server: &mut WebSocketStream<DuplexStream>) -> serde_json::Value {
        match server.next().await.unwrap().unwrap() {
            Message::Text(text) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected text frame, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_period() {
        let (client, mut server) = ws_pair().await;
        let cancel = CancellationToken::new();
        let (writer, _task) = spawn_writer_task(client, WriterConfig::default(), cancel.clone());
        let (_seq_tx, seq_rx) = watch::channel(None);

        let start = Instant::now();
        let _hb = spawn_heartbeat(Duration::from_millis(1000), seq_rx, writer, cancel.clone());

        for beat in 1..=3u64 {
            let frame = next_heartbeat(&mut server).await;
            assert_eq!(frame["op"], 1);
            let elapsed = start.elapsed();
            assert!(elapsed >= Duration::from_millis(1000 * beat));
            assert!(elapsed < Duration::from_millis(1000 * beat + 100));
        }

        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_carries_zero_without_sequence() {
        let (client, mut server) = ws_pair().await;
        let cancel = CancellationToken::new();
        let (writer, _task) = spawn_writer_task(client, WriterConfig::default(), cancel.clone());
        let (_seq_tx, seq_rx) = watch::channel(None);

        let _hb = spawn_heartbeat(Duration::from_millis(500), seq_rx, writer, cancel.clone());

        let frame = next_heartbeat(&mut server).await;
        assert_eq!(frame, serde_json::json!({ "op": 1, "d": 0 }));

        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_carries_latest_sequence() {
        let (client, mut server) = ws_pair().await;
        let cancel = CancellationToken::new();
        let (writer, _task) = spawn_writer_task(client, WriterConfig::default(), cancel.clone());
        let (seq_tx, seq_rx) = watch::channel(None);

        let _hb = spawn_heartbeat(Duration::from_millis(500), seq_rx, writer, cancel.clone());

        seq_tx.send_replace(Some(3));
        seq_tx.send_replace(Some(7));
        let frame = next_heartbeat(&mut server).await;
        assert_eq!(frame["d"], 7);

        seq_tx.send_replace(Some(8));
        let frame = next_heartbeat(&mut server).await;
        assert_eq!(frame["d"], 8);

        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_stops_on_cancel() {
        let (client, _server) = ws_pair().await;
        let cancel = CancellationToken::new();
        let (writer, _task) = spawn_writer_task(client, WriterConfig::default(), cancel.clone());
        let (_seq_tx, seq_rx) = watch::channel(None);

        let hb = spawn_heartbeat(Duration::from_millis(500), seq_rx, writer, cancel.clone());
        cancel.cancel();

        assert!(hb.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_send_failure_is_error() {
        let (client, _server) = ws_pair().await;
        let writer_cancel = CancellationToken::new();
        let (writer, writer_task) =
            spawn_writer_task(client, WriterConfig::default(), writer_cancel.clone());

        // Writer gone before the first beat.
        writer_cancel.cancel();
        writer_task.await.unwrap().unwrap();

        let (_seq_tx, seq_rx) = watch::channel(None);
        let hb = spawn_heartbeat(
            Duration::from_millis(100),
            seq_rx,
            writer,
            CancellationToken::new(),
        );

        let result = hb.await.unwrap();
        assert!(matches!(result, Err(KanteleError::ConnectionClosed)));
    }
}
