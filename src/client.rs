//! Gateway builder and connection runtime.
//!
//! The [`GatewayBuilder`] collects configuration and event handlers. The
//! [`Gateway`] manages one connection at a time:
//! 1. WebSocket handshake against the gateway URL
//! 2. Spawn the writer task (sole owner of the socket's write half)
//! 3. Read frames in order, update the session, route by opcode
//! 4. On Hello: queue Identify, then start the heartbeat task
//! 5. On Dispatch: run the registered handlers on a new task
//!
//! Every task started for a connection shares its cancellation token. When
//! the read loop ends (close frame, read or decode error, heartbeat failure,
//! or [`Gateway::close`]) the token is cancelled and all of them stop.
//! There is no reconnect; call [`Gateway::open`] again to start over.
//!
//! # Example
//!
//! ```ignore
//! use kantele::{Gateway, Intents};
//!
//! #[tokio::main]
//! async fn main() -> kantele::Result<()> {
//!     let gateway = Gateway::builder(std::env::var("BOT_TOKEN").unwrap())
//!         .intents(Intents::GUILD_MESSAGES | Intents::MESSAGE_CONTENT)
//!         .on("READY", |_: serde_json::Value, _ctx| async { Ok(()) })
//!         .build()?;
//!
//!     gateway.open().await?;
//!     gateway.wait_for_shutdown().await
//! }
//! ```

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{FutureExt, Stream, StreamExt};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_tungstenite::connect_async_with_config;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

use crate::config::GatewayConfig;
use crate::error::{KanteleError, Result};
use crate::handler::{EventContext, EventRegistry, HandlerId, HandlerResult};
use crate::heartbeat::spawn_heartbeat;
use crate::intents::Intents;
use crate::protocol::{ConnectionProperties, GatewayCommand, GatewayEvent, Hello, WireEnvelope};
use crate::session::{ConnectionState, Session};
use crate::writer::{spawn_writer_task, OutboundFrame, WriterHandle};

/// Event name of the first dispatch after a successful Identify.
const READY_EVENT: &str = "READY";

/// Builder for configuring and creating a [`Gateway`].
pub struct GatewayBuilder {
    token: String,
    config: GatewayConfig,
    registry: EventRegistry,
}

impl GatewayBuilder {
    /// Create a builder with default configuration.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            config: GatewayConfig::default(),
            registry: EventRegistry::new(),
        }
    }

    /// Register a handler for a dispatch event (e.g. `"MESSAGE_CREATE"`).
    ///
    /// The payload is deserialized into `T`; use `serde_json::Value` to take
    /// it as-is.
    pub fn on<F, T, Fut>(self, event: &str, handler: F) -> Self
    where
        F: Fn(T, EventContext) -> Fut + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.register(event, handler);
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    pub fn intents(mut self, intents: Intents) -> Self {
        self.config.intents = intents;
        self
    }

    pub fn large_threshold(mut self, threshold: u32) -> Self {
        self.config.large_threshold = threshold;
        self
    }

    pub fn compress(mut self, compress: bool) -> Self {
        self.config.compress = compress;
        self
    }

    /// Set the OS/browser/device strings reported on Identify.
    pub fn properties(mut self, properties: ConnectionProperties) -> Self {
        self.config.properties = properties;
        self
    }

    pub fn shard(mut self, id: u32, count: u32) -> Self {
        self.config.shard = Some([id, count]);
        self
    }

    /// WebSocket transport settings used for the handshake.
    pub fn websocket_config(mut self, config: WebSocketConfig) -> Self {
        self.config.websocket = Some(config);
        self
    }

    /// Set the outbound frame queue capacity.
    ///
    /// Default: 64
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.writer.channel_capacity = capacity;
        self
    }

    /// Bound the number of dispatch tasks running at once.
    ///
    /// When the bound is reached the read loop waits for a running dispatch
    /// to finish. Default: unbounded.
    pub fn max_concurrent_dispatches(mut self, limit: usize) -> Self {
        self.config.max_concurrent_dispatches = Some(limit);
        self
    }

    /// Validate the configuration and build the gateway. Does not connect.
    pub fn build(self) -> Result<Gateway> {
        self.config.validate()?;
        Ok(Gateway {
            token: self.token,
            config: self.config,
            registry: Arc::new(self.registry),
            session: Arc::new(Session::new()),
            connection: Mutex::new(None),
        })
    }
}

/// The running parts of one connection.
struct ActiveConnection {
    writer: WriterHandle,
    cancel: CancellationToken,
    task: Option<JoinHandle<Result<()>>>,
}

/// A gateway client.
///
/// Handlers live as long as the client, across connections.
pub struct Gateway {
    token: String,
    config: GatewayConfig,
    registry: Arc<EventRegistry>,
    session: Arc<Session>,
    connection: Mutex<Option<ActiveConnection>>,
}

impl Gateway {
    pub fn builder(token: impl Into<String>) -> GatewayBuilder {
        GatewayBuilder::new(token)
    }

    /// Register a handler at runtime. Applies from the next dispatch.
    pub fn on<F, T, Fut>(&self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(T, EventContext) -> Fut + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.register(event, handler)
    }

    /// Remove a handler registered with [`on`](Self::on) or the builder.
    pub fn unregister(&self, id: HandlerId) -> bool {
        self.registry.unregister(id)
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.session.state()
    }

    /// Watch connection state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.session.subscribe_state()
    }

    /// Most recent sequence number seen on the current connection.
    pub fn last_sequence(&self) -> Option<u64> {
        self.session.last_sequence()
    }

    /// Heartbeat interval announced by the current connection's Hello.
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        self.session.heartbeat_interval()
    }

    /// Connect and start the read loop.
    ///
    /// Returns once the WebSocket handshake is done; Identify and heartbeats
    /// follow on their own. A failed handshake is returned as
    /// [`KanteleError::Connect`] and nothing is retried.
    pub async fn open(&self) -> Result<()> {
        if !self.session.begin_connect() {
            return Err(KanteleError::AlreadyOpen);
        }

        tracing::info!("Opening gateway connection to {}", self.config.url);
        self.session.reset();

        let ws = match connect_async_with_config(
            self.config.url.as_str(),
            self.config.websocket,
            false,
        )
        .await
        {
            Ok((ws, response)) => {
                tracing::debug!("Gateway handshake status {}", response.status());
                ws
            }
            Err(e) => {
                tracing::error!("Gateway handshake failed: {}", e);
                self.session.set_state(ConnectionState::Disconnected);
                return Err(KanteleError::Connect(e));
            }
        };
        self.session.set_state(ConnectionState::Connected);

        let (sink, stream) = ws.split();
        let cancel = CancellationToken::new();
        let (writer, writer_task) =
            spawn_writer_task(sink, self.config.writer.clone(), cancel.clone());

        let driver = ConnectionDriver {
            identify: GatewayCommand::Identify(self.config.identify(&self.token)),
            registry: self.registry.clone(),
            session: self.session.clone(),
            writer: writer.clone(),
            cancel: cancel.clone(),
            dispatch_slots: self
                .config
                .max_concurrent_dispatches
                .map(|limit| Arc::new(Semaphore::new(limit))),
            writer_task: Some(writer_task),
            heartbeat: None,
            dispatches: JoinSet::new(),
        };
        let task = tokio::spawn(driver.run(stream));

        *self.connection.lock() = Some(ActiveConnection {
            writer,
            cancel,
            task: Some(task),
        });
        Ok(())
    }

    /// Send a normal close frame and stop the connection's tasks.
    ///
    /// A no-op when nothing is connected.
    pub async fn close(&self) -> Result<()> {
        let (writer, cancel) = match self.connection.lock().as_ref() {
            Some(conn) if !conn.cancel.is_cancelled() => (conn.writer.clone(), conn.cancel.clone()),
            _ => return Ok(()),
        };

        tracing::info!("Closing gateway connection");
        self.session.begin_close();
        if let Err(e) = writer.send(OutboundFrame::normal_close()).await {
            tracing::debug!("Close frame not sent: {}", e);
        }
        cancel.cancel();
        Ok(())
    }

    /// Wait until the current connection's read loop ends.
    ///
    /// Returns how it ended: `Ok` for a close frame, end of stream or
    /// [`close`](Self::close); the fatal error otherwise. Only the first
    /// caller per connection gets the outcome, later calls return `Ok`.
    pub async fn wait_for_shutdown(&self) -> Result<()> {
        let task = self
            .connection
            .lock()
            .as_mut()
            .and_then(|conn| conn.task.take());

        match task {
            Some(task) => task.await?,
            None => Ok(()),
        }
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        if let Some(conn) = self.connection.get_mut().take() {
            conn.cancel.cancel();
        }
    }
}

/// Read side of one connection plus the tasks it owns.
struct ConnectionDriver {
    identify: GatewayCommand,
    registry: Arc<EventRegistry>,
    session: Arc<Session>,
    writer: WriterHandle,
    cancel: CancellationToken,
    dispatch_slots: Option<Arc<Semaphore>>,
    writer_task: Option<JoinHandle<Result<()>>>,
    heartbeat: Option<JoinHandle<Result<()>>>,
    dispatches: JoinSet<DispatchOutcome>,
}

/// Event name plus what its handlers did, panics included.
type DispatchOutcome = (String, std::thread::Result<HandlerResult>);

impl ConnectionDriver {
    async fn run<St>(mut self, mut stream: St) -> Result<()>
    where
        St: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin,
    {
        let outcome = self.read_loop(&mut stream).await;
        drop(stream);

        self.session.set_state(ConnectionState::Closing);
        self.cancel.cancel();
        self.dispatches.shutdown().await;
        self.session.set_state(ConnectionState::Disconnected);

        match &outcome {
            Ok(()) => tracing::info!("Connection finished"),
            Err(e) => tracing::error!("Connection finished with error: {}", e),
        }
        outcome
    }

    /// Process frames one at a time until the connection ends.
    async fn read_loop<St>(&mut self, stream: &mut St) -> Result<()>
    where
        St: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin,
    {
        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    tracing::debug!("Connection cancelled");
                    return Ok(());
                }

                result = join_task(&mut self.writer_task) => {
                    // Ok means a close frame went out; keep reading for the reply.
                    self.writer_task = None;
                    result?;
                }

                result = join_task(&mut self.heartbeat) => {
                    self.heartbeat = None;
                    result?;
                }

                Some(joined) = self.dispatches.join_next(), if !self.dispatches.is_empty() => {
                    if let Some(failure) = dispatch_failure(joined) {
                        tracing::error!("{}", failure);
                    }
                }

                message = stream.next() => match message {
                    None => {
                        tracing::debug!("Gateway stream ended");
                        return Ok(());
                    }
                    Some(Err(e)) => {
                        tracing::error!("Read message error: {}", e);
                        return Err(e.into());
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::debug!("Closing connection: {:?}", frame);
                        return Ok(());
                    }
                    Some(Ok(Message::Text(text))) => {
                        let envelope = WireEnvelope::decode(&text)?;
                        self.handle_envelope(envelope).await?;
                    }
                    Some(Ok(other)) => {
                        tracing::debug!("Conn message: {:?}", other);
                    }
                },
            }
        }
    }

    async fn handle_envelope(&mut self, envelope: WireEnvelope) -> Result<()> {
        let sequence = envelope.sequence;
        self.session.observe_sequence(sequence);

        match GatewayEvent::from_envelope(envelope)? {
            GatewayEvent::Hello(hello) => self.on_hello(hello).await,
            GatewayEvent::HeartbeatAck => {
                tracing::info!("Heartbeat acknowledged");
                Ok(())
            }
            GatewayEvent::Dispatch { name, data } => self.spawn_dispatch(name, data, sequence).await,
            GatewayEvent::Unhandled(envelope) => {
                tracing::debug!("Unhandled payload: {:?}", envelope);
                Ok(())
            }
        }
    }

    /// Identify is queued before the heartbeat task exists, so it always
    /// precedes the first heartbeat on the wire.
    async fn on_hello(&mut self, hello: Hello) -> Result<()> {
        if !self.session.set_heartbeat_interval(hello.interval()) {
            tracing::warn!("Ignoring repeated Hello");
            return Ok(());
        }

        tracing::info!("Identifying...");
        self.writer.send_command(&self.identify).await?;

        self.heartbeat = Some(spawn_heartbeat(
            hello.interval(),
            self.session.subscribe_sequence(),
            self.writer.clone(),
            self.cancel.child_token(),
        ));
        Ok(())
    }

    async fn spawn_dispatch(
        &mut self,
        name: String,
        data: Value,
        sequence: Option<u64>,
    ) -> Result<()> {
        tracing::debug!("Event received: {}", name);
        if name == READY_EVENT {
            tracing::info!("Gateway connection is ready!");
        }

        let permit = match &self.dispatch_slots {
            Some(slots) => Some(
                slots
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| KanteleError::ConnectionClosed)?,
            ),
            None => None,
        };

        let registry = self.registry.clone();
        self.dispatches.spawn(async move {
            // Permit is held until this dispatch completes
            let _permit = permit;

            let ctx = EventContext::new(&name, sequence);
            let outcome = AssertUnwindSafe(registry.dispatch(&name, data, ctx))
                .catch_unwind()
                .await;
            (name, outcome)
        });
        Ok(())
    }
}

/// Await an optional task; pending forever when there is none.
async fn join_task(task: &mut Option<JoinHandle<Result<()>>>) -> Result<()> {
    match task {
        Some(handle) => handle.await?,
        None => std::future::pending().await,
    }
}

/// Log line for a reaped dispatch task, `None` when its handlers succeeded.
fn dispatch_failure(joined: std::result::Result<DispatchOutcome, JoinError>) -> Option<String> {
    match joined {
        Ok((_, Ok(Ok(())))) => None,
        Ok((event, Ok(Err(e)))) => Some(format!("Handler error for event {}: {}", event, e)),
        Ok((event, Err(panic))) => Some(format!(
            "Handler for event {} panicked: {}",
            event,
            panic_message(panic.as_ref())
        )),
        Err(e) if e.is_cancelled() => None,
        Err(e) => Some(format!("Dispatch task failed: {}", e)),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
