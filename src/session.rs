//! Per-client session state shared by the read loop and the heartbeat task.
//!
//! `last_sequence` has a single writer (the read loop) and any number of
//! readers, so it lives in a `watch` channel. The heartbeat interval is set
//! once per connection, by the first Hello.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;

/// Lifecycle of a gateway connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

pub(crate) struct Session {
    sequence: watch::Sender<Option<u64>>,
    heartbeat_interval: Mutex<Option<Duration>>,
    state: watch::Sender<ConnectionState>,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self {
            sequence: watch::Sender::new(None),
            heartbeat_interval: Mutex::new(None),
            state: watch::Sender::new(ConnectionState::Disconnected),
        }
    }

    /// Clear per-connection values before a new connection attempt.
    pub(crate) fn reset(&self) {
        self.sequence.send_replace(None);
        *self.heartbeat_interval.lock() = None;
    }

    /// Record the sequence number of an inbound frame.
    ///
    /// Frames without `s` leave the last value untouched. No ordering check
    /// is made, a lower value simply replaces a higher one.
    pub(crate) fn observe_sequence(&self, sequence: Option<u64>) {
        if let Some(seq) = sequence {
            self.sequence.send_replace(Some(seq));
        }
    }

    pub(crate) fn last_sequence(&self) -> Option<u64> {
        *self.sequence.borrow()
    }

    pub(crate) fn subscribe_sequence(&self) -> watch::Receiver<Option<u64>> {
        self.sequence.subscribe()
    }

    /// Store the heartbeat interval. Returns false if it was already set.
    pub(crate) fn set_heartbeat_interval(&self, interval: Duration) -> bool {
        let mut slot = self.heartbeat_interval.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(interval);
        true
    }

    pub(crate) fn heartbeat_interval(&self) -> Option<Duration> {
        *self.heartbeat_interval.lock()
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!("Connection state {:?} -> {:?}", previous, state);
        }
    }

    /// Move to `Connecting` if currently disconnected.
    pub(crate) fn begin_connect(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == ConnectionState::Disconnected {
                *state = ConnectionState::Connecting;
                true
            } else {
                false
            }
        })
    }

    /// Move to `Closing` only while connected, so a connection that has
    /// already wound down stays `Disconnected`.
    pub(crate) fn begin_close(&self) -> bool {
        let changed = self.state.send_if_modified(|state| {
            if *state == ConnectionState::Connected {
                *state = ConnectionState::Closing;
                true
            } else {
                false
            }
        });
        if changed {
            tracing::debug!("Connection state Connected -> Closing");
        }
        changed
    }

    pub(crate) fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }
}
