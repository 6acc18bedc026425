//! Process-wide authentication failure notification

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::warn;

const CHANNEL_CAPACITY: usize = 16;

/// Raised when the session can no longer be recovered by refreshing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFailureEvent {
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

/// Broadcast channel for [`AuthFailureEvent`]s.
///
/// Clones share the same channel and emission counter. Subscribers should
/// treat any event as a logout.
#[derive(Debug, Clone)]
pub struct AuthFailureSignal {
    sender: broadcast::Sender<AuthFailureEvent>,
    emissions: Arc<AtomicU64>,
}

impl AuthFailureSignal {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender, emissions: Arc::new(AtomicU64::new(0)) }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthFailureEvent> {
        self.sender.subscribe()
    }

    /// Notifies all current subscribers. Emitting with no subscribers is not
    /// an error; the event is counted either way.
    pub fn emit(&self, message: impl Into<String>) {
        let event = AuthFailureEvent { message: message.into(), occurred_at: Utc::now() };
        self.emissions.fetch_add(1, Ordering::SeqCst);

        warn!(message = %event.message, "Authentication failure signalled");
        let _ = self.sender.send(event);
    }

    /// Total events emitted since creation.
    pub fn emission_count(&self) -> u64 {
        self.emissions.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for AuthFailureSignal {
    fn default() -> Self {
        Self::new()
    }
}
