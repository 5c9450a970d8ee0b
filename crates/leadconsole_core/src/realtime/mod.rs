//! Channel-based realtime subscriptions.
//!
//! # Responsibility
//! - Model realtime feeds as bounded receive channels instead of callbacks.
//! - Tie every subscription to a guard that releases it exactly once.
//!
//! # Invariants
//! - A `SubscriptionGuard` calls its release hook at most once, either on
//!   explicit `release()` or on drop, so every exit path unsubscribes.
//! - Releasing the guard closes the feed; consumers observe `None` from
//!   `recv()` once buffered messages are drained.

use crate::model::lead::LeadId;
use crate::notify::PushEvent;
use crate::query::TransportError;
use log::debug;
use tokio::sync::mpsc;

mod local;

pub use local::LocalRealtimeHub;

/// Change kind reported by the record feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordChangeKind {
    Inserted,
    Updated,
    Deleted,
}

/// One record change pushed by the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordChange {
    pub id: LeadId,
    pub kind: RecordChangeKind,
}

/// Message on the record feed; `Err` carries a feed-side failure.
pub type RecordFeedItem = Result<RecordChange, TransportError>;

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// Owns the release side of one subscription.
pub struct SubscriptionGuard {
    topic: &'static str,
    release: Option<ReleaseHook>,
}

impl SubscriptionGuard {
    pub fn new(topic: &'static str, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            topic,
            release: Some(Box::new(release)),
        }
    }

    pub fn topic(&self) -> &'static str {
        self.topic
    }

    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }

    /// Releases the subscription. Later calls are no-ops.
    pub fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
            debug!(
                "event=subscription_release module=realtime status=ok topic={}",
                self.topic
            );
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Receive side of one realtime feed plus its release guard.
pub struct Subscription<T> {
    receiver: mpsc::Receiver<T>,
    guard: SubscriptionGuard,
}

impl<T> Subscription<T> {
    pub fn new(receiver: mpsc::Receiver<T>, guard: SubscriptionGuard) -> Self {
        Self { receiver, guard }
    }

    /// Awaits the next message; `None` once the feed is closed and drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    pub fn topic(&self) -> &'static str {
        self.guard.topic()
    }

    /// Splits the feed so a background task can own the receiver while the
    /// caller keeps the guard.
    pub fn into_parts(self) -> (mpsc::Receiver<T>, SubscriptionGuard) {
        (self.receiver, self.guard)
    }
}

/// Source of realtime feeds for one console.
pub trait RealtimeSource: Send + Sync {
    /// Subscribes to record changes for the console's entity.
    fn subscribe_records(&self) -> Result<Subscription<RecordFeedItem>, TransportError>;

    /// Subscribes to notification push events.
    fn subscribe_notifications(&self) -> Result<Subscription<PushEvent>, TransportError>;
}
