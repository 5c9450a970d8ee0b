//! In-process realtime hub.
//!
//! Used by the smoke CLI and tests; production hosts implement
//! `RealtimeSource` over their own push transport.

use crate::notify::PushEvent;
use crate::query::TransportError;
use crate::realtime::{
    RealtimeSource, RecordChange, RecordFeedItem, Subscription, SubscriptionGuard,
};
use log::warn;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

const DEFAULT_FEED_BUFFER: usize = 64;

#[derive(Default)]
struct HubState {
    next_id: u64,
    records: Vec<(u64, mpsc::Sender<RecordFeedItem>)>,
    notifications: Vec<(u64, mpsc::Sender<PushEvent>)>,
    acquired: usize,
    released: usize,
    record_failure: Option<String>,
    notification_failure: Option<String>,
}

/// Fan-out hub implementing [`RealtimeSource`] with bounded channels.
#[derive(Clone)]
pub struct LocalRealtimeHub {
    state: Arc<Mutex<HubState>>,
    feed_buffer: usize,
}

impl Default for LocalRealtimeHub {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_BUFFER)
    }
}

impl LocalRealtimeHub {
    /// Creates a hub whose feeds buffer up to `feed_buffer` messages each.
    pub fn new(feed_buffer: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState::default())),
            feed_buffer: feed_buffer.max(1),
        }
    }

    /// Makes subsequent record subscriptions fail with `reason` (`None`
    /// restores normal behavior).
    pub fn fail_record_subscriptions(&self, reason: Option<&str>) {
        self.state.lock().record_failure = reason.map(str::to_string);
    }

    /// Makes subsequent notification subscriptions fail with `reason`.
    pub fn fail_notification_subscriptions(&self, reason: Option<&str>) {
        self.state.lock().notification_failure = reason.map(str::to_string);
    }

    /// Publishes a record change; returns the number of receiving feeds.
    pub fn publish_record(&self, change: RecordChange) -> usize {
        let mut state = self.state.lock();
        fan_out(&mut state.records, Ok(change), "records")
    }

    /// Publishes a feed-side failure on every record feed.
    pub fn publish_record_error(&self, error: TransportError) -> usize {
        let mut state = self.state.lock();
        fan_out(&mut state.records, Err(error), "records")
    }

    /// Publishes a notification event; returns the number of receiving feeds.
    pub fn publish_notification(&self, event: PushEvent) -> usize {
        let mut state = self.state.lock();
        fan_out(&mut state.notifications, event, "notifications")
    }

    /// Feeds currently subscribed (records and notifications).
    pub fn active_subscriptions(&self) -> usize {
        let state = self.state.lock();
        state.records.len() + state.notifications.len()
    }

    pub fn acquired_count(&self) -> usize {
        self.state.lock().acquired
    }

    pub fn released_count(&self) -> usize {
        self.state.lock().released
    }

    fn register<T: Send + 'static>(
        &self,
        topic: &'static str,
        select: fn(&mut HubState) -> &mut Vec<(u64, mpsc::Sender<T>)>,
    ) -> Subscription<T> {
        let (sender, receiver) = mpsc::channel(self.feed_buffer);
        let id = {
            let mut state = self.state.lock();
            state.next_id += 1;
            state.acquired += 1;
            let id = state.next_id;
            select(&mut *state).push((id, sender));
            id
        };

        let shared = Arc::clone(&self.state);
        let guard = SubscriptionGuard::new(topic, move || {
            let mut state = shared.lock();
            select(&mut *state).retain(|(feed_id, _)| *feed_id != id);
            state.released += 1;
        });
        Subscription::new(receiver, guard)
    }
}

impl RealtimeSource for LocalRealtimeHub {
    fn subscribe_records(&self) -> Result<Subscription<RecordFeedItem>, TransportError> {
        if let Some(reason) = self.state.lock().record_failure.clone() {
            return Err(TransportError::retryable("subscribe_records", reason));
        }
        Ok(self.register("records", record_feeds))
    }

    fn subscribe_notifications(&self) -> Result<Subscription<PushEvent>, TransportError> {
        if let Some(reason) = self.state.lock().notification_failure.clone() {
            return Err(TransportError::retryable("subscribe_notifications", reason));
        }
        Ok(self.register("notifications", notification_feeds))
    }
}

fn record_feeds(state: &mut HubState) -> &mut Vec<(u64, mpsc::Sender<RecordFeedItem>)> {
    &mut state.records
}

fn notification_feeds(state: &mut HubState) -> &mut Vec<(u64, mpsc::Sender<PushEvent>)> {
    &mut state.notifications
}

fn fan_out<T: Clone>(feeds: &mut Vec<(u64, mpsc::Sender<T>)>, message: T, topic: &str) -> usize {
    let mut delivered = 0;
    feeds.retain(|(feed_id, sender)| match sender.try_send(message.clone()) {
        Ok(()) => {
            delivered += 1;
            true
        }
        Err(TrySendError::Full(_)) => {
            warn!(
                "event=realtime_publish module=realtime status=error topic={} feed_id={} error_code=feed_full",
                topic, feed_id
            );
            true
        }
        Err(TrySendError::Closed(_)) => false,
    });
    delivered
}
