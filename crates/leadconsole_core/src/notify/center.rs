//! Shared notification state and its realtime pump.

use crate::notify::{
    NotificationBuffer, NotificationCategory, NotificationId, NotificationItem,
    NotificationPreferences, PushEvent,
};
use log::{debug, info};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// What happened to one ingested push event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Item was prepended to the buffer.
    Buffered {
        item: NotificationItem,
        evicted: Option<NotificationId>,
    },
    /// Category disabled; nothing was buffered or surfaced.
    Dropped(NotificationCategory),
}

struct CenterState {
    preferences: NotificationPreferences,
    buffer: NotificationBuffer,
}

/// Preference-filtered, capacity-bounded notification buffer.
///
/// Cloning yields another handle to the same buffer; the realtime pump and
/// the console share one center.
#[derive(Clone)]
pub struct NotificationCenter {
    state: Arc<Mutex<CenterState>>,
    surface: Option<mpsc::UnboundedSender<NotificationItem>>,
}

impl NotificationCenter {
    pub fn new(capacity: usize, preferences: NotificationPreferences) -> Self {
        Self {
            state: Arc::new(Mutex::new(CenterState {
                preferences,
                buffer: NotificationBuffer::new(capacity),
            })),
            surface: None,
        }
    }

    /// Forwards every buffered item to `sender` (toast feed).
    pub fn with_surface(mut self, sender: mpsc::UnboundedSender<NotificationItem>) -> Self {
        self.surface = Some(sender);
        self
    }

    /// Applies preferences and buffers the event when its category is enabled.
    pub fn ingest(&self, event: PushEvent) -> IngestOutcome {
        let category = event.category;
        let (item, evicted) = {
            let mut state = self.state.lock();
            if !state.preferences.is_enabled(category) {
                return IngestOutcome::Dropped(category);
            }
            let item = NotificationItem::from_event(event);
            let evicted = state.buffer.push_front(item.clone());
            (item, evicted.map(|old| old.id))
        };

        debug!(
            "event=notification_buffered module=notify status=ok category={} evicted={}",
            category,
            evicted.is_some()
        );

        if let Some(surface) = &self.surface {
            if surface.send(item.clone()).is_err() {
                debug!(
                    "event=notification_surface module=notify status=skip reason=receiver_closed"
                );
            }
        }

        IngestOutcome::Buffered { item, evicted }
    }

    /// Removes the item with `id` regardless of its category's enablement.
    pub fn dismiss(&self, id: NotificationId) -> bool {
        let removed = self.state.lock().buffer.dismiss(id);
        debug!(
            "event=notification_dismiss module=notify status={}",
            if removed { "ok" } else { "skip" }
        );
        removed
    }

    /// Removes every buffered item.
    pub fn clear(&self) -> usize {
        self.state.lock().buffer.clear()
    }

    /// Newest-first snapshot of the buffer.
    pub fn items(&self) -> Vec<NotificationItem> {
        self.state.lock().buffer.to_vec()
    }

    pub fn len(&self) -> usize {
        self.state.lock().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().buffer.capacity()
    }

    pub fn preferences(&self) -> NotificationPreferences {
        self.state.lock().preferences.clone()
    }

    /// Updates one category preference. Already buffered items are kept.
    pub fn set_enabled(&self, category: NotificationCategory, enabled: bool) {
        self.state.lock().preferences.set_enabled(category, enabled);
        info!(
            "event=notification_preference module=notify status=ok category={} enabled={}",
            category, enabled
        );
    }
}

/// Spawns a task that ingests every event from `receiver` into `center`.
///
/// The task ends when the feed closes, which happens when the owning
/// subscription guard is released.
pub fn spawn_notification_pump(
    center: NotificationCenter,
    mut receiver: mpsc::Receiver<PushEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ingested = 0_u64;
        while let Some(event) = receiver.recv().await {
            if let IngestOutcome::Buffered { .. } = center.ingest(event) {
                ingested += 1;
            }
        }
        info!(
            "event=notification_pump module=notify status=closed ingested={}",
            ingested
        );
    })
}
