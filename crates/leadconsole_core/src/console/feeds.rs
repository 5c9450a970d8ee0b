//! Realtime feed wiring for one console activation.

use crate::console::ConsoleEvent;
use crate::notify::{spawn_notification_pump, NotificationCenter, PushEvent};
use crate::realtime::{RecordFeedItem, SubscriptionGuard};
use log::debug;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Guard plus the task draining its feed.
pub(crate) struct ActiveFeed {
    guard: SubscriptionGuard,
    task: JoinHandle<()>,
}

impl ActiveFeed {
    /// Releases the subscription and stops the draining task.
    pub(crate) fn shutdown(mut self) {
        self.guard.release();
        self.task.abort();
    }
}

/// Forwards record changes into the console event channel.
pub(crate) fn start_record_feed(
    runtime: &Handle,
    mut receiver: mpsc::Receiver<RecordFeedItem>,
    guard: SubscriptionGuard,
    events: mpsc::UnboundedSender<ConsoleEvent>,
) -> ActiveFeed {
    let task = runtime.spawn(async move {
        while let Some(item) = receiver.recv().await {
            let event = match item {
                Ok(change) => ConsoleEvent::RecordChanged(change),
                Err(err) => ConsoleEvent::RecordFeedFailed(err),
            };
            if events.send(event).is_err() {
                break;
            }
        }
        debug!("event=record_feed module=console status=closed");
    });
    ActiveFeed { guard, task }
}

/// Pumps notification push events into the shared center.
pub(crate) fn start_notification_feed(
    runtime: &Handle,
    receiver: mpsc::Receiver<PushEvent>,
    guard: SubscriptionGuard,
    center: NotificationCenter,
) -> ActiveFeed {
    let _entered = runtime.enter();
    let task = spawn_notification_pump(center, receiver);
    ActiveFeed { guard, task }
}
