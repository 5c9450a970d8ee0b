//! Fixed-capacity most-recent-first notification buffer.

use crate::notify::{NotificationId, NotificationItem};
use std::collections::VecDeque;

/// Ring buffer of notification items, newest at the front.
#[derive(Debug, Clone)]
pub struct NotificationBuffer {
    items: VecDeque<NotificationItem>,
    capacity: usize,
}

impl NotificationBuffer {
    /// Creates an empty buffer. A zero capacity is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepends `item` and returns the evicted oldest item on overflow.
    pub fn push_front(&mut self, item: NotificationItem) -> Option<NotificationItem> {
        self.items.push_front(item);
        if self.items.len() > self.capacity {
            return self.items.pop_back();
        }
        None
    }

    /// Removes the first item with `id`. Returns whether one was removed.
    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        match self.items.iter().position(|item| item.id == id) {
            Some(index) => self.items.remove(index).is_some(),
            None => false,
        }
    }

    /// Removes every item and returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.items.len();
        self.items.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &NotificationItem> {
        self.items.iter()
    }

    /// Newest-first copy of the buffered items.
    pub fn to_vec(&self) -> Vec<NotificationItem> {
        self.items.iter().cloned().collect()
    }
}
