//! Insertion-ordered queue of transient notifications.
//!
//! The queue itself only stores records; scheduling the automatic removal
//! of each one is the aggregator's job (see [`crate::app_store`]). Removal
//! is a filter by id, so a removal that arrives after the record is gone is
//! harmless.

use std::sync::Arc;

use store_core::clock::Clock;
use store_core::ids;
use store_core::models::{Notification, NotificationDraft, DEFAULT_NOTIFICATION_DURATION_MS};

/// Ordered notifications, oldest first.
pub struct NotificationQueue {
    items: Vec<Notification>,
    clock: Arc<dyn Clock>,
    default_duration_ms: i64,
}

impl NotificationQueue {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_default_duration(clock, DEFAULT_NOTIFICATION_DURATION_MS)
    }

    pub fn with_default_duration(clock: Arc<dyn Clock>, default_duration_ms: i64) -> Self {
        Self {
            items: Vec::new(),
            clock,
            default_duration_ms,
        }
    }

    /// Stamp `draft` with an id and the current time, append it, and return
    /// the stored record.
    pub fn add(&mut self, draft: NotificationDraft) -> Notification {
        let now = self.clock.now_ms();
        let notification = Notification {
            id: ids::notification_id(now),
            kind: draft.kind,
            title: draft.title,
            message: draft.message,
            timestamp: now,
            duration: Some(draft.duration.unwrap_or(self.default_duration_ms)),
        };
        tracing::debug!(
            id = %notification.id,
            kind = %notification.kind,
            duration = ?notification.duration,
            "notification added"
        );
        self.items.push(notification.clone());
        notification
    }

    /// Drop the notification with `id`. Returns `true` when one was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        before != self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.items.iter().find(|n| n.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
