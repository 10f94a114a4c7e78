//! Registry of published messages, deleted oldest-first once past their TTL.
//!
//! Producers only append at the tail; the eviction tick only pops the head.
//! Entries are never reordered, so the head is always the oldest message.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use rbnbot_core::PublishedMessage;
use tracing::{debug, warn};

use crate::sink::MessageSink;

/// Outcome of one eviction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Messages removed from the registry.
    pub evicted: usize,
    /// Of those, deletions the sink reported as failed.
    pub failed: usize,
}

#[derive(Default)]
pub struct MessageRegistry {
    entries: Mutex<VecDeque<PublishedMessage>>,
}

impl MessageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append at the tail.
    pub fn register(&self, message: PublishedMessage) {
        self.lock().push_back(message);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Oldest registered message, if any.
    pub fn oldest(&self) -> Option<PublishedMessage> {
        self.lock().front().copied()
    }

    /// Pop the head if it is at least `ttl` old at `now`.
    pub fn pop_expired(&self, now: DateTime<Utc>, ttl: TimeDelta) -> Option<PublishedMessage> {
        let mut entries = self.lock();
        let head = entries.front()?;
        if now - head.published_at >= ttl {
            entries.pop_front()
        } else {
            None
        }
    }

    /// Delete every message at least `ttl` old, oldest first.
    ///
    /// An entry leaves the registry before its delete is attempted, so a
    /// failed delete is logged and not retried.
    pub async fn evict_expired<S>(
        &self,
        now: DateTime<Utc>,
        ttl: TimeDelta,
        sink: &S,
    ) -> EvictionReport
    where
        S: MessageSink + ?Sized,
    {
        let mut report = EvictionReport::default();
        while let Some(message) = self.pop_expired(now, ttl) {
            report.evicted += 1;
            match sink.delete(&message.handle).await {
                Ok(()) => debug!(handle = %message.handle, "expired message deleted"),
                Err(e) => {
                    report.failed += 1;
                    warn!(handle = %message.handle, error = %e, "failed to delete expired message");
                }
            }
        }
        report
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<PublishedMessage>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
