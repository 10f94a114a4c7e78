use std::sync::atomic::{AtomicU64, Ordering};

/// Pipeline counters, updated by the tick loops and logged on shutdown.
#[derive(Debug, Default)]
pub struct RelayStats {
    pub lines_received: AtomicU64,
    pub parse_failures: AtomicU64,
    pub respawn_failures: AtomicU64,
    pub batches_published: AtomicU64,
    pub batches_oversized: AtomicU64,
    pub legends_published: AtomicU64,
    pub send_failures: AtomicU64,
    pub messages_evicted: AtomicU64,
    pub delete_failures: AtomicU64,
}

/// Point-in-time copy of [`RelayStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub lines_received: u64,
    pub parse_failures: u64,
    pub respawn_failures: u64,
    pub batches_published: u64,
    pub batches_oversized: u64,
    pub legends_published: u64,
    pub send_failures: u64,
    pub messages_evicted: u64,
    pub delete_failures: u64,
}

impl RelayStats {
    pub(crate) fn incr(counter: &AtomicU64) {
        Self::add(counter, 1);
    }

    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            lines_received: get(&self.lines_received),
            parse_failures: get(&self.parse_failures),
            respawn_failures: get(&self.respawn_failures),
            batches_published: get(&self.batches_published),
            batches_oversized: get(&self.batches_oversized),
            legends_published: get(&self.legends_published),
            send_failures: get(&self.send_failures),
            messages_evicted: get(&self.messages_evicted),
            delete_failures: get(&self.delete_failures),
        }
    }
}
