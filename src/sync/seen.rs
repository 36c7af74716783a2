// Seen Cache - bounded, time-windowed set of transaction digests
//
// Stops a transaction from being applied and relayed again when it comes
// back around a cycle in the peer graph. Entries expire after the TTL and
// the oldest are evicted once capacity is reached.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Remembers recently seen digests
#[derive(Clone, Debug)]
pub struct SeenCache {
    ttl: Duration,
    capacity: usize,
    seen_at: HashMap<String, Instant>,
    // Insertion order, oldest first
    order: VecDeque<String>,
}

impl SeenCache {
    /// Create a cache; a zero capacity is treated as one
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            seen_at: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Number of digests currently remembered
    pub fn len(&self) -> usize {
        self.seen_at.len()
    }

    /// Check if nothing is remembered
    pub fn is_empty(&self) -> bool {
        self.seen_at.is_empty()
    }

    /// Check for a live digest without inserting it
    pub fn contains(&self, digest: &str) -> bool {
        self.contains_at(digest, Instant::now())
    }

    /// Same as [`SeenCache::contains`] with an explicit clock. An entry
    /// past its TTL no longer counts, pruned or not.
    pub fn contains_at(&self, digest: &str, now: Instant) -> bool {
        self.seen_at
            .get(digest)
            .is_some_and(|at| !self.is_expired(*at, now))
    }

    fn is_expired(&self, seen_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(seen_at) > self.ttl
    }

    /// Insert a digest; returns true if it was not already remembered
    pub fn check_and_insert(&mut self, digest: &str) -> bool {
        self.check_and_insert_at(digest, Instant::now())
    }

    /// Same as [`SeenCache::check_and_insert`] with an explicit clock
    pub fn check_and_insert_at(&mut self, digest: &str, now: Instant) -> bool {
        self.prune(now);

        if self.contains_at(digest, now) {
            return false;
        }

        self.seen_at.insert(digest.to_string(), now);
        self.order.push_back(digest.to_string());

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen_at.remove(&oldest);
            }
        }

        true
    }

    /// Drop entries older than the TTL; returns how many were removed
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.order.len();

        while let Some(oldest) = self.order.front() {
            let expired = self
                .seen_at
                .get(oldest)
                .map(|at| self.is_expired(*at, now))
                .unwrap_or(true);
            if !expired {
                break;
            }
            if let Some(oldest) = self.order.pop_front() {
                self.seen_at.remove(&oldest);
            }
        }

        before - self.order.len()
    }
}
