//! A minimal counter registry for classifier health metrics (queue
//! overflows, per-queue packet/verdict counts). Not an exporter: scraping
//! or pushing these counters to an external system is out of scope.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn incr(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Named counters, keyed by queue number. Cheap to clone (an `Arc` is
/// expected to wrap the whole registry at call sites).
#[derive(Debug, Default)]
pub struct QueueMetrics {
    overflows: Mutex<HashMap<i32, Counter>>,
    accepted: Mutex<HashMap<i32, Counter>>,
    dropped: Mutex<HashMap<i32, Counter>>,
}

impl QueueMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(map: &Mutex<HashMap<i32, Counter>>, queue: i32) {
        let mut guard = map.lock().expect("metrics mutex poisoned");
        guard.entry(queue).or_default().incr();
    }

    pub fn record_overflow(&self, queue: i32) {
        Self::bump(&self.overflows, queue);
    }

    pub fn record_accept(&self, queue: i32) {
        Self::bump(&self.accepted, queue);
    }

    pub fn record_drop(&self, queue: i32) {
        Self::bump(&self.dropped, queue);
    }

    pub fn overflow_count(&self, queue: i32) -> u64 {
        self.overflows
            .lock()
            .expect("metrics mutex poisoned")
            .get(&queue)
            .map_or(0, Counter::get)
    }

    pub fn accept_count(&self, queue: i32) -> u64 {
        self.accepted
            .lock()
            .expect("metrics mutex poisoned")
            .get(&queue)
            .map_or(0, Counter::get)
    }

    pub fn drop_count(&self, queue: i32) -> u64 {
        self.dropped
            .lock()
            .expect("metrics mutex poisoned")
            .get(&queue)
            .map_or(0, Counter::get)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_are_per_queue() {
        let m = QueueMetrics::new();
        m.record_accept(1);
        m.record_accept(1);
        m.record_drop(2);
        assert_eq!(m.accept_count(1), 2);
        assert_eq!(m.accept_count(2), 0);
        assert_eq!(m.drop_count(2), 1);
    }
}
