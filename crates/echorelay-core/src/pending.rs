//! Pending-delivery set
//!
//! Outbound texts that have been transmitted but whose echo has not yet been
//! seen by the witness session. Entries are keyed by content alone: the same
//! text sent to two destinations is a single entry, and one echo clears it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Bounded FIFO set of unconfirmed texts
#[derive(Debug, Default)]
pub struct PendingDeliveries {
    entries: Mutex<VecDeque<String>>,
    evicted: AtomicU64,
    acknowledged: AtomicU64,
}

impl PendingDeliveries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `text`, evicting the oldest entries while above `capacity`
    ///
    /// Re-inserting a text that is already pending is a no-op. Returns the
    /// evicted texts, oldest first.
    pub fn insert(&self, text: &str, capacity: usize) -> Vec<String> {
        let capacity = capacity.max(1);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if !entries.iter().any(|entry| entry == text) {
            entries.push_back(text.to_string());
        }

        let mut evicted = Vec::new();
        while entries.len() > capacity {
            if let Some(oldest) = entries.pop_front() {
                evicted.push(oldest);
            }
        }
        self.evicted
            .fetch_add(evicted.len() as u64, Ordering::Relaxed);
        evicted
    }

    pub fn contains(&self, text: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|entry| entry == text)
    }

    /// Clear the first entry equal to an observed echo
    pub fn acknowledge(&self, echoed: &str) -> bool {
        let cleared = self.remove(echoed);
        if cleared {
            self.acknowledged.fetch_add(1, Ordering::Relaxed);
        }
        cleared
    }

    /// Drop an entry without counting it as acknowledged
    pub fn remove(&self, text: &str) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.iter().position(|entry| entry == text) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current entries, oldest first
    pub fn snapshot(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn evicted_count(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    pub fn acknowledged_count(&self) -> u64 {
        self.acknowledged.load(Ordering::Relaxed)
    }
}
