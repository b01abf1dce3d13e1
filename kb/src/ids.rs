//! Monotonic, per-prefix id generation (spec §9 "Global mutable state").
//!
//! Kept as an explicit, passed-in object rather than a process-wide global:
//! `Cognition` and `Tms` each own one.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct IdGenerator {
    counters: DashMap<String, AtomicU64>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            counters: DashMap::new(),
        }
    }

    /// Returns a fresh `"{prefix}{n}"` id, unique for this generator and
    /// this prefix. Ids are never reused, even after retraction.
    pub fn next(&self, prefix: &str) -> String {
        let counter = self
            .counters
            .entry(prefix.to_string())
            .or_insert_with(|| AtomicU64::new(0));
        let n = counter.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}{n}")
    }
}
