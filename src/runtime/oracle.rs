//! Oracle: speculative recall for recently used names.
//!
//! The short-term queue remembers the last few names that were assimilated
//! or divined. Each oracle cycle precomputes their recall and parks the
//! result in a single-use cache; `divine` consumes it on the next call.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::memory::cleanup::Recall;
use crate::runtime::pipeline::RecallPipeline;

/// Bounded FIFO of recent names without duplicates. Re-using a name moves
/// it to the newest position.
pub struct ShortTermQueue {
    names: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl ShortTermQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            names: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Enqueue `name` as the newest entry, evicting the oldest when full.
    pub fn push(&self, name: &str) {
        if self.capacity == 0 {
            return;
        }
        let mut names = self.names.lock();
        if let Some(pos) = names.iter().position(|n| n == name) {
            names.remove(pos);
        } else if names.len() >= self.capacity {
            names.pop_front();
        }
        names.push_back(name.to_string());
    }

    /// Current contents, oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        self.names.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.names.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.lock().is_empty()
    }

    pub fn clear(&self) {
        self.names.lock().clear();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Cache statistics.
#[derive(Clone, Debug, Default, Serialize)]
pub struct OracleStats {
    pub precomputed: u64,
    pub hits: u64,
    pub misses: u64,
}

/// Single-use cache of precomputed recalls.
pub struct OracleCache {
    queue: ShortTermQueue,
    prophecies: DashMap<String, Recall>,
    threshold: f64,
    precomputed: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl OracleCache {
    pub fn new(capacity: usize, threshold: f64) -> Self {
        Self {
            queue: ShortTermQueue::new(capacity),
            prophecies: DashMap::new(),
            threshold,
            precomputed: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Note a recently used name.
    pub fn observe(&self, name: &str) {
        self.queue.push(name);
    }

    /// Remove and return the cached recall for `name`.
    pub fn take(&self, name: &str) -> Option<Recall> {
        match self.prophecies.remove(name) {
            Some((_, recall)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(name, "oracle hit");
                Some(recall)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Precompute every queued name that is known, not quarantined and not
    /// already cached. Void results are not stored. Returns how many were
    /// stored.
    pub fn run_cycle(&self, pipeline: &RecallPipeline) -> usize {
        let cleanup = pipeline.cleanup_memory();
        let mut stored = 0;
        for name in self.queue.snapshot() {
            if self.prophecies.contains_key(&name)
                || cleanup.quarantine().contains(&name)
                || !cleanup.table().contains(&name)
            {
                continue;
            }
            let recall = pipeline.recall(&name, self.threshold);
            if recall.is_void() {
                continue;
            }
            self.prophecies.insert(name, recall);
            stored += 1;
        }
        if stored > 0 {
            self.precomputed.fetch_add(stored as u64, Ordering::Relaxed);
            debug!(stored, "oracle precomputed");
        }
        stored
    }

    /// Discard every cached result keyed by `name` or recalling `name`.
    /// Returns how many were dropped.
    pub fn purge(&self, name: &str) -> usize {
        let before = self.prophecies.len();
        self.prophecies
            .retain(|key, recall| key.as_str() != name && recall.name() != Some(name));
        before.saturating_sub(self.prophecies.len())
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.prophecies.contains_key(name)
    }

    pub fn cached_count(&self) -> usize {
        self.prophecies.len()
    }

    /// Drop every cached result and queued name.
    pub fn clear(&self) {
        self.prophecies.clear();
        self.queue.clear();
    }

    pub fn queue(&self) -> &ShortTermQueue {
        &self.queue
    }

    pub fn stats(&self) -> OracleStats {
        OracleStats {
            precomputed: self.precomputed.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::{AXIOM_NAME, ORACLE_THRESHOLD};
    use crate::memory::cleanup::{CleanupMemory, Quarantine};
    use crate::memory::concept_table::ConceptTable;
    use crate::memory::singularity::SingularityMemory;

    fn centered_pipeline() -> RecallPipeline {
        let memory = Arc::new(SingularityMemory::new());
        let table = Arc::new(ConceptTable::new());
        let axiom = table.resolve(AXIOM_NAME);
        for _ in 0..3 {
            memory.superimpose(&axiom);
        }
        let cleanup = CleanupMemory::new(table, Arc::new(Quarantine::new()));
        RecallPipeline::new(memory, cleanup, axiom)
    }

    #[test]
    fn test_queue_evicts_oldest() {
        let q = ShortTermQueue::new(3);
        for name in ["A", "B", "C", "D"] {
            q.push(name);
        }
        assert_eq!(q.snapshot(), vec!["B", "C", "D"]);
        assert_eq!(q.capacity(), 3);
    }

    #[test]
    fn test_queue_refreshes_duplicates() {
        let q = ShortTermQueue::new(3);
        q.push("A");
        q.push("B");
        q.push("A");
        assert_eq!(q.snapshot(), vec!["B", "A"]);
    }

    #[test]
    fn test_queue_keeps_recently_used_name() {
        let q = ShortTermQueue::new(5);
        for name in ["A", "B", "C", "D", "E", "A", "F"] {
            q.push(name);
        }
        assert_eq!(q.snapshot(), vec!["C", "D", "E", "A", "F"]);
    }

    #[test]
    fn test_zero_capacity_queue() {
        let q = ShortTermQueue::new(0);
        q.push("A");
        assert!(q.is_empty());
    }

    #[test]
    fn test_take_is_single_shot() {
        let pipeline = centered_pipeline();
        pipeline.cleanup_memory().table().resolve("ORDER");

        let oracle = OracleCache::new(5, ORACLE_THRESHOLD);
        oracle.observe("ORDER");
        assert_eq!(oracle.run_cycle(&pipeline), 1);
        assert!(oracle.is_cached("ORDER"));

        assert_eq!(oracle.take("ORDER").as_ref().and_then(Recall::name), Some("ORDER"));
        assert_eq!(oracle.take("ORDER"), None);

        let stats = oracle.stats();
        assert_eq!(stats.precomputed, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_cycle_skips_unknown_quarantined_and_cached() {
        let pipeline = centered_pipeline();
        let cleanup = pipeline.cleanup_memory();
        cleanup.table().resolve("KNOWN");
        cleanup.table().resolve("HIDDEN");
        cleanup.quarantine().add("HIDDEN");

        let oracle = OracleCache::new(5, ORACLE_THRESHOLD);
        for name in ["KNOWN", "HIDDEN", "UNKNOWN"] {
            oracle.observe(name);
        }
        assert_eq!(oracle.run_cycle(&pipeline), 1);
        assert_eq!(oracle.cached_count(), 1);
        assert!(!cleanup.table().contains("UNKNOWN"));

        // Already cached: nothing new.
        assert_eq!(oracle.run_cycle(&pipeline), 0);
    }

    #[test]
    fn test_void_results_not_stored() {
        // Empty memory: the query is KNOWN ⊕ axiom, far from everything.
        let memory = Arc::new(SingularityMemory::new());
        let table = Arc::new(ConceptTable::new());
        let axiom = table.resolve(AXIOM_NAME);
        table.resolve("KNOWN");
        let pipeline = RecallPipeline::new(
            memory,
            CleanupMemory::new(table, Arc::new(Quarantine::new())),
            axiom,
        );

        let oracle = OracleCache::new(5, ORACLE_THRESHOLD);
        oracle.observe("KNOWN");
        assert_eq!(oracle.run_cycle(&pipeline), 0);
        assert!(!oracle.is_cached("KNOWN"));
    }

    #[test]
    fn test_purge_drops_entries_by_value() {
        let oracle = OracleCache::new(5, ORACLE_THRESHOLD);
        let hit = |name: &str| Recall::Match {
            name: name.into(),
            distance: 0,
        };
        oracle.prophecies.insert("ORDER".into(), hit(AXIOM_NAME));
        oracle.prophecies.insert("CHAOS".into(), hit("CHAOS"));
        oracle.prophecies.insert(AXIOM_NAME.into(), hit("UTOPIA"));

        assert_eq!(oracle.purge(AXIOM_NAME), 2);
        assert!(!oracle.is_cached("ORDER"));
        assert!(oracle.is_cached("CHAOS"));
        assert_eq!(oracle.cached_count(), 1);
    }

    #[test]
    fn test_clear() {
        let pipeline = centered_pipeline();
        pipeline.cleanup_memory().table().resolve("X");
        let oracle = OracleCache::new(5, ORACLE_THRESHOLD);
        oracle.observe("X");
        oracle.run_cycle(&pipeline);
        oracle.clear();
        assert_eq!(oracle.cached_count(), 0);
        assert!(oracle.queue().is_empty());
    }
}
