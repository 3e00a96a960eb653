//! Cleanup memory: nearest-neighbour recall over the concept table.
//!
//! Given a noisy or composite query, find the concept with the smallest
//! Hamming distance. A best match farther than `DIM * threshold_ratio` is
//! reported as [`Recall::Void`] rather than as a nearest name.
//!
//! The search is a linear scan. Equidistant candidates resolve to the
//! lexicographically smallest name, independent of map order.

use std::fmt;
use std::sync::Arc;

use dashmap::DashSet;
use serde::Serialize;

use crate::config::{max_distance, VOID_SENTINEL};
use crate::memory::concept_table::ConceptTable;
use crate::memory::hypervector::HyperVector;

/// Outcome of a cleanup recall.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Recall {
    /// A concept within the threshold.
    Match { name: String, distance: u32 },
    /// Nothing close enough: the query collapsed into noise.
    Void,
}

impl Recall {
    pub fn is_void(&self) -> bool {
        matches!(self, Recall::Void)
    }

    /// Matched concept name, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Recall::Match { name, .. } => Some(name),
            Recall::Void => None,
        }
    }
}

impl fmt::Display for Recall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recall::Match { name, .. } => f.write_str(name),
            Recall::Void => f.write_str(VOID_SENTINEL),
        }
    }
}

/// A scored candidate from [`CleanupMemory::nearest`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub name: String,
    pub distance: u32,
}

/// Names excluded from recall.
#[derive(Default)]
pub struct Quarantine {
    names: DashSet<String>,
}

impl Quarantine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the name was not already quarantined.
    pub fn add(&self, name: &str) -> bool {
        self.names.insert(name.to_string())
    }

    /// Returns `true` if the name was quarantined.
    pub fn release(&self, name: &str) -> bool {
        self.names.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Associative cleanup over a shared concept table.
#[derive(Clone)]
pub struct CleanupMemory {
    table: Arc<ConceptTable>,
    quarantine: Arc<Quarantine>,
}

impl CleanupMemory {
    pub fn new(table: Arc<ConceptTable>, quarantine: Arc<Quarantine>) -> Self {
        Self { table, quarantine }
    }

    /// Best match for `query`, or `Void` when the best distance exceeds
    /// `DIM * threshold_ratio`.
    pub fn recall(&self, query: &HyperVector, threshold_ratio: f64) -> Recall {
        let mut best: Option<(u32, String)> = None;

        self.table.for_each(|name, vector| {
            if self.quarantine.contains(name) {
                return;
            }
            let dist = query.hamming(vector);
            let better = match &best {
                None => true,
                Some((best_dist, best_name)) => {
                    dist < *best_dist || (dist == *best_dist && name < best_name.as_str())
                }
            };
            if better {
                best = Some((dist, name.to_string()));
            }
        });

        match best {
            Some((distance, name)) if distance as f64 <= max_distance(threshold_ratio) => {
                Recall::Match { name, distance }
            }
            _ => Recall::Void,
        }
    }

    /// The `k` closest non-quarantined concepts, nearest first.
    pub fn nearest(&self, query: &HyperVector, k: usize) -> Vec<Candidate> {
        let mut scored = Vec::with_capacity(self.table.len());
        self.table.for_each(|name, vector| {
            if !self.quarantine.contains(name) {
                scored.push(Candidate {
                    name: name.to_string(),
                    distance: query.hamming(vector),
                });
            }
        });

        scored.sort_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.name.cmp(&b.name)));
        scored.truncate(k);
        scored
    }

    pub fn table(&self) -> &Arc<ConceptTable> {
        &self.table
    }

    pub fn quarantine(&self) -> &Arc<Quarantine> {
        &self.quarantine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cleanup_with(names: &[&str]) -> CleanupMemory {
        let table = Arc::new(ConceptTable::new());
        for name in names {
            table.resolve(name);
        }
        CleanupMemory::new(table, Arc::new(Quarantine::new()))
    }

    #[test]
    fn test_exact_recall() {
        let cleanup = cleanup_with(&["X"]);
        let v = HyperVector::generate("X");
        assert_eq!(
            cleanup.recall(&v, 0.1),
            Recall::Match {
                name: "X".into(),
                distance: 0
            }
        );
    }

    #[test]
    fn test_random_query_is_void() {
        let cleanup = cleanup_with(&["X"]);
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..10 {
            let noise = HyperVector::random(&mut rng);
            assert!(cleanup.recall(&noise, 0.1).is_void());
        }
    }

    #[test]
    fn test_threshold_boundary() {
        let cleanup = cleanup_with(&["X"]);
        let mut v = HyperVector::generate("X");
        // Flip exactly 100 bits.
        for i in 0..100 {
            let bit = v.get_bit(i);
            v.set_bit(i, !bit);
        }
        let ratio = 100.0 / crate::config::DIM as f64;
        assert_eq!(cleanup.recall(&v, ratio).name(), Some("X"));
        assert!(cleanup.recall(&v, ratio * 0.99).is_void());
    }

    #[test]
    fn test_noisy_recall_picks_closest() {
        let cleanup = cleanup_with(&["ORDER", "CHAOS", "UTOPIA"]);
        let mut noisy = HyperVector::generate("CHAOS");
        for i in (0..crate::config::DIM).step_by(7) {
            let bit = noisy.get_bit(i);
            noisy.set_bit(i, !bit);
        }
        assert_eq!(cleanup.recall(&noisy, 0.45).name(), Some("CHAOS"));
    }

    #[test]
    fn test_empty_table_is_void() {
        let cleanup = cleanup_with(&[]);
        assert_eq!(cleanup.recall(&HyperVector::zeros(), 1.0), Recall::Void);
    }

    #[test]
    fn test_tie_breaks_lexicographically() {
        let table = Arc::new(ConceptTable::new());
        let v = HyperVector::generate("shared");
        table.insert("ZETA", v.clone());
        table.insert("ALPHA", v.clone());
        table.insert("MU", v.clone());
        let cleanup = CleanupMemory::new(table, Arc::new(Quarantine::new()));
        assert_eq!(cleanup.recall(&v, 0.1).name(), Some("ALPHA"));
    }

    #[test]
    fn test_quarantine_excludes() {
        let cleanup = cleanup_with(&["X", "Y"]);
        let v = HyperVector::generate("X");
        assert!(cleanup.quarantine().add("X"));
        assert!(cleanup.recall(&v, 0.1).is_void());
        assert!(cleanup.quarantine().release("X"));
        assert_eq!(cleanup.recall(&v, 0.1).name(), Some("X"));
    }

    #[test]
    fn test_nearest_ordering() {
        let cleanup = cleanup_with(&["A", "B", "C", "D"]);
        let q = HyperVector::generate("C");
        let top = cleanup.nearest(&q, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "C");
        assert_eq!(top[0].distance, 0);
        assert!(top[1].distance > 0);
    }

    #[test]
    fn test_display_void_sentinel() {
        assert_eq!(Recall::Void.to_string(), VOID_SENTINEL);
        let m = Recall::Match {
            name: "ORDER".into(),
            distance: 3,
        };
        assert_eq!(m.to_string(), "ORDER");
    }
}
