//! Recall pipeline: name in, recalled concept out.
//!
//! `query = collapse() ⊕ vector(name) ⊕ axiom`, then cleanup against the
//! concept table. Shared by synchronous divination and the oracle daemon so
//! both compute exactly the same result.

use std::sync::Arc;

use crate::memory::cleanup::{CleanupMemory, Recall};
use crate::memory::hypervector::HyperVector;
use crate::memory::singularity::SingularityMemory;

#[derive(Clone)]
pub struct RecallPipeline {
    memory: Arc<SingularityMemory>,
    cleanup: CleanupMemory,
    axiom: HyperVector,
}

impl RecallPipeline {
    pub fn new(memory: Arc<SingularityMemory>, cleanup: CleanupMemory, axiom: HyperVector) -> Self {
        Self {
            memory,
            cleanup,
            axiom,
        }
    }

    /// Query vector for `name`, or `None` if the name was never registered.
    /// Lookup never generates a vector.
    pub fn query(&self, name: &str) -> Option<HyperVector> {
        let key = self.cleanup.table().get(name)?;
        Some(self.memory.collapse().bind(&key).bind(&self.axiom))
    }

    /// Full recall for `name` at `threshold_ratio`. Unknown names are `Void`.
    pub fn recall(&self, name: &str, threshold_ratio: f64) -> Recall {
        match self.query(name) {
            Some(query) => self.cleanup.recall(&query, threshold_ratio),
            None => Recall::Void,
        }
    }

    /// Cleanup of an arbitrary vector.
    pub fn cleanup(&self, query: &HyperVector, threshold_ratio: f64) -> Recall {
        self.cleanup.recall(query, threshold_ratio)
    }

    pub fn cleanup_memory(&self) -> &CleanupMemory {
        &self.cleanup
    }

    pub fn axiom(&self) -> &HyperVector {
        &self.axiom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AXIOM_NAME, DIVINE_THRESHOLD};
    use crate::memory::cleanup::Quarantine;
    use crate::memory::concept_table::ConceptTable;

    fn pipeline() -> (RecallPipeline, Arc<SingularityMemory>) {
        let memory = Arc::new(SingularityMemory::new());
        let table = Arc::new(ConceptTable::new());
        let axiom = table.resolve(AXIOM_NAME);
        let cleanup = CleanupMemory::new(table, Arc::new(Quarantine::new()));
        (RecallPipeline::new(Arc::clone(&memory), cleanup, axiom), memory)
    }

    #[test]
    fn test_unknown_name_is_void_and_not_minted() {
        let (p, _) = pipeline();
        assert!(p.query("GHOST").is_none());
        assert!(p.recall("GHOST", 1.0).is_void());
        assert!(!p.cleanup_memory().table().contains("GHOST"));
    }

    #[test]
    fn test_axiom_centered_memory_recovers_name() {
        let (p, memory) = pipeline();
        for _ in 0..5 {
            memory.superimpose(p.axiom());
        }
        p.cleanup_memory().table().resolve("ORDER");
        p.cleanup_memory().table().resolve("CHAOS");
        assert_eq!(p.recall("ORDER", DIVINE_THRESHOLD).name(), Some("ORDER"));
        assert_eq!(p.recall("CHAOS", DIVINE_THRESHOLD).name(), Some("CHAOS"));
    }

    #[test]
    fn test_empty_memory_query() {
        let (p, _) = pipeline();
        p.cleanup_memory().table().resolve("X");
        // Collapse of an empty memory is all zeros, so the query is X ⊕ axiom.
        let q = p.query("X").expect("registered");
        assert_eq!(q, HyperVector::generate("X").bind(p.axiom()));
    }
}
