//! Concept table: maps symbol names to their fixed hypervectors.
//!
//! Vectors are generated lazily on first use and never change afterwards.
//! The table is not persisted: it is regenerable from the names alone.
//!
//! Each name owns a once-cell. The map lock is held only long enough to
//! insert the empty cell, so generation for one name never blocks
//! generation for another, while concurrent first uses of the same name
//! still run the generator exactly once.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::memory::hypervector::HyperVector;

type Cell = Arc<OnceLock<HyperVector>>;

/// A concurrent, append-only registry of concept vectors.
#[derive(Default)]
pub struct ConceptTable {
    concepts: DashMap<String, Cell>,
}

impl ConceptTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, name: &str) -> Cell {
        if let Some(entry) = self.concepts.get(name) {
            return Arc::clone(entry.value());
        }
        let entry = self.concepts.entry(name.to_string()).or_default();
        Arc::clone(entry.value())
    }

    /// Get or generate the vector for `name`.
    pub fn resolve(&self, name: &str) -> HyperVector {
        self.cell(name)
            .get_or_init(|| HyperVector::generate(name))
            .clone()
    }

    /// Look up `name` without generating it.
    pub fn get(&self, name: &str) -> Option<HyperVector> {
        self.concepts
            .get(name)
            .and_then(|entry| entry.value().get().cloned())
    }

    /// Whether `name` has a vector.
    pub fn contains(&self, name: &str) -> bool {
        self.concepts
            .get(name)
            .map_or(false, |entry| entry.value().get().is_some())
    }

    /// Register an externally built vector. The first writer wins; returns
    /// `false` if the name already had a vector.
    pub fn insert(&self, name: &str, vector: HyperVector) -> bool {
        self.cell(name).set(vector).is_ok()
    }

    /// Visit every (name, vector) pair. Order is unspecified.
    pub fn for_each(&self, mut f: impl FnMut(&str, &HyperVector)) {
        for entry in self.concepts.iter() {
            if let Some(vector) = entry.value().get() {
                f(entry.key(), vector);
            }
        }
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.concepts.len());
        self.for_each(|name, _| names.push(name.to_string()));
        names.sort();
        names
    }

    /// Number of registered concepts.
    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Drop every concept.
    pub fn clear(&self) {
        self.concepts.clear();
    }

    /// Approximate memory usage in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.len() * HyperVector::zeros().size_bytes()
    }
}
