//! Binding encoders: structured traces built from concept vectors.
//!
//! - **Associations**: `key ⊕ value`, recovered by binding the trace with the key
//! - **Sequences**: each item permuted by its position, superposed
//! - **Analogies**: "a is to b as c is to ?" becomes `b ⊕ a ⊕ c`
//!
//! A [`MemoryTrace`] keeps its own vote counters so it can be extended one
//! binding at a time without re-voting over every earlier binding.

use crate::memory::hypervector::HyperVector;
use crate::memory::singularity::SingularityMemory;

/// Vector stored for an item at sequence `position`.
pub fn encode_position(item: &HyperVector, position: usize) -> HyperVector {
    item.permute(position)
}

/// Undo [`encode_position`].
pub fn decode_position(trace: &HyperVector, position: usize) -> HyperVector {
    trace.inverse_permute(position)
}

/// Vector stored for a key/value pair.
pub fn encode_association(key: &HyperVector, value: &HyperVector) -> HyperVector {
    key.bind(value)
}

/// Query vector for "a is to b as c is to ?".
pub fn analogy_query(a: &HyperVector, b: &HyperVector, c: &HyperVector) -> HyperVector {
    b.bind(a).bind(c)
}

/// A superposition of bindings with its own counters.
#[derive(Default)]
pub struct MemoryTrace {
    counters: SingularityMemory,
    binding_count: usize,
}

impl MemoryTrace {
    /// Create an empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Superimpose an already encoded vector.
    pub fn add(&mut self, encoded: &HyperVector) {
        self.counters.superimpose(encoded);
        self.binding_count += 1;
    }

    /// Add an item at a sequence position.
    pub fn add_at(&mut self, item: &HyperVector, position: usize) {
        self.add(&encode_position(item, position));
    }

    /// Majority vote over every binding so far.
    pub fn vector(&self) -> HyperVector {
        self.counters.collapse()
    }

    /// Approximate value bound to `key`. XOR is its own inverse.
    pub fn query(&self, key: &HyperVector) -> HyperVector {
        self.vector().bind(key)
    }

    /// Approximate item stored at `position`.
    pub fn item_at(&self, position: usize) -> HyperVector {
        decode_position(&self.vector(), position)
    }

    pub fn binding_count(&self) -> usize {
        self.binding_count
    }

    pub fn is_empty(&self) -> bool {
        self.binding_count == 0
    }

    /// Forget every binding.
    pub fn clear(&mut self) {
        self.counters.reset();
        self.binding_count = 0;
    }
}
