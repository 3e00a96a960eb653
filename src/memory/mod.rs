//! Hyperdimensional memory.
//!
//! - **16,384-bit binary hypervectors** as concept atoms
//! - **XOR binding** and **permutation** for structure
//! - **Per-bit vote counters** for superposition
//! - **Hamming cleanup** for content-addressable recall

pub mod binding;
pub mod cleanup;
pub mod concept_table;
pub mod hypervector;
pub mod singularity;
