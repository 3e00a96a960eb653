//! # SINGULARITY
//!
//! A persistent **hyperdimensional associative memory**. Symbols are mapped to
//! 16,384-bit binary hypervectors, combined with XOR binding and permutation,
//! superimposed into one shared counter array, mirrored to a memory-mapped
//! file, and recalled by nearest-neighbour cleanup under Hamming distance.
//!
//! ## Components
//!
//! 1. **Hypervector algebra**: generate, permute, bind, bundle, distance
//! 2. **Concept table**: deterministic name → vector registry
//! 3. **Singularity memory**: lock-free per-bit vote counters
//! 4. **Persistence region**: orthogonal persistence via `mmap`
//! 5. **Cleanup memory**: thresholded nearest-neighbour recall
//! 6. **Homeostasis**: entropy-driven decay and axiom reinforcement
//! 7. **Oracle**: speculative, single-shot recall precomputation
//! 8. **Binding encoders**: associations, sequences, analogies
//! 9. **Dreaming**: synthesis of new concepts while asleep
//! 10. **DNA transcription**: concept vectors exported as FASTA plasmids
//!
//! The [`runtime::organism::Organism`] ties them together and owns the
//! background daemons.

pub mod error;
pub mod memory;
pub mod persistence;
pub mod runtime;

pub use error::{Error, Result};

/// Process-wide constants.
pub mod config {
    /// Hypervector dimension in bits.
    pub const DIM: usize = 16384;

    /// Bits per storage word.
    pub const WORD_BITS: usize = 64;

    /// Number of 64-bit words per hypervector.
    pub const WORDS: usize = DIM / WORD_BITS; // 256

    /// Width of one persisted counter in bytes (signed 32-bit).
    pub const COUNTER_BYTES: usize = 4;

    /// Exact size of the persistence region. Changing `DIM` invalidates
    /// every existing region file.
    pub const REGION_BYTES: usize = DIM * COUNTER_BYTES;

    /// Default backing file for the persistence region.
    pub const DEFAULT_REGION_FILE: &str = "aeon_genesis.sys";

    /// Reserved name of the prime axiom vector.
    pub const AXIOM_NAME: &str = "PRESERVE_AND_EVOLVE_BENEVOLENTLY";

    /// Rendered form of a failed recall.
    pub const VOID_SENTINEL: &str = "[[ MATHEMATICAL VOID / NOISE ]]";

    /// Content farther than this fraction of `DIM` from the axiom is
    /// considered dissonant.
    pub const ORTHOGONALITY_RATIO: f64 = 0.495;

    /// Cleanup threshold used by synchronous divination.
    pub const DIVINE_THRESHOLD: f64 = 0.46;

    /// Cleanup threshold used by the oracle daemon.
    pub const ORACLE_THRESHOLD: f64 = 0.45;

    /// Cleanup threshold below which a dream synthesis is considered novel.
    pub const DREAM_THRESHOLD: f64 = 0.40;

    /// Entropy above which homeostasis applies a correction pulse.
    pub const ENTROPY_TOLERANCE: f64 = 0.85;

    /// Retention factor applied by a correction pulse.
    pub const CORRECTION_RETENTION: f64 = 0.5;

    /// Homeostasis period.
    pub const HOMEOSTASIS_INTERVAL_MS: u64 = 8000;

    /// Oracle period.
    pub const ORACLE_INTERVAL_MS: u64 = 100;

    /// Dream period.
    pub const DREAM_INTERVAL_MS: u64 = 2000;

    /// Short-term queue capacity.
    pub const SHORT_TERM_CAPACITY: usize = 5;

    /// Times the axiom is imprinted into a freshly created region.
    pub const GENESIS_IMPRINTS: usize = 50;

    /// Concepts resolved at every boot.
    pub const SEED_CONCEPTS: [&str; 3] = ["ORDER", "CHAOS", "UTOPIA"];

    /// Upper bound on the dissonance distance, in bits.
    pub fn orthogonality_bound() -> f64 {
        DIM as f64 * ORTHOGONALITY_RATIO
    }

    /// Maximum accepted cleanup distance, in bits, for a threshold ratio.
    pub fn max_distance(threshold_ratio: f64) -> f64 {
        DIM as f64 * threshold_ratio
    }
}
