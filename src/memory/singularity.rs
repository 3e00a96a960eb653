//! Singularity memory: one shared array of per-bit vote counters.
//!
//! Every superimposed vector adds +1 to the counter of each 1-bit and −1 to
//! the counter of each 0-bit. Collapsing takes the sign of each counter.
//! Updates are atomic per counter with no global lock. Concurrent
//! superimpositions are unordered; they commute.

use std::sync::atomic::{AtomicI32, Ordering};

use rayon::prelude::*;

use crate::config::{DIM, WORD_BITS};
use crate::error::MemoryError;
use crate::memory::hypervector::HyperVector;

/// The shared superposition memory.
pub struct SingularityMemory {
    counters: Vec<AtomicI32>,
}

impl SingularityMemory {
    /// Create a zeroed memory with `DIM` counters.
    pub fn new() -> Self {
        Self {
            counters: (0..DIM).map(|_| AtomicI32::new(0)).collect(),
        }
    }

    /// Add one vote per bit of `v`.
    pub fn superimpose(&self, v: &HyperVector) {
        self.counters
            .par_chunks(WORD_BITS)
            .zip(v.words().par_iter())
            .for_each(|(chunk, &word)| {
                for (bit, counter) in chunk.iter().enumerate() {
                    if (word >> bit) & 1 == 1 {
                        counter.fetch_add(1, Ordering::Relaxed);
                    } else {
                        counter.fetch_sub(1, Ordering::Relaxed);
                    }
                }
            });
    }

    /// Majority sign per bit. Ties (counter == 0) collapse to 0.
    ///
    /// Reads are atomic per counter, not a snapshot across all of them.
    pub fn collapse(&self) -> HyperVector {
        let words = self
            .counters
            .par_chunks(WORD_BITS)
            .map(|chunk| {
                chunk.iter().enumerate().fold(0u64, |word, (bit, counter)| {
                    if counter.load(Ordering::Relaxed) > 0 {
                        word | (1u64 << bit)
                    } else {
                        word
                    }
                })
            })
            .collect();
        HyperVector::from_words(words)
    }

    /// Multiply every counter by `retention` (truncating toward zero).
    pub fn decay(&self, retention: f64) -> Result<(), MemoryError> {
        if !(retention > 0.0 && retention < 1.0) {
            return Err(MemoryError::InvalidRetention(retention));
        }
        self.counters.par_iter().for_each(|counter| {
            // The closure never returns None, so the update always succeeds.
            let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
                Some((c as f64 * retention) as i32)
            });
        });
        Ok(())
    }

    /// Σ |counter|.
    pub fn magnitude(&self) -> u64 {
        self.counters
            .par_iter()
            .map(|c| c.load(Ordering::Relaxed).unsigned_abs() as u64)
            .sum()
    }

    /// Fraction of counters that currently collapse to 1.
    pub fn saturation(&self) -> f64 {
        let positive = self
            .counters
            .par_iter()
            .filter(|c| c.load(Ordering::Relaxed) > 0)
            .count();
        positive as f64 / DIM as f64
    }

    /// Read a single counter.
    pub fn counter(&self, i: usize) -> i32 {
        self.counters[i].load(Ordering::Relaxed)
    }

    /// Copy out all counters.
    pub fn snapshot(&self) -> Vec<i32> {
        self.counters
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .collect()
    }

    /// Overwrite all counters from a snapshot.
    pub fn restore(&self, values: &[i32]) -> Result<(), MemoryError> {
        if values.len() != DIM {
            return Err(MemoryError::SnapshotLength {
                expected: DIM,
                actual: values.len(),
            });
        }
        for (counter, &v) in self.counters.iter().zip(values) {
            counter.store(v, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Zero every counter.
    pub fn reset(&self) {
        for counter in &self.counters {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for SingularityMemory {
    fn default() -> Self {
        Self::new()
    }
}
