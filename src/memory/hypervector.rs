//! Core hypervector type and the vector-space algebra.
//!
//! Each hypervector is a 16,384-bit binary vector stored as 256 packed
//! 64-bit words. Bit `i` lives at `(words[i / 64] >> (i % 64)) & 1`.
//! All operations are pure and deterministic given their inputs.

use std::fmt;
use std::hash::Hasher;

use fnv::FnvHasher;
use rand::Rng;

use crate::config::{DIM, WORDS, WORD_BITS};

/// SplitMix64 stream increment (golden-ratio constant).
const SPLITMIX_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// SplitMix64 output mixer.
#[inline]
fn splitmix_mix(mut x: u64) -> u64 {
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Stable 64-bit seed for a symbol name.
pub fn name_seed(name: &str) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(name.as_bytes());
    splitmix_mix(hasher.finish())
}

/// A single concept hypervector: 16,384 binary dimensions.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct HyperVector {
    words: Vec<u64>,
}

impl HyperVector {
    /// Create a zero vector.
    pub fn zeros() -> Self {
        Self {
            words: vec![0u64; WORDS],
        }
    }

    /// Expand a 64-bit seed into a full vector with a SplitMix64 stream.
    pub fn from_seed(seed: u64) -> Self {
        let mut state = seed;
        let words = (0..WORDS)
            .map(|_| {
                state = state.wrapping_add(SPLITMIX_GAMMA);
                splitmix_mix(state)
            })
            .collect();
        Self { words }
    }

    /// Deterministic vector for a symbol name.
    ///
    /// The same name always yields a bit-identical vector, across runs and
    /// platforms; distinct names land ~`DIM / 2` bits apart.
    pub fn generate(name: &str) -> Self {
        Self::from_seed(name_seed(name))
    }

    /// Random vector (each bit iid Bernoulli(0.5)).
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            words: (0..WORDS).map(|_| rng.gen::<u64>()).collect(),
        }
    }

    /// Build from packed words (must be exactly `WORDS` long).
    pub fn from_words(words: Vec<u64>) -> Self {
        assert_eq!(words.len(), WORDS, "hypervector word count");
        Self { words }
    }

    /// Packed words.
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Get bit at position i.
    pub fn get_bit(&self, i: usize) -> bool {
        assert!(i < DIM);
        (self.words[i / WORD_BITS] >> (i % WORD_BITS)) & 1 == 1
    }

    /// Set bit at position i.
    pub fn set_bit(&mut self, i: usize, val: bool) {
        assert!(i < DIM);
        let mask = 1u64 << (i % WORD_BITS);
        if val {
            self.words[i / WORD_BITS] |= mask;
        } else {
            self.words[i / WORD_BITS] &= !mask;
        }
    }

    fn zip_with(&self, other: &HyperVector, f: impl Fn(u64, u64) -> u64) -> HyperVector {
        let words = self
            .words
            .iter()
            .zip(other.words.iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        HyperVector { words }
    }

    /// XOR binding. Self-inverse: `a.bind(b).bind(b) == a`.
    pub fn bind(&self, other: &HyperVector) -> HyperVector {
        self.zip_with(other, |a, b| a ^ b)
    }

    /// Bundling: `(a AND b) OR (a XOR b)`.
    ///
    /// Truth table 00→0, 01→1, 10→1, 11→1. This is a bundle biased toward
    /// 1, not a majority vote; superposition lives in the counter memory.
    pub fn bundle(&self, other: &HyperVector) -> HyperVector {
        self.zip_with(other, |a, b| (a & b) | (a ^ b))
    }

    /// NOT (flip all bits).
    pub fn not(&self) -> HyperVector {
        HyperVector {
            words: self.words.iter().map(|&w| !w).collect(),
        }
    }

    /// Hamming distance: popcount of the binding.
    pub fn hamming(&self, other: &HyperVector) -> u32 {
        self.words
            .iter()
            .zip(other.words.iter())
            .map(|(&a, &b)| (a ^ b).count_ones())
            .sum()
    }

    /// Cosine-like similarity in Hamming space: 1 - 2·d(x,y)/D.
    /// Range: [-1, 1]. 1 = identical, 0 = orthogonal, -1 = complement.
    pub fn similarity(&self, other: &HyperVector) -> f64 {
        1.0 - 2.0 * self.hamming(other) as f64 / DIM as f64
    }

    /// Population count (number of 1-bits).
    pub fn popcount(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// Density: fraction of bits that are 1.
    pub fn density(&self) -> f64 {
        self.popcount() as f64 / DIM as f64
    }

    /// Cyclic rotation by `k` bit positions: bit `i` moves to `(i + k) mod D`.
    ///
    /// Used to encode sequence position or role.
    pub fn permute(&self, k: usize) -> HyperVector {
        let k = k % DIM;
        if k == 0 {
            return self.clone();
        }
        let word_shift = k / WORD_BITS;
        let bit_shift = (k % WORD_BITS) as u32;

        let mut rotated = vec![0u64; WORDS];
        for (j, &w) in self.words.iter().enumerate() {
            rotated[(j + word_shift) % WORDS] = w;
        }
        if bit_shift == 0 {
            return HyperVector { words: rotated };
        }

        let words = (0..WORDS)
            .map(|j| {
                let carry = rotated[(j + WORDS - 1) % WORDS] >> (WORD_BITS as u32 - bit_shift);
                (rotated[j] << bit_shift) | carry
            })
            .collect();
        HyperVector { words }
    }

    /// Inverse rotation: `v.permute(k).inverse_permute(k) == v`.
    pub fn inverse_permute(&self, k: usize) -> HyperVector {
        self.permute(DIM - k % DIM)
    }

    /// Memory footprint in bytes.
    pub fn size_bytes(&self) -> usize {
        self.words.len() * std::mem::size_of::<u64>()
    }
}

impl fmt::Debug for HyperVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HyperVector(dim={}, popcount={}, density={:.3})",
            DIM,
            self.popcount(),
            self.density()
        )
    }
}
