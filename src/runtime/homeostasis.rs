//! Homeostasis: entropy monitoring and corrective decay.
//!
//! Each cycle measures how much of the counters' capacity is in use
//! relative to the number of known concepts. When that entropy runs above
//! tolerance, a correction pulse halves every counter and reinforces the
//! axiom once. Every cycle ends with a flush, which bounds how stale the
//! region file can be.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{orthogonality_bound, CORRECTION_RETENTION, DIM};
use crate::memory::concept_table::ConceptTable;
use crate::memory::hypervector::HyperVector;
use crate::memory::singularity::SingularityMemory;
use crate::persistence::PersistenceRegion;

/// Homeostasis states. Correcting lasts for a single pulse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum HomeostasisState {
    Stable,
    Correcting,
}

/// Rolling window of entropy readings.
#[derive(Debug)]
pub struct EntropyTracker {
    samples: VecDeque<f64>,
    max_samples: usize,
}

impl EntropyTracker {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    pub fn record(&mut self, value: f64) {
        if self.samples.len() >= self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    /// Mean over the window.
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Outcome of one homeostasis cycle.
#[derive(Clone, Debug, Serialize)]
pub struct CycleReport {
    pub entropy: f64,
    pub corrected: bool,
}

/// A snapshot for status reporting.
#[derive(Clone, Debug, Serialize)]
pub struct HomeostasisReport {
    pub state: HomeostasisState,
    pub corrections: u64,
    pub latest_entropy: Option<f64>,
    pub mean_entropy: f64,
}

pub struct HomeostasisDaemon {
    memory: Arc<SingularityMemory>,
    table: Arc<ConceptTable>,
    region: Arc<PersistenceRegion>,
    axiom: HyperVector,
    tolerance: f64,
    state: Mutex<HomeostasisState>,
    history: Mutex<EntropyTracker>,
    corrections: AtomicU64,
}

impl HomeostasisDaemon {
    pub fn new(
        memory: Arc<SingularityMemory>,
        table: Arc<ConceptTable>,
        region: Arc<PersistenceRegion>,
        axiom: HyperVector,
        tolerance: f64,
    ) -> Self {
        Self {
            memory,
            table,
            region,
            axiom,
            tolerance,
            state: Mutex::new(HomeostasisState::Stable),
            history: Mutex::new(EntropyTracker::new(64)),
            corrections: AtomicU64::new(0),
        }
    }

    /// `1 − Σ|c| / (DIM · max(1, |concepts|))`.
    ///
    /// Not clamped: a memory dominated by repeated imprints reads negative.
    pub fn entropy(&self) -> f64 {
        let concepts = self.table.len().max(1) as f64;
        1.0 - self.memory.magnitude() as f64 / (DIM as f64 * concepts)
    }

    /// Measure, correct if needed, flush.
    pub fn run_cycle(&self) -> anyhow::Result<CycleReport> {
        let entropy = self.entropy();
        self.history.lock().record(entropy);

        let corrected = entropy > self.tolerance;
        if corrected {
            self.correct()?;
            info!(
                entropy,
                tolerance = self.tolerance,
                "entropy above tolerance, correction applied"
            );
        }

        self.region
            .flush(&self.memory)
            .context("homeostasis flush failed")?;
        debug!(entropy, corrected, "homeostasis cycle");

        Ok(CycleReport { entropy, corrected })
    }

    /// One correction pulse: decay, then reinforce the axiom.
    pub fn correct(&self) -> anyhow::Result<()> {
        *self.state.lock() = HomeostasisState::Correcting;
        let result = self.memory.decay(CORRECTION_RETENTION);
        if result.is_ok() {
            self.memory.superimpose(&self.axiom);
            self.corrections.fetch_add(1, Ordering::Relaxed);
        }
        *self.state.lock() = HomeostasisState::Stable;
        result.context("correction decay rejected")
    }

    /// Whether `v` lies farther from the axiom than `DIM * ORTHOGONALITY_RATIO`.
    pub fn is_orthogonal_to_axiom(&self, v: &HyperVector) -> bool {
        v.hamming(&self.axiom) as f64 > orthogonality_bound()
    }

    pub fn state(&self) -> HomeostasisState {
        *self.state.lock()
    }

    pub fn corrections(&self) -> u64 {
        self.corrections.load(Ordering::Relaxed)
    }

    pub fn report(&self) -> HomeostasisReport {
        let history = self.history.lock();
        HomeostasisReport {
            state: self.state(),
            corrections: self.corrections(),
            latest_entropy: history.latest(),
            mean_entropy: history.mean(),
        }
    }
}
