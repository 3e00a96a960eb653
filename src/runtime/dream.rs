//! Dreaming: synthesis of new concepts from existing ones.
//!
//! Each cycle draws three distinct concepts a, b, c and forms `b ⊕ a ⊕ c`.
//! If nothing in the table is already close to that vector it is registered
//! as a neologism `SYNTH_<hex>` and superimposed into memory, so a later
//! `analogy(a, b, c)` recalls it.
//!
//! The daemon thread only dreams while the organism is asleep; `sleep` and
//! `wake` flip that state at runtime.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use tracing::info;

use crate::config::AXIOM_NAME;
use crate::memory::binding::analogy_query;
use crate::memory::hypervector::name_seed;
use crate::memory::singularity::SingularityMemory;
use crate::runtime::pipeline::RecallPipeline;

pub struct DreamDaemon {
    memory: Arc<SingularityMemory>,
    pipeline: RecallPipeline,
    threshold: f64,
    rng: Mutex<StdRng>,
    dreaming: AtomicBool,
    cycles: AtomicU64,
    neologisms: AtomicU64,
}

impl DreamDaemon {
    /// `seed` fixes the sequence of draws; `None` seeds from the OS.
    /// `dreaming` is the initial sleep state.
    pub fn new(
        memory: Arc<SingularityMemory>,
        pipeline: RecallPipeline,
        threshold: f64,
        seed: Option<u64>,
        dreaming: bool,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            memory,
            pipeline,
            threshold,
            rng: Mutex::new(rng),
            dreaming: AtomicBool::new(dreaming),
            cycles: AtomicU64::new(0),
            neologisms: AtomicU64::new(0),
        }
    }

    /// Start dreaming. Returns `false` if already asleep.
    pub fn sleep(&self) -> bool {
        !self.dreaming.swap(true, Ordering::Relaxed)
    }

    /// Stop dreaming. Returns `false` if already awake.
    pub fn wake(&self) -> bool {
        self.dreaming.swap(false, Ordering::Relaxed)
    }

    pub fn is_dreaming(&self) -> bool {
        self.dreaming.load(Ordering::Relaxed)
    }

    /// Daemon entry point: dream once if asleep, otherwise do nothing.
    pub fn tick(&self) -> Option<String> {
        if !self.is_dreaming() {
            return None;
        }
        self.run_cycle()
    }

    /// One dream, regardless of the sleep state. Returns the name of the
    /// concept minted, if any.
    pub fn run_cycle(&self) -> Option<String> {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        let cleanup = self.pipeline.cleanup_memory();
        let candidates: Vec<String> = cleanup
            .table()
            .names()
            .into_iter()
            .filter(|n| n != AXIOM_NAME && !cleanup.quarantine().contains(n))
            .collect();
        if candidates.len() < 3 {
            return None;
        }

        let picks = index::sample(&mut *self.rng.lock(), candidates.len(), 3).into_vec();
        let (a, b, c) = (&candidates[picks[0]], &candidates[picks[1]], &candidates[picks[2]]);
        let table = cleanup.table();
        let (va, vb, vc) = (table.get(a)?, table.get(b)?, table.get(c)?);

        let synthesis = analogy_query(&va, &vb, &vc);
        if !self.pipeline.cleanup(&synthesis, self.threshold).is_void() {
            return None;
        }

        let name = format!("SYNTH_{:08X}", name_seed(&format!("{a}|{b}|{c}")) as u32);
        if !table.insert(&name, synthesis.clone()) {
            return None;
        }
        self.memory.superimpose(&synthesis);
        self.neologisms.fetch_add(1, Ordering::Relaxed);
        info!(%name, a = %a, b = %b, c = %c, "dream synthesized a concept");
        Some(name)
    }

    /// Dreams attempted, novel or not.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn neologisms(&self) -> u64 {
        self.neologisms.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DREAM_THRESHOLD;
    use crate::memory::cleanup::{CleanupMemory, Quarantine};
    use crate::memory::concept_table::ConceptTable;

    fn daemon(names: &[&str]) -> DreamDaemon {
        let memory = Arc::new(SingularityMemory::new());
        let table = Arc::new(ConceptTable::new());
        let axiom = table.resolve(AXIOM_NAME);
        for name in names {
            table.resolve(name);
        }
        let pipeline = RecallPipeline::new(
            Arc::clone(&memory),
            CleanupMemory::new(table, Arc::new(Quarantine::new())),
            axiom,
        );
        DreamDaemon::new(memory, pipeline, DREAM_THRESHOLD, Some(7), false)
    }

    #[test]
    fn test_needs_three_concepts() {
        let d = daemon(&["A", "B"]);
        assert_eq!(d.run_cycle(), None);
        assert_eq!(d.neologisms(), 0);
        assert_eq!(d.cycles(), 1);
    }

    #[test]
    fn test_tick_only_dreams_while_asleep() {
        let d = daemon(&["ORDER", "CHAOS", "UTOPIA"]);
        assert!(!d.is_dreaming());
        assert_eq!(d.tick(), None);
        assert_eq!(d.cycles(), 0);

        assert!(d.sleep());
        assert!(!d.sleep());
        assert!(d.tick().is_some(), "first dream is novel");
        assert_eq!(d.cycles(), 1);

        assert!(d.wake());
        assert!(!d.wake());
        assert_eq!(d.tick(), None);
        assert_eq!(d.cycles(), 1);
    }

    #[test]
    fn test_dream_mints_recallable_concept() {
        let d = daemon(&["ORDER", "CHAOS", "UTOPIA"]);
        let name = d.run_cycle().expect("first dream is novel");
        assert!(name.starts_with("SYNTH_"));
        assert_eq!(d.neologisms(), 1);

        let table = d.pipeline.cleanup_memory().table();
        let minted = table.get(&name).expect("registered");
        assert_eq!(
            d.pipeline.cleanup(&minted, DREAM_THRESHOLD).name(),
            Some(name.as_str())
        );
        assert!(d.memory.magnitude() > 0);
    }

    #[test]
    fn test_dream_skips_quarantined() {
        let d = daemon(&["A", "B", "C"]);
        d.pipeline.cleanup_memory().quarantine().add("C");
        assert_eq!(d.run_cycle(), None);
    }
}
