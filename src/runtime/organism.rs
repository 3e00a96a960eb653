//! The organism: owner of every shared component and the public surface.
//!
//! Ingestion (`assimilate*`, `associate`) superimposes into the singularity;
//! queries (`divine`, `recall_association`, `analogy`, `unroll_sequence`)
//! never mutate it. Background daemons are started separately with
//! [`Organism::start_daemons`] and stopped by [`Organism::shutdown`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config;
use crate::memory::binding::{analogy_query, encode_association, MemoryTrace};
use crate::error::MemoryError;
use crate::memory::cleanup::{Candidate, CleanupMemory, Quarantine, Recall};
use crate::memory::concept_table::ConceptTable;
use crate::memory::hypervector::HyperVector;
use crate::memory::singularity::SingularityMemory;
use crate::persistence::{transcribe, write_plasmid, PersistenceRegion};
use crate::runtime::daemon::Daemon;
use crate::runtime::dream::DreamDaemon;
use crate::runtime::homeostasis::{HomeostasisDaemon, HomeostasisReport};
use crate::runtime::oracle::{OracleCache, OracleStats};
use crate::runtime::pipeline::RecallPipeline;

/// Which background daemons [`Organism::start_daemons`] spawns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSet {
    pub homeostasis: bool,
    pub oracle: bool,
    pub dream: bool,
}

impl Default for DaemonSet {
    fn default() -> Self {
        Self {
            homeostasis: true,
            oracle: true,
            dream: true,
        }
    }
}

impl DaemonSet {
    /// No daemons at all.
    pub fn none() -> Self {
        Self {
            homeostasis: false,
            oracle: false,
            dream: false,
        }
    }
}

/// Organism configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganismConfig {
    /// Backing file of the persistence region.
    pub region_path: PathBuf,

    pub homeostasis_interval_ms: u64,
    pub oracle_interval_ms: u64,
    pub dream_interval_ms: u64,

    /// Cleanup threshold for synchronous queries, as a fraction of `DIM`.
    pub divine_threshold: f64,

    /// Cleanup threshold for oracle precomputation.
    pub oracle_threshold: f64,

    /// Cleanup threshold under which a dream counts as novel.
    pub dream_threshold: f64,

    /// Entropy above which homeostasis corrects.
    pub entropy_tolerance: f64,

    pub short_term_capacity: usize,

    /// Reject content orthogonal to the axiom at ingestion.
    pub enforce_admission: bool,

    /// Axiom imprints applied to a freshly created region.
    pub genesis_imprints: usize,

    /// Concepts resolved at every boot.
    pub seed_concepts: Vec<String>,

    pub daemons: DaemonSet,

    /// Whether the dream daemon dreams from boot, before any `sleep`.
    pub start_dreaming: bool,

    /// Fixed seed for dream draws (reproducible runs).
    pub dream_seed: Option<u64>,
}

impl Default for OrganismConfig {
    fn default() -> Self {
        Self {
            region_path: PathBuf::from(config::DEFAULT_REGION_FILE),
            homeostasis_interval_ms: config::HOMEOSTASIS_INTERVAL_MS,
            oracle_interval_ms: config::ORACLE_INTERVAL_MS,
            dream_interval_ms: config::DREAM_INTERVAL_MS,
            divine_threshold: config::DIVINE_THRESHOLD,
            oracle_threshold: config::ORACLE_THRESHOLD,
            dream_threshold: config::DREAM_THRESHOLD,
            entropy_tolerance: config::ENTROPY_TOLERANCE,
            short_term_capacity: config::SHORT_TERM_CAPACITY,
            enforce_admission: false,
            genesis_imprints: config::GENESIS_IMPRINTS,
            seed_concepts: config::SEED_CONCEPTS.iter().map(|s| s.to_string()).collect(),
            daemons: DaemonSet::default(),
            start_dreaming: false,
            dream_seed: None,
        }
    }
}

/// Outcome of an ingestion call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Admission {
    Admitted,
    /// Empty name, or dissonant with the axiom while admission is enforced.
    Rejected,
}

/// Lifetime activity counters. They restart at zero with the process.
#[derive(Debug, Default)]
struct Activity {
    assimilations: AtomicU64,
    words_absorbed: AtomicU64,
    axiom_violations: AtomicU64,
    divinations: AtomicU64,
    transcriptions: AtomicU64,
    base_pairs: AtomicU64,
}

/// Snapshot of the activity counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ActivityReport {
    /// Ingestion calls; a sequence counts once.
    pub assimilations: u64,
    /// Words superimposed across all ingestion calls.
    pub words_absorbed: u64,
    /// Content rejected by the admission policy.
    pub axiom_violations: u64,
    pub divinations: u64,
    pub dream_cycles: u64,
    pub transcriptions: u64,
    pub base_pairs: u64,
    pub boot_time_ms: u64,
}

/// Output of [`Organism::transcribe`].
#[derive(Clone, Debug)]
pub struct Transcription {
    pub name: String,
    pub dna: String,
    pub path: PathBuf,
}

/// Point-in-time view of the organism.
#[derive(Clone, Debug, Serialize)]
pub struct OrganismStatus {
    pub region_path: PathBuf,
    pub born_this_boot: bool,
    pub concepts: usize,
    pub concept_bytes: usize,
    pub quarantined: usize,
    pub magnitude: u64,
    pub saturation: f64,
    pub disk_saturation: f64,
    pub entropy: f64,
    pub homeostasis: HomeostasisReport,
    pub oracle: OracleStats,
    pub short_term: Vec<String>,
    pub cached_prophecies: usize,
    pub neologisms: u64,
    pub dreaming: bool,
    pub associations: usize,
    pub episode_length: usize,
    pub activity: ActivityReport,
    pub daemons: Vec<String>,
}

pub struct Organism {
    config: OrganismConfig,
    table: Arc<ConceptTable>,
    memory: Arc<SingularityMemory>,
    region: Arc<PersistenceRegion>,
    pipeline: RecallPipeline,
    homeostasis: Arc<HomeostasisDaemon>,
    oracle: Arc<OracleCache>,
    dream: Arc<DreamDaemon>,
    associations: Mutex<MemoryTrace>,
    episode: Mutex<MemoryTrace>,
    shutdown: Arc<AtomicBool>,
    daemons: Mutex<Vec<Daemon>>,
    activity: Activity,
    boot_time_ms: u64,
    born: bool,
}

impl Organism {
    /// Map the region, restore or imprint memory, resolve the axiom and seeds.
    ///
    /// Fails if the region cannot be opened or mapped. No daemons are started.
    pub fn boot(config: OrganismConfig) -> crate::Result<Self> {
        let started = Instant::now();
        let memory = Arc::new(SingularityMemory::new());
        let boot = PersistenceRegion::bootstrap(&config.region_path, &memory)?;
        let region = Arc::new(boot.region);

        let table = Arc::new(ConceptTable::new());
        let axiom = table.resolve(config::AXIOM_NAME);
        let quarantine = Arc::new(Quarantine::new());
        let pipeline = RecallPipeline::new(
            Arc::clone(&memory),
            CleanupMemory::new(Arc::clone(&table), quarantine),
            axiom.clone(),
        );

        let homeostasis = Arc::new(HomeostasisDaemon::new(
            Arc::clone(&memory),
            Arc::clone(&table),
            Arc::clone(&region),
            axiom,
            config.entropy_tolerance,
        ));
        let oracle = Arc::new(OracleCache::new(
            config.short_term_capacity,
            config.oracle_threshold,
        ));
        let dream = Arc::new(DreamDaemon::new(
            Arc::clone(&memory),
            pipeline.clone(),
            config.dream_threshold,
            config.dream_seed,
            config.start_dreaming,
        ));

        let mut organism = Self {
            config,
            table,
            memory,
            region,
            pipeline,
            homeostasis,
            oracle,
            dream,
            associations: Mutex::new(MemoryTrace::new()),
            episode: Mutex::new(MemoryTrace::new()),
            shutdown: Arc::new(AtomicBool::new(false)),
            daemons: Mutex::new(Vec::new()),
            activity: Activity::default(),
            boot_time_ms: 0,
            born: boot.is_new,
        };

        organism.seed();
        if organism.born {
            organism.imprint_genesis()?;
        }
        organism.boot_time_ms = started.elapsed().as_millis() as u64;

        info!(
            region = %organism.region.path().display(),
            born = organism.born,
            concepts = organism.table.len(),
            boot_time_ms = organism.boot_time_ms,
            "organism booted"
        );
        Ok(organism)
    }

    fn seed(&self) {
        self.table.resolve(config::AXIOM_NAME);
        for name in &self.config.seed_concepts {
            self.table.resolve(&normalize(name));
        }
    }

    fn imprint_genesis(&self) -> crate::Result<()> {
        for _ in 0..self.config.genesis_imprints {
            self.memory.superimpose(self.pipeline.axiom());
        }
        self.region.flush(&self.memory)?;
        info!(imprints = self.config.genesis_imprints, "genesis imprint applied");
        Ok(())
    }

    /// Spawn the daemons selected in the config. Calling twice spawns twice.
    /// Daemons may be started again after [`Organism::shutdown`].
    pub fn start_daemons(&self) -> anyhow::Result<()> {
        let set = self.config.daemons.clone();
        let mut daemons = self.daemons.lock();
        if daemons.is_empty() {
            self.shutdown.store(false, Ordering::Relaxed);
        }

        if set.homeostasis {
            let homeostasis = Arc::clone(&self.homeostasis);
            daemons.push(Daemon::spawn(
                "homeostasis",
                Duration::from_millis(self.config.homeostasis_interval_ms),
                Arc::clone(&self.shutdown),
                move || homeostasis.run_cycle().map(|_| ()),
            )?);
        }

        if set.oracle {
            let oracle = Arc::clone(&self.oracle);
            let pipeline = self.pipeline.clone();
            daemons.push(Daemon::spawn(
                "oracle",
                Duration::from_millis(self.config.oracle_interval_ms),
                Arc::clone(&self.shutdown),
                move || {
                    oracle.run_cycle(&pipeline);
                    Ok(())
                },
            )?);
        }

        if set.dream {
            let dream = Arc::clone(&self.dream);
            daemons.push(Daemon::spawn(
                "dream",
                Duration::from_millis(self.config.dream_interval_ms),
                Arc::clone(&self.shutdown),
                move || {
                    dream.tick();
                    Ok(())
                },
            )?);
        }

        info!(count = daemons.len(), "daemons running");
        Ok(())
    }

    /// Superimpose `name` at position 0.
    pub fn assimilate(&self, name: &str) -> Admission {
        self.assimilate_at(name, 0)
    }

    /// Superimpose `name` permuted by `position`.
    pub fn assimilate_at(&self, name: &str, position: usize) -> Admission {
        self.activity.assimilations.fetch_add(1, Ordering::Relaxed);
        self.absorb(name, position)
    }

    fn absorb(&self, name: &str, position: usize) -> Admission {
        let name = normalize(name);
        if name.is_empty() {
            return Admission::Rejected;
        }
        let vector = self.table.resolve(&name).permute(position);
        if !self.admit(&name, &vector) {
            return Admission::Rejected;
        }
        self.memory.superimpose(&vector);
        self.oracle.observe(&name);
        self.activity.words_absorbed.fetch_add(1, Ordering::Relaxed);
        debug!(%name, position, "assimilated");
        Admission::Admitted
    }

    /// Assimilate `words` at positions 0, 1, 2, … and record them as the
    /// latest episode for [`Organism::unroll_sequence`].
    pub fn assimilate_sequence(&self, words: &[&str]) -> Vec<Admission> {
        self.activity.assimilations.fetch_add(1, Ordering::Relaxed);
        let mut episode = MemoryTrace::new();
        let admissions = words
            .iter()
            .enumerate()
            .map(|(position, word)| {
                let admission = self.absorb(word, position);
                if admission == Admission::Admitted {
                    episode.add_at(&self.table.resolve(&normalize(word)), position);
                }
                admission
            })
            .collect();
        *self.episode.lock() = episode;
        admissions
    }

    fn admit(&self, name: &str, vector: &HyperVector) -> bool {
        if self.config.enforce_admission && self.homeostasis.is_orthogonal_to_axiom(vector) {
            self.activity.axiom_violations.fetch_add(1, Ordering::Relaxed);
            warn!(%name, "dissonant with the axiom, rejected");
            return false;
        }
        true
    }

    /// Recall the concept for `name`: a cached prophecy if the oracle has
    /// one, else the recall pipeline. Unknown names are `Void` and are not
    /// added to the table.
    pub fn divine(&self, name: &str) -> Recall {
        self.activity.divinations.fetch_add(1, Ordering::Relaxed);
        let name = normalize(name);
        let quarantine = self.pipeline.cleanup_memory().quarantine();
        if let Some(prophecy) = self.oracle.take(&name) {
            // A prophecy computed before a quarantine may still name it.
            if !prophecy.name().is_some_and(|n| quarantine.contains(n)) {
                return prophecy;
            }
        }
        let recall = self.pipeline.recall(&name, self.config.divine_threshold);
        if self.table.contains(&name) {
            self.oracle.observe(&name);
        }
        recall
    }

    /// Store the pair `key ⊕ value`.
    pub fn associate(&self, key: &str, value: &str) -> Admission {
        let (key, value) = (normalize(key), normalize(value));
        if key.is_empty() || value.is_empty() {
            return Admission::Rejected;
        }
        let bound = encode_association(&self.table.resolve(&key), &self.table.resolve(&value));
        if !self.admit(&key, &bound) {
            return Admission::Rejected;
        }
        self.memory.superimpose(&bound);
        self.associations.lock().add(&bound);
        self.oracle.observe(&key);
        debug!(%key, %value, "associated");
        Admission::Admitted
    }

    /// The value most recently associated with `key`.
    pub fn recall_association(&self, key: &str) -> Recall {
        let Some(key) = self.table.get(&normalize(key)) else {
            return Recall::Void;
        };
        let query = self.associations.lock().query(&key);
        self.pipeline.cleanup(&query, self.config.divine_threshold)
    }

    /// "a is to b as c is to ?"
    pub fn analogy(&self, a: &str, b: &str, c: &str) -> Recall {
        let vectors = (
            self.table.get(&normalize(a)),
            self.table.get(&normalize(b)),
            self.table.get(&normalize(c)),
        );
        let (Some(a), Some(b), Some(c)) = vectors else {
            return Recall::Void;
        };
        self.pipeline
            .cleanup(&analogy_query(&a, &b, &c), self.config.divine_threshold)
    }

    /// Read the latest episode from position `start`, stopping at the first
    /// position that recalls nothing.
    pub fn unroll_sequence(&self, start: usize, max_steps: usize) -> Vec<String> {
        let episode = self.episode.lock();
        let mut words = Vec::new();
        for position in start..start.saturating_add(max_steps) {
            match self
                .pipeline
                .cleanup(&episode.item_at(position), self.config.divine_threshold)
            {
                Recall::Match { name, .. } => words.push(name),
                Recall::Void => break,
            }
        }
        words
    }

    /// Exclude `name` from recall, including prophecies already cached for
    /// it or resolving to it. Returns `false` if already quarantined.
    pub fn quarantine(&self, name: &str) -> bool {
        let name = normalize(name);
        let added = self.pipeline.cleanup_memory().quarantine().add(&name);
        let purged = self.oracle.purge(&name);
        if added {
            info!(%name, purged, "quarantined");
        }
        added
    }

    /// The `k` concepts closest to the recall query for `name`, nearest
    /// first. Empty for unknown names.
    pub fn nearest(&self, name: &str, k: usize) -> Vec<Candidate> {
        match self.pipeline.query(&normalize(name)) {
            Some(query) => self.pipeline.cleanup_memory().nearest(&query, k),
            None => Vec::new(),
        }
    }

    /// Write the concept vector for `name` as `<dir>/<NAME>_Plasmid.fasta`.
    /// The concept is generated if it was not known yet.
    pub fn transcribe(&self, name: &str, dir: &Path) -> crate::Result<Transcription> {
        let name = normalize(name);
        if name.is_empty() {
            return Err(MemoryError::EmptyName.into());
        }
        let dna = transcribe(&self.table.resolve(&name));
        let path = write_plasmid(dir, &name, &dna)?;
        self.activity.transcriptions.fetch_add(1, Ordering::Relaxed);
        self.activity.base_pairs.fetch_add(dna.len() as u64, Ordering::Relaxed);
        Ok(Transcription { name, dna, path })
    }

    /// Let the dream daemon synthesize concepts. Returns `false` if already
    /// asleep.
    pub fn sleep(&self) -> bool {
        let changed = self.dream.sleep();
        if changed {
            info!("entering dream state");
        }
        changed
    }

    /// Stop dreaming. Returns `false` if already awake.
    pub fn wake(&self) -> bool {
        let changed = self.dream.wake();
        if changed {
            info!("awake");
        }
        changed
    }

    pub fn activity(&self) -> ActivityReport {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        ActivityReport {
            assimilations: load(&self.activity.assimilations),
            words_absorbed: load(&self.activity.words_absorbed),
            axiom_violations: load(&self.activity.axiom_violations),
            divinations: load(&self.activity.divinations),
            dream_cycles: self.dream.cycles(),
            transcriptions: load(&self.activity.transcriptions),
            base_pairs: load(&self.activity.base_pairs),
            boot_time_ms: self.boot_time_ms,
        }
    }

    /// Lift a quarantine. Returns `false` if `name` was not quarantined.
    pub fn release(&self, name: &str) -> bool {
        let name = normalize(name);
        self.pipeline.cleanup_memory().quarantine().release(&name)
    }

    /// Make the current memory durable.
    pub fn flush(&self) -> crate::Result<()> {
        self.region.flush(&self.memory)?;
        Ok(())
    }

    /// Wipe memory, region, table, oracle and traces, then boot as new.
    pub fn format(&self) -> crate::Result<()> {
        self.region.format(&self.memory)?;
        self.table.clear();
        self.oracle.clear();
        self.associations.lock().clear();
        self.episode.lock().clear();
        self.seed();
        self.imprint_genesis()
    }

    pub fn status(&self) -> OrganismStatus {
        let cleanup = self.pipeline.cleanup_memory();
        OrganismStatus {
            region_path: self.region.path().to_path_buf(),
            born_this_boot: self.born,
            concepts: self.table.len(),
            concept_bytes: self.table.memory_bytes(),
            quarantined: cleanup.quarantine().len(),
            magnitude: self.memory.magnitude(),
            saturation: self.memory.saturation(),
            disk_saturation: self.region.saturation(),
            entropy: self.homeostasis.entropy(),
            homeostasis: self.homeostasis.report(),
            oracle: self.oracle.stats(),
            short_term: self.oracle.queue().snapshot(),
            cached_prophecies: self.oracle.cached_count(),
            neologisms: self.dream.neologisms(),
            dreaming: self.dream.is_dreaming(),
            associations: self.associations.lock().binding_count(),
            episode_length: self.episode.lock().binding_count(),
            activity: self.activity(),
            daemons: self
                .daemons
                .lock()
                .iter()
                .map(|d| d.name().to_string())
                .collect(),
        }
    }

    /// Stop every daemon and flush.
    pub fn shutdown(&self) -> crate::Result<()> {
        self.stop_daemons();
        self.flush()?;
        info!("organism shut down");
        Ok(())
    }

    fn stop_daemons(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        for daemon in self.daemons.lock().drain(..) {
            daemon.join();
        }
    }

    /// Whether the region was created by this boot.
    pub fn is_born(&self) -> bool {
        self.born
    }

    pub fn config(&self) -> &OrganismConfig {
        &self.config
    }

    pub fn concepts(&self) -> &Arc<ConceptTable> {
        &self.table
    }

    pub fn memory(&self) -> &Arc<SingularityMemory> {
        &self.memory
    }

    pub fn homeostasis(&self) -> &Arc<HomeostasisDaemon> {
        &self.homeostasis
    }

    pub fn oracle(&self) -> &Arc<OracleCache> {
        &self.oracle
    }

    pub fn dream(&self) -> &Arc<DreamDaemon> {
        &self.dream
    }
}

impl Drop for Organism {
    fn drop(&mut self) {
        self.stop_daemons();
    }
}

/// Names are case-insensitive and whitespace-trimmed.
pub fn normalize(name: &str) -> String {
    name.trim().to_uppercase()
}
