//! Runtime: the organism and its background daemons.
//!
//! This module provides:
//! - The recall pipeline shared by queries and the oracle
//! - Homeostasis (entropy correction and periodic flush)
//! - The oracle (speculative single-use recall)
//! - Dreaming (concept synthesis while asleep)
//! - A supervised loop to run each of them on its own thread

pub mod daemon;
pub mod dream;
pub mod homeostasis;
pub mod oracle;
pub mod organism;
pub mod pipeline;
