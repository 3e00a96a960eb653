//! Orthogonal persistence of the singularity counters, plus FASTA export of
//! single concept vectors.

pub mod fasta;
pub mod region;

pub use fasta::{transcribe, write_plasmid};
pub use region::{Bootstrap, PersistenceRegion};
