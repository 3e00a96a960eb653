//! Error types for the singularity core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while opening, mapping or flushing the persistence region.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("failed to open region file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to size region file {path} to {expected} bytes: {source}")]
    Resize {
        path: PathBuf,
        expected: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("region file {path} holds {actual} bytes, expected {expected} (dimension changed?)")]
    SizeMismatch {
        path: PathBuf,
        expected: usize,
        actual: u64,
    },

    #[error("failed to map region file {path}: {source}")]
    Map {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to sync region to disk: {0}")]
    Sync(#[source] std::io::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by in-memory operations.
#[derive(Error, Debug, PartialEq)]
pub enum MemoryError {
    #[error("retention factor must lie in (0, 1), got {0}")]
    InvalidRetention(f64),

    #[error("snapshot holds {actual} counters, expected {expected}")]
    SnapshotLength { expected: usize, actual: usize },

    #[error("concept name is empty")]
    EmptyName,
}

/// Crate-wide error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

pub type Result<T> = std::result::Result<T, Error>;
