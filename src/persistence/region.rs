//! Persistence region: a memory-mapped file mirroring the vote counters.
//!
//! Layout is `DIM` little-endian `i32`s with no header, so the file is
//! exactly `REGION_BYTES` long. Writes happen only on [`PersistenceRegion::flush`];
//! between flushes the in-memory counters are ahead of the file.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::{COUNTER_BYTES, DIM, REGION_BYTES};
use crate::error::PersistenceError;
use crate::memory::singularity::SingularityMemory;

/// Result of [`PersistenceRegion::bootstrap`].
pub struct Bootstrap {
    pub region: PersistenceRegion,
    /// `true` when the file was missing or empty and has been created zeroed.
    pub is_new: bool,
}

/// The mapped backing store. Flushes are serialized by the map mutex.
pub struct PersistenceRegion {
    path: PathBuf,
    map: Mutex<MmapMut>,
}

impl PersistenceRegion {
    /// Open or create the region at `path` and load it into `memory`.
    ///
    /// A missing or empty file is sized to `REGION_BYTES` (zero-filled) and
    /// `memory` is left untouched. Any other size is rejected: the file was
    /// written with a different dimension.
    pub fn bootstrap(
        path: impl AsRef<Path>,
        memory: &SingularityMemory,
    ) -> crate::Result<Bootstrap> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| PersistenceError::Open {
                path: path.clone(),
                source,
            })?;

        let actual = file
            .metadata()
            .map_err(|source| PersistenceError::Open {
                path: path.clone(),
                source,
            })?
            .len();

        let is_new = actual == 0;
        if is_new {
            file.set_len(REGION_BYTES as u64)
                .map_err(|source| PersistenceError::Resize {
                    path: path.clone(),
                    expected: REGION_BYTES,
                    source,
                })?;
        } else if actual != REGION_BYTES as u64 {
            return Err(PersistenceError::SizeMismatch {
                path,
                expected: REGION_BYTES,
                actual,
            }
            .into());
        }

        // SAFETY: the file is opened read/write by this process and sized to
        // REGION_BYTES above. Concurrent external truncation is not supported.
        let map = unsafe { MmapMut::map_mut(&file) }.map_err(|source| PersistenceError::Map {
            path: path.clone(),
            source,
        })?;

        if !is_new {
            memory.restore(&decode_counters(&map))?;
        }

        info!(path = %path.display(), is_new, "persistence region mapped");

        Ok(Bootstrap {
            region: Self {
                path,
                map: Mutex::new(map),
            },
            is_new,
        })
    }

    /// Write every counter into the mapping and sync it to disk.
    pub fn flush(&self, memory: &SingularityMemory) -> Result<(), PersistenceError> {
        let mut map = self.map.lock();
        for (i, value) in memory.snapshot().into_iter().enumerate() {
            let at = i * COUNTER_BYTES;
            map[at..at + COUNTER_BYTES].copy_from_slice(&value.to_le_bytes());
        }
        map.flush().map_err(PersistenceError::Sync)?;
        debug!(path = %self.path.display(), "region flushed");
        Ok(())
    }

    /// Zero the memory and the region.
    pub fn format(&self, memory: &SingularityMemory) -> Result<(), PersistenceError> {
        memory.reset();
        self.flush(memory)?;
        info!(path = %self.path.display(), "region formatted");
        Ok(())
    }

    /// Counters as last flushed.
    pub fn stored_counters(&self) -> Vec<i32> {
        decode_counters(&self.map.lock())
    }

    /// Fraction of flushed counters that are positive.
    pub fn saturation(&self) -> f64 {
        let map = self.map.lock();
        let positive = map
            .chunks_exact(COUNTER_BYTES)
            .filter(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]) > 0)
            .count();
        positive as f64 / DIM as f64
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn decode_counters(bytes: &[u8]) -> Vec<i32> {
    bytes
        .chunks_exact(COUNTER_BYTES)
        .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::memory::hypervector::HyperVector;
    use tempfile::tempdir;

    #[test]
    fn test_bootstrap_creates_zeroed_region() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("region.sys");
        let memory = SingularityMemory::new();

        let boot = PersistenceRegion::bootstrap(&path, &memory).expect("bootstrap");
        assert!(boot.is_new);
        assert_eq!(boot.region.path(), path.as_path());
        assert_eq!(
            std::fs::metadata(&path).expect("metadata").len(),
            REGION_BYTES as u64
        );
        assert!(boot.region.stored_counters().iter().all(|&c| c == 0));
        assert_eq!(boot.region.saturation(), 0.0);
    }

    #[test]
    fn test_flush_and_reload() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("region.sys");
        let v = HyperVector::generate("PERSIST");

        {
            let memory = SingularityMemory::new();
            let boot = PersistenceRegion::bootstrap(&path, &memory).expect("bootstrap");
            for _ in 0..3 {
                memory.superimpose(&v);
            }
            boot.region.flush(&memory).expect("flush");
            assert_eq!(boot.region.stored_counters(), memory.snapshot());
        }

        let restored = SingularityMemory::new();
        let boot = PersistenceRegion::bootstrap(&path, &restored).expect("reopen");
        assert!(!boot.is_new);
        assert_eq!(restored.collapse(), v);
        for i in 0..DIM {
            let expected = if v.get_bit(i) { 3 } else { -3 };
            assert_eq!(restored.counter(i), expected, "counter {i}");
        }
    }

    #[test]
    fn test_little_endian_layout() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("region.sys");
        let memory = SingularityMemory::new();
        let boot = PersistenceRegion::bootstrap(&path, &memory).expect("bootstrap");

        let mut v = HyperVector::zeros();
        v.set_bit(0, true);
        memory.superimpose(&v);
        boot.region.flush(&memory).expect("flush");

        let bytes = std::fs::read(&path).expect("read");
        assert_eq!(&bytes[0..4], &1i32.to_le_bytes());
        assert_eq!(&bytes[4..8], &(-1i32).to_le_bytes());
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("region.sys");
        std::fs::write(&path, vec![0u8; 100]).expect("write");

        let memory = SingularityMemory::new();
        match PersistenceRegion::bootstrap(&path, &memory) {
            Err(Error::Persistence(PersistenceError::SizeMismatch {
                expected, actual, ..
            })) => {
                assert_eq!(expected, REGION_BYTES);
                assert_eq!(actual, 100);
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("a truncated region must be rejected"),
        }
    }

    #[test]
    fn test_empty_file_treated_as_new() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("region.sys");
        std::fs::write(&path, b"").expect("write");

        let memory = SingularityMemory::new();
        let boot = PersistenceRegion::bootstrap(&path, &memory).expect("bootstrap");
        assert!(boot.is_new);
    }

    #[test]
    fn test_unopenable_path_fails() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("missing_dir").join("region.sys");
        let memory = SingularityMemory::new();
        assert!(matches!(
            PersistenceRegion::bootstrap(&path, &memory),
            Err(Error::Persistence(PersistenceError::Open { .. }))
        ));
    }

    #[test]
    fn test_format_zeroes_memory_and_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("region.sys");
        let memory = SingularityMemory::new();
        let boot = PersistenceRegion::bootstrap(&path, &memory).expect("bootstrap");

        memory.superimpose(&HyperVector::generate("WIPE"));
        boot.region.flush(&memory).expect("flush");
        assert!(boot.region.saturation() > 0.4);

        boot.region.format(&memory).expect("format");
        assert_eq!(memory.magnitude(), 0);
        assert!(boot.region.stored_counters().iter().all(|&c| c == 0));
    }
}
