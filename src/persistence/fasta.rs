//! DNA transcription: a concept vector written out as a nucleotide string.
//!
//! Every 2-bit pair becomes one base (`00` = A, `01` = C, `10` = G,
//! `11` = T), least significant pair of each word first. A 16,384-bit
//! vector is 8,192 bp.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::PersistenceError;
use crate::memory::hypervector::HyperVector;

const BASES: [char; 4] = ['A', 'C', 'G', 'T'];

/// FASTA body width in columns.
pub const LINE_WIDTH: usize = 80;

/// Encode `vector` as a base string of `DIM / 2` nucleotides.
pub fn transcribe(vector: &HyperVector) -> String {
    let mut dna = String::with_capacity(vector.words().len() * 32);
    for &word in vector.words() {
        for shift in (0..64).step_by(2) {
            dna.push(BASES[((word >> shift) & 0b11) as usize]);
        }
    }
    dna
}

/// Write `dna` as `<dir>/<name>_Plasmid.fasta` and return the path.
pub fn write_plasmid(dir: &Path, name: &str, dna: &str) -> Result<PathBuf, PersistenceError> {
    let path = dir.join(format!("{name}_Plasmid.fasta"));
    let write_err = |source| PersistenceError::Write {
        path: path.clone(),
        source,
    };

    let file = File::create(&path).map_err(write_err)?;
    let mut out = BufWriter::new(file);
    writeln!(out, ">{name} | synthetic DNA | {} bp", dna.len()).map_err(write_err)?;
    for line in dna.as_bytes().chunks(LINE_WIDTH) {
        out.write_all(line).map_err(write_err)?;
        out.write_all(b"\n").map_err(write_err)?;
    }
    out.flush().map_err(write_err)?;

    info!(path = %path.display(), bp = dna.len(), "plasmid written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DIM, WORDS};
    use tempfile::tempdir;

    #[test]
    fn test_transcribe_length_and_alphabet() {
        let dna = transcribe(&HyperVector::generate("ORDER"));
        assert_eq!(dna.len(), DIM / 2);
        assert!(dna.chars().all(|c| "ACGT".contains(c)));
    }

    #[test]
    fn test_transcribe_pair_order() {
        let mut words = vec![0u64; WORDS];
        // Pairs from the low end: 00, 01, 10, 11.
        words[0] = 0b11_10_01_00;
        words[1] = u64::MAX;
        let dna = transcribe(&HyperVector::from_words(words));
        assert!(dna.starts_with("ACGT"));
        assert!(dna[4..32].chars().all(|c| c == 'A'));
        assert!(dna[32..64].chars().all(|c| c == 'T'));
        assert!(dna[64..].chars().all(|c| c == 'A'));
    }

    #[test]
    fn test_write_plasmid_layout() {
        let dir = tempdir().expect("tempdir");
        let dna = transcribe(&HyperVector::generate("CHAOS"));
        let path = write_plasmid(dir.path(), "CHAOS", &dna).expect("write");
        assert_eq!(path, dir.path().join("CHAOS_Plasmid.fasta"));

        let text = std::fs::read_to_string(&path).expect("read");
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(">CHAOS | synthetic DNA | 8192 bp"));
        let body: Vec<&str> = lines.collect();
        assert_eq!(body.len(), (DIM / 2).div_ceil(LINE_WIDTH));
        assert!(body.iter().all(|l| l.len() <= LINE_WIDTH));
        assert_eq!(body.concat(), dna);
    }

    #[test]
    fn test_write_plasmid_missing_dir() {
        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join("nope");
        let err = write_plasmid(&missing, "X", "ACGT").unwrap_err();
        assert!(matches!(err, PersistenceError::Write { .. }));
    }
}
