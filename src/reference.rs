use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::{Mutex, RwLock};

use anyhow::Result;
use bio::io::fasta;
use lru_time_cache::LruCache;

use crate::utils::toggle_chr_prefix;
use crate::variants::TriContext;

/// A lazy buffer for reference sequences.
pub struct Buffer {
    reader: RwLock<fasta::IndexedReader<fs::File>>,
    sequences: Mutex<LruCache<String, Arc<Vec<u8>>>>,
    names: HashSet<String>,
}

impl Buffer {
    pub fn from_path<P: AsRef<Path> + std::fmt::Debug>(path: P, capacity: usize) -> Result<Self> {
        let fasta: fasta::IndexedReader<fs::File> = fasta::IndexedReader::from_file(&path)?;
        let names = fasta
            .index
            .sequences()
            .into_iter()
            .map(|sequence| sequence.name)
            .collect();
        Ok(Buffer {
            reader: RwLock::new(fasta),
            sequences: Mutex::new(LruCache::with_capacity(capacity)),
            names,
        })
    }

    /// Resolve a chromosome name against the index, tolerating a missing or
    /// superfluous `chr` prefix.
    pub fn resolve_name(&self, chrom: &str) -> Option<String> {
        if self.names.contains(chrom) {
            return Some(chrom.to_owned());
        }
        let toggled = toggle_chr_prefix(chrom);
        if self.names.contains(&toggled) {
            Some(toggled)
        } else {
            None
        }
    }

    /// Load the given chromosome and return it as a slice. This is O(1) if the
    /// chromosome was loaded before. Contigs absent from the index yield
    /// `None` instead of an error, so callers can skip and count them.
    pub fn seq(&self, chrom: &str) -> Result<Option<Arc<Vec<u8>>>> {
        let name = match self.resolve_name(chrom) {
            Some(name) => name,
            None => return Ok(None),
        };
        let mut sequences = self.sequences.lock().unwrap();

        if !sequences.contains_key(&name) {
            let mut sequence = Arc::new(Vec::new());
            {
                let mut reader = self.reader.write().unwrap();
                reader.fetch_all(&name)?;
                reader.read(Arc::get_mut(&mut sequence).unwrap())?;
            }

            sequences.insert(name, Arc::clone(&sequence));
            Ok(Some(sequence))
        } else {
            Ok(Some(Arc::clone(sequences.get(&name).unwrap())))
        }
    }

    /// Uppercased trinucleotide context around the given 1-based position, or
    /// `None` if the contig is unknown or the position lacks a flank because
    /// it touches a contig boundary.
    pub fn tri_context(&self, chrom: &str, pos: u64) -> Result<Option<TriContext>> {
        if pos < 2 {
            return Ok(None);
        }
        let sequence = match self.seq(chrom)? {
            Some(sequence) => sequence,
            None => return Ok(None),
        };
        let i = (pos - 1) as usize;
        if i + 1 >= sequence.len() {
            return Ok(None);
        }
        Ok(Some(TriContext::new(
            sequence[i - 1].to_ascii_uppercase(),
            sequence[i].to_ascii_uppercase(),
            sequence[i + 1].to_ascii_uppercase(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer() -> (tempfile::TempDir, Buffer) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.fa");
        fs::write(&path, ">chr1\naacctggtta\n").unwrap();
        fs::write(dir.path().join("ref.fa.fai"), "chr1\t10\t6\t10\t11\n").unwrap();
        let buffer = Buffer::from_path(&path, 2).unwrap();
        (dir, buffer)
    }

    #[test]
    fn test_tri_context() {
        let (_dir, buffer) = buffer();
        assert_eq!(
            buffer.tri_context("chr1", 5).unwrap(),
            Some(TriContext::new(b'C', b'T', b'G'))
        );
        // name resolution tolerates a missing chr prefix
        assert_eq!(
            buffer.tri_context("1", 2).unwrap(),
            Some(TriContext::new(b'A', b'A', b'C'))
        );
    }

    #[test]
    fn test_tri_context_at_contig_boundaries() {
        let (_dir, buffer) = buffer();
        assert_eq!(buffer.tri_context("chr1", 1).unwrap(), None);
        assert_eq!(buffer.tri_context("chr1", 10).unwrap(), None);
        assert_eq!(buffer.tri_context("chr1", 0).unwrap(), None);
        assert_eq!(buffer.tri_context("chr1", 9999).unwrap(), None);
    }

    #[test]
    fn test_unknown_contig() {
        let (_dir, buffer) = buffer();
        assert_eq!(buffer.resolve_name("chr2"), None);
        assert_eq!(buffer.tri_context("chr2", 5).unwrap(), None);
    }
}
