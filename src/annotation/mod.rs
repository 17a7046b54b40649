//! Gene annotation: a tab separated gene table and the interval index used to
//! look up the genes overlapping a mutation.

pub mod gtf;

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use bio::data_structures::interval_tree::IntervalTree;
use bio_types::strand::Strand;
use derive_new::new;
use getset::{CopyGetters, Getters};

use crate::errors::Error;
use crate::utils::toggle_chr_prefix;

/// One row of the gene annotation table (see [`gtf`] for how the table is
/// derived from a GTF file).
#[derive(new, Getters, CopyGetters, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneRecord {
    #[getset(get = "pub")]
    chromosome: String,
    #[getset(get = "pub")]
    gene_id: String,
    /// 1-based inclusive coordinates, as in GTF.
    #[getset(get_copy = "pub")]
    start: u64,
    #[getset(get_copy = "pub")]
    end: u64,
    strand: char,
}

impl GeneRecord {
    pub fn strand_char(&self) -> char {
        self.strand
    }

    pub fn strand(&self) -> Result<Strand, Error> {
        match self.strand {
            '+' => Ok(Strand::Forward),
            '-' => Ok(Strand::Reverse),
            value => Err(Error::InvalidStrandInfo { value }),
        }
    }

    fn validate(&self) -> Result<(), Error> {
        if self.gene_id.is_empty() {
            return Err(Error::MissingGeneId {
                chrom: self.chromosome.clone(),
                start: self.start,
                end: self.end,
            });
        }
        if self.start == 0 || self.end < self.start {
            return Err(Error::InvalidGeneInterval {
                gene: self.gene_id.clone(),
                chrom: self.chromosome.clone(),
                start: self.start,
                end: self.end,
            });
        }
        self.strand()?;
        Ok(())
    }
}

/// Read and validate a gene annotation table.
pub fn read_gene_table<P: AsRef<Path>>(path: P) -> Result<Vec<GeneRecord>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .comment(Some(b'#'))
        .from_path(path)
        .with_context(|| format!("unable to read gene annotation {}", path.display()))?;
    let mut records = Vec::new();
    for record in reader.deserialize() {
        let record: GeneRecord =
            record.with_context(|| format!("invalid gene annotation record in {}", path.display()))?;
        record.validate()?;
        records.push(record);
    }
    if records.is_empty() {
        return Err(Error::EmptyAnnotation {
            path: path.to_owned(),
        }
        .into());
    }
    Ok(records)
}

/// Interval index over all gene bodies, optionally extended by margins.
/// Gene ids are interned; the dense `u32` ids index into [`genes`](GeneIndex::genes).
#[derive(Getters, CopyGetters)]
pub struct GeneIndex {
    trees: HashMap<String, IntervalTree<u64, u32>>,
    /// Gene names in first-seen order of the annotation.
    #[getset(get = "pub")]
    genes: Vec<String>,
    #[getset(get_copy = "pub")]
    n_intervals: usize,
}

impl GeneIndex {
    /// Build the index. Margins are strand aware, mirroring `bedtools window
    /// -sw`: `upstream` extends the transcription start side of each gene,
    /// `downstream` the opposite side.
    pub fn build(records: &[GeneRecord], upstream: u64, downstream: u64) -> Result<Self, Error> {
        let mut gene_ids: HashMap<&str, u32> = HashMap::new();
        let mut genes = Vec::new();
        let mut trees: HashMap<String, IntervalTree<u64, u32>> = HashMap::new();
        let mut n_intervals = 0;
        for record in records {
            record.validate()?;
            let idx = match gene_ids.get(record.gene_id().as_str()) {
                Some(&idx) => idx,
                None => {
                    let idx = genes.len() as u32;
                    gene_ids.insert(record.gene_id(), idx);
                    genes.push(record.gene_id().clone());
                    idx
                }
            };
            let (margin5, margin3) = match record.strand()? {
                Strand::Forward => (upstream, downstream),
                _ => (downstream, upstream),
            };
            // half open, 0-based
            let start = (record.start() - 1).saturating_sub(margin5);
            let end = record.end() + margin3;
            trees
                .entry(record.chromosome().clone())
                .or_insert_with(IntervalTree::new)
                .insert(start..end, idx);
            n_intervals += 1;
        }
        Ok(GeneIndex {
            trees,
            genes,
            n_intervals,
        })
    }

    pub fn n_genes(&self) -> usize {
        self.genes.len()
    }

    pub fn gene_name(&self, idx: u32) -> &str {
        &self.genes[idx as usize]
    }

    /// Ids of all genes overlapping the given 1-based position, deduplicated
    /// and in ascending id order. Chromosome naming tolerates a `chr` prefix
    /// mismatch between VCF and annotation.
    pub fn overlapping_genes(&self, chrom: &str, pos: u64) -> Vec<u32> {
        if pos == 0 {
            return Vec::new();
        }
        let tree = self
            .trees
            .get(chrom)
            .or_else(|| self.trees.get(&toggle_chr_prefix(chrom)));
        let tree = match tree {
            Some(tree) => tree,
            None => return Vec::new(),
        };
        let pos = pos - 1;
        let mut ids: Vec<u32> = tree.find(pos..pos + 1).map(|entry| *entry.data()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(chromosome: &str, gene_id: &str, start: u64, end: u64, strand: char) -> GeneRecord {
        GeneRecord::new(
            chromosome.to_owned(),
            gene_id.to_owned(),
            start,
            end,
            strand,
        )
    }

    #[test]
    fn test_overlap_queries() {
        let records = vec![
            record("chr1", "TP53", 1000, 2000, '+'),
            record("chr1", "NESTED", 1200, 1300, '-'),
            record("chr2", "KRAS", 50, 60, '+'),
        ];
        let index = GeneIndex::build(&records, 0, 0).unwrap();
        assert_eq!(index.n_genes(), 3);
        assert_eq!(index.n_intervals(), 3);

        assert_eq!(index.overlapping_genes("chr1", 1250), vec![0, 1]);
        assert_eq!(index.overlapping_genes("chr1", 1000), vec![0]);
        assert_eq!(index.overlapping_genes("chr1", 2000), vec![0]);
        assert_eq!(index.overlapping_genes("chr1", 2001), Vec::<u32>::new());
        assert_eq!(index.overlapping_genes("chr1", 999), Vec::<u32>::new());
        assert_eq!(index.overlapping_genes("chr3", 1250), Vec::<u32>::new());
        assert_eq!(index.overlapping_genes("chr1", 0), Vec::<u32>::new());
        assert_eq!(index.gene_name(1), "NESTED");
    }

    #[test]
    fn test_margins_follow_strand() {
        let forward = GeneIndex::build(&[record("1", "F", 1000, 2000, '+')], 100, 10).unwrap();
        assert_eq!(forward.overlapping_genes("1", 900), vec![0]);
        assert_eq!(forward.overlapping_genes("1", 899), Vec::<u32>::new());
        assert_eq!(forward.overlapping_genes("1", 2010), vec![0]);
        assert_eq!(forward.overlapping_genes("1", 2011), Vec::<u32>::new());

        // on the reverse strand the upstream margin extends beyond the end
        let reverse = GeneIndex::build(&[record("1", "R", 1000, 2000, '-')], 100, 10).unwrap();
        assert_eq!(reverse.overlapping_genes("1", 990), vec![0]);
        assert_eq!(reverse.overlapping_genes("1", 989), Vec::<u32>::new());
        assert_eq!(reverse.overlapping_genes("1", 2100), vec![0]);
        assert_eq!(reverse.overlapping_genes("1", 2101), Vec::<u32>::new());
    }

    #[test]
    fn test_margins_clamp_at_contig_start() {
        let index = GeneIndex::build(&[record("1", "G", 5, 10, '+')], 1000, 0).unwrap();
        assert_eq!(index.overlapping_genes("1", 1), vec![0]);
    }

    #[test]
    fn test_same_gene_counted_once() {
        let records = vec![
            record("chr1", "DUP", 100, 200, '+'),
            record("chr1", "DUP", 150, 250, '+'),
        ];
        let index = GeneIndex::build(&records, 0, 0).unwrap();
        assert_eq!(index.n_genes(), 1);
        assert_eq!(index.n_intervals(), 2);
        assert_eq!(index.overlapping_genes("chr1", 180), vec![0]);
    }

    #[test]
    fn test_chr_prefix_fallback() {
        let index = GeneIndex::build(&[record("chr1", "G", 100, 200, '+')], 0, 0).unwrap();
        assert_eq!(index.overlapping_genes("1", 150), vec![0]);

        let bare = GeneIndex::build(&[record("1", "G", 100, 200, '+')], 0, 0).unwrap();
        assert_eq!(bare.overlapping_genes("chr1", 150), vec![0]);
    }

    #[test]
    fn test_invalid_records_are_rejected() {
        assert!(GeneIndex::build(&[record("1", "G", 100, 200, '.')], 0, 0).is_err());
        assert!(GeneIndex::build(&[record("1", "G", 200, 100, '+')], 0, 0).is_err());
        assert!(GeneIndex::build(&[record("1", "G", 0, 100, '+')], 0, 0).is_err());
        assert!(GeneIndex::build(&[record("1", "", 100, 200, '+')], 0, 0).is_err());
    }
}
