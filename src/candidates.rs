// Copyright 2021 The gsgp developers.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Reading candidate mutations from VCF/BCF, gated by genotype, read depth
//! and allele frequency.

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use ordered_float::NotNan;
use progress_logger::ProgressLogger;
use rust_htslib::bcf::record::GenotypeAllele;
use rust_htslib::bcf::{self, Read};

use crate::attribution::aggregate::SampleName;
use crate::errors::Error;
use crate::reference::Buffer;
use crate::variants::Mutation;

/// A closed VAF interval used to gate carriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VafWindow {
    lower: NotNan<f64>,
    upper: NotNan<f64>,
}

impl VafWindow {
    pub fn new(lower: f64, upper: f64) -> Result<Self, Error> {
        let invalid = || Error::InvalidVafWindow { lower, upper };
        let lower = NotNan::new(lower).map_err(|_| invalid())?;
        let upper = NotNan::new(upper).map_err(|_| invalid())?;
        if *lower < 0.0 || *upper > 1.0 || lower > upper {
            return Err(invalid());
        }
        Ok(VafWindow { lower, upper })
    }

    pub fn contains(&self, vaf: f64) -> bool {
        self.lower.into_inner() <= vaf && vaf <= self.upper.into_inner()
    }
}

impl fmt::Display for VafWindow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

/// Interpret raw `--vaf` values: a single value is a minimum (the window up
/// to 1), otherwise consecutive values pair up into windows.
pub fn parse_vaf_bounds(values: &[f64]) -> Result<Vec<VafWindow>, Error> {
    if values.len() == 1 {
        return Ok(vec![VafWindow::new(values[0], 1.0)?]);
    }
    if values.len() % 2 != 0 {
        return Err(Error::UnpairedVafBounds { n: values.len() });
    }
    values
        .chunks(2)
        .map(|pair| VafWindow::new(pair[0], pair[1]))
        .collect()
}

/// Counters describing what happened to the VCF records of one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReaderCounters {
    /// VCF records read.
    pub records: u64,
    /// Records skipped because they do not have exactly one ALT allele.
    pub not_biallelic: u64,
    /// Records without usable chromosome information.
    pub malformed: u64,
    /// Sample genotypes dropped by the depth or VAF gates.
    pub genotypes_filtered: u64,
    /// Records left without any carrying sample after gating.
    pub without_carrier: u64,
    /// Records whose REF disagrees with the reference genome base.
    pub reference_mismatches: u64,
    /// Candidate mutations emitted (records times carrying samples).
    pub candidates: u64,
}

/// Streaming VCF/BCF reader that expands each record into one candidate
/// [`Mutation`] per carrying sample and annotates the trinucleotide context.
pub struct CandidateReader {
    reader: bcf::Reader,
    samples: Vec<SampleName>,
    min_depth: Option<u32>,
    vaf_windows: Vec<VafWindow>,
    log_each_record: bool,
    counters: ReaderCounters,
}

impl CandidateReader {
    /// Open a VCF/BCF file, or STDIN if no path is given.
    pub fn from_path(
        path: Option<&PathBuf>,
        min_depth: Option<u32>,
        vaf_windows: Vec<VafWindow>,
        log_each_record: bool,
    ) -> Result<Self> {
        let reader = match path {
            Some(path) => bcf::Reader::from_path(path)
                .with_context(|| format!("unable to open candidates {}", path.display()))?,
            None => bcf::Reader::from_stdin().context("unable to read candidates from STDIN")?,
        };
        let samples = reader
            .header()
            .samples()
            .iter()
            .map(|sample| SampleName::new(String::from_utf8_lossy(sample).into_owned()))
            .collect();
        Ok(CandidateReader {
            reader,
            samples,
            min_depth,
            vaf_windows,
            log_each_record,
            counters: ReaderCounters::default(),
        })
    }

    pub fn samples(&self) -> &[SampleName] {
        &self.samples
    }

    pub fn counters(&self) -> ReaderCounters {
        self.counters
    }

    /// Fill `batch` with candidate mutations until it holds at least `limit`
    /// of them. Returns false once the input is exhausted.
    pub fn read_batch(
        &mut self,
        reference: &Buffer,
        batch: &mut Vec<Mutation>,
        limit: usize,
        progress: &mut ProgressLogger,
    ) -> Result<bool> {
        while batch.len() < limit {
            let mut record = self.reader.empty_record();
            match self.reader.read(&mut record) {
                None => return Ok(false),
                Some(result) => result?,
            }
            progress.update(1u64);
            self.counters.records += 1;
            self.collect_candidates(&record, reference, batch)?;
        }
        Ok(true)
    }

    fn collect_candidates(
        &mut self,
        record: &bcf::Record,
        reference: &Buffer,
        batch: &mut Vec<Mutation>,
    ) -> Result<()> {
        let rid = match record.rid() {
            Some(rid) => rid,
            None => {
                self.counters.malformed += 1;
                return Ok(());
            }
        };
        let chrom = match record.header().rid2name(rid) {
            Ok(name) => String::from_utf8_lossy(name).into_owned(),
            Err(_) => {
                self.counters.malformed += 1;
                return Ok(());
            }
        };
        let pos = (record.pos() + 1) as u64;
        let alleles = record.alleles();
        if alleles.len() != 2 {
            self.counters.not_biallelic += 1;
            return Ok(());
        }
        let ref_allele = alleles[0].to_owned();
        let alt_allele = alleles[1].to_owned();

        let carriers = self.passing_samples(record)?;
        if carriers.is_empty() {
            self.counters.without_carrier += 1;
            return Ok(());
        }

        let context = reference.tri_context(&chrom, pos)?;
        if let Some(context) = context {
            if ref_allele.len() == 1 && context.ref_base() != ref_allele[0].to_ascii_uppercase() {
                self.counters.reference_mismatches += 1;
                debug!(
                    "reference mismatch at {}:{}: record claims {}, reference has {}",
                    chrom,
                    pos,
                    char::from(ref_allele[0]),
                    char::from(context.ref_base())
                );
            }
        }

        if self.log_each_record {
            info!(
                "candidate {}:{} {}>{} carried by {} sample(s)",
                chrom,
                pos,
                String::from_utf8_lossy(&ref_allele),
                String::from_utf8_lossy(&alt_allele),
                carriers.len()
            );
        }
        for sample in carriers {
            batch.push(Mutation::new(
                sample,
                chrom.clone(),
                pos,
                ref_allele.clone(),
                alt_allele.clone(),
                context,
            ));
            self.counters.candidates += 1;
        }
        Ok(())
    }

    /// Indices of the samples whose genotype contains the ALT allele and
    /// passes the depth and VAF gates.
    fn passing_samples(&mut self, record: &bcf::Record) -> Result<Vec<u32>> {
        let genotypes = match record.genotypes() {
            Ok(genotypes) => genotypes,
            Err(_) => {
                // without GT nobody can be confirmed as carrier
                self.counters.genotypes_filtered += self.samples.len() as u64;
                return Ok(Vec::new());
            }
        };
        let need_depth = self.min_depth.is_some() || !self.vaf_windows.is_empty();
        let depths = if need_depth {
            record.format(b"DP").integer().ok()
        } else {
            None
        };
        let allele_depths = if !self.vaf_windows.is_empty() {
            record.format(b"AD").integer().ok()
        } else {
            None
        };

        let mut passing = Vec::new();
        for idx in 0..self.samples.len() {
            let genotype = genotypes.get(idx);
            let carries = genotype.iter().any(|allele| {
                matches!(
                    allele,
                    GenotypeAllele::Unphased(i) | GenotypeAllele::Phased(i) if *i > 0
                )
            });
            if !carries {
                continue;
            }
            if need_depth {
                let depth = depths
                    .as_ref()
                    .and_then(|depths| depths[idx].first().copied())
                    .filter(|&depth| depth > 0);
                let depth = match depth {
                    Some(depth) => depth,
                    None => {
                        self.counters.genotypes_filtered += 1;
                        continue;
                    }
                };
                if let Some(min_depth) = self.min_depth {
                    if (depth as u32) < min_depth {
                        self.counters.genotypes_filtered += 1;
                        continue;
                    }
                }
                if !self.vaf_windows.is_empty() {
                    // AD either holds just the ALT depth or one value per
                    // allele; anything else cannot be interpreted
                    let alt_depth = allele_depths.as_ref().and_then(|ads| match ads[idx] {
                        [alt] => Some(*alt),
                        [_, alt] => Some(*alt),
                        _ => None,
                    });
                    let alt_depth = match alt_depth {
                        Some(alt_depth) if alt_depth >= 0 => alt_depth,
                        _ => {
                            self.counters.genotypes_filtered += 1;
                            continue;
                        }
                    };
                    let vaf = alt_depth as f64 / depth as f64;
                    if !self.vaf_windows.iter().any(|window| window.contains(vaf)) {
                        self.counters.genotypes_filtered += 1;
                        continue;
                    }
                }
            }
            passing.push(idx as u32);
        }
        Ok(passing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vaf_window() {
        let window = VafWindow::new(0.1, 0.9).unwrap();
        assert!(window.contains(0.1));
        assert!(window.contains(0.5));
        assert!(window.contains(0.9));
        assert!(!window.contains(0.05));
        assert!(!window.contains(0.95));
        assert_eq!(window.to_string(), "[0.1, 0.9]");

        assert!(VafWindow::new(0.9, 0.1).is_err());
        assert!(VafWindow::new(-0.1, 0.5).is_err());
        assert!(VafWindow::new(0.5, 1.1).is_err());
        assert!(VafWindow::new(f64::NAN, 0.5).is_err());
    }

    #[test]
    fn test_parse_vaf_bounds() {
        assert_eq!(parse_vaf_bounds(&[]).unwrap(), vec![]);
        assert_eq!(
            parse_vaf_bounds(&[0.3]).unwrap(),
            vec![VafWindow::new(0.3, 1.0).unwrap()]
        );
        assert_eq!(
            parse_vaf_bounds(&[0.1, 0.4, 0.6, 0.9]).unwrap(),
            vec![
                VafWindow::new(0.1, 0.4).unwrap(),
                VafWindow::new(0.6, 0.9).unwrap()
            ]
        );
        assert!(matches!(
            parse_vaf_bounds(&[0.1, 0.4, 0.6]).unwrap_err(),
            Error::UnpairedVafBounds { n: 3 }
        ));
    }
}
