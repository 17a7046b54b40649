// Copyright 2021 The gsgp developers.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Orchestration of a whole attribution run: load the inputs, stream
//! candidate batches, attribute them in parallel and write the tables.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use counter::Counter;
use derive_builder::Builder;
use itertools::Itertools;
use progress_logger::ProgressLogger;
use rayon::prelude::*;
use strum::IntoEnumIterator;

use crate::annotation::{self, GeneIndex};
use crate::candidates::{CandidateReader, ReaderCounters, VafWindow};
use crate::errors::SkipReason;
use crate::output;
use crate::reference;
use crate::signatures::SignatureMatrix;
use crate::variants::Mutation;

use super::aggregate::{AggregationStore, RunDictionaries, SampleName};
use super::{AttributionConfig, AttributionEngine};

/// Candidates are read in batches of this size and attributed in parallel.
const CANDIDATE_BATCH_SIZE: usize = 16_384;
/// Reference chromosomes kept in memory at once.
const REFERENCE_LRU_CAPACITY: usize = 4;

/// A complete attribution run. Built via [`AttributorBuilder`], driven by
/// [`process`](Attributor::process).
#[derive(Builder)]
#[builder(pattern = "owned")]
pub struct Attributor {
    /// VCF/BCF with candidate mutations; STDIN if `None`.
    candidates: Option<PathBuf>,
    reference: PathBuf,
    annotation: PathBuf,
    signatures: PathBuf,
    /// Destination of the aggregated table; STDOUT if `None`.
    output: Option<PathBuf>,
    #[builder(default)]
    spectrum_output: Option<PathBuf>,
    #[builder(default)]
    summary_output: Option<PathBuf>,
    #[builder(default)]
    min_depth: Option<u32>,
    #[builder(default)]
    vaf_windows: Vec<VafWindow>,
    upstream: u64,
    downstream: u64,
    #[builder(default)]
    keep_unassigned: bool,
    #[builder(default)]
    omit_sample_level: bool,
    #[builder(default)]
    log_each_record: bool,
}

/// Serializable account of one run, also used for the final log report.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub reader: ReaderCounters,
    /// Candidate mutations that contributed to the aggregation.
    pub attributed: u64,
    /// Attributed mutations without any overlapping gene.
    pub unassigned: u64,
    /// Skipped candidate mutations by reason.
    pub skipped: BTreeMap<String, u64>,
    pub per_sample_attributed: BTreeMap<SampleName, u64>,
    /// Rows in the final table.
    pub entries: u64,
    pub total_mass: f64,
}

/// Fold state of one worker: a store shard plus bookkeeping. Merging tallies
/// is commutative, which keeps the reduction independent of batch order.
#[derive(Default)]
struct BatchTally {
    store: AggregationStore,
    skips: Counter<SkipReason, u64>,
    attributed: u64,
    unassigned: u64,
    per_sample: HashMap<u32, u64>,
}

impl BatchTally {
    fn process(mut self, engine: &AttributionEngine, mutation: &Mutation) -> Self {
        match engine.process(mutation, &mut self.store) {
            Ok(n_genes) => {
                self.attributed += 1;
                *self.per_sample.entry(mutation.sample()).or_insert(0) += 1;
                if n_genes == 0 {
                    self.unassigned += 1;
                }
            }
            Err(reason) => {
                debug!(
                    "skipping {} at {}: {}",
                    mutation.kind(),
                    mutation.locus(),
                    reason
                );
                *self.skips.entry(reason).or_insert(0) += 1;
            }
        }
        self
    }

    fn merge(mut self, other: BatchTally) -> Self {
        self.store.merge(other.store);
        for (reason, count) in other.skips.into_map() {
            *self.skips.entry(reason).or_insert(0) += count;
        }
        self.attributed += other.attributed;
        self.unassigned += other.unassigned;
        for (sample, count) in other.per_sample {
            *self.per_sample.entry(sample).or_insert(0) += count;
        }
        self
    }
}

fn attribute_batch(engine: &AttributionEngine, batch: &[Mutation]) -> BatchTally {
    batch
        .par_iter()
        .fold(BatchTally::default, |tally, mutation| {
            tally.process(engine, mutation)
        })
        .reduce(BatchTally::default, BatchTally::merge)
}

impl Attributor {
    /// Run the attribution end to end and return the run summary.
    pub fn process(&mut self) -> Result<RunSummary> {
        let signatures = Arc::new(SignatureMatrix::from_path(&self.signatures)?);
        info!(
            "{} signatures loaded: {}",
            signatures.n_signatures(),
            signatures.names().iter().join(", ")
        );

        let gene_records = annotation::read_gene_table(&self.annotation)?;
        let gene_index = Arc::new(GeneIndex::build(
            &gene_records,
            self.upstream,
            self.downstream,
        )?);
        info!(
            "gene annotation covers {} genes in {} intervals (margins: {} upstream, {} downstream)",
            gene_index.n_genes(),
            gene_index.n_intervals(),
            self.upstream,
            self.downstream
        );

        let reference = reference::Buffer::from_path(&self.reference, REFERENCE_LRU_CAPACITY)?;

        let mut reader = CandidateReader::from_path(
            self.candidates.as_ref(),
            self.min_depth,
            self.vaf_windows.clone(),
            self.log_each_record,
        )?;
        if reader.samples().is_empty() {
            warn!("candidate file does not define any samples; no attributions will be produced");
        } else {
            info!("attributing mutations of {} sample(s)", reader.samples().len());
        }

        let dict = RunDictionaries::new(reader.samples().to_vec(), &gene_index, &signatures);
        let config = AttributionConfig {
            keep_unassigned: self.keep_unassigned,
            sample_level: !self.omit_sample_level,
        };
        let engine = AttributionEngine::new(Arc::clone(&signatures), Arc::clone(&gene_index), config);

        let mut progress = ProgressLogger::builder()
            .with_items_name("records")
            .with_frequency(Duration::from_secs(20))
            .start();

        let mut tally = BatchTally::default();
        let mut batch = Vec::with_capacity(CANDIDATE_BATCH_SIZE);
        loop {
            let more = reader.read_batch(&reference, &mut batch, CANDIDATE_BATCH_SIZE, &mut progress)?;
            tally = tally.merge(attribute_batch(&engine, &batch));
            batch.clear();
            if !more {
                break;
            }
        }
        progress.stop();

        self.finish(tally, reader.counters(), &dict)
    }

    fn finish(
        &self,
        tally: BatchTally,
        reader: ReaderCounters,
        dict: &RunDictionaries,
    ) -> Result<RunSummary> {
        let BatchTally {
            store,
            skips,
            attributed,
            unassigned,
            per_sample,
        } = tally;
        if attributed == 0 {
            warn!("no mutation could be attributed");
        }

        let total_mass = store.total_mass();
        let tables = store.finalize(dict);
        output::write_gsgp(tables.gsgp(), self.output.as_ref())?;
        if let Some(path) = &self.spectrum_output {
            output::write_spectrum(tables.spectrum(), path)?;
        }

        let skipped: BTreeMap<String, u64> = SkipReason::iter()
            .map(|reason| {
                let name: &'static str = reason.into();
                (name.to_owned(), skips.get(&reason).copied().unwrap_or(0))
            })
            .collect();
        let per_sample_attributed: BTreeMap<SampleName, u64> = per_sample
            .into_iter()
            .map(|(idx, count)| (dict.sample_label(idx).clone(), count))
            .collect();

        for (sample, count) in &per_sample_attributed {
            info!("{} mutation(s) of sample {} attributed", count, sample);
        }
        let total_skipped: u64 = skipped.values().sum();
        if total_skipped > 0 {
            info!(
                "{} mutation(s) skipped ({})",
                total_skipped,
                skipped
                    .iter()
                    .filter(|(_, count)| **count > 0)
                    .map(|(name, count)| format!("{}: {}", name, count))
                    .join(", ")
            );
        }

        let summary = RunSummary {
            reader,
            attributed,
            unassigned,
            skipped,
            per_sample_attributed,
            entries: tables.gsgp().len() as u64,
            total_mass,
        };
        info!(
            "{} table entries written, total attributed mass {:.4}",
            summary.entries, summary.total_mass
        );
        if let Some(path) = &self.summary_output {
            output::write_summary(&summary, path)?;
        }
        Ok(summary)
    }
}
