// Copyright 2021 The gsgp developers.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Signature attribution: turn each classified mutation into a normalized
//! probability vector over signatures and fan it out to overlapping genes.

pub mod aggregate;
pub mod processor;

use std::sync::Arc;

use derive_new::new;
use getset::Getters;
use ndarray::Array1;

use crate::annotation::GeneIndex;
use crate::errors::SkipReason;
use crate::signatures::SignatureMatrix;
use crate::spectrum::{self, SubstitutionClass};
use crate::variants::Mutation;

use self::aggregate::AggregationStore;

/// Switches that decide which extra rows the aggregation receives.
#[derive(Debug, Clone, Copy)]
pub struct AttributionConfig {
    /// Collect mutations without gene overlap under a `none_gene` bucket
    /// instead of dropping their gene level contribution.
    pub keep_unassigned: bool,
    /// Additionally accumulate every attributed mutation under a
    /// `sample_level` bucket, giving per sample totals independent of genes.
    pub sample_level: bool,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        AttributionConfig {
            keep_unassigned: false,
            sample_level: true,
        }
    }
}

/// The outcome of attributing a single mutation.
#[derive(new, Getters, Debug, Clone)]
#[getset(get = "pub")]
pub struct AttributionRecord {
    class: SubstitutionClass,
    /// Overlapping genes, deduplicated.
    genes: Vec<u32>,
    /// Probability per signature, in library order; sums to 1.
    probabilities: Array1<f64>,
}

/// Stateless core of the attribution. Shared across worker threads, with all
/// accumulation going through a per worker [`AggregationStore`].
pub struct AttributionEngine {
    signatures: Arc<SignatureMatrix>,
    genes: Arc<GeneIndex>,
    config: AttributionConfig,
    sample_level_gene: u32,
    unassigned_gene: u32,
}

impl AttributionEngine {
    pub fn new(
        signatures: Arc<SignatureMatrix>,
        genes: Arc<GeneIndex>,
        config: AttributionConfig,
    ) -> Self {
        let sample_level_gene = aggregate::sample_level_gene(genes.n_genes());
        let unassigned_gene = aggregate::unassigned_gene(genes.n_genes());
        AttributionEngine {
            signatures,
            genes,
            config,
            sample_level_gene,
            unassigned_gene,
        }
    }

    /// Classify a mutation and derive its attribution vector.
    pub fn attribute(&self, mutation: &Mutation) -> Result<AttributionRecord, SkipReason> {
        let class = spectrum::classify(mutation)?;
        let profile = self.signatures.class_profile(class);
        let total = profile.sum();
        if total <= 0.0 {
            return Err(SkipReason::DegenerateClass);
        }
        // METHOD: the vector is the library's class column normalized to sum
        // 1. Every overlapping gene receives the full vector, without
        // splitting mass between genes.
        let probabilities = profile.mapv(|weight| weight / total);
        let genes = self
            .genes
            .overlapping_genes(mutation.chrom(), mutation.pos());
        Ok(AttributionRecord::new(class, genes, probabilities))
    }

    /// Attribute one mutation and fold the result into `store`. Returns the
    /// number of overlapping genes, so callers can count unassigned
    /// mutations; skipped mutations leave the store untouched.
    pub fn process(
        &self,
        mutation: &Mutation,
        store: &mut AggregationStore,
    ) -> Result<usize, SkipReason> {
        let record = self.attribute(mutation)?;
        let sample = mutation.sample();
        store.record_class(sample, *record.class());
        for &gene in record.genes() {
            store.add_vector(sample, gene, record.probabilities());
        }
        if record.genes().is_empty() && self.config.keep_unassigned {
            store.add_vector(sample, self.unassigned_gene, record.probabilities());
        }
        if self.config.sample_level {
            store.add_vector(sample, self.sample_level_gene, record.probabilities());
        }
        Ok(record.genes().len())
    }
}
