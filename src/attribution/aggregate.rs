// Copyright 2021 The gsgp developers.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Sharded accumulation of attribution mass and its conversion into the
//! final, label resolved tables.

use std::collections::HashMap;
use std::fmt;

use derefable::Derefable;
use derive_new::new;
use getset::Getters;
use ndarray::Array1;

use crate::annotation::GeneIndex;
use crate::signatures::SignatureMatrix;
use crate::spectrum::{SubstitutionClass, CATALOG};

/// Bucket label for per sample totals.
pub const SAMPLE_LEVEL_LABEL: &str = "sample_level";
/// Bucket label for mutations without gene overlap.
pub const UNASSIGNED_LABEL: &str = "none_gene";

/// Dense id of the `sample_level` bucket given the number of annotated genes.
pub fn sample_level_gene(n_genes: usize) -> u32 {
    n_genes as u32
}

/// Dense id of the `none_gene` bucket given the number of annotated genes.
pub fn unassigned_gene(n_genes: usize) -> u32 {
    n_genes as u32 + 1
}

/// A VCF sample name.
#[derive(
    Derefable, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SampleName(#[deref] String);

impl SampleName {
    pub fn new(name: String) -> Self {
        SampleName(name)
    }
}

impl fmt::Display for SampleName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for SampleName {
    fn from(name: &str) -> Self {
        SampleName(name.to_owned())
    }
}

/// Accumulated attribution mass, keyed by dense (sample, gene, signature)
/// ids, together with per sample substitution class counts. Worker threads
/// each fill their own store; merging is commutative, so the combined result
/// does not depend on processing order.
#[derive(Debug, Default)]
pub struct AggregationStore {
    mass: HashMap<(u32, u32, u32), f64>,
    spectrum: HashMap<(u32, usize), u64>,
}

impl AggregationStore {
    pub fn add(&mut self, sample: u32, gene: u32, signature: u32, amount: f64) {
        *self.mass.entry((sample, gene, signature)).or_insert(0.0) += amount;
    }

    /// Add one attribution vector for the given gene bucket, touching only
    /// signatures with positive probability so that absent combinations stay
    /// absent instead of materializing as zero rows.
    pub fn add_vector(&mut self, sample: u32, gene: u32, probabilities: &Array1<f64>) {
        for (signature, &probability) in probabilities.iter().enumerate() {
            if probability > 0.0 {
                self.add(sample, gene, signature as u32, probability);
            }
        }
    }

    pub fn record_class(&mut self, sample: u32, class: SubstitutionClass) {
        *self.spectrum.entry((sample, class.index())).or_insert(0) += 1;
    }

    pub fn merge(&mut self, other: AggregationStore) {
        for (key, value) in other.mass {
            *self.mass.entry(key).or_insert(0.0) += value;
        }
        for (key, count) in other.spectrum {
            *self.spectrum.entry(key).or_insert(0) += count;
        }
    }

    pub fn mass(&self, sample: u32, gene: u32, signature: u32) -> f64 {
        self.mass
            .get(&(sample, gene, signature))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn class_count(&self, sample: u32, class: SubstitutionClass) -> u64 {
        self.spectrum
            .get(&(sample, class.index()))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_mass(&self) -> f64 {
        self.mass.values().sum()
    }

    pub fn len(&self) -> usize {
        self.mass.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mass.is_empty() && self.spectrum.is_empty()
    }

    /// Resolve dense ids into labels and emit deterministically sorted
    /// tables. Must only be called once all mutations have been processed.
    pub fn finalize(self, dict: &RunDictionaries) -> FinalizedTables {
        let mut entries: Vec<((u32, u32, u32), f64)> = self.mass.into_iter().collect();
        entries.sort_by(|((s1, g1, c1), _), ((s2, g2, c2), _)| {
            (s1, dict.gene_label(*g1), c1).cmp(&(s2, dict.gene_label(*g2), c2))
        });
        let records = entries
            .into_iter()
            .map(|((sample, gene, signature), value)| {
                GsgpRecord::new(
                    dict.sample_label(sample).clone(),
                    dict.gene_label(gene).to_owned(),
                    dict.signature_label(signature).to_owned(),
                    value,
                )
            })
            .collect();

        let mut spectrum: Vec<((u32, usize), u64)> = self.spectrum.into_iter().collect();
        spectrum.sort_unstable();
        let spectrum = spectrum
            .into_iter()
            .map(|((sample, class), count)| {
                SpectrumRecord::new(
                    dict.sample_label(sample).clone(),
                    CATALOG[class].to_string(),
                    count,
                )
            })
            .collect();

        FinalizedTables {
            gsgp: GsgpTable { records },
            spectrum,
        }
    }
}

/// Label dictionaries of one run: sample names in VCF header order, gene
/// names in annotation order followed by the two reserved buckets, signature
/// names in library order.
#[derive(Getters, Debug)]
#[getset(get = "pub")]
pub struct RunDictionaries {
    samples: Vec<SampleName>,
    genes: Vec<String>,
    signatures: Vec<String>,
}

impl RunDictionaries {
    pub fn new(
        samples: Vec<SampleName>,
        gene_index: &GeneIndex,
        signatures: &SignatureMatrix,
    ) -> Self {
        let mut genes = gene_index.genes().clone();
        debug_assert_eq!(sample_level_gene(gene_index.n_genes()) as usize, genes.len());
        genes.push(SAMPLE_LEVEL_LABEL.to_owned());
        genes.push(UNASSIGNED_LABEL.to_owned());
        RunDictionaries {
            samples,
            genes,
            signatures: signatures.names().clone(),
        }
    }

    pub fn sample_label(&self, idx: u32) -> &SampleName {
        &self.samples[idx as usize]
    }

    pub fn gene_label(&self, idx: u32) -> &str {
        &self.genes[idx as usize]
    }

    pub fn signature_label(&self, idx: u32) -> &str {
        &self.signatures[idx as usize]
    }
}

/// One row of the final gene signature table.
#[derive(new, Getters, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[getset(get = "pub")]
pub struct GsgpRecord {
    sample: SampleName,
    gene: String,
    signature: String,
    value: f64,
}

/// The final table, sorted by sample, gene label and signature.
#[derive(new, Getters, Debug, Default)]
pub struct GsgpTable {
    #[getset(get = "pub")]
    records: Vec<GsgpRecord>,
}

impl GsgpTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_value(&self) -> f64 {
        self.records.iter().map(|record| record.value()).sum()
    }
}

/// One row of the per sample substitution class spectrum.
#[derive(new, Getters, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[getset(get = "pub")]
pub struct SpectrumRecord {
    sample: SampleName,
    class: String,
    count: u64,
}

/// Everything [`AggregationStore::finalize`] produces.
#[derive(Getters, Debug)]
#[getset(get = "pub")]
pub struct FinalizedTables {
    gsgp: GsgpTable,
    spectrum: Vec<SpectrumRecord>,
}
