//! Derive the gene annotation table from an Ensembl or GENCODE style GTF.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use bio::io::gff;
use bio_types::strand::Strand;
use itertools::Itertools;

use super::GeneRecord;
use crate::errors::Error;

/// Counters describing one annotation preparation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GtfSummary {
    /// Non-comment lines seen.
    pub lines: u64,
    /// Gene records written.
    pub genes: u64,
    pub pseudogenes_skipped: u64,
    pub malformed_skipped: u64,
}

/// Scan a GTF stream and collect one record per gene body. Pseudogenes are
/// skipped unless `keep_pseudogenes` is set; `add_chr` prefixes chromosome
/// names with `chr` where missing. Malformed lines are counted and ignored.
pub fn scan_gtf<R: Read>(
    reader: R,
    keep_pseudogenes: bool,
    add_chr: bool,
) -> Result<(Vec<GeneRecord>, GtfSummary)> {
    let mut reader = gff::Reader::new(reader, gff::GffType::GTF2);
    let mut records = Vec::new();
    let mut summary = GtfSummary::default();
    for record in reader.records() {
        summary.lines += 1;
        let record = match record {
            Ok(record) => record,
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(_) => {
                summary.malformed_skipped += 1;
                continue;
            }
        };
        if record.feature_type() != "gene" {
            continue;
        }
        let gene_id = match record.attributes().get("gene_id") {
            Some(id) if !id.is_empty() => id,
            _ => {
                summary.malformed_skipped += 1;
                continue;
            }
        };
        // Ensembl writes gene_biotype, GENCODE gene_type
        let biotype = record
            .attributes()
            .get("gene_biotype")
            .or_else(|| record.attributes().get("gene_type"));
        if !keep_pseudogenes && biotype.map_or(false, |biotype| biotype.contains("pseudogene")) {
            summary.pseudogenes_skipped += 1;
            continue;
        }
        let (start, end) = (*record.start(), *record.end());
        if start == 0 || end < start {
            summary.malformed_skipped += 1;
            continue;
        }
        let strand = match record.strand() {
            Some(Strand::Forward) => '+',
            Some(Strand::Reverse) => '-',
            _ => {
                summary.malformed_skipped += 1;
                continue;
            }
        };
        let chromosome = if add_chr && !record.seqname().starts_with("chr") {
            format!("chr{}", record.seqname())
        } else {
            record.seqname().to_owned()
        };
        records.push(GeneRecord::new(
            chromosome,
            gene_id.clone(),
            start,
            end,
            strand,
        ));
        summary.genes += 1;
    }
    let records = records
        .into_iter()
        .sorted_by(|a, b| {
            (a.chromosome(), a.start(), a.end()).cmp(&(b.chromosome(), b.start(), b.end()))
        })
        .collect();
    Ok((records, summary))
}

/// Convert a GTF file into the gene annotation table understood by the
/// attribution subcommand, one row per gene body.
pub fn prepare_annotation<P: AsRef<Path>, Q: AsRef<Path>>(
    gtf: P,
    output: Q,
    keep_pseudogenes: bool,
    add_chr: bool,
) -> Result<GtfSummary> {
    let gtf = gtf.as_ref();
    let file = File::open(gtf).with_context(|| format!("unable to read GTF {}", gtf.display()))?;
    let (records, summary) = scan_gtf(file, keep_pseudogenes, add_chr)?;
    if records.is_empty() {
        return Err(Error::EmptyAnnotation {
            path: gtf.to_owned(),
        }
        .into());
    }
    let output = output.as_ref();
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(output)
        .with_context(|| format!("unable to write gene table {}", output.display()))?;
    for record in &records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    info!(
        "{} genes written to {} ({} pseudogenes skipped, {} malformed lines ignored)",
        summary.genes,
        output.display(),
        summary.pseudogenes_skipped,
        summary.malformed_skipped
    );
    Ok(summary)
}
