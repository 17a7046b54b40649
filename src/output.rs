//! Writers for the aggregated table, the per sample spectrum and the run
//! summary.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::attribution::aggregate::{GsgpTable, SpectrumRecord};
use crate::attribution::processor::RunSummary;

fn writer(path: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("unable to create output file {}", path.display())
        })?)),
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

/// Write the aggregated table as TSV with columns `sample`, `gene`,
/// `signature` and `value`, to the given path or STDOUT.
pub fn write_gsgp(table: &GsgpTable, path: Option<&PathBuf>) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer(path)?);
    if table.is_empty() {
        writer.write_record(&["sample", "gene", "signature", "value"])?;
    }
    for record in table.records() {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the per sample substitution class counts as TSV.
pub fn write_spectrum<P: AsRef<Path>>(records: &[SpectrumRecord], path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .with_context(|| format!("unable to create spectrum output {}", path.display()))?;
    if records.is_empty() {
        writer.write_record(&["sample", "class", "count"])?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the run summary as pretty printed JSON.
pub fn write_summary<P: AsRef<Path>>(summary: &RunSummary, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("unable to create summary output {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, summary)?;
    writeln!(writer)?;
    Ok(())
}
