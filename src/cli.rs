// Copyright 2021 The gsgp developers.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::path::PathBuf;

use anyhow::Result;
use itertools::Itertools;
use structopt::StructOpt;

use crate::annotation::gtf::prepare_annotation;
use crate::attribution::processor::AttributorBuilder;
use crate::candidates::parse_vaf_bounds;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "gsgp",
    about = "Attribute somatic mutational signatures per gene and sample (GSGP) from a VCF with candidate mutations.",
    setting = structopt::clap::AppSettings::ColoredHelp
)]
pub struct Gsgp {
    #[structopt(long, short, global = true, help = "Verbose log output.")]
    pub verbose: bool,
    #[structopt(subcommand)]
    pub command: Command,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    #[structopt(
        name = "attribute",
        about = "Classify candidate mutations into the 96 trinucleotide substitution classes, attribute signature probabilities and aggregate them per sample and gene.",
        setting = structopt::clap::AppSettings::ColoredHelp
    )]
    Attribute {
        #[structopt(
            parse(from_os_str),
            long,
            help = "VCF/BCF file with candidate mutations (if omitted, read from STDIN)."
        )]
        candidates: Option<PathBuf>,
        #[structopt(
            parse(from_os_str),
            long,
            help = "FASTA file with reference genome. Has to be indexed with samtools faidx."
        )]
        reference: PathBuf,
        #[structopt(
            parse(from_os_str),
            long,
            help = "Gene annotation table; generate it with the prepare-annotation subcommand."
        )]
        annotation: PathBuf,
        #[structopt(
            parse(from_os_str),
            long,
            help = "Signature library as TSV: first column substitution class labels like A[C>T]G, one further column per signature (COSMIC SBS format)."
        )]
        signatures: PathBuf,
        #[structopt(
            parse(from_os_str),
            long,
            help = "TSV file that shall contain the aggregated table (if omitted, write to STDOUT)."
        )]
        output: Option<PathBuf>,
        #[structopt(
            parse(from_os_str),
            long,
            help = "TSV file for per sample substitution class counts."
        )]
        spectrum_output: Option<PathBuf>,
        #[structopt(
            parse(from_os_str),
            long,
            help = "JSON file for run statistics."
        )]
        summary_output: Option<PathBuf>,
        #[structopt(
            long,
            default_value = "121925",
            help = "Bases by which gene intervals are extended beyond the transcription start (strand aware)."
        )]
        upstream: u64,
        #[structopt(
            long,
            default_value = "121388",
            help = "Bases by which gene intervals are extended beyond the gene end (strand aware)."
        )]
        downstream: u64,
        #[structopt(
            long,
            help = "Minimum FORMAT/DP a sample needs at a site to count as carrier."
        )]
        min_depth: Option<u32>,
        #[structopt(
            long,
            help = "VAF gates for carriers, derived from FORMAT/AD and FORMAT/DP: a single value is a minimum, multiple values pair up into closed windows."
        )]
        vaf: Vec<f64>,
        #[structopt(
            long,
            help = "Collect mutations without gene overlap under a none_gene bucket instead of dropping them."
        )]
        keep_unassigned: bool,
        #[structopt(long, help = "Do not accumulate the per sample totals bucket.")]
        omit_sample_level: bool,
        #[structopt(long, help = "Log every candidate record.")]
        log_each_record: bool,
        #[structopt(long, short = "t", default_value = "4", help = "Number of threads to use.")]
        threads: usize,
    },
    #[structopt(
        name = "prepare-annotation",
        about = "Derive the gene annotation table from an Ensembl or GENCODE GTF.",
        setting = structopt::clap::AppSettings::ColoredHelp
    )]
    PrepareAnnotation {
        #[structopt(parse(from_os_str), help = "GTF file with gene annotations.")]
        gtf: PathBuf,
        #[structopt(parse(from_os_str), help = "Path of the gene table to write.")]
        output: PathBuf,
        #[structopt(long, help = "Keep genes whose biotype is a pseudogene variant.")]
        keep_pseudogenes: bool,
        #[structopt(long, help = "Prefix chromosome names with chr where missing.")]
        add_chr: bool,
    },
}

pub fn run(opt: Gsgp) -> Result<()> {
    match opt.command {
        Command::Attribute {
            candidates,
            reference,
            annotation,
            signatures,
            output,
            spectrum_output,
            summary_output,
            upstream,
            downstream,
            min_depth,
            vaf,
            keep_unassigned,
            omit_sample_level,
            log_each_record,
            threads,
        } => {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build_global()?;
            let vaf_windows = parse_vaf_bounds(&vaf)?;
            if !vaf_windows.is_empty() {
                info!("VAF gates: {}", vaf_windows.iter().join(", "));
            }
            if let Some(min_depth) = min_depth {
                info!("depth gate: FORMAT/DP >= {}", min_depth);
            }
            let mut attributor = AttributorBuilder::default()
                .candidates(candidates)
                .reference(reference)
                .annotation(annotation)
                .signatures(signatures)
                .output(output)
                .spectrum_output(spectrum_output)
                .summary_output(summary_output)
                .min_depth(min_depth)
                .vaf_windows(vaf_windows)
                .upstream(upstream)
                .downstream(downstream)
                .keep_unassigned(keep_unassigned)
                .omit_sample_level(omit_sample_level)
                .log_each_record(log_each_record)
                .build()?;
            attributor.process()?;
            Ok(())
        }
        Command::PrepareAnnotation {
            gtf,
            output,
            keep_pseudogenes,
            add_chr,
        } => {
            prepare_annotation(&gtf, &output, keep_pseudogenes, add_chr)?;
            Ok(())
        }
    }
}
