use std::path::PathBuf;

use strum_macros::{EnumIter, IntoStaticStr};
use thiserror::Error;

/// Errors that abort a run before or during configuration. Per-mutation
/// conditions are deliberately not represented here; those are counted as
/// [`SkipReason`]s instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("signature library defines no signature columns")]
    EmptySignatureLibrary,
    #[error("cannot parse substitution class label '{label}'")]
    InvalidClassLabel { label: String },
    #[error("substitution class {label} occurs more than once in the signature library")]
    DuplicateClassLabel { label: String },
    #[error("signature library defines {found} of the 96 substitution classes")]
    IncompleteSignatureLibrary { found: usize },
    #[error("signature {signature} has weight {value} for class {class}; weights must be finite and nonnegative")]
    InvalidSignatureWeight {
        signature: String,
        class: String,
        value: f64,
    },
    #[error("weights of signature {signature} sum to {sum}, expected 1 within a tolerance of {tolerance}")]
    SignatureWeightSum {
        signature: String,
        sum: f64,
        tolerance: f64,
    },
    #[error("gene annotation {path} contains no usable gene intervals")]
    EmptyAnnotation { path: PathBuf },
    #[error("invalid strand information '{value}', must be '+' or '-'")]
    InvalidStrandInfo { value: char },
    #[error("invalid interval for gene {gene} at {chrom}:{start}-{end}: start must be positive and not exceed end")]
    InvalidGeneInterval {
        gene: String,
        chrom: String,
        start: u64,
        end: u64,
    },
    #[error("gene annotation record at {chrom}:{start}-{end} does not define a gene identifier")]
    MissingGeneId {
        chrom: String,
        start: u64,
        end: u64,
    },
    #[error("VAF bounds must be a single minimum or pairs of window bounds, got {n} values")]
    UnpairedVafBounds { n: usize },
    #[error("invalid VAF window [{lower}, {upper}]: bounds must lie within [0, 1] and be ordered")]
    InvalidVafWindow { lower: f64, upper: f64 },
}

/// Reasons for excluding a single candidate mutation from attribution. These
/// never abort a run; they are counted per reason and reported in the summary.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    #[error("reference and alternate allele must be distinct single A/C/G/T bases")]
    InvalidMutation,
    #[error("unsupported variant type or undefined trinucleotide context")]
    UnsupportedVariant,
    #[error("substitution class has zero weight in every signature")]
    DegenerateClass,
}
