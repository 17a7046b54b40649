use std::fmt;

use derive_new::new;
use getset::{CopyGetters, Getters};
use strum_macros::Display;

/// Uppercased reference bases immediately around a variant position:
/// the 5' flank, the reference base itself and the 3' flank.
#[derive(new, CopyGetters, Debug, Clone, Copy, PartialEq, Eq)]
#[getset(get_copy = "pub")]
pub struct TriContext {
    flank5: u8,
    ref_base: u8,
    flank3: u8,
}

/// Coarse shape of a VCF allele pair. Only single nucleotide variants can be
/// assigned a substitution class; everything else is reported as skipped.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantKind {
    #[strum(serialize = "SNV")]
    Snv { ref_base: u8, alt_base: u8 },
    #[strum(serialize = "MNV")]
    Mnv,
    #[strum(serialize = "indel")]
    Indel,
    #[strum(serialize = "symbolic")]
    Symbolic,
}

impl VariantKind {
    pub fn of(ref_allele: &[u8], alt_allele: &[u8]) -> Self {
        if alt_allele
            .iter()
            .any(|c| matches!(c, b'<' | b'>' | b'[' | b']' | b'.'))
        {
            VariantKind::Symbolic
        } else if ref_allele.len() == 1 && alt_allele.len() == 1 {
            VariantKind::Snv {
                ref_base: ref_allele[0].to_ascii_uppercase(),
                alt_base: alt_allele[0].to_ascii_uppercase(),
            }
        } else if ref_allele.len() == alt_allele.len() {
            VariantKind::Mnv
        } else {
            VariantKind::Indel
        }
    }
}

/// A single candidate mutation, i.e. one VCF record allele pair tied to one
/// sample that carries it. Multisample records fan out into one `Mutation`
/// per carrier.
#[derive(new, Getters, CopyGetters, Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    #[getset(get_copy = "pub")]
    sample: u32,
    #[getset(get = "pub")]
    chrom: String,
    /// 1-based position as written in the VCF.
    #[getset(get_copy = "pub")]
    pos: u64,
    #[getset(get = "pub")]
    ref_allele: Vec<u8>,
    #[getset(get = "pub")]
    alt_allele: Vec<u8>,
    /// `None` if the contig is unknown to the reference or the position is
    /// too close to a contig boundary to have both flanks.
    #[getset(get_copy = "pub")]
    context: Option<TriContext>,
}

impl Mutation {
    pub fn kind(&self) -> VariantKind {
        VariantKind::of(&self.ref_allele, &self.alt_allele)
    }

    /// Locus in `CHROM:POS` notation for log messages.
    pub fn locus(&self) -> impl fmt::Display + '_ {
        Locus(self)
    }
}

struct Locus<'a>(&'a Mutation);

impl<'a> fmt::Display for Locus<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.0.chrom, self.0.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_kind() {
        assert_eq!(
            VariantKind::of(b"c", b"t"),
            VariantKind::Snv {
                ref_base: b'C',
                alt_base: b'T'
            }
        );
        assert_eq!(VariantKind::of(b"AT", b"GC"), VariantKind::Mnv);
        assert_eq!(VariantKind::of(b"A", b"AT"), VariantKind::Indel);
        assert_eq!(VariantKind::of(b"ATG", b"A"), VariantKind::Indel);
        assert_eq!(VariantKind::of(b"A", b"<DEL>"), VariantKind::Symbolic);
        assert_eq!(VariantKind::of(b"A", b"A[2:321682["), VariantKind::Symbolic);
    }

    #[test]
    fn test_locus_display() {
        let mutation = Mutation::new(0, "chr17".to_owned(), 7_577_120, b"C".to_vec(), b"A".to_vec(), None);
        assert_eq!(mutation.locus().to_string(), "chr17:7577120");
        assert_eq!(mutation.kind().to_string(), "SNV");
    }
}
