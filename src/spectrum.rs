//! The 96 class trinucleotide substitution spectrum that signature libraries
//! are defined over: six pyrimidine centered substitutions, each in sixteen
//! flanking base combinations.

use std::fmt;
use std::str::FromStr;

use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::errors::{Error, SkipReason};
use crate::variants::{Mutation, VariantKind};

/// Number of substitution classes a signature is defined over.
pub const CLASS_COUNT: usize = 96;

/// DNA complement. Bases other than A/C/G/T are returned unchanged; callers
/// validate canonical bases before complementing.
pub(crate) fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        other => other,
    }
}

/// Canonical base with its rank in class index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter)]
enum Base {
    A,
    C,
    G,
    T,
}

impl Base {
    fn from_u8(base: u8) -> Option<Self> {
        Some(match base {
            b'A' => Base::A,
            b'C' => Base::C,
            b'G' => Base::G,
            b'T' => Base::T,
            _ => return None,
        })
    }

    fn to_u8(self) -> u8 {
        match self {
            Base::A => b'A',
            Base::C => b'C',
            Base::G => b'G',
            Base::T => b'T',
        }
    }
}

/// One of the six pyrimidine centered base substitutions.
#[derive(
    Display, EnumString, EnumIter, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub enum Substitution {
    #[strum(serialize = "C>A")]
    CtoA,
    #[strum(serialize = "C>G")]
    CtoG,
    #[strum(serialize = "C>T")]
    CtoT,
    #[strum(serialize = "T>A")]
    TtoA,
    #[strum(serialize = "T>C")]
    TtoC,
    #[strum(serialize = "T>G")]
    TtoG,
}

impl Substitution {
    fn of(ref_base: u8, alt_base: u8) -> Option<Self> {
        Some(match (ref_base, alt_base) {
            (b'C', b'A') => Substitution::CtoA,
            (b'C', b'G') => Substitution::CtoG,
            (b'C', b'T') => Substitution::CtoT,
            (b'T', b'A') => Substitution::TtoA,
            (b'T', b'C') => Substitution::TtoC,
            (b'T', b'G') => Substitution::TtoG,
            _ => return None,
        })
    }

    pub fn ref_base(&self) -> u8 {
        match self {
            Substitution::CtoA | Substitution::CtoG | Substitution::CtoT => b'C',
            _ => b'T',
        }
    }

    pub fn alt_base(&self) -> u8 {
        match self {
            Substitution::CtoA | Substitution::TtoA => b'A',
            Substitution::CtoG | Substitution::TtoG => b'G',
            Substitution::CtoT | Substitution::TtoC => {
                if self.ref_base() == b'C' {
                    b'T'
                } else {
                    b'C'
                }
            }
        }
    }
}

/// A pyrimidine centered trinucleotide substitution class such as `A[C>T]G`.
///
/// The derived ordering matches the canonical class index: substitution major,
/// then 5' flank, then 3' flank, each in A < C < G < T order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubstitutionClass {
    substitution: Substitution,
    flank5: Base,
    flank3: Base,
}

impl SubstitutionClass {
    /// Build a class from a substitution and raw flanking bases. Returns
    /// `None` if a flank is not a canonical base.
    pub fn new(substitution: Substitution, flank5: u8, flank3: u8) -> Option<Self> {
        Some(SubstitutionClass {
            substitution,
            flank5: Base::from_u8(flank5)?,
            flank3: Base::from_u8(flank3)?,
        })
    }

    /// Position of this class in canonical order, in `0..CLASS_COUNT`.
    pub fn index(&self) -> usize {
        self.substitution as usize * 16 + self.flank5 as usize * 4 + self.flank3 as usize
    }

    /// Inverse of [`index`](SubstitutionClass::index).
    pub fn from_index(index: usize) -> Option<Self> {
        if index >= CLASS_COUNT {
            return None;
        }
        Some(SubstitutionClass {
            substitution: Substitution::iter().nth(index / 16)?,
            flank5: Base::iter().nth((index % 16) / 4)?,
            flank3: Base::iter().nth(index % 4)?,
        })
    }

    pub fn substitution(&self) -> Substitution {
        self.substitution
    }

    pub fn flank5(&self) -> u8 {
        self.flank5.to_u8()
    }

    pub fn flank3(&self) -> u8 {
        self.flank3.to_u8()
    }
}

impl fmt::Display for SubstitutionClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}[{}]{}",
            char::from(self.flank5.to_u8()),
            self.substitution,
            char::from(self.flank3.to_u8())
        )
    }
}

impl FromStr for SubstitutionClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidClassLabel {
            label: s.to_owned(),
        };
        let bytes = s.as_bytes();
        if bytes.len() != 7 || bytes[1] != b'[' || bytes[5] != b']' {
            return Err(invalid());
        }
        let substitution = Substitution::from_str(&s[2..5]).map_err(|_| invalid())?;
        SubstitutionClass::new(substitution, bytes[0], bytes[6]).ok_or_else(invalid)
    }
}

lazy_static! {
    /// All 96 classes in canonical order, i.e. `CATALOG[i].index() == i`.
    pub static ref CATALOG: Vec<SubstitutionClass> = Substitution::iter()
        .flat_map(|substitution| {
            Base::iter().flat_map(move |flank5| {
                Base::iter().map(move |flank3| SubstitutionClass {
                    substitution,
                    flank5,
                    flank3,
                })
            })
        })
        .collect();
}

/// Assign a mutation to its substitution class.
///
/// Only single nucleotide variants with canonical bases and a fully defined
/// trinucleotide context are classifiable; everything else yields the
/// [`SkipReason`] to report.
pub fn classify(mutation: &Mutation) -> Result<SubstitutionClass, SkipReason> {
    let (ref_base, alt_base) = match mutation.kind() {
        VariantKind::Snv { ref_base, alt_base } => (ref_base, alt_base),
        _ => return Err(SkipReason::UnsupportedVariant),
    };
    if Base::from_u8(ref_base).is_none() || Base::from_u8(alt_base).is_none() {
        return Err(SkipReason::InvalidMutation);
    }
    if ref_base == alt_base {
        return Err(SkipReason::InvalidMutation);
    }
    let context = mutation.context().ok_or(SkipReason::UnsupportedVariant)?;
    if Base::from_u8(context.flank5()).is_none() || Base::from_u8(context.flank3()).is_none() {
        return Err(SkipReason::UnsupportedVariant);
    }
    // METHOD: classes are pyrimidine centered. A purine reference base is
    // reverse complemented together with its flanks, which swaps the flank
    // roles: the complement of the 3' flank becomes the new 5' flank.
    let (substitution, flank5, flank3) = if ref_base == b'A' || ref_base == b'G' {
        (
            Substitution::of(complement(ref_base), complement(alt_base)),
            complement(context.flank3()),
            complement(context.flank5()),
        )
    } else {
        (
            Substitution::of(ref_base, alt_base),
            context.flank5(),
            context.flank3(),
        )
    };
    let substitution = substitution.ok_or(SkipReason::InvalidMutation)?;
    SubstitutionClass::new(substitution, flank5, flank3).ok_or(SkipReason::UnsupportedVariant)
}
