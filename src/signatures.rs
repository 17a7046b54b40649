//! COSMIC style signature libraries: per signature weight distributions over
//! the 96 substitution classes.

use std::fs::File;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use getset::Getters;
use ndarray::{Array2, ArrayView1};

use crate::errors::Error;
use crate::spectrum::{SubstitutionClass, CATALOG, CLASS_COUNT};

/// Tolerance for the weight sum of each signature.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// A validated signature library: each signature assigns nonnegative weights
/// to all 96 substitution classes, summing to 1.
#[derive(Getters, Debug, Clone)]
pub struct SignatureMatrix {
    /// Signature names in library column order.
    #[getset(get = "pub")]
    names: Vec<String>,
    /// signatures x classes, class columns in canonical order
    weights: Array2<f64>,
}

impl SignatureMatrix {
    /// Validate and wrap a weight matrix with one row per signature and one
    /// column per substitution class in canonical order.
    pub fn new(names: Vec<String>, weights: Array2<f64>) -> Result<Self, Error> {
        let matrix = SignatureMatrix { names, weights };
        matrix.validate()?;
        Ok(matrix)
    }

    /// Read a signature library from a tab separated file: first column the
    /// class labels (`A[C>T]G` notation, any row order), remaining columns
    /// one signature each.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("unable to read signature library {}", path.display()))?;
        Self::from_reader(file)
            .with_context(|| format!("invalid signature library {}", path.display()))
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().delimiter(b'\t').from_reader(reader);
        let headers = reader.headers()?.clone();
        if headers.len() < 2 {
            return Err(Error::EmptySignatureLibrary.into());
        }
        let names: Vec<String> = headers
            .iter()
            .skip(1)
            .map(|name| name.trim().to_owned())
            .collect();
        let mut weights = Array2::zeros((names.len(), CLASS_COUNT));
        let mut seen = [false; CLASS_COUNT];
        for record in reader.records() {
            let record = record?;
            let class: SubstitutionClass = record[0].trim().parse()?;
            if seen[class.index()] {
                return Err(Error::DuplicateClassLabel {
                    label: class.to_string(),
                }
                .into());
            }
            seen[class.index()] = true;
            for (s, field) in record.iter().skip(1).enumerate() {
                let value: f64 = field.trim().parse().with_context(|| {
                    format!(
                        "invalid weight '{}' for class {} in signature {}",
                        field, class, names[s]
                    )
                })?;
                weights[[s, class.index()]] = value;
            }
        }
        let found = seen.iter().filter(|&&seen| seen).count();
        if found != CLASS_COUNT {
            return Err(Error::IncompleteSignatureLibrary { found }.into());
        }
        Ok(Self::new(names, weights)?)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.names.is_empty() {
            return Err(Error::EmptySignatureLibrary);
        }
        if self.weights.ncols() != CLASS_COUNT || self.weights.nrows() != self.names.len() {
            return Err(Error::IncompleteSignatureLibrary {
                found: self.weights.ncols(),
            });
        }
        for (s, name) in self.names.iter().enumerate() {
            let row = self.weights.row(s);
            for (c, &value) in row.iter().enumerate() {
                if !value.is_finite() || value < 0.0 {
                    return Err(Error::InvalidSignatureWeight {
                        signature: name.clone(),
                        class: CATALOG[c].to_string(),
                        value,
                    });
                }
            }
            let sum = row.sum();
            if !abs_diff_eq!(sum, 1.0, epsilon = WEIGHT_SUM_TOLERANCE) {
                return Err(Error::SignatureWeightSum {
                    signature: name.clone(),
                    sum,
                    tolerance: WEIGHT_SUM_TOLERANCE,
                });
            }
        }
        Ok(())
    }

    pub fn n_signatures(&self) -> usize {
        self.names.len()
    }

    pub fn weight(&self, signature: usize, class: SubstitutionClass) -> f64 {
        self.weights[[signature, class.index()]]
    }

    /// The weights all signatures assign to one class, in signature order.
    pub fn class_profile(&self, class: SubstitutionClass) -> ArrayView1<f64> {
        self.weights.column(class.index())
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Write as _;

    use ndarray::Array2;

    use super::*;

    /// Library text with two signatures: FLAT spreads its weight evenly,
    /// SPIKE puts everything on A[C>A]A.
    fn library_text() -> String {
        let mut text = "Type\tFLAT\tSPIKE\n".to_owned();
        for (i, class) in CATALOG.iter().enumerate() {
            let spike = if i == 0 { 1.0 } else { 0.0 };
            writeln!(text, "{}\t{}\t{}", class, 1.0 / 96.0, spike).unwrap();
        }
        text
    }

    #[test]
    fn test_load_library() {
        let matrix = SignatureMatrix::from_reader(library_text().as_bytes()).unwrap();
        assert_eq!(matrix.names(), &["FLAT".to_owned(), "SPIKE".to_owned()]);
        assert_eq!(matrix.n_signatures(), 2);

        let class = CATALOG[0];
        assert_relative_eq!(matrix.weight(0, class), 1.0 / 96.0);
        assert_relative_eq!(matrix.weight(1, class), 1.0);
        assert_eq!(
            matrix.class_profile(class).to_vec(),
            vec![1.0 / 96.0, 1.0]
        );
        assert_eq!(matrix.class_profile(CATALOG[95]).to_vec(), vec![1.0 / 96.0, 0.0]);
    }

    #[test]
    fn test_row_order_is_irrelevant() {
        let mut lines: Vec<String> = library_text().lines().map(String::from).collect();
        let header = lines.remove(0);
        lines.reverse();
        let shuffled = format!("{}\n{}\n", header, lines.join("\n"));
        let matrix = SignatureMatrix::from_reader(shuffled.as_bytes()).unwrap();
        assert_relative_eq!(matrix.weight(1, CATALOG[0]), 1.0);
    }

    #[test]
    fn test_reject_missing_class() {
        let mut lines: Vec<String> = library_text().lines().map(String::from).collect();
        lines.remove(1);
        let text = lines.join("\n");
        let err = SignatureMatrix::from_reader(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("95 of the 96"));
    }

    #[test]
    fn test_reject_duplicate_class() {
        let mut text = library_text();
        text.push_str("A[C>A]A\t0.0\t0.0\n");
        assert!(SignatureMatrix::from_reader(text.as_bytes()).is_err());
    }

    #[test]
    fn test_reject_unknown_label() {
        let text = library_text().replace("A[C>A]A", "A[C>A]Z");
        assert!(SignatureMatrix::from_reader(text.as_bytes()).is_err());
    }

    #[test]
    fn test_reject_library_without_signatures() {
        let text = "Type\nA[C>A]A\n";
        let err = SignatureMatrix::from_reader(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("no signature columns"));
    }

    #[test]
    fn test_reject_bad_weight_sum() {
        let mut text = "Type\tHALF\n".to_owned();
        for (i, class) in CATALOG.iter().enumerate() {
            let weight = if i == 0 { 0.5 } else { 0.0 };
            writeln!(text, "{}\t{}", class, weight).unwrap();
        }
        let err = SignatureMatrix::from_reader(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("sum to 0.5"));

        // a deviation within the tolerance is fine
        let mut weights = Array2::zeros((1, CLASS_COUNT));
        weights[[0, 0]] = 1.0 + 0.5e-6;
        assert!(SignatureMatrix::new(vec!["OK".to_owned()], weights).is_ok());
    }

    #[test]
    fn test_reject_negative_and_non_finite_weights() {
        let mut weights = Array2::zeros((1, CLASS_COUNT));
        weights[[0, 0]] = 1.5;
        weights[[0, 1]] = -0.5;
        let err = SignatureMatrix::new(vec!["BAD".to_owned()], weights).unwrap_err();
        assert!(matches!(err, Error::InvalidSignatureWeight { .. }));

        let mut weights = Array2::zeros((1, CLASS_COUNT));
        weights[[0, 0]] = f64::NAN;
        assert!(SignatureMatrix::new(vec!["NAN".to_owned()], weights).is_err());
    }

    #[test]
    fn test_reject_wrong_shape() {
        let weights = Array2::zeros((1, 95));
        let err = SignatureMatrix::new(vec!["S".to_owned()], weights).unwrap_err();
        assert!(matches!(err, Error::IncompleteSignatureLibrary { found: 95 }));
    }
}
