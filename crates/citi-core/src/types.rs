//! Common types and constants for CITI records

use crate::error::{CitiError, Result};
use num_complex::Complex64;

// ============================================================================
// Constants
// ============================================================================

/// Version written by records that were never given one
pub const DEFAULT_VERSION: &str = "A.01.00";

pub const KW_CITIFILE: &str = "CITIFILE";
pub const KW_NAME: &str = "NAME";
pub const KW_VAR: &str = "VAR";
pub const KW_CONSTANT: &str = "CONSTANT";
pub const KW_DATA: &str = "DATA";
pub const KW_SEG: &str = "SEG";
pub const KW_VAR_LIST_BEGIN: &str = "VAR_LIST_BEGIN";
pub const KW_VAR_LIST_END: &str = "VAR_LIST_END";
pub const KW_SEG_LIST_BEGIN: &str = "SEG_LIST_BEGIN";
pub const KW_SEG_LIST_END: &str = "SEG_LIST_END";
pub const KW_BEGIN: &str = "BEGIN";
pub const KW_END: &str = "END";

/// Leading character of a device line
pub const DEVICE_MARKER: char = '#';
/// Leading character of a comment line (non-standard, but common)
pub const COMMENT_MARKER: char = '!';

// ============================================================================
// Data Structures
// ============================================================================

/// A named group of raw instrument lines, e.g. `#NA REGISTER 1`
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub name: String,
    pub entries: Vec<String>,
}

impl Device {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
        }
    }

    /// Entry at `index`, or the bounds error
    #[inline]
    pub fn entry(&self, index: usize) -> Result<&str> {
        self.entries
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| CitiError::out_of_bounds("device entries", index, self.entries.len()))
    }
}

/// `CONSTANT <name> <value>` line; both parts are kept as written
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub name: String,
    pub value: String,
}

impl Constant {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// The swept parameter, e.g. `VAR FREQ MAG 201`
///
/// `format` is empty when the declaration carried no format token.
/// `values` is empty when the file declared the variable without a value block.
#[derive(Debug, Clone, PartialEq)]
pub struct IndependentVariable {
    pub name: String,
    pub format: String,
    pub values: Vec<f64>,
}

impl IndependentVariable {
    pub fn new(name: &str, format: &str, values: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            format: format.to_string(),
            values,
        }
    }

    /// Number of values
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A named complex array sampled against the independent variable
///
/// `format` (e.g. `RI`, `MA`, `DB`) is stored as a tag only; samples are
/// always real/imaginary pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct DataArray {
    pub name: String,
    pub format: String,
    pub samples: Vec<Complex64>,
}

impl DataArray {
    pub fn new(name: &str, format: &str) -> Self {
        Self::with_samples(name, format, Vec::new())
    }

    pub fn with_samples(name: &str, format: &str, samples: Vec<Complex64>) -> Self {
        Self {
            name: name.to_string(),
            format: format.to_string(),
            samples,
        }
    }

    /// Number of samples
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Real parts of all samples
    pub fn real(&self) -> Vec<f64> {
        self.samples.iter().map(|c| c.re).collect()
    }

    /// Imaginary parts of all samples
    pub fn imag(&self) -> Vec<f64> {
        self.samples.iter().map(|c| c.im).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_new_is_empty() {
        let device = Device::new("NA");
        assert_eq!(device.name, "NA");
        assert!(device.entries.is_empty());
    }

    #[test]
    fn test_device_entry_out_of_range_is_bounds_error() {
        let mut device = Device::new("NA");
        device.entries.push("REGISTER 1".into());
        assert_eq!(device.entry(0).unwrap(), "REGISTER 1");

        match device.entry(1).unwrap_err() {
            CitiError::IndexOutOfBounds {
                collection,
                index,
                len,
            } => {
                assert_eq!(collection, "device entries");
                assert_eq!(index, 1);
                assert_eq!(len, 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(
            Device::new("NA").entry(0).unwrap_err().code(),
            crate::error::ErrorCode::IndexOutOfBounds
        );
    }

    #[test]
    fn test_data_array_parts() {
        let array = DataArray::with_samples(
            "S[1,1]",
            "RI",
            vec![Complex64::new(1.0, -1.0), Complex64::new(2.0, -2.0)],
        );
        assert_eq!(array.len(), 2);
        assert_eq!(array.real(), vec![1.0, 2.0]);
        assert_eq!(array.imag(), vec![-1.0, -2.0]);
    }
}
