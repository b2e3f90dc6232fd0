//! Numeric token decoding and encoding
//!
//! Decoding is stateless and called once per token. Encoding writes the
//! shortest scientific representation that decodes back to the same bits.

use crate::error::{CitiError, GrammarError, Result};
use num_complex::Complex64;

/// Decode a single floating point token.
///
/// Finite-looking text that overflows to infinity is rejected; the literal
/// spellings `inf`/`NaN` written by [`encode_f64`] are accepted.
pub fn decode_f64(token: &str, line: usize) -> Result<f64> {
    let token = token.trim();
    let bad = || CitiError::grammar(line, GrammarError::BadNumber(token.to_string()));

    if token.is_empty() {
        return Err(bad());
    }

    let value: f64 = token.parse().map_err(|_| bad())?;
    if value.is_infinite() && !token.to_ascii_lowercase().contains("inf") {
        return Err(bad());
    }
    Ok(value)
}

/// Decode a real/imaginary token pair. No polar interpretation is applied.
#[inline]
pub fn decode_complex(real: &str, imag: &str, line: usize) -> Result<Complex64> {
    Ok(Complex64::new(
        decode_f64(real, line)?,
        decode_f64(imag, line)?,
    ))
}

/// Decode a non-negative integer count field
pub(crate) fn decode_count(token: &str) -> Option<usize> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Encode a value as upper-case scientific notation, e.g. `8.6303E-2`
#[inline]
pub fn encode_f64(value: f64) -> String {
    format!("{:E}", value)
}

/// Expand a `SEG first last count` row into evenly spaced values
pub fn linspace(first: f64, last: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![first],
        _ => {
            let delta = (last - first) / ((count - 1) as f64);
            (0..count).map(|i| first + (i as f64) * delta).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_decode_plain_and_exponential() {
        assert_eq!(decode_f64("100000", 1).unwrap(), 100000.0);
        assert_eq!(decode_f64("100E+6", 1).unwrap(), 100e6);
        assert_eq!(decode_f64("-1e-2", 1).unwrap(), -1e-2);
        assert_eq!(decode_f64("  0.23491E-3 ", 1).unwrap(), 0.23491e-3);
    }

    #[test]
    fn test_decode_rejects_text_and_empty() {
        for token in ["asdf", "", "   ", "1.2.3", "--1"] {
            let err = decode_f64(token, 4).unwrap_err();
            assert_eq!(err.code(), ErrorCode::BadNumber, "token {:?}", token);
        }
    }

    #[test]
    fn test_decode_rejects_overflow() {
        let err = decode_f64("1e999", 2).unwrap_err();
        match err {
            CitiError::Grammar { line, error } => {
                assert_eq!(line, 2);
                assert_eq!(error, GrammarError::BadNumber("1e999".into()));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_decode_accepts_encoded_specials() {
        assert_eq!(decode_f64(&encode_f64(f64::INFINITY), 1).unwrap(), f64::INFINITY);
        assert_eq!(
            decode_f64(&encode_f64(f64::NEG_INFINITY), 1).unwrap(),
            f64::NEG_INFINITY
        );
        assert!(decode_f64(&encode_f64(f64::NAN), 1).unwrap().is_nan());
    }

    #[test]
    fn test_decode_complex() {
        let c = decode_complex("8.6303E-2", " -8.98651E-1", 1).unwrap();
        assert_eq!(c, Complex64::new(0.86303e-1, -8.98651e-1));
        assert!(decode_complex("1.0", "x", 1).is_err());
    }

    #[test]
    fn test_decode_count() {
        assert_eq!(decode_count("201"), Some(201));
        assert_eq!(decode_count("0"), Some(0));
        assert_eq!(decode_count("-1"), None);
        assert_eq!(decode_count("2.0"), None);
        assert_eq!(decode_count(""), None);
    }

    #[test]
    fn test_encode_shape() {
        assert_eq!(encode_f64(1e9), "1E9");
        assert_eq!(encode_f64(-1e9), "-1E9");
        assert_eq!(encode_f64(0.86303e-1), "8.6303E-2");
        assert_eq!(encode_f64(0.0), "0E0");
    }

    #[test]
    fn test_encode_preserves_bits() {
        for value in [0.1, 1.0 / 3.0, -2.718281828459045, 5e-324, f64::MAX, -0.0] {
            let decoded = decode_f64(&encode_f64(value), 1).unwrap();
            assert_eq!(decoded.to_bits(), value.to_bits(), "value {}", value);
        }
    }

    #[test]
    fn test_linspace() {
        assert!(linspace(1.0, 2.0, 0).is_empty());
        assert_eq!(linspace(10.0, 20.0, 1), vec![10.0]);
        assert_eq!(linspace(1.0, 2.0, 2), vec![1.0, 2.0]);
        assert_eq!(linspace(2e9, 3e9, 3), vec![2e9, 2.5e9, 3e9]);
        assert_eq!(linspace(3e9, 2e9, 3), vec![3e9, 2.5e9, 2e9]);
    }
}
