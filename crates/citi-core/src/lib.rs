//! # CITI Record Engine - Core Library
//!
//! A library for reading, editing and writing CITI (Common Instrumentation
//! Transfer and Interchange) files, the line-oriented text format network
//! analyzers use for swept measurement data.
//!
//! ## Features
//!
//! - Grammar-aware parser with line-numbered errors
//! - Memory-mapped file I/O for large measurement files
//! - `SEG_LIST` expansion and display-memory files without a value block
//! - Serializer whose output parses back to an equal record
//! - Stable integer error codes for callers across a language boundary
//! - Structured logging via `tracing` for diagnostics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! let record = citi_core::read("measurement.cti").unwrap();
//! println!("Name: {}", record.name());
//!
//! if let Some(freq) = record.independent_variable() {
//!     println!("{}: {} points", freq.name, freq.len());
//! }
//!
//! for array in record.data() {
//!     println!("{} ({}): {} samples", array.name, array.format, array.len());
//! }
//! ```
//!
//! ## Building a Record
//!
//! ```rust
//! use citi_core::{Complex64, DataArray, IndependentVariable, Record};
//!
//! let mut record = Record::new();
//! record.set_name("MEMORY").unwrap();
//! record
//!     .set_independent_variable(IndependentVariable::new("FREQ", "MAG", vec![1e9, 2e9]))
//!     .unwrap();
//! record
//!     .append_data_array(DataArray::with_samples(
//!         "S[1,1]",
//!         "RI",
//!         vec![Complex64::new(0.5, 0.1), Complex64::new(0.4, 0.2)],
//!     ))
//!     .unwrap();
//!
//! let text = record.to_citi_string().unwrap();
//! assert!(text.starts_with("CITIFILE A.01.00\nNAME MEMORY\n"));
//! ```
//!
//! ## Enabling Logging
//!
//! This library uses `tracing` for structured logging. To see log output,
//! initialize a tracing subscriber in your application:
//!
//! ```rust,ignore
//! // Add tracing-subscriber to your Cargo.toml
//! tracing_subscriber::fmt::init();
//!
//! // Now library logs will be visible
//! let record = citi_core::read("measurement.cti").unwrap();
//! ```

mod error;
mod lexer;
mod number;
mod parser;
mod reader;
mod record;
mod types;
mod writer;

// Re-export public types
pub use error::{
    CitiError, ErrorCode, GrammarError, Phase, Result, StructureError, ValidationError,
    ValidationResult,
};
pub use record::Record;
pub use types::{
    Constant, DataArray, Device, IndependentVariable, COMMENT_MARKER, DEFAULT_VERSION,
    DEVICE_MARKER,
};

// Re-export the line-level building blocks
pub use lexer::{classify, Line, LineReader};
pub use number::{decode_complex, decode_f64, encode_f64, linspace};

pub use num_complex::Complex64;

// ============================================================================
// Public API Functions
// ============================================================================

/// Read a CITI file.
///
/// # Arguments
/// * `path` - Path to the CITI file (.cti, .citi)
///
/// # Returns
/// * `Ok(Record)` - Parsed and validated record
/// * `Err(CitiError)` - If the file cannot be read or parsed
pub fn read<P: AsRef<std::path::Path>>(path: P) -> Result<Record> {
    Record::read(path)
}

/// Write a record to a CITI file.
///
/// # Arguments
/// * `record` - Record to write; it must pass [`Record::validate`]
/// * `path` - Output path, created or truncated
pub fn write<P: AsRef<std::path::Path>>(record: &Record, path: P) -> Result<()> {
    record.write(path)
}

/// Parse a CITI record from text already in memory
pub fn parse(text: &str) -> Result<Record> {
    parser::parse_str(text)
}
