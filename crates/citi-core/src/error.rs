//! Error taxonomy for CITI record operations
//!
//! Every engine operation either succeeds or fails with exactly one
//! [`CitiError`]. The [`ErrorCode`] table gives each failure a stable integer
//! and description for callers on the far side of a language boundary.

use std::fmt;
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CitiError>;

/// Result of checking a record for completeness
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

// ============================================================================
// Error Types
// ============================================================================

/// Line-level grammar failures reported by the lexer and numeric decoder
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GrammarError {
    #[error("keyword `{0}` is not supported")]
    BadKeyword(String),
    #[error("malformed arguments for `{keyword}`: `{text}`")]
    BadArgument { keyword: &'static str, text: String },
    #[error("cannot parse `{0}` as a number")]
    BadNumber(String),
}

/// Ordering and uniqueness failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructureError {
    #[error("single use keyword `{0}` defined twice")]
    DefinedTwice(&'static str),
    #[error("keyword `{0}` is out of order")]
    OutOfOrder(&'static str),
    #[error("more rows or blocks in `{0}` than declared in the header")]
    ArrayOverIndex(&'static str),
    #[error("block opened by `{0}` is never closed")]
    Unterminated(&'static str),
    #[error("block opened by `{keyword}` has {found} rows but {expected} are declared")]
    ArrayUnderIndex {
        keyword: &'static str,
        expected: usize,
        found: usize,
    },
}

/// Completeness failures found when a record is validated
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("version is not defined")]
    NoVersion,
    #[error("name is not defined")]
    NoName,
    #[error("independent variable is not defined")]
    NoIndependentVariable,
    #[error("no data arrays are defined")]
    NoData,
    #[error("independent variable and data array {index} are different lengths ({expected} != {found})")]
    LengthMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
}

/// Which direction a record was travelling when validation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Read,
    Write,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Read => f.write_str("read"),
            Phase::Write => f.write_str("write"),
        }
    }
}

/// Error type for all CITI record operations
#[derive(Error, Debug)]
pub enum CitiError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("input is not valid UTF-8 text (first bad byte at offset {offset})")]
    Encoding { offset: usize },

    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    #[error("line {line}: {error}")]
    Grammar {
        line: usize,
        #[source]
        error: GrammarError,
    },

    #[error("{}{}", line_prefix(.line), .error)]
    Structure {
        line: Option<usize>,
        #[source]
        error: StructureError,
    },

    #[error("cannot {phase} record: {error}")]
    Invalid {
        phase: Phase,
        #[source]
        error: ValidationError,
    },

    #[error("index {index} is out of bounds for {collection} of length {len}")]
    IndexOutOfBounds {
        collection: &'static str,
        index: usize,
        len: usize,
    },
}

fn line_prefix(line: &Option<usize>) -> String {
    match line {
        Some(n) => format!("line {}: ", n),
        None => String::new(),
    }
}

impl CitiError {
    pub(crate) fn grammar(line: usize, error: GrammarError) -> Self {
        CitiError::Grammar { line, error }
    }

    pub(crate) fn structure(line: usize, error: StructureError) -> Self {
        CitiError::Structure {
            line: Some(line),
            error,
        }
    }

    pub(crate) fn invalid(phase: Phase, error: ValidationError) -> Self {
        CitiError::Invalid { phase, error }
    }

    pub(crate) fn out_of_bounds(collection: &'static str, index: usize, len: usize) -> Self {
        CitiError::IndexOutOfBounds {
            collection,
            index,
            len,
        }
    }

    /// Stable error code for this failure
    pub fn code(&self) -> ErrorCode {
        ErrorCode::from(self)
    }
}

// ============================================================================
// Stable Error Codes
// ============================================================================

/// Stable integer codes for every failure category.
///
/// Values are part of the C ABI and must never be renumbered.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoError = 0,
    Unknown = -1,
    InvalidArgument = -2,
    NullArgument = -3,
    InvalidUtf8 = -4,

    ReadNotFound = -5,
    ReadPermissionDenied = -6,
    ReadConnection = -7,
    ReadTimedOut = -8,
    ReadUnexpectedEof = -9,
    ReadInterrupted = -10,
    ReadOther = -11,

    WritePermissionDenied = -12,
    WriteNotFound = -13,
    WriteBrokenPipe = -14,
    WriteZero = -15,
    WriteInterrupted = -16,
    WriteOther = -17,

    BadKeyword = -18,
    BadArgument = -19,
    BadNumber = -20,

    DefinedTwice = -21,
    OutOfOrder = -22,
    ArrayOverIndex = -23,
    UnterminatedBlock = -24,

    ReadNoVersion = -25,
    ReadNoName = -26,
    ReadNoIndependentVariable = -27,
    ReadNoData = -28,
    ReadLengthMismatch = -29,

    WriteNoVersion = -30,
    WriteNoName = -31,
    WriteNoIndependentVariable = -32,
    WriteNoData = -33,
    WriteLengthMismatch = -34,

    IndexOutOfBounds = -35,
    NulByte = -36,
    ArrayUnderIndex = -37,
}

impl ErrorCode {
    /// Every code, in declaration order
    pub const ALL: [ErrorCode; 38] = [
        ErrorCode::NoError,
        ErrorCode::Unknown,
        ErrorCode::InvalidArgument,
        ErrorCode::NullArgument,
        ErrorCode::InvalidUtf8,
        ErrorCode::ReadNotFound,
        ErrorCode::ReadPermissionDenied,
        ErrorCode::ReadConnection,
        ErrorCode::ReadTimedOut,
        ErrorCode::ReadUnexpectedEof,
        ErrorCode::ReadInterrupted,
        ErrorCode::ReadOther,
        ErrorCode::WritePermissionDenied,
        ErrorCode::WriteNotFound,
        ErrorCode::WriteBrokenPipe,
        ErrorCode::WriteZero,
        ErrorCode::WriteInterrupted,
        ErrorCode::WriteOther,
        ErrorCode::BadKeyword,
        ErrorCode::BadArgument,
        ErrorCode::BadNumber,
        ErrorCode::DefinedTwice,
        ErrorCode::OutOfOrder,
        ErrorCode::ArrayOverIndex,
        ErrorCode::UnterminatedBlock,
        ErrorCode::ReadNoVersion,
        ErrorCode::ReadNoName,
        ErrorCode::ReadNoIndependentVariable,
        ErrorCode::ReadNoData,
        ErrorCode::ReadLengthMismatch,
        ErrorCode::WriteNoVersion,
        ErrorCode::WriteNoName,
        ErrorCode::WriteNoIndependentVariable,
        ErrorCode::WriteNoData,
        ErrorCode::WriteLengthMismatch,
        ErrorCode::IndexOutOfBounds,
        ErrorCode::NulByte,
        ErrorCode::ArrayUnderIndex,
    ];

    /// Integer value carried across the C ABI
    #[inline]
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Look up a code by its integer value
    pub fn from_code(code: i32) -> Option<ErrorCode> {
        ErrorCode::ALL.iter().copied().find(|c| c.code() == code)
    }

    /// Human readable description of the code
    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::NoError => "No error",
            ErrorCode::Unknown => "Unknown error",
            ErrorCode::InvalidArgument => "Function argument is empty or malformed",
            ErrorCode::NullArgument => "Function argument is null",
            ErrorCode::InvalidUtf8 => "Invalid UTF-8 character found in text",
            ErrorCode::ReadNotFound => "File not found for reading",
            ErrorCode::ReadPermissionDenied => "File permission denied for reading",
            ErrorCode::ReadConnection => "Connection to source failed while reading",
            ErrorCode::ReadTimedOut => "Read operation timed out",
            ErrorCode::ReadUnexpectedEof => "End of input was reached prematurely",
            ErrorCode::ReadInterrupted => "Read operation interrupted",
            ErrorCode::ReadOther => "Read failed due to an I/O error",
            ErrorCode::WritePermissionDenied => "File permission denied for writing",
            ErrorCode::WriteNotFound => "Destination directory not found for writing",
            ErrorCode::WriteBrokenPipe => "Pipe broken while writing",
            ErrorCode::WriteZero => "Sink accepted zero bytes while writing",
            ErrorCode::WriteInterrupted => "Write operation interrupted",
            ErrorCode::WriteOther => "Write failed due to a disk or other I/O error",
            ErrorCode::BadKeyword => "Keyword is not supported",
            ErrorCode::BadArgument => "Keyword arguments do not match the expected pattern",
            ErrorCode::BadNumber => "Unable to parse number",
            ErrorCode::DefinedTwice => "Single use keyword defined twice",
            ErrorCode::OutOfOrder => "Keyword is out of order",
            ErrorCode::ArrayOverIndex => "More rows or blocks than defined in header",
            ErrorCode::UnterminatedBlock => "Value block is never closed",
            ErrorCode::ReadNoVersion => "Record read error due to undefined version",
            ErrorCode::ReadNoName => "Record read error due to undefined name",
            ErrorCode::ReadNoIndependentVariable => {
                "Record read error due to undefined independent variable"
            }
            ErrorCode::ReadNoData => "Record read error due to no data arrays",
            ErrorCode::ReadLengthMismatch => {
                "Record read error due to different lengths for independent variable and data array"
            }
            ErrorCode::WriteNoVersion => "Record write error due to undefined version",
            ErrorCode::WriteNoName => "Record write error due to undefined name",
            ErrorCode::WriteNoIndependentVariable => {
                "Record write error due to undefined independent variable"
            }
            ErrorCode::WriteNoData => "Record write error due to no data arrays",
            ErrorCode::WriteLengthMismatch => {
                "Record write error due to different lengths for independent variable and data array"
            }
            ErrorCode::IndexOutOfBounds => "Index is outside of acceptable bounds",
            ErrorCode::NulByte => "An interior null byte was found in string",
            ErrorCode::ArrayUnderIndex => "Fewer rows than defined in header",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.code())
    }
}

fn read_io_code(kind: io::ErrorKind) -> ErrorCode {
    match kind {
        io::ErrorKind::NotFound => ErrorCode::ReadNotFound,
        io::ErrorKind::PermissionDenied => ErrorCode::ReadPermissionDenied,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected => ErrorCode::ReadConnection,
        io::ErrorKind::TimedOut => ErrorCode::ReadTimedOut,
        io::ErrorKind::UnexpectedEof => ErrorCode::ReadUnexpectedEof,
        io::ErrorKind::Interrupted => ErrorCode::ReadInterrupted,
        _ => ErrorCode::ReadOther,
    }
}

fn write_io_code(kind: io::ErrorKind) -> ErrorCode {
    match kind {
        io::ErrorKind::PermissionDenied => ErrorCode::WritePermissionDenied,
        io::ErrorKind::NotFound => ErrorCode::WriteNotFound,
        io::ErrorKind::BrokenPipe => ErrorCode::WriteBrokenPipe,
        io::ErrorKind::WriteZero => ErrorCode::WriteZero,
        io::ErrorKind::Interrupted => ErrorCode::WriteInterrupted,
        _ => ErrorCode::WriteOther,
    }
}

impl From<&CitiError> for ErrorCode {
    fn from(error: &CitiError) -> Self {
        match error {
            CitiError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            CitiError::Encoding { .. } => ErrorCode::InvalidUtf8,
            CitiError::Read(e) => read_io_code(e.kind()),
            CitiError::Write(e) => write_io_code(e.kind()),
            CitiError::Grammar { error, .. } => match error {
                GrammarError::BadKeyword(_) => ErrorCode::BadKeyword,
                GrammarError::BadArgument { .. } => ErrorCode::BadArgument,
                GrammarError::BadNumber(_) => ErrorCode::BadNumber,
            },
            CitiError::Structure { error, .. } => match error {
                StructureError::DefinedTwice(_) => ErrorCode::DefinedTwice,
                StructureError::OutOfOrder(_) => ErrorCode::OutOfOrder,
                StructureError::ArrayOverIndex(_) => ErrorCode::ArrayOverIndex,
                StructureError::Unterminated(_) => ErrorCode::UnterminatedBlock,
                StructureError::ArrayUnderIndex { .. } => ErrorCode::ArrayUnderIndex,
            },
            CitiError::Invalid { phase, error } => match (phase, error) {
                (Phase::Read, ValidationError::NoVersion) => ErrorCode::ReadNoVersion,
                (Phase::Read, ValidationError::NoName) => ErrorCode::ReadNoName,
                (Phase::Read, ValidationError::NoIndependentVariable) => {
                    ErrorCode::ReadNoIndependentVariable
                }
                (Phase::Read, ValidationError::NoData) => ErrorCode::ReadNoData,
                (Phase::Read, ValidationError::LengthMismatch { .. }) => {
                    ErrorCode::ReadLengthMismatch
                }
                (Phase::Write, ValidationError::NoVersion) => ErrorCode::WriteNoVersion,
                (Phase::Write, ValidationError::NoName) => ErrorCode::WriteNoName,
                (Phase::Write, ValidationError::NoIndependentVariable) => {
                    ErrorCode::WriteNoIndependentVariable
                }
                (Phase::Write, ValidationError::NoData) => ErrorCode::WriteNoData,
                (Phase::Write, ValidationError::LengthMismatch { .. }) => {
                    ErrorCode::WriteLengthMismatch
                }
            },
            CitiError::IndexOutOfBounds { .. } => ErrorCode::IndexOutOfBounds,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
