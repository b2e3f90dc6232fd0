//! Byte sources for the parser
//!
//! Files are memory mapped; any other source is read to the end. Either way
//! the bytes must be UTF-8 before the line reader sees them.

use crate::error::{CitiError, Result};
use crate::parser::parse_str;
use crate::record::Record;
use memmap2::Mmap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, instrument};

/// Decode raw bytes as text, reporting the offset of the first invalid byte
pub(crate) fn decode_text(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| CitiError::Encoding {
        offset: e.valid_up_to(),
    })
}

pub(crate) fn parse_bytes(bytes: &[u8]) -> Result<Record> {
    parse_str(decode_text(bytes)?)
}

/// Read and parse a CITI file from disk
#[instrument(skip_all, fields(path = %path.display()))]
pub(crate) fn read_path(path: &Path) -> Result<Record> {
    let file = File::open(path).map_err(CitiError::Read)?;
    let len = file.metadata().map_err(CitiError::Read)?.len();
    info!(bytes = len, "Opened CITI file");

    // mapping a zero-length file fails on some platforms
    if len == 0 {
        return parse_bytes(&[]);
    }

    let mmap = unsafe { Mmap::map(&file).map_err(CitiError::Read)? };
    let record = parse_bytes(&mmap)?;
    info!(data_arrays = record.data.len(), "Read complete");
    Ok(record)
}

/// Read a source to the end and parse it
pub(crate) fn read_source<R: Read>(source: &mut R) -> Result<Record> {
    let mut bytes = Vec::new();
    source.read_to_end(&mut bytes).map_err(CitiError::Read)?;
    parse_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::io;

    #[test]
    fn test_decode_text_reports_offset() {
        match decode_text(b"CITIFILE A.01.00\n\xff").unwrap_err() {
            CitiError::Encoding { offset } => assert_eq!(offset, 17),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_read_source() {
        let text = "CITIFILE A.01.00\nNAME A\nVAR FREQ MAG 1\nDATA S RI\nBEGIN\n1,2\nEND\n";
        let record = read_source(&mut text.as_bytes()).unwrap();
        assert_eq!(record.name, "A");
    }

    struct FailingSource;

    impl Read for FailingSource {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::TimedOut, "slow device"))
        }
    }

    #[test]
    fn test_source_failure_is_read_error() {
        let err = read_source(&mut FailingSource).unwrap_err();
        assert!(matches!(err, CitiError::Read(_)));
        assert_eq!(err.code(), ErrorCode::ReadTimedOut);
    }

    #[test]
    fn test_missing_file() {
        let err = read_path(Path::new("/nonexistent/dir/file.cti")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ReadNotFound);
    }
}
