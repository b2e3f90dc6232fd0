//! C Foreign Function Interface (FFI) for the CITI record engine
//!
//! This module provides a C-compatible API for reading, editing and writing
//! CITI records from C, C++, and other languages that support C FFI.
//!
//! Conventions:
//! - Pointer-returning calls return null on failure.
//! - Integer-returning calls return a negative [`ErrorCode`] on failure.
//! - The code of the last failure on the calling thread is kept for
//!   [`citi_last_error_code`]; a successful call resets it to zero.
//! - Strings returned for a record stay valid until the next string-returning
//!   call on the same record or until the record is freed.

use citi_core::{CitiError, Complex64, DataArray, ErrorCode, IndependentVariable, Record};
use std::cell::Cell;
use std::ffi::{c_char, c_double, c_int, CStr, CString};
use std::ptr;
use std::slice;
use std::sync::OnceLock;
use tracing::debug;

// ============================================================================
// Opaque Types for C
// ============================================================================

/// Opaque handle to a Record
pub struct CitiRecord {
    inner: Record,
    scratch: CString,
}

impl CitiRecord {
    fn new(inner: Record) -> *mut CitiRecord {
        Box::into_raw(Box::new(CitiRecord {
            inner,
            scratch: CString::default(),
        }))
    }

    /// Copy `text` into the scratch buffer and lend it out
    fn lend(&mut self, text: &str) -> *const c_char {
        match CString::new(text) {
            Ok(s) => {
                self.scratch = s;
                succeed();
                self.scratch.as_ptr()
            }
            Err(_) => {
                set_last_error(ErrorCode::NulByte);
                ptr::null()
            }
        }
    }
}

// ============================================================================
// Error Reporting
// ============================================================================

thread_local! {
    static LAST_ERROR: Cell<c_int> = const { Cell::new(0) };
}

fn set_last_error(code: ErrorCode) -> c_int {
    LAST_ERROR.with(|last| last.set(code.code()));
    code.code()
}

fn succeed() {
    LAST_ERROR.with(|last| last.set(0));
}

fn fail(error: &CitiError) -> c_int {
    debug!(error = %error, "CITI call failed");
    set_last_error(ErrorCode::from(error))
}

/// Map an engine result onto the integer convention
fn status(result: citi_core::Result<()>) -> c_int {
    match result {
        Ok(()) => {
            succeed();
            0
        }
        Err(e) => fail(&e),
    }
}

/// Borrow a C string argument as UTF-8
unsafe fn arg<'a>(text: *const c_char) -> Result<&'a str, ErrorCode> {
    if text.is_null() {
        return Err(ErrorCode::NullArgument);
    }
    CStr::from_ptr(text)
        .to_str()
        .map_err(|_| ErrorCode::InvalidUtf8)
}

/// Borrow `len` doubles; a null pointer is accepted only for `len == 0`
unsafe fn doubles<'a>(values: *const c_double, len: usize) -> Result<&'a [f64], ErrorCode> {
    if len == 0 {
        return Ok(&[]);
    }
    if values.is_null() {
        return Err(ErrorCode::NullArgument);
    }
    Ok(slice::from_raw_parts(values, len))
}

unsafe fn handle<'a>(record: *mut CitiRecord) -> Result<&'a mut CitiRecord, ErrorCode> {
    record.as_mut().ok_or(ErrorCode::NullArgument)
}

fn count(len: usize) -> c_int {
    succeed();
    c_int::try_from(len).unwrap_or(c_int::MAX)
}

/// Code of the last failure on this thread, or 0
#[no_mangle]
pub extern "C" fn citi_last_error_code() -> c_int {
    LAST_ERROR.with(|last| last.get())
}

/// Static description of an error code. Unknown codes describe `Unknown`.
#[no_mangle]
pub extern "C" fn citi_error_description(code: c_int) -> *const c_char {
    static DESCRIPTIONS: OnceLock<Vec<(c_int, CString)>> = OnceLock::new();
    let table = DESCRIPTIONS.get_or_init(|| {
        ErrorCode::ALL
            .iter()
            .filter_map(|c| Some((c.code(), CString::new(c.description()).ok()?)))
            .collect()
    });
    let wanted = ErrorCode::from_code(code).unwrap_or(ErrorCode::Unknown).code();
    table
        .iter()
        .find(|(c, _)| *c == wanted)
        .map_or(ptr::null(), |(_, s)| s.as_ptr())
}

/// Install a `tracing` subscriber filtered by `RUST_LOG` (default `warn`).
///
/// Returns 0 when installed, 1 if a subscriber was already present.
#[no_mangle]
pub extern "C" fn citi_init_logging() -> c_int {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    match tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

// ============================================================================
// Record Creation and Destruction
// ============================================================================

/// Create an empty record. Must be released with [`citi_record_free`].
#[no_mangle]
pub extern "C" fn citi_record_new() -> *mut CitiRecord {
    succeed();
    CitiRecord::new(Record::new())
}

/// Read a CITI file and return a record handle.
#[no_mangle]
pub unsafe extern "C" fn citi_record_read(path: *const c_char) -> *mut CitiRecord {
    let path = match arg(path) {
        Ok(p) => p,
        Err(code) => {
            set_last_error(code);
            return ptr::null_mut();
        }
    };

    match citi_core::read(path) {
        Ok(record) => {
            succeed();
            CitiRecord::new(record)
        }
        Err(e) => {
            fail(&e);
            ptr::null_mut()
        }
    }
}

/// Free a record handle. Null is ignored.
#[no_mangle]
pub unsafe extern "C" fn citi_record_free(record: *mut CitiRecord) {
    if !record.is_null() {
        drop(Box::from_raw(record));
    }
}

/// Write a record to a file.
#[no_mangle]
pub unsafe extern "C" fn citi_record_write(record: *mut CitiRecord, path: *const c_char) -> c_int {
    let (r, path) = match (handle(record), arg(path)) {
        (Ok(r), Ok(p)) => (r, p),
        (Err(code), _) | (_, Err(code)) => return set_last_error(code),
    };
    status(r.inner.write(path))
}

/// Serialize a record to CITI text.
#[no_mangle]
pub unsafe extern "C" fn citi_record_to_string(record: *mut CitiRecord) -> *const c_char {
    let r = match handle(record) {
        Ok(r) => r,
        Err(code) => {
            set_last_error(code);
            return ptr::null();
        }
    };
    match r.inner.to_citi_string() {
        Ok(text) => r.lend(&text),
        Err(e) => {
            fail(&e);
            ptr::null()
        }
    }
}

// ============================================================================
// Header Accessors
// ============================================================================

/// Lend a string produced from the record, or null on a bad handle
unsafe fn lend_with<F>(record: *mut CitiRecord, get: F) -> *const c_char
where
    F: FnOnce(&Record) -> citi_core::Result<String>,
{
    let r = match handle(record) {
        Ok(r) => r,
        Err(code) => {
            set_last_error(code);
            return ptr::null();
        }
    };
    match get(&r.inner) {
        Ok(text) => r.lend(&text),
        Err(e) => {
            fail(&e);
            ptr::null()
        }
    }
}

/// Apply a fallible edit with one string argument
unsafe fn edit_with<F>(record: *mut CitiRecord, text: *const c_char, apply: F) -> c_int
where
    F: FnOnce(&mut Record, &str) -> citi_core::Result<()>,
{
    match (handle(record), arg(text)) {
        (Ok(r), Ok(text)) => status(apply(&mut r.inner, text)),
        (Err(code), _) | (_, Err(code)) => set_last_error(code),
    }
}

/// Read a length-like property, or a negative code on a bad handle
unsafe fn count_with<F>(record: *mut CitiRecord, get: F) -> c_int
where
    F: FnOnce(&Record) -> citi_core::Result<usize>,
{
    match handle(record) {
        Ok(r) => match get(&r.inner) {
            Ok(len) => count(len),
            Err(e) => fail(&e),
        },
        Err(code) => set_last_error(code),
    }
}

#[no_mangle]
pub unsafe extern "C" fn citi_record_get_version(record: *mut CitiRecord) -> *const c_char {
    lend_with(record, |r| Ok(r.version().to_string()))
}

#[no_mangle]
pub unsafe extern "C" fn citi_record_set_version(
    record: *mut CitiRecord,
    version: *const c_char,
) -> c_int {
    edit_with(record, version, Record::set_version)
}

#[no_mangle]
pub unsafe extern "C" fn citi_record_get_name(record: *mut CitiRecord) -> *const c_char {
    lend_with(record, |r| Ok(r.name().to_string()))
}

#[no_mangle]
pub unsafe extern "C" fn citi_record_set_name(record: *mut CitiRecord, name: *const c_char) -> c_int {
    edit_with(record, name, Record::set_name)
}

#[no_mangle]
pub unsafe extern "C" fn citi_record_comment_count(record: *mut CitiRecord) -> c_int {
    count_with(record, |r| Ok(r.comments().len()))
}

#[no_mangle]
pub unsafe extern "C" fn citi_record_get_comment(
    record: *mut CitiRecord,
    index: usize,
) -> *const c_char {
    lend_with(record, |r| r.comment(index).map(str::to_string))
}

#[no_mangle]
pub unsafe extern "C" fn citi_record_append_comment(
    record: *mut CitiRecord,
    comment: *const c_char,
) -> c_int {
    edit_with(record, comment, Record::append_comment)
}

// ============================================================================
// Device Accessors
// ============================================================================

#[no_mangle]
pub unsafe extern "C" fn citi_record_device_count(record: *mut CitiRecord) -> c_int {
    count_with(record, |r| Ok(r.devices().len()))
}

#[no_mangle]
pub unsafe extern "C" fn citi_record_get_device_name(
    record: *mut CitiRecord,
    index: usize,
) -> *const c_char {
    lend_with(record, |r| r.device(index).map(|d| d.name.clone()))
}

/// Append a device; returns its index or a negative error code.
#[no_mangle]
pub unsafe extern "C" fn citi_record_append_device(
    record: *mut CitiRecord,
    name: *const c_char,
) -> c_int {
    let (r, name) = match (handle(record), arg(name)) {
        (Ok(r), Ok(n)) => (r, n),
        (Err(code), _) | (_, Err(code)) => return set_last_error(code),
    };
    match r.inner.append_device(name) {
        Ok(index) => count(index),
        Err(e) => fail(&e),
    }
}

#[no_mangle]
pub unsafe extern "C" fn citi_record_device_entry_count(
    record: *mut CitiRecord,
    device: usize,
) -> c_int {
    count_with(record, |r| r.device(device).map(|d| d.entries.len()))
}

#[no_mangle]
pub unsafe extern "C" fn citi_record_get_device_entry(
    record: *mut CitiRecord,
    device: usize,
    entry: usize,
) -> *const c_char {
    lend_with(record, |r| r.device_entry(device, entry).map(str::to_string))
}

#[no_mangle]
pub unsafe extern "C" fn citi_record_append_device_entry(
    record: *mut CitiRecord,
    device: usize,
    entry: *const c_char,
) -> c_int {
    edit_with(record, entry, |r, entry| r.append_device_entry(device, entry))
}

// ============================================================================
// Independent Variable Accessors
// ============================================================================

/// The independent variable, or `InvalidArgument` when none is set
fn variable(record: &Record) -> citi_core::Result<&IndependentVariable> {
    record
        .independent_variable()
        .ok_or_else(|| CitiError::InvalidArgument("independent variable is not set".into()))
}

#[no_mangle]
pub unsafe extern "C" fn citi_record_get_independent_variable_name(
    record: *mut CitiRecord,
) -> *const c_char {
    lend_with(record, |r| variable(r).map(|v| v.name.clone()))
}

#[no_mangle]
pub unsafe extern "C" fn citi_record_get_independent_variable_format(
    record: *mut CitiRecord,
) -> *const c_char {
    lend_with(record, |r| variable(r).map(|v| v.format.clone()))
}

/// Number of values; 0 when no variable is set
#[no_mangle]
pub unsafe extern "C" fn citi_record_get_independent_variable_length(
    record: *mut CitiRecord,
) -> c_int {
    count_with(record, |r| Ok(r.independent_variable().map_or(0, |v| v.len())))
}

/// Copy up to `max_count` values into `out`; returns the number copied.
#[no_mangle]
pub unsafe extern "C" fn citi_record_copy_independent_variable(
    record: *mut CitiRecord,
    out: *mut c_double,
    max_count: usize,
) -> c_int {
    let r = match handle(record) {
        Ok(r) => r,
        Err(code) => return set_last_error(code),
    };
    if out.is_null() && max_count > 0 {
        return set_last_error(ErrorCode::NullArgument);
    }
    let values = r
        .inner
        .independent_variable()
        .map_or(&[][..], |v| v.values.as_slice());
    let n = values.len().min(max_count);
    if n > 0 {
        ptr::copy_nonoverlapping(values.as_ptr(), out, n);
    }
    count(n)
}

/// Set the independent variable. `values` may be null when `len` is 0.
#[no_mangle]
pub unsafe extern "C" fn citi_record_set_independent_variable(
    record: *mut CitiRecord,
    name: *const c_char,
    format: *const c_char,
    values: *const c_double,
    len: usize,
) -> c_int {
    let parts = (|| -> Result<_, ErrorCode> {
        Ok((handle(record)?, arg(name)?, arg(format)?, doubles(values, len)?))
    })();
    match parts {
        Ok((r, name, format, values)) => status(
            r.inner
                .set_independent_variable(IndependentVariable::new(name, format, values.to_vec())),
        ),
        Err(code) => set_last_error(code),
    }
}

// ============================================================================
// Data Array Accessors
// ============================================================================

#[no_mangle]
pub unsafe extern "C" fn citi_record_data_array_count(record: *mut CitiRecord) -> c_int {
    count_with(record, |r| Ok(r.data().len()))
}

#[no_mangle]
pub unsafe extern "C" fn citi_record_get_data_array_name(
    record: *mut CitiRecord,
    index: usize,
) -> *const c_char {
    lend_with(record, |r| r.data_array(index).map(|a| a.name.clone()))
}

#[no_mangle]
pub unsafe extern "C" fn citi_record_get_data_array_format(
    record: *mut CitiRecord,
    index: usize,
) -> *const c_char {
    lend_with(record, |r| r.data_array(index).map(|a| a.format.clone()))
}

#[no_mangle]
pub unsafe extern "C" fn citi_record_get_data_array_length(
    record: *mut CitiRecord,
    index: usize,
) -> c_int {
    count_with(record, |r| r.data_array(index).map(DataArray::len))
}

/// Copy up to `max_count` samples into separate real and imaginary buffers.
/// Returns the number copied.
#[no_mangle]
pub unsafe extern "C" fn citi_record_copy_data_array(
    record: *mut CitiRecord,
    index: usize,
    real: *mut c_double,
    imag: *mut c_double,
    max_count: usize,
) -> c_int {
    let r = match handle(record) {
        Ok(r) => r,
        Err(code) => return set_last_error(code),
    };
    if (real.is_null() || imag.is_null()) && max_count > 0 {
        return set_last_error(ErrorCode::NullArgument);
    }
    let array = match r.inner.data_array(index) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };
    let n = array.len().min(max_count);
    for (i, sample) in array.samples.iter().take(n).enumerate() {
        *real.add(i) = sample.re;
        *imag.add(i) = sample.im;
    }
    count(n)
}

/// Append a data array built from `len` real and imaginary parts.
#[no_mangle]
pub unsafe extern "C" fn citi_record_append_data_array(
    record: *mut CitiRecord,
    name: *const c_char,
    format: *const c_char,
    real: *const c_double,
    imag: *const c_double,
    len: usize,
) -> c_int {
    let parts = (|| -> Result<_, ErrorCode> {
        Ok((
            handle(record)?,
            arg(name)?,
            arg(format)?,
            doubles(real, len)?,
            doubles(imag, len)?,
        ))
    })();
    match parts {
        Ok((r, name, format, real, imag)) => {
            let samples = real
                .iter()
                .zip(imag)
                .map(|(&re, &im)| Complex64::new(re, im))
                .collect();
            status(
                r.inner
                    .append_data_array(DataArray::with_samples(name, format, samples)),
            )
        }
        Err(code) => set_last_error(code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(text: &str) -> CString {
        CString::new(text).unwrap()
    }

    unsafe fn text(ptr: *const c_char) -> String {
        assert!(!ptr.is_null());
        CStr::from_ptr(ptr).to_str().unwrap().to_string()
    }

    #[test]
    fn test_default_record() {
        unsafe {
            let record = citi_record_new();
            assert_eq!(text(citi_record_get_version(record)), "A.01.00");
            assert_eq!(text(citi_record_get_name(record)), "");
            assert_eq!(citi_record_comment_count(record), 0);
            assert_eq!(citi_record_device_count(record), 0);
            assert_eq!(citi_record_get_independent_variable_length(record), 0);
            assert_eq!(citi_record_data_array_count(record), 0);
            citi_record_free(record);
        }
    }

    #[test]
    fn test_null_handle() {
        unsafe {
            assert_eq!(
                citi_record_comment_count(ptr::null_mut()),
                ErrorCode::NullArgument.code()
            );
            assert!(citi_record_get_name(ptr::null_mut()).is_null());
            assert_eq!(citi_last_error_code(), ErrorCode::NullArgument.code());
            citi_record_free(ptr::null_mut());
        }
    }

    #[test]
    fn test_setters_and_bounds() {
        unsafe {
            let record = citi_record_new();
            assert_eq!(citi_record_set_name(record, c("MEMORY").as_ptr()), 0);
            assert_eq!(text(citi_record_get_name(record)), "MEMORY");
            assert_eq!(citi_last_error_code(), 0);

            assert_eq!(
                citi_record_set_name(record, c("").as_ptr()),
                ErrorCode::InvalidArgument.code()
            );

            assert_eq!(citi_record_append_comment(record, c("hello").as_ptr()), 0);
            assert_eq!(text(citi_record_get_comment(record, 0)), "hello");
            assert!(citi_record_get_comment(record, 1).is_null());
            assert_eq!(citi_last_error_code(), ErrorCode::IndexOutOfBounds.code());

            let device = citi_record_append_device(record, c("Device Name").as_ptr());
            assert_eq!(device, 0);
            citi_record_append_device_entry(record, 0, c("ASDF").as_ptr());
            citi_record_append_device_entry(record, 0, c("asdf").as_ptr());
            assert_eq!(citi_record_device_entry_count(record, 0), 2);
            assert_eq!(text(citi_record_get_device_entry(record, 0, 1)), "asdf");
            assert_eq!(
                citi_record_device_entry_count(record, 3),
                ErrorCode::IndexOutOfBounds.code()
            );
            citi_record_free(record);
        }
    }

    #[test]
    fn test_unset_variable_name_and_format() {
        unsafe {
            let record = citi_record_new();
            assert!(citi_record_get_independent_variable_name(record).is_null());
            assert_eq!(citi_last_error_code(), ErrorCode::InvalidArgument.code());

            assert_eq!(citi_record_set_name(record, c("MEMORY").as_ptr()), 0);
            assert!(citi_record_get_independent_variable_format(record).is_null());
            assert_eq!(citi_last_error_code(), ErrorCode::InvalidArgument.code());
            citi_record_free(record);
        }
    }

    #[test]
    fn test_variable_and_data_round_trip() {
        unsafe {
            let record = citi_record_new();
            citi_record_set_name(record, c("DATA").as_ptr());

            let freq = [1e9, 2e9, 3e9];
            assert_eq!(
                citi_record_set_independent_variable(
                    record,
                    c("FREQ").as_ptr(),
                    c("MAG").as_ptr(),
                    freq.as_ptr(),
                    freq.len()
                ),
                0
            );
            assert_eq!(
                citi_record_set_independent_variable(
                    record,
                    c("TIME").as_ptr(),
                    c("").as_ptr(),
                    ptr::null(),
                    0
                ),
                ErrorCode::DefinedTwice.code()
            );

            let re = [0.1, 0.2, 0.3];
            let im = [-0.1, -0.2, -0.3];
            assert_eq!(
                citi_record_append_data_array(
                    record,
                    c("S[1,1]").as_ptr(),
                    c("RI").as_ptr(),
                    re.as_ptr(),
                    im.as_ptr(),
                    re.len()
                ),
                0
            );

            let mut out = [0.0; 3];
            assert_eq!(
                citi_record_copy_independent_variable(record, out.as_mut_ptr(), out.len()),
                3
            );
            assert_eq!(out, freq);

            let mut out_re = [0.0; 2];
            let mut out_im = [0.0; 2];
            assert_eq!(
                citi_record_copy_data_array(
                    record,
                    0,
                    out_re.as_mut_ptr(),
                    out_im.as_mut_ptr(),
                    2
                ),
                2
            );
            assert_eq!(out_re, [0.1, 0.2]);
            assert_eq!(out_im, [-0.1, -0.2]);

            let serialized = text(citi_record_to_string(record));
            assert!(serialized.starts_with("CITIFILE A.01.00\nNAME DATA\nVAR FREQ MAG 3\n"));
            citi_record_free(record);
        }
    }

    #[test]
    fn test_read_missing_file() {
        unsafe {
            let record = citi_record_read(c("/nonexistent/file.cti").as_ptr());
            assert!(record.is_null());
            assert_eq!(citi_last_error_code(), ErrorCode::ReadNotFound.code());
        }
    }

    #[test]
    fn test_write_incomplete_record() {
        unsafe {
            let record = citi_record_new();
            let code = citi_record_write(record, c("/tmp/never-written.cti").as_ptr());
            assert_eq!(code, ErrorCode::WriteNoName.code());
            citi_record_free(record);
        }
    }

    #[test]
    fn test_error_descriptions() {
        for code in ErrorCode::ALL {
            let description = unsafe { text(citi_error_description(code.code())) };
            assert_eq!(description, code.description());
        }
        let unknown = unsafe { text(citi_error_description(12345)) };
        assert_eq!(unknown, ErrorCode::Unknown.description());
    }
}
