//! CITI Text File Writer

use crate::error::{CitiError, Phase, Result};
use crate::number::encode_f64;
use crate::record::Record;
use crate::types::*;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Fields written as a single whitespace-delimited token
fn check_token(what: &str, value: &str) -> Result<()> {
    if value.chars().any(char::is_whitespace) {
        return Err(CitiError::InvalidArgument(format!(
            "{} `{}` must be a single token to be written",
            what, value
        )));
    }
    Ok(())
}

/// Everything that can fail before the first byte is written
fn prepare(record: &Record) -> Result<()> {
    record
        .validate()
        .map_err(|e| CitiError::invalid(Phase::Write, e))?;

    check_token("version", &record.version)?;
    check_token("name", &record.name)?;
    for constant in &record.constants {
        check_token("constant name", &constant.name)?;
        check_token("constant value", &constant.value)?;
    }
    for device in &record.devices {
        check_token("device name", &device.name)?;
    }
    // device lines group by nearest name on read
    for pair in record.devices.windows(2) {
        if pair[0].name == pair[1].name {
            return Err(CitiError::InvalidArgument(format!(
                "neighbouring devices share the name `{}` and would merge on read",
                pair[0].name
            )));
        }
    }
    if let Some(variable) = &record.independent_variable {
        check_token("independent variable name", &variable.name)?;
        check_token("independent variable format", &variable.format)?;
    }
    for array in &record.data {
        check_token("data array name", &array.name)?;
        check_token("data array format", &array.format)?;
    }
    Ok(())
}

/// Write the header: version, name, comments, constants and devices
fn write_header<W: Write>(writer: &mut W, record: &Record) -> io::Result<()> {
    writeln!(writer, "{} {}", KW_CITIFILE, record.version)?;
    writeln!(writer, "{} {}", KW_NAME, record.name)?;

    for comment in &record.comments {
        writeln!(writer, "{}{}", COMMENT_MARKER, comment)?;
    }

    for constant in &record.constants {
        writeln!(writer, "{} {} {}", KW_CONSTANT, constant.name, constant.value)?;
    }

    for device in &record.devices {
        if device.entries.is_empty() {
            writeln!(writer, "{}{}", DEVICE_MARKER, device.name)?;
        }
        for entry in &device.entries {
            writeln!(writer, "{}{} {}", DEVICE_MARKER, device.name, entry)?;
        }
    }

    Ok(())
}

/// Write the `VAR` declaration and, when present, its value block
fn write_independent_variable<W: Write>(
    writer: &mut W,
    variable: &IndependentVariable,
    count: usize,
) -> io::Result<()> {
    if variable.format.is_empty() {
        writeln!(writer, "{} {} {}", KW_VAR, variable.name, count)?;
    } else {
        writeln!(
            writer,
            "{} {} {} {}",
            KW_VAR, variable.name, variable.format, count
        )?;
    }

    if variable.is_empty() {
        return Ok(());
    }

    writeln!(writer, "{}", KW_VAR_LIST_BEGIN)?;
    for &value in &variable.values {
        writeln!(writer, "{}", encode_f64(value))?;
    }
    writeln!(writer, "{}", KW_VAR_LIST_END)?;

    Ok(())
}

/// Write each data array declaration followed by its block
fn write_data_arrays<W: Write>(writer: &mut W, data: &[DataArray]) -> io::Result<()> {
    for array in data {
        writeln!(writer, "{} {} {}", KW_DATA, array.name, array.format)?;
        writeln!(writer, "{}", KW_BEGIN)?;
        for sample in &array.samples {
            writeln!(writer, "{},{}", encode_f64(sample.re), encode_f64(sample.im))?;
        }
        writeln!(writer, "{}", KW_END)?;
    }

    Ok(())
}

fn write_body<W: Write>(writer: &mut W, record: &Record) -> io::Result<()> {
    write_header(writer, record)?;
    if let Some(variable) = &record.independent_variable {
        write_independent_variable(writer, variable, record.point_count())?;
    }
    write_data_arrays(writer, &record.data)?;
    writer.flush()
}

// ============================================================================
// Main entry points
// ============================================================================

/// Serialize a record to any byte sink
///
/// The record is validated first; on failure nothing is written. Sink errors
/// after that point leave whatever was already written in place.
pub fn write_record<W: Write>(record: &Record, sink: &mut W) -> Result<()> {
    prepare(record)?;

    debug!(
        name = %record.name,
        points = record.point_count(),
        data_arrays = record.data.len(),
        "Writing record"
    );

    let mut writer = BufWriter::new(sink);
    write_body(&mut writer, record).map_err(CitiError::Write)
}

/// Serialize a record to a file, creating or truncating it
#[instrument(skip_all, fields(path = %path.display()))]
pub fn write_path(record: &Record, path: &Path) -> Result<()> {
    info!("Writing CITI file");

    prepare(record)?;

    let file = File::create(path).map_err(CitiError::Write)?;
    let mut writer = BufWriter::new(file);
    write_body(&mut writer, record).map_err(CitiError::Write)?;

    let bytes_written = std::fs::metadata(path).map_err(CitiError::Write)?.len();
    info!(bytes = bytes_written, "Write complete");

    Ok(())
}
