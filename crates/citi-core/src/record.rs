//! In-memory CITI record and its mutation API

use crate::error::{CitiError, Result, StructureError, ValidationError, ValidationResult};
use crate::types::*;
use crate::{parser, reader, writer};
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

/// One CITI file: header metadata, instrument devices, the independent
/// variable and the data arrays sampled against it.
///
/// A record is either built empty and filled through the mutation calls, or
/// produced whole by a parse. It owns all of its children by value.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub(crate) version: String,
    pub(crate) name: String,
    pub(crate) comments: Vec<String>,
    pub(crate) constants: Vec<Constant>,
    pub(crate) devices: Vec<Device>,
    pub(crate) independent_variable: Option<IndependentVariable>,
    pub(crate) data: Vec<DataArray>,
}

impl Default for Record {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            name: String::new(),
            comments: Vec::new(),
            constants: Vec::new(),
            devices: Vec::new(),
            independent_variable: None,
            data: Vec::new(),
        }
    }
}

/// Reject strings that would not fit on one line
fn check_line(what: &str, value: &str) -> Result<()> {
    if value.contains(['\n', '\r']) {
        return Err(CitiError::InvalidArgument(format!(
            "{} must not contain a line break",
            what
        )));
    }
    Ok(())
}

/// Reject empty (or blank) strings and line breaks
fn check_required(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CitiError::InvalidArgument(format!("{} must not be empty", what)));
    }
    check_line(what, value)
}

fn lookup<'a, T>(items: &'a [T], collection: &'static str, index: usize) -> Result<&'a T> {
    items
        .get(index)
        .ok_or_else(|| CitiError::out_of_bounds(collection, index, items.len()))
}

impl Record {
    /// Empty record: default version, empty name, no children
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Header
    // ========================================================================

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn set_version(&mut self, version: &str) -> Result<()> {
        check_required("version", version)?;
        self.version = version.to_string();
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) -> Result<()> {
        check_required("name", name)?;
        self.name = name.to_string();
        Ok(())
    }

    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    pub fn comment(&self, index: usize) -> Result<&str> {
        lookup(&self.comments, "comments", index).map(String::as_str)
    }

    pub fn append_comment(&mut self, comment: &str) -> Result<()> {
        check_line("comment", comment)?;
        self.comments.push(comment.to_string());
        Ok(())
    }

    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    pub fn constant(&self, index: usize) -> Result<&Constant> {
        lookup(&self.constants, "constants", index)
    }

    pub fn append_constant(&mut self, name: &str, value: &str) -> Result<()> {
        check_required("constant name", name)?;
        check_required("constant value", value)?;
        self.constants.push(Constant::new(name, value));
        Ok(())
    }

    // ========================================================================
    // Devices
    // ========================================================================

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn device(&self, index: usize) -> Result<&Device> {
        lookup(&self.devices, "devices", index)
    }

    /// Open a new device section and return its index
    pub fn append_device(&mut self, name: &str) -> Result<usize> {
        check_required("device name", name)?;
        self.devices.push(Device::new(name));
        Ok(self.devices.len() - 1)
    }

    pub fn device_entry(&self, device: usize, entry: usize) -> Result<&str> {
        self.device(device)?.entry(entry)
    }

    pub fn append_device_entry(&mut self, device: usize, entry: &str) -> Result<()> {
        check_line("device entry", entry)?;
        let len = self.devices.len();
        let device = self
            .devices
            .get_mut(device)
            .ok_or_else(|| CitiError::out_of_bounds("devices", device, len))?;
        device.entries.push(entry.to_string());
        Ok(())
    }

    // ========================================================================
    // Independent variable
    // ========================================================================

    pub fn independent_variable(&self) -> Option<&IndependentVariable> {
        self.independent_variable.as_ref()
    }

    /// Set the independent variable. It can be set only once; use
    /// [`Record::take_independent_variable`] to replace it.
    pub fn set_independent_variable(&mut self, variable: IndependentVariable) -> Result<()> {
        check_required("independent variable name", &variable.name)?;
        check_line("independent variable format", &variable.format)?;
        if self.independent_variable.is_some() {
            return Err(CitiError::Structure {
                line: None,
                error: StructureError::DefinedTwice(KW_VAR),
            });
        }
        self.independent_variable = Some(variable);
        Ok(())
    }

    /// Remove and return the independent variable
    pub fn take_independent_variable(&mut self) -> Option<IndependentVariable> {
        self.independent_variable.take()
    }

    // ========================================================================
    // Data arrays
    // ========================================================================

    pub fn data(&self) -> &[DataArray] {
        &self.data
    }

    pub fn data_array(&self, index: usize) -> Result<&DataArray> {
        lookup(&self.data, "data arrays", index)
    }

    /// Append a data array. Its length is checked against the independent
    /// variable only when the record is validated.
    pub fn append_data_array(&mut self, array: DataArray) -> Result<()> {
        check_required("data array name", &array.name)?;
        check_required("data array format", &array.format)?;
        self.data.push(array);
        Ok(())
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Check that the record is complete and every data array has the
    /// expected length.
    ///
    /// With no independent-variable values, the first data array sets the
    /// expected length.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.version.is_empty() {
            return Err(ValidationError::NoVersion);
        }
        if self.name.is_empty() {
            return Err(ValidationError::NoName);
        }
        let variable = self
            .independent_variable
            .as_ref()
            .ok_or(ValidationError::NoIndependentVariable)?;
        let first = self.data.first().ok_or(ValidationError::NoData)?;

        let expected = if variable.is_empty() {
            first.len()
        } else {
            variable.len()
        };
        for (index, array) in self.data.iter().enumerate() {
            if array.len() != expected {
                return Err(ValidationError::LengthMismatch {
                    index,
                    expected,
                    found: array.len(),
                });
            }
        }
        Ok(())
    }

    /// Number of rows written after `VAR`
    pub(crate) fn point_count(&self) -> usize {
        match &self.independent_variable {
            Some(variable) if !variable.is_empty() => variable.len(),
            _ => self.data.first().map_or(0, DataArray::len),
        }
    }

    // ========================================================================
    // Reading and writing
    // ========================================================================

    /// Parse a CITI file from disk
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        reader::read_path(path.as_ref())
    }

    /// Parse a CITI record from any byte source
    pub fn from_reader<R: Read>(mut source: R) -> Result<Self> {
        reader::read_source(&mut source)
    }

    /// Write the record to a file, replacing it
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        writer::write_path(self, path.as_ref())
    }

    /// Write the record to any byte sink
    pub fn to_writer<W: Write>(&self, sink: &mut W) -> Result<()> {
        writer::write_record(self, sink)
    }

    /// Serialize the record to a string
    pub fn to_citi_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.to_writer(&mut buffer)?;
        // writer output is assembled from valid strings only
        String::from_utf8(buffer).map_err(|e| CitiError::Encoding {
            offset: e.utf8_error().valid_up_to(),
        })
    }
}

impl FromStr for Record {
    type Err = CitiError;

    fn from_str(text: &str) -> Result<Self> {
        parser::parse_str(text)
    }
}
