//! CITI record builder
//!
//! Consumes classified lines strictly in file order and applies one handler
//! per keyword. Any line-level or ordering failure aborts the whole parse;
//! there is no partial record.

use crate::error::{CitiError, Phase, Result, StructureError, ValidationError};
use crate::lexer::{Line, LineReader};
use crate::number::linspace;
use crate::record::Record;
use crate::types::*;
use tracing::debug;

/// States of the builder
#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Header,
    VarList,
    SegList,
    Data,
}

impl State {
    /// Keyword that opened the current block
    fn opening_keyword(self) -> &'static str {
        match self {
            State::Header => KW_CITIFILE,
            State::VarList => KW_VAR_LIST_BEGIN,
            State::SegList => KW_SEG_LIST_BEGIN,
            State::Data => KW_BEGIN,
        }
    }
}

/// Record under construction plus the bookkeeping the grammar needs
#[derive(Debug)]
struct RecordBuilder {
    version: Option<String>,
    name: Option<String>,
    comments: Vec<String>,
    constants: Vec<Constant>,
    devices: Vec<Device>,
    independent_variable: Option<IndependentVariable>,
    data: Vec<DataArray>,
    state: State,
    /// Row count from the `VAR` declaration
    declared_count: usize,
    /// Whether a `VAR_LIST` or `SEG_LIST` block has been read
    values_read: bool,
    /// `SEG` rows, expanded only once the data rows back them
    segments: Vec<(f64, f64, usize)>,
    segment_rows: usize,
    /// Index of the data array the next `BEGIN` block fills
    next_block: usize,
    /// Line that opened the current block
    block_line: usize,
}

impl RecordBuilder {
    fn new() -> Self {
        Self {
            version: None,
            name: None,
            comments: Vec::new(),
            constants: Vec::new(),
            devices: Vec::new(),
            independent_variable: None,
            data: Vec::new(),
            state: State::Header,
            declared_count: 0,
            values_read: false,
            segments: Vec::new(),
            segment_rows: 0,
            next_block: 0,
            block_line: 0,
        }
    }

    fn process(&mut self, number: usize, line: Line) -> Result<()> {
        match self.state {
            State::Header => self.header(number, line),
            State::VarList => self.var_list(number, line),
            State::SegList => self.seg_list(number, line),
            State::Data => self.data_block(number, line),
        }
    }

    fn open_block(&mut self, number: usize, state: State) {
        self.state = state;
        self.block_line = number;
    }

    fn header(&mut self, number: usize, line: Line) -> Result<()> {
        let keyword = line.keyword();
        match line {
            Line::Version(version) => {
                if self.version.is_some() {
                    return Err(CitiError::structure(number, StructureError::DefinedTwice(keyword)));
                }
                self.version = Some(version);
            }
            Line::Name(name) => {
                if self.name.is_some() {
                    return Err(CitiError::structure(number, StructureError::DefinedTwice(keyword)));
                }
                self.name = Some(name);
            }
            Line::Comment(comment) => self.comments.push(comment),
            Line::Constant { name, value } => self.constants.push(Constant { name, value }),
            Line::Device { name, entry } => {
                let continues_last = self.devices.last().is_some_and(|d| d.name == name);
                if !continues_last {
                    self.devices.push(Device::new(&name));
                }
                if let (Some(entry), Some(device)) = (entry, self.devices.last_mut()) {
                    device.entries.push(entry);
                }
            }
            Line::Var {
                name,
                format,
                count,
            } => {
                if self.independent_variable.is_some() {
                    return Err(CitiError::structure(number, StructureError::DefinedTwice(keyword)));
                }
                self.independent_variable = Some(IndependentVariable {
                    name,
                    format: format.unwrap_or_default(),
                    values: Vec::new(),
                });
                self.declared_count = count;
            }
            Line::VarListBegin | Line::SegListBegin => {
                if self.independent_variable.is_none() {
                    return Err(CitiError::structure(number, StructureError::OutOfOrder(keyword)));
                }
                if self.values_read {
                    return Err(CitiError::structure(number, StructureError::DefinedTwice(keyword)));
                }
                let state = if matches!(line, Line::VarListBegin) {
                    State::VarList
                } else {
                    State::SegList
                };
                self.open_block(number, state);
            }
            Line::Data { name, format } => self.data.push(DataArray {
                name,
                format,
                samples: Vec::new(),
            }),
            Line::Begin => {
                if self.independent_variable.is_none() {
                    return Err(CitiError::structure(number, StructureError::OutOfOrder(keyword)));
                }
                if self.next_block >= self.data.len() {
                    return Err(CitiError::structure(number, StructureError::ArrayOverIndex(keyword)));
                }
                self.open_block(number, State::Data);
            }
            _ => return Err(CitiError::structure(number, StructureError::OutOfOrder(keyword))),
        }
        Ok(())
    }

    /// Close a value block, which must hold exactly the declared row count
    fn close_value_block(&mut self, number: usize, rows: usize) -> Result<()> {
        if rows != self.declared_count {
            return Err(CitiError::structure(
                number,
                StructureError::ArrayUnderIndex {
                    keyword: self.state.opening_keyword(),
                    expected: self.declared_count,
                    found: rows,
                },
            ));
        }
        self.values_read = true;
        self.state = State::Header;
        Ok(())
    }

    fn var_list(&mut self, number: usize, line: Line) -> Result<()> {
        match line {
            Line::Value(value) => {
                let declared = self.declared_count;
                let variable = self
                    .independent_variable
                    .as_mut()
                    .ok_or_else(|| CitiError::structure(number, StructureError::OutOfOrder(KW_VAR)))?;
                if variable.values.len() >= declared {
                    return Err(CitiError::structure(
                        number,
                        StructureError::ArrayOverIndex(KW_VAR_LIST_BEGIN),
                    ));
                }
                variable.values.push(value);
                Ok(())
            }
            Line::VarListEnd => {
                let rows = self.independent_variable.as_ref().map_or(0, |v| v.len());
                self.close_value_block(number, rows)
            }
            other => Err(CitiError::structure(
                number,
                StructureError::OutOfOrder(other.keyword()),
            )),
        }
    }

    fn seg_list(&mut self, number: usize, line: Line) -> Result<()> {
        match line {
            Line::Seg { first, last, count } => {
                let rows = self.segment_rows.saturating_add(count);
                if rows > self.declared_count {
                    return Err(CitiError::structure(
                        number,
                        StructureError::ArrayOverIndex(KW_SEG_LIST_BEGIN),
                    ));
                }
                self.segments.push((first, last, count));
                self.segment_rows = rows;
                Ok(())
            }
            Line::SegListEnd => self.close_value_block(number, self.segment_rows),
            other => Err(CitiError::structure(
                number,
                StructureError::OutOfOrder(other.keyword()),
            )),
        }
    }

    fn data_block(&mut self, number: usize, line: Line) -> Result<()> {
        match line {
            Line::Pair(sample) => {
                let array = &mut self.data[self.next_block];
                if array.samples.len() >= self.declared_count {
                    return Err(CitiError::structure(
                        number,
                        StructureError::ArrayOverIndex(KW_BEGIN),
                    ));
                }
                array.samples.push(sample);
                Ok(())
            }
            Line::End => {
                self.next_block += 1;
                self.state = State::Header;
                Ok(())
            }
            other => Err(CitiError::structure(
                number,
                StructureError::OutOfOrder(other.keyword()),
            )),
        }
    }

    /// End-of-input checks, in order: open block, version, name,
    /// independent variable, data, lengths.
    fn finish(self) -> Result<Record> {
        if self.state != State::Header {
            return Err(CitiError::structure(
                self.block_line,
                StructureError::Unterminated(self.state.opening_keyword()),
            ));
        }

        let invalid = |error| CitiError::invalid(Phase::Read, error);

        let version = self.version.ok_or_else(|| invalid(ValidationError::NoVersion))?;
        let name = self.name.ok_or_else(|| invalid(ValidationError::NoName))?;
        let mut independent_variable = self
            .independent_variable
            .ok_or_else(|| invalid(ValidationError::NoIndependentVariable))?;
        if self.data.is_empty() {
            return Err(invalid(ValidationError::NoData));
        }

        // a closed value block always holds the declared count
        let expected = self.declared_count;
        for (index, array) in self.data.iter().enumerate() {
            if array.len() != expected {
                return Err(invalid(ValidationError::LengthMismatch {
                    index,
                    expected,
                    found: array.len(),
                }));
            }
        }

        for &(first, last, count) in &self.segments {
            independent_variable
                .values
                .extend(linspace(first, last, count));
        }

        Ok(Record {
            version,
            name,
            comments: self.comments,
            constants: self.constants,
            devices: self.devices,
            independent_variable: Some(independent_variable),
            data: self.data,
        })
    }
}

// ============================================================================
// Main entry point
// ============================================================================

/// Parse a complete CITI text into a validated record
pub fn parse_str(text: &str) -> Result<Record> {
    let mut builder = RecordBuilder::new();
    let mut reader = LineReader::new(text);

    for item in &mut reader {
        let (number, line) = item?;
        builder.process(number, line)?;
    }

    let record = builder.finish()?;
    debug!(
        lines = reader.line_number(),
        name = %record.name,
        devices = record.devices.len(),
        data_arrays = record.data.len(),
        points = record.data.first().map_or(0, |a| a.len()),
        "Parsed record"
    );
    Ok(record)
}

// ============================================================================
// Tests
// ============================================================================
