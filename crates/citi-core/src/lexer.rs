//! CITI line reader and classifier
//!
//! Splits text into logical lines and classifies each one by its leading
//! keyword. Classification is line-local: ordering and uniqueness are the
//! builder's job (see `parser.rs`).

use crate::error::{CitiError, GrammarError, Result};
use crate::number::{decode_complex, decode_count, decode_f64};
use crate::types::*;
use num_complex::Complex64;
use tracing::trace;

// ============================================================================
// Classified Lines
// ============================================================================

/// One classified line of a CITI file
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    /// `CITIFILE A.01.00`
    Version(String),
    /// `NAME CAL_SET`
    Name(String),
    /// `!DATE: 2019.11.01`
    Comment(String),
    /// `#NA REGISTER 1`, or `#NA` with no entry
    Device { name: String, entry: Option<String> },
    /// `CONSTANT A_CONSTANT 1.2345`
    Constant { name: String, value: String },
    /// `VAR FREQ MAG 201`, or `VAR FREQ 201`
    Var {
        name: String,
        format: Option<String>,
        count: usize,
    },
    VarListBegin,
    VarListEnd,
    SegListBegin,
    /// `SEG 1000000000 4000000000 10`
    Seg { first: f64, last: f64, count: usize },
    SegListEnd,
    /// `DATA S[1,1] RI`
    Data { name: String, format: String },
    Begin,
    End,
    /// A lone number inside a value list
    Value(f64),
    /// `real,imag` inside a data block
    Pair(Complex64),
}

impl Line {
    /// Keyword used when reporting this line in an error
    pub fn keyword(&self) -> &'static str {
        match self {
            Line::Version(_) => KW_CITIFILE,
            Line::Name(_) => KW_NAME,
            Line::Comment(_) => "!",
            Line::Device { .. } => "#",
            Line::Constant { .. } => KW_CONSTANT,
            Line::Var { .. } => KW_VAR,
            Line::VarListBegin => KW_VAR_LIST_BEGIN,
            Line::VarListEnd => KW_VAR_LIST_END,
            Line::SegListBegin => KW_SEG_LIST_BEGIN,
            Line::Seg { .. } => KW_SEG,
            Line::SegListEnd => KW_SEG_LIST_END,
            Line::Data { .. } => KW_DATA,
            Line::Begin => KW_BEGIN,
            Line::End => KW_END,
            Line::Value(_) => "<value>",
            Line::Pair(_) => "<real>,<imag>",
        }
    }
}

// ============================================================================
// Classifier
// ============================================================================

/// Classify one line of text (line ending already removed).
pub fn classify(text: &str, line: usize) -> Result<Line> {
    let bad_argument = |keyword: &'static str| {
        CitiError::grammar(
            line,
            GrammarError::BadArgument {
                keyword,
                text: text.to_string(),
            },
        )
    };

    if let Some(rest) = text.strip_prefix(COMMENT_MARKER) {
        return Ok(Line::Comment(rest.to_string()));
    }

    if let Some(rest) = text.strip_prefix(DEVICE_MARKER) {
        let (name, entry) = match rest.split_once(char::is_whitespace) {
            Some((name, entry)) => (name, Some(entry.to_string())),
            None => (rest, None),
        };
        if name.is_empty() {
            return Err(bad_argument("#"));
        }
        return Ok(Line::Device {
            name: name.to_string(),
            entry,
        });
    }

    let mut tokens = text.split_whitespace();
    let head = tokens.next().unwrap_or("");
    let args: Vec<&str> = tokens.collect();

    let bare = |keyword: &'static str, kind: Line| {
        if args.is_empty() {
            Ok(kind)
        } else {
            Err(bad_argument(keyword))
        }
    };

    match head {
        KW_CITIFILE => match args.as_slice() {
            [version] => Ok(Line::Version(version.to_string())),
            _ => Err(bad_argument(KW_CITIFILE)),
        },
        KW_NAME => match args.as_slice() {
            [name] => Ok(Line::Name(name.to_string())),
            _ => Err(bad_argument(KW_NAME)),
        },
        KW_CONSTANT => match args.as_slice() {
            [name, value] => Ok(Line::Constant {
                name: name.to_string(),
                value: value.to_string(),
            }),
            _ => Err(bad_argument(KW_CONSTANT)),
        },
        KW_VAR => {
            let (name, format, count) = match args.as_slice() {
                [name, count] => (name, None, count),
                [name, format, count] => (name, Some(format.to_string()), count),
                _ => return Err(bad_argument(KW_VAR)),
            };
            let count = decode_count(count).ok_or_else(|| bad_argument(KW_VAR))?;
            Ok(Line::Var {
                name: name.to_string(),
                format,
                count,
            })
        }
        KW_DATA => match args.as_slice() {
            [name, format] => Ok(Line::Data {
                name: name.to_string(),
                format: format.to_string(),
            }),
            _ => Err(bad_argument(KW_DATA)),
        },
        KW_SEG => match args.as_slice() {
            [first, last, count] => Ok(Line::Seg {
                first: decode_f64(first, line)?,
                last: decode_f64(last, line)?,
                count: decode_count(count).ok_or_else(|| bad_argument(KW_SEG))?,
            }),
            _ => Err(bad_argument(KW_SEG)),
        },
        KW_VAR_LIST_BEGIN => bare(KW_VAR_LIST_BEGIN, Line::VarListBegin),
        KW_VAR_LIST_END => bare(KW_VAR_LIST_END, Line::VarListEnd),
        KW_SEG_LIST_BEGIN => bare(KW_SEG_LIST_BEGIN, Line::SegListBegin),
        KW_SEG_LIST_END => bare(KW_SEG_LIST_END, Line::SegListEnd),
        KW_BEGIN => bare(KW_BEGIN, Line::Begin),
        KW_END => bare(KW_END, Line::End),
        _ => classify_numeric(text, line),
    }
}

/// True when a token is meant to be a number, even a malformed one
fn looks_numeric(token: &str) -> bool {
    let token = token.trim();
    token.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | '.'))
        || token.parse::<f64>().is_ok()
}

fn classify_numeric(text: &str, line: usize) -> Result<Line> {
    let trimmed = text.trim();
    match trimmed.split_once(',') {
        Some((real, imag)) if looks_numeric(real) => {
            Ok(Line::Pair(decode_complex(real, imag, line)?))
        }
        None if looks_numeric(trimmed) => Ok(Line::Value(decode_f64(trimmed, line)?)),
        _ => Err(CitiError::grammar(
            line,
            GrammarError::BadKeyword(trimmed.to_string()),
        )),
    }
}

// ============================================================================
// Line Reader
// ============================================================================

/// Iterator over the classified, non-blank lines of a text
///
/// Yields `(line_number, Line)` with 1-based line numbers. `\n` and `\r\n`
/// endings are both accepted; a leading byte-order mark is skipped.
pub struct LineReader<'a> {
    lines: std::str::Split<'a, char>,
    line_number: usize,
}

impl<'a> LineReader<'a> {
    pub fn new(text: &'a str) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        Self {
            lines: text.split('\n'),
            line_number: 0,
        }
    }

    /// Number of physical lines consumed so far
    #[inline]
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

impl<'a> Iterator for LineReader<'a> {
    type Item = Result<(usize, Line)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = self.lines.next()?;
            self.line_number += 1;

            let text = raw.strip_suffix('\r').unwrap_or(raw);
            if text.trim().is_empty() {
                continue;
            }

            let number = self.line_number;
            let classified = classify(text, number);
            if let Ok(line) = &classified {
                trace!(line = number, keyword = line.keyword(), "Classified line");
            }
            return Some(classified.map(|line| (number, line)));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn ok(text: &str) -> Line {
        classify(text, 1).unwrap_or_else(|e| panic!("{:?} failed: {}", text, e))
    }

    fn code(text: &str) -> ErrorCode {
        classify(text, 1).unwrap_err().code()
    }

    #[test]
    fn test_header_keywords() {
        assert_eq!(ok("CITIFILE A.01.00"), Line::Version("A.01.00".into()));
        assert_eq!(ok("NAME CAL_SET"), Line::Name("CAL_SET".into()));
        assert_eq!(
            ok("CONSTANT A_CONSTANT 1.2345"),
            Line::Constant {
                name: "A_CONSTANT".into(),
                value: "1.2345".into()
            }
        );
        assert_eq!(
            ok("DATA S[1,1] RI"),
            Line::Data {
                name: "S[1,1]".into(),
                format: "RI".into()
            }
        );
    }

    #[test]
    fn test_var_with_and_without_format() {
        assert_eq!(
            ok("VAR FREQ MAG 201"),
            Line::Var {
                name: "FREQ".into(),
                format: Some("MAG".into()),
                count: 201
            }
        );
        assert_eq!(
            ok("VAR FREQ 202"),
            Line::Var {
                name: "FREQ".into(),
                format: None,
                count: 202
            }
        );
    }

    #[test]
    fn test_comment_keeps_text_verbatim() {
        assert_eq!(ok("!DATE: 2019.11.01"), Line::Comment("DATE: 2019.11.01".into()));
        assert_eq!(ok("!"), Line::Comment(String::new()));
    }

    #[test]
    fn test_device_lines() {
        assert_eq!(
            ok("#NA POWER2 1.0E1"),
            Line::Device {
                name: "NA".into(),
                entry: Some("POWER2 1.0E1".into())
            }
        );
        assert_eq!(
            ok("#WVI"),
            Line::Device {
                name: "WVI".into(),
                entry: None
            }
        );
        assert_eq!(code("# NA REGISTER 1"), ErrorCode::BadArgument);
    }

    #[test]
    fn test_block_delimiters() {
        assert_eq!(ok("VAR_LIST_BEGIN"), Line::VarListBegin);
        assert_eq!(ok("VAR_LIST_END"), Line::VarListEnd);
        assert_eq!(ok("SEG_LIST_BEGIN"), Line::SegListBegin);
        assert_eq!(ok("SEG_LIST_END"), Line::SegListEnd);
        assert_eq!(ok("BEGIN"), Line::Begin);
        assert_eq!(ok("END"), Line::End);
    }

    #[test]
    fn test_seg_item() {
        assert_eq!(
            ok("SEG -1e9 1E-4 1"),
            Line::Seg {
                first: -1e9,
                last: 1e-4,
                count: 1
            }
        );
        assert_eq!(code("SEG 1 2"), ErrorCode::BadArgument);
        assert_eq!(code("SEG 1 2 x"), ErrorCode::BadArgument);
        assert_eq!(code("SEG a 2 3"), ErrorCode::BadNumber);
    }

    #[test]
    fn test_numeric_rows() {
        assert_eq!(ok("-100000"), Line::Value(-100000.0));
        assert_eq!(ok("100E+6"), Line::Value(100e6));
        assert_eq!(ok("1E9,-1E9"), Line::Pair(Complex64::new(1e9, -1e9)));
        assert_eq!(
            ok("8.6303E-2, -8.98651E-1"),
            Line::Pair(Complex64::new(0.86303e-1, -8.98651e-1))
        );
    }

    #[test]
    fn test_bad_numbers() {
        assert_eq!(code("1.0,abc"), ErrorCode::BadNumber);
        assert_eq!(code("1.0,2.0,3.0"), ErrorCode::BadNumber);
        assert_eq!(code("1.2.3"), ErrorCode::BadNumber);
        assert_eq!(code("1.0,"), ErrorCode::BadNumber);
    }

    #[test]
    fn test_bad_keyword() {
        let err = classify("this is a bad string", 12).unwrap_err();
        match err {
            CitiError::Grammar { line, error } => {
                assert_eq!(line, 12);
                assert_eq!(
                    error,
                    GrammarError::BadKeyword("this is a bad string".into())
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(code("citifile A.01.00"), ErrorCode::BadKeyword);
    }

    #[test]
    fn test_bad_arguments() {
        assert_eq!(code("CITIFILE"), ErrorCode::BadArgument);
        assert_eq!(code("NAME TWO WORDS"), ErrorCode::BadArgument);
        assert_eq!(code("VAR FREQ MAG x"), ErrorCode::BadArgument);
        assert_eq!(code("VAR FREQ MAG -3"), ErrorCode::BadArgument);
        assert_eq!(code("VAR"), ErrorCode::BadArgument);
        assert_eq!(code("DATA S"), ErrorCode::BadArgument);
        assert_eq!(code("BEGIN NOW"), ErrorCode::BadArgument);
    }

    #[test]
    fn test_reader_skips_blank_lines_and_counts() {
        let text = "CITIFILE A.01.00\r\n\r\n   \nNAME MEMORY\r\n";
        let lines: Vec<_> = LineReader::new(text).map(|r| r.unwrap()).collect();
        assert_eq!(
            lines,
            vec![
                (1, Line::Version("A.01.00".into())),
                (4, Line::Name("MEMORY".into())),
            ]
        );
    }

    #[test]
    fn test_reader_skips_byte_order_mark() {
        let mut reader = LineReader::new("\u{feff}CITIFILE A.01.00");
        assert_eq!(
            reader.next().unwrap().unwrap(),
            (1, Line::Version("A.01.00".into()))
        );
        assert!(reader.next().is_none());
        assert_eq!(reader.line_number(), 1);
    }

    #[test]
    fn test_reader_reports_line_of_error() {
        let text = "CITIFILE A.01.00\nNAME MEMORY\nGARBAGE\n";
        let err = LineReader::new(text)
            .find_map(|r| r.err())
            .expect("expected an error");
        match err {
            CitiError::Grammar { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
