//! Value-store key grammar.
//!
//! ```text
//! Result | CDATA | Level | NativeCode | ...       scalar keys
//! DataSet[<entry>]                               key-value set entry
//! Table[<row>][<cell>]                           table cell
//! Table[<row>]                                   table row (removal only)
//! TimeSeries[<00000>]                            series sample
//! ```
//!
//! Entry, row and cell keys containing `[` or `]` are not escaped.

use crate::error::KeyError;
use crate::limits::TIME_SERIES_INDEX_WIDTH;

pub const RESULT: &str = "Result";
pub const CDATA: &str = "CDATA";
pub const LEVEL: &str = "Level";
pub const NATIVE_CODE: &str = "NativeCode";
pub const NATIVE_SEVERITY: &str = "NativeSeverity";
pub const QUALIFIER: &str = "Qualifier";
pub const MESSAGE: &str = "Message";
pub const STATISTIC: &str = "Statistic";
pub const DURATION: &str = "Duration";
pub const RESET_TRIGGERED: &str = "ResetTriggered";
pub const SAMPLE_RATE: &str = "SampleRate";

/// Scalar keys that may accompany any payload shape.
pub const AUXILIARY_KEYS: [&str; 3] = [STATISTIC, DURATION, RESET_TRIGGERED];

pub const DATA_SET_PREFIX: &str = "DataSet";
pub const TABLE_PREFIX: &str = "Table";
pub const TIME_SERIES_PREFIX: &str = "TimeSeries";

/// Reserved value marking a removed data-set entry or table row on the wire.
///
/// A producer sending this exact text as a genuine value is read back as a
/// removal; the representation cannot tell the two apart.
pub const ENTRY_REMOVED: &str = "[!ENTRY_REMOVED!]";

/// Value written for an observation that has no data.
pub const UNAVAILABLE: &str = "UNAVAILABLE";

/// Builds `DataSet[<entry>]`.
pub fn data_set_key(entry: &str) -> String {
    format!("{}[{}]", DATA_SET_PREFIX, entry)
}

/// Builds `Table[<row>][<cell>]`.
pub fn table_key(row: &str, cell: &str) -> String {
    format!("{}[{}][{}]", TABLE_PREFIX, row, cell)
}

/// Builds the row-level key `Table[<row>]`.
pub fn table_row_key(row: &str) -> String {
    format!("{}[{}]", TABLE_PREFIX, row)
}

/// Builds `TimeSeries[<index>]` with a zero-padded index.
pub fn time_series_key(index: usize) -> String {
    format!(
        "{}[{:0width$}]",
        TIME_SERIES_PREFIX,
        index,
        width = TIME_SERIES_INDEX_WIDTH
    )
}

/// A parsed value-store key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKey<'a> {
    Scalar(&'a str),
    DataSet(&'a str),
    TableRow(&'a str),
    TableCell { row: &'a str, cell: &'a str },
    TimeSeries(usize),
}

impl<'a> ValueKey<'a> {
    /// Parses a key. Keys without a known prefix are scalar keys; keys with
    /// a known prefix must follow the bracket grammar.
    pub fn parse(key: &'a str) -> Result<ValueKey<'a>, KeyError> {
        let mut reader = KeyReader::new(key);
        if reader.eat_prefix(DATA_SET_PREFIX) {
            let entry = reader.read_bracketed("data set entry")?;
            reader.finish("data set entry")?;
            Ok(ValueKey::DataSet(entry))
        } else if reader.eat_prefix(TIME_SERIES_PREFIX) {
            let index = reader.read_bracketed("time series index")?;
            reader.finish("time series index")?;
            if !index.bytes().all(|b| b.is_ascii_digit()) {
                return Err(KeyError::InvalidIndex {
                    index: index.to_string(),
                });
            }
            let index = index.parse().map_err(|_| KeyError::InvalidIndex {
                index: index.to_string(),
            })?;
            Ok(ValueKey::TimeSeries(index))
        } else if reader.eat_prefix(TABLE_PREFIX) {
            let row = reader.read_bracketed("table row")?;
            if reader.is_empty() {
                return Ok(ValueKey::TableRow(row));
            }
            let cell = reader.read_bracketed("table cell")?;
            reader.finish("table cell")?;
            Ok(ValueKey::TableCell { row, cell })
        } else {
            Ok(ValueKey::Scalar(key))
        }
    }
}

/// Returns true if `key` belongs to a data set, table or time series.
pub fn is_structured_key(key: &str) -> bool {
    [DATA_SET_PREFIX, TABLE_PREFIX, TIME_SERIES_PREFIX]
        .iter()
        .any(|prefix| key.starts_with(prefix) && key[prefix.len()..].starts_with('['))
}

/// Returns true for keys carried alongside any payload shape.
pub fn is_auxiliary_key(key: &str) -> bool {
    AUXILIARY_KEYS.contains(&key)
}

/// Cursor over a key string.
///
/// Bracket contents are matched up to the first `]`; nested brackets are
/// not supported.
#[derive(Debug, Clone)]
pub struct KeyReader<'a> {
    data: &'a str,
    pos: usize,
}

impl<'a> KeyReader<'a> {
    pub fn new(data: &'a str) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> &'a str {
        &self.data[self.pos..]
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Consumes `prefix` if it is immediately followed by `[`.
    pub fn eat_prefix(&mut self, prefix: &str) -> bool {
        let rest = self.remaining();
        if rest.starts_with(prefix) && rest[prefix.len()..].starts_with('[') {
            self.pos += prefix.len();
            true
        } else {
            false
        }
    }

    /// Reads `[<content>]` and returns the content.
    pub fn read_bracketed(&mut self, context: &'static str) -> Result<&'a str, KeyError> {
        let rest = self.remaining();
        if rest.is_empty() {
            return Err(KeyError::UnexpectedEnd { context });
        }
        if !rest.starts_with('[') {
            return Err(KeyError::ExpectedOpenBracket {
                context,
                position: self.pos,
            });
        }
        let close = rest[1..]
            .find(']')
            .ok_or(KeyError::UnterminatedBracket { context })?;
        let content = &rest[1..1 + close];
        if content.is_empty() {
            return Err(KeyError::EmptyBracket { context });
        }
        self.pos += close + 2;
        Ok(content)
    }

    /// Fails if anything is left.
    pub fn finish(&self, context: &'static str) -> Result<(), KeyError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(KeyError::TrailingInput { context })
        }
    }
}
