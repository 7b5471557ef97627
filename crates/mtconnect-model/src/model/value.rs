//! Observation values and the structured payload shapes they encode.
//!
//! Every observation stores its payload as a flat list of
//! [`ObservationValue`]s. The structured views ([`ObservationPayload`] and
//! its parts) are produced by the codec in [`crate::codec::value`].

use std::hash::{Hash, Hasher};

use crate::codec::keys::ENTRY_REMOVED;
use crate::model::{ConditionLevel, ConditionQualifier, DataItemCategory, Representation};

/// Content of a stored value: text, or a tombstone.
///
/// Tombstones are kept out of band so that a genuine value equal to the
/// removal sentinel is never mistaken for a removal inside the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueContent {
    Text(String),
    Removed,
}

/// A single (key, value) pair held by an observation.
///
/// Equality and hashing consider the key only.
#[derive(Debug, Clone, Eq)]
pub struct ObservationValue {
    key: String,
    content: ValueContent,
}

impl ObservationValue {
    /// Creates a text value.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            content: ValueContent::Text(value.into()),
        }
    }

    /// Creates a tombstone for `key`.
    pub fn removed(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            content: ValueContent::Removed,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn content(&self) -> &ValueContent {
        &self.content
    }

    /// Returns the text, or `None` for a tombstone.
    pub fn value(&self) -> Option<&str> {
        match &self.content {
            ValueContent::Text(v) => Some(v),
            ValueContent::Removed => None,
        }
    }

    pub fn is_removed(&self) -> bool {
        matches!(self.content, ValueContent::Removed)
    }

    /// The value as written to a raw key/value stream: tombstones become
    /// the removal sentinel.
    pub fn wire_value(&self) -> &str {
        match &self.content {
            ValueContent::Text(v) => v,
            ValueContent::Removed => ENTRY_REMOVED,
        }
    }
}

impl PartialEq for ObservationValue {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Hash for ObservationValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// Presence state of a data-set entry or table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState<T> {
    Present(T),
    Removed,
}

impl<T> EntryState<T> {
    pub fn as_present(&self) -> Option<&T> {
        match self {
            EntryState::Present(v) => Some(v),
            EntryState::Removed => None,
        }
    }

    pub fn is_removed(&self) -> bool {
        matches!(self, EntryState::Removed)
    }
}

/// One entry of a key-value set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSetEntry {
    pub key: String,
    pub value: EntryState<String>,
}

impl DataSetEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: EntryState::Present(value.into()),
        }
    }

    pub fn removed(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: EntryState::Removed,
        }
    }

    pub fn is_removed(&self) -> bool {
        self.value.is_removed()
    }

    /// The entry's value; `None` when removed.
    pub fn value(&self) -> Option<&str> {
        self.value.as_present().map(String::as_str)
    }
}

/// One cell of a table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCell {
    pub key: String,
    pub value: String,
}

impl TableCell {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One row of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub key: String,
    pub cells: EntryState<Vec<TableCell>>,
}

impl TableEntry {
    pub fn new(key: impl Into<String>, cells: Vec<TableCell>) -> Self {
        Self {
            key: key.into(),
            cells: EntryState::Present(cells),
        }
    }

    pub fn removed(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            cells: EntryState::Removed,
        }
    }

    pub fn is_removed(&self) -> bool {
        self.cells.is_removed()
    }

    /// Looks up a cell by key. Removed rows have no cells.
    pub fn cell(&self, key: &str) -> Option<&str> {
        self.cells
            .as_present()?
            .iter()
            .find(|c| c.key == key)
            .map(|c| c.value.as_str())
    }
}

/// Fixed-rate sample series.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries {
    pub samples: Vec<f64>,
    /// Samples per second, when it differs from the data item's rate.
    pub sample_rate: Option<f64>,
}

impl TimeSeries {
    pub fn new(samples: Vec<f64>) -> Self {
        Self {
            samples,
            sample_rate: None,
        }
    }

    pub fn with_sample_rate(mut self, rate: f64) -> Self {
        self.sample_rate = Some(rate);
        self
    }
}

/// Fault-condition payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Condition {
    pub level: ConditionLevel,
    pub native_code: Option<String>,
    pub native_severity: Option<String>,
    pub qualifier: Option<ConditionQualifier>,
    pub message: Option<String>,
}

impl Condition {
    pub fn new(level: ConditionLevel) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    pub fn native_code(mut self, code: impl Into<String>) -> Self {
        self.native_code = Some(code.into());
        self
    }

    pub fn native_severity(mut self, severity: impl Into<String>) -> Self {
        self.native_severity = Some(severity.into());
        self
    }

    pub fn qualifier(mut self, qualifier: ConditionQualifier) -> Self {
        self.qualifier = Some(qualifier);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Which payload shape an observation carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadShape {
    Scalar,
    Condition,
    DataSet,
    Table,
    TimeSeries,
}

impl PayloadShape {
    /// Derives the shape from category and representation. Conditions
    /// always carry the condition shape.
    pub fn of(category: DataItemCategory, representation: Representation) -> PayloadShape {
        if category == DataItemCategory::Condition {
            return PayloadShape::Condition;
        }
        match representation {
            Representation::Value | Representation::Discrete => PayloadShape::Scalar,
            Representation::DataSet => PayloadShape::DataSet,
            Representation::Table => PayloadShape::Table,
            Representation::TimeSeries => PayloadShape::TimeSeries,
        }
    }
}

/// A structured observation payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ObservationPayload {
    /// Single value. `None` means no result has been recorded.
    Scalar(Option<String>),
    Condition(Condition),
    DataSet(Vec<DataSetEntry>),
    Table(Vec<TableEntry>),
    TimeSeries(TimeSeries),
}

impl ObservationPayload {
    pub fn shape(&self) -> PayloadShape {
        match self {
            ObservationPayload::Scalar(_) => PayloadShape::Scalar,
            ObservationPayload::Condition(_) => PayloadShape::Condition,
            ObservationPayload::DataSet(_) => PayloadShape::DataSet,
            ObservationPayload::Table(_) => PayloadShape::Table,
            ObservationPayload::TimeSeries(_) => PayloadShape::TimeSeries,
        }
    }
}
