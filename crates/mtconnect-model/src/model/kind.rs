//! Enumerations shared by data items and observations.

use std::fmt;

/// Data item category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataItemCategory {
    Sample,
    Event,
    Condition,
}

impl DataItemCategory {
    /// Returns the wire token (`SAMPLE`, `EVENT`, `CONDITION`).
    pub fn as_str(self) -> &'static str {
        match self {
            DataItemCategory::Sample => "SAMPLE",
            DataItemCategory::Event => "EVENT",
            DataItemCategory::Condition => "CONDITION",
        }
    }

    /// Parses a wire token.
    pub fn parse(s: &str) -> Option<DataItemCategory> {
        match s {
            "SAMPLE" => Some(DataItemCategory::Sample),
            "EVENT" => Some(DataItemCategory::Event),
            "CONDITION" => Some(DataItemCategory::Condition),
            _ => None,
        }
    }

    /// Name of the streams container holding observations of this category.
    pub fn container(self) -> &'static str {
        match self {
            DataItemCategory::Sample => "Samples",
            DataItemCategory::Event => "Events",
            DataItemCategory::Condition => "Condition",
        }
    }
}

impl fmt::Display for DataItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Representation kind: the secondary axis that selects the payload shape
/// for a given data item type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Representation {
    #[default]
    Value,
    DataSet,
    Table,
    TimeSeries,
    /// Deprecated in the standard; behaves like `Value`.
    Discrete,
}

impl Representation {
    /// All representations, in declaration order.
    pub const ALL: [Representation; 5] = [
        Representation::Value,
        Representation::DataSet,
        Representation::Table,
        Representation::TimeSeries,
        Representation::Discrete,
    ];

    /// Returns the wire token (`VALUE`, `DATA_SET`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Representation::Value => "VALUE",
            Representation::DataSet => "DATA_SET",
            Representation::Table => "TABLE",
            Representation::TimeSeries => "TIME_SERIES",
            Representation::Discrete => "DISCRETE",
        }
    }

    /// Parses a wire token.
    pub fn parse(s: &str) -> Option<Representation> {
        match s {
            "VALUE" => Some(Representation::Value),
            "DATA_SET" => Some(Representation::DataSet),
            "TABLE" => Some(Representation::Table),
            "TIME_SERIES" => Some(Representation::TimeSeries),
            "DISCRETE" => Some(Representation::Discrete),
            _ => None,
        }
    }

    /// The representation observations are registered and written under.
    /// `DISCRETE` observations look exactly like `VALUE` ones on the wire.
    pub fn observed(self) -> Representation {
        match self {
            Representation::Discrete => Representation::Value,
            rep => rep,
        }
    }

    /// Suffix appended to an observation's element name.
    pub fn element_suffix(self) -> &'static str {
        match self {
            Representation::Value | Representation::Discrete => "",
            Representation::DataSet => "DataSet",
            Representation::Table => "Table",
            Representation::TimeSeries => "TimeSeries",
        }
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition level. Condition observations are written under an element
/// named after their level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConditionLevel {
    #[default]
    Unavailable,
    Normal,
    Warning,
    Fault,
}

impl ConditionLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ConditionLevel::Unavailable => "UNAVAILABLE",
            ConditionLevel::Normal => "NORMAL",
            ConditionLevel::Warning => "WARNING",
            ConditionLevel::Fault => "FAULT",
        }
    }

    pub fn parse(s: &str) -> Option<ConditionLevel> {
        match s {
            "UNAVAILABLE" => Some(ConditionLevel::Unavailable),
            "NORMAL" => Some(ConditionLevel::Normal),
            "WARNING" => Some(ConditionLevel::Warning),
            "FAULT" => Some(ConditionLevel::Fault),
            _ => None,
        }
    }

    /// Element name used in the `Condition` container.
    pub fn element_name(self) -> &'static str {
        match self {
            ConditionLevel::Unavailable => "Unavailable",
            ConditionLevel::Normal => "Normal",
            ConditionLevel::Warning => "Warning",
            ConditionLevel::Fault => "Fault",
        }
    }

    pub fn from_element_name(name: &str) -> Option<ConditionLevel> {
        match name {
            "Unavailable" => Some(ConditionLevel::Unavailable),
            "Normal" => Some(ConditionLevel::Normal),
            "Warning" => Some(ConditionLevel::Warning),
            "Fault" => Some(ConditionLevel::Fault),
            _ => None,
        }
    }
}

impl fmt::Display for ConditionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Qualifier on a condition (which side of a limit was crossed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionQualifier {
    High,
    Low,
}

impl ConditionQualifier {
    pub fn as_str(self) -> &'static str {
        match self {
            ConditionQualifier::High => "HIGH",
            ConditionQualifier::Low => "LOW",
        }
    }

    pub fn parse(s: &str) -> Option<ConditionQualifier> {
        match s {
            "HIGH" => Some(ConditionQualifier::High),
            "LOW" => Some(ConditionQualifier::Low),
            _ => None,
        }
    }
}
