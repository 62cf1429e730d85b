#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Semantic class of a CSV column, fixed once the detection pre-pass completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
    ComplexSequence,
    ComplexMapping,
}

impl ColumnKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
            Self::ComplexSequence => "complex_sequence",
            Self::ComplexMapping => "complex_mapping",
        }
    }

    /// Kinds whose summary is a frequency table rather than moments.
    #[must_use]
    pub fn is_frequency(self) -> bool {
        matches!(self, Self::Categorical | Self::ComplexSequence)
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Value stored under a key of a mapping-valued cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MapValue {
    Number(f64),
    Text(String),
}

/// A raw CSV cell after parsing.
///
/// `Number` is always finite. `Missing` never contributes to any count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Cell {
    Missing,
    Number(f64),
    Text(String),
    Sequence(Vec<String>),
    Mapping(BTreeMap<String, MapValue>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellShape {
    Missing,
    Number,
    Text,
    Sequence,
    Mapping,
}

impl Cell {
    #[must_use]
    pub fn shape(&self) -> CellShape {
        match self {
            Self::Missing => CellShape::Missing,
            Self::Number(_) => CellShape::Number,
            Self::Text(_) => CellShape::Text,
            Self::Sequence(_) => CellShape::Sequence,
            Self::Mapping(_) => CellShape::Mapping,
        }
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn to_f64(&self) -> Result<f64, TypeError> {
        match self {
            Self::Number(v) => Ok(*v),
            Self::Missing => Err(TypeError::ValueIsMissing),
            Self::Text(v) => Err(TypeError::NonNumericValue {
                value: v.clone(),
                shape: CellShape::Text,
            }),
            Self::Sequence(items) => Err(TypeError::NonNumericValue {
                value: format!("[{} items]", items.len()),
                shape: CellShape::Sequence,
            }),
            Self::Mapping(map) => Err(TypeError::NonNumericValue {
                value: format!("{{{} keys}}", map.len()),
                shape: CellShape::Mapping,
            }),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeError {
    #[error("value {value:?} has non-numeric shape {shape:?}")]
    NonNumericValue { value: String, shape: CellShape },
    #[error("value is missing")]
    ValueIsMissing,
}

/// Render a finite number as a categorical token (`1.0` renders as `1`).
#[must_use]
pub fn number_token(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    pub value: String,
    pub count: u64,
}

/// Finalized statistics for one column (within one group, when grouping).
///
/// Every field is present for every kind so all strategies share one shape;
/// fields that do not apply to the column kind are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub kind: ColumnKind,
    pub count: u64,
    pub sum: Option<f64>,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub unique_count: Option<u64>,
    pub top_frequencies: Vec<FrequencyEntry>,
}

impl Summary {
    #[must_use]
    pub fn empty(kind: ColumnKind) -> Self {
        Self {
            kind,
            count: 0,
            sum: None,
            mean: None,
            std: None,
            min: None,
            max: None,
            unique_count: None,
            top_frequencies: Vec::new(),
        }
    }

    #[must_use]
    pub fn frequency_of(&self, value: &str) -> Option<u64> {
        self.top_frequencies
            .iter()
            .find(|entry| entry.value == value)
            .map(|entry| entry.count)
    }
}
