//! Core shared types: dataset cells, records and statistic kinds

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::SharedError;

/// Name of a dataset column
pub type ColumnName = String;

/// One row of an uploaded dataset, keyed by column name
pub type Record = BTreeMap<ColumnName, ScalarValue>;

/// Raw scalar cell value as it travels on the wire
///
/// Serialized untagged so the statistics service sees plain JSON numbers and strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Number(f64),
    Text(String),
}

impl ScalarValue {
    /// Interpret a raw text cell
    ///
    /// Only cells already written in canonical numeric form become numbers, so
    /// `007`, `7` and `7.0` stay three distinct values.
    pub fn from_cell(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<f64>() {
            Ok(number) if number.is_finite() && number.to_string() == trimmed => ScalarValue::Number(number),
            _ => ScalarValue::Text(trimmed.to_string()),
        }
    }

    /// Numeric reading of the cell; text that parses as a finite number counts
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Number(number) => Some(*number),
            ScalarValue::Text(text) => text.parse::<f64>().ok().filter(|number| number.is_finite()),
        }
    }

    /// Group label used when this value is a group-by key
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Number(number) => write!(f, "{number}"),
            ScalarValue::Text(text) => write!(f, "{text}"),
        }
    }
}

/// Aggregate statistic computed per group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    #[default]
    Mean,
    Count,
    Percent,
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::Mean => write!(f, "mean"),
            Statistic::Count => write!(f, "count"),
            Statistic::Percent => write!(f, "percent"),
        }
    }
}

impl std::str::FromStr for Statistic {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mean" | "avg" | "average" => Ok(Statistic::Mean),
            "count" => Ok(Statistic::Count),
            "percent" | "percentage" => Ok(Statistic::Percent),
            _ => Err(SharedError::UnknownStatistic { input: s.to_string() }),
        }
    }
}
