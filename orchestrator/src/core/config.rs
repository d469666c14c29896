//! Query configuration
//!
//! The analyst's selection of group-by column, statistic, measured column and
//! privacy budget. Storage never fails; whether the selection can be computed
//! is a separate question answered against the current dataset.

use serde::Serialize;
use shared::{ColumnName, Statistic};

use super::dataset::Dataset;

/// Epsilon range offered to analysts; the engine itself accepts any positive value
pub const EPSILON_UI_RANGE: (f64, f64) = (0.0, 10.0);

pub const DEFAULT_EPSILON: f64 = 1.0;

/// One field assignment
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigUpdate {
    GroupBy(Option<ColumnName>),
    Statistic(Statistic),
    Measure(Option<ColumnName>),
    Epsilon(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryConfiguration {
    pub group_by: Option<ColumnName>,
    pub statistic: Statistic,
    pub measure: Option<ColumnName>,
    pub epsilon: f64,
}

impl Default for QueryConfiguration {
    fn default() -> Self {
        Self {
            group_by: None,
            statistic: Statistic::default(),
            measure: None,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl QueryConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a field value; returns whether the stored value changed
    pub fn set(&mut self, update: ConfigUpdate) -> bool {
        match update {
            ConfigUpdate::GroupBy(column) => replace_if_changed(&mut self.group_by, column),
            ConfigUpdate::Statistic(statistic) => replace_if_changed(&mut self.statistic, statistic),
            ConfigUpdate::Measure(column) => replace_if_changed(&mut self.measure, column),
            ConfigUpdate::Epsilon(epsilon) => {
                // Compare bit patterns so NaN assignments still count as one change
                if self.epsilon.to_bits() == epsilon.to_bits() {
                    false
                } else {
                    self.epsilon = epsilon;
                    true
                }
            }
        }
    }

    /// Column selections do not survive a dataset replacement; epsilon does
    pub fn on_dataset_replaced(&mut self) -> bool {
        let changed = self.group_by.is_some() || self.measure.is_some();
        self.group_by = None;
        self.measure = None;
        changed
    }

    /// Why the configuration cannot be computed, if it cannot
    pub fn blocking_reason(&self, dataset: Option<&Dataset>) -> Option<String> {
        let Some(dataset) = dataset.filter(|d| !d.is_empty()) else {
            return Some("no dataset loaded".to_string());
        };
        let Some(group_by) = &self.group_by else {
            return Some("group-by column is not set".to_string());
        };
        let Some(measure) = &self.measure else {
            return Some("measure column is not set".to_string());
        };
        if !dataset.has_column(group_by) {
            return Some(format!("group-by column '{group_by}' is not in the dataset"));
        }
        if !dataset.has_column(measure) {
            return Some(format!("measure column '{measure}' is not in the dataset"));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Some(format!("epsilon must be a positive number, got {}", self.epsilon));
        }
        None
    }

    pub fn is_computable(&self, dataset: Option<&Dataset>) -> bool {
        self.blocking_reason(dataset).is_none()
    }

    pub fn epsilon_in_ui_range(&self) -> bool {
        self.epsilon > EPSILON_UI_RANGE.0 && self.epsilon <= EPSILON_UI_RANGE.1
    }
}

fn replace_if_changed<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}
