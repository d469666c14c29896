//! Dataset store
//!
//! Parses uploaded delimited text into records and keeps the current dataset.
//! A failed load never disturbs the dataset that was already loaded.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use csv::ReaderBuilder;
use shared::{ColumnName, Record, ScalarValue};

use crate::error::{OrchestratorError, OrchestratorResult};

/// Parsed dataset: ordered records plus the order-preserving column set
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<ColumnName>,
    records: Arc<Vec<Record>>,
}

/// Rows of one group and the numeric measure values found in them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupRows {
    pub rows: usize,
    pub values: Vec<f64>,
}

fn normalize_header(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

impl Dataset {
    /// Parse raw text with a header row
    ///
    /// Rejects text without data rows and headers naming the same column twice.
    pub fn parse(raw_text: &str) -> OrchestratorResult<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(raw_text.as_bytes());

        let columns: Vec<ColumnName> = reader.headers()?.iter().map(normalize_header).collect();

        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(OrchestratorError::malformed(format!("duplicate column name '{column}'")));
            }
        }

        let mut records = Vec::new();
        for (index, row) in reader.records().enumerate() {
            let row = row.map_err(|e| OrchestratorError::malformed(format!("row {}: {}", index + 1, e)))?;
            let record: Record = columns
                .iter()
                .cloned()
                .zip(row.iter().map(ScalarValue::from_cell))
                .collect();
            records.push(record);
        }

        if records.is_empty() {
            return Err(OrchestratorError::malformed("dataset has no data rows"));
        }

        Ok(Self {
            columns,
            records: Arc::new(records),
        })
    }

    pub fn columns(&self) -> &[ColumnName] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn records(&self) -> &Arc<Vec<Record>> {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct group labels of a column, sorted
    pub fn distinct_values(&self, column: &str) -> BTreeSet<String> {
        self.records
            .iter()
            .filter_map(|record| record.get(column))
            .map(ScalarValue::label)
            .collect()
    }

    /// Numeric cells of a column in row order; text cells are skipped
    pub fn numeric_values(&self, column: &str) -> Vec<f64> {
        self.records
            .iter()
            .filter_map(|record| record.get(column))
            .filter_map(ScalarValue::as_f64)
            .collect()
    }

    /// Rows partitioned by the label of `group_by`, with the numeric `measure` values of each group
    pub fn grouped_values(&self, group_by: &str, measure: &str) -> BTreeMap<String, GroupRows> {
        group_records(&self.records, group_by, measure)
    }

    /// Records as sent to the statistics service for one query
    ///
    /// Group keys travel as their label text and measure cells as numbers where
    /// they read as one. Other columns pass through untouched.
    pub fn query_records(&self, group_by: &str, measure: &str) -> Arc<Vec<Record>> {
        let records = self
            .records
            .iter()
            .map(|record| {
                let mut record = record.clone();
                if let Some(cell) = record.get_mut(measure) {
                    if let Some(number) = cell.as_f64() {
                        *cell = ScalarValue::Number(number);
                    }
                }
                if let Some(cell) = record.get_mut(group_by) {
                    *cell = ScalarValue::Text(cell.label());
                }
                record
            })
            .collect();
        Arc::new(records)
    }
}

/// Partition raw records by the label of `group_by`
///
/// Records lacking the grouping column are skipped; non-numeric measure cells
/// count towards `rows` but not `values`.
pub fn group_records(records: &[Record], group_by: &str, measure: &str) -> BTreeMap<String, GroupRows> {
    let mut groups: BTreeMap<String, GroupRows> = BTreeMap::new();
    for record in records {
        let Some(key) = record.get(group_by) else {
            continue;
        };
        let group = groups.entry(key.label()).or_default();
        group.rows += 1;
        if let Some(value) = record.get(measure).and_then(ScalarValue::as_f64) {
            group.values.push(value);
        }
    }
    groups
}

/// Holder of the current dataset
#[derive(Debug, Default)]
pub struct DatasetStore {
    current: Option<Dataset>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and replace the current dataset; on error the previous one stays
    pub fn load(&mut self, raw_text: &str) -> OrchestratorResult<&Dataset> {
        let dataset = Dataset::parse(raw_text)?;
        Ok(self.current.insert(dataset))
    }

    pub fn current(&self) -> Option<&Dataset> {
        self.current.as_ref()
    }
}
