use crate::{EconCiError, ObservationTable, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Dense matrix with labelled rows and columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledMatrix {
    pub rows: Vec<String>,
    pub cols: Vec<String>,
    pub values: Array2<f64>,
}

impl LabeledMatrix {
    pub fn new(rows: Vec<String>, cols: Vec<String>, values: Array2<f64>) -> Self {
        debug_assert_eq!(values.dim(), (rows.len(), cols.len()));
        Self { rows, cols, values }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        let r = self.rows.iter().position(|l| l == row)?;
        let c = self.cols.iter().position(|l| l == col)?;
        Some(self.values[[r, c]])
    }

    pub fn row_sums(&self) -> LabeledVector {
        LabeledVector::new(self.rows.clone(), self.values.sum_axis(Axis(1)))
    }

    pub fn col_sums(&self) -> LabeledVector {
        LabeledVector::new(self.cols.clone(), self.values.sum_axis(Axis(0)))
    }
}

/// Vector of values keyed by entity or item label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledVector {
    pub labels: Vec<String>,
    pub values: Array1<f64>,
}

impl LabeledVector {
    pub fn new(labels: Vec<String>, values: Array1<f64>) -> Self {
        debug_assert_eq!(labels.len(), values.len());
        Self { labels, values }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

/// Pivots the observation table into the dense entity x item flow matrix.
///
/// Rows sharing an (entity, item) pair are summed, pairs that never occur are 0, and NaN
/// values are skipped by the sum. Labels are compared exactly as written. Each axis is
/// sorted numerically when all of its labels parse as numbers (ties by text, so `0101`
/// precedes `101`), and by text otherwise.
pub fn build_flow_matrix(
    table: &ObservationTable,
    entity_column: &str,
    item_column: &str,
    value_column: &str,
) -> Result<LabeledMatrix> {
    table.validate_roles(entity_column, item_column, value_column)?;

    let missing = |name: &str| EconCiError::InvalidTable(format!("missing column '{}'", name));
    let entities = &table.column(entity_column).ok_or_else(|| missing(entity_column))?.data;
    let items = &table.column(item_column).ok_or_else(|| missing(item_column))?.data;
    let values = table
        .column(value_column)
        .ok_or_else(|| missing(value_column))?
        .data
        .numeric_values()
        .ok_or_else(|| {
            EconCiError::InvalidTable(format!("value column '{}' must be numeric", value_column))
        })?;

    let mut totals: BTreeMap<(String, String), f64> = BTreeMap::new();
    let mut entity_set = BTreeSet::new();
    let mut item_set = BTreeSet::new();
    let mut skipped = 0usize;

    for (row, value) in values.iter().enumerate() {
        let (Some(entity), Some(item)) = (entities.label(row), items.label(row)) else {
            continue;
        };
        entity_set.insert(entity.clone());
        item_set.insert(item.clone());
        let cell = totals.entry((entity, item)).or_insert(0.0);
        if value.is_nan() {
            skipped += 1;
        } else {
            *cell += value;
        }
    }

    if skipped > 0 {
        debug!("Skipped {} NaN flow values while building M", skipped);
    }

    let rows = sorted_labels(entity_set);
    let cols = sorted_labels(item_set);
    let row_index: BTreeMap<&str, usize> =
        rows.iter().enumerate().map(|(i, l)| (l.as_str(), i)).collect();
    let col_index: BTreeMap<&str, usize> =
        cols.iter().enumerate().map(|(i, l)| (l.as_str(), i)).collect();

    let mut matrix = Array2::<f64>::zeros((rows.len(), cols.len()));
    for ((entity, item), total) in &totals {
        matrix[[row_index[entity.as_str()], col_index[item.as_str()]]] = *total;
    }

    debug!("Built flow matrix: {} entities x {} items", rows.len(), cols.len());
    Ok(LabeledMatrix::new(rows, cols, matrix))
}

fn sorted_labels(labels: BTreeSet<String>) -> Vec<String> {
    let mut labels: Vec<String> = labels.into_iter().collect();
    let keys: Option<Vec<f64>> = labels.iter().map(|l| l.parse::<f64>().ok()).collect();
    if let Some(keys) = keys {
        let mut keyed: Vec<(f64, String)> = keys.into_iter().zip(labels).collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        labels = keyed.into_iter().map(|(_, label)| label).collect();
    }
    labels
}
