use crate::{EconCiError, Result};
use std::borrow::Cow;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Values of a single table column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Text(Vec<String>),
    Numeric(Vec<f64>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Text(values) => values.len(),
            ColumnData::Numeric(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Renders the value at `row` as a label. Text is returned as written; integral
    /// numbers drop the fractional part, so `76.0` becomes `"76"`.
    pub fn label(&self, row: usize) -> Option<String> {
        match self {
            ColumnData::Text(values) => values.get(row).cloned(),
            ColumnData::Numeric(values) => values.get(row).map(|v| format_numeric_label(*v)),
        }
    }

    /// The column read as flow values. Text parses field by field, empty fields becoming
    /// NaN; `None` when some non-empty field is not a number.
    pub fn numeric_values(&self) -> Option<Cow<'_, [f64]>> {
        match self {
            ColumnData::Numeric(values) => Some(Cow::Borrowed(values.as_slice())),
            ColumnData::Text(fields) => fields
                .iter()
                .map(|f| {
                    if f.is_empty() {
                        Some(f64::NAN)
                    } else {
                        f.parse::<f64>().ok()
                    }
                })
                .collect::<Option<Vec<f64>>>()
                .map(Cow::Owned),
        }
    }
}

fn format_numeric_label(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn text(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Text(values),
        }
    }

    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }
}

/// Column-oriented table of (entity, item, value) observations.
///
/// Every column has the same number of rows and a unique name. The table makes no
/// assumption about which columns play the entity/item/value roles; that is decided
/// when a [`ObservationTable::validate_roles`] check passes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationTable {
    columns: Vec<Column>,
}

impl ObservationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let mut table = Self::new();
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    /// Builds a three-column table from `(entity, item, value)` triples.
    pub fn from_records<E, P>(
        entity_column: &str,
        item_column: &str,
        value_column: &str,
        records: impl IntoIterator<Item = (E, P, f64)>,
    ) -> Result<Self>
    where
        E: Into<String>,
        P: Into<String>,
    {
        let mut entities = Vec::new();
        let mut items = Vec::new();
        let mut values = Vec::new();
        for (entity, item, value) in records {
            entities.push(entity.into());
            items.push(item.into());
            values.push(value);
        }

        Self::from_columns(vec![
            Column::text(entity_column, entities),
            Column::text(item_column, items),
            Column::numeric(value_column, values),
        ])
    }

    /// Reads a headered CSV file. Every column is kept as text exactly as written (after
    /// trimming), so codes such as `0101` and `101` stay distinct; the value column is
    /// parsed when a role check or the flow matrix asks for it.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Reading observation table from {}", path.display());
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        if headers.is_empty() {
            return Err(EconCiError::InvalidTable("CSV input has no header row".into()));
        }

        let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for record in reader.records() {
            let record = record?;
            for (column, field) in raw.iter_mut().zip(record.iter()) {
                column.push(field.trim().to_string());
            }
        }

        let columns = headers
            .into_iter()
            .zip(raw)
            .map(|(name, fields)| Column::text(name, fields))
            .collect();
        let table = Self::from_columns(columns)?;
        debug!(
            "Loaded {} rows across {} columns",
            table.num_rows(),
            table.columns.len()
        );
        Ok(table)
    }

    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if self.column(&column.name).is_some() {
            return Err(EconCiError::InvalidTable(format!(
                "duplicate column '{}'",
                column.name
            )));
        }
        if let Some(first) = self.columns.first() {
            if first.data.len() != column.data.len() {
                return Err(EconCiError::InvalidTable(format!(
                    "column '{}' has {} rows, expected {}",
                    column.name,
                    column.data.len(),
                    first.data.len()
                )));
            }
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.data.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// Checks that the three role columns exist and that the value column holds numbers.
    pub fn validate_roles(&self, entity: &str, item: &str, value: &str) -> Result<()> {
        for name in [entity, item, value] {
            if self.column(name).is_none() {
                return Err(EconCiError::InvalidTable(format!(
                    "missing column '{}' (available: {})",
                    name,
                    self.column_names().join(", ")
                )));
            }
        }
        match self.column(value).and_then(|c| c.data.numeric_values()) {
            Some(_) => Ok(()),
            None => Err(EconCiError::InvalidTable(format!(
                "value column '{}' must be numeric",
                value
            ))),
        }
    }
}
