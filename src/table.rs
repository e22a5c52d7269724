//! A minimal tabular container for reshaped results and input snapshots.
//!
//! Summary tables are built once and then only read by the export writers, so the type is a plain
//! list of named columns and rows of [`Cell`]s rather than a full dataframe.
use anyhow::{Context, Result, ensure};
use std::fmt;
use std::path::Path;

/// A single value in a [`Table`]
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// A missing value
    Null,
    /// An integer (years, timesteps, flags)
    Int(i64),
    /// A floating-point number
    Real(f64),
    /// A string
    Text(String),
}

impl Cell {
    /// Create a text cell from anything that can be displayed (e.g. an ID)
    pub fn text<T: fmt::Display>(value: T) -> Self {
        Cell::Text(value.to_string())
    }

    /// Parse a raw CSV field, choosing the narrowest type that fits
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            Cell::Null
        } else if let Ok(value) = raw.parse::<i64>() {
            Cell::Int(value)
        } else if let Ok(value) = raw.parse::<f64>() {
            Cell::Real(value)
        } else {
            Cell::Text(raw.to_string())
        }
    }

    /// The numeric value of the cell, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(value) => Some(*value as f64),
            Cell::Real(value) => Some(*value),
            Cell::Null | Cell::Text(_) => None,
        }
    }

    /// Whether the cell is [`Cell::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

impl From<u32> for Cell {
    fn from(value: u32) -> Self {
        Cell::Int(value.into())
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Real(value)
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Null, Cell::Real)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Int(value) => write!(f, "{value}"),
            Cell::Real(value) => write!(f, "{value}"),
            Cell::Text(value) => write!(f, "{value}"),
        }
    }
}

/// A key made of several index values (e.g. year, site and process)
pub trait IndexKey {
    /// The names of the index levels, in order
    fn index_names() -> Vec<&'static str>;

    /// The values of the index levels, in the same order as [`IndexKey::index_names`]
    fn index_cells(&self) -> Vec<Cell>;
}

impl IndexKey for u32 {
    fn index_names() -> Vec<&'static str> {
        vec!["stf"]
    }

    fn index_cells(&self) -> Vec<Cell> {
        vec![(*self).into()]
    }
}

/// Named columns with rows of [`Cell`]s
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Create an empty table with the given column names
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Column names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row.
    ///
    /// # Panics
    ///
    /// If the row length does not match the number of columns.
    pub fn push_row(&mut self, row: Vec<Cell>) {
        assert_eq!(
            row.len(),
            self.columns.len(),
            "Row length does not match number of columns"
        );
        self.rows.push(row);
    }

    /// The position of the named column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Iterate over the values of the named column
    pub fn column<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a Cell> + 'a> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Sum the numeric values of the named column, treating missing values as zero
    pub fn column_sum(&self, name: &str) -> f64 {
        self.column(name)
            .map(|cells| cells.filter_map(Cell::as_f64).sum())
            .unwrap_or(0.0)
    }

    /// Add a column at position `idx` holding the same value in every row
    pub fn insert_constant_column(&mut self, idx: usize, name: &str, value: &Cell) {
        self.columns.insert(idx, name.to_string());
        for row in &mut self.rows {
            row.insert(idx, value.clone());
        }
    }

    /// Add a column at the end holding the same value in every row
    pub fn push_constant_column(&mut self, name: &str, value: &Cell) {
        self.insert_constant_column(self.columns.len(), name, value);
    }

    /// Read a CSV file into a table, inferring the type of each field
    pub fn from_csv_path(file_path: &Path) -> Result<Table> {
        let mut reader = csv::Reader::from_path(file_path)
            .with_context(|| format!("Could not open {}", file_path.display()))?;
        let mut table = Table::new(reader.headers()?.iter().map(str::trim));
        for record in reader.records() {
            let record = record?;
            ensure!(
                record.len() == table.columns.len(),
                "Wrong number of fields in {}",
                file_path.display()
            );
            table.push_row(record.iter().map(Cell::parse).collect());
        }

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    #[rstest]
    #[case("", Cell::Null)]
    #[case(" 2030 ", Cell::Int(2030))]
    #[case("0.5", Cell::Real(0.5))]
    #[case("inf", Cell::Real(f64::INFINITY))]
    #[case("Solar", Cell::Text("Solar".into()))]
    fn test_cell_parse(#[case] raw: &str, #[case] expected: Cell) {
        assert_eq!(Cell::parse(raw), expected);
    }

    #[test]
    fn test_constant_columns() {
        let mut table = Table::new(["Year", "Costs"]);
        table.push_row(vec![2030.into(), 1.0.into()]);
        table.push_row(vec![2035.into(), Cell::Null]);
        table.push_constant_column("Scenario", &"base".into());
        table.insert_constant_column(0, "Run", &Cell::Int(1));

        assert_eq!(table.columns(), ["Run", "Year", "Costs", "Scenario"]);
        assert_eq!(
            table.rows()[1],
            vec![Cell::Int(1), 2035.into(), Cell::Null, "base".into()]
        );
        assert_eq!(table.column_sum("Costs"), 1.0);
        assert_eq!(table.column_sum("Missing"), 0.0);
    }

    #[test]
    #[should_panic(expected = "Row length does not match number of columns")]
    fn test_push_row_wrong_length() {
        let mut table = Table::new(["a", "b"]);
        table.push_row(vec![Cell::Null]);
    }

    #[test]
    fn test_from_csv_path() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("process.csv");
        fs::write(&file_path, "support_timeframe,site,cap_up\n2030,North,inf\n2035,South,\n")
            .unwrap();

        let table = Table::from_csv_path(&file_path).unwrap();
        assert_eq!(table.columns(), ["support_timeframe", "site", "cap_up"]);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.rows()[1],
            vec![Cell::Int(2035), "South".into(), Cell::Null]
        );
    }
}
