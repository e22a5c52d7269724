//! Writing tables to and reading them from SQLite databases.
//!
//! Each call to [`write_table`] runs in its own transaction, so a table is either written in full
//! or not at all. Nothing is rolled back across tables.
use crate::table::{Cell, Table};
use anyhow::{Context, Result, ensure};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Transaction, params_from_iter};
use std::path::Path;

/// What to do when writing a table which already exists in the database
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IfExists {
    /// Add the rows to the existing table, adding any new columns
    Append,
    /// Drop the existing table first
    Replace,
}

/// Open (or create) the database at the given path
pub fn open_database(file_path: &Path) -> Result<Connection> {
    Connection::open(file_path)
        .with_context(|| format!("Could not open database {}", file_path.display()))
}

/// Quote an identifier for use in SQL
fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// The SQLite column type for a column of cells.
///
/// Integers are widened to reals if the column mixes the two and anything containing text is
/// stored as text. Columns without any values are stored as reals.
fn column_type<'a, I>(cells: I) -> &'static str
where
    I: IntoIterator<Item = &'a Cell>,
{
    let mut kind = None;
    for cell in cells {
        kind = match (kind, cell) {
            (_, Cell::Text(_)) => return "TEXT",
            (_, Cell::Null) => kind,
            (None | Some("INTEGER"), Cell::Int(_)) => Some("INTEGER"),
            _ => Some("REAL"),
        };
    }

    kind.unwrap_or("REAL")
}

fn to_value(cell: &Cell) -> Value {
    match cell {
        Cell::Null => Value::Null,
        Cell::Int(value) => Value::Integer(*value),
        Cell::Real(value) if value.is_nan() => Value::Null,
        Cell::Real(value) => Value::Real(*value),
        Cell::Text(value) => Value::Text(value.clone()),
    }
}

fn to_cell(value: Value) -> Cell {
    match value {
        Value::Null | Value::Blob(_) => Cell::Null,
        Value::Integer(value) => Cell::Int(value),
        Value::Real(value) => Cell::Real(value),
        Value::Text(value) => Cell::Text(value),
    }
}

/// Whether a table with this name exists
fn table_exists(tx: &Transaction, name: &str) -> Result<bool> {
    let found = tx
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |_| Ok(()),
        )
        .optional()?;

    Ok(found.is_some())
}

/// The names of the columns of an existing table
fn existing_columns(tx: &Transaction, name: &str) -> Result<Vec<String>> {
    let mut stmt = tx.prepare(&format!("PRAGMA table_info({})", quote(name)))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<_>>()?;

    Ok(columns)
}

/// Write a table to the database.
///
/// Column types are inferred from the values. In append mode, columns missing from an existing
/// table are added to it (existing rows get nulls).
pub fn write_table(conn: &mut Connection, name: &str, table: &Table, mode: IfExists) -> Result<()> {
    ensure!(
        !table.columns().is_empty(),
        "Cannot write table {name} without columns"
    );

    let tx = conn.transaction()?;
    if mode == IfExists::Replace {
        tx.execute(&format!("DROP TABLE IF EXISTS {}", quote(name)), [])?;
    }

    let types = table
        .columns()
        .iter()
        .map(|column| {
            column_type(
                table
                    .column(column)
                    .expect("Column names come from the table"),
            )
        })
        .collect::<Vec<_>>();
    if table_exists(&tx, name)? {
        let existing = existing_columns(&tx, name)?;
        for (column, kind) in table.columns().iter().zip(&types) {
            if !existing.contains(column) {
                debug!("Adding column {column} to table {name}");
                tx.execute(
                    &format!("ALTER TABLE {} ADD COLUMN {} {kind}", quote(name), quote(column)),
                    [],
                )?;
            }
        }
    } else {
        let definitions = table
            .columns()
            .iter()
            .zip(&types)
            .map(|(column, kind)| format!("{} {kind}", quote(column)))
            .collect::<Vec<_>>()
            .join(", ");
        tx.execute(
            &format!("CREATE TABLE {} ({definitions})", quote(name)),
            [],
        )?;
    }

    {
        let columns = table
            .columns()
            .iter()
            .map(|column| quote(column))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; table.columns().len()].join(", ");
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {} ({columns}) VALUES ({placeholders})",
            quote(name)
        ))?;
        for row in table.rows() {
            stmt.execute(params_from_iter(row.iter().map(to_value)))?;
        }
    }
    tx.commit()
        .with_context(|| format!("Failed to write table {name}"))?;

    Ok(())
}

/// Read a whole table from the database
pub fn read_table(conn: &Connection, name: &str) -> Result<Table> {
    let mut stmt = conn
        .prepare(&format!("SELECT * FROM {}", quote(name)))
        .with_context(|| format!("Could not read table {name}"))?;
    let mut table = Table::new(stmt.column_names());
    let num_columns = table.columns().len();

    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let cells = (0..num_columns)
            .map(|idx| row.get::<_, Value>(idx).map(to_cell))
            .collect::<rusqlite::Result<_>>()?;
        table.push_row(cells);
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::tempdir;

    #[fixture]
    fn table() -> Table {
        let mut table = Table::new(["Year", "Site", "Capacity.Total", "Cost.Fuel"]);
        table.push_row(vec![2030.into(), "North".into(), 1.5.into(), Cell::Null]);
        table.push_row(vec![2035.into(), "South".into(), 2.0.into(), Cell::Null]);
        table
    }

    #[rstest]
    #[case(vec![Cell::Int(1), Cell::Null], "INTEGER")]
    #[case(vec![Cell::Int(1), Cell::Real(0.5)], "REAL")]
    #[case(vec![Cell::Real(0.5), Cell::Text("a".into())], "TEXT")]
    #[case(vec![Cell::Null], "REAL")]
    fn test_column_type(#[case] cells: Vec<Cell>, #[case] expected: &str) {
        assert_eq!(column_type(&cells), expected);
    }

    #[rstest]
    fn test_write_and_read_table(table: Table) {
        let dir = tempdir().unwrap();
        let mut conn = open_database(&dir.path().join("result.db")).unwrap();
        write_table(&mut conn, "Proc", &table, IfExists::Append).unwrap();

        assert_eq!(read_table(&conn, "Proc").unwrap(), table);
    }

    #[rstest]
    fn test_append_and_replace(table: Table) {
        let dir = tempdir().unwrap();
        let mut conn = open_database(&dir.path().join("result.db")).unwrap();
        write_table(&mut conn, "Proc", &table, IfExists::Append).unwrap();
        write_table(&mut conn, "Proc", &table, IfExists::Append).unwrap();
        assert_eq!(read_table(&conn, "Proc").unwrap().len(), 4);

        write_table(&mut conn, "Proc", &table, IfExists::Replace).unwrap();
        assert_eq!(read_table(&conn, "Proc").unwrap().len(), 2);
    }

    #[rstest]
    fn test_append_adds_columns(table: Table) {
        let dir = tempdir().unwrap();
        let mut conn = open_database(&dir.path().join("result.db")).unwrap();
        write_table(&mut conn, "Proc", &table, IfExists::Append).unwrap();

        let mut extra = Table::new(["Year", "Generation.Elec"]);
        extra.push_row(vec![2040.into(), 3.0.into()]);
        write_table(&mut conn, "Proc", &extra, IfExists::Append).unwrap();

        let read = read_table(&conn, "Proc").unwrap();
        assert_eq!(read.columns().last().unwrap(), "Generation.Elec");
        assert_eq!(read.len(), 3);
        assert_eq!(read.rows()[0][4], Cell::Null);
        assert_eq!(read.rows()[2][1], Cell::Null);
    }

    #[test]
    fn test_write_table_quotes_names() {
        let dir = tempdir().unwrap();
        let mut conn = open_database(&dir.path().join("input.db")).unwrap();
        let mut table = Table::new(["say \"hi\""]);
        table.push_row(vec!["hello".into()]);
        write_table(&mut conn, "Process-Commodity", &table, IfExists::Replace).unwrap();

        assert_eq!(read_table(&conn, "Process-Commodity").unwrap(), table);
    }

    #[test]
    fn test_write_table_no_columns() {
        let dir = tempdir().unwrap();
        let mut conn = open_database(&dir.path().join("result.db")).unwrap();
        assert!(write_table(&mut conn, "Empty", &Table::default(), IfExists::Append).is_err());
    }
}
