//! Writing tables to Excel workbooks.
use crate::table::{Cell, Table};
use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::Path;

/// Write a table to a worksheet, with a bold header row.
///
/// Null and NaN values are left blank and other non-finite numbers are written as text.
fn write_sheet(worksheet: &mut Worksheet, table: &Table) -> Result<()> {
    let header = Format::new().set_bold();
    for (col, name) in table.columns().iter().enumerate() {
        worksheet.write_string_with_format(0, u16::try_from(col)?, name, &header)?;
    }

    for (row_idx, row) in table.rows().iter().enumerate() {
        let row_num = u32::try_from(row_idx + 1)?;
        for (col, cell) in row.iter().enumerate() {
            let col = u16::try_from(col)?;
            match cell {
                Cell::Null => {}
                Cell::Real(value) if value.is_nan() => {}
                Cell::Real(value) if value.is_infinite() => {
                    worksheet.write_string(row_num, col, value.to_string())?;
                }
                Cell::Real(value) => {
                    worksheet.write_number(row_num, col, *value)?;
                }
                Cell::Int(value) => {
                    worksheet.write_number(row_num, col, *value as f64)?;
                }
                Cell::Text(value) => {
                    worksheet.write_string(row_num, col, value)?;
                }
            }
        }
    }

    Ok(())
}

/// Write a workbook with one sheet per table, replacing any existing file
pub fn write_workbook(file_path: &Path, sheets: &[(&str, &Table)]) -> Result<()> {
    let mut workbook = Workbook::new();
    for (name, table) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name)?;
        write_sheet(worksheet, table).with_context(|| format!("Failed to write sheet {name}"))?;
    }

    workbook
        .save(file_path)
        .with_context(|| format!("Failed to write workbook {}", file_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{Data, Reader, Xlsx, open_workbook};
    use tempfile::tempdir;

    #[test]
    fn test_write_workbook() {
        let mut costs = Table::new(["Year", "Type", "Costs"]);
        costs.push_row(vec![2030.into(), "Invest".into(), 1.5.into()]);
        costs.push_row(vec![2035.into(), "Fuel".into(), Cell::Null]);
        let proc = Table::new(["Year", "Site", "Process"]);

        let dir = tempdir().unwrap();
        let file_path = dir.path().join("base.xlsx");
        write_workbook(&file_path, &[("Costs", &costs), ("Proc", &proc)]).unwrap();

        let mut workbook: Xlsx<_> = open_workbook(&file_path).unwrap();
        assert_eq!(workbook.sheet_names(), ["Costs", "Proc"]);

        let range = workbook.worksheet_range("Costs").unwrap();
        let rows: Vec<_> = range.rows().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][2], Data::String("Costs".into()));
        assert_eq!(rows[1][0], Data::Float(2030.0));
        assert_eq!(rows[1][2], Data::Float(1.5));
        assert_eq!(rows[2][2], Data::Empty);
    }
}
