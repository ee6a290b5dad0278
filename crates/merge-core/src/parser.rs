//! CSV parser producing typed tables

use crate::error::{Error, Result};
use crate::table::{CellValue, Column, Row, Table};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Parse a CSV file into a Table.
///
/// The table identifier is the file stem (e.g. "orders" for "orders.csv").
pub fn parse_csv<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table")
        .to_string();

    let file = File::open(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let reader = BufReader::new(file);
    let csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true) // Allow varying number of fields
        .from_reader(reader);

    parse_reader(csv_reader, name, path)
}

/// Parse CSV from a string (useful for testing)
pub fn parse_csv_str(content: &str, name: &str) -> Result<Table> {
    let csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let path = std::path::PathBuf::from(format!("{}.csv", name));
    parse_reader(csv_reader, name.to_string(), &path)
}

fn parse_reader<R: std::io::Read>(
    mut csv_reader: csv::Reader<R>,
    name: String,
    path: &Path,
) -> Result<Table> {
    // Parse headers into columns
    let headers = csv_reader.headers().map_err(|e| Error::Csv {
        path: path.to_path_buf(),
        source: e,
    })?;

    let columns: Vec<Column> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| Column::new(header.to_string(), i))
        .collect();

    if columns.is_empty() {
        return Err(Error::MalformedTable {
            table: name,
            message: "no columns found in CSV".to_string(),
        });
    }

    // Column names must be unique; a duplicate header makes joins ambiguous
    let mut seen = HashSet::new();
    for col in &columns {
        if !seen.insert(col.name.as_str()) {
            return Err(Error::MalformedTable {
                table: name,
                message: format!("duplicate column '{}'", col.name),
            });
        }
    }

    // Parse rows
    let mut rows = Vec::new();
    for (row_idx, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|e| Error::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;

        let cells: Vec<CellValue> = record.iter().map(CellValue::parse).collect();

        // Pad with empty cells if row is shorter than header
        let mut padded_cells = cells;
        while padded_cells.len() < columns.len() {
            padded_cells.push(CellValue::Empty);
        }

        // Warn if row is longer than header (truncate)
        if padded_cells.len() > columns.len() {
            eprintln!(
                "Warning: row {} in {} has more cells than columns, truncating",
                row_idx + 1,
                path.display()
            );
            padded_cells.truncate(columns.len());
        }

        rows.push(Row::new(padded_cells));
    }

    Ok(Table {
        name,
        columns,
        rows,
        source_path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_csv() {
        let csv = "id,name,value\n1,foo,100\n2,bar,200\n";
        let table = parse_csv_str(csv, "test").unwrap();

        assert_eq!(table.name, "test");
        assert_eq!(table.columns.len(), 3);
        assert_eq!(table.columns[0].name, "id");
        assert_eq!(table.columns[1].name, "name");
        assert_eq!(table.columns[2].name, "value");

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].cells[0], CellValue::Integer(1));
        assert_eq!(table.rows[1].cells[1], CellValue::String("bar".to_string()));
    }

    #[test]
    fn test_parse_with_empty_cells() {
        let csv = "id,name,value\n1,,100\n2,bar,\n";
        let table = parse_csv_str(csv, "test").unwrap();

        assert_eq!(table.rows[0].cells[1], CellValue::Empty);
        assert_eq!(table.rows[1].cells[2], CellValue::Empty);
    }

    #[test]
    fn test_parse_with_floats() {
        let csv = "id,value\n1,3.14\n2,-2.5\n";
        let table = parse_csv_str(csv, "test").unwrap();

        assert_eq!(table.rows[0].cells[1], CellValue::Float(3.14));
        assert_eq!(table.rows[1].cells[1], CellValue::Float(-2.5));
    }

    #[test]
    fn test_parse_pads_short_rows() {
        let csv = "id,name,value\n1,foo\n";
        let table = parse_csv_str(csv, "test").unwrap();

        assert_eq!(table.rows[0].cells.len(), 3);
        assert_eq!(table.rows[0].cells[2], CellValue::Empty);
    }

    #[test]
    fn test_parse_rejects_duplicate_headers() {
        let csv = "id,name,id\n1,foo,2\n";
        let result = parse_csv_str(csv, "test");

        assert!(matches!(
            result,
            Err(Error::MalformedTable { table, .. }) if table == "test"
        ));
    }

    #[test]
    fn test_parse_keeps_header_names_verbatim() {
        // Only exact name equality connects tables; a header with stray
        // whitespace stays a different column for diagnostics to surface
        let csv = " id , name \n1,foo\n";
        let table = parse_csv_str(csv, "test").unwrap();

        assert_eq!(table.columns[0].name, " id ");
        assert_eq!(table.columns[1].name, " name ");
    }
}
