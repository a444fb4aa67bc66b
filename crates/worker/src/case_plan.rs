//! Case plan loading.
//!
//! The case plan is a CSV file with a header row. Each column becomes an
//! ordered sequence of [`CellValue`]s keyed by its (trimmed) header.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use simbatch_core::params::{unify_column, CellValue};

/// Column name -> cell values, top to bottom.
pub type CaseColumns = HashMap<String, Vec<CellValue>>;

/// Read every column of the CSV file at `path`.
///
/// Rows must all have the header's width. Blank cells become
/// [`CellValue::Empty`]. Each column is typed as a whole, see
/// [`unify_column`].
pub fn load_case_plan(path: &Path) -> Result<CaseColumns> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_path(path)
        .with_context(|| format!("Failed to open case plan: {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read case plan header: {}", path.display()))?
        .clone();

    let mut columns: Vec<Vec<CellValue>> = vec![Vec::new(); headers.len()];
    for (idx, result) in reader.records().enumerate() {
        let row = result.with_context(|| {
            format!("Failed to read row {} of case plan {}", idx + 1, path.display())
        })?;
        for (col, values) in columns.iter_mut().enumerate() {
            values.push(CellValue::parse(row.get(col).unwrap_or("")));
        }
    }

    Ok(headers
        .iter()
        .map(str::to_string)
        .zip(columns.into_iter().map(unify_column))
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn write_plan(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("CasePlan.csv");
        std::fs::write(&path, content).expect("write plan");
        (dir, path)
    }

    #[test]
    fn columns_keep_row_order() {
        let (_dir, path) = write_plan("Temperature,Pressure\n300,1.5\n350,2\n");
        let columns = load_case_plan(&path).expect("load");

        assert_eq!(
            columns["Temperature"],
            vec![CellValue::Int(300), CellValue::Int(350)]
        );
        assert_eq!(
            columns["Pressure"],
            vec![CellValue::Float(1.5), CellValue::Float(2.0)]
        );
    }

    #[test]
    fn headers_are_trimmed() {
        let (_dir, path) = write_plan(" Temperature , Fluid \n300,water\n");
        let columns = load_case_plan(&path).expect("load");

        assert!(columns.contains_key("Temperature"));
        assert_eq!(columns["Fluid"], vec![CellValue::Text("water".into())]);
    }

    #[test]
    fn blank_cells_are_empty() {
        let (_dir, path) = write_plan("A,B\n1,\n2,x\n");
        let columns = load_case_plan(&path).expect("load");
        assert_eq!(
            columns["B"],
            vec![CellValue::Empty, CellValue::Text("x".into())]
        );
    }

    #[test]
    fn whole_column_typing() {
        let (_dir, path) = write_plan("Pressure,Velocity,Label\n1.5,3,a\n2,,4\n");
        let columns = load_case_plan(&path).expect("load");

        let pressure: Vec<String> = columns["Pressure"].iter().map(|v| v.to_string()).collect();
        assert_eq!(pressure, vec!["1.5", "2.0"]);
        assert_eq!(
            columns["Velocity"],
            vec![CellValue::Float(3.0), CellValue::Empty]
        );
        assert_eq!(
            columns["Label"],
            vec![CellValue::Text("a".into()), CellValue::Int(4)]
        );
    }

    #[test]
    fn header_only_plan_has_empty_columns() {
        let (_dir, path) = write_plan("A,B\n");
        let columns = load_case_plan(&path).expect("load");
        assert_eq!(columns.len(), 2);
        assert!(columns["A"].is_empty());
    }

    #[test]
    fn ragged_row_is_an_error() {
        let (_dir, path) = write_plan("A,B\n1,2\n3\n");
        let err = load_case_plan(&path).expect_err("ragged");
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_case_plan(&dir.path().join("absent.csv")).expect_err("missing");
        assert!(err.to_string().contains("Failed to open case plan"));
    }
}
