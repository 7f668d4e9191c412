//! Spreadsheet Loader Module
//! Reads the migration workbook with calamine and builds the canonical table.

use super::processor::DataProcessor;
use super::table::MigrationTable;
use calamine::{open_workbook_auto, Data, Reader};
use polars::prelude::PolarsError;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Sheet holding the by-country-of-birth series.
pub const DEFAULT_SHEET: &str = "all_by_country_birth";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Data file not found: {0}")]
    MissingFile(PathBuf),
    #[error("Failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("Sheet is missing the '{0}' attribute row")]
    MissingAttribute(&'static str),
    #[error("Country '{0}' appears more than once")]
    DuplicateCountry(String),
    #[error("Unexpected sheet layout: {0}")]
    SchemaMismatch(String),
    #[error("Non-numeric migration count for {country} in {period}: '{value}'")]
    NonNumeric {
        country: String,
        period: String,
        value: String,
    },
    #[error("Invalid boundary overlay: {0}")]
    Overlay(String),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

/// Loads the migration workbook into a `MigrationTable`.
#[derive(Debug, Clone)]
pub struct DataLoader {
    sheet_name: String,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            sheet_name: DEFAULT_SHEET.to_string(),
        }
    }

    pub fn with_sheet(mut self, sheet_name: impl Into<String>) -> Self {
        self.sheet_name = sheet_name.into();
        self
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Load and reshape the workbook at `path`.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<MigrationTable, LoadError> {
        let path = path.as_ref();
        let rows = self.read_rows(path)?;
        let table = Self::from_rows(&rows)?;

        info!(
            path = %path.display(),
            countries = table.height(),
            periods = table.periods().len(),
            "Loaded migration table"
        );

        Ok(table)
    }

    /// Build the table from an in-memory grid laid out like the sheet.
    pub fn from_rows(rows: &[Vec<Data>]) -> Result<MigrationTable, LoadError> {
        let sheet = DataProcessor::reshape(rows)?;
        MigrationTable::from_records(sheet.periods, sheet.records)
    }

    /// Read the configured sheet as a grid of cells.
    pub fn read_rows(&self, path: &Path) -> Result<Vec<Vec<Data>>, LoadError> {
        if !path.is_file() {
            return Err(LoadError::MissingFile(path.to_path_buf()));
        }

        let mut workbook = open_workbook_auto(path)?;
        let range = workbook.worksheet_range(&self.sheet_name)?;

        Ok(range.rows().map(|row| row.to_vec()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::processor::tests::sample_grid;

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ozimmig.xlsx");

        match DataLoader::new().load(&path) {
            Err(LoadError::MissingFile(p)) => assert_eq!(p, path),
            other => panic!("expected MissingFile, got {:?}", other.map(|t| t.height())),
        }
    }

    #[test]
    fn unreadable_file_is_a_workbook_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ozimmig.xlsx");
        std::fs::write(&path, b"not a spreadsheet").unwrap();

        let err = DataLoader::new().load(&path).unwrap_err();
        assert!(matches!(err, LoadError::Workbook(_)));
    }

    /// Write a one-sheet xlsx workbook with inline strings and numbers.
    fn write_workbook(path: &Path, sheet: &str, rows: &[Vec<&str>]) {
        use std::io::Write;
        use zip::write::FileOptions;
        use zip::ZipWriter;

        let mut cells = String::new();
        for (r, row) in rows.iter().enumerate() {
            cells.push_str(&format!("<row r=\"{}\">", r + 1));
            for (c, value) in row.iter().enumerate() {
                let cell_ref = format!("{}{}", (b'A' + c as u8) as char, r + 1);
                if value.is_empty() {
                    continue;
                } else if value.parse::<f64>().is_ok() {
                    cells.push_str(&format!("<c r=\"{}\"><v>{}</v></c>", cell_ref, value));
                } else {
                    cells.push_str(&format!(
                        "<c r=\"{}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
                        cell_ref, value
                    ));
                }
            }
            cells.push_str("</row>");
        }

        let parts = [
            (
                "[Content_Types].xml",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#
                    .to_string(),
            ),
            (
                "_rels/.rels",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
                    .to_string(),
            ),
            (
                "xl/workbook.xml",
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
                    sheet
                ),
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#
                    .to_string(),
            ),
            (
                "xl/worksheets/sheet1.xml",
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
                    cells
                ),
            ),
        ];

        let mut zip = ZipWriter::new(std::fs::File::create(path).unwrap());
        for (name, body) in parts {
            zip.start_file(name, FileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    fn workbook_rows() -> Vec<Vec<&'static str>> {
        vec![
            vec!["Year", "England", "Italy", "China"],
            vec!["Continent", "Europe", "Europe", "Asia"],
            vec!["Region", "North-West Europe", "Southern Europe", "North-East Asia"],
            vec!["1958", "100", "40", ""],
            vec!["Jan-Jun 1959", "10", "5", ""],
            vec!["1959–60", "20", "7", "3"],
            vec!["1961", "30", "0", "8"],
        ]
    }

    #[test]
    fn loads_workbook_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ozimmig.xlsx");
        write_workbook(&path, DEFAULT_SHEET, &workbook_rows());

        let table = DataLoader::new().load(&path).unwrap();
        assert_eq!(table.height(), 3);
        assert_eq!(table.periods(), ["1958", "1959–60", "1961"]);
        assert_eq!(table.grand_total().unwrap(), 223.0);

        let england = table.country_series("England").unwrap().unwrap();
        assert_eq!(england.values, vec![100.0, 30.0, 30.0]);
        assert_eq!(england.total, 160.0);
    }

    #[test]
    fn missing_sheet_is_a_workbook_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ozimmig.xlsx");
        write_workbook(&path, "some_other_sheet", &workbook_rows());

        let err = DataLoader::new().load(&path).unwrap_err();
        assert!(matches!(err, LoadError::Workbook(_)), "{:?}", err);

        let table = DataLoader::new()
            .with_sheet("some_other_sheet")
            .load(&path)
            .unwrap();
        assert_eq!(table.height(), 3);
    }

    #[test]
    fn builds_table_from_rows() {
        let table = DataLoader::from_rows(&sample_grid()).unwrap();
        assert_eq!(table.height(), 3);
        assert_eq!(table.periods(), ["1958", "1959–60", "1961"]);
    }

    #[test]
    fn sheet_name_is_configurable() {
        let loader = DataLoader::default().with_sheet("other");
        assert_eq!(loader.sheet_name(), "other");
        assert_eq!(DataLoader::new().sheet_name(), DEFAULT_SHEET);
    }
}
