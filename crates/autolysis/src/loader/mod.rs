//! Dataset loading.
//!
//! Reads a delimited file into a [`Table`]. Input bytes are decoded as
//! ISO-8859-1 so files exported by spreadsheet tools in legacy code pages
//! load without decoding errors. Any read or parse failure is fatal: no
//! partial table is ever returned.

mod dates;

pub use dates::{coerce_to_datetime, datetime_millis, is_date_column_name};

use crate::error::{AnalysisError, Result};
use crate::types::Table;
use crate::utils::decode_latin1;
use polars::io::csv::read::{CsvReadOptions, NullValues};
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

/// Field values read as missing, in addition to empty fields.
///
/// Matches the NA spellings spreadsheet and dataframe exports commonly use.
pub const NA_VALUES: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Loads delimited files into typed tables.
pub struct DatasetLoader;

impl DatasetLoader {
    /// Load a CSV file into a [`Table`].
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::FileNotFound`] if the path does not exist
    /// - [`AnalysisError::PermissionDenied`] if it cannot be read
    /// - [`AnalysisError::LoadFailed`] if the content is not a valid table
    pub fn load(path: impl AsRef<Path>) -> Result<Table> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AnalysisError::FileNotFound(path.to_path_buf()));
        }

        info!("Loading dataset from: {}", path.display());
        let bytes = std::fs::read(path).map_err(|e| AnalysisError::from_io(path, e))?;
        let table = Self::from_text(decode_latin1(&bytes))?;

        Self::log_table_info(&table);
        Ok(table)
    }

    /// Parse already-decoded CSV text.
    pub fn from_text(text: impl Into<String>) -> Result<Table> {
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .with_parse_options(
                CsvParseOptions::default()
                    .with_try_parse_dates(true)
                    .with_null_values(Some(NullValues::AllColumns(
                        NA_VALUES.iter().map(|v| PlSmallStr::from_static(v)).collect(),
                    ))),
            )
            .into_reader_with_file_handle(Cursor::new(text.into()))
            .finish()
            .map_err(|e| AnalysisError::LoadFailed(e.to_string()))?;

        if frame.width() == 0 {
            return Err(AnalysisError::LoadFailed("no columns found".to_string()));
        }

        let frame = Self::coerce_date_columns(frame)?;
        Ok(Table::new(frame))
    }

    /// Convert date-named text columns to datetimes where every value parses.
    fn coerce_date_columns(mut frame: DataFrame) -> Result<DataFrame> {
        let candidates: Vec<String> = frame
            .get_columns()
            .iter()
            .filter(|col| col.dtype() == &DataType::String && is_date_column_name(col.name()))
            .map(|col| col.name().to_string())
            .collect();

        for name in candidates {
            let series = frame.column(&name)?.as_materialized_series().clone();
            match coerce_to_datetime(&series) {
                Some(converted) => {
                    debug!("Coerced column '{}' to datetime", name);
                    frame.replace(&name, converted)?;
                }
                None => debug!("Column '{}' looks like a date but did not parse", name),
            }
        }

        Ok(frame)
    }

    fn log_table_info(table: &Table) {
        let (rows, cols) = table.shape();
        info!("Data Loaded Successfully");
        info!("Dataset Shape: ({}, {})", rows, cols);
        info!("Column Information:");
        for col in table.frame().get_columns() {
            info!(
                "  {:<24} {:>8} non-null  {}",
                col.name(),
                col.len() - col.null_count(),
                col.dtype()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnKind;
    use std::io::Write;

    #[test]
    fn test_load_missing_file() {
        let result = DatasetLoader::load("/definitely/not/here.csv");
        assert!(matches!(result, Err(AnalysisError::FileNotFound(_))));
    }

    #[test]
    fn test_from_text_infers_kinds() {
        let table = DatasetLoader::from_text(
            "date,revenue,units,region\n\
             2024-01-01,10.5,3,north\n\
             2024-02-01,12.0,4,south\n",
        )
        .unwrap();

        assert_eq!(table.shape(), (2, 4));
        assert_eq!(table.kind_of("date"), Some(ColumnKind::Datetime));
        assert_eq!(table.kind_of("revenue"), Some(ColumnKind::Float));
        assert_eq!(table.kind_of("units"), Some(ColumnKind::Integer));
        assert_eq!(table.kind_of("region"), Some(ColumnKind::Text));
    }

    #[test]
    fn test_from_text_coerces_us_dates() {
        let table = DatasetLoader::from_text(
            "order_date,amount\n01/15/2024,1\n02/15/2024,2\n",
        )
        .unwrap();
        assert_eq!(table.kind_of("order_date"), Some(ColumnKind::Datetime));
    }

    #[test]
    fn test_from_text_keeps_unparseable_dates_as_text() {
        let table = DatasetLoader::from_text("date,amount\nyesterday,1\ntoday,2\n").unwrap();
        assert_eq!(table.kind_of("date"), Some(ColumnKind::Text));
    }

    #[test]
    fn test_from_text_reads_na_tokens_as_missing() {
        let table =
            DatasetLoader::from_text("x,label\n1.5,a\nNA,b\n3.0,NULL\n4.0,d\nnan,None\n")
                .unwrap();

        assert_eq!(table.kind_of("x"), Some(ColumnKind::Float));
        let x = table.series("x").unwrap();
        assert_eq!(x.null_count(), 2);
        assert_eq!(table.series("label").unwrap().null_count(), 2);
    }

    #[test]
    fn test_from_text_empty_input_fails() {
        let result = DatasetLoader::from_text("");
        assert!(matches!(result, Err(AnalysisError::LoadFailed(_))));
    }

    #[test]
    fn test_load_latin1_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"city,population\nS\xE3o Paulo,12\nMalm\xF6,3\n")
            .unwrap();

        let table = DatasetLoader::load(file.path()).unwrap();
        let cities = table.series("city").unwrap();
        assert_eq!(cities.str().unwrap().get(0), Some("São Paulo"));
        assert_eq!(cities.str().unwrap().get(1), Some("Malmö"));
    }
}
