//! # Spreadsheet Reading
//!
//! Decodes Office Open XML (`.xlsx`, `.xlsm`, `.xlam`), legacy Excel (`.xls`) and
//! OpenDocument (`.ods`) workbooks into a [`Table`], from a path on disk or from uploaded bytes.
//! Each format implements [`Spreadsheet`]; [`ReadOptions`] selects the sheet,
//! the range and how header, null and error cells are treated.

pub(crate) mod cell;
pub(crate) mod criteria;
pub(crate) mod excel;
pub mod ods;
pub mod range;
pub(crate) mod reference;
pub(crate) mod sheet;
pub(crate) mod xls;
pub(crate) mod xlsx;

use crate::error::ResultMessage;
use crate::error::ResultStage;
use crate::error::RustyDishError;
use crate::error::Stage;
use crate::helpers::reader::UnifiedReader;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::ods::OdsSpreadsheet;
use crate::spreadsheet::range::Range;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::xls::XlsSpreadsheet;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use crate::table::Table;
use glob::Pattern;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Number of data rows shown when previewing an upload for column picking
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Invalid cell value at {0}: {1}")]
    CellValueError(String, String),

    #[error("Missing part '{0}'")]
    FileError(String),

    #[error("Spreadsheet '{0}' is password protected")]
    SpreadsheetPasswordProtectedError(String),

    #[error("Spreadsheet '{0}' has no worksheet")]
    SpreadsheetEmptyError(String),

    #[error("Unsupported file format '{0}'")]
    UnsupportedFormatError(String),

    #[error("Sheet matching '{1}' not found in '{0}'")]
    SheetNotFoundError(String, String),

    #[error("Missing header row in sheet '{0}'")]
    MissingHeaderRowError(String),
}

/// Common interface of the workbook formats.
pub(crate) trait Spreadsheet {
    fn name(&self) -> String;

    /// Loads the workbook-wide shared string table (empty for formats without one).
    fn load_shared_strings(&mut self) -> Result<Vec<String>, RustyDishError>;

    /// Reads the first sheet accepted by the criteria, `None` when no sheet matches.
    fn read_sheet(&mut self, criteria: &Criteria) -> Result<Option<Sheet>, RustyDishError>;
}

/// Opens a workbook, choosing the format from the file name extension.
pub(crate) fn open_spreadsheet(name: &str, reader: UnifiedReader) -> Result<Box<dyn Spreadsheet>, RustyDishError> {
    let extension = Path::new(name)
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "xlsx" | "xlsm" | "xlam" => Ok(Box::new(XlsxSpreadsheet::open(name, reader)?)),
        "xls" => Ok(Box::new(XlsSpreadsheet::open(name, reader)?)),
        "ods" => Ok(Box::new(OdsSpreadsheet::open(name, reader)?)),
        _ => Err(SpreadsheetError::UnsupportedFormatError(name.to_owned()))?,
    }
}

/// How a sheet is turned into a table.
#[derive(Clone, Debug, PartialEq)]
pub struct ReadOptions {
    /// Glob pattern selecting the sheet; the first sheet when `None`.
    pub sheet: Option<String>,
    /// Whether the first row holds the column names.
    pub header: bool,
    /// Excel-style range such as `A1:D200`, `B:D` or `3:`.
    pub range: Option<String>,
    /// Maximum number of data rows, header excluded.
    pub rows_limit: Option<usize>,
    /// Text values read as empty cells.
    pub nulls: HashSet<String>,
    pub error_as_null: bool,
    pub skip_empty_rows: bool,
    pub end_at_empty_row: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            sheet: None,
            header: true,
            range: None,
            rows_limit: None,
            nulls: HashSet::from([String::new()]),
            error_as_null: false,
            skip_empty_rows: false,
            end_at_empty_row: false,
        }
    }
}

impl ReadOptions {
    /// Same options limited to the first `rows` data rows.
    pub fn preview(&self, rows: usize) -> ReadOptions {
        ReadOptions {
            rows_limit: Some(rows),
            ..self.clone()
        }
    }

    fn criteria(&self) -> Result<Criteria, RustyDishError> {
        let sheet_name_pattern = self.sheet.as_deref().map(Pattern::new).transpose()?;
        let range = self.range.as_deref().map(Range::try_from).transpose()?;
        // The header row counts against the sheet's row limit
        let rows_limit = self.rows_limit.map(|limit| if self.header { limit + 1 } else { limit });
        Ok(Criteria {
            sheet_name_pattern,
            range,
            rows_limit,
            nulls: self.nulls.clone(),
            error_as_null: self.error_as_null,
            skip_empty_rows: self.skip_empty_rows,
            end_at_empty_row: self.end_at_empty_row,
        })
    }
}

/// Reads a table from a workbook on disk.
///
/// Failures are tagged with [`Stage::Read`] and prefixed with the file name.
pub fn read_table_from_path<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<Table, RustyDishError> {
    let path = path.as_ref();
    let name = path.to_string_lossy();
    UnifiedReader::open(path)
        .and_then(|reader| read_table(&name, reader, options))
        .with_prefix(&name)
        .in_stage(Stage::Read)
}

/// Reads a table from uploaded bytes; `name` is the uploaded file name and decides the format.
pub fn read_table_from_bytes(name: &str, bytes: Vec<u8>, options: &ReadOptions) -> Result<Table, RustyDishError> {
    read_table(name, UnifiedReader::from_bytes(bytes), options)
        .with_prefix(name)
        .in_stage(Stage::Read)
}

/// Reads the first `rows` data rows of an upload, for picking the grouping and ranking columns.
pub fn preview_table(name: &str, bytes: Vec<u8>, options: &ReadOptions, rows: usize) -> Result<Table, RustyDishError> {
    read_table_from_bytes(name, bytes, &options.preview(rows))
}

fn read_table(name: &str, reader: UnifiedReader, options: &ReadOptions) -> Result<Table, RustyDishError> {
    let criteria = options.criteria()?;
    let mut spreadsheet = open_spreadsheet(name, reader)?;
    let shared_strings = spreadsheet.load_shared_strings()?;
    let sheet = spreadsheet.read_sheet(&criteria)?.ok_or_else(|| {
        SpreadsheetError::SheetNotFoundError(spreadsheet.name(), options.sheet.clone().unwrap_or_else(|| "*".to_owned()))
    })?;
    let table = sheet.to_table(&shared_strings, options.header, &criteria.nulls)?;
    debug!(
        file = name,
        sheet = %sheet.name,
        rows = table.len(),
        columns = table.columns().len(),
        "read table"
    );
    Ok(table)
}
