use crate::error::RustyDishError;
use crate::spreadsheet::reference::col_to_index;
use crate::spreadsheet::reference::row_to_index;
use regex::Regex;
use thiserror::Error;

/// Errors related to Excel-style range parsing.
#[derive(Error, Debug)]
pub enum RangeError {
    #[error("Invalid range format '{0}'")]
    FormatError(String),
}

/// Excel-style cell range with optional boundaries (0-based, inclusive).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Range {
    pub row_lower_bound: Option<usize>,
    pub row_upper_bound: Option<usize>,
    pub col_lower_bound: Option<usize>,
    pub col_upper_bound: Option<usize>,
}

impl TryFrom<&str> for Range {
    type Error = RustyDishError;

    /// Parses an Excel-style range string (e.g., "A1", "B2:C5", "A:D", "3:").
    /// Supports single cells, ranges, and partial ranges (columns or rows only).
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let pattern = Regex::new(r"^([A-Z]*)(\d*)(:([A-Z]*)(\d*))?$").expect("Hardcode regex pattern");
        let value = value.trim().to_ascii_uppercase();
        let captures = pattern
            .captures(value.as_str())
            .filter(|_| !value.is_empty())
            .ok_or(RangeError::FormatError(value.to_owned()))?;
        let range = Range {
            col_lower_bound: captures
                .get(1)
                .map(|matcher| matcher.as_str())
                .and_then(col_to_index),
            row_lower_bound: captures
                .get(2)
                .map(|matcher| matcher.as_str())
                .and_then(row_to_index),
            col_upper_bound: captures
                .get(4)
                .map(|matcher| matcher.as_str())
                .and_then(col_to_index),
            row_upper_bound: captures
                .get(5)
                .map(|matcher| matcher.as_str())
                .and_then(row_to_index),
        };
        let inverted_rows = range.row_lower_bound.zip(range.row_upper_bound).map(|(lower, upper)| lower > upper);
        let inverted_cols = range.col_lower_bound.zip(range.col_upper_bound).map(|(lower, upper)| lower > upper);
        if inverted_rows.unwrap_or(false) || inverted_cols.unwrap_or(false) {
            Err(RangeError::FormatError(value))?
        }
        Ok(range)
    }
}
