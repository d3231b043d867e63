use crate::spreadsheet::range::Range;
use glob::Pattern;
use std::collections::HashSet;

/// Criteria for selecting data from a spreadsheet, resolved from [`crate::ReadOptions`].
#[derive(Clone, Debug)]
pub(crate) struct Criteria {
    /// Sheet name pattern; the first matching sheet is read. `None` reads the first sheet.
    pub(crate) sheet_name_pattern: Option<Pattern>,

    /// Data range within the sheet.
    pub(crate) range: Option<Range>,

    /// Maximum number of sheet rows to read, counted from the first row with data.
    pub(crate) rows_limit: Option<usize>,

    /// Text values read as empty cells.
    pub(crate) nulls: HashSet<String>,

    /// Read error cells as empty cells instead of their error text.
    pub(crate) error_as_null: bool,

    /// Skip rows where all columns are empty.
    pub(crate) skip_empty_rows: bool,

    /// Stop reading at the first completely empty row.
    pub(crate) end_at_empty_row: bool,
}

impl Criteria {
    /// Returns true if no pattern is set or the sheet name matches it.
    pub(crate) fn accept(&self, sheet_name: &str) -> bool {
        self.sheet_name_pattern
            .as_ref()
            .map(|pattern| pattern.matches(sheet_name))
            .unwrap_or(true)
    }
}

impl Default for Criteria {
    fn default() -> Self {
        Criteria {
            sheet_name_pattern: None,
            range: None,
            rows_limit: None,
            nulls: HashSet::from([String::new()]),
            error_as_null: false,
            skip_empty_rows: false,
            end_at_empty_row: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_sheet_names() {
        let criteria = Criteria::default();
        assert!(criteria.accept("Sheet1"));

        let criteria = Criteria {
            sheet_name_pattern: Some(Pattern::new("Q[1-4]*").unwrap()),
            ..Criteria::default()
        };
        assert!(criteria.accept("Q3 dishes"));
        assert!(!criteria.accept("Summary"));
    }
}
