use crate::error::RustyDishError;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::range::Range;
use crate::spreadsheet::SpreadsheetError;
use crate::table::unique_headers;
use crate::table::Table;
use crate::table::Value;
use std::collections::HashSet;

/// Cells collected from one worksheet, with the bounds of the data actually seen.
pub(crate) struct Sheet {
    /// Sheet name
    pub(crate) name: String,
    /// Non-empty cells in row-major order
    pub(crate) cells: Vec<Cell>,
    /// Expected data range (user-specified)
    pub(super) range: Range,
    /// Row limit for data extraction
    pub(super) limit: Option<usize>,
    /// Whether to skip empty rows
    pub(super) skip_empty_rows: bool,
    /// Actual data range (determined from cell data)
    pub(crate) row_lower_bound: Option<usize>,
    pub(crate) row_upper_bound: Option<usize>,
    pub(crate) col_lower_bound: Option<usize>,
    pub(crate) col_upper_bound: Option<usize>,
}

impl Sheet {
    pub(super) fn new(name: &str, range: Option<Range>, limit: Option<usize>, skip_empty_rows: bool) -> Self {
        Self {
            name: name.to_owned(),
            cells: Vec::new(),
            range: range.unwrap_or_default(),
            limit,
            skip_empty_rows,
            row_lower_bound: None,
            row_upper_bound: None,
            col_lower_bound: None,
            col_upper_bound: None,
        }
    }

    pub(super) fn before_row_lower_bound(&self, row: usize) -> bool {
        self.range.row_lower_bound
            .map(|row_lower_bound| row < row_lower_bound)
            .unwrap_or(false)
    }

    /// Checks if a row is after the upper bound of the specified range or exceeds the row limit.
    pub(super) fn after_row_upper_bound(&self, row: usize) -> bool {
        let is_out_of_bound = self.range.row_upper_bound
            .map(|row_upper_bound| row_upper_bound < row)
            .unwrap_or(false);
        let is_more_than_limit = self.first_row().zip(self.limit)
            .map(|(first_row, limit)| first_row + limit <= row)
            .unwrap_or(false);
        is_out_of_bound || is_more_than_limit
    }

    pub(super) fn before_col_lower_bound(&self, col: usize) -> bool {
        self.range.col_lower_bound
            .map(|col_lower_bound| col < col_lower_bound)
            .unwrap_or(false)
    }

    pub(super) fn after_col_upper_bound(&self, col: usize) -> bool {
        self.range.col_upper_bound
            .map(|col_upper_bound| col_upper_bound < col)
            .unwrap_or(false)
    }

    /// Checks if a cell at (row, col) is within the specified range and limits.
    pub(super) fn contains(&self, row: usize, col: usize) -> bool {
        !self.before_row_lower_bound(row)
            && !self.after_row_upper_bound(row)
            && !self.before_col_lower_bound(col)
            && !self.after_col_upper_bound(col)
    }

    /// Adds a cell to the sheet, updating the data bounds.
    pub(super) fn push(&mut self, cell: Cell) {
        self.update_bound(cell.row, cell.col);
        self.cells.push(cell);
    }

    fn update_bound(&mut self, row: usize, col: usize) {
        if self.row_lower_bound.is_none() { // First cell
            self.row_lower_bound = Some(row);
        }
        if self.col_lower_bound.map(|col_lower_bound| col < col_lower_bound).unwrap_or(true) {
            self.col_lower_bound = Some(col);
        }
        if self.col_upper_bound.map(|col_upper_bound| col_upper_bound < col).unwrap_or(true) {
            self.col_upper_bound = Some(col);
        }
        self.row_upper_bound = Some(row);
    }

    /// Returns true if at least one empty row separates `row` from the cells read so far
    /// (or from the start of the range when nothing has been read yet).
    pub(super) fn follows_empty_row(&self, row: usize) -> bool {
        match self.row_upper_bound {
            Some(last_row) => last_row + 1 < row,
            None => self.range.row_lower_bound
                .filter(|_| !self.skip_empty_rows)
                .map(|first_row| first_row < row)
                .unwrap_or(false),
        }
    }

    /// First sheet row of the table: the range start, or the first row with data
    /// when no start is given or empty rows are skipped.
    fn first_row(&self) -> Option<usize> {
        self.range.row_lower_bound
            .filter(|_| !self.skip_empty_rows)
            .or(self.row_lower_bound)
    }

    /// Lays the collected cells out as a table.
    ///
    /// With `header`, the first row supplies the column names; otherwise columns are
    /// named `column1`, `column2`, …. Text values listed in `nulls` become empty.
    pub(crate) fn to_table(&self, shared_strings: &[String], header: bool, nulls: &HashSet<String>) -> Result<Table, RustyDishError> {
        let bounds = self.first_row()
            .zip(self.row_upper_bound)
            .zip(self.range.col_lower_bound.or(self.col_lower_bound).zip(self.range.col_upper_bound.or(self.col_upper_bound)));
        let ((row_lower, row_upper), (col_lower, col_upper)) = match bounds {
            Some(bounds) => bounds,
            None if header => Err(SpreadsheetError::MissingHeaderRowError(self.name.to_owned()))?,
            None => return Ok(Table::default()),
        };

        let width = col_upper - col_lower + 1;
        let mut grid = vec![vec![Value::Empty; width]; row_upper - row_lower + 1];
        for cell in &self.cells {
            let value = match cell.to_value(shared_strings)? {
                Value::Text(text) if nulls.contains(&text) => Value::Empty,
                value => value,
            };
            grid[cell.row - row_lower][cell.col - col_lower] = value;
        }
        if self.skip_empty_rows {
            grid.retain(|row| !row.iter().all(Value::is_empty));
        }

        let mut rows = grid.into_iter();
        let columns = if header {
            let names = rows
                .next()
                .ok_or_else(|| SpreadsheetError::MissingHeaderRowError(self.name.to_owned()))?
                .iter()
                .map(|value| value.as_text().trim().to_owned())
                .collect();
            unique_headers(names)
        } else {
            (1..=width).map(|index| format!("column{index}")).collect()
        };
        Ok(Table::from_rows(columns, rows)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::CellType;

    fn push(sheet: &mut Sheet, row: usize, col: usize, value: &str) {
        sheet.push(Cell {
            row,
            col,
            kind: CellType::InlineString,
            value: value.to_owned(),
        });
    }

    fn nulls() -> HashSet<String> {
        HashSet::from(["".to_owned(), "-".to_owned()])
    }

    #[test]
    fn sheet_initial() {
        let sheet = Sheet::new("", None, None, false);

        assert!(sheet.cells.is_empty());
        assert_eq!(sheet.row_lower_bound, None);
        assert_eq!(sheet.row_upper_bound, None);
        assert_eq!(sheet.col_lower_bound, None);
        assert_eq!(sheet.col_upper_bound, None);
    }

    #[test]
    fn sheet_update() {
        let mut sheet = Sheet::new("", None, None, false);
        push(&mut sheet, 1, 1, "a");
        push(&mut sheet, 1, 3, "b");
        push(&mut sheet, 3, 1, "c");
        push(&mut sheet, 3, 3, "d");

        assert_eq!(sheet.cells.len(), 4);
        assert_eq!(sheet.row_lower_bound, Some(1));
        assert_eq!(sheet.row_upper_bound, Some(3));
        assert_eq!(sheet.col_lower_bound, Some(1));
        assert_eq!(sheet.col_upper_bound, Some(3));
    }

    #[test]
    fn sheet_limit() {
        let mut sheet = Sheet::new("", None, Some(2), false);
        push(&mut sheet, 4, 0, "header");
        assert!(sheet.contains(5, 0));
        assert!(!sheet.contains(6, 0));
    }

    #[test]
    fn sheet_empty_row_gap() {
        let mut sheet = Sheet::new("", Range::try_from("A2:C9").ok(), None, false);
        assert!(!sheet.follows_empty_row(1));
        assert!(sheet.follows_empty_row(2));
        push(&mut sheet, 1, 0, "a");
        assert!(!sheet.follows_empty_row(2));
        assert!(sheet.follows_empty_row(3));
    }

    #[test]
    fn table_with_header() {
        let mut sheet = Sheet::new("Sheet1", None, None, false);
        push(&mut sheet, 1, 1, "flavor");
        push(&mut sheet, 1, 2, "dish");
        push(&mut sheet, 2, 1, "奶茶");
        push(&mut sheet, 2, 2, "-");
        push(&mut sheet, 4, 2, "Brown Sugar Latte");

        let table = sheet.to_table(&[], true, &nulls()).unwrap();
        assert_eq!(table.columns(), &["flavor".to_owned(), "dish".to_owned()]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[0], vec![Value::from("奶茶"), Value::Empty]);
        assert_eq!(table.rows()[1], vec![Value::Empty, Value::Empty]);
        assert_eq!(table.rows()[2], vec![Value::Empty, Value::from("Brown Sugar Latte")]);
    }

    #[test]
    fn table_skip_empty_rows_without_header() {
        let mut sheet = Sheet::new("Sheet1", None, None, true);
        push(&mut sheet, 0, 0, "a");
        push(&mut sheet, 2, 1, "b");

        let table = sheet.to_table(&[], false, &nulls()).unwrap();
        assert_eq!(table.columns(), &["column1".to_owned(), "column2".to_owned()]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn table_with_range_columns() {
        let range = Range::try_from("A:C").unwrap();
        let mut sheet = Sheet::new("Sheet1", Some(range), None, false);
        push(&mut sheet, 0, 1, "dish");

        let table = sheet.to_table(&[], true, &nulls()).unwrap();
        assert_eq!(table.columns(), &["Unnamed: 0".to_owned(), "dish".to_owned(), "Unnamed: 2".to_owned()]);
        assert!(table.is_empty());
    }

    #[test]
    fn empty_sheet() {
        let sheet = Sheet::new("Sheet1", None, None, false);
        assert!(sheet.to_table(&[], true, &nulls()).is_err());
        assert_eq!(sheet.to_table(&[], false, &nulls()).unwrap().columns().len(), 0);
    }
}
