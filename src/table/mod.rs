//! # In-memory tables
//!
//! A [`Table`] is an ordered list of uniquely named columns and an ordered list
//! of rows of [`Value`]s, every row exactly as wide as the column list. Row order
//! is meaningful: the footer scan and the extractor's tie-break both rely on it.

mod value;

pub use value::Value;

use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum TableError {
    #[error("Row {row} has {found} values, expected {expected}")]
    RowWidthError { row: usize, expected: usize, found: usize },

    #[error("Duplicate column '{0}'")]
    DuplicateColumnError(String),

    #[error("Column '{0}' not found")]
    MissingColumnError(String),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// Borrowed view of one table row, addressable by column name.
#[derive(Copy, Clone, Debug)]
pub struct Row<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> Row<'a> {
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|name| name == column)
            .map(|index| &self.values[index])
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    /// (column name, value) pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }
}

impl Table {
    /// Creates a table with the given columns and no rows.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Result<Table, TableError> {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(TableError::DuplicateColumnError(column.to_owned()));
            }
        }
        Ok(Table { columns, rows: Vec::new() })
    }

    /// Creates a table from columns and rows, checking row widths.
    pub fn from_rows<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: impl IntoIterator<Item = Vec<Value>>,
    ) -> Result<Table, TableError> {
        let mut table = Table::new(columns)?;
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidthError {
                row: self.rows.len(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|values| Row {
            columns: &self.columns,
            values,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |values| Row {
            columns: &self.columns,
            values,
        })
    }

    /// Value at (row, column name)
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row).map(|values| &values[index])
    }

    /// All values of one column, in row order
    pub fn column(&self, column: &str) -> Result<Vec<&Value>, TableError> {
        let index = self
            .column_index(column)
            .ok_or_else(|| TableError::MissingColumnError(column.to_owned()))?;
        Ok(self.rows.iter().map(|values| &values[index]).collect())
    }

    /// Drops every row from `len` onwards.
    pub fn truncate(&mut self, len: usize) {
        self.rows.truncate(len);
    }

    /// Projects the table onto the given columns, in the given order.
    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> Result<Table, TableError> {
        let indexes = columns
            .iter()
            .map(|column| {
                self.column_index(column.as_ref())
                    .ok_or_else(|| TableError::MissingColumnError(column.as_ref().to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut table = Table::new(columns.iter().map(|column| column.as_ref().to_owned()))?;
        table.rows = self
            .rows
            .iter()
            .map(|values| indexes.iter().map(|index| values[*index].clone()).collect())
            .collect();
        Ok(table)
    }

    /// Sets `column` to the given values, appending the column when it does not exist yet.
    pub(crate) fn set_column(&mut self, column: &str, values: Vec<Value>) -> Result<(), TableError> {
        if values.len() != self.rows.len() {
            return Err(TableError::RowWidthError {
                row: self.rows.len(),
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        match self.column_index(column) {
            Some(index) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[index] = value;
                }
            }
            None => {
                self.columns.push(column.to_owned());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Removes a column if present.
    pub(crate) fn drop_column(&mut self, column: &str) {
        if let Some(index) = self.column_index(column) {
            self.columns.remove(index);
            for row in &mut self.rows {
                row.remove(index);
            }
        }
    }

    /// Builds a table from rows taken out of this table's column layout.
    pub(crate) fn with_rows(&self, rows: Vec<Vec<Value>>) -> Table {
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }
}

/// Turns raw header cells into unique column names.
///
/// Blank headers become `Unnamed: {position}`; repeated names get `.1`, `.2`, …
/// suffixes in order of appearance.
pub(crate) fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::<String>::new();
    let mut names = Vec::with_capacity(headers.len());
    for (position, header) in headers.into_iter().enumerate() {
        let base = if header.trim().is_empty() {
            format!("Unnamed: {position}")
        } else {
            header
        };
        let mut name = base.clone();
        let mut suffix = 0usize;
        while seen.contains(&name) {
            suffix += 1;
            name = format!("{base}.{suffix}");
        }
        seen.insert(name.clone());
        names.push(name);
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dishes() -> Table {
        Table::from_rows(
            ["dish", "brand", "score"],
            vec![
                vec![Value::from("Milk Tea"), "A".into(), 10.0.into()],
                vec![Value::from("Jasmine"), "B".into(), Value::Empty],
            ],
        )
        .unwrap()
    }

    #[test]
    fn rejects_ragged_rows() {
        let error = Table::from_rows(["a", "b"], vec![vec![Value::from(1.0)]]).unwrap_err();
        assert_eq!(error, TableError::RowWidthError { row: 0, expected: 2, found: 1 });
    }

    #[test]
    fn rejects_duplicate_columns() {
        let error = Table::new(["a", "a"]).unwrap_err();
        assert_eq!(error, TableError::DuplicateColumnError("a".to_owned()));
    }

    #[test]
    fn access_by_name() {
        let table = dishes();
        assert_eq!(table.value(0, "score"), Some(&Value::Number(10.0)));
        assert_eq!(table.row(1).unwrap().get("brand"), Some(&Value::from("B")));
        assert_eq!(table.row(1).unwrap().get("missing"), None);
        assert_eq!(table.column("dish").unwrap().len(), 2);
        assert!(table.column("missing").is_err());
    }

    #[test]
    fn select_reorders_columns() {
        let table = dishes().select(&["score", "dish"]).unwrap();
        assert_eq!(table.columns(), &["score".to_owned(), "dish".to_owned()]);
        assert_eq!(table.rows()[0], vec![Value::Number(10.0), Value::from("Milk Tea")]);
        assert_eq!(
            dishes().select(&["flavor"]).unwrap_err(),
            TableError::MissingColumnError("flavor".to_owned())
        );
    }

    #[test]
    fn set_and_drop_column() {
        let mut table = dishes();
        table.set_column("rank", vec![1i64.into(), 2i64.into()]).unwrap();
        assert_eq!(table.columns().len(), 4);
        table.set_column("rank", vec![3i64.into(), 4i64.into()]).unwrap();
        assert_eq!(table.value(1, "rank"), Some(&Value::Number(4.0)));
        table.drop_column("rank");
        assert_eq!(table, dishes());
    }

    #[test]
    fn headers_are_made_unique() {
        let headers = vec!["dish".to_owned(), "".to_owned(), "dish".to_owned(), "dish".to_owned()];
        assert_eq!(unique_headers(headers), vec!["dish", "Unnamed: 1", "dish.1", "dish.2"]);
    }
}
