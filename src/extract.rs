//! # Top-N per keyword
//!
//! Keeps the rows whose grouping value is one of the requested keywords, ranks
//! them per keyword by descending score and returns the best `limit` rows of each
//! keyword, ranked in [`RANK_COLUMN`].
//!
//! Rows are ordered by one composite key: keyword ascending, score descending with
//! missing scores last, then source row index. The key is total, so the ranking
//! does not depend on the sort being stable.

use crate::error::RustyDishError;
use crate::table::Table;
use crate::table::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

/// Name of the rank column appended to the extraction result.
pub const RANK_COLUMN: &str = "rank_by_keyword";

/// Inconsistent extraction parameters, reported before any row is touched.
#[derive(Error, Debug, PartialEq)]
pub enum RequestError {
    #[error("Grouping column and ranking column must differ, both are '{0}'")]
    SameColumn(String),

    #[error("Limit must be at least 1")]
    NonPositiveLimit,

    #[error("No keyword given")]
    NoKeywords,

    #[error("Column '{0}' not found in table")]
    MissingColumn(String),

    #[error("Projected column '{0}' not found in table")]
    UnknownProjection(String),
}

/// Splits newline-separated keyword text into trimmed, non-blank, distinct keywords.
pub fn parse_keywords(text: &str) -> Vec<String> {
    normalize_keywords(text.lines())
}

fn normalize_keywords<S: AsRef<str>>(keywords: impl IntoIterator<Item = S>) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .into_iter()
        .filter_map(|keyword| {
            let keyword = keyword.as_ref().trim();
            (!keyword.is_empty() && seen.insert(keyword.to_owned())).then(|| keyword.to_owned())
        })
        .collect()
}

/// Which rows to keep and how to rank them.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractRequest {
    /// Column whose value is matched against the keywords
    pub group_column: String,
    /// Column holding the score; higher ranks first
    pub rank_column: String,
    /// Trimmed, non-blank, distinct keywords
    pub keywords: Vec<String>,
    /// Rows kept per keyword
    pub limit: usize,
    /// Extra columns kept by [`ExtractRequest::project`], after the grouping and ranking columns
    pub columns: Option<Vec<String>>,
}

impl ExtractRequest {
    pub fn new<S: AsRef<str>>(
        group_column: &str,
        rank_column: &str,
        keywords: impl IntoIterator<Item = S>,
        limit: usize,
    ) -> Self {
        ExtractRequest {
            group_column: group_column.to_owned(),
            rank_column: rank_column.to_owned(),
            keywords: normalize_keywords(keywords),
            limit,
            columns: None,
        }
    }

    /// Builds a request from newline-separated keyword text.
    pub fn from_text(group_column: &str, rank_column: &str, keywords: &str, limit: usize) -> Self {
        ExtractRequest::new(group_column, rank_column, parse_keywords(keywords), limit)
    }

    /// Keeps only the grouping column, the ranking column and `columns` when projecting.
    pub fn select<S: Into<String>>(self, columns: impl IntoIterator<Item = S>) -> Self {
        ExtractRequest {
            columns: Some(columns.into_iter().map(Into::into).collect()),
            ..self
        }
    }

    /// Checks the parameters against each other, without looking at any table.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.group_column == self.rank_column {
            Err(RequestError::SameColumn(self.group_column.to_owned()))
        } else if self.limit == 0 {
            Err(RequestError::NonPositiveLimit)
        } else if self.keywords.is_empty() {
            Err(RequestError::NoKeywords)
        } else {
            Ok(())
        }
    }

    /// Checks the parameters and that the table has both columns.
    pub fn validate_for(&self, table: &Table) -> Result<(), RequestError> {
        self.validate()?;
        for column in [&self.group_column, &self.rank_column] {
            if !table.contains_column(column) {
                Err(RequestError::MissingColumn(column.to_owned()))?;
            }
        }
        Ok(())
    }

    /// Projects the table onto the grouping column, the ranking column and the selected
    /// columns. Without a selection the table is returned as is.
    pub fn project(&self, table: Table) -> Result<Table, RustyDishError> {
        let Some(extra) = &self.columns else {
            return Ok(table);
        };
        self.validate_for(&table)?;
        let mut columns = vec![self.group_column.as_str(), self.rank_column.as_str()];
        for column in extra {
            if !table.contains_column(column) {
                Err(RequestError::UnknownProjection(column.to_owned()))?;
            }
            if !columns.contains(&column.as_str()) {
                columns.push(column);
            }
        }
        Ok(table.select(&columns)?)
    }
}

/// Rows kept by [`extract_top`], ordered by (keyword, rank).
#[derive(Clone, Debug, PartialEq)]
pub struct Extraction {
    /// Source columns followed by [`RANK_COLUMN`]
    pub table: Table,
    pub group_column: String,
    /// Matched keywords in order of first appearance in the source table
    pub first_seen: Vec<String>,
    pub limit: usize,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Keyword of each result row, in row order.
    pub fn groups(&self) -> impl Iterator<Item = String> + '_ {
        let index = self.table.column_index(&self.group_column);
        self.table.rows().iter().map(move |row| {
            index
                .map(|index| row[index].as_text().trim().to_owned())
                .unwrap_or_default()
        })
    }
}

/// One filtered row with its sort key.
struct Candidate {
    group: String,
    score: Option<f64>,
    index: usize,
}

impl Candidate {
    fn compare(&self, other: &Candidate) -> Ordering {
        self.group
            .cmp(&other.group)
            .then_with(|| match (self.score, other.score) {
                (Some(left), Some(right)) => right.total_cmp(&left),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| self.index.cmp(&other.index))
    }
}

/// Returns the top `limit` rows per keyword by descending score.
///
/// Scores are numeric cells or text that parses as a finite number; anything else
/// ranks after every scored row of its keyword. Keywords without matching rows are
/// absent from the result, and no matching row at all yields an empty result.
pub fn extract_top(table: &Table, request: &ExtractRequest) -> Result<Extraction, RustyDishError> {
    request.validate_for(table)?;
    let group_index = table.column_index(&request.group_column)
        .ok_or_else(|| RequestError::MissingColumn(request.group_column.to_owned()))?;
    let rank_index = table.column_index(&request.rank_column)
        .ok_or_else(|| RequestError::MissingColumn(request.rank_column.to_owned()))?;
    let keywords = request.keywords.iter().map(String::as_str).collect::<HashSet<_>>();

    let mut first_seen = Vec::<String>::new();
    let mut candidates = Vec::<Candidate>::new();
    for (index, row) in table.rows().iter().enumerate() {
        let group = row[group_index].as_text();
        let group = group.trim();
        if !keywords.contains(group) {
            continue;
        }
        if !first_seen.iter().any(|seen| seen == group) {
            first_seen.push(group.to_owned());
        }
        candidates.push(Candidate {
            group: group.to_owned(),
            score: row[rank_index].as_number(),
            index,
        });
    }
    candidates.sort_unstable_by(Candidate::compare);

    let mut ranks = HashMap::<&str, usize>::new();
    let mut rows = Vec::new();
    let mut rank_values = Vec::new();
    for candidate in &candidates {
        let rank = ranks.entry(candidate.group.as_str()).or_insert(0);
        *rank += 1;
        if *rank <= request.limit {
            rows.push(table.rows()[candidate.index].clone());
            rank_values.push(Value::from(*rank as i64));
        }
    }

    let mut result = table.with_rows(rows);
    result.set_column(RANK_COLUMN, rank_values)?;
    debug!(
        matched = candidates.len(),
        kept = result.len(),
        groups = first_seen.len(),
        limit = request.limit,
        "Top rows extracted"
    );
    Ok(Extraction {
        table: result,
        group_column: request.group_column.to_owned(),
        first_seen,
        limit: request.limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn dishes() -> Table {
        Table::from_rows(
            ["flavor", "dish", "score"],
            [
                vec![Value::from("奶茶"), "Brown Sugar".into(), 9.0.into()],
                vec![Value::from("咖啡"), "Latte".into(), 7.0.into()],
                vec![Value::from(" 奶茶 "), "Taro".into(), "12".into()],
                vec![Value::from("奶茶"), "Jasmine".into(), Value::Empty],
                vec![Value::from("咖啡"), "Mocha".into(), 7.0.into()],
                vec![Value::from("果汁"), "Orange".into(), 3.0.into()],
                vec![Value::from("奶茶"), "Oolong".into(), "n/a".into()],
                vec![Value::from("奶茶"), "Matcha".into(), 9.0.into()],
            ],
        )
        .unwrap()
    }

    fn column(extraction: &Extraction, name: &str) -> Vec<String> {
        extraction.table.column(name).unwrap().iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn keyword_text() {
        assert_eq!(parse_keywords(" 奶茶\r\n\n咖啡 \n奶茶\n  \n"), vec!["奶茶", "咖啡"]);
        assert!(parse_keywords("").is_empty());
    }

    #[test]
    fn top_two_per_keyword() {
        let request = ExtractRequest::new("flavor", "score", ["奶茶", "咖啡", "汉堡"], 2);
        let extraction = extract_top(&dishes(), &request).unwrap();

        assert_eq!(extraction.table.columns(), &["flavor", "dish", "score", RANK_COLUMN].map(String::from));
        assert_eq!(column(&extraction, "dish"), vec!["Latte", "Mocha", "Taro", "Brown Sugar"]);
        assert_eq!(column(&extraction, RANK_COLUMN), vec!["1", "2", "1", "2"]);
        assert_eq!(extraction.groups().collect::<Vec<_>>(), vec!["咖啡", "咖啡", "奶茶", "奶茶"]);
        assert_eq!(extraction.first_seen, vec!["奶茶", "咖啡"]);
    }

    #[test]
    fn missing_scores_rank_last() {
        let request = ExtractRequest::new("flavor", "score", ["奶茶"], 10);
        let extraction = extract_top(&dishes(), &request).unwrap();
        assert_eq!(column(&extraction, "dish"), vec!["Taro", "Brown Sugar", "Matcha", "Jasmine", "Oolong"]);
        assert_eq!(column(&extraction, RANK_COLUMN), vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn no_match_is_empty_result() {
        let request = ExtractRequest::new("flavor", "score", ["汉堡"], 3);
        let extraction = extract_top(&dishes(), &request).unwrap();
        assert!(extraction.is_empty());
        assert_eq!(extraction.table.columns().last().map(String::as_str), Some(RANK_COLUMN));
    }

    #[test]
    fn existing_rank_column_is_overwritten() {
        let table = Table::from_rows(
            ["flavor", "score", RANK_COLUMN],
            [vec![Value::from("A"), 1.0.into(), "old".into()], vec![Value::from("A"), 2.0.into(), "old".into()]],
        )
        .unwrap();
        let extraction = extract_top(&table, &ExtractRequest::new("flavor", "score", ["A"], 5)).unwrap();
        assert_eq!(extraction.table.columns().len(), 3);
        assert_eq!(column(&extraction, RANK_COLUMN), vec!["1", "2"]);
        assert_eq!(column(&extraction, "score"), vec!["2", "1"]);
    }

    #[test]
    fn invalid_requests() {
        let table = dishes();
        let cases = [
            (ExtractRequest::new("flavor", "flavor", ["奶茶"], 1), RequestError::SameColumn("flavor".to_owned())),
            (ExtractRequest::new("flavor", "score", ["奶茶"], 0), RequestError::NonPositiveLimit),
            (ExtractRequest::from_text("flavor", "score", " \n ", 1), RequestError::NoKeywords),
            (ExtractRequest::new("brand", "score", ["奶茶"], 1), RequestError::MissingColumn("brand".to_owned())),
        ];
        for (request, expected) in cases {
            let error = extract_top(&table, &request).unwrap_err();
            assert_eq!(error.kind(), ErrorKind::InvalidRequest);
            match error {
                RustyDishError::RequestError(error) => assert_eq!(error, expected),
                error => panic!("unexpected error {error}"),
            }
        }
    }

    #[test]
    fn projection() {
        let request = ExtractRequest::new("flavor", "score", ["奶茶"], 1).select(["dish", "flavor"]);
        let projected = request.project(dishes()).unwrap();
        assert_eq!(projected.columns(), &["flavor", "score", "dish"].map(String::from));

        let request = ExtractRequest::new("flavor", "score", ["奶茶"], 1).select(["brand"]);
        let error = request.project(dishes()).unwrap_err();
        assert!(matches!(error, RustyDishError::RequestError(RequestError::UnknownProjection(_))));

        let request = ExtractRequest::new("flavor", "score", ["奶茶"], 1);
        assert_eq!(request.project(dishes()).unwrap(), dishes());
    }
}
