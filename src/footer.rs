//! # Footer truncation
//!
//! Spreadsheet exports often end with summary rows ("Total", "合计", "应用的筛选器: …")
//! that are not data. [`find_footer`] scans a table from the top and reports the first
//! row in which any cell contains one of the configured footer keywords; [`truncate`]
//! keeps only the rows above it.
//!
//! Matching is a case-insensitive substring test on each cell's string form, so a data
//! row whose dish name happens to contain a keyword ("Totally Tofu") cuts the table
//! too. [`MatchMode::Equals`] trades that for missing footers that carry extra text.

use crate::table::Table;
use std::fmt::Display;
use std::fmt::Formatter;
use tracing::info;

/// Footer keywords used when none are configured.
pub const DEFAULT_FOOTER_KEYWORDS: [&str; 5] = ["Total", "应用的筛选器", "总计", "合计", "汇总"];

/// How a cell is compared with a footer keyword. Both ignore case.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// The cell contains the keyword
    #[default]
    Contains,
    /// The trimmed cell equals the keyword
    Equals,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FooterConfig {
    /// Keywords in priority order; blank entries are ignored.
    pub keywords: Vec<String>,
    pub mode: MatchMode,
}

impl Default for FooterConfig {
    fn default() -> Self {
        FooterConfig::new(DEFAULT_FOOTER_KEYWORDS)
    }
}

impl FooterConfig {
    pub fn new<S: Into<String>>(keywords: impl IntoIterator<Item = S>) -> Self {
        FooterConfig {
            keywords: keywords.into_iter().map(Into::into).collect(),
            mode: MatchMode::default(),
        }
    }

    pub fn with_mode(self, mode: MatchMode) -> Self {
        FooterConfig { mode, ..self }
    }

    /// Non-blank keywords paired with their lowercase form, in order.
    fn matchers(&self) -> Vec<(&str, String)> {
        self.keywords
            .iter()
            .map(|keyword| keyword.trim())
            .filter(|keyword| !keyword.is_empty())
            .map(|keyword| (keyword, keyword.to_lowercase()))
            .collect()
    }
}

/// The first footer row found by a scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FooterCut {
    /// Index of the footer row; rows `0..row` are kept.
    pub row: usize,
    /// The keyword that matched
    pub keyword: String,
}

/// A table with its footer rows removed.
#[derive(Clone, Debug, PartialEq)]
pub struct Truncation {
    pub table: Table,
    pub cut: Option<FooterCut>,
    /// Number of rows dropped, footer row included
    pub removed: usize,
}

impl Truncation {
    /// The cut and removed row count without the table.
    pub fn report(&self) -> FooterReport {
        FooterReport {
            cut: self.cut.clone(),
            removed: self.removed,
        }
    }
}

impl Display for Truncation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.report(), f)
    }
}

/// What a truncation did, for showing to the user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FooterReport {
    pub cut: Option<FooterCut>,
    /// Number of rows dropped, footer row included
    pub removed: usize,
}

impl Display for FooterReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cut {
            Some(cut) => write!(
                f,
                "Footer keyword '{}' found in row {}, removed {} row(s)",
                cut.keyword, cut.row, self.removed
            ),
            None => write!(f, "No footer row found, table kept unchanged"),
        }
    }
}

/// Returns the first row containing a footer keyword.
///
/// For each row the keywords are tried in order, so when a row holds several of them
/// the earliest configured keyword is reported.
pub fn find_footer(table: &Table, config: &FooterConfig) -> Option<FooterCut> {
    let matchers = config.matchers();
    if matchers.is_empty() {
        return None;
    }
    for (index, row) in table.rows().iter().enumerate() {
        let cells = row
            .iter()
            .map(|value| value.as_text().trim().to_lowercase())
            .collect::<Vec<_>>();
        let matched = matchers.iter().find(|(_, lowercase)| {
            cells.iter().any(|cell| match config.mode {
                MatchMode::Contains => cell.contains(lowercase.as_str()),
                MatchMode::Equals => cell == lowercase,
            })
        });
        if let Some((keyword, _)) = matched {
            return Some(FooterCut {
                row: index,
                keyword: (*keyword).to_owned(),
            });
        }
    }
    None
}

/// Drops the first footer row and everything below it.
pub fn truncate(mut table: Table, config: &FooterConfig) -> Truncation {
    let cut = find_footer(&table, config);
    let removed = cut.as_ref().map(|cut| table.len() - cut.row).unwrap_or(0);
    if let Some(cut) = &cut {
        table.truncate(cut.row);
    }
    let truncation = Truncation { table, cut, removed };
    match &truncation.cut {
        Some(cut) => info!(
            row = cut.row,
            keyword = %cut.keyword,
            removed = truncation.removed,
            kept = truncation.table.len(),
            "Footer row found, table truncated"
        ),
        None => info!(rows = truncation.table.len(), "No footer row found"),
    }
    truncation
}
