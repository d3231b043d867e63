//! # Rusty Dish
//!
//! Picks the best-ranked dishes per keyword out of spreadsheet dish reports.
//!
//! A report is an Excel (`.xlsx`, `.xlsm`, `.xlam`, legacy `.xls`) or OpenDocument (`.ods`)
//! workbook whose first sheet lists one dish per row, grouped by a keyword column and scored
//! by a numeric index column. Exported reports usually end with summary or filter description
//! rows; those are cut off before any ranking happens.
//!
//! ## Features
//!
//! - **Footer truncation**: Drop everything from the first row where any cell carries a
//!   footer keyword (`Total`, `合计`, `应用的筛选器`, ...)
//! - **Top-N per keyword**: Keep at most N rows per requested keyword, best score first,
//!   ties kept in source order, with a 1-based rank column
//! - **Count summary**: Number of rows each keyword contributed
//! - **Workbook export**: Result and summary sheets in a single `.xlsx`
//! - **Error taxonomy**: Every failure is a [`RustyDishError`] classified by [`ErrorKind`]
//!   and tagged with the [`Stage`] it came from
//!
//! ## Example
//!
//! ```no_run
//! use rusty_dish::{run_path, ExportOptions, ExtractRequest, Job};
//!
//! # fn main() -> Result<(), rusty_dish::RustyDishError> {
//! let request = ExtractRequest::from_text("keyword", "index", "奶茶\n咖啡", 3);
//! let outcome = run_path("report.xlsx", &Job::new(request))?;
//! for (keyword, count) in outcome.summary.entries() {
//!     println!("{keyword}: {count}");
//! }
//! let workbook = outcome.export(&ExportOptions::default())?;
//! std::fs::write("top_dishes.xlsx", workbook)?;
//! # Ok(())
//! # }
//! ```

mod error;
mod helpers;

pub mod config;
pub mod export;
pub mod extract;
pub mod footer;
pub mod pipeline;
pub mod spreadsheet;
pub mod summary;
pub mod table;

pub use crate::config::Settings;
pub use crate::error::ErrorKind;
pub use crate::error::RustyDishError;
pub use crate::error::Stage;
pub use crate::export::export_workbook;
pub use crate::export::export_workbook_to_path;
pub use crate::export::ExportOptions;
pub use crate::export::Locale;
pub use crate::extract::extract_top;
pub use crate::extract::ExtractRequest;
pub use crate::extract::Extraction;
pub use crate::extract::RequestError;
pub use crate::extract::RANK_COLUMN;
pub use crate::footer::truncate;
pub use crate::footer::FooterConfig;
pub use crate::footer::FooterReport;
pub use crate::footer::MatchMode;
pub use crate::footer::Truncation;
pub use crate::pipeline::run_bytes;
pub use crate::pipeline::run_path;
pub use crate::pipeline::run_table;
pub use crate::pipeline::Job;
pub use crate::pipeline::Outcome;
pub use crate::spreadsheet::preview_table;
pub use crate::spreadsheet::read_table_from_bytes;
pub use crate::spreadsheet::read_table_from_path;
pub use crate::spreadsheet::ReadOptions;
pub use crate::summary::CountSummary;
pub use crate::summary::SummaryOrder;
pub use crate::table::Table;
pub use crate::table::Value;
