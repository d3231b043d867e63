//! # One invocation, end to end
//!
//! Read → truncate → extract, each stage tagging its failures with [`Stage`].
//! The footer scan sees every column of the sheet; the column selection of the
//! request applies to the cleaned table.
//! Exporting is left to the caller through [`Outcome::export`] so the presentation
//! layer can show the result before a download is requested.

use crate::error::ResultStage;
use crate::error::RustyDishError;
use crate::error::Stage;
use crate::export::export_workbook;
use crate::export::ExportOptions;
use crate::extract::extract_top;
use crate::extract::ExtractRequest;
use crate::extract::Extraction;
use crate::footer::truncate;
use crate::footer::FooterConfig;
use crate::footer::FooterReport;
use crate::spreadsheet::read_table_from_bytes;
use crate::spreadsheet::read_table_from_path;
use crate::spreadsheet::ReadOptions;
use crate::summary::CountSummary;
use crate::summary::SummaryOrder;
use crate::table::Table;
use std::path::Path;
use tracing::info;

/// Everything one invocation needs besides the input itself.
#[derive(Clone, Debug, PartialEq)]
pub struct Job {
    pub read: ReadOptions,
    pub footer: FooterConfig,
    pub request: ExtractRequest,
    pub summary_order: SummaryOrder,
}

impl Job {
    /// A job with default read, footer and summary settings.
    pub fn new(request: ExtractRequest) -> Self {
        Job {
            read: ReadOptions::default(),
            footer: FooterConfig::default(),
            request,
            summary_order: SummaryOrder::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
    /// Where the footer was found and how many rows went with it
    pub footer: FooterReport,
    /// Rows left after truncation
    pub cleaned_rows: usize,
    pub extraction: Extraction,
    pub summary: CountSummary,
}

impl Outcome {
    /// True when no row matched any keyword. Not an error: the result and summary are empty.
    pub fn is_empty(&self) -> bool {
        self.extraction.is_empty()
    }

    /// Renders the result workbook.
    pub fn export(&self, options: &ExportOptions) -> Result<Vec<u8>, RustyDishError> {
        export_workbook(&self.extraction, &self.summary, options).in_stage(Stage::Export)
    }
}

/// Runs the job on a table the caller already holds.
pub fn run_table(table: Table, job: &Job) -> Result<Outcome, RustyDishError> {
    job.request.validate()?;
    let truncation = truncate(table, &job.footer);
    let footer = truncation.report();
    let cleaned_rows = truncation.table.len();
    let table = job.request.project(truncation.table).in_stage(Stage::Extract)?;
    let extraction = extract_top(&table, &job.request).in_stage(Stage::Extract)?;
    let summary = CountSummary::from_extraction(&extraction, job.summary_order);
    info!(
        cleaned_rows,
        result_rows = extraction.len(),
        keywords = summary.len(),
        "Top dishes extracted"
    );
    Ok(Outcome {
        footer,
        cleaned_rows,
        extraction,
        summary,
    })
}

/// Runs the job on a workbook on disk. Request errors are reported before the file is opened.
pub fn run_path<P: AsRef<Path>>(path: P, job: &Job) -> Result<Outcome, RustyDishError> {
    job.request.validate()?;
    let table = read_table_from_path(path, &job.read)?;
    run_table(table, job)
}

/// Runs the job on uploaded bytes; `name` is the uploaded file name.
pub fn run_bytes(name: &str, bytes: Vec<u8>, job: &Job) -> Result<Outcome, RustyDishError> {
    job.request.validate()?;
    let table = read_table_from_bytes(name, bytes, &job.read)?;
    run_table(table, job)
}
