use std::fmt::Display;
use std::fmt::Formatter;
use thiserror::Error;

/// Processing stage of one invocation, used to tag failures at stage boundaries.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Decoding the uploaded spreadsheet into a table
    Read,
    /// Footer detection and truncation
    Truncate,
    /// Top-N-per-group extraction
    Extract,
    /// Rendering the export workbook
    Export,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Read => "read",
            Stage::Truncate => "truncate",
            Stage::Extract => "extract",
            Stage::Export => "export",
        };
        write!(f, "{name}")
    }
}

/// Coarse classification of a failure for the presentation layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input file cannot be decoded as a table
    MalformedInput,
    /// Parameters are inconsistent with each other or with the table
    InvalidRequest,
    /// Anything else raised while a stage was running
    Unexpected,
}

/// Main error type for the crate.
/// Aggregates errors from the standard library, dependencies, and internal modules.
#[derive(Error, Debug)]
pub enum RustyDishError {
    #[error("{0}")]
    WithContextError(String),

    #[error("{stage} stage failed: {source}")]
    StageError {
        stage: Stage,
        #[source]
        source: Box<RustyDishError>,
    },

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    #[error("{0}")]
    CfbError(#[from] crate::helpers::cfb::CfbError),

    #[error("{0}")]
    Biff8Error(#[from] crate::helpers::biff8::Biff8Error),

    // Spreadsheet module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    OdsError(#[from] crate::spreadsheet::ods::OdsError),

    #[error("{0}")]
    XlsError(#[from] crate::spreadsheet::xls::XlsError),

    #[error("{0}")]
    RangeError(#[from] crate::spreadsheet::range::RangeError),

    // Core module errors
    #[error("{0}")]
    TableError(#[from] crate::table::TableError),

    #[error("{0}")]
    RequestError(#[from] crate::extract::RequestError),

    #[error("{0}")]
    ConfigError(#[from] crate::config::ConfigError),
}

impl RustyDishError {
    /// Classifies the error. Failures raised while reading the input are
    /// malformed input; request errors stay invalid requests wherever they surface.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RustyDishError::RequestError(_) => ErrorKind::InvalidRequest,
            RustyDishError::StageError { stage, source } => match source.kind() {
                ErrorKind::InvalidRequest => ErrorKind::InvalidRequest,
                _ if *stage == Stage::Read => ErrorKind::MalformedInput,
                kind => kind,
            },
            RustyDishError::IoError(_)
            | RustyDishError::StringEncodingError(_)
            | RustyDishError::ZipError(_)
            | RustyDishError::XmlError(_)
            | RustyDishError::XmlEncodingError(_)
            | RustyDishError::XmlAttributeError(_)
            | RustyDishError::XmlHelperError(_)
            | RustyDishError::CfbError(_)
            | RustyDishError::Biff8Error(_)
            | RustyDishError::SpreadsheetError(_)
            | RustyDishError::OdsError(_)
            | RustyDishError::XlsError(_) => ErrorKind::MalformedInput,
            _ => ErrorKind::Unexpected,
        }
    }

    /// Returns the stage a failure was raised in, if it crossed a stage boundary.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RustyDishError::StageError { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, RustyDishError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| RustyDishError::WithContextError(format!("{}: {}", message, e)))
    }
}

pub(crate) trait ResultStage {
    /// Tags an error with the stage it crossed. Already tagged errors keep their original stage.
    fn in_stage(self, stage: Stage) -> Self;
}

impl<T> ResultStage for Result<T, RustyDishError> {
    fn in_stage(self, stage: Stage) -> Self {
        self.map_err(|error| match error {
            RustyDishError::StageError { .. } => error,
            error => RustyDishError::StageError {
                stage,
                source: Box::new(error),
            },
        })
    }
}
