//! Typed failures and recoverable diagnostics for the normalization pipeline.
//!
//! Malformed *cell* content never fails a run; it is either passed through or
//! counted as a [`DiagnosticKind`]. Only a structurally missing page (or an
//! unusable configuration/source) surfaces as a [`PipelineError`].

use std::{fmt, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The requested unit exists but contains no usable table.
    #[error("No table found on page {page}")]
    NoTableFound { page: usize },
    /// The requested unit does not exist in the source document.
    #[error("Page {page} is not available (source has {pages} page(s))")]
    SourceUnavailable { page: usize, pages: usize },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to read table source {path:?}: {message}")]
    Source { path: PathBuf, message: String },
}

impl PipelineError {
    /// Whether the run may continue after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PipelineError::NoTableFound { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A period cell held text that is not a number.
    NonNumericValue,
    /// A body row was padded or truncated to the header width.
    WidthMismatch,
    /// A row had fewer value cells than configured periods.
    PartialPeriods,
}

impl DiagnosticKind {
    pub const ALL: [DiagnosticKind; 3] = [
        DiagnosticKind::WidthMismatch,
        DiagnosticKind::PartialPeriods,
        DiagnosticKind::NonNumericValue,
    ];
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DiagnosticKind::NonNumericValue => "non-numeric value",
            DiagnosticKind::WidthMismatch => "width mismatch",
            DiagnosticKind::PartialPeriods => "partial periods",
        };
        f.write_str(label)
    }
}

/// Per-run counters for recoverable degradations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub width_mismatches: usize,
    pub non_numeric_values: usize,
    pub partial_periods: usize,
    pub tables_skipped: usize,
}

impl Diagnostics {
    pub fn add(&mut self, kind: DiagnosticKind, count: usize) {
        let slot = match kind {
            DiagnosticKind::NonNumericValue => &mut self.non_numeric_values,
            DiagnosticKind::WidthMismatch => &mut self.width_mismatches,
            DiagnosticKind::PartialPeriods => &mut self.partial_periods,
        };
        *slot += count;
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        match kind {
            DiagnosticKind::NonNumericValue => self.non_numeric_values,
            DiagnosticKind::WidthMismatch => self.width_mismatches,
            DiagnosticKind::PartialPeriods => self.partial_periods,
        }
    }
}
