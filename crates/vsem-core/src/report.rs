//! Structured diagnostics handed to the embedding host.
//!
//! The core never prints; it pushes [`Report`] values into a [`Reporter`]
//! sink owned by the caller (the language server, a test harness).

use strum_macros::Display;

use crate::ast::Range;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ReportKind {
    Notice,
    Warning,
    #[default]
    Error,
}

/// One diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub kind: ReportKind,
    pub message: String,
    pub range: Range,
    pub file_path: String,
}

/// Diagnostic sink implemented by the embedding host.
pub trait Reporter {
    fn report(&mut self, report: Report);
}

/// Reporter that keeps everything in memory. Used by tests and by callers
/// that batch diagnostics per request.
#[derive(Debug, Clone, Default)]
pub struct CollectingReporter {
    pub reports: Vec<Report>,
}

impl Reporter for CollectingReporter {
    fn report(&mut self, report: Report) {
        self.reports.push(report);
    }
}
