//! Per-target outcome ledger, persisted once per run as a CSV file.
//!
//! The report is purely additive while a run executes and is assembled on a
//! single task after all parallel work has completed, so it needs no locking.

use std::borrow::Cow;
use std::path::Path;

use crate::error::Result;

/// File name the report is persisted under, inside the run's destination directory
pub const REPORT_FILE: &str = "fetching-report.csv";

/// One target's outcome
#[derive(Clone, Debug)]
struct ReportRow {
    target: String,
    status: bool,
    error_kind: Option<String>,
    error_message: Option<String>,
    code: Option<u16>,
}

/// Accumulates per-target outcomes and writes them out as a tabular file.
///
/// Rows keep insertion order. The optional columns (`error_types`,
/// `error_messages`, `codes`) appear in the output only when at least one row
/// supplies a value for them.
#[derive(Debug, Default)]
pub struct FetchReport {
    rows: Vec<ReportRow>,
}

impl FetchReport {
    /// Empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one target's outcome
    pub fn record(
        &mut self,
        target: impl Into<String>,
        status: bool,
        error_kind: Option<String>,
        error_message: Option<String>,
        code: Option<u16>,
    ) {
        self.rows.push(ReportRow {
            target: target.into(),
            status,
            error_kind,
            error_message,
            code,
        });
    }

    /// Number of recorded targets
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no targets have been recorded yet
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of targets recorded as successful
    pub fn successes(&self) -> usize {
        self.rows.iter().filter(|r| r.status).count()
    }

    /// Write the report to `{dir}/fetching-report.csv`, one row per target in
    /// insertion order. Overwrites any previous report at that path.
    pub fn persist(&self, dir: &Path) -> Result<()> {
        let with_kinds = self.rows.iter().any(|r| r.error_kind.is_some());
        let with_messages = self.rows.iter().any(|r| r.error_message.is_some());
        let with_codes = self.rows.iter().any(|r| r.code.is_some());

        let mut out = String::from("target,status");
        if with_kinds {
            out.push_str(",error_types");
        }
        if with_messages {
            out.push_str(",error_messages");
        }
        if with_codes {
            out.push_str(",codes");
        }
        out.push('\n');

        for row in &self.rows {
            out.push_str(&csv_field(&row.target));
            out.push(',');
            out.push_str(if row.status { "true" } else { "false" });
            if with_kinds {
                out.push(',');
                out.push_str(&csv_field(row.error_kind.as_deref().unwrap_or("")));
            }
            if with_messages {
                out.push(',');
                out.push_str(&csv_field(row.error_message.as_deref().unwrap_or("")));
            }
            if with_codes {
                out.push(',');
                if let Some(code) = row.code {
                    out.push_str(&code.to_string());
                }
            }
            out.push('\n');
        }

        std::fs::write(dir.join(REPORT_FILE), out)?;
        Ok(())
    }
}

/// Quote a CSV field when it contains a separator, quote, or line break.
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}
