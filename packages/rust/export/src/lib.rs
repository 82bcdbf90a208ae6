//! Report exporters for PageGrade.
//!
//! This crate provides:
//! - [`ReportExporter`]: the contract every output format implements
//! - [`CsvExporter`] (detailed or summary) and [`JsonExporter`]
//! - [`export_to_dir`]: write a timestamped report file atomically
//!
//! Other formats (PDF, HTML) plug in by implementing [`ReportExporter`].

pub mod csv;
pub mod json;

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use pagegrade_shared::{ComplianceReport, GradeError, Result};

pub use crate::csv::CsvExporter;
pub use crate::json::JsonExporter;

/// Prefix of every exported file name.
const FILE_PREFIX: &str = "compliance_report";

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// Output formats the built-in exporters produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    Json,
    /// One row per check, plus category rows.
    Csv,
    /// One row per report.
    CsvSummary,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::CsvSummary => "csv-summary",
        }
    }

    /// File extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv | Self::CsvSummary => "csv",
        }
    }

    /// The built-in exporter for this format.
    pub fn exporter(self) -> Box<dyn ReportExporter> {
        match self {
            Self::Json => Box::new(JsonExporter::default()),
            Self::Csv => Box::new(CsvExporter::detailed()),
            Self::CsvSummary => Box::new(CsvExporter::summary()),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "csv-summary" | "csv_summary" => Ok(Self::CsvSummary),
            other => Err(format!("unknown export format '{other}'")),
        }
    }
}

/// Serializes reports to a byte stream.
pub trait ReportExporter: Send + Sync {
    fn format(&self) -> ExportFormat;

    /// File extension, without the dot.
    fn extension(&self) -> &str {
        self.format().extension()
    }

    /// Write `reports` to `out`. The reports are never modified.
    fn export(&self, reports: &[ComplianceReport], out: &mut dyn Write) -> Result<()>;
}

pub(crate) fn write_err(e: std::io::Error) -> GradeError {
    GradeError::export(format!("write failed: {e}"))
}

// ---------------------------------------------------------------------------
// File output
// ---------------------------------------------------------------------------

/// Metadata for a written export file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub format: ExportFormat,
    pub size_bytes: u64,
    /// SHA-256 hex digest of the file contents.
    pub sha256: String,
}

/// `compliance_report_<YYYYmmdd_HHMMSS>.<ext>`
pub fn export_file_name(extension: &str, at: DateTime<Local>) -> String {
    format!("{FILE_PREFIX}_{}.{extension}", at.format("%Y%m%d_%H%M%S"))
}

/// First free name for `at` in `dir`: the plain timestamped name, then
/// `compliance_report_<stamp>_2.<ext>`, `_3`, and so on.
fn unused_export_path(dir: &Path, extension: &str, at: DateTime<Local>) -> PathBuf {
    let path = dir.join(export_file_name(extension, at));
    if !path.exists() {
        return path;
    }
    let stamp = at.format("%Y%m%d_%H%M%S");
    (2u32..)
        .map(|n| dir.join(format!("{FILE_PREFIX}_{stamp}_{n}.{extension}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(path)
}

/// Write `content` to a temporary sibling of `path`, then rename it into
/// place. The temporary file is removed when either step fails.
fn write_atomically(path: &Path, content: &[u8]) -> Result<()> {
    let temp = path.with_extension("tmp");
    if let Err(e) = std::fs::write(&temp, content) {
        let _ = std::fs::remove_file(&temp);
        return Err(GradeError::io(&temp, e));
    }
    if let Err(e) = std::fs::rename(&temp, path) {
        let _ = std::fs::remove_file(&temp);
        return Err(GradeError::io(path, e));
    }
    Ok(())
}

/// Export `reports` into `dir` under a timestamped name.
pub fn export_to_dir(
    exporter: &dyn ReportExporter,
    reports: &[ComplianceReport],
    dir: &Path,
) -> Result<ExportedFile> {
    export_to_dir_at(exporter, reports, dir, Local::now())
}

/// Like [`export_to_dir`] with an explicit timestamp for the file name.
///
/// The file is rendered in memory, written to a temporary sibling, and
/// renamed into place.
#[instrument(skip_all, fields(dir = %dir.display(), format = %exporter.format(), reports = reports.len()))]
pub fn export_to_dir_at(
    exporter: &dyn ReportExporter,
    reports: &[ComplianceReport],
    dir: &Path,
    at: DateTime<Local>,
) -> Result<ExportedFile> {
    std::fs::create_dir_all(dir).map_err(|e| GradeError::io(dir, e))?;

    let mut content = Vec::new();
    exporter.export(reports, &mut content)?;

    let path = unused_export_path(dir, exporter.extension(), at);
    write_atomically(&path, &content)?;

    let mut hasher = Sha256::new();
    hasher.update(&content);
    let sha256 = format!("{:x}", hasher.finalize());

    debug!(file = %path.display(), size = content.len(), "wrote export");
    info!(path = %path.display(), "report exported");

    Ok(ExportedFile {
        path,
        format: exporter.format(),
        size_bytes: content.len() as u64,
        sha256,
    })
}
