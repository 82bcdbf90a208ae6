//! CSV exporter.
//!
//! Fields follow RFC 4180: values containing commas, quotes, or line breaks
//! are quoted and inner quotes doubled. Rows end with CRLF.

use std::io::Write;

use pagegrade_shared::{CategoryScore, CheckResult, ComplianceReport, Result};

use crate::{ExportFormat, ReportExporter, write_err};

const DETAILED_HEADER: &[&str] = &[
    "record",
    "target",
    "overall_score",
    "grade",
    "total_issues",
    "high",
    "medium",
    "low",
    "category",
    "category_score",
    "rule_id",
    "status",
    "severity",
    "message",
    "remediation",
    "evidence",
    "generated_at",
];

const SUMMARY_HEADER: &[&str] = &[
    "target",
    "overall_score",
    "grade",
    "total_issues",
    "high",
    "medium",
    "low",
    "partial",
    "generated_at",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Writes reports as CSV.
///
/// Detailed mode emits one `category` row per category score followed by
/// one `check` row per check result. Summary mode emits one row per report.
#[derive(Debug, Clone, Copy)]
pub struct CsvExporter {
    pub detailed: bool,
}

impl CsvExporter {
    pub fn detailed() -> Self {
        Self { detailed: true }
    }

    pub fn summary() -> Self {
        Self { detailed: false }
    }
}

impl ReportExporter for CsvExporter {
    fn format(&self) -> ExportFormat {
        if self.detailed {
            ExportFormat::Csv
        } else {
            ExportFormat::CsvSummary
        }
    }

    fn export(&self, reports: &[ComplianceReport], out: &mut dyn Write) -> Result<()> {
        if self.detailed {
            write_row(out, DETAILED_HEADER.iter().map(|h| (*h).to_string()))?;
            for report in reports {
                for category in &report.categories {
                    write_row(out, category_row(report, category))?;
                }
                for check in &report.checks {
                    write_row(out, check_row(report, check))?;
                }
            }
        } else {
            write_row(out, SUMMARY_HEADER.iter().map(|h| (*h).to_string()))?;
            for report in reports {
                write_row(out, summary_row(report))?;
            }
        }
        out.flush().map_err(write_err)
    }
}

/// Columns shared by every detailed row: target through low.
fn report_columns(report: &ComplianceReport) -> Vec<String> {
    vec![
        report.target.clone(),
        score(report.overall_score),
        report.grade.map(|g| g.to_string()).unwrap_or_default(),
        report.issues.total().to_string(),
        report.issues.high.to_string(),
        report.issues.medium.to_string(),
        report.issues.low.to_string(),
    ]
}

fn category_row(report: &ComplianceReport, category: &CategoryScore) -> Vec<String> {
    let mut row = vec!["category".to_string()];
    row.extend(report_columns(report));
    row.extend([
        category.category.to_string(),
        score(Some(category.score)),
        String::new(),
        String::new(),
        String::new(),
        if category.low_confidence {
            "no applicable checks".to_string()
        } else {
            format!(
                "{} passed, {} partial, {} failed, {} not applicable",
                category.passed, category.partial, category.failed, category.not_applicable
            )
        },
        String::new(),
        String::new(),
        timestamp(report),
    ]);
    row
}

fn check_row(report: &ComplianceReport, check: &CheckResult) -> Vec<String> {
    let category_score = report.category(check.category).map(|c| c.score);
    let mut row = vec!["check".to_string()];
    row.extend(report_columns(report));
    row.extend([
        check.category.to_string(),
        score(category_score),
        check.rule_id.clone(),
        check.status.to_string(),
        check.severity.to_string(),
        check.message.clone(),
        check.remediation.clone().unwrap_or_default(),
        check.evidence.clone().unwrap_or_default(),
        timestamp(report),
    ]);
    row
}

fn summary_row(report: &ComplianceReport) -> Vec<String> {
    vec![
        report.target.clone(),
        score(report.overall_score),
        report.grade.map(|g| g.to_string()).unwrap_or_default(),
        report.issues.total().to_string(),
        report.issues.high.to_string(),
        report.issues.medium.to_string(),
        report.issues.low.to_string(),
        report.partial.to_string(),
        timestamp(report),
    ]
}

fn score(value: Option<f64>) -> String {
    value.map(|s| format!("{s:.1}")).unwrap_or_default()
}

fn timestamp(report: &ComplianceReport) -> String {
    report.generated_at.format(TIMESTAMP_FORMAT).to_string()
}

fn write_row<I>(out: &mut dyn Write, fields: I) -> Result<()>
where
    I: IntoIterator<Item = String>,
{
    let line = fields
        .into_iter()
        .map(|f| escape_csv_field(&f))
        .collect::<Vec<_>>()
        .join(",");
    out.write_all(line.as_bytes()).map_err(write_err)?;
    out.write_all(b"\r\n").map_err(write_err)
}

/// Escapes a field for CSV according to RFC 4180.
pub fn escape_csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
