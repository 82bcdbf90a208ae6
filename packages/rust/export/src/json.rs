//! JSON exporter.

use std::io::Write;

use pagegrade_shared::{ComplianceReport, Result};

use crate::{ExportFormat, ReportExporter, write_err};

/// Writes reports as a JSON array.
#[derive(Debug, Clone, Copy)]
pub struct JsonExporter {
    pub pretty: bool,
}

impl Default for JsonExporter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl ReportExporter for JsonExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    fn export(&self, reports: &[ComplianceReport], out: &mut dyn Write) -> Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut *out, reports)?;
        } else {
            serde_json::to_writer(&mut *out, reports)?;
        }
        out.write_all(b"\n").map_err(write_err)?;
        out.flush().map_err(write_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::sample_report;

    #[test]
    fn json_roundtrips_reports() {
        let report = sample_report();
        let mut buf = Vec::new();
        JsonExporter::default()
            .export(std::slice::from_ref(&report), &mut buf)
            .expect("export");

        let parsed: Vec<ComplianceReport> = serde_json::from_slice(&buf).expect("parse");
        assert_eq!(parsed, vec![report]);
    }

    #[test]
    fn compact_output_is_one_line() {
        let mut buf = Vec::new();
        JsonExporter { pretty: false }
            .export(&[sample_report()], &mut buf)
            .expect("export");
        let text = String::from_utf8(buf).expect("utf-8");
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("\"status\":\"fail\""));
        assert!(text.contains("\"grade\":\"D\""));
    }
}
