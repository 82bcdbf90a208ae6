//! Summary statistics over a set of reports.

use std::collections::BTreeMap;

use serde::Serialize;

use pagegrade_shared::{ComplianceReport, Grade, SeverityCounts};

use crate::batch::BatchOutcome;

/// Aggregate view of a batch run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Documents that produced a report.
    pub total_pages: usize,
    /// Documents whose run failed outright (no report).
    pub errored: usize,
    /// Mean overall score across reports that have one.
    pub average_score: Option<f64>,
    /// Reports per grade; reports without a grade are not counted.
    pub grade_distribution: BTreeMap<Grade, usize>,
    /// Issue totals across all reports.
    pub issues: SeverityCounts,
    /// Reports at or above the threshold.
    pub passed: usize,
    /// Reports below the threshold, or without an overall score.
    pub failed: usize,
    /// Reports with at least one failed evaluator.
    pub partial: usize,
    pub threshold: f64,
}

impl BatchSummary {
    pub fn from_reports(reports: &[ComplianceReport], threshold: f64) -> Self {
        Self::collect(reports.iter(), 0, threshold)
    }

    pub fn from_outcomes(outcomes: &[BatchOutcome], threshold: f64) -> Self {
        let errored = outcomes.iter().filter(|o| o.result.is_err()).count();
        Self::collect(outcomes.iter().filter_map(BatchOutcome::report), errored, threshold)
    }

    fn collect<'a>(
        reports: impl Iterator<Item = &'a ComplianceReport>,
        errored: usize,
        threshold: f64,
    ) -> Self {
        let mut summary = Self {
            total_pages: 0,
            errored,
            average_score: None,
            grade_distribution: BTreeMap::new(),
            issues: SeverityCounts::default(),
            passed: 0,
            failed: 0,
            partial: 0,
            threshold,
        };

        let mut score_sum = 0.0;
        let mut scored = 0usize;
        for report in reports {
            summary.total_pages += 1;
            summary.issues.high += report.issues.high;
            summary.issues.medium += report.issues.medium;
            summary.issues.low += report.issues.low;
            if report.partial {
                summary.partial += 1;
            }
            if let Some(grade) = report.grade {
                *summary.grade_distribution.entry(grade).or_insert(0) += 1;
            }
            match report.overall_score {
                Some(score) => {
                    score_sum += score;
                    scored += 1;
                    if score >= threshold {
                        summary.passed += 1;
                    } else {
                        summary.failed += 1;
                    }
                }
                None => summary.failed += 1,
            }
        }

        if scored > 0 {
            summary.average_score = Some(score_sum / scored as f64);
        }
        summary
    }

    /// Share of reports that passed, as a percentage.
    pub fn pass_rate(&self) -> f64 {
        if self.total_pages == 0 {
            0.0
        } else {
            100.0 * self.passed as f64 / self.total_pages as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pagegrade_shared::{GradeError, REPORT_SCHEMA_VERSION};

    fn report(score: Option<f64>, high: usize, partial: bool) -> ComplianceReport {
        ComplianceReport {
            schema_version: REPORT_SCHEMA_VERSION,
            target: "https://example.com/".into(),
            generated_at: Utc::now(),
            duration_ms: 1,
            catalog_version: "test".into(),
            categories: vec![],
            checks: vec![],
            overall_score: score,
            grade: score.map(Grade::from_score),
            issues: SeverityCounts {
                high,
                medium: 1,
                low: 0,
            },
            evaluator_errors: vec![],
            partial,
            fingerprint: String::new(),
        }
    }

    #[test]
    fn summarizes_scores_grades_and_issues() {
        let reports = [
            report(Some(95.0), 0, false),
            report(Some(70.0), 2, false),
            report(Some(55.0), 3, true),
        ];
        let summary = BatchSummary::from_reports(&reports, 70.0);

        assert_eq!(summary.total_pages, 3);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.partial, 1);
        assert_eq!(summary.issues.high, 5);
        assert_eq!(summary.issues.medium, 3);
        assert_eq!(summary.grade_distribution.get(&Grade::A), Some(&1));
        assert_eq!(summary.grade_distribution.get(&Grade::C), Some(&1));
        assert_eq!(summary.grade_distribution.get(&Grade::F), Some(&1));
        let avg = summary.average_score.expect("average");
        assert!((avg - 220.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn unscored_report_counts_as_failed() {
        let summary = BatchSummary::from_reports(&[report(None, 0, true)], 70.0);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.average_score, None);
        assert!(summary.grade_distribution.is_empty());
        assert_eq!(summary.pass_rate(), 0.0);
    }

    #[test]
    fn outcomes_count_errors_separately() {
        let outcomes = [
            BatchOutcome {
                target: "https://a.example/".into(),
                result: Ok(report(Some(88.0), 0, false)),
            },
            BatchOutcome {
                target: "https://b.example/".into(),
                result: Err(GradeError::Timeout { elapsed_ms: 5000 }),
            },
        ];
        let summary = BatchSummary::from_outcomes(&outcomes, 70.0);
        assert_eq!(summary.total_pages, 1);
        assert_eq!(summary.errored, 1);
        assert_eq!(summary.pass_rate(), 100.0);
    }

    #[test]
    fn empty_summary() {
        let summary = BatchSummary::from_reports(&[], 70.0);
        assert_eq!(summary.total_pages, 0);
        assert_eq!(summary.average_score, None);
    }
}
