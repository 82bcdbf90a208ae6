//! Report assembly and fingerprinting.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use pagegrade_shared::{
    CategoryScore, CheckResult, ComplianceReport, EvaluatorFailure, REPORT_SCHEMA_VERSION, Result,
};

use crate::aggregate::Aggregation;

/// Assembles a [`ComplianceReport`] from an aggregation and its checks.
///
/// Pure apart from reading the clock when no timestamp is supplied.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    target: String,
    catalog_version: String,
    started_at: Option<Instant>,
    generated_at: Option<DateTime<Utc>>,
}

impl ReportBuilder {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            catalog_version: String::new(),
            started_at: None,
            generated_at: None,
        }
    }

    pub fn catalog_version(mut self, version: impl Into<String>) -> Self {
        self.catalog_version = version.into();
        self
    }

    /// When the run began; used for `duration_ms`.
    pub fn started_at(mut self, started: Instant) -> Self {
        self.started_at = Some(started);
        self
    }

    /// Fix the report timestamp instead of reading the clock.
    pub fn generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = Some(at);
        self
    }

    pub fn build(
        self,
        aggregation: Aggregation,
        checks: Vec<CheckResult>,
        evaluator_errors: Vec<EvaluatorFailure>,
    ) -> Result<ComplianceReport> {
        let fingerprint = fingerprint(
            &aggregation.categories,
            &checks,
            aggregation.overall_score,
        )?;
        let duration_ms = self
            .started_at
            .map_or(0, |s| u64::try_from(s.elapsed().as_millis()).unwrap_or(u64::MAX));

        Ok(ComplianceReport {
            schema_version: REPORT_SCHEMA_VERSION,
            target: self.target,
            generated_at: self.generated_at.unwrap_or_else(Utc::now),
            duration_ms,
            catalog_version: self.catalog_version,
            categories: aggregation.categories,
            checks,
            overall_score: aggregation.overall_score,
            grade: aggregation.grade,
            issues: aggregation.issues,
            partial: !evaluator_errors.is_empty(),
            evaluator_errors,
            fingerprint,
        })
    }
}

#[derive(Serialize)]
struct FingerprintInput<'a> {
    categories: &'a [CategoryScore],
    checks: &'a [CheckResult],
    overall_score: Option<f64>,
}

/// SHA-256 (hex) over the scored content of a report.
///
/// Timestamps and durations are excluded, so equal inputs hash equally.
pub fn fingerprint(
    categories: &[CategoryScore],
    checks: &[CheckResult],
    overall_score: Option<f64>,
) -> Result<String> {
    let bytes = serde_json::to_vec(&FingerprintInput {
        categories,
        checks,
        overall_score,
    })?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}
