//! Core domain types for compliance checks, scores, and reports.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current schema version for the serialized report format.
pub const REPORT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// One of the six fixed compliance dimensions.
///
/// Declaration order is catalog order: reports list categories in this order
/// regardless of which evaluator finished first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Accessibility,
    Seo,
    Performance,
    Security,
    ContentQuality,
    BestPractices,
}

impl Category {
    /// All categories in catalog order.
    pub const ALL: [Category; 6] = [
        Category::Accessibility,
        Category::Seo,
        Category::Performance,
        Category::Security,
        Category::ContentQuality,
        Category::BestPractices,
    ];

    /// Stable machine identifier (matches the serde representation).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accessibility => "accessibility",
            Self::Seo => "seo",
            Self::Performance => "performance",
            Self::Security => "security",
            Self::ContentQuality => "content_quality",
            Self::BestPractices => "best_practices",
        }
    }

    /// Human-readable category title used in reports.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Accessibility => "Accessibility Compliance",
            Self::Seo => "SEO Best Practices",
            Self::Performance => "Performance Optimization",
            Self::Security => "Security Headers",
            Self::ContentQuality => "Content Quality",
            Self::BestPractices => "AEM Best Practices",
        }
    }

    /// Documented taxonomy weight, in percent (25/20/20/15/10/10).
    pub fn default_weight_percent(self) -> f64 {
        match self {
            Self::Accessibility => 25.0,
            Self::Seo => 20.0,
            Self::Performance => 20.0,
            Self::Security => 15.0,
            Self::ContentQuality => 10.0,
            Self::BestPractices => 10.0,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| format!("unknown category '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Severity / CheckStatus / Grade
// ---------------------------------------------------------------------------

/// Issue severity, ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating one rule against one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckStatus {
    Pass,
    Fail,
    Partial,
    /// The data the rule needs is absent; counts neither for nor against.
    NotApplicable,
}

impl CheckStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Partial => "partial",
            Self::NotApplicable => "not-applicable",
        }
    }

    /// Whether the check contributes to its category's denominator.
    pub fn is_applicable(self) -> bool {
        !matches!(self, Self::NotApplicable)
    }

    /// Whether the check represents an issue (fail or partial).
    pub fn is_issue(self) -> bool {
        matches!(self, Self::Fail | Self::Partial)
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Letter grade derived from the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Map a score to a grade. Thresholds are inclusive lower bounds and the
    /// score is not rounded first: 89.999 is a B.
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::A
        } else if score >= 80.0 {
            Self::B
        } else if score >= 70.0 {
            Self::C
        } else if score >= 60.0 {
            Self::D
        } else {
            Self::F
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CheckResult
// ---------------------------------------------------------------------------

/// Result of a single check. Produced once per rule per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Id of the rule that produced this result.
    pub rule_id: String,
    /// Category of that rule.
    pub category: Category,
    pub status: CheckStatus,
    /// Severity copied from the rule at evaluation time.
    pub severity: Severity,
    /// Short human-readable outcome.
    pub message: String,
    /// How to fix the issue (only set for fail/partial).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    /// Locator of the element(s) that caused the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

impl CheckResult {
    pub fn new(
        rule_id: impl Into<String>,
        category: Category,
        status: CheckStatus,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            category,
            status,
            severity,
            message: message.into(),
            remediation: None,
            evidence: None,
        }
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

/// Aggregated score for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: Category,
    /// Display name of the category.
    pub name: String,
    /// Weighted score in [0, 100].
    pub score: f64,
    /// Category weight as a fraction of 1.0.
    pub weight: f64,
    pub passed: usize,
    pub failed: usize,
    pub partial: usize,
    pub not_applicable: usize,
    /// Set when no check in the category was applicable (score is then 100).
    pub low_confidence: bool,
}

impl CategoryScore {
    /// Number of checks that counted toward the score.
    pub fn applicable(&self) -> usize {
        self.passed + self.failed + self.partial
    }
}

/// Issue counts (fail + partial results) by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }

    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }
}

/// A category whose evaluator failed during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorFailure {
    pub category: Category,
    pub message: String,
}

// ---------------------------------------------------------------------------
// ComplianceReport
// ---------------------------------------------------------------------------

/// The immutable outcome of one compliance run over one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    /// URL or content path of the checked page.
    pub target: String,
    /// When the report was assembled.
    pub generated_at: DateTime<Utc>,
    /// Wall-clock duration of the run.
    pub duration_ms: u64,
    /// Version string of the rule catalog used.
    pub catalog_version: String,
    /// Category scores in catalog order. Failed categories are omitted.
    pub categories: Vec<CategoryScore>,
    /// Every check result, in catalog order.
    pub checks: Vec<CheckResult>,
    /// Weighted overall score; `None` only when no category produced data.
    pub overall_score: Option<f64>,
    pub grade: Option<Grade>,
    /// Issue counts by severity.
    pub issues: SeverityCounts,
    /// Categories whose evaluator failed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evaluator_errors: Vec<EvaluatorFailure>,
    /// True when at least one evaluator failed.
    pub partial: bool,
    /// SHA-256 over the scored content; equal for equal inputs.
    pub fingerprint: String,
}

impl ComplianceReport {
    /// Score for a category, if that category produced data.
    pub fn category(&self, category: Category) -> Option<&CategoryScore> {
        self.categories.iter().find(|c| c.category == category)
    }

    /// Check results of one category.
    pub fn checks_for(&self, category: Category) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(move |c| c.category == category)
    }

    /// Fail/partial results ordered by severity (high first), then catalog order.
    pub fn top_issues(&self, limit: usize) -> Vec<&CheckResult> {
        let mut issues: Vec<&CheckResult> =
            self.checks.iter().filter(|c| c.status.is_issue()).collect();
        issues.sort_by(|a, b| b.severity.cmp(&a.severity));
        issues.truncate(limit);
        issues
    }
}
