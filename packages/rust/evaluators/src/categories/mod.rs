//! Evaluator trait and built-in evaluators, one per category.
//!
//! Evaluators are pure: they read a document and a slice of rules and
//! return one result per rule. They never touch I/O and never mutate the
//! document, so the engine can run them concurrently.

mod accessibility;
mod best_practices;
mod content_quality;
mod performance;
mod security;
mod seo;

use std::sync::Arc;

use pagegrade_catalog::RuleDefinition;
use pagegrade_shared::{
    Category, CheckResult, CheckStatus, EvaluatorError, Heading, NormalizedDocument,
};

pub use accessibility::AccessibilityEvaluator;
pub use best_practices::BestPracticesEvaluator;
pub use content_quality::ContentQualityEvaluator;
pub use performance::PerformanceEvaluator;
pub use security::SecurityEvaluator;
pub use seo::SeoEvaluator;

/// Maximum number of element locators listed in a result's evidence.
const MAX_EVIDENCE_ITEMS: usize = 5;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Checks every rule of one category against a document.
pub trait Evaluator: Send + Sync {
    /// The category this evaluator owns.
    fn category(&self) -> Category;

    /// Evaluate `rules` against `doc`, returning results in rule order.
    ///
    /// Every rule must belong to [`Evaluator::category`]; a foreign rule is
    /// rejected before anything is evaluated.
    fn evaluate(
        &self,
        doc: &NormalizedDocument,
        rules: &[RuleDefinition],
    ) -> Result<Vec<CheckResult>, EvaluatorError>;

    /// Human-readable evaluator name for tracing.
    fn name(&self) -> &str {
        self.category().as_str()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds one evaluator per category, in catalog order.
#[derive(Clone)]
pub struct EvaluatorRegistry {
    evaluators: Vec<Arc<dyn Evaluator>>,
}

impl EvaluatorRegistry {
    /// Create a registry with all built-in evaluators.
    pub fn new() -> Self {
        Self {
            evaluators: vec![
                Arc::new(AccessibilityEvaluator),
                Arc::new(SeoEvaluator),
                Arc::new(PerformanceEvaluator),
                Arc::new(SecurityEvaluator),
                Arc::new(ContentQualityEvaluator),
                Arc::new(BestPracticesEvaluator),
            ],
        }
    }

    /// Replace the evaluator registered for `evaluator.category()`.
    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        let category = evaluator.category();
        self.evaluators.retain(|e| e.category() != category);
        self.evaluators.push(evaluator);
        self.evaluators.sort_by_key(|e| e.category());
        self
    }

    /// The evaluator for a category.
    pub fn get(&self, category: Category) -> Option<Arc<dyn Evaluator>> {
        self.evaluators
            .iter()
            .find(|e| e.category() == category)
            .cloned()
    }

    /// All evaluators in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Evaluator>> {
        self.evaluators.iter()
    }
}

impl Default for EvaluatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Reject any rule that does not belong to `category`.
pub(crate) fn ensure_category(
    category: Category,
    rules: &[RuleDefinition],
) -> Result<(), EvaluatorError> {
    for rule in rules {
        let actual = rule.kind.category();
        if rule.category != category || actual != category {
            return Err(mismatch(category, rule));
        }
    }
    Ok(())
}

pub(crate) fn mismatch(expected: Category, rule: &RuleDefinition) -> EvaluatorError {
    EvaluatorError::RuleMismatch {
        rule_id: rule.id.clone(),
        expected,
        actual: rule.kind.category(),
    }
}

/// Build a result for `rule`. Issues carry the rule's remediation hint.
pub(crate) fn outcome(
    rule: &RuleDefinition,
    status: CheckStatus,
    message: impl Into<String>,
) -> CheckResult {
    let result = CheckResult::new(&rule.id, rule.category, status, rule.severity, message);
    if status.is_issue() {
        result.with_remediation(&rule.remediation)
    } else {
        result
    }
}

pub(crate) fn pass(rule: &RuleDefinition, message: impl Into<String>) -> CheckResult {
    outcome(rule, CheckStatus::Pass, message)
}

pub(crate) fn fail(rule: &RuleDefinition, message: impl Into<String>) -> CheckResult {
    outcome(rule, CheckStatus::Fail, message)
}

pub(crate) fn partial(rule: &RuleDefinition, message: impl Into<String>) -> CheckResult {
    outcome(rule, CheckStatus::Partial, message)
}

pub(crate) fn not_applicable(rule: &RuleDefinition, message: impl Into<String>) -> CheckResult {
    outcome(rule, CheckStatus::NotApplicable, message)
}

/// Join element locators into an evidence string, capped at a few items.
pub(crate) fn evidence<I>(locators: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let all: Vec<String> = locators.into_iter().collect();
    let shown = all.len().min(MAX_EVIDENCE_ITEMS);
    let mut out = all[..shown].join("; ");
    if all.len() > shown {
        out.push_str(&format!("; (+{} more)", all.len() - shown));
    }
    out
}

/// Heading levels outside 1..=6 cannot come from real markup.
pub(crate) fn validate_heading_levels(headings: &[Heading]) -> Result<(), EvaluatorError> {
    match headings.iter().find(|h| !(1..=6).contains(&h.level)) {
        Some(bad) => Err(EvaluatorError::malformed(format!(
            "heading level {} outside 1..=6",
            bad.level
        ))),
        None => Ok(()),
    }
}

/// `true` when the value is missing or only whitespace.
pub(crate) fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// Quote a value for an evidence locator, shortening long values.
pub(crate) fn quote(value: &str) -> String {
    const MAX: usize = 60;
    let trimmed = value.trim();
    if trimmed.chars().count() > MAX {
        let head: String = trimmed.chars().take(MAX).collect();
        format!("\"{head}...\"")
    } else {
        format!("\"{trimmed}\"")
    }
}
