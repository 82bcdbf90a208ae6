//! Folds check results into category scores, an overall score, and a grade.

use pagegrade_catalog::RuleCatalog;
use pagegrade_shared::{Category, CategoryScore, CheckResult, CheckStatus, Grade, SeverityCounts};
use tracing::debug;

/// Partial checks earn this fraction of their weight.
const PARTIAL_CREDIT: f64 = 0.5;

/// Scores derived from one run's results.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// One score per evaluated category, in catalog order.
    pub categories: Vec<CategoryScore>,
    pub overall_score: Option<f64>,
    pub grade: Option<Grade>,
    /// Fail and partial results by severity.
    pub issues: SeverityCounts,
}

/// Aggregate `results` for the categories that produced data.
///
/// Categories missing from `evaluated` (failed or not selected) get no
/// score, and the overall score is renormalized over the ones present.
pub fn aggregate(
    catalog: &RuleCatalog,
    evaluated: &[Category],
    results: &[CheckResult],
) -> Aggregation {
    let categories: Vec<CategoryScore> = Category::ALL
        .iter()
        .copied()
        .filter(|c| evaluated.contains(c))
        .map(|category| {
            let of_category = results.iter().filter(|r| r.category == category);
            score_category(catalog, category, of_category)
        })
        .collect();

    let overall_score = overall(&categories);
    let grade = overall_score.map(Grade::from_score);

    let mut issues = SeverityCounts::default();
    for result in results.iter().filter(|r| r.status.is_issue()) {
        issues.record(result.severity);
    }

    debug!(
        categories = categories.len(),
        overall = ?overall_score,
        issues = issues.total(),
        "results aggregated"
    );

    Aggregation {
        categories,
        overall_score,
        grade,
        issues,
    }
}

/// Weighted score of one category.
pub fn score_category<'a>(
    catalog: &RuleCatalog,
    category: Category,
    results: impl IntoIterator<Item = &'a CheckResult>,
) -> CategoryScore {
    let mut score = CategoryScore {
        category,
        name: category.display_name().to_string(),
        score: 100.0,
        weight: catalog.category_weight(category),
        passed: 0,
        failed: 0,
        partial: 0,
        not_applicable: 0,
        low_confidence: false,
    };

    let mut earned = 0.0;
    let mut possible = 0.0;
    for result in results {
        let weight = catalog.rule(&result.rule_id).map_or(0.0, |r| r.weight);
        match result.status {
            CheckStatus::Pass => {
                score.passed += 1;
                earned += weight;
                possible += weight;
            }
            CheckStatus::Partial => {
                score.partial += 1;
                earned += weight * PARTIAL_CREDIT;
                possible += weight;
            }
            CheckStatus::Fail => {
                score.failed += 1;
                possible += weight;
            }
            CheckStatus::NotApplicable => score.not_applicable += 1,
        }
    }

    if possible > 0.0 {
        score.score = (100.0 * earned / possible).clamp(0.0, 100.0);
    } else {
        score.low_confidence = true;
    }
    score
}

/// Σ score × weight over the categories present, renormalized.
fn overall(categories: &[CategoryScore]) -> Option<f64> {
    if categories.is_empty() {
        return None;
    }

    let total_weight: f64 = categories.iter().map(|c| c.weight).sum();
    let score = if total_weight > 0.0 {
        categories.iter().map(|c| c.score * c.weight).sum::<f64>() / total_weight
    } else {
        // Only zero-weighted categories ran; fall back to a plain mean.
        categories.iter().map(|c| c.score).sum::<f64>() / categories.len() as f64
    };
    Some(score.clamp(0.0, 100.0))
}
