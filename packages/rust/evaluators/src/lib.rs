//! Category evaluators for PageGrade.
//!
//! This crate provides:
//! - [`Evaluator`]: the per-category check trait
//! - [`EvaluatorRegistry`]: one evaluator per [`Category`], in catalog order
//! - [`evaluate_category`]: run one evaluator with tracing around it
//!
//! Evaluators never fetch anything. Data the document does not carry makes a
//! check not-applicable rather than failing it.

pub mod categories;

use std::collections::HashSet;

use tracing::{debug, warn};

use pagegrade_catalog::RuleDefinition;
use pagegrade_shared::{Category, CheckResult, EvaluatorError, NormalizedDocument};

pub use categories::{
    AccessibilityEvaluator, BestPracticesEvaluator, ContentQualityEvaluator, Evaluator,
    EvaluatorRegistry, PerformanceEvaluator, SecurityEvaluator, SeoEvaluator,
};

/// Run `evaluator` over `rules`, checking that it answered every rule once.
pub fn evaluate_category(
    evaluator: &dyn Evaluator,
    doc: &NormalizedDocument,
    rules: &[RuleDefinition],
) -> Result<Vec<CheckResult>, EvaluatorError> {
    let category: Category = evaluator.category();
    let results = evaluator.evaluate(doc, rules).inspect_err(|e| {
        warn!(evaluator = evaluator.name(), error = %e, "evaluator failed");
    })?;

    if results.len() != rules.len() {
        return Err(EvaluatorError::Aborted(format!(
            "{category} evaluator returned {} results for {} rules",
            results.len(),
            rules.len()
        )));
    }

    let mut unanswered: HashSet<&str> = rules.iter().map(|r| r.id.as_str()).collect();
    if let Some(stray) = results
        .iter()
        .find(|r| !unanswered.remove(r.rule_id.as_str()))
    {
        return Err(EvaluatorError::Aborted(format!(
            "{category} evaluator answered '{}' more than once or without a matching rule",
            stray.rule_id
        )));
    }

    debug!(
        evaluator = evaluator.name(),
        checks = results.len(),
        issues = results.iter().filter(|r| r.status.is_issue()).count(),
        "category evaluated"
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use pagegrade_catalog::RuleCatalog;
    use pagegrade_shared::CheckStatus;

    fn load_fixture(name: &str) -> NormalizedDocument {
        let path = format!("../../../fixtures/json/{name}");
        let content =
            std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"));
        serde_json::from_str(&content).expect("parse fixture")
    }

    fn run_all(doc: &NormalizedDocument) -> Vec<CheckResult> {
        let catalog = RuleCatalog::builtin().expect("builtin catalog");
        let registry = EvaluatorRegistry::new();
        registry
            .iter()
            .flat_map(|e| {
                evaluate_category(e.as_ref(), doc, &catalog.rules_for(e.category()))
                    .expect("evaluate")
            })
            .collect()
    }

    fn status(results: &[CheckResult], id: &str) -> CheckStatus {
        results
            .iter()
            .find(|r| r.rule_id == id)
            .map(|r| r.status)
            .unwrap_or_else(|| panic!("no result for {id}"))
    }

    // -----------------------------------------------------------------------
    // Registry
    // -----------------------------------------------------------------------

    #[test]
    fn registry_has_one_evaluator_per_category() {
        let registry = EvaluatorRegistry::new();
        let categories: Vec<Category> = registry.iter().map(|e| e.category()).collect();
        assert_eq!(categories, Category::ALL.to_vec());
    }

    /// Answers nothing, whatever it is asked.
    struct Empty;

    impl Evaluator for Empty {
        fn category(&self) -> Category {
            Category::Seo
        }
        fn evaluate(
            &self,
            _doc: &NormalizedDocument,
            _rules: &[RuleDefinition],
        ) -> Result<Vec<CheckResult>, EvaluatorError> {
            Ok(vec![])
        }
        fn name(&self) -> &str {
            "empty"
        }
    }

    #[test]
    fn registry_replacement_keeps_order() {
        let registry = EvaluatorRegistry::new().with_evaluator(Arc::new(Empty));
        let names: Vec<&str> = registry.iter().map(|e| e.name()).collect();
        assert_eq!(names.len(), 6);
        assert_eq!(names[1], "empty");
    }

    #[test]
    fn short_result_list_is_rejected() {
        let catalog = RuleCatalog::builtin().expect("builtin catalog");
        let doc = NormalizedDocument::new("https://example.com/");
        let err = evaluate_category(&Empty, &doc, &catalog.rules_for(Category::Seo)).unwrap_err();
        assert!(matches!(err, EvaluatorError::Aborted(_)));
    }

    /// Answers the first rule as many times as there are rules.
    struct Repeats;

    impl Evaluator for Repeats {
        fn category(&self) -> Category {
            Category::Seo
        }
        fn evaluate(
            &self,
            _doc: &NormalizedDocument,
            rules: &[RuleDefinition],
        ) -> Result<Vec<CheckResult>, EvaluatorError> {
            let first = &rules[0];
            Ok(rules
                .iter()
                .map(|_| {
                    CheckResult::new(
                        &first.id,
                        first.category,
                        CheckStatus::Pass,
                        first.severity,
                        "ok",
                    )
                })
                .collect())
        }
        fn name(&self) -> &str {
            "repeats"
        }
    }

    #[test]
    fn duplicate_rule_ids_are_rejected() {
        let catalog = RuleCatalog::builtin().expect("builtin catalog");
        let doc = NormalizedDocument::new("https://example.com/");
        let rules = catalog.rules_for(Category::Seo);
        assert!(rules.len() > 1);

        let err = evaluate_category(&Repeats, &doc, &rules).unwrap_err();
        match err {
            EvaluatorError::Aborted(msg) => assert!(msg.contains(&rules[0].id), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn foreign_rule_is_a_mismatch() {
        let catalog = RuleCatalog::builtin().expect("builtin catalog");
        let doc = NormalizedDocument::new("https://example.com/");
        let err = SeoEvaluator
            .evaluate(&doc, &catalog.rules_for(Category::Security))
            .unwrap_err();
        match err {
            EvaluatorError::RuleMismatch {
                rule_id,
                expected,
                actual,
            } => {
                assert_eq!(rule_id, "csp");
                assert_eq!(expected, Category::Seo);
                assert_eq!(actual, Category::Security);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    // -----------------------------------------------------------------------
    // Fixture documents
    // -----------------------------------------------------------------------

    #[test]
    fn empty_document_is_all_not_applicable() {
        let doc = NormalizedDocument::new("https://example.com/");
        let results = run_all(&doc);
        assert_eq!(results.len(), 21);
        assert!(
            results
                .iter()
                .all(|r| r.status == CheckStatus::NotApplicable)
        );
    }

    #[test]
    fn product_page_fixture() {
        let doc = load_fixture("document.fixture.json");
        let results = run_all(&doc);

        assert_eq!(status(&results, "alt_text"), CheckStatus::Fail);
        assert_eq!(status(&results, "heading_hierarchy"), CheckStatus::Partial);
        assert_eq!(status(&results, "language_attribute"), CheckStatus::Pass);
        assert_eq!(status(&results, "title_tag"), CheckStatus::Pass);
        assert_eq!(status(&results, "canonical_url"), CheckStatus::Pass);
        assert_eq!(status(&results, "script_async"), CheckStatus::Fail);
        assert_eq!(status(&results, "lazy_loading"), CheckStatus::Partial);
        assert_eq!(status(&results, "csp"), CheckStatus::Pass);
        assert_eq!(status(&results, "external_links"), CheckStatus::Fail);
        assert_eq!(status(&results, "https_resources"), CheckStatus::Pass);
        assert_eq!(status(&results, "broken_links"), CheckStatus::Fail);
        assert_eq!(status(&results, "empty_links"), CheckStatus::Fail);
        assert_eq!(status(&results, "content_structure"), CheckStatus::Pass);
        assert_eq!(status(&results, "component_structure"), CheckStatus::Fail);
        assert_eq!(status(&results, "clientlibs"), CheckStatus::Pass);
        assert_eq!(status(&results, "responsive_grid"), CheckStatus::Pass);
    }

    #[test]
    fn clean_page_fixture_passes_everything_applicable() {
        let doc = load_fixture("clean.fixture.json");
        let results = run_all(&doc);
        let issues: Vec<&str> = results
            .iter()
            .filter(|r| r.status.is_issue())
            .map(|r| r.rule_id.as_str())
            .collect();
        assert!(issues.is_empty(), "unexpected issues: {issues:?}");
    }
}
