//! Concurrent compliance engine.
//!
//! One blocking task per category evaluates the shared document; results are
//! awaited in catalog order. The whole fan-out runs under a deadline: when
//! it expires, everything is discarded and the run fails with a timeout. A
//! category whose evaluator errors or panics is dropped from the scores and
//! the report is marked partial.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinError;
use tracing::{debug, info, instrument, warn};

use pagegrade_catalog::RuleCatalog;
use pagegrade_evaluators::{EvaluatorRegistry, evaluate_category};
use pagegrade_shared::{
    Category, CheckResult, ComplianceReport, EngineConfig, EvaluatorError, EvaluatorFailure,
    GradeError, NormalizedDocument, Result,
};

use crate::aggregate::aggregate;
use crate::report::ReportBuilder;

/// Deadline for one run when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Documents checked at once by [`Engine::run_batch`] when none is configured.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

// ---------------------------------------------------------------------------
// RunOptions
// ---------------------------------------------------------------------------

/// Per-run selection of what to check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Categories to evaluate; `None` evaluates all of them.
    pub categories: Option<Vec<Category>>,
}

impl RunOptions {
    /// Evaluate only the given categories.
    pub fn only(categories: impl IntoIterator<Item = Category>) -> Self {
        Self {
            categories: Some(categories.into_iter().collect()),
        }
    }

    fn selects(&self, category: Category) -> bool {
        self.categories
            .as_ref()
            .is_none_or(|selected| selected.contains(&category))
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Runs the catalog's checks against documents.
///
/// Cheap to clone: the catalog and evaluators are shared.
#[derive(Clone)]
pub struct Engine {
    catalog: Arc<RuleCatalog>,
    registry: EvaluatorRegistry,
    timeout: Duration,
    options: RunOptions,
    pub(crate) max_concurrent: usize,
}

impl Engine {
    /// Create an engine with the built-in evaluators and default limits.
    pub fn new(catalog: Arc<RuleCatalog>) -> Self {
        Self {
            catalog,
            registry: EvaluatorRegistry::new(),
            timeout: DEFAULT_TIMEOUT,
            options: RunOptions::default(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }

    /// Create an engine with limits taken from the `[engine]` config section.
    pub fn from_config(catalog: Arc<RuleCatalog>, config: &EngineConfig) -> Self {
        Self::new(catalog)
            .with_timeout(Duration::from_millis(config.timeout_ms))
            .with_max_concurrent(config.max_concurrent_checks)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the evaluators (alternate implementations, test doubles).
    pub fn with_registry(mut self, registry: EvaluatorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Bound on documents checked at once in a batch. Zero is treated as one.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Check one document and build its report.
    ///
    /// Evaluator failures never surface here; they produce a partial report.
    /// Only a timeout (or a fingerprinting failure) is an `Err`.
    #[instrument(skip_all, fields(page = %doc.target))]
    pub async fn run(&self, doc: Arc<NormalizedDocument>) -> Result<ComplianceReport> {
        let started = Instant::now();

        let mut handles = Vec::new();
        let mut failures: Vec<EvaluatorFailure> = Vec::new();

        for category in Category::ALL {
            if !self.options.selects(category) {
                debug!(%category, "category not selected");
                continue;
            }
            let Some(evaluator) = self.registry.get(category) else {
                failures.push(failure(
                    category,
                    EvaluatorError::Aborted("no evaluator registered".into()),
                ));
                continue;
            };

            let rules = self.catalog.rules_for(category);
            let doc = Arc::clone(&doc);
            handles.push((
                category,
                tokio::task::spawn_blocking(move || {
                    evaluate_category(evaluator.as_ref(), &doc, &rules)
                }),
            ));
        }

        // Fan-in in catalog order.
        let fan_in = async move {
            let mut outcomes = Vec::with_capacity(handles.len());
            for (category, handle) in handles {
                let outcome = handle.await.unwrap_or_else(|e| Err(join_failure(e)));
                outcomes.push((category, outcome));
            }
            outcomes
        };

        let outcomes = match tokio::time::timeout(self.timeout, fan_in).await {
            Ok(outcomes) => outcomes,
            Err(_) => {
                let elapsed_ms = millis(started.elapsed());
                warn!(elapsed_ms, timeout_ms = millis(self.timeout), "compliance run timed out");
                return Err(GradeError::Timeout { elapsed_ms });
            }
        };

        let mut evaluated = Vec::with_capacity(outcomes.len());
        let mut checks: Vec<CheckResult> = Vec::with_capacity(self.catalog.len());
        for (category, outcome) in outcomes {
            match outcome {
                Ok(results) => {
                    evaluated.push(category);
                    checks.extend(results);
                }
                Err(source) => {
                    warn!(%category, error = %source, "category dropped from report");
                    failures.push(failure(category, source));
                }
            }
        }
        failures.sort_by_key(|f| f.category);

        let aggregation = aggregate(&self.catalog, &evaluated, &checks);
        let report = ReportBuilder::new(doc.target.clone())
            .catalog_version(self.catalog.version())
            .started_at(started)
            .build(aggregation, checks, failures)?;

        info!(
            score = ?report.overall_score,
            grade = ?report.grade,
            issues = report.issues.total(),
            partial = report.partial,
            duration_ms = report.duration_ms,
            "compliance run complete"
        );

        Ok(report)
    }
}

/// Check one document with the built-in evaluators and default limits.
pub async fn run_compliance(
    doc: Arc<NormalizedDocument>,
    catalog: Arc<RuleCatalog>,
) -> Result<ComplianceReport> {
    Engine::new(catalog).run(doc).await
}

fn failure(category: Category, source: EvaluatorError) -> EvaluatorFailure {
    EvaluatorFailure {
        category,
        message: GradeError::Evaluator { category, source }.to_string(),
    }
}

fn join_failure(err: JoinError) -> EvaluatorError {
    if err.is_panic() {
        EvaluatorError::Aborted(format!("panicked: {}", panic_message(err.into_panic())))
    } else {
        EvaluatorError::Aborted(err.to_string())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagegrade_catalog::{RuleDefinition, builtin_rule_ids, load_catalog};
    use pagegrade_evaluators::Evaluator;
    use pagegrade_shared::{
        CheckStatus, HeadInfo, Image, RuleCatalogConfig, Severity,
    };

    fn builtin() -> Arc<RuleCatalog> {
        Arc::new(RuleCatalog::builtin().expect("catalog"))
    }

    fn load_fixture(name: &str) -> Arc<NormalizedDocument> {
        let path = format!("../../../fixtures/json/{name}");
        let content =
            std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"));
        Arc::new(serde_json::from_str(&content).expect("parse fixture"))
    }

    /// Stands in for the security evaluator and always errors.
    struct Broken;

    impl Evaluator for Broken {
        fn category(&self) -> Category {
            Category::Security
        }
        fn evaluate(
            &self,
            _doc: &NormalizedDocument,
            _rules: &[RuleDefinition],
        ) -> std::result::Result<Vec<CheckResult>, EvaluatorError> {
            Err(EvaluatorError::malformed("unreadable headers"))
        }
    }

    struct Panicking;

    impl Evaluator for Panicking {
        fn category(&self) -> Category {
            Category::Performance
        }
        fn evaluate(
            &self,
            _doc: &NormalizedDocument,
            _rules: &[RuleDefinition],
        ) -> std::result::Result<Vec<CheckResult>, EvaluatorError> {
            panic!("evaluator exploded")
        }
    }

    struct Slow;

    impl Evaluator for Slow {
        fn category(&self) -> Category {
            Category::Seo
        }
        fn evaluate(
            &self,
            _doc: &NormalizedDocument,
            _rules: &[RuleDefinition],
        ) -> std::result::Result<Vec<CheckResult>, EvaluatorError> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn every_enabled_rule_produces_one_result() {
        let catalog = builtin();
        let report = run_compliance(load_fixture("document.fixture.json"), Arc::clone(&catalog))
            .await
            .expect("run");

        let ids: Vec<&str> = report.checks.iter().map(|c| c.rule_id.as_str()).collect();
        let expected: Vec<&str> = catalog.rules().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, expected);
        assert_eq!(report.categories.len(), 6);
        assert!(!report.partial);
        assert_eq!(report.target, "https://www.example.com/en/products.html");
    }

    #[tokio::test]
    async fn scores_stay_in_range() {
        let report = run_compliance(load_fixture("document.fixture.json"), builtin())
            .await
            .expect("run");
        for category in &report.categories {
            assert!((0.0..=100.0).contains(&category.score), "{category:?}");
        }
        let overall = report.overall_score.expect("overall");
        assert!((0.0..=100.0).contains(&overall));
        assert!(overall < 100.0);
    }

    #[tokio::test]
    async fn runs_are_idempotent() {
        let catalog = builtin();
        let doc = load_fixture("document.fixture.json");
        let engine = Engine::new(catalog);
        let a = engine.run(Arc::clone(&doc)).await.expect("first run");
        let b = engine.run(doc).await.expect("second run");

        assert_eq!(a.checks, b.checks);
        assert_eq!(a.categories, b.categories);
        assert_eq!(a.overall_score, b.overall_score);
        assert_eq!(a.fingerprint, b.fingerprint);
    }

    #[tokio::test]
    async fn zero_images_scores_full_with_low_confidence() {
        let config = RuleCatalogConfig::default().only(&["alt_text"], &builtin_rule_ids());
        let catalog = Arc::new(load_catalog(&config).expect("catalog"));
        let mut doc = NormalizedDocument::new("https://example.com/");
        doc.images = Some(vec![]);

        let report = run_compliance(Arc::new(doc), catalog).await.expect("run");
        let accessibility = report
            .category(Category::Accessibility)
            .expect("accessibility score");
        assert_eq!(accessibility.score, 100.0);
        assert!(accessibility.low_confidence);
    }

    #[tokio::test]
    async fn weighted_accessibility_score() {
        let config = RuleCatalogConfig::default()
            .only(&["alt_text", "heading_hierarchy"], &builtin_rule_ids())
            .with_rule_weight("alt_text", 60.0)
            .with_rule_weight("heading_hierarchy", 40.0);
        let catalog = Arc::new(load_catalog(&config).expect("catalog"));
        let mut doc = NormalizedDocument::new("https://example.com/");
        doc.images = Some(vec![Image {
            src: "/hero.jpg".into(),
            ..Image::default()
        }]);
        doc.headings = Some(vec![pagegrade_shared::Heading {
            level: 1,
            text: "Home".into(),
        }]);

        let report = run_compliance(Arc::new(doc), catalog).await.expect("run");
        let accessibility = report
            .category(Category::Accessibility)
            .expect("accessibility score");
        assert!((accessibility.score - 40.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn missing_title_and_canonical() {
        let mut doc = NormalizedDocument::new("https://example.com/");
        let mut head = HeadInfo::default();
        head.meta.insert("description".into(), "A page".into());
        doc.head = Some(head);

        let engine = Engine::new(builtin()).with_options(RunOptions::only([Category::Seo]));
        let report = engine.run(Arc::new(doc)).await.expect("run");

        let fails: Vec<(&str, Severity)> = report
            .checks_for(Category::Seo)
            .filter(|c| c.status == CheckStatus::Fail)
            .map(|c| (c.rule_id.as_str(), c.severity))
            .collect();
        assert_eq!(
            fails,
            vec![("title_tag", Severity::High), ("canonical_url", Severity::Medium)]
        );

        // title 0.30 + canonical 0.15 fail, description 0.25 passes, h1 n/a.
        let seo = report.category(Category::Seo).expect("seo score");
        assert!((seo.score - 100.0 * 0.25 / 0.70).abs() < 1e-9, "seo was {}", seo.score);
        assert_eq!(report.categories.len(), 1);
        let overall = report.overall_score.expect("overall");
        assert!((overall - seo.score).abs() < 1e-9);
    }

    #[tokio::test]
    async fn failing_evaluator_yields_partial_report() {
        let doc = load_fixture("document.fixture.json");
        let healthy = Engine::new(builtin()).run(Arc::clone(&doc)).await.expect("run");

        let engine = Engine::new(builtin())
            .with_registry(EvaluatorRegistry::new().with_evaluator(Arc::new(Broken)));
        let report = engine.run(doc).await.expect("partial report, not an error");

        assert!(report.partial);
        assert!(report.category(Category::Security).is_none());
        assert_eq!(report.checks_for(Category::Security).count(), 0);
        assert_eq!(report.evaluator_errors.len(), 1);
        assert_eq!(report.evaluator_errors[0].category, Category::Security);
        assert!(report.evaluator_errors[0].message.contains("unreadable headers"));

        for category in &report.categories {
            assert_eq!(
                Some(category),
                healthy.category(category.category),
                "{} changed",
                category.category
            );
        }
        assert!(report.overall_score.is_some());
    }

    #[tokio::test]
    async fn panicking_evaluator_is_contained() {
        let engine = Engine::new(builtin())
            .with_registry(EvaluatorRegistry::new().with_evaluator(Arc::new(Panicking)));
        let report = engine
            .run(load_fixture("document.fixture.json"))
            .await
            .expect("partial report");

        assert!(report.partial);
        assert!(report.category(Category::Performance).is_none());
        assert!(report.evaluator_errors[0].message.contains("evaluator exploded"));
        assert_eq!(report.categories.len(), 5);
    }

    #[tokio::test]
    async fn slow_run_times_out() {
        let engine = Engine::new(builtin())
            .with_registry(EvaluatorRegistry::new().with_evaluator(Arc::new(Slow)))
            .with_timeout(Duration::from_millis(20));
        let err = engine
            .run(Arc::new(NormalizedDocument::new("https://example.com/")))
            .await
            .unwrap_err();
        assert!(matches!(err, GradeError::Timeout { .. }));
    }

    #[tokio::test]
    async fn category_selection_limits_checks() {
        let engine = Engine::new(builtin())
            .with_options(RunOptions::only([Category::Security, Category::Accessibility]));
        let report = engine
            .run(load_fixture("document.fixture.json"))
            .await
            .expect("run");

        let categories: Vec<Category> = report.categories.iter().map(|c| c.category).collect();
        assert_eq!(categories, vec![Category::Accessibility, Category::Security]);
        assert!(report.checks.iter().all(|c| matches!(
            c.category,
            Category::Accessibility | Category::Security
        )));
        assert!(!report.partial);
    }

    #[test]
    fn engine_limits_come_from_config() {
        let config = EngineConfig {
            timeout_ms: 1500,
            max_concurrent_checks: 0,
            ..EngineConfig::default()
        };
        let engine = Engine::from_config(builtin(), &config);
        assert_eq!(engine.timeout(), Duration::from_millis(1500));
        assert_eq!(engine.max_concurrent, 1);
    }
}
