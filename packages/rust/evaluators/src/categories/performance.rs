//! Performance evaluator: render-blocking scripts, lazy images, resource hints.

use pagegrade_catalog::{CheckKind, RuleDefinition};
use pagegrade_shared::{Category, CheckResult, EvaluatorError, NormalizedDocument};

use super::{Evaluator, ensure_category, evidence, fail, mismatch, not_applicable, partial, pass, quote};

/// `rel` values that count as resource hints.
const HINT_RELS: &[&str] = &[
    "preload",
    "prefetch",
    "preconnect",
    "dns-prefetch",
    "modulepreload",
];

/// Evaluates [`Category::Performance`] rules.
pub struct PerformanceEvaluator;

impl Evaluator for PerformanceEvaluator {
    fn category(&self) -> Category {
        Category::Performance
    }

    fn evaluate(
        &self,
        doc: &NormalizedDocument,
        rules: &[RuleDefinition],
    ) -> Result<Vec<CheckResult>, EvaluatorError> {
        ensure_category(self.category(), rules)?;

        rules
            .iter()
            .map(|rule| match rule.kind {
                CheckKind::ScriptAsync => Ok(script_async(doc, rule)),
                CheckKind::LazyLoading => Ok(lazy_loading(doc, rule)),
                CheckKind::ResourceHints => Ok(resource_hints(doc, rule)),
                _ => Err(mismatch(self.category(), rule)),
            })
            .collect()
    }
}

fn script_async(doc: &NormalizedDocument, rule: &RuleDefinition) -> CheckResult {
    let Some(scripts) = &doc.scripts else {
        return not_applicable(rule, "script data not supplied");
    };

    let external: Vec<_> = scripts.iter().filter(|s| s.src.is_some()).collect();
    if external.is_empty() {
        return not_applicable(rule, "page loads no external scripts");
    }

    let blocking: Vec<&str> = external
        .iter()
        .filter(|s| s.above_fold && s.is_blocking())
        .filter_map(|s| s.src.as_deref())
        .collect();

    if blocking.is_empty() {
        pass(
            rule,
            format!("{} external scripts, none render-blocking", external.len()),
        )
    } else {
        fail(
            rule,
            format!("{} render-blocking script(s) above the fold", blocking.len()),
        )
        .with_evidence(evidence(
            blocking.iter().map(|src| format!("script[src={}]", quote(src))),
        ))
    }
}

fn lazy_loading(doc: &NormalizedDocument, rule: &RuleDefinition) -> CheckResult {
    let Some(images) = &doc.images else {
        return not_applicable(rule, "image data not supplied");
    };

    let below: Vec<_> = images.iter().filter(|img| img.below_fold).collect();
    if below.is_empty() {
        return not_applicable(rule, "no images below the fold");
    }

    let eager: Vec<_> = below
        .iter()
        .filter(|img| {
            !img.loading
                .as_deref()
                .is_some_and(|l| l.trim().eq_ignore_ascii_case("lazy"))
        })
        .collect();

    if eager.is_empty() {
        pass(
            rule,
            format!("all {} below-the-fold images load lazily", below.len()),
        )
    } else {
        partial(
            rule,
            format!(
                "{} of {} below-the-fold images load eagerly",
                eager.len(),
                below.len()
            ),
        )
        .with_evidence(evidence(
            eager.iter().map(|img| format!("img[src={}]", quote(&img.src))),
        ))
    }
}

fn resource_hints(doc: &NormalizedDocument, rule: &RuleDefinition) -> CheckResult {
    let Some(head) = &doc.head else {
        return not_applicable(rule, "head data not supplied");
    };

    let hints = head
        .resource_hints
        .iter()
        .filter(|h| HINT_RELS.iter().any(|rel| h.rel.eq_ignore_ascii_case(rel)))
        .count();

    if hints > 0 {
        pass(rule, format!("{hints} resource hint(s) declared"))
    } else {
        fail(rule, "no preload, prefetch, or preconnect hints declared")
            .with_evidence("head > link[rel]")
    }
}
