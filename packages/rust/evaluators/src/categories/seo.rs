//! SEO evaluator: title, meta description, h1, and canonical URL.

use pagegrade_catalog::{CheckKind, RuleDefinition};
use pagegrade_shared::{Category, CheckResult, EvaluatorError, NormalizedDocument};

use super::{
    Evaluator, ensure_category, evidence, fail, is_blank, mismatch, not_applicable, partial, pass,
    quote, validate_heading_levels,
};

/// Longest title search engines show in full.
const MAX_TITLE_CHARS: usize = 60;
/// Longest meta description search engines show in full.
const MAX_DESCRIPTION_CHARS: usize = 160;

/// Evaluates [`Category::Seo`] rules.
pub struct SeoEvaluator;

impl Evaluator for SeoEvaluator {
    fn category(&self) -> Category {
        Category::Seo
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
                CheckKind::TitleTag => Ok(title_tag(doc, rule)),
                CheckKind::MetaDescription => Ok(meta_description(doc, rule)),
                CheckKind::H1Tag => h1_tag(doc, rule),
                CheckKind::CanonicalUrl => Ok(canonical_url(doc, rule)),
                _ => Err(mismatch(self.category(), rule)),
            })
            .collect()
    }
}

fn title_tag(doc: &NormalizedDocument, rule: &RuleDefinition) -> CheckResult {
    let Some(head) = &doc.head else {
        return not_applicable(rule, "head data not supplied");
    };

    match head.title.as_deref().map(str::trim) {
        Some(title) if !title.is_empty() => {
            let len = title.chars().count();
            if len > MAX_TITLE_CHARS {
                partial(
                    rule,
                    format!("title is {len} characters, longer than {MAX_TITLE_CHARS}"),
                )
                .with_evidence(format!("title {}", quote(title)))
            } else {
                pass(rule, format!("title present ({len} characters)"))
            }
        }
        _ => fail(rule, "page has no title").with_evidence("head > title"),
    }
}

fn meta_description(doc: &NormalizedDocument, rule: &RuleDefinition) -> CheckResult {
    let Some(head) = &doc.head else {
        return not_applicable(rule, "head data not supplied");
    };

    let description = head.meta("description");
    if is_blank(description) {
        return fail(rule, "page has no meta description")
            .with_evidence("meta[name=\"description\"]");
    }

    let text = description.unwrap_or_default().trim();
    let len = text.chars().count();
    if len > MAX_DESCRIPTION_CHARS {
        partial(
            rule,
            format!("meta description is {len} characters, longer than {MAX_DESCRIPTION_CHARS}"),
        )
        .with_evidence(format!("meta[name=\"description\"] {}", quote(text)))
    } else {
        pass(rule, format!("meta description present ({len} characters)"))
    }
}

fn h1_tag(doc: &NormalizedDocument, rule: &RuleDefinition) -> Result<CheckResult, EvaluatorError> {
    let Some(headings) = &doc.headings else {
        return Ok(not_applicable(rule, "heading data not supplied"));
    };
    validate_heading_levels(headings)?;

    let h1s: Vec<_> = headings.iter().filter(|h| h.level == 1).collect();
    Ok(match h1s.len() {
        0 => fail(rule, "page has no h1"),
        1 => pass(rule, "page has exactly one h1"),
        n => partial(rule, format!("page has {n} h1 elements"))
            .with_evidence(evidence(h1s.iter().map(|h| format!("h1 {}", quote(&h.text))))),
    })
}

fn canonical_url(doc: &NormalizedDocument, rule: &RuleDefinition) -> CheckResult {
    let Some(head) = &doc.head else {
        return not_applicable(rule, "head data not supplied");
    };

    match head.canonical.as_deref().map(str::trim) {
        Some(href) if !href.is_empty() => pass(rule, format!("canonical URL is {href}")),
        _ => fail(rule, "page declares no canonical URL").with_evidence("link[rel=\"canonical\"]"),
    }
}
