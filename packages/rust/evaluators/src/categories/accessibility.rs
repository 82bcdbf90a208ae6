//! Accessibility evaluator.
//!
//! Alt text, heading order, accessible link names, and the document
//! language. The language check lives here only; content quality does not
//! repeat it.

use pagegrade_catalog::{CheckKind, RuleDefinition};
use pagegrade_shared::{Category, CheckResult, EvaluatorError, NormalizedDocument, Severity};

use super::{
    Evaluator, ensure_category, evidence, fail, is_blank, mismatch, not_applicable, partial, pass,
    quote, validate_heading_levels,
};

/// Evaluates [`Category::Accessibility`] rules.
pub struct AccessibilityEvaluator;

impl Evaluator for AccessibilityEvaluator {
    fn category(&self) -> Category {
        Category::Accessibility
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
                CheckKind::AltText => Ok(alt_text(doc, rule)),
                CheckKind::HeadingHierarchy => heading_hierarchy(doc, rule),
                CheckKind::AriaLabels => Ok(aria_labels(doc, rule)),
                CheckKind::LanguageAttribute => Ok(language_attribute(doc, rule)),
                _ => Err(mismatch(self.category(), rule)),
            })
            .collect()
    }
}

fn alt_text(doc: &NormalizedDocument, rule: &RuleDefinition) -> CheckResult {
    let Some(images) = &doc.images else {
        return not_applicable(rule, "image data not supplied");
    };
    if images.is_empty() {
        return not_applicable(rule, "page has no images");
    }

    let missing: Vec<_> = images
        .iter()
        .filter(|img| is_blank(img.alt.as_deref()))
        .collect();

    if missing.is_empty() {
        return pass(rule, format!("all {} images have alt text", images.len()));
    }

    // Decorative-only failures are less severe than missing content alt text.
    let severity = if missing.iter().all(|img| img.decorative) {
        rule.severity.min(Severity::Medium)
    } else {
        rule.severity
    };

    fail(
        rule,
        format!("{} of {} images lack alt text", missing.len(), images.len()),
    )
    .with_severity(severity)
    .with_evidence(evidence(
        missing.iter().map(|img| format!("img[src={}]", quote(&img.src))),
    ))
}

fn heading_hierarchy(
    doc: &NormalizedDocument,
    rule: &RuleDefinition,
) -> Result<CheckResult, EvaluatorError> {
    let Some(headings) = &doc.headings else {
        return Ok(not_applicable(rule, "heading data not supplied"));
    };
    validate_heading_levels(headings)?;
    if headings.is_empty() {
        return Ok(not_applicable(rule, "page has no headings"));
    }

    let mut skips = Vec::new();
    let mut previous: Option<u8> = None;
    for heading in headings {
        if let Some(prev) = previous {
            if heading.level > prev + 1 {
                skips.push(format!(
                    "h{prev} -> h{} {}",
                    heading.level,
                    quote(&heading.text)
                ));
            }
        }
        previous = Some(heading.level);
    }

    if skips.is_empty() {
        Ok(pass(
            rule,
            format!("{} headings in sequential order", headings.len()),
        ))
    } else {
        Ok(partial(rule, format!("heading levels skipped {} time(s)", skips.len()))
            .with_evidence(evidence(skips)))
    }
}

fn aria_labels(doc: &NormalizedDocument, rule: &RuleDefinition) -> CheckResult {
    let Some(links) = &doc.links else {
        return not_applicable(rule, "link data not supplied");
    };
    if links.is_empty() {
        return not_applicable(rule, "page has no links");
    }

    let unnamed: Vec<_> = links
        .iter()
        .filter(|l| is_blank(l.text.as_deref()) && is_blank(l.aria_label.as_deref()))
        .collect();

    if unnamed.is_empty() {
        pass(rule, format!("all {} links have an accessible name", links.len()))
    } else {
        fail(
            rule,
            format!("{} link(s) have no text or aria-label", unnamed.len()),
        )
        .with_evidence(evidence(
            unnamed.iter().map(|l| format!("a[href={}]", quote(&l.href))),
        ))
    }
}

fn language_attribute(doc: &NormalizedDocument, rule: &RuleDefinition) -> CheckResult {
    let Some(root) = &doc.root else {
        return not_applicable(rule, "root element data not supplied");
    };

    match root.lang.as_deref().map(str::trim) {
        Some(lang) if !lang.is_empty() => pass(rule, format!("document language is '{lang}'")),
        _ => fail(rule, "html element has no lang attribute").with_evidence("html"),
    }
}
