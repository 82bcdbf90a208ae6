//! Content quality evaluator.
//!
//! Broken and empty links, repeated text blocks, and landmark structure.
//! Broken-link data comes from an external link checker; this evaluator only
//! matches hrefs against the set it was given.

use std::collections::HashMap;

use pagegrade_catalog::{CheckKind, RuleDefinition};
use pagegrade_shared::{Category, CheckResult, EvaluatorError, NormalizedDocument};

use super::{
    Evaluator, ensure_category, evidence, fail, mismatch, not_applicable, partial, pass, quote,
};

/// Paragraphs shorter than this are too generic to count as duplicates.
const MIN_DUPLICATE_CHARS: usize = 40;

/// Evaluates [`Category::ContentQuality`] rules.
pub struct ContentQualityEvaluator;

impl Evaluator for ContentQualityEvaluator {
    fn category(&self) -> Category {
        Category::ContentQuality
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
                CheckKind::BrokenLinks => Ok(broken_links(doc, rule)),
                CheckKind::EmptyLinks => Ok(empty_links(doc, rule)),
                CheckKind::DuplicateContent => Ok(duplicate_content(doc, rule)),
                CheckKind::ContentStructure => Ok(content_structure(doc, rule)),
                _ => Err(mismatch(self.category(), rule)),
            })
            .collect()
    }
}

fn broken_links(doc: &NormalizedDocument, rule: &RuleDefinition) -> CheckResult {
    let Some(broken) = &doc.broken_links else {
        return not_applicable(rule, "no link check data supplied");
    };
    let Some(links) = &doc.links else {
        return not_applicable(rule, "link data not supplied");
    };
    if links.is_empty() {
        return not_applicable(rule, "page has no links");
    }

    let hits: Vec<_> = links
        .iter()
        .filter(|link| {
            broken.contains(link.href.trim())
                || doc
                    .resolve(&link.href)
                    .is_some_and(|url| broken.contains(url.as_str()))
        })
        .collect();

    if hits.is_empty() {
        pass(rule, format!("none of {} links are broken", links.len()))
    } else {
        fail(rule, format!("{} broken link(s)", hits.len())).with_evidence(evidence(
            hits.iter().map(|l| format!("a[href={}]", quote(&l.href))),
        ))
    }
}

fn empty_links(doc: &NormalizedDocument, rule: &RuleDefinition) -> CheckResult {
    let Some(links) = &doc.links else {
        return not_applicable(rule, "link data not supplied");
    };
    if links.is_empty() {
        return not_applicable(rule, "page has no links");
    }

    let empty = links
        .iter()
        .filter(|l| matches!(l.href.trim(), "" | "#"))
        .count();

    if empty == 0 {
        pass(rule, "every link has a destination")
    } else {
        fail(rule, format!("{empty} link(s) have an empty or '#' href"))
            .with_evidence("a[href=\"\"], a[href=\"#\"]")
    }
}

fn duplicate_content(doc: &NormalizedDocument, rule: &RuleDefinition) -> CheckResult {
    let Some(paragraphs) = &doc.paragraphs else {
        return not_applicable(rule, "paragraph data not supplied");
    };

    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut order = Vec::new();
    for text in paragraphs {
        let normalized = normalize(text);
        if normalized.chars().count() < MIN_DUPLICATE_CHARS {
            continue;
        }
        let count = seen.entry(normalized.clone()).or_insert(0);
        if *count == 0 {
            order.push(normalized);
        }
        *count += 1;
    }

    if seen.is_empty() {
        return not_applicable(rule, "no substantial text blocks");
    }

    let repeated: Vec<String> = order
        .into_iter()
        .filter_map(|text| {
            let count = seen.get(&text).copied().unwrap_or(0);
            (count > 1).then(|| format!("p {} x{count}", quote(&text)))
        })
        .collect();

    if repeated.is_empty() {
        pass(rule, format!("{} text blocks, all distinct", seen.len()))
    } else {
        fail(
            rule,
            format!("{} text block(s) repeated on the page", repeated.len()),
        )
        .with_evidence(evidence(repeated))
    }
}

/// Collapse whitespace and case so trivially different copies compare equal.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn content_structure(doc: &NormalizedDocument, rule: &RuleDefinition) -> CheckResult {
    let Some(landmarks) = &doc.landmarks else {
        return not_applicable(rule, "landmark data not supplied");
    };

    if landmarks.iter().any(|l| l.trim().eq_ignore_ascii_case("main")) {
        pass(rule, format!("{} landmarks including main", landmarks.len()))
    } else if landmarks.is_empty() {
        fail(rule, "page uses no semantic landmarks").with_evidence("main")
    } else {
        partial(
            rule,
            format!("landmarks present ({}) but no main", landmarks.join(", ")),
        )
        .with_evidence("main")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::categories::test_support::result_for;
    use pagegrade_shared::{CheckStatus, Link};

    fn links(hrefs: &[&str]) -> Option<Vec<Link>> {
        Some(
            hrefs
                .iter()
                .map(|h| Link {
                    href: (*h).into(),
                    text: Some("link".into()),
                    ..Link::default()
                })
                .collect(),
        )
    }

    #[test]
    fn broken_links_need_checker_data() {
        let mut doc = NormalizedDocument::new("https://www.example.com/en.html");
        doc.links = links(&["/en/old.html", "/en/new.html"]);
        assert_eq!(
            result_for(&ContentQualityEvaluator, &doc, "broken_links").status,
            CheckStatus::NotApplicable
        );

        doc.broken_links = Some(BTreeSet::from([
            "https://www.example.com/en/old.html".to_string(),
        ]));
        let r = result_for(&ContentQualityEvaluator, &doc, "broken_links");
        assert_eq!(r.status, CheckStatus::Fail);
        assert_eq!(r.evidence.as_deref(), Some("a[href=\"/en/old.html\"]"));

        doc.broken_links = Some(BTreeSet::new());
        assert_eq!(
            result_for(&ContentQualityEvaluator, &doc, "broken_links").status,
            CheckStatus::Pass
        );
    }

    #[test]
    fn placeholder_hrefs_are_empty_links() {
        let mut doc = NormalizedDocument::new("https://www.example.com/");
        doc.links = links(&["#", " ", "/ok", "#section"]);
        let r = result_for(&ContentQualityEvaluator, &doc, "empty_links");
        assert_eq!(r.status, CheckStatus::Fail);
        assert!(r.message.starts_with("2 link(s)"));
    }

    #[test]
    fn repeated_paragraph_fails() {
        let block = "Our products are built to last and backed by a lifetime warranty.";
        let mut doc = NormalizedDocument::new("https://www.example.com/");
        doc.paragraphs = Some(vec![
            block.to_string(),
            "Short".to_string(),
            "Short".to_string(),
            format!("  {}  ", block.to_uppercase()),
        ]);
        let r = result_for(&ContentQualityEvaluator, &doc, "duplicate_content");
        assert_eq!(r.status, CheckStatus::Fail);
        assert!(r.evidence.as_deref().unwrap_or_default().ends_with("x2"));
    }

    #[test]
    fn short_paragraphs_only_is_not_applicable() {
        let mut doc = NormalizedDocument::new("https://www.example.com/");
        doc.paragraphs = Some(vec!["Hi".into(), "Hi".into()]);
        assert_eq!(
            result_for(&ContentQualityEvaluator, &doc, "duplicate_content").status,
            CheckStatus::NotApplicable
        );
    }

    #[test]
    fn landmark_structure() {
        let mut doc = NormalizedDocument::new("https://www.example.com/");
        doc.landmarks = Some(vec![]);
        assert_eq!(
            result_for(&ContentQualityEvaluator, &doc, "content_structure").status,
            CheckStatus::Fail
        );

        doc.landmarks = Some(vec!["nav".into(), "footer".into()]);
        assert_eq!(
            result_for(&ContentQualityEvaluator, &doc, "content_structure").status,
            CheckStatus::Partial
        );

        doc.landmarks = Some(vec!["header".into(), "main".into()]);
        assert_eq!(
            result_for(&ContentQualityEvaluator, &doc, "content_structure").status,
            CheckStatus::Pass
        );
    }
}
