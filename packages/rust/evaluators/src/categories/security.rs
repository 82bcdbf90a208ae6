//! Security evaluator: CSP, external link hardening, mixed content.

use pagegrade_catalog::{CheckKind, RuleDefinition};
use pagegrade_shared::{Category, CheckResult, EvaluatorError, NormalizedDocument};

use super::{Evaluator, ensure_category, evidence, fail, mismatch, not_applicable, pass, quote};

const CSP_HEADER: &str = "content-security-policy";

/// Evaluates [`Category::Security`] rules.
pub struct SecurityEvaluator;

impl Evaluator for SecurityEvaluator {
    fn category(&self) -> Category {
        Category::Security
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
                CheckKind::Csp => Ok(csp(doc, rule)),
                CheckKind::ExternalLinks => Ok(external_links(doc, rule)),
                CheckKind::HttpsResources => Ok(https_resources(doc, rule)),
                _ => Err(mismatch(self.category(), rule)),
            })
            .collect()
    }
}

fn csp(doc: &NormalizedDocument, rule: &RuleDefinition) -> CheckResult {
    if doc.head.is_none() && doc.headers.is_none() {
        return not_applicable(rule, "neither head nor response headers supplied");
    }

    let from_header = doc.headers.as_ref().is_some_and(|headers| {
        headers
            .iter()
            .any(|(k, v)| k.eq_ignore_ascii_case(CSP_HEADER) && !v.trim().is_empty())
    });
    let from_meta = doc
        .head
        .as_ref()
        .and_then(|h| h.meta(CSP_HEADER))
        .is_some_and(|v| !v.trim().is_empty());

    match (from_header, from_meta) {
        (true, _) => pass(rule, "Content-Security-Policy sent as a response header"),
        (false, true) => pass(rule, "Content-Security-Policy declared in a meta tag"),
        (false, false) => fail(rule, "no Content-Security-Policy defined")
            .with_evidence("meta[http-equiv=\"Content-Security-Policy\"]"),
    }
}

fn external_links(doc: &NormalizedDocument, rule: &RuleDefinition) -> CheckResult {
    let Some(links) = &doc.links else {
        return not_applicable(rule, "link data not supplied");
    };

    let page_host = doc
        .target_url()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase));

    let external: Vec<_> = links
        .iter()
        .filter(|link| {
            doc.resolve(&link.href).is_some_and(|url| {
                matches!(url.scheme(), "http" | "https")
                    && url.host_str().map(str::to_ascii_lowercase) != page_host
            })
        })
        .collect();

    if external.is_empty() {
        return not_applicable(rule, "page has no external links");
    }

    let unsafe_links: Vec<_> = external
        .iter()
        .filter(|l| !(l.has_rel("noopener") && l.has_rel("noreferrer")))
        .collect();

    if unsafe_links.is_empty() {
        pass(
            rule,
            format!("all {} external links use noopener noreferrer", external.len()),
        )
    } else {
        fail(
            rule,
            format!(
                "{} of {} external links lack rel=\"noopener noreferrer\"",
                unsafe_links.len(),
                external.len()
            ),
        )
        .with_evidence(evidence(
            unsafe_links
                .iter()
                .map(|l| format!("a[href={}]", quote(&l.href))),
        ))
    }
}

fn https_resources(doc: &NormalizedDocument, rule: &RuleDefinition) -> CheckResult {
    if doc.target_url().is_none_or(|u| u.scheme() != "https") {
        return not_applicable(rule, "page is not served over https");
    }

    let mut resources: Vec<(&str, &str)> = Vec::new();
    if let Some(images) = &doc.images {
        resources.extend(images.iter().map(|i| ("img", i.src.as_str())));
    }
    if let Some(scripts) = &doc.scripts {
        resources.extend(
            scripts
                .iter()
                .filter_map(|s| s.src.as_deref())
                .map(|src| ("script", src)),
        );
    }
    if let Some(sheets) = &doc.stylesheets {
        resources.extend(sheets.iter().map(|s| ("link", s.href.as_str())));
    }
    if let Some(head) = &doc.head {
        resources.extend(head.resource_hints.iter().map(|h| ("link", h.href.as_str())));
    }

    if resources.is_empty() {
        return not_applicable(rule, "page loads no sub-resources");
    }

    let insecure: Vec<String> = resources
        .iter()
        .filter(|(_, href)| doc.resolve(href).is_some_and(|u| u.scheme() == "http"))
        .map(|(tag, href)| format!("{tag}[{}]", quote(href)))
        .collect();

    if insecure.is_empty() {
        pass(
            rule,
            format!("all {} resources load over https", resources.len()),
        )
    } else {
        fail(
            rule,
            format!("{} resource(s) load over plain http", insecure.len()),
        )
        .with_evidence(evidence(insecure))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::categories::test_support::result_for;
    use pagegrade_shared::{CheckStatus, HeadInfo, Image, Link, Script, Stylesheet};

    fn link(href: &str, rel: Option<&str>) -> Link {
        Link {
            href: href.into(),
            rel: rel.map(String::from),
            ..Link::default()
        }
    }

    #[test]
    fn csp_header_or_meta_passes() {
        let mut doc = NormalizedDocument::new("https://example.com/");
        assert_eq!(
            result_for(&SecurityEvaluator, &doc, "csp").status,
            CheckStatus::NotApplicable
        );

        doc.head = Some(HeadInfo::default());
        let r = result_for(&SecurityEvaluator, &doc, "csp");
        assert_eq!(r.status, CheckStatus::Fail);

        doc.headers = Some(BTreeMap::from([(
            "Content-Security-Policy".to_string(),
            "default-src 'self'".to_string(),
        )]));
        assert_eq!(
            result_for(&SecurityEvaluator, &doc, "csp").status,
            CheckStatus::Pass
        );

        let mut head = HeadInfo::default();
        head.meta
            .insert(CSP_HEADER.into(), "default-src 'self'".into());
        doc.headers = Some(BTreeMap::new());
        doc.head = Some(head);
        assert_eq!(
            result_for(&SecurityEvaluator, &doc, "csp").status,
            CheckStatus::Pass
        );
    }

    #[test]
    fn external_link_without_noopener_fails() {
        let mut doc = NormalizedDocument::new("https://www.example.com/en.html");
        doc.links = Some(vec![
            link("/en/about.html", None),
            link("https://WWW.example.com/en/contact.html", None),
            link("https://partner.example.org/", Some("noopener")),
            link("https://social.example.net/", Some("noopener noreferrer")),
            link("mailto:info@example.com", None),
        ]);
        let r = result_for(&SecurityEvaluator, &doc, "external_links");
        assert_eq!(r.status, CheckStatus::Fail);
        assert!(r.message.contains("1 of 2"));
        assert_eq!(
            r.evidence.as_deref(),
            Some("a[href=\"https://partner.example.org/\"]")
        );
    }

    #[test]
    fn internal_links_only_is_not_applicable() {
        let mut doc = NormalizedDocument::new("https://www.example.com/");
        doc.links = Some(vec![link("/a", None), link("#top", None)]);
        assert_eq!(
            result_for(&SecurityEvaluator, &doc, "external_links").status,
            CheckStatus::NotApplicable
        );
    }

    #[test]
    fn mixed_content_fails_on_https_page() {
        let mut doc = NormalizedDocument::new("https://www.example.com/");
        doc.images = Some(vec![Image {
            src: "http://cdn.example.com/a.png".into(),
            ..Image::default()
        }]);
        doc.scripts = Some(vec![Script {
            src: Some("/etc.clientlibs/site.js".into()),
            ..Script::default()
        }]);
        doc.stylesheets = Some(vec![Stylesheet {
            href: "//fonts.example.com/a.css".into(),
        }]);
        let r = result_for(&SecurityEvaluator, &doc, "https_resources");
        assert_eq!(r.status, CheckStatus::Fail);
        assert_eq!(
            r.evidence.as_deref(),
            Some("img[\"http://cdn.example.com/a.png\"]")
        );
    }

    #[test]
    fn http_page_is_not_applicable() {
        let mut doc = NormalizedDocument::new("http://www.example.com/");
        doc.images = Some(vec![Image {
            src: "http://cdn.example.com/a.png".into(),
            ..Image::default()
        }]);
        assert_eq!(
            result_for(&SecurityEvaluator, &doc, "https_resources").status,
            CheckStatus::NotApplicable
        );
    }
}
