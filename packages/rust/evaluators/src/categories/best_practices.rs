//! Platform best-practice evaluator.
//!
//! Checks conventions of the component-based CMS the pages are rendered by:
//! component wrapper classes, client library proxying, and the responsive
//! layout grid.

use pagegrade_catalog::{CheckKind, RuleDefinition};
use pagegrade_shared::{Category, CheckResult, Component, EvaluatorError, NormalizedDocument};

use super::{Evaluator, ensure_category, evidence, fail, mismatch, not_applicable, pass, quote};

const COMPONENT_CLASS_PREFIX: &str = "cmp-";
const GRID_CLASS_PREFIX: &str = "aem-Grid";
const CLIENTLIB_MARKER: &str = "clientlib";
const CLIENTLIB_PROXY_PREFIX: &str = "/etc.clientlibs/";

/// Evaluates [`Category::BestPractices`] rules.
pub struct BestPracticesEvaluator;

impl Evaluator for BestPracticesEvaluator {
    fn category(&self) -> Category {
        Category::BestPractices
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
                CheckKind::ComponentStructure => Ok(component_structure(doc, rule)),
                CheckKind::Clientlibs => Ok(clientlibs(doc, rule)),
                CheckKind::ResponsiveGrid => Ok(responsive_grid(doc, rule)),
                _ => Err(mismatch(self.category(), rule)),
            })
            .collect()
    }
}

fn is_grid(component: &Component) -> bool {
    component
        .classes
        .iter()
        .any(|c| c.starts_with(GRID_CLASS_PREFIX))
}

fn component_label(component: &Component) -> String {
    match &component.resource_type {
        Some(rt) => format!("[data-resource-type={}]", quote(rt)),
        None => format!("[class={}]", quote(&component.classes.join(" "))),
    }
}

fn component_structure(doc: &NormalizedDocument, rule: &RuleDefinition) -> CheckResult {
    let Some(components) = &doc.components else {
        return not_applicable(rule, "component data not supplied");
    };

    let content: Vec<_> = components.iter().filter(|c| !is_grid(c)).collect();
    if content.is_empty() {
        return not_applicable(rule, "page has no content components");
    }

    let bare: Vec<_> = content
        .iter()
        .filter(|c| !c.classes.iter().any(|cls| cls.starts_with(COMPONENT_CLASS_PREFIX)))
        .collect();

    if bare.is_empty() {
        pass(
            rule,
            format!("all {} components carry a cmp- class", content.len()),
        )
    } else {
        fail(
            rule,
            format!(
                "{} of {} components lack a cmp- wrapper class",
                bare.len(),
                content.len()
            ),
        )
        .with_evidence(evidence(bare.iter().map(|c| component_label(c))))
    }
}

fn clientlibs(doc: &NormalizedDocument, rule: &RuleDefinition) -> CheckResult {
    if doc.scripts.is_none() && doc.stylesheets.is_none() {
        return not_applicable(rule, "script and stylesheet data not supplied");
    }

    let script_refs = doc
        .scripts
        .iter()
        .flatten()
        .filter_map(|s| s.src.as_deref());
    let style_refs = doc.stylesheets.iter().flatten().map(|s| s.href.as_str());

    let refs: Vec<&str> = script_refs
        .chain(style_refs)
        .filter(|href| href.contains(CLIENTLIB_MARKER))
        .collect();

    if refs.is_empty() {
        return not_applicable(rule, "page references no client libraries");
    }

    let direct: Vec<&str> = refs
        .iter()
        .copied()
        .filter(|href| !request_path(doc, href).starts_with(CLIENTLIB_PROXY_PREFIX))
        .collect();

    if direct.is_empty() {
        pass(
            rule,
            format!("all {} client libraries are proxied", refs.len()),
        )
    } else {
        fail(
            rule,
            format!(
                "{} client librar{} not served through {CLIENTLIB_PROXY_PREFIX}",
                direct.len(),
                if direct.len() == 1 { "y is" } else { "ies are" }
            ),
        )
        .with_evidence(evidence(direct.iter().map(|href| quote(href))))
    }
}

/// The path part of a reference, whether it is absolute or site-relative.
fn request_path(doc: &NormalizedDocument, href: &str) -> String {
    match doc.resolve(href) {
        Some(url) => url.path().to_string(),
        None => href.split(['?', '#']).next().unwrap_or_default().to_string(),
    }
}

fn responsive_grid(doc: &NormalizedDocument, rule: &RuleDefinition) -> CheckResult {
    let Some(components) = &doc.components else {
        return not_applicable(rule, "component data not supplied");
    };
    if components.is_empty() {
        return not_applicable(rule, "page has no components");
    }

    if components.iter().any(is_grid) {
        pass(rule, "responsive grid in use")
    } else {
        fail(rule, "no responsive grid container found").with_evidence("div.aem-Grid")
    }
}
