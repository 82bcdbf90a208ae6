//! The normalized page document handed to the engine.
//!
//! Parsing HTML is the job of an upstream collaborator; this module only
//! defines the shape it produces. Every structure is optional: `None` means
//! the collaborator did not supply that data, `Some(empty)` means it did and
//! the page simply has none. Checks treat the first as not-applicable and
//! never as a failure.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{GradeError, Result};

/// Immutable, already-parsed view of one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedDocument {
    /// URL or content path of the page.
    pub target: String,

    /// Raw markup, kept for downstream consumers. Never parsed here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_html: Option<String>,

    /// The `<html>` element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<RootElement>,

    /// Data extracted from `<head>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<HeadInfo>,

    /// Response headers (lowercased names).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,

    /// Headings in document order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headings: Option<Vec<Heading>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<Image>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripts: Option<Vec<Script>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stylesheets: Option<Vec<Stylesheet>>,

    /// Text of each paragraph-level block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraphs: Option<Vec<String>>,

    /// Semantic landmark element names present on the page (`main`, `nav`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmarks: Option<Vec<String>>,

    /// Platform component root elements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<Component>>,

    /// Link targets an external link checker reported as broken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broken_links: Option<BTreeSet<String>>,
}

/// The root `<html>` element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RootElement {
    /// Value of the `lang` attribute, if any.
    #[serde(default)]
    pub lang: Option<String>,
}

/// Data extracted from the document `<head>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadInfo {
    /// Text of `<title>`, if the element exists.
    #[serde(default)]
    pub title: Option<String>,
    /// `<meta>` tags keyed by lowercased `name` or `http-equiv`.
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
    /// `href` of `<link rel="canonical">`.
    #[serde(default)]
    pub canonical: Option<String>,
    /// `<link rel="preload|prefetch|preconnect|dns-prefetch">` entries.
    #[serde(default)]
    pub resource_hints: Vec<ResourceHint>,
}

impl HeadInfo {
    /// Look up a meta tag case-insensitively.
    pub fn meta(&self, name: &str) -> Option<&str> {
        let key = name.to_ascii_lowercase();
        self.meta
            .get(&key)
            .or_else(|| {
                self.meta
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(&key))
                    .map(|(_, v)| v)
            })
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceHint {
    pub rel: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    /// 1 for `<h1>` through 6 for `<h6>`.
    pub level: u8,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub src: String,
    /// `alt` attribute; `None` when the attribute is missing.
    #[serde(default)]
    pub alt: Option<String>,
    /// Presentational image (`role="presentation"`, outside content regions).
    #[serde(default)]
    pub decorative: bool,
    /// Rendered below the initial viewport.
    #[serde(default)]
    pub below_fold: bool,
    /// Value of the `loading` attribute.
    #[serde(default)]
    pub loading: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    /// Visible text content.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub aria_label: Option<String>,
    #[serde(default)]
    pub rel: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
}

impl Link {
    /// Whether `rel` contains the given token (case-insensitive).
    pub fn has_rel(&self, token: &str) -> bool {
        self.rel
            .as_deref()
            .is_some_and(|rel| rel.split_whitespace().any(|t| t.eq_ignore_ascii_case(token)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// `src` attribute; `None` for inline scripts.
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default, rename = "async")]
    pub is_async: bool,
    #[serde(default)]
    pub defer: bool,
    /// `type="module"` (deferred by default).
    #[serde(default)]
    pub module: bool,
    /// Appears before the main content (typically in `<head>`).
    #[serde(default)]
    pub above_fold: bool,
}

impl Script {
    /// An external script that blocks parsing.
    pub fn is_blocking(&self) -> bool {
        self.src.is_some() && !self.is_async && !self.defer && !self.module
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stylesheet {
    pub href: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Platform resource type (`data-cq-resource-type` or equivalent).
    #[serde(default)]
    pub resource_type: Option<String>,
    /// Classes on the component's root element.
    #[serde(default)]
    pub classes: Vec<String>,
}

impl NormalizedDocument {
    /// Create an empty document for a target (no data supplied).
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    /// Load a document serialized as JSON by the extraction collaborator.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| GradeError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| {
            GradeError::Serialization(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// The target as an absolute URL, when it is one.
    pub fn target_url(&self) -> Option<Url> {
        Url::parse(&self.target).ok()
    }

    /// Resolve an href against the target. Bare content paths have no base,
    /// so only absolute hrefs resolve for them.
    pub fn resolve(&self, href: &str) -> Option<Url> {
        match self.target_url() {
            Some(base) => base.join(href).ok(),
            None => Url::parse(href).ok(),
        }
    }

    /// Display title: `<title>` text or the target.
    pub fn display_title(&self) -> &str {
        self.head
            .as_ref()
            .and_then(|h| h.title.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.target)
    }
}
