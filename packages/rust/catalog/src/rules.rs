//! Built-in rule definitions.
//!
//! [`CheckKind`] is the closed set of evaluation predicates the engine knows.
//! A kind's category is fixed here, so a rule can never belong to two
//! categories or to none.

use std::fmt;

use serde::{Deserialize, Serialize};

use pagegrade_shared::{Category, Severity};

/// Every predicate an evaluator can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    // Accessibility
    AltText,
    HeadingHierarchy,
    AriaLabels,
    LanguageAttribute,
    // SEO
    TitleTag,
    MetaDescription,
    H1Tag,
    CanonicalUrl,
    // Performance
    ScriptAsync,
    LazyLoading,
    ResourceHints,
    // Security
    Csp,
    ExternalLinks,
    HttpsResources,
    // Content quality
    BrokenLinks,
    EmptyLinks,
    DuplicateContent,
    ContentStructure,
    // Best practices
    ComponentStructure,
    Clientlibs,
    ResponsiveGrid,
}

impl CheckKind {
    /// Stable rule id.
    pub fn id(self) -> &'static str {
        match self {
            Self::AltText => "alt_text",
            Self::HeadingHierarchy => "heading_hierarchy",
            Self::AriaLabels => "aria_labels",
            Self::LanguageAttribute => "language_attribute",
            Self::TitleTag => "title_tag",
            Self::MetaDescription => "meta_description",
            Self::H1Tag => "h1_tag",
            Self::CanonicalUrl => "canonical_url",
            Self::ScriptAsync => "script_async",
            Self::LazyLoading => "lazy_loading",
            Self::ResourceHints => "resource_hints",
            Self::Csp => "csp",
            Self::ExternalLinks => "external_links",
            Self::HttpsResources => "https_resources",
            Self::BrokenLinks => "broken_links",
            Self::EmptyLinks => "empty_links",
            Self::DuplicateContent => "duplicate_content",
            Self::ContentStructure => "content_structure",
            Self::ComponentStructure => "component_structure",
            Self::Clientlibs => "clientlibs",
            Self::ResponsiveGrid => "responsive_grid",
        }
    }

    /// The one category this predicate belongs to.
    pub fn category(self) -> Category {
        match self {
            Self::AltText | Self::HeadingHierarchy | Self::AriaLabels | Self::LanguageAttribute => {
                Category::Accessibility
            }
            Self::TitleTag | Self::MetaDescription | Self::H1Tag | Self::CanonicalUrl => {
                Category::Seo
            }
            Self::ScriptAsync | Self::LazyLoading | Self::ResourceHints => Category::Performance,
            Self::Csp | Self::ExternalLinks | Self::HttpsResources => Category::Security,
            Self::BrokenLinks | Self::EmptyLinks | Self::DuplicateContent | Self::ContentStructure => {
                Category::ContentQuality
            }
            Self::ComponentStructure | Self::Clientlibs | Self::ResponsiveGrid => {
                Category::BestPractices
            }
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Static description of a built-in rule.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinRule {
    pub kind: CheckKind,
    pub severity: Severity,
    /// Default category-relative weight.
    pub weight: f64,
    pub name: &'static str,
    pub description: &'static str,
    pub remediation: &'static str,
}

/// The built-in catalog, grouped by category in catalog order.
pub const BUILTIN_RULES: &[BuiltinRule] = &[
    // --- Accessibility ---
    BuiltinRule {
        kind: CheckKind::AltText,
        severity: Severity::High,
        weight: 0.30,
        name: "Image Alt Text",
        description: "All images must have descriptive alt text",
        remediation: "Add a non-empty alt attribute describing each image; use alt=\"\" only with role=\"presentation\" on purely decorative images",
    },
    BuiltinRule {
        kind: CheckKind::HeadingHierarchy,
        severity: Severity::High,
        weight: 0.25,
        name: "Heading Hierarchy",
        description: "Headings must not skip levels (h1, h2, h3, ...)",
        remediation: "Insert the missing intermediate heading level or demote the skipped heading",
    },
    BuiltinRule {
        kind: CheckKind::AriaLabels,
        severity: Severity::Medium,
        weight: 0.20,
        name: "Accessible Link Names",
        description: "Interactive elements must expose an accessible name",
        remediation: "Give each link visible text or an aria-label",
    },
    BuiltinRule {
        kind: CheckKind::LanguageAttribute,
        severity: Severity::Medium,
        weight: 0.15,
        name: "Language Tag",
        description: "The html element must declare a lang attribute",
        remediation: "Set lang on the html element, e.g. <html lang=\"en\">",
    },
    // --- SEO ---
    BuiltinRule {
        kind: CheckKind::TitleTag,
        severity: Severity::High,
        weight: 0.30,
        name: "Title Tag",
        description: "Page must have a descriptive title under 60 characters",
        remediation: "Add a unique <title> of at most 60 characters",
    },
    BuiltinRule {
        kind: CheckKind::MetaDescription,
        severity: Severity::Medium,
        weight: 0.25,
        name: "Meta Description",
        description: "Page should have a meta description under 160 characters",
        remediation: "Add <meta name=\"description\"> with a summary of at most 160 characters",
    },
    BuiltinRule {
        kind: CheckKind::H1Tag,
        severity: Severity::Medium,
        weight: 0.20,
        name: "H1 Tag",
        description: "Page should have exactly one H1",
        remediation: "Keep a single h1 for the page topic and demote the others",
    },
    BuiltinRule {
        kind: CheckKind::CanonicalUrl,
        severity: Severity::Medium,
        weight: 0.15,
        name: "Canonical URL",
        description: "Page should declare a canonical URL",
        remediation: "Add <link rel=\"canonical\" href=\"...\"> pointing at the preferred URL",
    },
    // --- Performance ---
    BuiltinRule {
        kind: CheckKind::ScriptAsync,
        severity: Severity::Medium,
        weight: 0.30,
        name: "Async Scripts",
        description: "Scripts above the fold should not block parsing",
        remediation: "Load external scripts with async or defer, or move them to the end of the body",
    },
    BuiltinRule {
        kind: CheckKind::LazyLoading,
        severity: Severity::Medium,
        weight: 0.25,
        name: "Lazy Loading",
        description: "Images below the fold should use lazy loading",
        remediation: "Add loading=\"lazy\" to images outside the initial viewport",
    },
    BuiltinRule {
        kind: CheckKind::ResourceHints,
        severity: Severity::Low,
        weight: 0.15,
        name: "Resource Hints",
        description: "Critical resources should be announced with preload or prefetch",
        remediation: "Add <link rel=\"preload\"> or <link rel=\"preconnect\"> for critical origins and assets",
    },
    // --- Security ---
    BuiltinRule {
        kind: CheckKind::Csp,
        severity: Severity::High,
        weight: 0.30,
        name: "Content Security Policy",
        description: "Page must define a Content-Security-Policy",
        remediation: "Send a Content-Security-Policy header or add the equivalent http-equiv meta tag",
    },
    BuiltinRule {
        kind: CheckKind::ExternalLinks,
        severity: Severity::Medium,
        weight: 0.25,
        name: "External Links Security",
        description: "External links must carry rel=\"noopener noreferrer\"",
        remediation: "Add rel=\"noopener noreferrer\" to links pointing at other origins",
    },
    BuiltinRule {
        kind: CheckKind::HttpsResources,
        severity: Severity::High,
        weight: 0.15,
        name: "HTTPS Resources",
        description: "An HTTPS page must not load resources over plain HTTP",
        remediation: "Serve every image, script, and stylesheet over https",
    },
    // --- Content quality ---
    BuiltinRule {
        kind: CheckKind::BrokenLinks,
        severity: Severity::Medium,
        weight: 0.30,
        name: "Broken Links",
        description: "Links must not point at broken targets",
        remediation: "Fix or remove links whose targets no longer resolve",
    },
    BuiltinRule {
        kind: CheckKind::EmptyLinks,
        severity: Severity::Low,
        weight: 0.20,
        name: "Empty Links",
        description: "Links must not have an empty or placeholder href",
        remediation: "Point each link at a real destination or use a button for scripted actions",
    },
    BuiltinRule {
        kind: CheckKind::DuplicateContent,
        severity: Severity::Low,
        weight: 0.20,
        name: "Duplicate Content",
        description: "Avoid repeated text blocks",
        remediation: "Remove or consolidate repeated paragraphs",
    },
    BuiltinRule {
        kind: CheckKind::ContentStructure,
        severity: Severity::Low,
        weight: 0.10,
        name: "Content Structure",
        description: "Content should use semantic landmarks, including main",
        remediation: "Wrap the primary content in <main> and use nav, header, and footer landmarks",
    },
    // --- Best practices ---
    BuiltinRule {
        kind: CheckKind::ComponentStructure,
        severity: Severity::Low,
        weight: 0.30,
        name: "Component Structure",
        description: "Component markup must carry the cmp- structural wrapper class",
        remediation: "Render components through their HTL templates so the cmp-<name> wrapper class is emitted",
    },
    BuiltinRule {
        kind: CheckKind::Clientlibs,
        severity: Severity::Medium,
        weight: 0.25,
        name: "Client Libraries",
        description: "Client libraries must be included by category through /etc.clientlibs",
        remediation: "Include client libraries with data-sly-call clientlib by category instead of direct /apps or /libs paths",
    },
    BuiltinRule {
        kind: CheckKind::ResponsiveGrid,
        severity: Severity::Low,
        weight: 0.15,
        name: "Responsive Grid",
        description: "Pages with components should use the responsive grid",
        remediation: "Place components inside a layout container so aem-Grid classes are applied",
    },
];
