//! Rule catalog: the versioned set of checks the engine runs.
//!
//! This crate provides:
//! - [`rules`]: the closed [`CheckKind`] set and the built-in definitions
//! - [`RuleDefinition`]: one rule as loaded (overrides applied)
//! - [`load_catalog`]: validate a [`RuleCatalogConfig`] into an immutable [`RuleCatalog`]
//!
//! The catalog is built once at startup and shared read-only afterwards.
//! Loading is pure: the same config always yields the same catalog.

pub mod rules;

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::{debug, instrument};

use pagegrade_shared::{Category, GradeError, Result, RuleCatalogConfig, Severity};

pub use rules::{BUILTIN_RULES, BuiltinRule, CheckKind};

/// Tolerance when checking that category weights sum to 100%.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

// ---------------------------------------------------------------------------
// RuleDefinition
// ---------------------------------------------------------------------------

/// A single check as it exists in a loaded catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleDefinition {
    /// Unique rule id.
    pub id: String,
    /// Evaluation predicate.
    pub kind: CheckKind,
    pub category: Category,
    pub severity: Severity,
    /// Category-relative weight (strictly positive).
    pub weight: f64,
    pub name: String,
    pub description: String,
    /// Remediation hint attached to failing results.
    pub remediation: String,
}

impl RuleDefinition {
    fn from_builtin(rule: &BuiltinRule) -> Self {
        Self {
            id: rule.kind.id().to_string(),
            kind: rule.kind,
            category: rule.kind.category(),
            severity: rule.severity,
            weight: rule.weight,
            name: rule.name.to_string(),
            description: rule.description.to_string(),
            remediation: rule.remediation.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// RuleCatalog
// ---------------------------------------------------------------------------

/// Immutable, validated rule catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleCatalog {
    version: String,
    /// Enabled rules in catalog order.
    rules: Vec<RuleDefinition>,
    /// Category weights as fractions of 1.0.
    category_weights: BTreeMap<Category, f64>,
}

impl RuleCatalog {
    /// The built-in catalog with the documented weights.
    pub fn builtin() -> Result<Self> {
        load_catalog(&RuleCatalogConfig::default())
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// All enabled rules in catalog order.
    pub fn rules(&self) -> &[RuleDefinition] {
        &self.rules
    }

    /// Enabled rules of one category, in catalog order.
    pub fn rules_for(&self, category: Category) -> Vec<RuleDefinition> {
        self.rules
            .iter()
            .filter(|r| r.category == category)
            .cloned()
            .collect()
    }

    /// Look up a rule by id.
    pub fn rule(&self, id: &str) -> Option<&RuleDefinition> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Weight of a category as a fraction of 1.0.
    pub fn category_weight(&self, category: Category) -> f64 {
        self.category_weights.get(&category).copied().unwrap_or(0.0)
    }

    /// Total number of enabled checks.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// All built-in rule ids, in catalog order.
pub fn builtin_rule_ids() -> Vec<&'static str> {
    BUILTIN_RULES.iter().map(|r| r.kind.id()).collect()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Validate a catalog config and build the catalog.
///
/// Fails with [`GradeError::Config`] when a category weight is missing,
/// negative, or non-finite, when the weights do not sum to 100, when an
/// override names an unknown rule, or when a rule weight is not positive.
#[instrument(skip_all, fields(version = %config.version))]
pub fn load_catalog(config: &RuleCatalogConfig) -> Result<RuleCatalog> {
    let category_weights = validate_category_weights(&config.category_weights)?;

    let known: HashSet<&str> = BUILTIN_RULES.iter().map(|r| r.kind.id()).collect();
    if let Some(unknown) = config.rules.keys().find(|id| !known.contains(id.as_str())) {
        return Err(GradeError::config(format!(
            "override for unknown rule '{unknown}'"
        )));
    }

    let mut rules = Vec::with_capacity(BUILTIN_RULES.len());
    for builtin in BUILTIN_RULES {
        let mut rule = RuleDefinition::from_builtin(builtin);

        if let Some(over) = config.rules.get(&rule.id) {
            if over.enabled == Some(false) {
                debug!(rule = %rule.id, "rule disabled by config");
                continue;
            }
            if let Some(weight) = over.weight {
                rule.weight = weight;
            }
            if let Some(severity) = over.severity {
                rule.severity = severity;
            }
        }

        if !rule.weight.is_finite() || rule.weight <= 0.0 {
            return Err(GradeError::config(format!(
                "rule '{}' has weight {}; rule weights must be positive",
                rule.id, rule.weight
            )));
        }

        rules.push(rule);
    }

    debug!(rules = rules.len(), "rule catalog loaded");

    Ok(RuleCatalog {
        version: config.version.clone(),
        rules,
        category_weights,
    })
}

/// Parse and check the percent weights, returning fractions of 1.0.
fn validate_category_weights(raw: &BTreeMap<String, f64>) -> Result<BTreeMap<Category, f64>> {
    let mut parsed = BTreeMap::new();
    for (key, &percent) in raw {
        let category: Category = key.parse().map_err(GradeError::config)?;
        if !percent.is_finite() || percent < 0.0 {
            return Err(GradeError::config(format!(
                "category '{category}' has weight {percent}; weights must be non-negative"
            )));
        }
        if parsed.insert(category, percent).is_some() {
            return Err(GradeError::config(format!(
                "category '{category}' is weighted twice"
            )));
        }
    }

    let missing: Vec<&str> = Category::ALL
        .iter()
        .filter(|c| !parsed.contains_key(c))
        .map(|c| c.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(GradeError::config(format!(
            "missing category weights: {}",
            missing.join(", ")
        )));
    }

    let sum: f64 = parsed.values().sum();
    if (sum - 100.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(GradeError::config(format!(
            "category weights sum to {sum}, expected 100"
        )));
    }

    Ok(parsed
        .into_iter()
        .map(|(category, percent)| (category, percent / 100.0))
        .collect())
}
