//! Shared types, error model, and configuration for PageGrade.
//!
//! This crate is the foundation depended on by all other PageGrade crates.
//! It provides:
//! - [`GradeError`] and [`EvaluatorError`], the error model
//! - The input document ([`NormalizedDocument`]) and its parts
//! - Result types ([`CheckResult`], [`CategoryScore`], [`ComplianceReport`])
//! - Configuration ([`AppConfig`], [`RuleCatalogConfig`], config loading)

pub mod config;
pub mod document;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, EngineConfig, ExportConfig, RuleCatalogConfig, RuleOverride, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use document::{
    Component, HeadInfo, Heading, Image, Link, NormalizedDocument, ResourceHint, RootElement,
    Script, Stylesheet,
};
pub use error::{EvaluatorError, GradeError, Result};
pub use types::{
    Category, CategoryScore, CheckResult, CheckStatus, ComplianceReport, EvaluatorFailure, Grade,
    REPORT_SCHEMA_VERSION, Severity, SeverityCounts,
};
