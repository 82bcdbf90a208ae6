//! Compliance engine for PageGrade.
//!
//! This crate ties the catalog and the evaluators together:
//! - [`engine`]: concurrent per-category fan-out with a deadline ([`run_compliance`])
//! - [`aggregate`]: category scores, weighted overall score, grade
//! - [`report`]: report assembly and fingerprinting
//! - [`batch`]: many documents under a concurrency bound
//! - [`summary`]: statistics over a batch

pub mod aggregate;
pub mod batch;
pub mod engine;
pub mod report;
pub mod summary;

pub use aggregate::{Aggregation, aggregate, score_category};
pub use batch::{BatchOutcome, ProgressReporter, SilentProgress};
pub use engine::{DEFAULT_MAX_CONCURRENT, DEFAULT_TIMEOUT, Engine, RunOptions, run_compliance};
pub use report::{ReportBuilder, fingerprint};
pub use summary::BatchSummary;
