//! CLI command definitions, routing, and tracing setup.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use pagegrade_catalog::{RuleCatalog, load_catalog};
use pagegrade_core::{BatchSummary, Engine, ProgressReporter, RunOptions};
use pagegrade_export::{ExportFormat, export_to_dir};
use pagegrade_shared::{
    AppConfig, Category, ComplianceReport, NormalizedDocument, init_config, load_config,
    load_config_from,
};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// PageGrade: compliance scoring for rendered pages.
#[derive(Parser)]
#[command(
    name = "pagegrade",
    version,
    about = "Score page documents for accessibility, SEO, performance, security, content, and AEM practices.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file to use instead of ~/.pagegrade/pagegrade.toml.
    #[arg(long, env = "PAGEGRADE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Options shared by `check` and `batch`.
#[derive(clap::Args, Debug)]
pub(crate) struct RunArgs {
    /// Output format: json, csv, or csv-summary. Without it a text summary is printed.
    #[arg(short, long)]
    pub format: Option<ExportFormat>,

    /// Write a timestamped report file instead of printing.
    #[arg(long)]
    pub export: bool,

    /// Export directory (implies --export). Defaults to `export.output_dir`.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Only evaluate these categories (comma-separated).
    #[arg(long = "category", value_delimiter = ',')]
    pub categories: Vec<Category>,

    /// Deadline per document in milliseconds. Defaults to `engine.timeout_ms`.
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Check one page document.
    Check {
        /// Normalized document (JSON).
        doc: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Check many page documents and summarize.
    Batch {
        /// Normalized documents (JSON).
        #[arg(required = true)]
        docs: Vec<PathBuf>,

        #[command(flatten)]
        run: RunArgs,

        /// Passing score. Defaults to `engine.compliance_threshold`.
        #[arg(long)]
        threshold: Option<f64>,

        /// Print the batch summary as JSON.
        #[arg(long)]
        summary_json: bool,
    },

    /// List the rules in the resolved catalog.
    Catalog {
        /// Print rules as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so reports
/// printed to stdout stay machine-readable.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "pagegrade=info",
        1 => "pagegrade=debug",
        _ => "pagegrade=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Check { doc, run } => cmd_check(config_path, &doc, &run).await,
        Command::Batch {
            docs,
            run,
            threshold,
            summary_json,
        } => cmd_batch(config_path, &docs, &run, threshold, summary_json).await,
        Command::Catalog { json } => cmd_catalog(config_path, json),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

fn build_engine(config: &AppConfig, run: &RunArgs) -> Result<Engine> {
    let catalog = load_catalog(&config.catalog).wrap_err("invalid rule catalog")?;
    let mut engine = Engine::from_config(Arc::new(catalog), &config.engine);
    if let Some(ms) = run.timeout_ms {
        engine = engine.with_timeout(Duration::from_millis(ms));
    }
    if !run.categories.is_empty() {
        engine = engine.with_options(RunOptions::only(run.categories.iter().copied()));
    }
    Ok(engine)
}

fn load_document(path: &Path) -> Result<Arc<NormalizedDocument>> {
    let doc = NormalizedDocument::from_json_file(path)
        .wrap_err_with(|| format!("cannot load document '{}'", path.display()))?;
    Ok(Arc::new(doc))
}

/// Print, export, or summarize reports according to the run flags.
/// Returns `true` when a text summary should follow.
fn emit_reports(config: &AppConfig, run: &RunArgs, reports: &[ComplianceReport]) -> Result<bool> {
    if run.export || run.out.is_some() {
        let format = run.format.unwrap_or(if config.export.detailed {
            ExportFormat::Csv
        } else {
            ExportFormat::CsvSummary
        });
        let dir = run
            .out
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.export.output_dir));
        let file = export_to_dir(format.exporter().as_ref(), reports, &dir)?;
        println!();
        println!("  Report exported!");
        println!("  Path:   {}", file.path.display());
        println!("  Format: {}", file.format);
        println!("  Size:   {} bytes", file.size_bytes);
        println!("  SHA256: {}", file.sha256);
        return Ok(true);
    }

    match run.format {
        Some(format) => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            format.exporter().export(reports, &mut out)?;
            Ok(false)
        }
        None => Ok(true),
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_check(config_path: Option<&Path>, doc: &Path, run: &RunArgs) -> Result<()> {
    let config = resolve_config(config_path)?;
    let engine = build_engine(&config, run)?;
    let document = load_document(doc)?;

    info!(
        doc = %doc.display(),
        page = %document.target,
        title = document.display_title(),
        catalog = engine.catalog().version(),
        "checking page"
    );

    let report = engine.run(document).await?;
    if emit_reports(&config, run, std::slice::from_ref(&report))? {
        print_report(&report)?;
    }
    Ok(())
}

async fn cmd_batch(
    config_path: Option<&Path>,
    docs: &[PathBuf],
    run: &RunArgs,
    threshold: Option<f64>,
    summary_json: bool,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let engine = build_engine(&config, run)?;
    let documents = docs
        .iter()
        .map(|p| load_document(p))
        .collect::<Result<Vec<_>>>()?;

    info!(
        pages = documents.len(),
        catalog = engine.catalog().version(),
        "checking pages"
    );
    let reporter = CliProgress::new();
    let outcomes = engine.run_batch(documents, &reporter).await;

    for outcome in &outcomes {
        if let Err(e) = &outcome.result {
            warn!(page = %outcome.target, error = %e, "page check failed");
            eprintln!("  {}: {e}", outcome.target);
        }
    }

    let threshold = threshold.unwrap_or(config.engine.compliance_threshold);
    let summary = BatchSummary::from_outcomes(&outcomes, threshold);
    let reports: Vec<ComplianceReport> = outcomes
        .into_iter()
        .filter_map(|o| o.result.ok())
        .collect();

    let show_text = emit_reports(&config, run, &reports)?;
    if summary_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if show_text {
        print_summary(&summary);
    }

    if reports.is_empty() && !docs.is_empty() {
        return Err(eyre!("no page produced a report"));
    }
    Ok(())
}

fn cmd_catalog(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = resolve_config(config_path)?;
    let catalog = load_catalog(&config.catalog)?;

    if json {
        println!("{}", serde_json::to_string_pretty(catalog.rules())?);
        return Ok(());
    }

    print_catalog(&catalog);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Text output
// ---------------------------------------------------------------------------

fn print_report(report: &ComplianceReport) -> Result<()> {
    let mut out = std::io::stdout().lock();
    ignore_broken_pipe(write_report(&mut out, report)).wrap_err("cannot write report")
}

/// A closed pipe (`pagegrade check ... | head`) ends output quietly.
fn ignore_broken_pipe(result: std::io::Result<()>) -> std::io::Result<()> {
    match result {
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

fn write_report(out: &mut impl Write, report: &ComplianceReport) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "  {}", report.target)?;
    match (report.overall_score, report.grade) {
        (Some(score), Some(grade)) => writeln!(out, "  Score:  {score:.1} ({grade})")?,
        _ => writeln!(out, "  Score:  n/a")?,
    }
    writeln!(
        out,
        "  Issues: {} ({} high, {} medium, {} low)",
        report.issues.total(),
        report.issues.high,
        report.issues.medium,
        report.issues.low
    )?;
    if report.partial {
        writeln!(out, "  Partial: evaluator failures below")?;
    }
    writeln!(out)?;

    for category in &report.categories {
        let note = if category.low_confidence {
            "  (no applicable checks)"
        } else {
            ""
        };
        writeln!(out, "  {:<26} {:>5.1}{note}", category.name, category.score)?;
    }
    for failure in &report.evaluator_errors {
        writeln!(out, "  {:<26} error: {}", failure.category.display_name(), failure.message)?;
    }

    let issues = report.top_issues(10);
    if !issues.is_empty() {
        writeln!(out)?;
        writeln!(out, "  Top issues:")?;
        for check in issues {
            writeln!(
                out,
                "  [{}] {} ({}): {}",
                check.severity, check.rule_id, check.status, check.message
            )?;
        }
    }
    writeln!(out)
}

fn print_summary(summary: &BatchSummary) {
    println!();
    println!("  Batch complete!");
    println!("  Pages:     {}", summary.total_pages);
    if summary.errored > 0 {
        println!("  Errored:   {}", summary.errored);
    }
    match summary.average_score {
        Some(avg) => println!("  Average:   {avg:.1}"),
        None => println!("  Average:   n/a"),
    }
    println!(
        "  Passed:    {} of {} at >= {:.0} ({:.1}%)",
        summary.passed,
        summary.total_pages,
        summary.threshold,
        summary.pass_rate()
    );
    println!("  Partial:   {}", summary.partial);
    println!(
        "  Issues:    {} ({} high, {} medium, {} low)",
        summary.issues.total(),
        summary.issues.high,
        summary.issues.medium,
        summary.issues.low
    );
    let grades: Vec<String> = summary
        .grade_distribution
        .iter()
        .map(|(grade, count)| format!("{grade}={count}"))
        .collect();
    if !grades.is_empty() {
        println!("  Grades:    {}", grades.join(" "));
    }
    println!();
}

fn print_catalog(catalog: &RuleCatalog) {
    println!("  Catalog {} ({} rules)", catalog.version(), catalog.len());
    for category in Category::ALL {
        let rules = catalog.rules_for(category);
        println!();
        println!(
            "  {} [{:.0}%]",
            category.display_name(),
            catalog.category_weight(category) * 100.0
        );
        for rule in rules {
            println!(
                "    {:<22} {:<7} {:>5.2}  {}",
                rule.id, rule.severity, rule.weight, rule.name
            );
        }
    }
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Batch progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn started(&self, total: usize) {
        self.spinner.set_message(format!("Checking {total} pages"));
    }

    fn document_done(&self, target: &str, current: usize, total: usize, ok: bool) {
        let mark = if ok { "ok" } else { "failed" };
        self.spinner
            .set_message(format!("Checked [{current}/{total}] {target} ({mark})"));
    }

    fn finished(&self, _succeeded: usize, _total: usize) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::{Error, ErrorKind};

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn check_parses_formats_and_categories() {
        let cli = Cli::try_parse_from([
            "pagegrade",
            "check",
            "page.json",
            "--format",
            "csv-summary",
            "--category",
            "seo,best-practices",
        ])
        .expect("parse");

        match cli.command {
            Command::Check { doc, run } => {
                assert_eq!(doc, PathBuf::from("page.json"));
                assert_eq!(run.format, Some(ExportFormat::CsvSummary));
                assert_eq!(run.categories, vec![Category::Seo, Category::BestPractices]);
                assert!(!run.export);
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn batch_requires_documents() {
        assert!(Cli::try_parse_from(["pagegrade", "batch"]).is_err());
    }

    #[test]
    fn unknown_category_is_rejected() {
        assert!(Cli::try_parse_from(["pagegrade", "check", "p.json", "--category", "speed"]).is_err());
    }

    #[tokio::test]
    async fn report_text_lists_scores_and_issues() {
        let doc = NormalizedDocument::new("https://www.example.com/");
        let catalog = Arc::new(RuleCatalog::builtin().expect("builtin"));
        let report = pagegrade_core::run_compliance(Arc::new(doc), catalog)
            .await
            .expect("report");

        let mut buf = Vec::new();
        write_report(&mut buf, &report).expect("write");
        let text = String::from_utf8(buf).expect("utf-8");
        assert!(text.contains("https://www.example.com/"));
        assert!(text.contains("Accessibility Compliance"));
        assert!(text.contains("(no applicable checks)"));
    }

    /// Fails every write with the given error kind.
    struct FailingWriter(ErrorKind);

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(Error::from(self.0))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    async fn sample_report() -> ComplianceReport {
        let doc = NormalizedDocument::new("https://www.example.com/");
        let catalog = Arc::new(RuleCatalog::builtin().expect("builtin"));
        pagegrade_core::run_compliance(Arc::new(doc), catalog)
            .await
            .expect("report")
    }

    #[tokio::test]
    async fn broken_pipe_is_ignored() {
        let report = sample_report().await;
        let result = write_report(&mut FailingWriter(ErrorKind::BrokenPipe), &report);
        assert!(result.is_err());
        assert!(ignore_broken_pipe(result).is_ok());
    }

    #[tokio::test]
    async fn other_write_errors_propagate() {
        let report = sample_report().await;
        let result = write_report(&mut FailingWriter(ErrorKind::PermissionDenied), &report);
        let err = ignore_broken_pipe(result).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }
}
