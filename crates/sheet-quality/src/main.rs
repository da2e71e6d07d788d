//! CLI entry point for the spreadsheet data quality checker.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use sheet_quality::{
    ClosureProgressReporter, FixKind, FixOutcome, MemorySheet, ProgressReporter, QualityConfig,
    QualitySession, RangeAddress, ReportGenerator, ScanReport, ScanResult, Severity, SeverityCounts,
    SeverityFilter,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// CLI-compatible severity enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliSeverity {
    Error,
    Warning,
    Info,
}

impl From<CliSeverity> for Severity {
    fn from(cli: CliSeverity) -> Self {
        match cli {
            CliSeverity::Error => Severity::Error,
            CliSeverity::Warning => Severity::Warning,
            CliSeverity::Info => Severity::Info,
        }
    }
}

/// CLI-compatible fix action kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CliFixKind {
    /// Clear later occurrences of a duplicated value
    RemoveDuplicates,
    /// Select the affected cells
    HighlightOnly,
    /// Convert cells to one representation or spelling
    StandardizeFormat,
    /// Move to the first affected cell
    GoToCell,
}

impl From<CliFixKind> for FixKind {
    fn from(cli: CliFixKind) -> Self {
        match cli {
            CliFixKind::RemoveDuplicates => FixKind::RemoveDuplicates,
            CliFixKind::HighlightOnly => FixKind::HighlightOnly,
            CliFixKind::StandardizeFormat => FixKind::StandardizeFormat,
            CliFixKind::GoToCell => FixKind::GoToCell,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Spreadsheet data quality checker with reversible fixes",
    long_about = "Scans a CSV file as a spreadsheet (row 1 is the header) for duplicate values,\n\
                  missing values, mixed formats, inconsistent casing and numeric outliers.\n\n\
                  EXAMPLES:\n  \
                  # Scan the whole file\n  \
                  sheet-quality -i orders.csv\n\n  \
                  # Only warnings and errors, as JSON\n  \
                  sheet-quality -i orders.csv --min-severity warning --json\n\n  \
                  # Apply the first fix of an issue and save the result\n  \
                  sheet-quality -i orders.csv --fix issue-0002 --yes -o fixed.csv"
)]
struct Args {
    /// Path to the CSV file to check
    #[arg(short, long)]
    input: String,

    /// Sheet name to load the file as (defaults to the file name)
    #[arg(long)]
    sheet: Option<String>,

    /// Range to scan in A1 notation, e.g. `A1:D200` (defaults to the used range)
    #[arg(long)]
    range: Option<String>,

    /// Show only issues of exactly this severity
    #[arg(long, value_enum, conflicts_with = "min_severity")]
    severity: Option<CliSeverity>,

    /// Show issues of this severity or worse
    #[arg(long, value_enum)]
    min_severity: Option<CliSeverity>,

    /// Rows per read chunk and cancellation checkpoint
    #[arg(long, default_value = "1000")]
    chunk_rows: usize,

    /// Standard deviations beyond which a number is an outlier
    #[arg(long, default_value = "3.0")]
    outlier_sigma: f64,

    /// Apply a fix for this issue id (e.g. `issue-0001`)
    #[arg(long)]
    fix: Option<String>,

    /// Which of the issue's fix actions to run (defaults to the first)
    #[arg(long, value_enum, requires = "fix")]
    action: Option<CliFixKind>,

    /// Confirm fixes that remove data
    #[arg(short, long)]
    yes: bool,

    /// Write the (possibly fixed) sheet to this CSV file
    #[arg(short, long)]
    output: Option<String>,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    /// Useful for piping to other tools: `... --json | jq .counts_by_severity`
    #[arg(long)]
    json: bool,

    /// Write a JSON report to the report directory
    ///
    /// The report will be saved as <input_name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Directory for JSON reports
    #[arg(long, default_value = "./outputs")]
    report_dir: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    info!("Loading sheet from: {}", args.input);
    let data = load_csv_with_fallbacks(&args.input)?;
    info!("Loaded {} rows x {} columns", data.height(), data.width());

    let sheet_name = args
        .sheet
        .clone()
        .unwrap_or_else(|| extract_file_stem(&args.input));
    let sheet = Arc::new(MemorySheet::from_dataframe(sheet_name.clone(), &data)?);

    let config = QualityConfig::builder()
        .chunk_rows(args.chunk_rows)
        .outlier_sigma(args.outlier_sigma)
        .build()?;
    let session = QualitySession::new(sheet.clone(), config)?;

    let range = match &args.range {
        Some(text) => {
            let mut range = RangeAddress::parse(text)?;
            if range.sheet.is_none() {
                range.sheet = Some(sheet_name.clone());
            }
            range
        }
        None => match sheet.used_range(Some(&sheet_name))? {
            Some(range) => range,
            None => {
                warn!("Sheet '{}' is empty, nothing to scan", sheet_name);
                return Ok(());
            }
        },
    };

    let scan = run_scan(&session, &range, &args)?;

    if let Some(issue_id) = &args.fix {
        run_fix(&session, &scan, issue_id, &args)?;
    }

    if let Some(output) = &args.output {
        write_sheet_csv(&sheet, &sheet_name, output)?;
    }

    handle_scan_output(&session, &scan, &args)
}

/// Scan the range, logging progress unless quiet.
fn run_scan(session: &QualitySession, range: &RangeAddress, args: &Args) -> Result<ScanResult> {
    info!("{}", "=".repeat(80));
    info!("Scanning {}...", range);
    info!("{}", "=".repeat(80));

    let reporter = ClosureProgressReporter::new(|update| {
        debug!(
            "[{:.0}%] {}: {}",
            update.progress * 100.0,
            update.stage.display_name(),
            update.message
        );
    });

    let progress: Option<&dyn ProgressReporter> = if args.quiet {
        None
    } else {
        Some(&reporter)
    };

    session
        .scan(range, progress, None)
        .map_err(|e| {
            error!("Scan failed: {}", e);
            anyhow!("Scan failed: {}", e)
        })
}

/// Run one fix action for `issue_id`.
fn run_fix(session: &QualitySession, scan: &ScanResult, issue_id: &str, args: &Args) -> Result<()> {
    let issue = scan
        .issue(issue_id)
        .ok_or_else(|| anyhow!("No issue with id '{}'", issue_id))?;
    let actions = session.resolve_fix_actions(issue);

    let action = match args.action {
        Some(kind) => {
            let kind = FixKind::from(kind);
            actions.iter().find(|a| a.kind == kind).ok_or_else(|| {
                anyhow!(
                    "Issue '{}' has no '{}' action (available: {})",
                    issue_id,
                    kind.slug(),
                    actions
                        .iter()
                        .map(|a| a.kind.slug())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })?
        }
        None => actions
            .first()
            .ok_or_else(|| anyhow!("Issue '{}' has no fix actions", issue_id))?,
    };

    if action.requires_confirmation && !args.yes {
        return Err(anyhow!(
            "'{}' removes data; re-run with --yes to confirm",
            action.label
        ));
    }

    match session.execute_fix(action)? {
        FixOutcome::Applied { entry } => info!(
            "Applied {} ({} cell(s) changed): {}",
            entry.id, entry.cells_changed, entry.description
        ),
        FixOutcome::Highlighted { cells } => info!("Highlighted {} cell(s)", cells),
        FixOutcome::Navigated { cell } => info!("Go to {}", cell),
    }
    Ok(())
}

/// Handle scan output based on CLI flags.
///
/// Output behavior:
/// - Default: Print human-readable summary to stdout
/// - `--json`: Print JSON to stdout only (no logs)
/// - `--emit-report`: Write JSON report to file
fn handle_scan_output(session: &QualitySession, scan: &ScanResult, args: &Args) -> Result<()> {
    let filter = match (args.severity, args.min_severity) {
        (Some(s), _) => SeverityFilter::Only(s.into()),
        (None, Some(s)) => SeverityFilter::AtLeast(s.into()),
        (None, None) => SeverityFilter::All,
    };
    let issues = session.filter_and_sort(&scan.issues, filter);
    let shown = ScanResult {
        counts_by_severity: SeverityCounts::from_issues(&issues),
        issues,
        ..scan.clone()
    };

    let report =
        ScanReport::from_scan(&shown, Some(&args.input)).with_applied_fixes(session.get_history());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if args.emit_report {
        let generator = ReportGenerator::new(PathBuf::from(&args.report_dir));
        let report_path = generator.write_report_to_file(&report, &extract_file_stem(&args.input))?;
        info!("Report written to: {}", report_path.display());
    }

    println!();
    println!("{}", "=".repeat(80));
    print!("{}", report.render_text());
    println!("{}", "=".repeat(80));
    if !report.is_clean() && args.fix.is_none() {
        println!("Use --fix <ISSUE_ID> to apply a fix");
    }
    println!("Use --json for machine-readable output");
    Ok(())
}

/// Export the sheet back to CSV, header first.
fn write_sheet_csv(sheet: &MemorySheet, sheet_name: &str, path: &str) -> Result<()> {
    let mut df = sheet.to_dataframe(Some(sheet_name))?;
    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;
    info!("Sheet saved: {}", path);
    Ok(())
}

/// Extract the file stem (name without extension) from a path.
fn extract_file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Sheet1")
        .to_string()
}

/// Load CSV with multiple fallback strategies
fn load_csv_with_fallbacks(path: &str) -> Result<DataFrame> {
    // Strategy 1: Standard loading with quote handling
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Standard loading failed: {}", e);
        }
    }

    // Strategy 2: Every column as text
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(0))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Loading as text failed: {}", e);
        }
    }

    // Strategy 3: Pre-clean content
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cleaned = clean_csv_content(&content);
            let cursor = std::io::Cursor::new(cleaned);

            CsvReadOptions::default()
                .with_infer_schema_length(Some(100))
                .with_has_header(true)
                .into_reader_with_file_handle(cursor)
                .finish()
                .map_err(|e| e.into())
        }
        Err(e) => {
            error!("Could not read file: {}", e);
            Err(e.into())
        }
    }
}

/// Clean CSV content: collapse doubled quotes and drop blank lines.
fn clean_csv_content(content: &str) -> String {
    content
        .replace("\"\"\"", "\"")
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
