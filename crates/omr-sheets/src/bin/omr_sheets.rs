//! `omr-sheets` command-line tool.

use clap::{Args, Parser, Subcommand};
use omr_sheets::core::Verbosity;
use omr_sheets::io::{self, OmrIoError};
use omr_sheets::layout::{GridConfig, SheetLayout};
use omr_sheets::{discover_sheets, run_batch, BatchConfig, SheetReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

type CliError = Box<dyn std::error::Error>;

/// Configuration problems stop the run before any sheet is read.
enum Failure {
    Config(CliError),
    Runtime(CliError),
}

fn config_err(err: impl Into<CliError>) -> Failure {
    Failure::Config(err.into())
}

fn runtime_err(err: impl Into<CliError>) -> Failure {
    Failure::Runtime(err.into())
}

#[derive(Parser)]
#[command(name = "omr-sheets")]
#[command(about = "Read and grade scanned multiple-choice answer sheets")]
#[command(version)]
struct Cli {
    /// Log debug details.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read every sheet in a folder and write the answer table.
    Scan(ScanArgs),
    /// Print the bubble sample points of a grid configuration as JSON.
    Points {
        /// Grid configuration written by the grid setup tool.
        #[arg(long, default_value = "grid_config.json")]
        config: PathBuf,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// Folder with scanned sheets (png, jpg, jpeg).
    folder: PathBuf,

    /// Grid configuration written by the grid setup tool.
    #[arg(long, default_value = "grid_config.json")]
    config: PathBuf,

    /// Run tunables (JSON); flags below override it.
    #[arg(long)]
    batch_config: Option<PathBuf>,

    /// Answer key: JSON object or two-column CSV/TSV table.
    #[arg(long)]
    key: Option<PathBuf>,

    /// Scoring weights override (JSON with correct/incorrect/unanswered).
    #[arg(long)]
    scoring: Option<PathBuf>,

    /// Minimum ink pixel count for a bubble to count as marked.
    #[arg(long)]
    min_fill: Option<u32>,

    /// Answer table output.
    #[arg(long, default_value = "results.csv")]
    csv: PathBuf,

    /// Grade table output; written when a key is given.
    #[arg(long, default_value = "grades.csv")]
    grades: PathBuf,

    /// Failed-sheet list output.
    #[arg(long, default_value = "failures.csv")]
    failures: PathBuf,

    /// Full JSON report output.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Folder for annotated sheets and failed marker searches.
    #[arg(long)]
    debug_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match cli.command {
        Commands::Scan(args) => run_scan(&args),
        Commands::Points { config } => run_points(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(Failure::Config(err)) => {
            eprintln!("configuration error: {err}");
            ExitCode::from(2)
        }
        Err(Failure::Runtime(err)) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let verbosity = Verbosity::from_flags(cli.verbose, cli.quiet);
    #[cfg(feature = "tracing")]
    {
        omr_sheets::core::init_tracing(verbosity, false);
    }
    #[cfg(not(feature = "tracing"))]
    {
        if let Err(err) = omr_sheets::core::init_with_level(verbosity.level()) {
            eprintln!("logger already installed: {err}");
        }
    }
}

fn load_layout(path: &Path) -> Result<SheetLayout, Failure> {
    let grid = GridConfig::load_json(path).map_err(|e| {
        config_err(format!("cannot read grid configuration {}: {e}", path.display()))
    })?;
    SheetLayout::from_config(&grid).map_err(config_err)
}

fn run_points(config: &Path) -> Result<(), Failure> {
    let layout = load_layout(config)?;
    let json = serde_json::to_string_pretty(&layout.sample_points()).map_err(runtime_err)?;
    println!("{json}");
    Ok(())
}

fn run_scan(args: &ScanArgs) -> Result<(), Failure> {
    let layout = load_layout(&args.config)?;

    let mut batch = match &args.batch_config {
        Some(path) => BatchConfig::load_json(path).map_err(config_err)?,
        None => BatchConfig::default(),
    };
    if let Some(min_fill) = args.min_fill {
        batch.min_fill = min_fill;
    }
    if let Some(path) = &args.scoring {
        batch.scoring = io::load_scoring_policy(path).map_err(config_err)?;
    }
    let key = args
        .key
        .as_ref()
        .map(|path| io::load_answer_key(path))
        .transpose()
        .map_err(config_err)?;

    let paths = discover_sheets(&args.folder).map_err(|e| {
        runtime_err(format!("cannot list {}: {e}", args.folder.display()))
    })?;
    if paths.is_empty() {
        log::warn!("no png/jpg/jpeg sheets in {}", args.folder.display());
    }
    if let Some(dir) = &args.debug_dir {
        std::fs::create_dir_all(dir).map_err(runtime_err)?;
    }

    let reader = SheetReader::new(layout, &batch);
    let outcome = run_batch(
        &paths,
        &reader,
        key.as_ref(),
        &batch.scoring,
        args.debug_dir.as_deref(),
    );

    write_outputs(args, &outcome, key.is_some()).map_err(runtime_err)?;

    println!(
        "read {} sheet(s), {} failed; answers saved to {}",
        outcome.sheets.len(),
        outcome.failures.len(),
        args.csv.display()
    );
    for failure in &outcome.failures {
        println!("  failed: {}: {}", failure.file, failure.reason);
    }
    Ok(())
}

fn write_outputs(
    args: &ScanArgs,
    outcome: &omr_sheets::BatchOutcome,
    graded: bool,
) -> Result<(), OmrIoError> {
    io::write_table(&args.csv, outcome, io::write_answer_csv)?;
    if graded {
        io::write_table(&args.grades, outcome, io::write_grade_csv)?;
    }
    if !outcome.failures.is_empty() {
        io::write_table(&args.failures, outcome, io::write_failures_csv)?;
    }
    if let Some(path) = &args.report {
        io::write_report_json(path, outcome)?;
    }
    Ok(())
}
