//! gaze CLI - Command-line interface for gaze-flux
//!
//! Commands:
//! - ingest: Load a gaze recording and emit samples and derived metrics
//! - validate: Check a recording's columns and count rejected rows
//! - doctor: Diagnose configuration and environment
//! - schema: Print input and output schema information

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use gaze_flux::{
    derive_metrics, ingest, ingest_file, AoiHistogram, GazeDistanceSample, GazeSample,
    IngestConfig, IngestReport, IngestionController, GAZE_FLUX_VERSION, PRODUCER_NAME,
};

/// gaze - Incremental ingestion engine for eye-gaze recordings
#[derive(Parser)]
#[command(name = "gaze")]
#[command(version = GAZE_FLUX_VERSION)]
#[command(about = "Turn eye-gaze CSV exports into samples and gaze metrics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a recording and emit samples and derived metrics
    Ingest {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Rows per increment, overrides the configuration file
        #[arg(long)]
        chunk_size: Option<usize>,

        /// What to emit
        #[arg(long, default_value = "report")]
        view: View,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// Print read and transform progress to stderr
        #[arg(long)]
        progress: bool,
    },

    /// Check a recording's columns and count rejected rows
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Configuration file to check
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum View {
    /// Load summary, samples, distances and AOI histogram
    Report,
    /// Accepted samples only
    Samples,
    /// Gaze distance series only
    Distances,
    /// AOI histogram only
    Aoi,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), GazeCliError> {
    match cli.command {
        Commands::Ingest {
            input,
            output,
            config,
            chunk_size,
            view,
            output_format,
            progress,
        } => {
            let config = load_config(config.as_deref(), chunk_size)?;
            cmd_ingest(&input, &output, config, view, output_format, progress)
        }

        Commands::Validate {
            input,
            config,
            json,
        } => {
            let config = load_config(config.as_deref(), None)?;
            cmd_validate(&input, &config, json)
        }

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),

        Commands::Schema { json_schema } => cmd_schema(json_schema),
    }
}

fn cmd_ingest(
    input: &Path,
    output: &Path,
    config: IngestConfig,
    view: View,
    output_format: OutputFormat,
    progress: bool,
) -> Result<(), GazeCliError> {
    let controller = IngestionController::new(config)?;

    // Single cooperative context: increments yield to the progress printers
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let stdin_text = if is_stdio(input) {
        Some(read_stdin()?)
    } else {
        None
    };

    let report = runtime.block_on(async {
        let printers: Vec<JoinHandle<()>> = if progress {
            vec![
                spawn_progress_printer("read", controller.subscribe_read_progress(), print_line),
                spawn_progress_printer(
                    "transform",
                    controller.subscribe_transform_progress(),
                    print_line,
                ),
            ]
        } else {
            Vec::new()
        };

        let result = match &stdin_text {
            Some(text) => controller.load_text(text).await,
            None => controller.load_file(input).await,
        };

        finish_progress_printers(printers, result.is_ok()).await;

        result
    })?;

    let value = match view {
        View::Report => serde_json::to_value(IngestOutput {
            report,
            samples: controller.samples(),
            distances: controller.distances(),
            aoi_histogram: controller.aoi_histogram(),
        })?,
        View::Samples => serde_json::to_value(controller.samples())?,
        View::Distances => serde_json::to_value(controller.distances())?,
        View::Aoi => serde_json::to_value(controller.aoi_histogram())?,
    };

    let output_data = format_output(&value, &output_format)?;

    if is_stdio(output) {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_validate(input: &Path, config: &IngestConfig, json: bool) -> Result<(), GazeCliError> {
    let stdin_text = if is_stdio(input) {
        Some(read_stdin()?)
    } else {
        None
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let outcome = runtime.block_on(async {
        match &stdin_text {
            Some(text) => ingest(text, config, |_| {}).await,
            None => ingest_file(input, config, |_| {}, |_| {}).await,
        }
    })?;

    let columns = &config.columns;
    let required = columns.required();
    let missing_required: Vec<String> = outcome
        .missing_columns(&required)
        .into_iter()
        .map(String::from)
        .collect();
    let missing_optional: Vec<String> = outcome
        .missing_columns(&columns.all())
        .into_iter()
        .filter(|column| !required.contains(column))
        .map(String::from)
        .collect();

    let report = ValidationReport {
        total_rows: outcome.rows_total,
        accepted_rows: outcome.rows_accepted(),
        rejected_rows: outcome.rows_rejected,
        aoi_names: derive_metrics(&outcome.samples).aoi_histogram.len(),
        headers: outcome.headers,
        missing_required,
        missing_optional,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Columns:       {}", report.headers.join(", "));
        println!("Total rows:    {}", report.total_rows);
        println!("Accepted rows: {}", report.accepted_rows);
        println!("Rejected rows: {}", report.rejected_rows);
        println!("AOI names:     {}", report.aoi_names);

        if !report.missing_optional.is_empty() {
            println!("\nMissing optional columns (fields will be empty):");
            for column in &report.missing_optional {
                println!("  - {}", column);
            }
        }

        if !report.missing_required.is_empty() {
            println!("\nMissing coordinate columns:");
            for column in &report.missing_required {
                println!("  - {}", column);
            }
        }
    }

    if report.missing_required.is_empty() {
        Ok(())
    } else {
        Err(GazeCliError::MissingColumns(report.missing_required))
    }
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), GazeCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("gaze-flux version {}", GAZE_FLUX_VERSION),
    });

    match config {
        Some(path) if path.exists() => match fs::read_to_string(path) {
            Ok(content) => match IngestConfig::from_json(&content) {
                Ok(parsed) => checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "Config valid (chunk size {}, read timeout {})",
                        parsed.chunk_size,
                        parsed
                            .reader
                            .timeout_ms
                            .map(|ms| format!("{} ms", ms))
                            .unwrap_or_else(|| "none".to_string())
                    ),
                }),
                Err(e) => checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Invalid config: {}", e),
                }),
            },
            Err(e) => checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Cannot read config file: {}", e),
            }),
        },
        Some(_) => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Warning,
            message: "Config file does not exist".to_string(),
        }),
        None => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: "Using built-in defaults".to_string(),
        }),
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (ready for `--input -`)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: GAZE_FLUX_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("gaze Doctor Report");
        println!("==================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(GazeCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(json_schema: bool) -> Result<(), GazeCliError> {
    if json_schema {
        println!("{}", get_output_json_schema());
        return Ok(());
    }

    let columns = IngestConfig::default().columns;

    println!("Input: comma-delimited text, header row first");
    println!();
    println!("Columns (names are configurable):");
    println!("  {:<18} integer, non-numeric passes through as null", columns.timestamp);
    println!("  {:<18} text, may be empty", columns.participant);
    println!("  {:<18} number, required; rows without a finite value are dropped", columns.x);
    println!("  {:<18} number, required; rows without a finite value are dropped", columns.y);
    println!("  {:<18} integer, non-numeric passes through as null", columns.fixation_duration);
    println!("  {:<18} text, may be empty", columns.aoi_name);
    println!();
    println!("No quoting: every comma separates fields.");
    println!();
    println!("Output:");
    println!("- samples:      [{{ timestamp, participant, x, y, fixationDuration, aoiName }}]");
    println!("- distances:    [{{ timestamp, distance }}], one per consecutive sample pair");
    println!("- aoiHistogram: [{{ name, value }}] in first-occurrence order");
    println!("- report:       {{ loadId, rowsTotal, rowsAccepted, rowsRejected, ... }}");

    Ok(())
}

// Helper functions

fn load_config(
    path: Option<&Path>,
    chunk_size: Option<usize>,
) -> Result<IngestConfig, GazeCliError> {
    let mut config = match path {
        Some(path) => IngestConfig::from_json(&fs::read_to_string(path)?)?,
        None => IngestConfig::default(),
    };

    if let Some(chunk_size) = chunk_size {
        config = config.with_chunk_size(chunk_size);
    }

    config.validate()?;
    Ok(config)
}

fn is_stdio(path: &Path) -> bool {
    path.to_string_lossy() == "-"
}

fn read_stdin() -> Result<String, GazeCliError> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

fn print_line(line: String) {
    eprintln!("{}", line);
}

fn spawn_progress_printer<W>(
    label: &'static str,
    mut progress: watch::Receiver<u8>,
    mut write: W,
) -> JoinHandle<()>
where
    W: FnMut(String) + Send + 'static,
{
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let percent = *progress.borrow_and_update();
            write(format!("{}: {}%", label, percent));
            if percent >= 100 {
                break;
            }
        }
    })
}

/// Let printers drain to 100% after a completed load; drop them after a failed one
async fn finish_progress_printers(printers: Vec<JoinHandle<()>>, completed: bool) {
    for printer in printers {
        if completed {
            if let Err(e) = printer.await {
                log::warn!("progress printer stopped early: {}", e);
            }
        } else {
            printer.abort();
        }
    }
}

fn format_output(
    value: &serde_json::Value,
    format: &OutputFormat,
) -> Result<String, GazeCliError> {
    match format {
        OutputFormat::Ndjson => match value {
            serde_json::Value::Array(items) => {
                let mut lines: Vec<String> = Vec::new();
                for item in items {
                    lines.push(serde_json::to_string(item)?);
                }
                Ok(lines.join("\n") + "\n")
            }
            other => Ok(serde_json::to_string(other)? + "\n"),
        },
        OutputFormat::Json => Ok(serde_json::to_string(value)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)?),
    }
}

fn get_output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "gaze-flux ingest report",
        "type": "object",
        "required": ["report", "samples", "distances", "aoiHistogram"],
        "properties": {
            "report": {
                "type": "object",
                "properties": {
                    "loadId": { "type": "string" },
                    "generation": { "type": "integer" },
                    "startedAt": { "type": "string", "format": "date-time" },
                    "completedAt": { "type": "string", "format": "date-time" },
                    "rowsTotal": { "type": "integer" },
                    "rowsAccepted": { "type": "integer" },
                    "rowsRejected": { "type": "integer" },
                    "distances": { "type": "integer" }
                }
            },
            "samples": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["x", "y"],
                    "properties": {
                        "timestamp": { "type": ["integer", "null"] },
                        "participant": { "type": "string" },
                        "x": { "type": "number" },
                        "y": { "type": "number" },
                        "fixationDuration": { "type": ["integer", "null"] },
                        "aoiName": { "type": "string" }
                    }
                }
            },
            "distances": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "timestamp": { "type": ["integer", "null"] },
                        "distance": { "type": "integer" }
                    }
                }
            },
            "aoiHistogram": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "value": { "type": "integer" }
                    }
                }
            }
        }
    })
    .to_string()
}

// Output types

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IngestOutput {
    report: IngestReport,
    samples: Vec<GazeSample>,
    distances: Vec<GazeDistanceSample>,
    aoi_histogram: AoiHistogram,
}

// Error types

#[derive(Debug)]
enum GazeCliError {
    Io(io::Error),
    Ingest(gaze_flux::IngestError),
    Json(serde_json::Error),
    MissingColumns(Vec<String>),
    DoctorFailed,
}

impl From<io::Error> for GazeCliError {
    fn from(e: io::Error) -> Self {
        GazeCliError::Io(e)
    }
}

impl From<gaze_flux::IngestError> for GazeCliError {
    fn from(e: gaze_flux::IngestError) -> Self {
        GazeCliError::Ingest(e)
    }
}

impl From<serde_json::Error> for GazeCliError {
    fn from(e: serde_json::Error) -> Self {
        GazeCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<GazeCliError> for CliError {
    fn from(e: GazeCliError) -> Self {
        match e {
            GazeCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            GazeCliError::Ingest(gaze_flux::IngestError::ReadTimeout(ms)) => CliError {
                code: "READ_TIMEOUT".to_string(),
                message: format!("File read did not finish within {} ms", ms),
                hint: Some("Raise reader.timeout_ms in the config file".to_string()),
            },
            GazeCliError::Ingest(gaze_flux::IngestError::InvalidConfig(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'gaze doctor --config <file>' for details".to_string()),
            },
            GazeCliError::Ingest(e) => CliError {
                code: "INGEST_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            GazeCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            GazeCliError::MissingColumns(columns) => CliError {
                code: "MISSING_COLUMNS".to_string(),
                message: format!("Missing coordinate columns: {}", columns.join(", ")),
                hint: Some(
                    "Map the header names in the config file's \"columns\" section".to_string(),
                ),
            },
            GazeCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct ValidationReport {
    headers: Vec<String>,
    total_rows: usize,
    accepted_rows: usize,
    rejected_rows: usize,
    aoi_names: usize,
    missing_required: Vec<String>,
    missing_optional: Vec<String>,
}

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
