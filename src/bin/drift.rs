//! Drift CLI - Command-line interface for Sleep Drift
//!
//! Commands:
//! - import: Load nights from a CSV file into the store
//! - log: Record a single night
//! - assess: Compute baseline, drift and risk for the stored nights
//! - export: Write the stored nights as CSV
//! - clear: Remove every stored night
//! - seed: Generate a synthetic week of nights
//! - doctor: Diagnose store and configuration health
//! - schema: Print input/output schema information

use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use sleep_drift::schema::{CSV_HEADER, REQUIRED_COLUMNS};
use sleep_drift::seed::SeedOptions;
use sleep_drift::types::RawNight;
use sleep_drift::{DriftConfig, DriftError, DriftProcessor, DRIFT_VERSION, PRODUCER_NAME};

/// Drift - Sleep regularity baseline and drift detection
#[derive(Parser)]
#[command(name = "drift")]
#[command(author = "Synheart AI Inc")]
#[command(version = DRIFT_VERSION)]
#[command(about = "Detect circadian drift from sleep history", long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Settings {
    /// Night store file (JSON snapshot, created on first write)
    #[arg(long, global = true, default_value = "nights.json")]
    store: PathBuf,

    /// Engine configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Baseline window in nights
    #[arg(long, global = true)]
    window_days: Option<usize>,

    /// Lateness in minutes (inclusive) that counts as drift
    #[arg(long, global = true)]
    drift_threshold: Option<i64>,

    /// Nights required before a label is given
    #[arg(long, global = true)]
    min_nights: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import nights from CSV (date,sleep_start,sleep_end)
    Import {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Replace the whole store instead of upserting by date
        #[arg(long)]
        replace: bool,
    },

    /// Record a single night, replacing any night on the same date
    Log {
        /// Night date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Sleep start timestamp (ISO-8601)
        #[arg(long)]
        start: String,

        /// Sleep end timestamp (ISO-8601)
        #[arg(long)]
        end: String,
    },

    /// Assess the stored nights
    Assess {
        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// Export stored nights as CSV
    Export {
        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Remove every stored night
    Clear,

    /// Generate synthetic nights into the store
    Seed {
        /// Date of the last generated night (defaults to today, UTC)
        #[arg(long)]
        end_date: Option<NaiveDate>,

        /// Number of nights to generate
        #[arg(long, default_value = "7")]
        nights: usize,

        /// Extra minutes added to the final night's bedtime
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        late_shift: i64,

        /// Disable bedtime jitter
        #[arg(long)]
        no_jitter: bool,
    },

    /// Diagnose store and configuration health
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable summary
    Text,
    /// Nudge report as compact JSON
    Json,
    /// Nudge report as pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (night CSV)
    Input,
    /// Output schema (nudge report)
    Output,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), DriftCliError> {
    let settings = cli.settings;

    match cli.command {
        Commands::Import { input, replace } => cmd_import(&settings, &input, replace),
        Commands::Log { date, start, end } => cmd_log(&settings, RawNight::new(date, start, end)),
        Commands::Assess { format } => cmd_assess(&settings, format),
        Commands::Export { output } => cmd_export(&settings, &output),
        Commands::Clear => cmd_clear(&settings),
        Commands::Seed {
            end_date,
            nights,
            late_shift,
            no_jitter,
        } => {
            let options = SeedOptions {
                nights,
                late_shift_min: late_shift,
                jitter: !no_jitter,
                ..SeedOptions::ending(end_date.unwrap_or_else(|| Utc::now().date_naive()))
            };
            cmd_seed(&settings, &options)
        }
        Commands::Doctor { json } => cmd_doctor(&settings, json),
        Commands::Schema { schema_type, json_schema } => cmd_schema(schema_type, json_schema),
    }
}

/// Resolve the engine configuration: file first, then command-line overrides
fn load_config(settings: &Settings) -> Result<DriftConfig, DriftCliError> {
    let mut config = match &settings.config {
        Some(path) => DriftConfig::from_json(&fs::read_to_string(path)?)?,
        None => DriftConfig::default(),
    };

    if let Some(window_days) = settings.window_days {
        config.baseline_window_days = window_days;
    }
    if let Some(threshold) = settings.drift_threshold {
        config.drift_threshold_min = threshold;
    }
    if let Some(min_nights) = settings.min_nights {
        config.min_nights_for_decision = min_nights;
    }

    config.validate()?;
    Ok(config)
}

/// Open a processor over the store file; a missing file is an empty store
fn open_processor(settings: &Settings) -> Result<DriftProcessor, DriftCliError> {
    let mut processor = DriftProcessor::with_config(load_config(settings)?);

    if settings.store.exists() {
        let json = fs::read_to_string(&settings.store)?;
        processor.load_nights(&json)?;
        log::debug!(
            "loaded {} nights from {}",
            processor.nights().len(),
            settings.store.display()
        );
    }

    Ok(processor)
}

fn save_processor(settings: &Settings, processor: &DriftProcessor) -> Result<(), DriftCliError> {
    fs::write(&settings.store, processor.save_nights()?)?;
    Ok(())
}

fn read_input(input: &Path) -> Result<String, DriftCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn cmd_import(settings: &Settings, input: &Path, replace: bool) -> Result<(), DriftCliError> {
    let csv = read_input(input)?;
    let processor = open_processor(settings)?;

    let summary = if replace {
        processor.replace_from_csv(&csv)?
    } else {
        processor.import_csv(&csv)?
    };
    save_processor(settings, &processor)?;

    println!("{}", summary);
    if summary.skipped_rows > 0 {
        println!("{} row(s) skipped (missing fields)", summary.skipped_rows);
    }
    Ok(())
}

fn cmd_log(settings: &Settings, night: RawNight) -> Result<(), DriftCliError> {
    let processor = open_processor(settings)?;
    let date = night.date.clone();

    processor.log_night(night)?;
    save_processor(settings, &processor)?;

    println!("Logged night {}", date);
    Ok(())
}

fn cmd_assess(settings: &Settings, format: OutputFormat) -> Result<(), DriftCliError> {
    let processor = open_processor(settings)?;
    let report = processor.nudge_report()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&report)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!("Drift Assessment");
            println!("================");
            println!("Label:           {}", report.label);
            println!("Nights in window: {}", report.stats.coverage);
            println!(
                "Baseline mid:    {}",
                report.baseline_mid_clock.as_deref().unwrap_or("n/a")
            );
            println!(
                "Lateness:        {}",
                sleep_drift::encoder::format_signed_duration(report.stats.recent_lateness)
            );
            println!("Regularity loss: {} min", report.stats.regularity_loss);
            println!();
            println!("{}", report.explanation);
        }
    }

    Ok(())
}

fn cmd_export(settings: &Settings, output: &Path) -> Result<(), DriftCliError> {
    let processor = open_processor(settings)?;
    let csv = processor.export_csv();

    if output.to_string_lossy() == "-" {
        print!("{}", csv);
    } else {
        fs::write(output, csv)?;
    }
    Ok(())
}

fn cmd_clear(settings: &Settings) -> Result<(), DriftCliError> {
    let processor = open_processor(settings)?;
    let removed = processor.nights().len();

    processor.clear();
    save_processor(settings, &processor)?;

    println!("Cleared {} night(s)", removed);
    Ok(())
}

fn cmd_seed(settings: &Settings, options: &SeedOptions) -> Result<(), DriftCliError> {
    if options.nights == 0 {
        return Err(DriftCliError::Usage("--nights must be at least 1".to_string()));
    }

    let processor = open_processor(settings)?;
    let generated = processor.seed(options)?;
    save_processor(settings, &processor)?;

    println!("Seeded {} night(s) ending {}", generated, options.end_date);
    Ok(())
}

fn cmd_doctor(settings: &Settings, json: bool) -> Result<(), DriftCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "drift_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Sleep Drift version {}", DRIFT_VERSION),
    });

    let config_check = match load_config(settings) {
        Ok(config) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: format!(
                "window {} nights, threshold {} min, decision after {} nights",
                config.baseline_window_days, config.drift_threshold_min, config.min_nights_for_decision
            ),
        },
        Err(e) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: CliError::from(e).message,
        },
    };
    checks.push(config_check);

    checks.push(check_store(&settings.store));

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (use `import -i <file>`)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (`import -i -` ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: DRIFT_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Drift Doctor Report");
        println!("===================");
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

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(DriftCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn check_store(path: &Path) -> DoctorCheck {
    if !path.exists() {
        return DoctorCheck {
            name: "store".to_string(),
            status: CheckStatus::Warning,
            message: format!("{} does not exist yet (created on first write)", path.display()),
        };
    }

    let (status, message) = match fs::read_to_string(path) {
        Ok(content) => {
            let mut processor = DriftProcessor::new();
            match processor.load_nights(&content) {
                Ok(()) => {
                    let nights = processor.nights();
                    match nights.last() {
                        Some(latest) => (
                            CheckStatus::Ok,
                            format!("{} nights stored, latest {}", nights.len(), latest.date),
                        ),
                        None => (CheckStatus::Warning, "store is empty".to_string()),
                    }
                }
                Err(e) => (CheckStatus::Error, format!("Invalid store file: {}", e)),
            }
        }
        Err(e) => (CheckStatus::Error, format!("Cannot read store file: {}", e)),
    };

    DoctorCheck {
        name: "store".to_string(),
        status,
        message,
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), DriftCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input Schema: night CSV");
                println!();
                println!("Header (any order, case-insensitive): {}", CSV_HEADER);
                println!();
                println!("- date: night key (YYYY-MM-DD); one night per date, later imports replace earlier ones");
                println!("- sleep_start: ISO-8601 timestamp (offset-less values are read as UTC)");
                println!("- sleep_end: ISO-8601 timestamp");
                println!();
                println!("Rows with missing fields are skipped; an unparseable timestamp rejects the import.");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output Schema: nudge report");
                println!();
                println!("- report_version: Schema version");
                println!("- producer: {{ name, version, instance_id }}");
                println!("- computed_at_utc: RFC 3339 timestamp");
                println!("- label: INSUFFICIENT_DATA | LOW | HIGH");
                println!("- should_nudge: true only for HIGH");
                println!("- stats: {{ coverage, baseline_mid, recent_lateness, regularity_loss, drift }}");
                println!("- baseline_mid_clock: baseline midsleep as HH:MM (UTC)");
                println!("- most_recent_date, explanation, config");
            }
        }
    }

    Ok(())
}

fn get_input_json_schema() -> String {
    let properties: serde_json::Map<String, serde_json::Value> = REQUIRED_COLUMNS
        .iter()
        .map(|column| {
            let format = if *column == "date" { "date" } else { "date-time" };
            (
                column.to_string(),
                serde_json::json!({ "type": "string", "format": format }),
            )
        })
        .collect();

    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "sleep_drift.night",
        "description": "One CSV row of the night import",
        "type": "object",
        "required": REQUIRED_COLUMNS,
        "properties": properties
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "sleep_drift.nudge_report",
        "description": "Sleep Drift nudge report",
        "type": "object",
        "required": ["report_version", "producer", "computed_at_utc", "label", "should_nudge", "stats"],
        "properties": {
            "report_version": { "type": "string" },
            "producer": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "version": { "type": "string" },
                    "instance_id": { "type": "string" }
                }
            },
            "computed_at_utc": { "type": "string", "format": "date-time" },
            "label": { "type": "string", "enum": ["INSUFFICIENT_DATA", "LOW", "HIGH"] },
            "should_nudge": { "type": "boolean" },
            "stats": {
                "type": "object",
                "properties": {
                    "coverage": { "type": "integer", "minimum": 0 },
                    "baseline_mid": { "type": ["integer", "null"] },
                    "recent_lateness": { "type": "integer" },
                    "regularity_loss": { "type": "integer", "minimum": 0 },
                    "drift": { "type": "boolean" }
                }
            },
            "baseline_mid_clock": { "type": ["string", "null"] },
            "most_recent_date": { "type": ["string", "null"] },
            "explanation": { "type": "string" },
            "config": { "type": "object" }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum DriftCliError {
    Io(io::Error),
    Drift(DriftError),
    Json(serde_json::Error),
    Usage(String),
    DoctorFailed,
}

impl From<io::Error> for DriftCliError {
    fn from(e: io::Error) -> Self {
        DriftCliError::Io(e)
    }
}

impl From<DriftError> for DriftCliError {
    fn from(e: DriftError) -> Self {
        DriftCliError::Drift(e)
    }
}

impl From<serde_json::Error> for DriftCliError {
    fn from(e: serde_json::Error) -> Self {
        DriftCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<DriftCliError> for CliError {
    fn from(e: DriftCliError) -> Self {
        match e {
            DriftCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            DriftCliError::Drift(e) => drift_error(e),
            DriftCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            DriftCliError::Usage(msg) => CliError {
                code: "USAGE_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'drift --help' for usage".to_string()),
            },
            DriftCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

fn drift_error(e: DriftError) -> CliError {
    let (code, hint) = match &e {
        DriftError::MalformedHeader(_) => (
            "MALFORMED_HEADER",
            format!("The first line must name the columns: {}", CSV_HEADER),
        ),
        DriftError::NoDataRows => ("NO_DATA_ROWS", "Add at least one night below the header".to_string()),
        DriftError::NoValidRows => (
            "NO_VALID_ROWS",
            "Every row was missing a field; check the delimiter is ','".to_string(),
        ),
        DriftError::InvalidTimestamp { .. } => (
            "INVALID_TIMESTAMP",
            "Use ISO-8601 timestamps such as 2024-01-01T01:00:00Z".to_string(),
        ),
        DriftError::InvalidConfig(_) => (
            "INVALID_CONFIG",
            "Check --config, --window-days, --drift-threshold and --min-nights".to_string(),
        ),
        DriftError::InvalidDate { .. } => (
            "INVALID_DATE",
            "Use ISO calendar dates such as 2024-01-01".to_string(),
        ),
        DriftError::SeedOutOfRange(_) => (
            "SEED_OUT_OF_RANGE",
            "Use a smaller --nights or --late-shift".to_string(),
        ),
        DriftError::JsonError(_) => ("JSON_ERROR", "Check the store or config file syntax".to_string()),
    };

    CliError {
        code: code.to_string(),
        message: e.to_string(),
        hint: Some(hint),
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
