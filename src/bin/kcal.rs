//! Kcal CLI - Command-line interface for Kcal Flux
//!
//! Commands:
//! - report: Compute today's budget report from sample events (batch mode)
//! - validate: Validate sample event schema
//! - doctor: Diagnose configuration and environment
//! - schema: Print input, output or config schema

use chrono::{NaiveDate, Utc, Weekday};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use kcal_flux::budget::weekday_from_number;
use kcal_flux::config::EngineConfig;
use kcal_flux::encoder::{ReportEncoder, REPORT_VERSION};
use kcal_flux::pipeline::analyze;
use kcal_flux::schema::{SampleEvent, SampleEventAdapter, SCHEMA_VERSION};
use kcal_flux::{KCAL_FLUX_VERSION, PRODUCER_NAME};

/// Kcal - adaptive calorie budgets from intake and weight history
#[derive(Parser)]
#[command(name = "kcal")]
#[command(author = "Synheart AI Inc")]
#[command(version = KCAL_FLUX_VERSION)]
#[command(about = "Compute calorie budgets from logged intake and weight", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a budget report from sample events (batch mode)
    Report {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Engine configuration file (JSON)
        #[arg(short, long, env = "KCAL_CONFIG")]
        config: Option<PathBuf>,

        /// Daily adjustment from maintenance in kcal (negative to lose weight)
        #[arg(long, allow_hyphen_values = true)]
        adjustment: Option<f64>,

        /// Timezone: "UTC" or a fixed offset such as "+02:00"
        #[arg(long)]
        timezone: Option<String>,

        /// First weekday of the budget cycle (name, or 1 = Sunday ... 7 = Saturday)
        #[arg(long, value_parser = parse_weekday)]
        first_weekday: Option<Weekday>,

        /// Local date to compute the budget for (YYYY-MM-DD); defaults to today
        #[arg(long)]
        today: Option<NaiveDate>,

        /// Compact single-line JSON output
        #[arg(long)]
        compact: bool,
    },

    /// Validate sample event schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a configuration file
        #[arg(short, long, env = "KCAL_CONFIG")]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Detect from the first character
    Auto,
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (health.sample.v1)
    Input,
    /// Output schema (budget report)
    Output,
    /// Engine configuration with defaults
    Config,
}

fn parse_weekday(value: &str) -> Result<Weekday, String> {
    if let Ok(number) = value.parse::<u8>() {
        return weekday_from_number(number)
            .ok_or_else(|| format!("weekday number must be 1-7, got {number}"));
    }
    value
        .parse::<Weekday>()
        .map_err(|_| format!("unknown weekday '{value}'"))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let error = CliError::from(e);
            eprintln!(
                "{}",
                serde_json::to_string(&error).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), KcalCliError> {
    match cli.command {
        Commands::Report {
            input,
            output,
            input_format,
            config,
            adjustment,
            timezone,
            first_weekday,
            today,
            compact,
        } => {
            let mut engine_config = load_config(config.as_deref())?;
            if let Some(adjustment) = adjustment {
                engine_config.goal.adjustment_kcal = adjustment;
            }
            if let Some(timezone) = timezone {
                engine_config.timezone = timezone;
            }
            if let Some(weekday) = first_weekday {
                engine_config.goal.first_weekday = weekday;
            }
            engine_config.validate()?;

            cmd_report(&input, &output, input_format, &engine_config, today, compact)
        }

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

fn cmd_report(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    config: &EngineConfig,
    today: Option<NaiveDate>,
    compact: bool,
) -> Result<(), KcalCliError> {
    let events = read_events(input, &input_format)?;
    if events.is_empty() {
        return Err(KcalCliError::NoEvents);
    }
    info!("read {} events", events.len());

    let samples = SampleEventAdapter::to_samples(&events)?;

    let today = match today {
        Some(date) => date,
        None => Utc::now().with_timezone(&config.tz()?).date_naive(),
    };
    debug!("computing report for {}", today);

    let snapshot = analyze(&samples, config, today)?;
    let report = ReportEncoder::new().encode(&snapshot, config)?;

    let rendered = if compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };

    if output.to_string_lossy() == "-" {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{rendered}")?;
    } else {
        fs::write(output, rendered + "\n")?;
    }

    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), KcalCliError> {
    let events = read_events(input, &input_format)?;
    let failures = SampleEventAdapter::validate_events(&events);

    let report = ValidationReport {
        total_events: events.len(),
        valid_events: events.len() - failures.len(),
        invalid_events: failures.len(),
        errors: failures
            .into_iter()
            .map(|f| ValidationErrorDetail {
                index: f.index,
                event_id: f.event_id,
                error: f.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total events:   {}", report.total_events);
        println!("Valid events:   {}", report.valid_events);
        println!("Invalid events: {}", report.invalid_events);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Event {} (index {}): {}",
                    err.event_id.as_deref().unwrap_or("unknown"),
                    err.index,
                    err.error
                );
            }
        }
    }

    if report.invalid_events > 0 {
        Err(KcalCliError::ValidationFailed(report.invalid_events))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), KcalCliError> {
    let mut checks: Vec<DoctorCheck> = vec![
        DoctorCheck::ok("version", format!("Kcal Flux version {KCAL_FLUX_VERSION}")),
        DoctorCheck::ok("schema_version", format!("Input schema: {SCHEMA_VERSION}")),
    ];

    match config {
        Some(path) if !path.exists() => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Warning,
            message: "Config file does not exist; defaults will be used".to_string(),
        }),
        Some(path) => checks.extend(check_config_file(path)),
        None => checks.push(DoctorCheck::ok(
            "config",
            "No config file given; using defaults".to_string(),
        )),
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck::ok("stdin", "stdin is a TTY (interactive mode)".to_string())
    } else {
        DoctorCheck::ok("stdin", "stdin is a pipe (ready for --input -)".to_string())
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: KCAL_FLUX_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Kcal Doctor Report");
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
        Err(KcalCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn check_config_file(path: &Path) -> Vec<DoctorCheck> {
    let error = |message: String| DoctorCheck {
        name: "config".to_string(),
        status: CheckStatus::Error,
        message,
    };

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => return vec![error(format!("Cannot read config file: {e}"))],
    };

    let config = match EngineConfig::from_json(&content) {
        Ok(config) => config,
        Err(e) => return vec![error(format!("Invalid config JSON: {e}"))],
    };

    if let Err(e) = config.validate() {
        return vec![error(format!("Invalid config: {e}"))];
    }

    let mut checks = vec![DoctorCheck::ok(
        "config",
        format!(
            "Config valid (adjustment {} kcal/day, cycles start {:?}, timezone {})",
            config.goal.adjustment_kcal, config.goal.first_weekday, config.timezone
        ),
    )];

    if config.goal.adjustment_kcal.abs() > 1000.0 {
        checks.push(DoctorCheck {
            name: "adjustment".to_string(),
            status: CheckStatus::Warning,
            message: format!(
                "Adjustment of {} kcal/day is unusually large",
                config.goal.adjustment_kcal
            ),
        });
    }

    if config.goal.macro_split.is_none() {
        checks.push(DoctorCheck {
            name: "macro_split".to_string(),
            status: CheckStatus::Warning,
            message: "No macro split configured; macro targets will be omitted".to_string(),
        });
    }

    checks
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), KcalCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input Schema: {SCHEMA_VERSION}");
                println!();
                println!("One event per logged measurement:");
                println!("- schema_version: \"{SCHEMA_VERSION}\"");
                println!("- event_id: optional unique id");
                println!("- timestamp: RFC 3339 instant");
                println!("- kind: dietary_energy | body_mass | protein | carbohydrates | fat");
                println!("- value: non-negative number");
                println!("- unit: kcal, kj, cal (energy); kg, g, lb, st (mass)");
                println!("- source: local | health_kit | <name> (default local)");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output Schema: budget report {REPORT_VERSION}");
                println!();
                println!("- producer: {{ name, version, instance_id }}");
                println!("- provenance: {{ computed_at_utc, timezone, intake_days, weight_days }}");
                println!("- date, units: {{ mass, energy }}");
                println!("- intake: {{ smoothed_per_day, consumed_today }}");
                println!("- weight: {{ current, trend_per_week }}");
                println!("- maintenance: {{ per_day, valid, weight_span_days }}");
                println!("- budget: {{ available, base, adjustment, carry_over, remaining,");
                println!("            spread_allowance, days_left_in_cycle,");
                println!("            cycle_start, cycle_end }}");
                println!("- macros: {{ targets, smoothed_intake, credit, adjusted,");
                println!("            consumed_today, remaining }} in grams");
                println!("- weekly_intake: [{{ week_start, intake }}]");
            }
        }
        SchemaType::Config => {
            println!("{}", EngineConfig::default().to_json()?);
        }
    }

    Ok(())
}

// Helper functions

fn load_config(path: Option<&Path>) -> Result<EngineConfig, KcalCliError> {
    match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Ok(EngineConfig::from_json(&content)?)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn read_events(input: &Path, format: &InputFormat) -> Result<Vec<SampleEvent>, KcalCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let events = match format {
        InputFormat::Auto => SampleEventAdapter::parse(&input_data)?,
        InputFormat::Ndjson => SampleEventAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => SampleEventAdapter::parse_array(&input_data)?,
    };
    Ok(events)
}

fn get_input_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": SCHEMA_VERSION,
        "description": "Logged intake, body mass or macro measurement",
        "type": "object",
        "required": ["schema_version", "timestamp", "kind", "value", "unit"],
        "properties": {
            "schema_version": { "type": "string", "const": SCHEMA_VERSION },
            "event_id": { "type": "string" },
            "timestamp": { "type": "string", "format": "date-time" },
            "kind": {
                "type": "string",
                "enum": ["dietary_energy", "body_mass", "protein", "carbohydrates", "fat"]
            },
            "value": { "type": "number", "minimum": 0 },
            "unit": {
                "type": "string",
                "enum": ["kcal", "kj", "cal", "kg", "g", "lb", "st"]
            },
            "source": { "type": "string" }
        }
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    let nullable_number = serde_json::json!({ "type": ["number", "null"] });
    let grams = serde_json::json!({
        "type": "object",
        "properties": {
            "protein_grams": nullable_number,
            "carb_grams": nullable_number,
            "fat_grams": nullable_number
        }
    });
    let nullable_grams = serde_json::json!({ "oneOf": [grams, { "type": "null" }] });
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "budget report",
        "type": "object",
        "required": [
            "report_version", "producer", "provenance", "date", "units",
            "intake", "weight", "maintenance", "budget", "macros", "weekly_intake"
        ],
        "properties": {
            "report_version": { "type": "string", "const": REPORT_VERSION },
            "producer": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "version": { "type": "string" },
                    "instance_id": { "type": "string" }
                }
            },
            "date": { "type": "string", "format": "date" },
            "maintenance": {
                "type": "object",
                "properties": {
                    "per_day": nullable_number,
                    "valid": { "type": "boolean" },
                    "weight_span_days": { "type": "integer" }
                }
            },
            "budget": {
                "type": "object",
                "properties": {
                    "available": { "type": "boolean" },
                    "base": nullable_number,
                    "remaining": nullable_number,
                    "spread_allowance": nullable_number,
                    "carry_over": { "type": "number" },
                    "days_left_in_cycle": { "type": "integer", "minimum": 1 }
                }
            },
            "macros": {
                "type": "object",
                "properties": {
                    "targets": nullable_grams,
                    "smoothed_intake": nullable_grams,
                    "credit": nullable_grams,
                    "adjusted": nullable_grams,
                    "consumed_today": grams,
                    "remaining": nullable_grams
                }
            },
            "weekly_intake": { "type": "array", "items": { "type": "object" } }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum KcalCliError {
    Io(io::Error),
    Compute(kcal_flux::ComputeError),
    Json(serde_json::Error),
    NoEvents,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for KcalCliError {
    fn from(e: io::Error) -> Self {
        KcalCliError::Io(e)
    }
}

impl From<kcal_flux::ComputeError> for KcalCliError {
    fn from(e: kcal_flux::ComputeError) -> Self {
        KcalCliError::Compute(e)
    }
}

impl From<serde_json::Error> for KcalCliError {
    fn from(e: serde_json::Error) -> Self {
        KcalCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<KcalCliError> for CliError {
    fn from(e: KcalCliError) -> Self {
        use kcal_flux::ComputeError;

        match e {
            KcalCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            KcalCliError::Compute(e) => {
                let (code, hint) = match &e {
                    ComputeError::InvalidSample(_) | ComputeError::ParseError(_) => (
                        "PARSE_ERROR",
                        "Ensure input matches health.sample.v1; run 'kcal validate' for details",
                    ),
                    ComputeError::JsonError(_) => ("JSON_ERROR", "Check JSON syntax"),
                    ComputeError::EncodingError(_) => ("ENCODING_ERROR", "Report this as a bug"),
                    ComputeError::DateOutOfRange(_) => {
                        ("DATE_ERROR", "Pass a calendar date with --today")
                    }
                    _ => ("CONFIG_ERROR", "Run 'kcal doctor --config <file>' to check settings"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            KcalCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            KcalCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            KcalCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{count} events failed validation"),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            KcalCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_events: usize,
    valid_events: usize,
    invalid_events: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    event_id: Option<String>,
    error: String,
}

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

impl DoctorCheck {
    fn ok(name: &str, message: String) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message,
        }
    }
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
