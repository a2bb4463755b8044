//! Incident CLI - Command-line interface for the incident feature pipeline
//!
//! Commands:
//! - predict: Encode an incident file and predict one label per record
//! - encode: Write the feature matrix for an incident file
//! - validate: Check every record without aborting at the first failure
//! - doctor: Diagnose side files and model/schema alignment
//! - schema: Print the trained feature schema

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use incident_features::model::Classifier;
use incident_features::pipeline::Predictions;
use incident_features::{
    DataFrame, FeaturePipeline, IncidentReader, LinearClassifier, PipelineConfig, PipelineError,
    WardRiskTable, PIPELINE_VERSION, PRODUCER_NAME,
};

/// Incident - feature pipeline and predictions for crime-incident records
#[derive(Parser)]
#[command(name = "incident")]
#[command(version = PIPELINE_VERSION)]
#[command(about = "Encode crime-incident records and predict with a trained classifier", long_about = None)]
struct Cli {
    /// Log pipeline stages to stderr (repeat for more detail)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode an incident file and predict one label per record
    Predict {
        /// Input CSV path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Ward risk table (JSON)
        #[arg(long)]
        risk_table: PathBuf,

        /// Model artifact (JSON)
        #[arg(long)]
        model: PathBuf,

        /// Pipeline configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "lines")]
        output_format: OutputFormat,
    },

    /// Write the feature matrix for an incident file as CSV
    Encode {
        /// Input CSV path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Ward risk table (JSON)
        #[arg(long)]
        risk_table: PathBuf,

        /// Pipeline configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check every record of an incident file
    Validate {
        /// Input CSV path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Ward risk table (JSON)
        #[arg(long)]
        risk_table: PathBuf,

        /// Pipeline configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose side files and model/schema alignment
    Doctor {
        /// Ward risk table to check
        #[arg(long)]
        risk_table: Option<PathBuf>,

        /// Model artifact to check
        #[arg(long)]
        model: Option<PathBuf>,

        /// Pipeline configuration to check
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the feature schema
    Schema {
        /// Pipeline configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as a JSON array
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// One label per line
    Lines,
    /// JSON object with run id and labels
    Json,
    /// CSV with row index and label
    Csv,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

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

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to set tracing subscriber");
    }
}

fn run(cli: Cli) -> Result<(), IncidentCliError> {
    match cli.command {
        Commands::Predict {
            input,
            output,
            risk_table,
            model,
            config,
            output_format,
        } => cmd_predict(
            &input,
            &output,
            &risk_table,
            &model,
            config.as_deref(),
            output_format,
        ),

        Commands::Encode {
            input,
            output,
            risk_table,
            config,
        } => cmd_encode(&input, &output, &risk_table, config.as_deref()),

        Commands::Validate {
            input,
            risk_table,
            config,
            json,
        } => cmd_validate(&input, &risk_table, config.as_deref(), json),

        Commands::Doctor {
            risk_table,
            model,
            config,
            json,
        } => cmd_doctor(
            risk_table.as_deref(),
            model.as_deref(),
            config.as_deref(),
            json,
        ),

        Commands::Schema { config, json } => cmd_schema(config.as_deref(), json),
    }
}

fn cmd_predict(
    input: &Path,
    output: &Path,
    risk_table: &Path,
    model: &Path,
    config: Option<&Path>,
    output_format: OutputFormat,
) -> Result<(), IncidentCliError> {
    let pipeline = build_pipeline(risk_table, config)?;
    let model = LinearClassifier::load(model)?;
    let df = read_input(input)?;

    if df.height() == 0 {
        return Err(IncidentCliError::NoRecords);
    }

    let predictions = pipeline.predict(df, &model)?;
    let output_data = format_predictions(&predictions, &output_format)?;
    write_output(output, &output_data)?;

    info!(records = predictions.labels.len(), "predictions written");
    Ok(())
}

fn cmd_encode(
    input: &Path,
    output: &Path,
    risk_table: &Path,
    config: Option<&Path>,
) -> Result<(), IncidentCliError> {
    let pipeline = build_pipeline(risk_table, config)?;
    let df = read_input(input)?;

    if df.height() == 0 {
        return Err(IncidentCliError::NoRecords);
    }

    let matrix = pipeline.encode(df)?;
    let mut buffer = Vec::new();
    matrix.write_csv(&mut buffer)?;
    write_output(output, &String::from_utf8_lossy(&buffer))?;

    info!(
        records = matrix.n_rows(),
        features = matrix.columns.len(),
        "feature matrix written"
    );
    Ok(())
}

fn cmd_validate(
    input: &Path,
    risk_table: &Path,
    config: Option<&Path>,
    json: bool,
) -> Result<(), IncidentCliError> {
    let pipeline = build_pipeline(risk_table, config)?;
    let df = read_input(input)?;
    let report = pipeline.validate(&df)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.total_records - report.invalid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.missing_columns.is_empty() {
            println!("\nMissing columns:");
            for column in &report.missing_columns {
                println!("  - {}", column);
            }
        }

        if !report.issues.is_empty() {
            println!("\nErrors:");
            for issue in &report.issues {
                println!("  - Row {} ({:?}): {}", issue.row, issue.stage, issue.error);
            }
        }
    }

    if report.is_valid() {
        Ok(())
    } else {
        Err(IncidentCliError::ValidationFailed(
            report.invalid_records,
            report.missing_columns.len(),
        ))
    }
}

fn cmd_doctor(
    risk_table: Option<&Path>,
    model: Option<&Path>,
    config: Option<&Path>,
    json: bool,
) -> Result<(), IncidentCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} {}", PRODUCER_NAME, PIPELINE_VERSION),
    });

    let config = match config {
        Some(path) => match PipelineConfig::load(path) {
            Ok(config) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!("Configuration valid ({})", path.display()),
                });
                config
            }
            Err(e) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                });
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };

    let schema = match config.schema() {
        Ok(schema) => {
            checks.push(DoctorCheck {
                name: "schema".to_string(),
                status: CheckStatus::Ok,
                message: format!("Feature schema has {} columns", schema.len()),
            });
            Some(schema)
        }
        Err(e) => {
            checks.push(DoctorCheck {
                name: "schema".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            });
            None
        }
    };

    match risk_table {
        Some(path) => checks.push(match WardRiskTable::load(path) {
            Ok(risk) => DoctorCheck {
                name: "risk_table".to_string(),
                status: if risk.is_empty() {
                    CheckStatus::Warning
                } else {
                    CheckStatus::Ok
                },
                message: format!("Ward risk table valid ({} wards)", risk.len()),
            },
            Err(e) => DoctorCheck {
                name: "risk_table".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        }),
        None => checks.push(DoctorCheck {
            name: "risk_table".to_string(),
            status: CheckStatus::Warning,
            message: "No ward risk table given".to_string(),
        }),
    }

    if let Some(path) = model {
        match LinearClassifier::load(path) {
            Ok(model) => {
                checks.push(DoctorCheck {
                    name: "model".to_string(),
                    status: CheckStatus::Ok,
                    message: format!("Model valid ({} classes)", model.classes().len()),
                });
                if let Some(schema) = &schema {
                    checks.push(match schema.check_matches(model.feature_names()) {
                        Ok(()) => DoctorCheck {
                            name: "model_schema".to_string(),
                            status: CheckStatus::Ok,
                            message: "Model features match the pipeline schema".to_string(),
                        },
                        Err(e) => DoctorCheck {
                            name: "model_schema".to_string(),
                            status: CheckStatus::Error,
                            message: e.to_string(),
                        },
                    });
                }
            }
            Err(e) => checks.push(DoctorCheck {
                name: "model".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            }),
        }
    }

    // Check stdin is available (for `-i -`)
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
            message: "stdin is a pipe (ready for `-i -`)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: PIPELINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Incident Doctor Report");
        println!("======================");
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
        Err(IncidentCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(config: Option<&Path>, json: bool) -> Result<(), IncidentCliError> {
    let config = match config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let schema = config.schema()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&schema)?);
    } else {
        println!("Feature schema ({} columns)", schema.len());
        println!();
        for (i, column) in schema.columns().iter().enumerate() {
            println!("{:>3}  {}", i, column);
        }
    }

    Ok(())
}

// Helper functions

fn build_pipeline(
    risk_table: &Path,
    config: Option<&Path>,
) -> Result<FeaturePipeline, IncidentCliError> {
    let risk = WardRiskTable::load(risk_table)?;
    let pipeline = match config {
        Some(path) => FeaturePipeline::with_config(risk, &PipelineConfig::load(path)?)?,
        None => FeaturePipeline::new(risk),
    };
    Ok(pipeline)
}

fn read_input(input: &Path) -> Result<DataFrame, IncidentCliError> {
    let reader = IncidentReader::new();
    let df = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        reader.read_str(&buffer)?
    } else {
        reader.read_path(input)?
    };
    Ok(df)
}

fn write_output(output: &Path, data: &str) -> Result<(), IncidentCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn format_predictions(
    predictions: &Predictions,
    format: &OutputFormat,
) -> Result<String, IncidentCliError> {
    match format {
        OutputFormat::Lines => Ok(predictions.labels.join("\n") + "\n"),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(predictions)?),
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(Vec::new());
            wtr.write_record(["row", "label"])
                .map_err(PipelineError::from)?;
            for (row, label) in predictions.labels.iter().enumerate() {
                wtr.write_record([row.to_string().as_str(), label.as_str()])
                    .map_err(PipelineError::from)?;
            }
            let bytes = wtr
                .into_inner()
                .map_err(|e| IncidentCliError::Io(e.into_error()))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}

// Error types

#[derive(Debug)]
enum IncidentCliError {
    Io(io::Error),
    Pipeline(PipelineError),
    Json(serde_json::Error),
    NoRecords,
    ValidationFailed(usize, usize),
    DoctorFailed,
}

impl From<io::Error> for IncidentCliError {
    fn from(e: io::Error) -> Self {
        IncidentCliError::Io(e)
    }
}

impl From<PipelineError> for IncidentCliError {
    fn from(e: PipelineError) -> Self {
        IncidentCliError::Pipeline(e)
    }
}

impl From<serde_json::Error> for IncidentCliError {
    fn from(e: serde_json::Error) -> Self {
        IncidentCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<IncidentCliError> for CliError {
    fn from(e: IncidentCliError) -> Self {
        match e {
            IncidentCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            IncidentCliError::Pipeline(e) => pipeline_error(e),
            IncidentCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            IncidentCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No records found in input".to_string(),
                hint: Some("Ensure the input file has rows below its header".to_string()),
            },
            IncidentCliError::ValidationFailed(records, columns) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!(
                    "{} records failed validation, {} required columns missing",
                    records, columns
                ),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            IncidentCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

fn pipeline_error(e: PipelineError) -> CliError {
    let (code, hint) = match &e {
        PipelineError::ParseError { .. } => (
            "PARSE_ERROR",
            Some("Timestamps must look like 2020-01-15 14:30:00 or 01/15/2020 02:30:00 PM"),
        ),
        PipelineError::LookupError { .. } => (
            "LOOKUP_ERROR",
            Some("Run 'incident validate' to list every record with an unknown ward"),
        ),
        PipelineError::SchemaError(_) => (
            "SCHEMA_ERROR",
            Some("Run 'incident doctor' to compare the model and pipeline schemas"),
        ),
        PipelineError::CoercionError { .. } => (
            "COERCION_ERROR",
            Some("Flag columns must hold True/False or 0/1"),
        ),
        PipelineError::RiskTableError(_) => (
            "RISK_TABLE_ERROR",
            Some("The risk table maps ward ids to exactly 5 scores"),
        ),
        PipelineError::ModelError(_) => ("MODEL_ERROR", None),
        PipelineError::ConfigError(_) => ("CONFIG_ERROR", None),
        PipelineError::Polars(_) => ("DATA_FRAME_ERROR", Some("Check the input file is valid CSV")),
        PipelineError::Csv(_) => ("CSV_ERROR", Some("Check the input file is valid CSV")),
        PipelineError::Json(_) => ("JSON_ERROR", None),
        PipelineError::Io(_) => ("IO_ERROR", Some("Check file paths and permissions")),
    };
    CliError {
        code: code.to_string(),
        message: e.to_string(),
        hint: hint.map(str::to_string),
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
