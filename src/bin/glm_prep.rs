//! glm-prep CLI - Command-line interface for glm-prep
//!
//! Commands:
//! - extract: Extract a subject's condition information (session info payload)
//! - covariates: Compute a subject's motion covariates
//! - ratings: Extract a subject's events joined with their behavioural ratings
//! - contrasts: Print first- or second-level contrasts
//! - model: Print first- or second-level model parameters
//! - doctor: Check that a subject's input files are present and complete

use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use glm_prep::pipeline::{check_inputs, CheckStatus, InputCheck};
use glm_prep::{
    subject_covariates, subject_ratings, subject_session_info, ContrastSet, ExtractConfig,
    FirstLevelModel, PrepError, SecondLevelModel, PRODUCER_NAME, VERSION,
};

/// glm-prep - Prepare condition information for fMRI GLMs
#[derive(Parser)]
#[command(name = "glm-prep")]
#[command(version = VERSION)]
#[command(
    about = "Extract GLM condition information from BIDS event and confound files",
    long_about = None
)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by commands that read a subject's files
#[derive(clap::Args)]
struct SubjectArgs {
    /// Subject identifier, with or without the "sub-" prefix
    #[arg(short, long)]
    subject: String,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// BIDS dataset root (overrides the configuration file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// fMRIPrep derivatives root (overrides the configuration file)
    #[arg(long)]
    derivatives_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a subject's condition information
    Extract {
        #[command(flatten)]
        subject: SubjectArgs,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format (pretty on a terminal, compact otherwise)
        #[arg(long)]
        format: Option<OutputFormat>,

        /// Attach the smoothed first-level model instead of the unsmoothed one
        #[arg(long)]
        smoothed: bool,
    },

    /// Compute a subject's motion covariates
    Covariates {
        #[command(flatten)]
        subject: SubjectArgs,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format (pretty on a terminal, compact otherwise)
        #[arg(long)]
        format: Option<OutputFormat>,
    },

    /// Extract a subject's rated events
    Ratings {
        #[command(flatten)]
        subject: SubjectArgs,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format (pretty on a terminal, compact otherwise)
        #[arg(long)]
        format: Option<OutputFormat>,
    },

    /// Print contrasts
    Contrasts {
        /// Analysis level
        #[arg(long, value_enum, default_value = "first")]
        level: Level,
    },

    /// Print model parameters
    Model {
        /// Analysis level
        #[arg(long, value_enum, default_value = "first")]
        level: Level,

        /// First-level model with spatial smoothing
        #[arg(long)]
        smoothed: bool,
    },

    /// Check a subject's input files
    Doctor {
        #[command(flatten)]
        subject: SubjectArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum Level {
    First,
    Second,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

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

fn init_logging(level: &str) {
    let filter = level.parse::<log::LevelFilter>().unwrap_or_else(|_| {
        eprintln!("Warning: invalid log level '{level}', using warn");
        log::LevelFilter::Warn
    });
    env_logger::Builder::new()
        .filter_level(filter)
        .format_timestamp_millis()
        .init();
}

fn run(cli: Cli) -> Result<(), PrepCliError> {
    match cli.command {
        Commands::Extract {
            subject,
            output,
            format,
            smoothed,
        } => cmd_extract(&subject, &output, format, smoothed),

        Commands::Covariates {
            subject,
            output,
            format,
        } => cmd_covariates(&subject, &output, format),

        Commands::Ratings {
            subject,
            output,
            format,
        } => cmd_ratings(&subject, &output, format),

        Commands::Contrasts { level } => cmd_contrasts(level),

        Commands::Model { level, smoothed } => cmd_model(level, smoothed),

        Commands::Doctor { subject, json } => cmd_doctor(&subject, json),
    }
}

fn cmd_extract(
    args: &SubjectArgs,
    output: &Path,
    format: Option<OutputFormat>,
    smoothed: bool,
) -> Result<(), PrepCliError> {
    let config = load_config(args)?;
    let model = if smoothed {
        FirstLevelModel::smoothed()
    } else {
        FirstLevelModel::unsmoothed()
    };

    let payload = subject_session_info(&config, model)?;
    info!(
        "extracted {} runs for {}",
        payload.subject_info.len(),
        payload.provenance.subject
    );

    write_output(&payload, output, format)
}

fn cmd_covariates(
    args: &SubjectArgs,
    output: &Path,
    format: Option<OutputFormat>,
) -> Result<(), PrepCliError> {
    let config = load_config(args)?;
    let payload = subject_covariates(&config)?;
    write_output(&payload, output, format)
}

fn cmd_ratings(
    args: &SubjectArgs,
    output: &Path,
    format: Option<OutputFormat>,
) -> Result<(), PrepCliError> {
    let config = load_config(args)?;
    let payload = subject_ratings(&config)?;
    write_output(&payload, output, format)
}

fn cmd_contrasts(level: Level) -> Result<(), PrepCliError> {
    let set = match level {
        Level::First => ContrastSet::first_level(),
        Level::Second => ContrastSet::second_level(),
    };
    set.validate()?;
    println!("{}", serde_json::to_string_pretty(&set)?);
    Ok(())
}

fn cmd_model(level: Level, smoothed: bool) -> Result<(), PrepCliError> {
    let json = match level {
        Level::First if smoothed => serde_json::to_string_pretty(&FirstLevelModel::smoothed())?,
        Level::First => serde_json::to_string_pretty(&FirstLevelModel::unsmoothed())?,
        Level::Second => serde_json::to_string_pretty(&SecondLevelModel::default())?,
    };
    println!("{json}");
    Ok(())
}

fn cmd_doctor(args: &SubjectArgs, json: bool) -> Result<(), PrepCliError> {
    let config = load_config(args)?;
    let checks = check_inputs(&config);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        subject: config.subject.clone(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("glm-prep Doctor Report");
        println!("======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("Subject:  {}", report.subject);
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
        Err(PrepCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn load_config(args: &SubjectArgs) -> Result<ExtractConfig, PrepCliError> {
    let mut config = match &args.config {
        Some(path) => ExtractConfig::from_json_file(path)?,
        None => ExtractConfig::default(),
    };

    config.subject = args.subject.clone();
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(dir) = &args.derivatives_dir {
        config.derivatives_dir = Some(dir.clone());
    }

    Ok(config)
}

fn write_output<T: serde::Serialize>(
    value: &T,
    output: &Path,
    format: Option<OutputFormat>,
) -> Result<(), PrepCliError> {
    let to_stdout = output.to_string_lossy() == "-";
    let format = format.unwrap_or(if to_stdout && atty::is(atty::Stream::Stdout) {
        OutputFormat::JsonPretty
    } else {
        OutputFormat::Json
    });

    let data = match format {
        OutputFormat::Json => serde_json::to_string(value)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value)?,
    };

    if to_stdout {
        let mut stdout = io::stdout();
        writeln!(stdout, "{data}")?;
        stdout.flush()?;
    } else {
        fs::write(output, data + "\n")?;
        info!("wrote {}", output.display());
    }

    Ok(())
}

// Error types

#[derive(Debug)]
enum PrepCliError {
    Io(io::Error),
    Prep(PrepError),
    Json(serde_json::Error),
    DoctorFailed,
}

impl From<io::Error> for PrepCliError {
    fn from(e: io::Error) -> Self {
        PrepCliError::Io(e)
    }
}

impl From<PrepError> for PrepCliError {
    fn from(e: PrepError) -> Self {
        PrepCliError::Prep(e)
    }
}

impl From<serde_json::Error> for PrepCliError {
    fn from(e: serde_json::Error) -> Self {
        PrepCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PrepCliError> for CliError {
    fn from(e: PrepCliError) -> Self {
        match e {
            PrepCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PrepCliError::Prep(e) => {
                let (code, hint) = match &e {
                    PrepError::MissingFile(_) => (
                        "MISSING_FILE",
                        "Run 'glm-prep doctor' to list the expected files",
                    ),
                    PrepError::MissingColumn { .. } => (
                        "SCHEMA_ERROR",
                        "Event files need onset, duration and trial_type columns",
                    ),
                    PrepError::Parse { .. } | PrepError::Csv(_) => {
                        ("PARSE_ERROR", "Check the TSV file at the reported line")
                    }
                    PrepError::InvalidRun(_) | PrepError::InsufficientTimepoints { .. } => {
                        ("DATA_ERROR", "Check the subject's runs and confound tables")
                    }
                    PrepError::InvalidConfig(_) | PrepError::JsonError(_) => {
                        ("CONFIG_ERROR", "Check the configuration file and flags")
                    }
                    PrepError::InvalidContrast(_) => {
                        ("CONTRAST_ERROR", "Check the contrast definitions")
                    }
                    PrepError::Io(_) => ("IO_ERROR", "Check file paths and permissions"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            PrepCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            PrepCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more input checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    subject: String,
    checks: Vec<InputCheck>,
}
