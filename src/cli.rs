//! Command-line surface and dispatch.
//!
//! Exit codes:
//!   0  success
//!   1  unknown layer (aggregate/amplify/trend), I/O, config
//!   2  invalid input (durations, layer on record, windows, parameters)
//!   3  division / prediction precondition violated
//!   4  no consensus values supplied

use crate::config::BurdenConfig;
use crate::pipeline::build_report;
use crate::timearg::parse_time;
use burdencascade_core::{EventDraft, InstanceConsensusSample, Window};
use burdencascade_engine::trend::{bucket_totals, trend_points, TrendPoint};
use burdencascade_engine::{
    compute_amplification, compute_consensus, Error, ErrorKind, EventLog, LayerRegistry,
    LogStatus, NdjsonStore,
};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_INVALID_INPUT: i32 = 2;
pub const EXIT_COMPUTATION: i32 = 3;
pub const EXIT_EMPTY_INPUT: i32 = 4;

pub const DEFAULT_CONFIG: &str = "burdencascade.toml";

#[derive(Parser, Debug)]
#[command(
    name = "burdencascade",
    about = "Burden cascade accounting — record, aggregate, amplify, report",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Event log (newline-delimited JSON). Default: [store].path from config
    #[arg(long, global = true)]
    pub events: Option<PathBuf>,

    /// Path to config file (TOML)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Write diagnostics to a file as JSON (in addition to stderr)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record one completed operation
    #[command(allow_negative_numbers = true)]
    Record {
        layer: String,
        operation_type: String,
        manual_minutes: f64,
        automated_minutes: f64,
        /// Instance that performed the operation
        #[arg(long)]
        instance: Option<String>,
        /// Backfill timestamp (default: now)
        #[arg(long, allow_hyphen_values = true)]
        at: Option<String>,
    },
    /// Print a layer snapshot for [start, end)
    Aggregate {
        layer: String,
        #[arg(allow_hyphen_values = true)]
        window_start: String,
        #[arg(allow_hyphen_values = true)]
        window_end: String,
    },
    /// Ratio of a layer's total over a fixed denominator
    #[command(allow_negative_numbers = true)]
    Amplify {
        numerator_layer: String,
        denominator_value: f64,
        predicted_ratio: f64,
        #[arg(long, default_value = "1970-01-01", allow_hyphen_values = true)]
        start: String,
        #[arg(long, default_value = "now", allow_hyphen_values = true)]
        end: String,
    },
    /// Mean/variance across instance values
    #[command(allow_negative_numbers = true)]
    Consensus {
        epsilon: f64,
        values: Vec<f64>,
    },
    /// Combined report for [start, end)
    Report {
        #[arg(allow_hyphen_values = true)]
        window_start: String,
        #[arg(allow_hyphen_values = true)]
        window_end: String,
        /// Plain text instead of JSON
        #[arg(long)]
        text: bool,
    },
    /// Per-layer totals over the whole log
    Status,
    /// Bucketed totals with moving-average and exponential smoothing
    Trend {
        layer: String,
        #[arg(allow_hyphen_values = true)]
        window_start: String,
        #[arg(allow_hyphen_values = true)]
        window_end: String,
        #[arg(long)]
        bucket_hours: Option<u32>,
        /// Moving-average width in buckets
        #[arg(long)]
        window: Option<usize>,
        #[arg(long)]
        alpha: Option<f64>,
    },
    /// Move events older than BEFORE into the archive file
    Archive {
        #[arg(allow_hyphen_values = true)]
        before: String,
    },
    /// Print the effective config as TOML
    Config {
        /// Fill in one prediction per adjacent layer pair with this ratio
        #[arg(long)]
        predict_adjacent: Option<f64>,
    },
}

/// Which command failed; exit codes depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Record,
    Aggregate,
    Amplify,
    Consensus,
    Report,
    Status,
    Trend,
    Archive,
    Config,
}

#[derive(Debug)]
pub struct CommandError {
    pub code: i32,
    pub message: String,
}

impl CommandError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn invalid(err: anyhow::Error) -> Self {
        Self::new(EXIT_INVALID_INPUT, err.to_string())
    }

    fn engine(op: Op, err: Error) -> Self {
        Self::new(exit_code(op, &err), err.to_string())
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

pub fn exit_code(op: Op, err: &Error) -> i32 {
    match (op, err.kind()) {
        (_, ErrorKind::Storage) => EXIT_FAILURE,
        (Op::Record, _) => EXIT_INVALID_INPUT,
        (_, ErrorKind::InputValidation) if matches!(err, Error::UnknownLayer(_)) => EXIT_FAILURE,
        (_, ErrorKind::InputValidation) => EXIT_INVALID_INPUT,
        (_, ErrorKind::Computation) => EXIT_COMPUTATION,
        (_, ErrorKind::EmptyInput) => EXIT_EMPTY_INPUT,
    }
}

/// Execute a parsed command and return what it prints on stdout.
pub fn run(cli: &Cli) -> Result<String, CommandError> {
    let config = BurdenConfig::load(&cli.config);
    let now = Utc::now();

    match &cli.command {
        Commands::Consensus { epsilon, values } => {
            let samples: Vec<InstanceConsensusSample> = values
                .iter()
                .enumerate()
                .map(|(i, v)| InstanceConsensusSample::new(format!("instance-{}", i + 1), *v))
                .collect();
            let result =
                compute_consensus(&samples, *epsilon).map_err(|e| CommandError::engine(Op::Consensus, e))?;
            to_json(&result)
        }
        Commands::Config { predict_adjacent } => {
            let mut config = config;
            if let Some(ratio) = predict_adjacent {
                let registry = registry(&config)?;
                config.amplification.predictions =
                    BurdenConfig::adjacent_predictions(&registry, *ratio);
            }
            Ok(config.to_toml())
        }
        Commands::Archive { before } => {
            let cutoff = parse_time(before, now).map_err(CommandError::invalid)?;
            let store = NdjsonStore::new(events_path(cli, &config));
            let outcome = store
                .archive_before(cutoff)
                .map_err(|e| CommandError::engine(Op::Archive, e))?;
            to_json(&outcome)
        }
        command => {
            let store = Arc::new(NdjsonStore::new(events_path(cli, &config)));
            let log = EventLog::open(registry(&config)?, store.clone())
                .map_err(|e| CommandError::engine(op_of(command), e))?;
            run_with_log(command, &log, store.path(), &config, now)
        }
    }
}

fn run_with_log(
    command: &Commands,
    log: &EventLog,
    events_path: &Path,
    config: &BurdenConfig,
    now: DateTime<Utc>,
) -> Result<String, CommandError> {
    match command {
        Commands::Record {
            layer,
            operation_type,
            manual_minutes,
            automated_minutes,
            instance,
            at,
        } => {
            let timestamp = match at {
                Some(at) => parse_time(at, now).map_err(CommandError::invalid)?,
                None => now,
            };
            let mut draft = EventDraft::new(
                layer.as_str(),
                operation_type.as_str(),
                *manual_minutes,
                *automated_minutes,
            );
            if let Some(instance) = instance {
                draft = draft.with_instance(instance.as_str());
            }
            let event = log
                .record_draft_at(draft, timestamp)
                .map_err(|e| CommandError::engine(Op::Record, e))?;
            to_json(&event)
        }
        Commands::Aggregate {
            layer,
            window_start,
            window_end,
        } => {
            let (start, end) = parse_bounds(window_start, window_end, now)?;
            let snapshot = log
                .aggregate(layer, start, end)
                .map_err(|e| CommandError::engine(Op::Aggregate, e))?;
            to_json(&snapshot)
        }
        Commands::Amplify {
            numerator_layer,
            denominator_value,
            predicted_ratio,
            start,
            end,
        } => {
            let (start, end) = parse_bounds(start, end, now)?;
            let snapshot = log
                .aggregate(numerator_layer, start, end)
                .map_err(|e| CommandError::engine(Op::Amplify, e))?;
            let metric = compute_amplification(&snapshot, *denominator_value, *predicted_ratio)
                .map_err(|e| CommandError::engine(Op::Amplify, e))?;
            to_json(&metric)
        }
        Commands::Report {
            window_start,
            window_end,
            text,
        } => {
            let window = window(window_start, window_end, now, Op::Report)?;
            let report = build_report(log, window, config, now);
            if *text {
                Ok(report.render_text())
            } else {
                to_json(&report)
            }
        }
        Commands::Status => {
            #[derive(Serialize)]
            struct StatusView<'a> {
                events_path: &'a Path,
                #[serde(flatten)]
                status: LogStatus,
            }
            to_json(&StatusView {
                events_path,
                status: log.status(),
            })
        }
        Commands::Trend {
            layer,
            window_start,
            window_end,
            bucket_hours,
            window: sma_window,
            alpha,
        } => {
            #[derive(Serialize)]
            struct TrendView {
                layer: String,
                bucket_hours: u32,
                window: usize,
                alpha: f64,
                points: Vec<TrendPoint>,
            }
            let span = window(window_start, window_end, now, Op::Trend)?;
            let layer = log
                .registry()
                .resolve(layer)
                .map_err(|e| CommandError::engine(Op::Trend, e))?;
            let bucket_hours = bucket_hours.unwrap_or(config.trend.bucket_hours);
            let sma_window = sma_window.unwrap_or(config.trend.window);
            let alpha = alpha.unwrap_or(config.trend.alpha);

            let buckets = bucket_totals(
                &log.snapshot(),
                &layer,
                span,
                Duration::hours(i64::from(bucket_hours)),
            )
            .and_then(|buckets| trend_points(buckets, sma_window, alpha))
            .map_err(|e| CommandError::engine(Op::Trend, e))?;
            to_json(&TrendView {
                layer: layer.to_string(),
                bucket_hours,
                window: sma_window,
                alpha,
                points: buckets,
            })
        }
        Commands::Consensus { .. } | Commands::Archive { .. } | Commands::Config { .. } => {
            Err(CommandError::new(EXIT_FAILURE, "command does not read the event log"))
        }
    }
}

fn op_of(command: &Commands) -> Op {
    match command {
        Commands::Record { .. } => Op::Record,
        Commands::Aggregate { .. } => Op::Aggregate,
        Commands::Amplify { .. } => Op::Amplify,
        Commands::Consensus { .. } => Op::Consensus,
        Commands::Report { .. } => Op::Report,
        Commands::Status => Op::Status,
        Commands::Trend { .. } => Op::Trend,
        Commands::Archive { .. } => Op::Archive,
        Commands::Config { .. } => Op::Config,
    }
}

fn registry(config: &BurdenConfig) -> Result<LayerRegistry, CommandError> {
    config
        .registry()
        .map_err(|e| CommandError::new(EXIT_FAILURE, format!("invalid [layers] config: {e}")))
}

fn events_path(cli: &Cli, config: &BurdenConfig) -> PathBuf {
    cli.events
        .clone()
        .unwrap_or_else(|| config.store.path.clone())
}

fn parse_bounds(
    start: &str,
    end: &str,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), CommandError> {
    let start = parse_time(start, now).map_err(CommandError::invalid)?;
    let end = parse_time(end, now).map_err(CommandError::invalid)?;
    Ok((start, end))
}

fn window(start: &str, end: &str, now: DateTime<Utc>, op: Op) -> Result<Window, CommandError> {
    let (start, end) = parse_bounds(start, end, now)?;
    Window::new(start, end).map_err(|e| CommandError::engine(op, e))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, CommandError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CommandError::new(EXIT_FAILURE, format!("json error: {e}")))
}
