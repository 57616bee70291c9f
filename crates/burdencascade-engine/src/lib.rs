//! Burdencascade Engine — burden accounting pipeline
//!
//! Pipeline:
//! - Recorder: validates operations and appends them to the event log
//! - Store: newline-delimited JSON persistence for the log, with archiving
//! - Aggregate: per-layer totals over half-open windows
//! - Amplify: ratios between layers (α = R2/R1, β = R3/R2, …) vs predictions
//! - Consensus: mean/variance across simulated instances
//! - Trend: bucketed totals with moving-average and exponential smoothing
//! - Report: predicted-vs-actual summary, JSON or text
//!
//! The event log is the only shared state. Everything downstream of it is a
//! pure function of a snapshot.

pub mod aggregate;
pub mod amplify;
pub mod consensus;
pub mod layers;
pub mod recorder;
pub mod report;
pub mod store;
pub mod trend;

pub use aggregate::aggregate;
pub use amplify::{cascade, compute_amplification, compute_layer_amplification, CascadeStep, Prediction};
pub use consensus::{compute_consensus, ConsensusBoard};
pub use layers::LayerRegistry;
pub use recorder::{EventLog, LayerTotals, LogStatus};
pub use report::{generate_report, ConsensusEntry, Report, SkippedPair, StatusBand};
pub use store::{ArchiveOutcome, EventSink, NdjsonStore};
pub use trend::{bucket_totals, exponential_smoothing, moving_average, TrendBucket, TrendPoint};

pub use burdencascade_core::{Error, ErrorKind, Result};
