//! record → aggregate → amplify → consensus → report, wired for the CLI.

use crate::config::BurdenConfig;
use burdencascade_core::{InstanceConsensusSample, Window};
use burdencascade_engine::{
    cascade, compute_consensus, generate_report, CascadeStep, ConsensusEntry, EventLog, Prediction,
    Report, SkippedPair,
};
use chrono::{DateTime, Utc};

/// Build the full report for `window` from one pass over the log.
///
/// Pairs that cannot be computed (zero denominator, unknown layer, …) land in
/// `report.skipped` with the reason.
pub fn build_report(
    log: &EventLog,
    window: Window,
    config: &BurdenConfig,
    generated_at: DateTime<Utc>,
) -> Report {
    let (predictions, mut skipped) = config.predictions(log.registry());

    let snapshots = log.aggregate_all(window);
    let mut metrics = Vec::new();
    for step in cascade(&snapshots, &predictions) {
        match step.outcome {
            Ok(metric) => metrics.push(metric),
            Err(e) => skipped.push(SkippedPair {
                pair: step.prediction.label(),
                reason: e.to_string(),
            }),
        }
    }

    let consensus = instance_consensus(
        log,
        window,
        &predictions,
        config.consensus.epsilon,
        &mut skipped,
    );

    generate_report(
        &snapshots,
        &metrics,
        &consensus,
        &config.report.bands,
        generated_at,
    )
    .with_skipped(skipped)
}

/// Per prediction, one ratio sample per tagged instance, merged into a consensus.
fn instance_consensus(
    log: &EventLog,
    window: Window,
    predictions: &[Prediction],
    epsilon: f64,
    skipped: &mut Vec<SkippedPair>,
) -> Vec<ConsensusEntry> {
    let per_instance: Vec<(String, Vec<CascadeStep>)> = log
        .instances()
        .into_iter()
        .map(|instance| {
            let snapshots = log.aggregate_all_for_instance(&instance, window);
            let steps = cascade(&snapshots, predictions);
            (instance, steps)
        })
        .collect();
    if per_instance.is_empty() {
        return Vec::new();
    }

    let mut entries = Vec::new();
    for (idx, prediction) in predictions.iter().enumerate() {
        let mut samples = Vec::new();
        for (instance, steps) in &per_instance {
            match &steps[idx].outcome {
                Ok(metric) => samples.push(InstanceConsensusSample::new(instance.clone(), metric.ratio)),
                Err(e) => skipped.push(SkippedPair {
                    pair: format!("{} @ {}", prediction.label(), instance),
                    reason: e.to_string(),
                }),
            }
        }
        match compute_consensus(&samples, epsilon) {
            Ok(result) => entries.push(ConsensusEntry {
                pair: prediction.label(),
                samples,
                result,
            }),
            Err(e) => skipped.push(SkippedPair {
                pair: format!("{} consensus", prediction.label()),
                reason: e.to_string(),
            }),
        }
    }
    entries
}
