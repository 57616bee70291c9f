//! Report generation — predicted vs actual, per layer and per pair.
//!
//! Pure: takes already-computed snapshots, metrics and consensus results and
//! returns a structure. Status labels come only from caller-supplied bands.

use burdencascade_core::{
    AmplificationMetric, ConsensusResult, InstanceConsensusSample, Layer, LayerSnapshot,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// `label` applies when `achievement_pct >= min_pct` and no higher band matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusBand {
    pub min_pct: f64,
    pub label: String,
}

impl StatusBand {
    pub fn new(min_pct: f64, label: impl Into<String>) -> Self {
        Self {
            min_pct,
            label: label.into(),
        }
    }
}

/// Consensus over one metric pair.
#[derive(Debug, Clone, Serialize)]
pub struct ConsensusEntry {
    pub pair: String,
    pub samples: Vec<InstanceConsensusSample>,
    pub result: ConsensusResult,
}

/// A pair (or instance sample) that could not be computed, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedPair {
    pub pair: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricLine {
    pub numerator_layer: Layer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denominator_layer: Option<Layer>,
    pub numerator_total: f64,
    pub denominator_value: f64,
    pub ratio: f64,
    pub predicted_ratio: f64,
    pub achievement_pct: f64,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: Option<DateTime<Utc>>,
    pub total_burden_saved_hours: f64,
    pub total_events: usize,
    pub flagged_events: usize,
    pub layers: Vec<LayerSnapshot>,
    pub metrics: Vec<MetricLine>,
    pub consensus: Vec<ConsensusEntry>,
    pub skipped: Vec<SkippedPair>,
}

/// Highest band whose floor is at or below `achievement_pct`.
pub fn status_for(achievement_pct: f64, bands: &[StatusBand]) -> Option<String> {
    bands
        .iter()
        .filter(|b| b.min_pct <= achievement_pct)
        .max_by(|a, b| a.min_pct.total_cmp(&b.min_pct))
        .map(|b| b.label.clone())
}

/// Assemble a report. Output depends only on the arguments.
pub fn generate_report(
    snapshots: &[LayerSnapshot],
    metrics: &[AmplificationMetric],
    consensus: &[ConsensusEntry],
    bands: &[StatusBand],
    generated_at: DateTime<Utc>,
) -> Report {
    let metrics = metrics
        .iter()
        .map(|m| MetricLine {
            numerator_layer: m.numerator_layer.clone(),
            denominator_layer: m.denominator_layer.clone(),
            numerator_total: m.numerator_total,
            denominator_value: m.denominator_value,
            ratio: m.ratio,
            predicted_ratio: m.predicted_ratio,
            achievement_pct: m.achievement_pct,
            status: status_for(m.achievement_pct, bands),
        })
        .collect();

    let window = snapshots.first().map(|s| s.window());
    Report {
        generated_at,
        window_start: window.map(|w| w.start),
        window_end: window.map(|w| w.end),
        total_burden_saved_hours: snapshots.iter().map(|s| s.total_burden_saved_hours).sum(),
        total_events: snapshots.iter().map(|s| s.event_count).sum(),
        flagged_events: snapshots.iter().map(|s| s.flagged_count).sum(),
        layers: snapshots.to_vec(),
        metrics,
        consensus: consensus.to_vec(),
        skipped: Vec::new(),
    }
}

impl Report {
    pub fn with_skipped(mut self, skipped: Vec<SkippedPair>) -> Self {
        self.skipped = skipped;
        self
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let fmt_ts = |ts: Option<DateTime<Utc>>| {
            ts.map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".to_string())
        };
        let _ = writeln!(
            out,
            "Burden report {} .. {}",
            fmt_ts(self.window_start),
            fmt_ts(self.window_end)
        );
        let _ = writeln!(
            out,
            "Total saved: {:.2}h across {} events ({} flagged)",
            self.total_burden_saved_hours, self.total_events, self.flagged_events
        );

        out.push_str("\nLayers\n");
        for s in &self.layers {
            let _ = writeln!(
                out,
                "  {:<16} {:>10.2}h  {:>5} events  {:>3} flagged",
                s.layer.as_str(),
                s.total_burden_saved_hours,
                s.event_count,
                s.flagged_count
            );
        }

        if !self.metrics.is_empty() {
            out.push_str("\nAmplification\n");
            for m in &self.metrics {
                let pair = match &m.denominator_layer {
                    Some(den) => format!("{}/{}", m.numerator_layer, den),
                    None => format!("{}/baseline", m.numerator_layer),
                };
                let _ = writeln!(
                    out,
                    "  {:<24} ratio {:.4}  predicted {:.4}  achievement {:.2}%  [{}]",
                    pair,
                    m.ratio,
                    m.predicted_ratio,
                    m.achievement_pct,
                    m.status.as_deref().unwrap_or("unrated")
                );
            }
        }

        if !self.consensus.is_empty() {
            out.push_str("\nConsensus\n");
            for c in &self.consensus {
                let _ = writeln!(
                    out,
                    "  {:<24} mean {:.4}  variance {:.6}  n={}  {}",
                    c.pair,
                    c.result.mean,
                    c.result.variance,
                    c.result.sample_count,
                    if c.result.converged { "converged" } else { "diverged" }
                );
            }
        }

        if !self.skipped.is_empty() {
            out.push_str("\nSkipped\n");
            for s in &self.skipped {
                let _ = writeln!(out, "  {:<24} {}", s.pair, s.reason);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_picks_highest_matching_band() {
        let bands = vec![
            StatusBand::new(100.0, "met"),
            StatusBand::new(0.0, "below"),
            StatusBand::new(150.0, "exceeded"),
        ];
        assert_eq!(status_for(133.33, &bands).as_deref(), Some("met"));
        assert_eq!(status_for(12.0, &bands).as_deref(), Some("below"));
        assert_eq!(status_for(900.0, &bands).as_deref(), Some("exceeded"));
    }

    #[test]
    fn no_bands_means_no_status() {
        assert_eq!(status_for(133.33, &[]), None);
        assert_eq!(status_for(f64::NAN, &[StatusBand::new(0.0, "any")]), None);
    }
}
