//! Amplification — ratio of burden saved between layers, against a prediction.
//!
//! Values are reported exactly as computed. A ratio of 9.0 against a
//! prediction of 1.0 is 900%, not "capped" or "rounded to target".

use burdencascade_core::{AmplificationMetric, Error, Layer, LayerSnapshot, Result};
use serde::{Deserialize, Serialize};

/// `ratio = numerator.total / denominator_value`, where the denominator is a fixed baseline.
pub fn compute_amplification(
    numerator: &LayerSnapshot,
    denominator_value: f64,
    predicted_ratio: f64,
) -> Result<AmplificationMetric> {
    build_metric(numerator, None, denominator_value, predicted_ratio)
}

/// Ratio between two layer snapshots, e.g. BRIDGES over CORE.
pub fn compute_layer_amplification(
    numerator: &LayerSnapshot,
    denominator: &LayerSnapshot,
    predicted_ratio: f64,
) -> Result<AmplificationMetric> {
    build_metric(
        numerator,
        Some(denominator.layer.clone()),
        denominator.total_burden_saved_hours,
        predicted_ratio,
    )
}

fn build_metric(
    numerator: &LayerSnapshot,
    denominator_layer: Option<Layer>,
    denominator_value: f64,
    predicted_ratio: f64,
) -> Result<AmplificationMetric> {
    if !denominator_value.is_finite() || denominator_value <= 0.0 {
        return Err(Error::DivisionByZero {
            value: denominator_value,
        });
    }
    if !predicted_ratio.is_finite() || predicted_ratio <= 0.0 {
        return Err(Error::InvalidPrediction {
            value: predicted_ratio,
        });
    }
    let ratio = numerator.total_burden_saved_hours / denominator_value;
    Ok(AmplificationMetric {
        numerator_layer: numerator.layer.clone(),
        denominator_layer,
        numerator_total: numerator.total_burden_saved_hours,
        denominator_value,
        ratio,
        predicted_ratio,
        achievement_pct: ratio / predicted_ratio * 100.0,
    })
}

/// Externally supplied target for one layer pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub numerator: Layer,
    pub denominator: Layer,
    pub ratio: f64,
}

impl Prediction {
    pub fn new(numerator: impl Into<Layer>, denominator: impl Into<Layer>, ratio: f64) -> Self {
        Self {
            numerator: numerator.into(),
            denominator: denominator.into(),
            ratio,
        }
    }

    pub fn label(&self) -> String {
        format!("{}/{}", self.numerator, self.denominator)
    }
}

/// One evaluated prediction. Failures are kept, never replaced by a default ratio.
#[derive(Debug)]
pub struct CascadeStep {
    pub prediction: Prediction,
    pub outcome: Result<AmplificationMetric>,
}

/// Evaluate each prediction against the snapshots, in prediction order.
///
/// Predictions usually name adjacent layers (α = R2/R1, β = R3/R2, …) but
/// any pair present in `snapshots` works.
pub fn cascade(snapshots: &[LayerSnapshot], predictions: &[Prediction]) -> Vec<CascadeStep> {
    let find = |layer: &Layer| {
        snapshots
            .iter()
            .find(|s| &s.layer == layer)
            .ok_or_else(|| Error::unknown_layer(layer.as_str()))
    };
    predictions
        .iter()
        .map(|prediction| {
            let outcome = find(&prediction.numerator).and_then(|num| {
                let den = find(&prediction.denominator)?;
                compute_layer_amplification(num, den, prediction.ratio)
            });
            CascadeStep {
                prediction: prediction.clone(),
                outcome,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burdencascade_core::Window;
    use chrono::{TimeZone, Utc};

    fn snapshot(layer: &str, total: f64) -> LayerSnapshot {
        let start = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 10, 8, 0, 0, 0).unwrap();
        let mut snap = LayerSnapshot::empty(Layer::from(layer), Window::new(start, end).unwrap());
        snap.total_burden_saved_hours = total;
        snap
    }

    #[test]
    fn exceeding_prediction_is_not_clamped() {
        let metric = compute_amplification(&snapshot("META", 90.0), 10.0, 1.0).unwrap();
        assert_eq!(metric.ratio, 9.0);
        assert!((metric.achievement_pct - 900.0).abs() < 1e-9);
    }

    #[test]
    fn non_finite_denominator_is_division_error() {
        assert!(matches!(
            compute_amplification(&snapshot("META", 1.0), f64::NAN, 1.0),
            Err(Error::DivisionByZero { .. })
        ));
    }

    #[test]
    fn layer_pair_records_denominator_layer() {
        let metric =
            compute_layer_amplification(&snapshot("BRIDGES", 6.0), &snapshot("CORE", 4.0), 1.5)
                .unwrap();
        assert_eq!(metric.denominator_layer, Some(Layer::from("CORE")));
        assert_eq!(metric.ratio, 1.5);
        assert_eq!(metric.pair_label(), "BRIDGES/CORE");
    }

    #[test]
    fn cascade_keeps_failures_alongside_successes() {
        let snaps = vec![
            snapshot("CORE", 0.0),
            snapshot("BRIDGES", 3.0),
            snapshot("META", 6.0),
        ];
        let steps = cascade(
            &snaps,
            &[
                Prediction::new("BRIDGES", "CORE", 2.0),
                Prediction::new("META", "BRIDGES", 2.0),
                Prediction::new("OMEGA", "META", 1.0),
            ],
        );
        assert_eq!(steps.len(), 3);
        assert!(matches!(steps[0].outcome, Err(Error::DivisionByZero { .. })));
        assert_eq!(steps[1].outcome.as_ref().unwrap().ratio, 2.0);
        assert!(matches!(steps[2].outcome, Err(Error::UnknownLayer(_))));
    }
}
