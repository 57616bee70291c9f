//! Core types for Burdencascade

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Layer identifier - cheaply cloneable
#[derive(Clone, Debug, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Layer(Arc<str>);

impl Layer {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::from(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Layer {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Layer {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<Layer> for String {
    fn from(layer: Layer) -> Self {
        layer.0.to_string()
    }
}

/// Default cascade, R1 through R5.
pub const DEFAULT_LAYERS: [&str; 5] = ["CORE", "BRIDGES", "META", "META_META", "META_META_META"];

const MINUTES_PER_HOUR: f64 = 60.0;

/// Half-open reporting window `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end < start {
            return Err(Error::InvalidWindow {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Raised on an event whose numbers looked wrong at record time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventWarning {
    /// Automation took longer than the manual estimate. Savings were recorded as 0.
    NegativeSavings { excess_minutes: f64 },
}

impl std::fmt::Display for EventWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventWarning::NegativeSavings { excess_minutes } => write!(
                f,
                "automated_minutes exceeds manual_minutes by {excess_minutes} min"
            ),
        }
    }
}

/// Caller input for one recorded operation, before it is stamped.
#[derive(Clone, Debug)]
pub struct EventDraft {
    pub layer: Layer,
    pub operation_type: String,
    pub manual_minutes: f64,
    pub automated_minutes: f64,
    pub instance: Option<String>,
}

impl EventDraft {
    pub fn new(
        layer: impl Into<Layer>,
        operation_type: impl Into<String>,
        manual_minutes: f64,
        automated_minutes: f64,
    ) -> Self {
        Self {
            layer: layer.into(),
            operation_type: operation_type.into(),
            manual_minutes,
            automated_minutes,
            instance: None,
        }
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Checks everything except layer membership, which needs a registry.
    pub fn validate(&self) -> Result<()> {
        check_duration("manual_minutes", self.manual_minutes)?;
        check_duration("automated_minutes", self.automated_minutes)?;
        if self.operation_type.trim().is_empty() {
            return Err(Error::InvalidOperation);
        }
        Ok(())
    }
}

fn check_duration(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::invalid_duration(field, value));
    }
    Ok(())
}

/// One recorded workflow operation. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BurdenEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub layer: Layer,
    pub operation_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    pub manual_minutes: f64,
    pub automated_minutes: f64,
    pub burden_saved_hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<EventWarning>,
}

impl BurdenEvent {
    /// Stamp a validated draft. Savings are clamped at zero and flagged when negative.
    pub fn from_draft(draft: EventDraft, id: String, timestamp: DateTime<Utc>) -> Result<Self> {
        draft.validate()?;
        let (burden_saved_hours, warning) =
            burden_saved(draft.manual_minutes, draft.automated_minutes);
        Ok(Self {
            id,
            timestamp,
            layer: draft.layer,
            operation_type: draft.operation_type,
            instance: draft.instance,
            manual_minutes: draft.manual_minutes,
            automated_minutes: draft.automated_minutes,
            burden_saved_hours,
            warning,
        })
    }

    pub fn is_flagged(&self) -> bool {
        self.warning.is_some()
    }
}

/// (manual - automated) / 60, clamped at zero. Returns the flag when clamping happened.
pub fn burden_saved(manual_minutes: f64, automated_minutes: f64) -> (f64, Option<EventWarning>) {
    let delta = manual_minutes - automated_minutes;
    if delta < 0.0 {
        (
            0.0,
            Some(EventWarning::NegativeSavings {
                excess_minutes: -delta,
            }),
        )
    } else {
        (delta / MINUTES_PER_HOUR, None)
    }
}

/// Aggregated burden for one layer over a window. Derived, never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerSnapshot {
    pub layer: Layer,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub total_burden_saved_hours: f64,
    pub event_count: usize,
    pub flagged_count: usize,
}

impl LayerSnapshot {
    pub fn empty(layer: Layer, window: Window) -> Self {
        Self {
            layer,
            window_start: window.start,
            window_end: window.end,
            total_burden_saved_hours: 0.0,
            event_count: 0,
            flagged_count: 0,
        }
    }

    pub fn window(&self) -> Window {
        Window {
            start: self.window_start,
            end: self.window_end,
        }
    }
}

/// Ratio between a layer's total and a denominator (another layer or a fixed baseline).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AmplificationMetric {
    pub numerator_layer: Layer,
    /// `None` when the denominator is a fixed baseline rather than a layer.
    pub denominator_layer: Option<Layer>,
    pub numerator_total: f64,
    pub denominator_value: f64,
    pub ratio: f64,
    pub predicted_ratio: f64,
    pub achievement_pct: f64,
}

impl AmplificationMetric {
    /// `BRIDGES/CORE` style label; `CORE/baseline` for fixed denominators.
    pub fn pair_label(&self) -> String {
        match &self.denominator_layer {
            Some(den) => format!("{}/{}", self.numerator_layer, den),
            None => format!("{}/baseline", self.numerator_layer),
        }
    }
}

/// One simulated instance's observed metric value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstanceConsensusSample {
    pub instance_id: String,
    pub metric_value: f64,
}

impl InstanceConsensusSample {
    pub fn new(instance_id: impl Into<String>, metric_value: f64) -> Self {
        Self {
            instance_id: instance_id.into(),
            metric_value,
        }
    }
}

/// Descriptive summary of a set of samples. Derived, not stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub mean: f64,
    /// Population variance (divides by n).
    pub variance: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub sample_count: usize,
    pub epsilon: f64,
    pub converged: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burden_saved_converts_minutes_to_hours() {
        let (hours, warning) = burden_saved(90.0, 30.0);
        assert!((hours - 1.0).abs() < 1e-12);
        assert!(warning.is_none());
    }

    #[test]
    fn burden_saved_flags_instead_of_going_negative() {
        let (hours, warning) = burden_saved(10.0, 15.0);
        assert_eq!(hours, 0.0);
        assert_eq!(
            warning,
            Some(EventWarning::NegativeSavings {
                excess_minutes: 5.0
            })
        );
    }

    #[test]
    fn window_rejects_reversed_bounds() {
        let now = Utc::now();
        let earlier = now - chrono::Duration::hours(1);
        assert!(Window::new(now, earlier).is_err());
        assert!(Window::new(now, now).unwrap().is_empty());
    }
}
