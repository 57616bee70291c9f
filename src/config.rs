//! Burdencascade configuration
//!
//! Layer names, predicted ratios, consensus epsilon, report bands and trend
//! defaults. Loaded from TOML at startup, falls back to defaults if no config
//! file exists. The engine never reads this file; values are passed in.

use burdencascade_core::Layer;
use burdencascade_engine::{LayerRegistry, Prediction, SkippedPair, StatusBand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BurdenConfig {
    /// Cascade order, lowest layer first.
    pub layers: LayerConfig,
    /// Event log location.
    pub store: StoreConfig,
    /// Predicted ratios per layer pair.
    pub amplification: AmplificationConfig,
    /// Consensus convergence threshold.
    pub consensus: ConsensusConfig,
    /// Status labels by achievement percentage.
    pub report: ReportConfig,
    /// Defaults for the `trend` command.
    pub trend: TrendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Newline-delimited JSON event log.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AmplificationConfig {
    /// No targets are shipped; an empty list means the report has no metrics.
    pub predictions: Vec<PredictionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionConfig {
    pub numerator: String,
    pub denominator: String,
    pub ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Variance at or below this counts as converged.
    pub epsilon: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub bands: Vec<StatusBand>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub bucket_hours: u32,
    /// Moving-average width in buckets.
    pub window: usize,
    /// Exponential smoothing factor, in (0, 1].
    pub alpha: f64,
}

// ============================================================
// Defaults
// ============================================================

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            names: burdencascade_core::DEFAULT_LAYERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("burden-events.ndjson"),
        }
    }
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self { epsilon: 0.01 }
    }
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self { bucket_hours: 24, window: 7, alpha: 0.3 }
    }
}

// ============================================================
// Loading
// ============================================================

impl BurdenConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {} — using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {} — using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    pub fn registry(&self) -> burdencascade_core::Result<LayerRegistry> {
        LayerRegistry::new(&self.layers.names)
    }

    /// Resolve configured predictions against the registry. Unresolvable
    /// entries come back as skipped pairs rather than being dropped silently.
    pub fn predictions(&self, registry: &LayerRegistry) -> (Vec<Prediction>, Vec<SkippedPair>) {
        let mut resolved = Vec::new();
        let mut skipped = Vec::new();
        for p in &self.amplification.predictions {
            let pair = format!("{}/{}", p.numerator, p.denominator);
            match (registry.resolve(&p.numerator), registry.resolve(&p.denominator)) {
                (Ok(num), Ok(den)) => resolved.push(Prediction::new(num, den, p.ratio)),
                (Err(e), _) | (_, Err(e)) => skipped.push(SkippedPair {
                    pair,
                    reason: e.to_string(),
                }),
            }
        }
        (resolved, skipped)
    }

    /// One prediction per adjacent pair, all with the same ratio.
    pub fn adjacent_predictions(registry: &LayerRegistry, ratio: f64) -> Vec<PredictionConfig> {
        registry
            .adjacent_pairs()
            .into_iter()
            .map(|(upper, lower): (Layer, Layer)| PredictionConfig {
                numerator: upper.to_string(),
                denominator: lower.to_string(),
                ratio,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_no_targets() {
        let config = BurdenConfig::default();
        assert!(config.amplification.predictions.is_empty());
        assert!(config.report.bands.is_empty());
        assert_eq!(config.consensus.epsilon, 0.01);
        assert_eq!(config.layers.names.len(), 5);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config: BurdenConfig = toml::from_str(
            r#"
            [consensus]
            epsilon = 0.5

            [[amplification.predictions]]
            numerator = "BRIDGES"
            denominator = "CORE"
            ratio = 1.5
            "#,
        )
        .unwrap();
        assert_eq!(config.consensus.epsilon, 0.5);
        assert_eq!(config.amplification.predictions.len(), 1);
        assert_eq!(config.trend.bucket_hours, 24);
        assert_eq!(config.store.path, PathBuf::from("burden-events.ndjson"));
    }

    #[test]
    fn unresolvable_prediction_is_reported() {
        let mut config = BurdenConfig::default();
        config.amplification.predictions = vec![
            PredictionConfig { numerator: "r2".into(), denominator: "r1".into(), ratio: 2.0 },
            PredictionConfig { numerator: "OMEGA".into(), denominator: "CORE".into(), ratio: 2.0 },
        ];
        let registry = config.registry().unwrap();
        let (resolved, skipped) = config.predictions(&registry);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].label(), "BRIDGES/CORE");
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].pair, "OMEGA/CORE");
    }

    #[test]
    fn default_config_roundtrips_through_toml() {
        let text = BurdenConfig::default().to_toml();
        let back: BurdenConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.layers.names, BurdenConfig::default().layers.names);
    }
}
