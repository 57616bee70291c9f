//! Consensus across simulated instances: plain descriptive statistics.
//!
//! There is no network and no voting here: each instance contributes one
//! metric value and the result is their mean and population variance.

use burdencascade_core::{ConsensusResult, Error, InstanceConsensusSample, Result};
use dashmap::DashMap;
use tracing::debug;

/// Mean, population variance and `converged = variance <= epsilon`.
pub fn compute_consensus(
    samples: &[InstanceConsensusSample],
    epsilon: f64,
) -> Result<ConsensusResult> {
    let first = samples.first().ok_or(Error::EmptySampleSet)?;
    if !epsilon.is_finite() || epsilon < 0.0 {
        return Err(Error::InvalidEpsilon { value: epsilon });
    }
    if let Some(bad) = samples.iter().find(|s| !s.metric_value.is_finite()) {
        return Err(Error::InvalidSample {
            instance: bad.instance_id.clone(),
            value: bad.metric_value,
        });
    }

    let n = samples.len() as f64;
    // Shift by the first value so identical samples give an exact mean and zero variance.
    let shift = first.metric_value;
    let mean = shift + samples.iter().map(|s| s.metric_value - shift).sum::<f64>() / n;
    let variance = samples
        .iter()
        .map(|s| {
            let d = s.metric_value - mean;
            d * d
        })
        .sum::<f64>()
        / n;

    let min = samples.iter().map(|s| s.metric_value).fold(f64::INFINITY, f64::min);
    let max = samples
        .iter()
        .map(|s| s.metric_value)
        .fold(f64::NEG_INFINITY, f64::max);

    let result = ConsensusResult {
        mean,
        variance,
        std_dev: variance.sqrt(),
        min,
        max,
        sample_count: samples.len(),
        epsilon,
        converged: variance <= epsilon,
    };
    debug!(
        samples = result.sample_count,
        mean = result.mean,
        variance = result.variance,
        converged = result.converged,
        "Computed consensus"
    );
    Ok(result)
}

/// Latest metric value per instance, safe to post to from many threads.
#[derive(Default)]
pub struct ConsensusBoard {
    samples: DashMap<String, f64>,
}

impl ConsensusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post (or replace) an instance's value.
    pub fn post(&self, instance_id: impl Into<String>, metric_value: f64) -> Result<()> {
        let instance_id = instance_id.into();
        if !metric_value.is_finite() {
            return Err(Error::InvalidSample {
                instance: instance_id,
                value: metric_value,
            });
        }
        self.samples.insert(instance_id, metric_value);
        Ok(())
    }

    pub fn remove(&self, instance_id: &str) -> Option<f64> {
        self.samples.remove(instance_id).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Current samples ordered by instance id.
    pub fn samples(&self) -> Vec<InstanceConsensusSample> {
        let mut out: Vec<InstanceConsensusSample> = self
            .samples
            .iter()
            .map(|entry| InstanceConsensusSample::new(entry.key().clone(), *entry.value()))
            .collect();
        out.sort_by(|a, b| a.instance_id.cmp(&b.instance_id));
        out
    }

    pub fn consensus(&self, epsilon: f64) -> Result<ConsensusResult> {
        compute_consensus(&self.samples(), epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(values: &[f64]) -> Vec<InstanceConsensusSample> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| InstanceConsensusSample::new(format!("instance-{}", i + 1), *v))
            .collect()
    }

    #[test]
    fn identical_samples_converge_exactly_even_at_zero_epsilon() {
        for v in [0.1, 1.0 / 3.0, 2.5e7, 0.0] {
            let result = compute_consensus(&samples(&[v, v, v]), 0.0).unwrap();
            assert_eq!(result.mean, v);
            assert_eq!(result.variance, 0.0);
            assert!(result.converged);
        }
    }

    #[test]
    fn population_variance_divides_by_n() {
        let result = compute_consensus(&samples(&[1.0, 2.0, 3.0]), 0.5).unwrap();
        assert!((result.mean - 2.0).abs() < 1e-12);
        assert!((result.variance - 2.0 / 3.0).abs() < 1e-12);
        assert!(!result.converged);
        assert_eq!(result.min, 1.0);
        assert_eq!(result.max, 3.0);
    }

    #[test]
    fn single_sample_trivially_converges() {
        let result = compute_consensus(&samples(&[4.2]), 0.0).unwrap();
        assert_eq!(result.variance, 0.0);
        assert!(result.converged);
    }

    #[test]
    fn bad_epsilon_and_samples_are_rejected() {
        assert!(matches!(
            compute_consensus(&samples(&[1.0]), -0.1),
            Err(Error::InvalidEpsilon { .. })
        ));
        assert!(matches!(
            compute_consensus(&samples(&[1.0, f64::INFINITY]), 0.1),
            Err(Error::InvalidSample { .. })
        ));
    }

    #[test]
    fn empty_input_is_reported_before_a_bad_epsilon() {
        assert!(matches!(
            compute_consensus(&[], -1.0),
            Err(Error::EmptySampleSet)
        ));
    }

    #[test]
    fn board_keeps_latest_value_per_instance() {
        let board = ConsensusBoard::new();
        board.post("b", 2.0).unwrap();
        board.post("a", 1.0).unwrap();
        board.post("a", 3.0).unwrap();
        let s = board.samples();
        assert_eq!(s.len(), 2);
        assert_eq!(s[0], InstanceConsensusSample::new("a", 3.0));
        assert_eq!(board.consensus(10.0).unwrap().mean, 2.5);
        assert_eq!(board.remove("a"), Some(3.0));
        assert_eq!(board.len(), 1);
    }
}
