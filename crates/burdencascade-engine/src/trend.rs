//! Trend smoothing over bucketed burden totals.
//!
//! Two smoothers, both with outputs bounded by the min/max of their inputs:
//! - trailing simple moving average (`window` points, fewer at the start)
//! - exponential smoothing, `s0 = v0`, `s_i = α·v_i + (1-α)·s_{i-1}`, α in (0, 1]

use crate::aggregate::aggregate;
use burdencascade_core::{BurdenEvent, Error, Layer, Result, Window};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Upper bound on buckets per series.
pub const MAX_BUCKETS: i64 = 10_000;

#[derive(Debug, Clone, Serialize)]
pub struct TrendBucket {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub total_burden_saved_hours: f64,
    pub event_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
    #[serde(flatten)]
    pub bucket: TrendBucket,
    pub moving_average: f64,
    pub smoothed: f64,
}

pub fn moving_average(values: &[f64], window: usize) -> Result<Vec<f64>> {
    if window == 0 {
        return Err(Error::InvalidSmoothing(
            "moving-average window must be >= 1".into(),
        ));
    }
    let mut out = Vec::with_capacity(values.len());
    let mut running = 0.0;
    for (i, v) in values.iter().enumerate() {
        running += v;
        if i >= window {
            running -= values[i - window];
        }
        let len = (i + 1).min(window);
        out.push(running / len as f64);
    }
    Ok(out)
}

pub fn exponential_smoothing(values: &[f64], alpha: f64) -> Result<Vec<f64>> {
    if !(alpha > 0.0 && alpha <= 1.0) {
        return Err(Error::InvalidSmoothing(format!(
            "alpha must be in (0, 1], got {alpha}"
        )));
    }
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for v in values {
        let s = match prev {
            None => *v,
            Some(p) => alpha * v + (1.0 - alpha) * p,
        };
        out.push(s);
        prev = Some(s);
    }
    Ok(out)
}

/// Split `window` into fixed-width buckets and aggregate `layer` in each.
/// The final bucket is cut short at `window.end`.
pub fn bucket_totals(
    events: &[Arc<BurdenEvent>],
    layer: &Layer,
    window: Window,
    bucket: Duration,
) -> Result<Vec<TrendBucket>> {
    if bucket <= Duration::zero() {
        return Err(Error::InvalidSmoothing("bucket width must be > 0".into()));
    }
    let span = window.end - window.start;
    let bucket_ms = bucket.num_milliseconds().max(1);
    let count = (span.num_milliseconds() + bucket_ms - 1) / bucket_ms;
    if count > MAX_BUCKETS {
        return Err(Error::InvalidSmoothing(format!(
            "{count} buckets requested, at most {MAX_BUCKETS} allowed"
        )));
    }

    let mut buckets = Vec::with_capacity(count as usize);
    let mut start = window.start;
    while start < window.end {
        let end = (start + bucket).min(window.end);
        let snap = aggregate(events, layer, Window { start, end });
        buckets.push(TrendBucket {
            start,
            end,
            total_burden_saved_hours: snap.total_burden_saved_hours,
            event_count: snap.event_count,
        });
        start = end;
    }
    Ok(buckets)
}

/// Attach both smoothers to a bucket series.
pub fn trend_points(buckets: Vec<TrendBucket>, window: usize, alpha: f64) -> Result<Vec<TrendPoint>> {
    let totals: Vec<f64> = buckets.iter().map(|b| b.total_burden_saved_hours).collect();
    let sma = moving_average(&totals, window)?;
    let ewma = exponential_smoothing(&totals, alpha)?;
    Ok(buckets
        .into_iter()
        .zip(sma.into_iter().zip(ewma))
        .map(|(bucket, (moving_average, smoothed))| TrendPoint {
            bucket,
            moving_average,
            smoothed,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burdencascade_core::EventDraft;
    use chrono::TimeZone;

    #[test]
    fn moving_average_uses_available_points_at_start() {
        let out = moving_average(&[2.0, 4.0, 6.0, 8.0], 2).unwrap();
        assert_eq!(out, vec![2.0, 3.0, 5.0, 7.0]);
    }

    #[test]
    fn moving_average_rejects_zero_window() {
        assert!(moving_average(&[1.0], 0).is_err());
    }

    #[test]
    fn exponential_smoothing_recurrence() {
        let out = exponential_smoothing(&[10.0, 0.0, 0.0], 0.5).unwrap();
        assert_eq!(out, vec![10.0, 5.0, 2.5]);
        assert_eq!(exponential_smoothing(&[1.0, 7.0], 1.0).unwrap(), vec![1.0, 7.0]);
        assert!(exponential_smoothing(&[1.0], 0.0).is_err());
        assert!(exponential_smoothing(&[1.0], 1.5).is_err());
    }

    #[test]
    fn smoothed_values_stay_within_input_range() {
        let values = [3.0, 9.0, 1.0, 4.0, 8.0, 2.0];
        for s in moving_average(&values, 3)
            .unwrap()
            .into_iter()
            .chain(exponential_smoothing(&values, 0.3).unwrap())
        {
            assert!((1.0..=9.0).contains(&s));
        }
    }

    #[test]
    fn buckets_cover_window_and_truncate_last() {
        let start = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 10, 1, 5, 0, 0).unwrap();
        let ev = |hour: u32| {
            Arc::new(
                BurdenEvent::from_draft(
                    EventDraft::new("CORE", "load", 60.0, 0.0),
                    format!("e{hour}"),
                    Utc.with_ymd_and_hms(2026, 10, 1, hour, 30, 0).unwrap(),
                )
                .unwrap(),
            )
        };
        let events = vec![ev(0), ev(1), ev(4)];
        let buckets = bucket_totals(
            &events,
            &Layer::from("CORE"),
            Window::new(start, end).unwrap(),
            Duration::hours(2),
        )
        .unwrap();
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].event_count, 2);
        assert_eq!(buckets[1].event_count, 0);
        assert_eq!(buckets[2].event_count, 1);
        assert_eq!(buckets[2].end, end);
    }

    #[test]
    fn too_many_buckets_is_rejected() {
        let start = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert!(bucket_totals(
            &[],
            &Layer::from("CORE"),
            Window::new(start, end).unwrap(),
            Duration::minutes(1),
        )
        .is_err());
    }
}
