//! Layer aggregation over half-open windows `[start, end)`.
//!
//! Pure functions of an event slice. Summation follows slice order, so the
//! same snapshot always produces a bit-identical result.

use burdencascade_core::{BurdenEvent, Layer, LayerSnapshot, Window};
use std::sync::Arc;

/// Sum burden saved by `layer` within `window`.
pub fn aggregate(events: &[Arc<BurdenEvent>], layer: &Layer, window: Window) -> LayerSnapshot {
    aggregate_matching(events, layer, window, |_| true)
}

/// Same as [`aggregate`], restricted to events tagged with `instance`.
pub fn aggregate_instance(
    events: &[Arc<BurdenEvent>],
    layer: &Layer,
    instance: &str,
    window: Window,
) -> LayerSnapshot {
    aggregate_matching(events, layer, window, |e| {
        e.instance.as_deref() == Some(instance)
    })
}

pub fn aggregate_matching<F>(
    events: &[Arc<BurdenEvent>],
    layer: &Layer,
    window: Window,
    filter: F,
) -> LayerSnapshot
where
    F: Fn(&BurdenEvent) -> bool,
{
    let mut snapshot = LayerSnapshot::empty(layer.clone(), window);
    for event in events {
        if &event.layer != layer || !window.contains(event.timestamp) || !filter(event) {
            continue;
        }
        snapshot.total_burden_saved_hours += event.burden_saved_hours;
        snapshot.event_count += 1;
        if event.is_flagged() {
            snapshot.flagged_count += 1;
        }
    }
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use burdencascade_core::EventDraft;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 1, hour, 0, 0).unwrap()
    }

    fn event(layer: &str, manual: f64, automated: f64, hour: u32) -> Arc<BurdenEvent> {
        Arc::new(
            BurdenEvent::from_draft(
                EventDraft::new(layer, "pattern_verify", manual, automated),
                format!("evt-{layer}-{hour}"),
                at(hour),
            )
            .unwrap(),
        )
    }

    #[test]
    fn window_is_half_open() {
        let events = vec![event("CORE", 60.0, 0.0, 9), event("CORE", 60.0, 0.0, 10)];
        let layer = Layer::from("CORE");
        let snap = aggregate(&events, &layer, Window::new(at(9), at(10)).unwrap());
        assert_eq!(snap.event_count, 1);
        assert_eq!(snap.total_burden_saved_hours, 1.0);
    }

    #[test]
    fn other_layers_are_ignored() {
        let events = vec![event("CORE", 60.0, 0.0, 9), event("META", 120.0, 0.0, 9)];
        let snap = aggregate(&events, &Layer::from("META"), Window::new(at(0), at(23)).unwrap());
        assert_eq!(snap.event_count, 1);
        assert_eq!(snap.total_burden_saved_hours, 2.0);
    }

    #[test]
    fn flagged_events_are_counted() {
        let events = vec![event("CORE", 10.0, 15.0, 9), event("CORE", 30.0, 0.0, 9)];
        let snap = aggregate(&events, &Layer::from("CORE"), Window::new(at(0), at(23)).unwrap());
        assert_eq!(snap.event_count, 2);
        assert_eq!(snap.flagged_count, 1);
        assert_eq!(snap.total_burden_saved_hours, 0.5);
    }

    #[test]
    fn instance_filter_only_counts_tagged_events() {
        let tagged = Arc::new(
            BurdenEvent::from_draft(
                EventDraft::new("CORE", "load", 60.0, 0.0).with_instance("alpha"),
                "evt-tagged".into(),
                at(9),
            )
            .unwrap(),
        );
        let events = vec![tagged, event("CORE", 60.0, 0.0, 9)];
        let window = Window::new(at(0), at(23)).unwrap();
        let snap = aggregate_instance(&events, &Layer::from("CORE"), "alpha", window);
        assert_eq!(snap.event_count, 1);
        let none = aggregate_instance(&events, &Layer::from("CORE"), "beta", window);
        assert_eq!(none.event_count, 0);
    }
}
