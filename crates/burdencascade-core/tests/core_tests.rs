//! Tests for burdencascade-core: layers, events, windows, errors

use burdencascade_core::*;
use chrono::{TimeZone, Utc};

// ===========================================================================
// Layer
// ===========================================================================

#[test]
fn layer_new_and_display() {
    let layer = Layer::new("BRIDGES");
    assert_eq!(layer.as_str(), "BRIDGES");
    assert_eq!(format!("{}", layer), "BRIDGES");
}

#[test]
fn layer_serializes_as_plain_string() {
    let layer = Layer::from("META");
    assert_eq!(serde_json::to_string(&layer).unwrap(), r#""META""#);
    let back: Layer = serde_json::from_str(r#""META_META""#).unwrap();
    assert_eq!(back.as_str(), "META_META");
}

#[test]
fn layer_equality_and_hash() {
    use std::collections::HashSet;
    let a = Layer::new("CORE");
    let b = Layer::from(String::from("CORE"));
    let c = Layer::new("META");
    assert_eq!(a, b);
    assert_ne!(a, c);
    let mut set = HashSet::new();
    set.insert(a.clone());
    assert!(set.contains(&b));
    assert!(!set.contains(&c));
}

// ===========================================================================
// EventDraft / BurdenEvent
// ===========================================================================

#[test]
fn draft_validation_names_the_field() {
    let err = EventDraft::new("CORE", "load", -5.0, 1.0).validate().unwrap_err();
    assert_eq!(
        err.to_string(),
        "manual_minutes must be a non-negative finite number, got -5"
    );
    let err = EventDraft::new("CORE", "load", 5.0, f64::NAN)
        .validate()
        .unwrap_err();
    assert!(err.to_string().starts_with("automated_minutes"));
}

#[test]
fn event_from_draft_computes_savings() {
    let ts = Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap();
    let event = BurdenEvent::from_draft(
        EventDraft::new("CORE", "coordinate_load", 60.0, 5.0),
        "evt-1".into(),
        ts,
    )
    .unwrap();
    assert_eq!(event.id, "evt-1");
    assert_eq!(event.timestamp, ts);
    assert!((event.burden_saved_hours - 55.0 / 60.0).abs() < 1e-12);
    assert!(!event.is_flagged());
}

#[test]
fn event_json_omits_absent_optionals() {
    let ts = Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap();
    let event = BurdenEvent::from_draft(
        EventDraft::new("CORE", "load", 10.0, 1.0),
        "evt-2".into(),
        ts,
    )
    .unwrap();
    let json = serde_json::to_string(&event).unwrap();
    assert!(!json.contains("warning"));
    assert!(!json.contains("instance"));
    assert!(json.contains(r#""timestamp":"2026-10-01T09:00:00Z""#));
}

#[test]
fn flagged_event_roundtrips_with_its_warning() {
    let ts = Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap();
    let event = BurdenEvent::from_draft(
        EventDraft::new("META", "verify", 10.0, 15.0).with_instance("alpha"),
        "evt-3".into(),
        ts,
    )
    .unwrap();
    let back: BurdenEvent = serde_json::from_str(&serde_json::to_string(&event).unwrap()).unwrap();
    assert_eq!(back, event);
    assert_eq!(
        back.warning.unwrap().to_string(),
        "automated_minutes exceeds manual_minutes by 5 min"
    );
}

// ===========================================================================
// Window
// ===========================================================================

#[test]
fn window_contains_start_but_not_end() {
    let start = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2026, 10, 2, 0, 0, 0).unwrap();
    let w = Window::new(start, end).unwrap();
    assert!(w.contains(start));
    assert!(!w.contains(end));
    assert!(!w.is_empty());
}

// ===========================================================================
// Error taxonomy
// ===========================================================================

#[test]
fn error_kinds() {
    assert_eq!(Error::unknown_layer("X").kind(), ErrorKind::InputValidation);
    assert_eq!(Error::DivisionByZero { value: 0.0 }.kind(), ErrorKind::Computation);
    assert_eq!(Error::InvalidPrediction { value: -1.0 }.kind(), ErrorKind::Computation);
    assert_eq!(Error::EmptySampleSet.kind(), ErrorKind::EmptyInput);
    assert_eq!(Error::corrupt_log(3, "eof").kind(), ErrorKind::Storage);
}

#[test]
fn error_from_io() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err: Error = io.into();
    assert!(matches!(err, Error::IoError(_)));
    assert_eq!(err.kind(), ErrorKind::Storage);
}

#[test]
fn error_messages_name_the_invariant() {
    assert_eq!(
        Error::DivisionByZero { value: -3.2 }.to_string(),
        "denominator_value must be > 0, got -3.2"
    );
    assert_eq!(
        Error::InvalidPrediction { value: 0.0 }.to_string(),
        "predicted_ratio must be > 0, got 0"
    );
    assert_eq!(
        Error::EmptySampleSet.to_string(),
        "at least one consensus sample is required"
    );
}
