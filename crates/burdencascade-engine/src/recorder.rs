//! Event log — the append-only record of burden events
//!
//! `record` validates, stamps, persists (if a sink is attached), then
//! publishes the event in memory. Readers take a snapshot of the events
//! visible at that moment and aggregate over it without holding the lock.

use crate::aggregate::{self, aggregate_instance};
use crate::layers::LayerRegistry;
use crate::store::{EventSink, NdjsonStore};
use burdencascade_core::{BurdenEvent, EventDraft, Layer, LayerSnapshot, Result, Window};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

pub struct EventLog {
    registry: LayerRegistry,
    events: RwLock<Vec<Arc<BurdenEvent>>>,
    sink: Option<Arc<dyn EventSink>>,
}

/// All-time totals for one layer, used by `status`.
#[derive(Debug, Clone, Serialize)]
pub struct LayerTotals {
    pub layer: Layer,
    pub alias: Option<String>,
    pub event_count: usize,
    pub flagged_count: usize,
    pub total_burden_saved_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogStatus {
    pub total_events: usize,
    pub flagged_events: usize,
    /// Events whose layer is no longer registered.
    pub unregistered_events: usize,
    pub first_event: Option<DateTime<Utc>>,
    pub last_event: Option<DateTime<Utc>>,
    pub instances: Vec<String>,
    pub layers: Vec<LayerTotals>,
}

impl EventLog {
    /// In-memory log with no persistence.
    pub fn new(registry: LayerRegistry) -> Self {
        Self {
            registry,
            events: RwLock::new(Vec::new()),
            sink: None,
        }
    }

    /// Replay `store` and append future events to it.
    pub fn open(registry: LayerRegistry, store: Arc<NdjsonStore>) -> Result<Self> {
        let existing = store.load()?;
        info!(
            "Opened event log {} ({} events)",
            store.path().display(),
            existing.len()
        );
        let sink: Arc<dyn EventSink> = store;
        Ok(Self::with_sink(registry, sink, existing))
    }

    pub fn with_sink(
        registry: LayerRegistry,
        sink: Arc<dyn EventSink>,
        existing: Vec<BurdenEvent>,
    ) -> Self {
        Self {
            registry,
            events: RwLock::new(existing.into_iter().map(Arc::new).collect()),
            sink: Some(sink),
        }
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    /// Record one operation at the current time.
    pub fn record(
        &self,
        layer: &str,
        operation_type: &str,
        manual_minutes: f64,
        automated_minutes: f64,
    ) -> Result<BurdenEvent> {
        self.record_draft(EventDraft::new(
            layer,
            operation_type,
            manual_minutes,
            automated_minutes,
        ))
    }

    pub fn record_draft(&self, draft: EventDraft) -> Result<BurdenEvent> {
        self.record_draft_at(draft, Utc::now())
    }

    /// Record with an explicit timestamp (backfill). Nothing is mutated on error.
    pub fn record_draft_at(
        &self,
        mut draft: EventDraft,
        timestamp: DateTime<Utc>,
    ) -> Result<BurdenEvent> {
        draft.layer = self.registry.resolve(draft.layer.as_str())?;
        let event =
            BurdenEvent::from_draft(draft, uuid::Uuid::new_v4().to_string(), timestamp)?;

        if let Some(warning) = &event.warning {
            warn!(
                event = %event.id,
                layer = %event.layer,
                operation = %event.operation_type,
                "Negative savings flagged: {}",
                warning
            );
        }

        if let Some(sink) = &self.sink {
            sink.append(&event)?;
        }
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(event.clone()));

        debug!(
            "Recorded {} on {}: {:.4}h saved",
            event.operation_type, event.layer, event.burden_saved_hours
        );
        Ok(event)
    }

    /// Events visible right now. Later appends do not show up in the returned vec.
    pub fn snapshot(&self) -> Vec<Arc<BurdenEvent>> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of one layer over `[window_start, window_end)`.
    pub fn aggregate(
        &self,
        layer: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<LayerSnapshot> {
        let layer = self.registry.resolve(layer)?;
        let window = Window::new(window_start, window_end)?;
        let snapshot = aggregate::aggregate(&self.snapshot(), &layer, window);
        debug!(
            "Aggregated {}: {} events, {:.4}h",
            layer, snapshot.event_count, snapshot.total_burden_saved_hours
        );
        Ok(snapshot)
    }

    /// One snapshot per registered layer, in cascade order, from a single read.
    pub fn aggregate_all(&self, window: Window) -> Vec<LayerSnapshot> {
        let events = self.snapshot();
        self.registry
            .layers()
            .iter()
            .map(|layer| aggregate::aggregate(&events, layer, window))
            .collect()
    }

    /// Per-layer snapshots restricted to one instance's events.
    pub fn aggregate_all_for_instance(&self, instance: &str, window: Window) -> Vec<LayerSnapshot> {
        let events = self.snapshot();
        self.registry
            .layers()
            .iter()
            .map(|layer| aggregate_instance(&events, layer, instance, window))
            .collect()
    }

    /// Distinct instance tags, sorted.
    pub fn instances(&self) -> Vec<String> {
        self.snapshot()
            .iter()
            .filter_map(|e| e.instance.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn status(&self) -> LogStatus {
        let events = self.snapshot();
        let mut layers: Vec<LayerTotals> = self
            .registry
            .layers()
            .iter()
            .map(|layer| LayerTotals {
                layer: layer.clone(),
                alias: self.registry.alias(layer),
                event_count: 0,
                flagged_count: 0,
                total_burden_saved_hours: 0.0,
            })
            .collect();

        let mut unregistered_events = 0;
        let mut instances = BTreeSet::new();
        for event in &events {
            if let Some(instance) = &event.instance {
                instances.insert(instance.clone());
            }
            match self.registry.rank(&event.layer) {
                Some(i) => {
                    let totals = &mut layers[i];
                    totals.event_count += 1;
                    totals.total_burden_saved_hours += event.burden_saved_hours;
                    if event.is_flagged() {
                        totals.flagged_count += 1;
                    }
                }
                None => unregistered_events += 1,
            }
        }

        LogStatus {
            total_events: events.len(),
            flagged_events: events.iter().filter(|e| e.is_flagged()).count(),
            unregistered_events,
            first_event: events.iter().map(|e| e.timestamp).min(),
            last_event: events.iter().map(|e| e.timestamp).max(),
            instances: instances.into_iter().collect(),
            layers,
        }
    }
}
