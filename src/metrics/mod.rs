use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Default, Clone)]
pub struct DashboardMetrics {
    reconciles: u64,
    items_placed: u64,
    fallback_placements: u64,
    excluded_items: u64,
    drags_started: u64,
    commits: u64,
    reverts: u64,
    matcher_faults: u64,
}

impl DashboardMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_reconcile(&mut self, placed: usize, fallbacks: usize, excluded: usize) {
        self.reconciles = self.reconciles.saturating_add(1);
        self.items_placed = self.items_placed.saturating_add(placed as u64);
        self.fallback_placements = self.fallback_placements.saturating_add(fallbacks as u64);
        self.excluded_items = self.excluded_items.saturating_add(excluded as u64);
    }

    pub fn record_drag_started(&mut self) {
        self.drags_started = self.drags_started.saturating_add(1);
    }

    pub fn record_commit(&mut self) {
        self.commits = self.commits.saturating_add(1);
    }

    pub fn record_revert(&mut self) {
        self.reverts = self.reverts.saturating_add(1);
    }

    pub fn record_matcher_faults(&mut self, count: usize) {
        if count > 0 {
            self.matcher_faults = self.matcher_faults.saturating_add(count as u64);
        }
    }

    pub fn snapshot(&self, uptime: Duration) -> MetricSnapshot {
        MetricSnapshot {
            uptime_ms: uptime.as_millis() as u64,
            reconciles: self.reconciles,
            items_placed: self.items_placed,
            fallback_placements: self.fallback_placements,
            excluded_items: self.excluded_items,
            drags_started: self.drags_started,
            commits: self.commits,
            reverts: self.reverts,
            matcher_faults: self.matcher_faults,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub uptime_ms: u64,
    pub reconciles: u64,
    pub items_placed: u64,
    pub fallback_placements: u64,
    pub excluded_items: u64,
    pub drags_started: u64,
    pub commits: u64,
    pub reverts: u64,
    pub matcher_faults: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "dashboard_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("uptime_ms".to_string(), json!(self.uptime_ms));
        map.insert("reconciles".to_string(), json!(self.reconciles));
        map.insert("items_placed".to_string(), json!(self.items_placed));
        map.insert(
            "fallback_placements".to_string(),
            json!(self.fallback_placements),
        );
        map.insert("excluded_items".to_string(), json!(self.excluded_items));
        map.insert("drags_started".to_string(), json!(self.drags_started));
        map.insert("commits".to_string(), json!(self.commits));
        map.insert("reverts".to_string(), json!(self.reverts));
        map.insert("matcher_faults".to_string(), json!(self.matcher_faults));
        map
    }
}
