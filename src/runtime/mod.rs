//! Host-facing dashboard: the single commit path tying the registry, the
//! layout store and the drag controller together.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::drag::{DragController, DragPreview, DragState, DropOutcome, GridGeometry};
use crate::entity::{Entity, EntityId};
use crate::error::{DragError, DropRejection, GridError, Result};
use crate::geometry::{PixelOffset, PixelSize, Position};
use crate::layout::{CommitOutcome, LayoutSnapshot, LayoutStore, ReconcileReport};
use crate::logging::{
    DRAG_TARGET, LAYOUT_TARGET, LogLevel, REGISTRY_TARGET, RUNTIME_TARGET, emit, json_kv, json_str,
};
use crate::metrics::{DashboardMetrics, MetricSnapshot};
use crate::registry::WidgetRegistry;
use crate::render::{AnsiRenderer, ItemRenderer, RenderItem};

pub mod config;
pub mod diagnostics;
pub mod driver;
pub mod pointer;

pub use config::{DashboardConfig, DragConfig, GridConfig};

/// Receives layout notifications from the commit path.
pub trait LayoutObserver: Send {
    fn name(&self) -> &str {
        "layout_observer"
    }

    /// Fired exactly once per successful drag commit.
    fn on_item_moved(&mut self, _id: &str, _position: Position) {}

    /// Fired after any reconcile or commit that changed the layout.
    fn on_layout_changed(&mut self, _positions: &BTreeMap<EntityId, Position>) {}
}

/// Discrete inputs processed one at a time, each to completion.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    EntitiesUpdated(Vec<Entity>),
    DragStart { id: EntityId },
    /// `offset` is the total travel since `DragStart`.
    DragMove { id: EntityId, offset: PixelOffset },
    DragEnd { id: EntityId, offset: PixelOffset },
    DragCancel { id: EntityId },
    Resize(PixelSize),
}

/// What handling an event did.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Reconciled(ReconcileReport),
    DragStarted { id: EntityId, origin: Position },
    Preview(DragPreview),
    Committed { id: EntityId, from: Position, to: Position },
    Reverted { id: EntityId, position: Position, reason: DropRejection },
    Unmoved { id: EntityId, position: Position },
    Resized(PixelSize),
    /// Gesture protocol violation; logged and otherwise ignored.
    Rejected(DragError),
}

pub struct Dashboard {
    registry: WidgetRegistry,
    store: LayoutStore,
    drag: DragController,
    geometry: GridGeometry,
    observers: Vec<Box<dyn LayoutObserver>>,
    config: DashboardConfig,
    started_at: Instant,
}

impl Dashboard {
    pub fn new(
        registry: WidgetRegistry,
        config: DashboardConfig,
        container: PixelSize,
    ) -> Result<Self> {
        config.validate()?;
        let dims = config.grid.dimensions()?;
        let dashboard = Self {
            store: LayoutStore::new(dims),
            drag: DragController::new(config.drag.activation_distance),
            geometry: GridGeometry::from_container(dims, container, config.grid.gap),
            registry,
            observers: Vec::new(),
            config,
            started_at: Instant::now(),
        };
        dashboard.log(
            LogLevel::Info,
            RUNTIME_TARGET,
            "dashboard_started",
            [
                json_kv("columns", dims.columns()),
                json_kv("rows", dims.rows()),
                json_kv("specs", dashboard.registry.len()),
            ],
        );
        Ok(dashboard)
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn drag_state(&self) -> &DragState {
        self.drag.state()
    }

    /// Current committed layout. Never reflects an in-flight drag.
    pub fn snapshot(&self) -> Arc<LayoutSnapshot> {
        self.store.snapshot()
    }

    pub fn register_observer<O>(&mut self, observer: O)
    where
        O: LayoutObserver + 'static,
    {
        self.log(
            LogLevel::Debug,
            RUNTIME_TARGET,
            "observer_registered",
            [json_str("observer", observer.name())],
        );
        self.observers.push(Box::new(observer));
    }

    /// Resolve a widget for every entity and fold the list into the layout.
    pub fn update_entities(&mut self, entities: &[Entity]) -> ReconcileReport {
        let registry = &self.registry;
        let mut faults = Vec::new();
        let report = self.store.reconcile(entities, |entity| {
            let resolution = registry.resolve(entity);
            faults.extend(resolution.faults);
            resolution.spec.footprint()
        });

        for fault in &faults {
            self.log(
                LogLevel::Warn,
                REGISTRY_TARGET,
                "matcher_fault",
                [
                    json_str("spec", fault.spec.as_str()),
                    json_str("message", fault.message.as_str()),
                ],
            );
        }
        self.log_reconcile(&report);
        self.with_metrics(|metrics| {
            metrics.record_reconcile(
                report.added.len(),
                report.fallbacks.len(),
                report.excluded.len(),
            );
            metrics.record_matcher_faults(faults.len());
        });

        if report.changed {
            self.notify_layout_changed();
        }
        report
    }

    /// Refresh pixel metrics for a new container size. Items keep their cells.
    pub fn resize(&mut self, container: PixelSize) {
        self.geometry =
            GridGeometry::from_container(self.store.dims(), container, self.config.grid.gap);
        self.log(
            LogLevel::Info,
            RUNTIME_TARGET,
            "resized",
            [json_kv("width", container.width), json_kv("height", container.height)],
        );
    }

    pub fn handle(&mut self, event: DashboardEvent) -> EventOutcome {
        match event {
            DashboardEvent::EntitiesUpdated(entities) => {
                EventOutcome::Reconciled(self.update_entities(&entities))
            }
            DashboardEvent::DragStart { id } => self.start_drag(&id),
            DashboardEvent::DragMove { id, offset } => {
                match self.drag.update(&id, offset, &self.geometry, self.store.current()) {
                    Ok(preview) => EventOutcome::Preview(preview),
                    Err(err) => self.reject(err),
                }
            }
            DashboardEvent::DragEnd { id, offset } => {
                match self.drag.end(&id, offset, &self.geometry, self.store.current()) {
                    Ok(outcome) => self.finish(outcome),
                    Err(err) => self.reject(err),
                }
            }
            DashboardEvent::DragCancel { id } => match self.drag.cancel(&id) {
                Ok(outcome) => self.finish(outcome),
                Err(err) => self.reject(err),
            },
            DashboardEvent::Resize(container) => {
                self.resize(container);
                EventOutcome::Resized(container)
            }
        }
    }

    pub fn run_scripted<I>(&mut self, events: I) -> Vec<EventOutcome>
    where
        I: IntoIterator<Item = DashboardEvent>,
    {
        events.into_iter().map(|event| self.handle(event)).collect()
    }

    /// Abort whatever gesture is running; used when the pointer is lost.
    pub fn cancel_active_drag(&mut self) -> Option<EventOutcome> {
        let outcome = self.drag.cancel_active()?;
        Some(self.finish(outcome))
    }

    /// Card under a point in container pixels, honouring drag translation.
    pub fn item_at(&self, x: f32, y: f32) -> Option<EntityId> {
        self.render_items()
            .iter()
            .rev()
            .find(|item| item.pixel_rect(&self.geometry).contains(x, y))
            .map(|item| item.id.to_string())
    }

    /// Per-item render inputs in layout order.
    pub fn render_items(&self) -> Vec<RenderItem<'_>> {
        self.store
            .current()
            .items()
            .iter()
            .map(|item| RenderItem {
                id: item.id(),
                entity: item.payload(),
                widget: item.widget_id(),
                size: item.size(),
                position: item.position(),
                drag_offset: self.drag.offset_for(item.id()),
            })
            .collect()
    }

    pub fn render<R>(&self, renderer: &mut R) -> Vec<(EntityId, R::Output)>
    where
        R: ItemRenderer,
    {
        self.render_items()
            .iter()
            .map(|item| (item.id.to_string(), renderer.render_item(item)))
            .collect()
    }

    /// Paint the board through an [`AnsiRenderer`]; returns cards written.
    pub fn paint(&self, renderer: &mut AnsiRenderer, writer: &mut impl Write) -> Result<usize> {
        renderer.render(writer, &self.geometry, &self.render_items())
    }

    /// Log and return a metrics snapshot, if metrics are enabled.
    pub fn emit_metrics(&self) -> Option<MetricSnapshot> {
        let metrics = self.config.metrics.as_ref()?;
        let snapshot = metrics.lock().ok()?.snapshot(self.started_at.elapsed());
        if let Some(logger) = self.config.logger.as_ref() {
            let _ = logger.log_event(snapshot.to_log_event(&self.config.metrics_target));
        }
        Some(snapshot)
    }

    fn start_drag(&mut self, id: &str) -> EventOutcome {
        if let Err(err) = self.drag.begin(self.store.current(), id) {
            return self.reject(err);
        }
        let origin = self
            .drag
            .active()
            .map(|drag| drag.origin)
            .unwrap_or_default();
        self.log(
            LogLevel::Debug,
            DRAG_TARGET,
            "drag_started",
            [json_str("id", id), json_kv("x", origin.x), json_kv("y", origin.y)],
        );
        self.with_metrics(DashboardMetrics::record_drag_started);
        EventOutcome::DragStarted {
            id: id.to_string(),
            origin,
        }
    }

    fn finish(&mut self, outcome: DropOutcome) -> EventOutcome {
        match outcome {
            DropOutcome::Commit { id, from, to } => self.commit(id, from, to),
            DropOutcome::Revert {
                id,
                position,
                reason,
            } => self.revert(id, position, reason),
            DropOutcome::Unmoved { id, position } => {
                self.log(
                    LogLevel::Debug,
                    DRAG_TARGET,
                    "drag_released",
                    [json_str("id", id.as_str())],
                );
                EventOutcome::Unmoved { id, position }
            }
        }
    }

    /// The only place a drag writes to the store. Legality is rechecked
    /// against the committed layout.
    fn commit(&mut self, id: EntityId, from: Position, to: Position) -> EventOutcome {
        match self.store.commit_move(&id, to) {
            Ok(CommitOutcome::Moved { from, to }) => {
                self.log(
                    LogLevel::Info,
                    DRAG_TARGET,
                    "drag_committed",
                    [
                        json_str("id", id.as_str()),
                        json_kv("from", Value::from(vec![from.x, from.y])),
                        json_kv("to", Value::from(vec![to.x, to.y])),
                    ],
                );
                self.with_metrics(DashboardMetrics::record_commit);
                for observer in &mut self.observers {
                    observer.on_item_moved(&id, to);
                }
                self.notify_layout_changed();
                EventOutcome::Committed { id, from, to }
            }
            Ok(CommitOutcome::Unchanged) => EventOutcome::Unmoved { id, position: to },
            Err(err) => {
                let reason = match err {
                    GridError::IllegalDrop { reason, .. } => reason,
                    _ => DropRejection::ItemMissing,
                };
                self.revert(id, from, reason)
            }
        }
    }

    fn revert(&mut self, id: EntityId, position: Position, reason: DropRejection) -> EventOutcome {
        self.log(
            LogLevel::Info,
            DRAG_TARGET,
            "drag_reverted",
            [json_str("id", id.as_str()), json_str("reason", reason.to_string())],
        );
        self.with_metrics(DashboardMetrics::record_revert);
        EventOutcome::Reverted {
            id,
            position,
            reason,
        }
    }

    fn reject(&self, err: DragError) -> EventOutcome {
        self.log(
            LogLevel::Warn,
            DRAG_TARGET,
            "drag_rejected",
            [json_str("error", err.to_string())],
        );
        EventOutcome::Rejected(err)
    }

    fn notify_layout_changed(&mut self) {
        let positions = self.store.current().positions();
        for observer in &mut self.observers {
            observer.on_layout_changed(&positions);
        }
    }

    fn log_reconcile(&self, report: &ReconcileReport) {
        for err in &report.excluded {
            if let GridError::InvalidSize { id, width, height } = err {
                self.log(
                    LogLevel::Warn,
                    LAYOUT_TARGET,
                    "item_excluded",
                    [
                        json_str("id", id.as_str()),
                        json_kv("width", *width),
                        json_kv("height", *height),
                    ],
                );
            }
        }
        for err in &report.fallbacks {
            if let GridError::NoLegalPlacement { id } = err {
                self.log(
                    LogLevel::Warn,
                    LAYOUT_TARGET,
                    "placement_fallback",
                    [json_str("id", id.as_str()), json_str("error", err.to_string())],
                );
            }
        }
        for id in &report.duplicates {
            self.log(
                LogLevel::Warn,
                LAYOUT_TARGET,
                "duplicate_entity",
                [json_str("id", id.as_str())],
            );
        }
        self.log(
            LogLevel::Debug,
            LAYOUT_TARGET,
            "reconciled",
            [
                json_kv("version", self.store.current().version()),
                json_kv("items", self.store.current().len()),
                json_kv("added", report.added.len()),
                json_kv("removed", report.removed.len()),
                json_kv("changed", report.changed),
            ],
        );
    }

    fn log<I>(&self, level: LogLevel, target: &str, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        emit(self.config.logger.as_ref(), level, target, message, fields);
    }

    fn with_metrics(&self, record: impl FnOnce(&mut DashboardMetrics)) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                record(&mut *guard);
            }
        }
    }
}
