//! Grid dashboard engine: deterministic card placement on a fixed board,
//! drag-to-move with snap and collision rejection, and priority-based
//! selection of a card type for each incoming entity.
//!
//! The modules follow the same layout throughout: a private `core` with the
//! implementation and a `mod.rs` that re-exports the public surface.

pub mod catalog;
pub mod drag;
pub mod entity;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod logging;
pub mod matching;
pub mod metrics;
pub mod registry;
pub mod render;
pub mod runtime;
pub mod width;

pub use drag::{DragController, DragPreview, DragState, DropOutcome, GridGeometry};
pub use entity::{Entity, EntityId, entities_from_json};
pub use error::{
    DashboardError, DragError, DropRejection, GridError, MatcherFault, RegistryError, Result,
};
pub use geometry::{CellDelta, PixelOffset, PixelRect, PixelSize, Position, Rect, Size};
pub use layout::{
    Footprint, GridDimensions, GridItem, LayoutSnapshot, LayoutStore, OccupancyGrid, Placement,
    ReconcileReport, reconcile,
};
pub use logging::{LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult};
pub use matching::{MatchResult, Matcher};
pub use metrics::{DashboardMetrics, MetricSnapshot};
pub use registry::{Resolution, WidgetMeta, WidgetRegistry, WidgetSpec};
pub use render::{AnsiRenderer, CardText, ItemRenderer, RenderItem, RendererSettings};
pub use runtime::diagnostics::{ChannelObserver, LayoutNotification, LoggingObserver};
pub use runtime::driver::cli::{CliDriver, CliDriverError, DriverResult};
pub use runtime::pointer::PointerTranslator;
pub use runtime::{
    Dashboard, DashboardConfig, DashboardEvent, DragConfig, EventOutcome, GridConfig,
    LayoutObserver,
};
pub use width::display_width;
