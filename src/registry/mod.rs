//! Widget specs and the priority-ordered registry that picks one per entity.

mod core;

pub use core::{Resolution, WidgetMeta, WidgetRegistry, WidgetSpec};
