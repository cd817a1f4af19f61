//! Pointer gestures: snapping pixel travel to cells and proposing drops.

mod core;
pub mod geometry;

pub use core::{
    ActiveDrag, DEFAULT_ACTIVATION_DISTANCE, DragController, DragPreview, DragState, DropOutcome,
};
pub use geometry::GridGeometry;
