//! Grid layout: occupancy, placement and the versioned layout store.
//!
//! Callers import layout types from here while the snapshot and reconcile
//! logic lives in the private `core` module.

mod core;
pub mod grid;
pub mod placement;

pub use core::{
    CommitOutcome, Footprint, GridItem, LayoutSnapshot, LayoutStore, ReconcileReport, Reconciled,
    reconcile,
};
pub use grid::{GridDimensions, OccupancyGrid};
pub use placement::{Placement, place};
