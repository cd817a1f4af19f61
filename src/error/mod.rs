//! Error taxonomy for the grid, registry and drag layers.

mod types;

pub use types::{
    DashboardError, DragError, DropRejection, GridError, MatcherFault, RegistryError, Result,
};
