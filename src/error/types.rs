use thiserror::Error;

/// Unified result type for the gridboard crate.
pub type Result<T> = std::result::Result<T, DashboardError>;

/// Why a drop target was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropRejection {
    OutOfBounds,
    Overlap,
    Cancelled,
    ItemMissing,
}

impl std::fmt::Display for DropRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DropRejection::OutOfBounds => "out_of_bounds",
            DropRejection::Overlap => "overlap",
            DropRejection::Cancelled => "cancelled",
            DropRejection::ItemMissing => "item_missing",
        };
        f.write_str(label)
    }
}

/// Faults raised by the occupancy grid and placement solver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("item `{id}` has invalid size {width}x{height}")]
    InvalidSize { id: String, width: u16, height: u16 },
    #[error("no legal placement for item `{id}`")]
    NoLegalPlacement { id: String },
    #[error("illegal drop for item `{id}`: {reason}")]
    IllegalDrop { id: String, reason: DropRejection },
    #[error("grid dimensions must be non-zero, got {columns}x{rows}")]
    InvalidDimensions { columns: u16, rows: u16 },
}

/// Setup-time faults raised while registering widget specs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("widget spec `{spec}` declares invalid size {width}x{height}")]
    InvalidSize { spec: String, width: u16, height: u16 },
    #[error("widget spec `{0}` is already registered")]
    DuplicateSpec(String),
    #[error("widget spec id must not be empty")]
    EmptyId,
}

/// Gesture protocol violations reported by the drag controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DragError {
    #[error("item `{0}` is not part of the layout")]
    UnknownItem(String),
    #[error("item `{0}` is not being dragged")]
    NotDragging(String),
    #[error("a drag of `{active}` is already in progress")]
    Busy { active: String },
}

/// A matcher panicked or reported an error; the spec is treated as a non-match.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("matcher for `{spec}` failed: {message}")]
pub struct MatcherFault {
    pub spec: String,
    pub message: String,
}

/// Errors surfaced by the dashboard core.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("grid error: {0}")]
    Grid(#[from] GridError),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("drag error: {0}")]
    Drag(#[from] DragError),
    #[error("matcher error: {0}")]
    Matcher(#[from] MatcherFault),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
