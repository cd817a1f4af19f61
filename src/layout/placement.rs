use super::core::GridItem;
use super::grid::{GridDimensions, OccupancyGrid};
use crate::geometry::{Position, Size};

/// Where the solver put an item and how it got there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The requested position was free and kept as-is.
    Preferred(Position),
    /// First free top-left cell in row-major order.
    Scanned(Position),
    /// Nothing fit; the item overlaps others at the fallback cell.
    Fallback(Position),
}

impl Placement {
    pub fn position(&self) -> Position {
        match *self {
            Placement::Preferred(position)
            | Placement::Scanned(position)
            | Placement::Fallback(position) => position,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Placement::Fallback(_))
    }
}

/// Choose a top-left cell for an item of `size` among `existing`.
///
/// `existing` may contain the item itself; it is excluded by id so that a
/// re-run never collides with its own footprint.
pub fn place<'a, I>(
    dims: GridDimensions,
    id: &str,
    size: Size,
    preferred: Option<Position>,
    existing: I,
) -> Placement
where
    I: IntoIterator<Item = &'a GridItem>,
{
    let grid = OccupancyGrid::build(dims, existing, Some(id));

    if let Some(position) = preferred {
        if grid.is_free(position, size) {
            return Placement::Preferred(position);
        }
    }

    match scan(&grid, size) {
        Some(position) => Placement::Scanned(position),
        None => Placement::Fallback(dims.fallback_position(size)),
    }
}

/// Row-major search: `y` ascending, then `x` ascending within the row.
fn scan(grid: &OccupancyGrid, size: Size) -> Option<Position> {
    let dims = grid.dims();
    if size.width > dims.columns() || size.height > dims.rows() {
        return None;
    }
    let last_y = dims.rows() - size.height;
    let last_x = dims.columns() - size.width;
    (0..=last_y)
        .flat_map(|y| (0..=last_x).map(move |x| Position::new(x, y)))
        .find(|candidate| grid.is_free(*candidate, size))
}
