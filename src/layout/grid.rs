//! Occupancy grid - which cells of the fixed `columns x rows` board are claimed.
//!
//! The grid is never kept alive between decisions: every placement or drop
//! check rebuilds it from the current layout snapshot, so its contents are
//! always a pure function of the items it was built from.
//!
//! # Example
//! ```no_run
//! use gridboard::layout::{GridDimensions, GridItem, OccupancyGrid};
//! use gridboard::{Entity, Position, Size};
//!
//! let dims = GridDimensions::new(16, 9)?;
//! let lamp = GridItem::new(
//!     "light.desk",
//!     "light-card",
//!     Size::new(2, 2),
//!     Position::new(0, 0),
//!     Entity::new("light.desk"),
//! )?;
//!
//! let grid = OccupancyGrid::build(dims, [&lamp], None);
//! assert!(!grid.is_free(Position::new(1, 1), Size::new(1, 1)));
//! assert!(grid.is_free(Position::new(2, 0), Size::new(2, 2)));
//! # Ok::<(), gridboard::GridError>(())
//! ```

use super::core::GridItem;
use crate::error::GridError;
use crate::geometry::{Position, Rect, Size};

/// Logical board size in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDimensions {
    columns: u16,
    rows: u16,
}

impl GridDimensions {
    pub fn new(columns: u16, rows: u16) -> Result<Self, GridError> {
        if columns == 0 || rows == 0 {
            return Err(GridError::InvalidDimensions { columns, rows });
        }
        Ok(Self { columns, rows })
    }

    pub const fn columns(&self) -> u16 {
        self.columns
    }

    pub const fn rows(&self) -> u16 {
        self.rows
    }

    /// True when the rectangle lies entirely inside `[0, columns) x [0, rows)`.
    pub fn contains(&self, position: Position, size: Size) -> bool {
        u32::from(position.x) + u32::from(size.width) <= u32::from(self.columns)
            && u32::from(position.y) + u32::from(size.height) <= u32::from(self.rows)
    }

    /// Where an item lands when nothing fits: the left edge, as low as its
    /// height allows.
    pub fn fallback_position(&self, size: Size) -> Position {
        Position::new(0, self.rows.saturating_sub(size.height))
    }
}

impl Default for GridDimensions {
    fn default() -> Self {
        Self {
            columns: 16,
            rows: 9,
        }
    }
}

/// Claim flags for each cell, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyGrid {
    dims: GridDimensions,
    cells: Vec<bool>,
}

impl OccupancyGrid {
    pub fn empty(dims: GridDimensions) -> Self {
        let len = usize::from(dims.columns) * usize::from(dims.rows);
        Self {
            dims,
            cells: vec![false; len],
        }
    }

    /// Mark every cell covered by `items`, skipping the item whose id is
    /// `exclude`. Cells outside the board are ignored, so items left
    /// partially off-grid by a fallback placement still claim what they can.
    pub fn build<'a, I>(dims: GridDimensions, items: I, exclude: Option<&str>) -> Self
    where
        I: IntoIterator<Item = &'a GridItem>,
    {
        let mut grid = Self::empty(dims);
        for item in items {
            if exclude == Some(item.id()) {
                continue;
            }
            grid.claim(item.rect());
        }
        grid
    }

    pub fn dims(&self) -> GridDimensions {
        self.dims
    }

    /// Rectangle at `position` with `size` is inside the board and touches
    /// no claimed cell.
    pub fn is_free(&self, position: Position, size: Size) -> bool {
        if !size.is_valid() || !self.dims.contains(position, size) {
            return false;
        }
        let rect = Rect::from_parts(position, size);
        (rect.y..rect.bottom()).all(|row| (rect.x..rect.right()).all(|col| !self.cell(col, row)))
    }

    pub fn is_claimed(&self, x: u16, y: u16) -> bool {
        x < self.dims.columns && y < self.dims.rows && self.cell(x, y)
    }

    pub fn claimed_count(&self) -> usize {
        self.cells.iter().filter(|claimed| **claimed).count()
    }

    fn claim(&mut self, rect: Rect) {
        let bottom = rect.bottom().min(self.dims.rows);
        let right = rect.right().min(self.dims.columns);
        for row in rect.y..bottom {
            for col in rect.x..right {
                let idx = self.index(col, row);
                self.cells[idx] = true;
            }
        }
    }

    fn cell(&self, x: u16, y: u16) -> bool {
        self.cells[self.index(x, y)]
    }

    fn index(&self, x: u16, y: u16) -> usize {
        usize::from(y) * usize::from(self.dims.columns) + usize::from(x)
    }
}
