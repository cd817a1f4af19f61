use serde::{Deserialize, Serialize};

/// Footprint of an item measured in grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u16,
    pub height: u16,
}

impl Size {
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Both axes must cover at least one cell.
    pub const fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub const fn area(&self) -> u32 {
        self.width as u32 * self.height as u32
    }
}

/// Top-left cell of an item's rectangle.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

impl Position {
    pub const ORIGIN: Position = Position::new(0, 0);

    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Shift by a signed cell delta. Returns `None` when the result leaves the
    /// non-negative quadrant or overflows.
    pub fn offset(&self, delta: CellDelta) -> Option<Position> {
        let x = i32::from(self.x) + delta.dx;
        let y = i32::from(self.y) + delta.dy;
        Some(Position::new(u16::try_from(x).ok()?, u16::try_from(y).ok()?))
    }
}

/// Signed whole-cell displacement produced by snapping a pixel offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellDelta {
    pub dx: i32,
    pub dy: i32,
}

impl CellDelta {
    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    pub const fn is_zero(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

/// Cell rectangle anchored within the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn from_parts(position: Position, size: Size) -> Self {
        Self::new(position.x, position.y, size.width, size.height)
    }

    pub fn bottom(&self) -> u16 {
        self.y.saturating_add(self.height)
    }

    pub fn right(&self) -> u16 {
        self.x.saturating_add(self.width)
    }

    pub fn contains(&self, x: u16, y: u16) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// True when the two rectangles share at least one cell.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Continuous pointer translation in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PixelOffset {
    pub x: f32,
    pub y: f32,
}

impl PixelOffset {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self) -> f32 {
        self.x.hypot(self.y)
    }
}

/// Pixel dimensions of the container hosting the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelSize {
    pub width: f32,
    pub height: f32,
}

impl PixelSize {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Pixel rectangle of a rendered card.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PixelRect {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    pub fn translate(&self, offset: PixelOffset) -> PixelRect {
        PixelRect {
            x: self.x + offset.x,
            y: self.y + offset.y,
            ..*self
        }
    }
}
