//! Pixel metrics for a grid laid out inside a container.

use crate::geometry::{CellDelta, PixelOffset, PixelRect, PixelSize, Position, Size};
use crate::layout::GridDimensions;

/// Per-cell pixel size derived from the container and the inter-cell gap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    dims: GridDimensions,
    gap: f32,
    cell: PixelSize,
}

impl GridGeometry {
    /// `cell = (container - gap * (n - 1)) / n` on each axis, floored at zero.
    pub fn from_container(dims: GridDimensions, container: PixelSize, gap: f32) -> Self {
        let gap = gap.max(0.0);
        let cell = PixelSize::new(
            axis_cell(container.width, dims.columns(), gap),
            axis_cell(container.height, dims.rows(), gap),
        );
        Self { dims, gap, cell }
    }

    pub fn dims(&self) -> GridDimensions {
        self.dims
    }

    pub fn gap(&self) -> f32 {
        self.gap
    }

    pub fn cell_size(&self) -> PixelSize {
        self.cell
    }

    /// Distance between the origins of two neighbouring cells.
    pub fn pitch(&self) -> PixelSize {
        PixelSize::new(self.cell.width + self.gap, self.cell.height + self.gap)
    }

    pub fn cell_origin(&self, position: Position) -> PixelOffset {
        let pitch = self.pitch();
        PixelOffset::new(
            f32::from(position.x) * pitch.width,
            f32::from(position.y) * pitch.height,
        )
    }

    pub fn cell_extent(&self, size: Size) -> PixelSize {
        PixelSize::new(
            span(self.cell.width, size.width, self.gap),
            span(self.cell.height, size.height, self.gap),
        )
    }

    pub fn cell_rect(&self, position: Position, size: Size) -> PixelRect {
        let origin = self.cell_origin(position);
        let extent = self.cell_extent(size);
        PixelRect {
            x: origin.x,
            y: origin.y,
            width: extent.width,
            height: extent.height,
        }
    }

    /// Round a pixel offset to the nearest whole cell delta per axis.
    pub fn snap(&self, offset: PixelOffset) -> CellDelta {
        let pitch = self.pitch();
        CellDelta::new(snap_axis(offset.x, pitch.width), snap_axis(offset.y, pitch.height))
    }
}

fn axis_cell(container: f32, count: u16, gap: f32) -> f32 {
    let count = f32::from(count);
    ((container - gap * (count - 1.0)) / count).max(0.0)
}

fn span(cell: f32, cells: u16, gap: f32) -> f32 {
    if cells == 0 {
        return 0.0;
    }
    cell * f32::from(cells) + gap * f32::from(cells - 1)
}

fn snap_axis(offset: f32, pitch: f32) -> i32 {
    if pitch <= 0.0 || !offset.is_finite() {
        return 0;
    }
    (offset / pitch).round() as i32
}
