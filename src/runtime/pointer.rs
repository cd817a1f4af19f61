//! Terminal mouse input to gesture events. One terminal cell counts as one
//! pixel, so the dashboard geometry should be built from the terminal size.

use crossterm::event::{Event, MouseButton, MouseEvent, MouseEventKind};

use crate::entity::EntityId;
use crate::geometry::{PixelOffset, PixelSize};

use super::{Dashboard, DashboardEvent};

#[derive(Debug, Clone, PartialEq)]
struct Press {
    id: EntityId,
    column: u16,
    row: u16,
}

/// Tracks the pressed card between mouse-down and mouse-up.
#[derive(Debug, Default)]
pub struct PointerTranslator {
    press: Option<Press>,
}

impl PointerTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pressed(&self) -> Option<&str> {
        self.press.as_ref().map(|press| press.id.as_str())
    }

    /// Map one terminal event. Mouse-down hit-tests against `dashboard`;
    /// losing focus cancels a gesture in progress.
    pub fn translate(&mut self, event: &Event, dashboard: &Dashboard) -> Option<DashboardEvent> {
        match event {
            Event::Mouse(mouse) => self.mouse(mouse, dashboard),
            Event::FocusLost => self
                .press
                .take()
                .map(|press| DashboardEvent::DragCancel { id: press.id }),
            Event::Resize(width, height) => Some(DashboardEvent::Resize(PixelSize::new(
                f32::from(*width),
                f32::from(*height),
            ))),
            _ => None,
        }
    }

    fn mouse(&mut self, mouse: &MouseEvent, dashboard: &Dashboard) -> Option<DashboardEvent> {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let id = dashboard.item_at(f32::from(mouse.column), f32::from(mouse.row))?;
                self.press = Some(Press {
                    id: id.clone(),
                    column: mouse.column,
                    row: mouse.row,
                });
                Some(DashboardEvent::DragStart { id })
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let press = self.press.as_ref()?;
                Some(DashboardEvent::DragMove {
                    id: press.id.clone(),
                    offset: travel(press, mouse),
                })
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let press = self.press.take()?;
                let offset = travel(&press, mouse);
                Some(DashboardEvent::DragEnd {
                    id: press.id,
                    offset,
                })
            }
            _ => None,
        }
    }
}

fn travel(press: &Press, mouse: &MouseEvent) -> PixelOffset {
    PixelOffset::new(
        f32::from(mouse.column) - f32::from(press.column),
        f32::from(mouse.row) - f32::from(press.row),
    )
}
