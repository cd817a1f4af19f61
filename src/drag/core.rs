use super::geometry::GridGeometry;
use crate::entity::EntityId;
use crate::error::{DragError, DropRejection};
use crate::geometry::{PixelOffset, Position};
use crate::layout::LayoutSnapshot;

/// Pointer travel in pixels before a press shows a drag preview. It has no
/// say in whether a release commits.
pub const DEFAULT_ACTIVATION_DISTANCE: f32 = 8.0;

/// Gesture in progress. Nothing here is ever written to the layout store;
/// the offset is a purely visual translation.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveDrag {
    pub id: EntityId,
    pub origin: Position,
    pub offset: PixelOffset,
    pub activated: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(ActiveDrag),
}

/// What the host should draw while the pointer moves.
#[derive(Debug, Clone, PartialEq)]
pub struct DragPreview {
    pub id: EntityId,
    /// Translation to apply to the card; zero until the gesture activates.
    pub offset: PixelOffset,
    /// Cell the card would land on if released now.
    pub candidate: Option<Position>,
    pub legal: bool,
}

/// How a gesture ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// The destination is legal; the host must commit it through the store.
    Commit {
        id: EntityId,
        from: Position,
        to: Position,
    },
    /// The item stays where it was before the drag.
    Revert {
        id: EntityId,
        position: Position,
        reason: DropRejection,
    },
    /// The offset snapped back onto the item's own cell.
    Unmoved { id: EntityId, position: Position },
}

impl DropOutcome {
    pub fn id(&self) -> &str {
        match self {
            DropOutcome::Commit { id, .. }
            | DropOutcome::Revert { id, .. }
            | DropOutcome::Unmoved { id, .. } => id,
        }
    }
}

/// `Idle -> Dragging -> (commit | revert) -> Idle`.
///
/// The controller only proposes moves. Legality is evaluated against the
/// snapshot handed in at each step so an entity update that lands mid-drag is
/// always respected.
#[derive(Debug, Clone)]
pub struct DragController {
    state: DragState,
    activation_distance: f32,
}

impl Default for DragController {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVATION_DISTANCE)
    }
}

impl DragController {
    pub fn new(activation_distance: f32) -> Self {
        Self {
            state: DragState::Idle,
            activation_distance: activation_distance.max(0.0),
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn active(&self) -> Option<&ActiveDrag> {
        match &self.state {
            DragState::Dragging(drag) => Some(drag),
            DragState::Idle => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.active().is_some()
    }

    /// Ephemeral translation for `id`, if it is being dragged and activated.
    pub fn offset_for(&self, id: &str) -> Option<PixelOffset> {
        self.active()
            .filter(|drag| drag.id == id && drag.activated)
            .map(|drag| drag.offset)
    }

    pub fn begin(&mut self, snapshot: &LayoutSnapshot, id: &str) -> Result<(), DragError> {
        if let Some(active) = self.active() {
            return Err(DragError::Busy {
                active: active.id.clone(),
            });
        }
        let origin = snapshot
            .position_of(id)
            .ok_or_else(|| DragError::UnknownItem(id.to_string()))?;
        self.state = DragState::Dragging(ActiveDrag {
            id: id.to_string(),
            origin,
            offset: PixelOffset::default(),
            activated: self.activation_distance == 0.0,
        });
        Ok(())
    }

    /// `offset` is the total pointer travel since the drag began.
    pub fn update(
        &mut self,
        id: &str,
        offset: PixelOffset,
        geometry: &GridGeometry,
        snapshot: &LayoutSnapshot,
    ) -> Result<DragPreview, DragError> {
        let threshold = self.activation_distance;
        let drag = self.active_mut(id)?;
        drag.offset = offset;
        if !drag.activated && offset.distance() >= threshold {
            drag.activated = true;
        }
        let drag = drag.clone();

        let origin = snapshot.position_of(&drag.id).unwrap_or(drag.origin);
        let proposal = propose(&drag.id, origin, drag.offset, geometry, snapshot);
        let (candidate, legal) = match proposal {
            Ok(position) => (Some(position), true),
            Err((position, _)) => (position, false),
        };
        Ok(DragPreview {
            id: drag.id,
            offset: if drag.activated {
                drag.offset
            } else {
                PixelOffset::default()
            },
            candidate,
            legal,
        })
    }

    /// Release. The drop is judged against `snapshot` as it is now, so an
    /// item moved or removed by a reconcile mid-drag is measured from where
    /// the store holds it. The controller returns to `Idle` whatever the
    /// outcome.
    pub fn end(
        &mut self,
        id: &str,
        offset: PixelOffset,
        geometry: &GridGeometry,
        snapshot: &LayoutSnapshot,
    ) -> Result<DropOutcome, DragError> {
        self.active_mut(id)?.offset = offset;
        let Some(drag) = self.take() else {
            return Err(DragError::NotDragging(id.to_string()));
        };

        let Some(origin) = snapshot.position_of(&drag.id) else {
            return Ok(DropOutcome::Revert {
                id: drag.id,
                position: drag.origin,
                reason: DropRejection::ItemMissing,
            });
        };
        let outcome = match propose(&drag.id, origin, drag.offset, geometry, snapshot) {
            Ok(to) if to == origin => DropOutcome::Unmoved {
                id: drag.id,
                position: origin,
            },
            Ok(to) => DropOutcome::Commit {
                id: drag.id,
                from: origin,
                to,
            },
            Err((_, reason)) => DropOutcome::Revert {
                id: drag.id,
                position: origin,
                reason,
            },
        };
        Ok(outcome)
    }

    /// Abort the gesture on `id`. Treated exactly like an illegal drop.
    pub fn cancel(&mut self, id: &str) -> Result<DropOutcome, DragError> {
        self.active_mut(id)?;
        self.cancel_active()
            .ok_or_else(|| DragError::NotDragging(id.to_string()))
    }

    /// Abort whatever gesture is running, e.g. when the pointer is lost.
    pub fn cancel_active(&mut self) -> Option<DropOutcome> {
        let drag = self.take()?;
        Some(DropOutcome::Revert {
            id: drag.id,
            position: drag.origin,
            reason: DropRejection::Cancelled,
        })
    }

    fn active_mut(&mut self, id: &str) -> Result<&mut ActiveDrag, DragError> {
        match &mut self.state {
            DragState::Dragging(drag) if drag.id == id => Ok(drag),
            _ => Err(DragError::NotDragging(id.to_string())),
        }
    }

    fn take(&mut self) -> Option<ActiveDrag> {
        match std::mem::take(&mut self.state) {
            DragState::Dragging(drag) => Some(drag),
            DragState::Idle => None,
        }
    }
}

/// Snap the accumulated offset and test the destination cell.
fn propose(
    id: &str,
    origin: Position,
    offset: PixelOffset,
    geometry: &GridGeometry,
    snapshot: &LayoutSnapshot,
) -> Result<Position, (Option<Position>, DropRejection)> {
    let candidate = origin
        .offset(geometry.snap(offset))
        .ok_or((None, DropRejection::OutOfBounds))?;
    snapshot
        .check_move(id, candidate)
        .map(|()| candidate)
        .map_err(|reason| (Some(candidate), reason))
}
