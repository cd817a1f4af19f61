use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use super::grid::{GridDimensions, OccupancyGrid};
use super::placement::place;
use crate::entity::{Entity, EntityId};
use crate::error::{DropRejection, GridError};
use crate::geometry::{Position, Rect, Size};

/// A placed dashboard card: footprint, anchor cell and the entity it shows.
#[derive(Debug, Clone, PartialEq)]
pub struct GridItem {
    id: EntityId,
    widget_id: String,
    size: Size,
    position: Position,
    payload: Entity,
}

impl GridItem {
    /// Zero-width or zero-height items never reach the occupancy grid.
    pub fn new(
        id: impl Into<EntityId>,
        widget_id: impl Into<String>,
        size: Size,
        position: Position,
        payload: Entity,
    ) -> Result<Self, GridError> {
        let id = id.into();
        if !size.is_valid() {
            return Err(GridError::InvalidSize {
                id,
                width: size.width,
                height: size.height,
            });
        }
        Ok(Self {
            id,
            widget_id: widget_id.into(),
            size,
            position,
            payload,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn widget_id(&self) -> &str {
        &self.widget_id
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn payload(&self) -> &Entity {
        &self.payload
    }

    pub fn rect(&self) -> Rect {
        Rect::from_parts(self.position, self.size)
    }

    fn moved_to(&self, position: Position) -> Self {
        Self {
            position,
            ..self.clone()
        }
    }
}

/// Widget type and default footprint chosen for an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footprint {
    pub widget_id: String,
    pub size: Size,
}

impl Footprint {
    pub fn new(widget_id: impl Into<String>, size: Size) -> Self {
        Self {
            widget_id: widget_id.into(),
            size,
        }
    }
}

/// Immutable, versioned layout. Published snapshots are shared behind an
/// `Arc` and never mutated; every change produces a new snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutSnapshot {
    version: u64,
    dims: GridDimensions,
    items: Vec<GridItem>,
    index: HashMap<EntityId, usize>,
}

impl LayoutSnapshot {
    pub fn empty(dims: GridDimensions) -> Self {
        Self {
            version: 0,
            dims,
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn from_items(version: u64, dims: GridDimensions, items: Vec<GridItem>) -> Self {
        let index = items
            .iter()
            .enumerate()
            .map(|(idx, item)| (item.id.clone(), idx))
            .collect();
        Self {
            version,
            dims,
            items,
            index,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn dims(&self) -> GridDimensions {
        self.dims
    }

    /// Items in the order of the entity list that produced them.
    pub fn items(&self) -> &[GridItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&GridItem> {
        self.index.get(id).map(|idx| &self.items[*idx])
    }

    pub fn position_of(&self, id: &str) -> Option<Position> {
        self.get(id).map(GridItem::position)
    }

    pub fn positions(&self) -> BTreeMap<EntityId, Position> {
        self.items
            .iter()
            .map(|item| (item.id.clone(), item.position))
            .collect()
    }

    /// Occupancy of every item except `exclude`.
    pub fn occupancy(&self, exclude: Option<&str>) -> OccupancyGrid {
        OccupancyGrid::build(self.dims, &self.items, exclude)
    }

    /// Check whether `id` may sit at `position`; the item's own cells are
    /// treated as free.
    pub fn check_move(&self, id: &str, position: Position) -> Result<(), DropRejection> {
        let item = self.get(id).ok_or(DropRejection::ItemMissing)?;
        if !self.dims.contains(position, item.size) {
            return Err(DropRejection::OutOfBounds);
        }
        if !self.occupancy(Some(id)).is_free(position, item.size) {
            return Err(DropRejection::Overlap);
        }
        Ok(())
    }

    /// Pairs of items whose rectangles share a cell.
    pub fn overlapping_pairs(&self) -> Vec<(EntityId, EntityId)> {
        let mut pairs = Vec::new();
        for (i, a) in self.items.iter().enumerate() {
            for b in &self.items[i + 1..] {
                if a.rect().intersects(&b.rect()) {
                    pairs.push((a.id.clone(), b.id.clone()));
                }
            }
        }
        pairs
    }

    /// Same ids with the same widgets, footprints and anchors. Item order
    /// and payloads are not compared.
    pub fn same_layout(&self, other: &LayoutSnapshot) -> bool {
        self.items.len() == other.items.len()
            && self.items.iter().all(|a| {
                other.get(&a.id).is_some_and(|b| {
                    a.widget_id == b.widget_id && a.size == b.size && a.position == b.position
                })
            })
    }
}

/// Bookkeeping from one reconcile pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    /// Ids that were new in this pass.
    pub added: Vec<EntityId>,
    /// Ids present before that are no longer in the entity list.
    pub removed: Vec<EntityId>,
    /// Persisting ids whose anchor changed (widget resize or conflict).
    pub moved: Vec<EntityId>,
    /// `NoLegalPlacement` for every item laid down by the overlap-accepting
    /// fallback. These items are still in the layout.
    pub fallbacks: Vec<GridError>,
    /// Entities left out of the layout.
    pub excluded: Vec<GridError>,
    /// Repeated ids in the input; only the first occurrence is laid out.
    pub duplicates: Vec<EntityId>,
    /// Whether the published layout differs from the previous one.
    pub changed: bool,
}

/// Result of [`reconcile`]: the next snapshot plus what happened.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub snapshot: LayoutSnapshot,
    pub report: ReconcileReport,
}

struct Pending<'a> {
    entity: &'a Entity,
    footprint: Footprint,
    previous: Option<&'a GridItem>,
}

impl Pending<'_> {
    fn pass(&self) -> u8 {
        match self.previous {
            Some(prev) if prev.size == self.footprint.size => 0,
            Some(_) => 1,
            None => 2,
        }
    }
}

/// Fold a fresh entity list into `current`.
///
/// Items are laid down in three passes:
/// 1. persisting items whose footprint is unchanged, at their old anchor;
/// 2. persisting items that changed size, at their old anchor when still legal;
/// 3. new items, at the first free cell in row-major order.
///
/// A card the user placed is therefore never evicted by a newcomer or by a
/// neighbour that grew. Output order follows `entities`.
pub fn reconcile<'a, F>(
    current: &'a LayoutSnapshot,
    entities: &'a [Entity],
    mut widget_of: F,
) -> Reconciled
where
    F: FnMut(&Entity) -> Footprint,
{
    let dims = current.dims;
    let mut report = ReconcileReport::default();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut pending: Vec<Pending<'a>> = Vec::with_capacity(entities.len());

    for entity in entities {
        if !seen.insert(entity.id()) {
            report.duplicates.push(entity.entity_id.clone());
            continue;
        }
        let footprint = widget_of(entity);
        let previous = current.get(entity.id());
        let size = match previous {
            Some(prev) if prev.widget_id == footprint.widget_id => prev.size,
            _ => footprint.size,
        };
        if !size.is_valid() {
            report.excluded.push(GridError::InvalidSize {
                id: entity.entity_id.clone(),
                width: size.width,
                height: size.height,
            });
            continue;
        }
        pending.push(Pending {
            entity,
            footprint: Footprint::new(footprint.widget_id, size),
            previous,
        });
    }

    let mut slots: Vec<Option<GridItem>> = vec![None; pending.len()];
    let mut placed: Vec<GridItem> = Vec::with_capacity(pending.len());

    let mut order: Vec<(usize, &Pending<'a>)> = pending.iter().enumerate().collect();
    order.sort_by_key(|(_, entry)| entry.pass());

    for (slot, entry) in order {
        let preferred = entry.previous.map(GridItem::position);
        let placement = place(dims, entry.entity.id(), entry.footprint.size, preferred, &placed);
        let position = placement.position();

        if placement.is_fallback() {
            report.fallbacks.push(GridError::NoLegalPlacement {
                id: entry.entity.entity_id.clone(),
            });
        }
        match entry.previous {
            Some(prev) if prev.position != position => {
                report.moved.push(entry.entity.entity_id.clone());
            }
            Some(_) => {}
            None => report.added.push(entry.entity.entity_id.clone()),
        }

        let item = GridItem {
            id: entry.entity.entity_id.clone(),
            widget_id: entry.footprint.widget_id.clone(),
            size: entry.footprint.size,
            position,
            payload: entry.entity.clone(),
        };
        placed.push(item.clone());
        slots[slot] = Some(item);
    }

    let kept: HashSet<&str> = pending.iter().map(|p| p.entity.id()).collect();
    report.removed = current
        .items
        .iter()
        .filter(|item| !kept.contains(item.id()))
        .map(|item| item.id.clone())
        .collect();

    let items: Vec<GridItem> = slots.into_iter().flatten().collect();
    let mut snapshot = LayoutSnapshot::from_items(current.version, dims, items);
    report.changed = !snapshot.same_layout(current);
    if report.changed {
        snapshot.version = current.version + 1;
    }

    Reconciled { snapshot, report }
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Moved { from: Position, to: Position },
    Unchanged,
}

/// Owner of the authoritative layout. Every mutation (reconcile or move)
/// goes through this type, which is where the no-overlap invariant is
/// checked.
#[derive(Debug, Clone)]
pub struct LayoutStore {
    current: Arc<LayoutSnapshot>,
}

impl LayoutStore {
    pub fn new(dims: GridDimensions) -> Self {
        Self {
            current: Arc::new(LayoutSnapshot::empty(dims)),
        }
    }

    pub fn snapshot(&self) -> Arc<LayoutSnapshot> {
        Arc::clone(&self.current)
    }

    /// Borrow the current snapshot without bumping the refcount.
    pub fn current(&self) -> &LayoutSnapshot {
        &self.current
    }

    pub fn dims(&self) -> GridDimensions {
        self.current.dims
    }

    pub fn reconcile<F>(&mut self, entities: &[Entity], widget_of: F) -> ReconcileReport
    where
        F: FnMut(&Entity) -> Footprint,
    {
        let Reconciled { snapshot, report } = reconcile(&self.current, entities, widget_of);
        self.current = Arc::new(snapshot);
        report
    }

    /// Move `id` to `to` if the destination is inside the board and clear
    /// of every other item.
    pub fn commit_move(&mut self, id: &str, to: Position) -> Result<CommitOutcome, GridError> {
        let from = match self.current.get(id) {
            Some(item) => item.position,
            None => {
                return Err(GridError::IllegalDrop {
                    id: id.to_string(),
                    reason: DropRejection::ItemMissing,
                });
            }
        };
        if from == to {
            return Ok(CommitOutcome::Unchanged);
        }
        self.current
            .check_move(id, to)
            .map_err(|reason| GridError::IllegalDrop {
                id: id.to_string(),
                reason,
            })?;

        let items = self
            .current
            .items
            .iter()
            .map(|item| {
                if item.id == id {
                    item.moved_to(to)
                } else {
                    item.clone()
                }
            })
            .collect();
        let version = self.current.version + 1;
        self.current = Arc::new(LayoutSnapshot::from_items(version, self.current.dims, items));
        Ok(CommitOutcome::Moved { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> GridDimensions {
        GridDimensions::new(16, 9).unwrap()
    }

    fn entities(ids: &[&str]) -> Vec<Entity> {
        ids.iter().map(|id| Entity::new(*id)).collect()
    }

    fn unit(_: &Entity) -> Footprint {
        Footprint::new("default-card", Size::new(1, 1))
    }

    fn by_domain(entity: &Entity) -> Footprint {
        match entity.domain() {
            "light" => Footprint::new("light-card", Size::new(2, 2)),
            "climate" => Footprint::new("thermostat-card", Size::new(2, 4)),
            _ => Footprint::new("default-card", Size::new(1, 1)),
        }
    }

    #[test]
    fn fresh_items_fill_row_major() {
        let empty = LayoutSnapshot::empty(dims());
        let list = entities(&["e1", "e2"]);
        let Reconciled { snapshot, report } = reconcile(&empty, &list, unit);

        assert_eq!(snapshot.position_of("e1"), Some(Position::new(0, 0)));
        assert_eq!(snapshot.position_of("e2"), Some(Position::new(1, 0)));
        assert_eq!(report.added, vec!["e1".to_string(), "e2".to_string()]);
        assert!(report.changed);
        assert_eq!(snapshot.version(), 1);
    }

    #[test]
    fn reconcile_is_deterministic_from_empty() {
        let list = entities(&["light.a", "climate.b", "sensor.c", "light.d", "sensor.e"]);
        let first = reconcile(&LayoutSnapshot::empty(dims()), &list, by_domain).snapshot;
        let second = reconcile(&LayoutSnapshot::empty(dims()), &list, by_domain).snapshot;
        assert_eq!(first.positions(), second.positions());
        assert!(first.overlapping_pairs().is_empty());
    }

    #[test]
    fn rerun_on_unchanged_input_is_stable() {
        let list = entities(&["light.a", "climate.b", "sensor.c", "light.d"]);
        let first = reconcile(&LayoutSnapshot::empty(dims()), &list, by_domain).snapshot;
        let Reconciled { snapshot, report } = reconcile(&first, &list, by_domain);

        assert_eq!(snapshot.positions(), first.positions());
        assert!(!report.changed);
        assert!(report.moved.is_empty());
        assert_eq!(snapshot.version(), first.version());
    }

    #[test]
    fn persisting_items_keep_user_positions() {
        let mut store = LayoutStore::new(dims());
        store.reconcile(&entities(&["a", "b"]), unit);
        store.commit_move("b", Position::new(7, 4)).unwrap();

        let report = store.reconcile(&entities(&["c", "b", "a"]), unit);
        let snapshot = store.snapshot();
        assert_eq!(snapshot.position_of("b"), Some(Position::new(7, 4)));
        assert_eq!(snapshot.position_of("a"), Some(Position::new(0, 0)));
        assert_eq!(snapshot.position_of("c"), Some(Position::new(1, 0)));
        assert_eq!(report.added, vec!["c".to_string()]);
        let order: Vec<&str> = snapshot.items().iter().map(GridItem::id).collect();
        assert_eq!(order, vec!["c", "b", "a"]);
    }

    #[test]
    fn missing_entities_are_dropped() {
        let mut store = LayoutStore::new(dims());
        store.reconcile(&entities(&["a", "b", "c"]), unit);
        let report = store.reconcile(&entities(&["a", "c"]), unit);

        assert_eq!(report.removed, vec!["b".to_string()]);
        assert!(store.snapshot().get("b").is_none());
        assert_eq!(store.snapshot().position_of("c"), Some(Position::new(2, 0)));
    }

    #[test]
    fn size_follows_widget_only_when_widget_changes() {
        let mut store = LayoutStore::new(dims());
        store.reconcile(&[Entity::new("sensor.x")], by_domain);
        assert_eq!(store.snapshot().get("sensor.x").unwrap().size(), Size::new(1, 1));

        // Same widget, different default size: the footprint is retained.
        store.reconcile(&[Entity::new("sensor.x")], |_| {
            Footprint::new("default-card", Size::new(3, 3))
        });
        assert_eq!(store.snapshot().get("sensor.x").unwrap().size(), Size::new(1, 1));

        store.reconcile(&[Entity::new("sensor.x")], |_| {
            Footprint::new("graph-card", Size::new(3, 2))
        });
        let item = store.snapshot().get("sensor.x").cloned().unwrap();
        assert_eq!(item.widget_id(), "graph-card");
        assert_eq!(item.size(), Size::new(3, 2));
    }

    #[test]
    fn growing_widget_does_not_evict_unchanged_neighbour() {
        let mut store = LayoutStore::new(dims());
        store.reconcile(&entities(&["a", "b"]), unit);
        assert_eq!(store.snapshot().position_of("b"), Some(Position::new(1, 0)));

        let report = store.reconcile(&entities(&["a", "b"]), |entity| {
            if entity.id() == "a" {
                Footprint::new("graph-card", Size::new(2, 2))
            } else {
                Footprint::new("default-card", Size::new(1, 1))
            }
        });

        let snapshot = store.snapshot();
        assert_eq!(snapshot.position_of("b"), Some(Position::new(1, 0)));
        assert_eq!(snapshot.position_of("a"), Some(Position::new(2, 0)));
        assert_eq!(report.moved, vec!["a".to_string()]);
        assert!(snapshot.overlapping_pairs().is_empty());
        let order: Vec<&str> = snapshot.items().iter().map(GridItem::id).collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn invalid_sizes_are_excluded() {
        let empty = LayoutSnapshot::empty(dims());
        let list = entities(&["ok", "bad"]);
        let Reconciled { snapshot, report } = reconcile(&empty, &list, |entity| {
            if entity.id() == "bad" {
                Footprint::new("broken", Size::new(0, 2))
            } else {
                Footprint::new("default-card", Size::new(1, 1))
            }
        });

        assert_eq!(snapshot.len(), 1);
        assert!(matches!(
            report.excluded.as_slice(),
            [GridError::InvalidSize { id, width: 0, height: 2 }] if id == "bad"
        ));
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let empty = LayoutSnapshot::empty(dims());
        let list = vec![
            Entity::new("a").with_state("first"),
            Entity::new("a").with_state("second"),
        ];
        let Reconciled { snapshot, report } = reconcile(&empty, &list, unit);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("a").unwrap().payload().state, "first");
        assert_eq!(report.duplicates, vec!["a".to_string()]);
    }

    #[test]
    fn overflow_uses_fallback_and_reports_it() {
        let small = GridDimensions::new(2, 2).unwrap();
        let empty = LayoutSnapshot::empty(small);
        let list = entities(&["a", "b"]);
        let Reconciled { snapshot, report } = reconcile(&empty, &list, |_| {
            Footprint::new("wide", Size::new(2, 2))
        });

        assert_eq!(snapshot.position_of("a"), Some(Position::new(0, 0)));
        assert_eq!(snapshot.position_of("b"), Some(Position::new(0, 0)));
        assert_eq!(
            report.fallbacks,
            vec![GridError::NoLegalPlacement { id: "b".into() }]
        );
        assert_eq!(snapshot.overlapping_pairs().len(), 1);
    }

    #[test]
    fn payload_refresh_without_layout_change_keeps_version() {
        let mut store = LayoutStore::new(dims());
        store.reconcile(&[Entity::new("a").with_state("off")], unit);
        let before = store.snapshot();
        let report = store.reconcile(&[Entity::new("a").with_state("on")], unit);

        assert!(!report.changed);
        assert_eq!(store.snapshot().version(), before.version());
        assert_eq!(store.snapshot().get("a").unwrap().payload().state, "on");
        assert_eq!(before.get("a").unwrap().payload().state, "off");
    }

    #[test]
    fn reordering_entities_keeps_version() {
        let mut store = LayoutStore::new(dims());
        store.reconcile(&entities(&["a", "b", "c"]), unit);
        let before = store.snapshot();
        let report = store.reconcile(&entities(&["c", "a", "b"]), unit);

        assert!(!report.changed);
        assert_eq!(store.snapshot().version(), before.version());
        assert_eq!(store.snapshot().positions(), before.positions());
        let snapshot = store.snapshot();
        let order: Vec<&str> = snapshot.items().iter().map(GridItem::id).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn commit_move_validates_destination() {
        let mut store = LayoutStore::new(dims());
        store.reconcile(&entities(&["a", "b"]), unit);

        let overlap = store.commit_move("b", Position::new(0, 0)).unwrap_err();
        assert!(matches!(
            overlap,
            GridError::IllegalDrop { reason: DropRejection::Overlap, .. }
        ));

        let outside = store.commit_move("b", Position::new(16, 0)).unwrap_err();
        assert!(matches!(
            outside,
            GridError::IllegalDrop { reason: DropRejection::OutOfBounds, .. }
        ));

        let missing = store.commit_move("zzz", Position::new(3, 3)).unwrap_err();
        assert!(matches!(
            missing,
            GridError::IllegalDrop { reason: DropRejection::ItemMissing, .. }
        ));

        let version = store.snapshot().version();
        assert_eq!(
            store.commit_move("b", Position::new(5, 5)).unwrap(),
            CommitOutcome::Moved {
                from: Position::new(1, 0),
                to: Position::new(5, 5)
            }
        );
        assert_eq!(store.snapshot().version(), version + 1);
        assert_eq!(
            store.commit_move("b", Position::new(5, 5)).unwrap(),
            CommitOutcome::Unchanged
        );
    }

    #[test]
    fn old_snapshots_survive_commits() {
        let mut store = LayoutStore::new(dims());
        store.reconcile(&entities(&["a"]), unit);
        let held = store.snapshot();
        store.commit_move("a", Position::new(4, 4)).unwrap();

        assert_eq!(held.position_of("a"), Some(Position::new(0, 0)));
        assert_eq!(store.snapshot().position_of("a"), Some(Position::new(4, 4)));
    }
}
