use rand::Rng;
use sim_types::{Direction, GridPosition, ResourceCell, ResourceKind};
use std::collections::BTreeMap;

/// The cell `distance` steps away in `direction`, wrapped onto the torus.
pub(crate) fn neighbor(
    position: GridPosition,
    direction: Direction,
    distance: i32,
    field_size: u32,
) -> GridPosition {
    let (dx, dy) = direction.offset();
    GridPosition::new(position.x + dx * distance, position.y + dy * distance).wrapped(field_size)
}

pub(crate) fn random_position<R: Rng + ?Sized>(field_size: u32, rng: &mut R) -> GridPosition {
    let size = field_size.max(1) as i32;
    GridPosition::new(rng.random_range(0..size), rng.random_range(0..size))
}

pub(crate) fn random_direction<R: Rng + ?Sized>(rng: &mut R) -> Direction {
    Direction::ALL[rng.random_range(0..Direction::ALL.len())]
}

/// Sparse toroidal map of cell to resource. A cell holds at most one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGrid {
    field_size: u32,
    cells: BTreeMap<GridPosition, ResourceKind>,
}

impl ResourceGrid {
    pub fn new(field_size: u32) -> Self {
        Self {
            field_size,
            cells: BTreeMap::new(),
        }
    }

    pub fn field_size(&self) -> u32 {
        self.field_size
    }

    /// Places `kind` at `position`. Returns `false` and leaves the grid
    /// untouched when the cell is already taken.
    pub fn place(&mut self, kind: ResourceKind, position: GridPosition) -> bool {
        let position = position.wrapped(self.field_size);
        if self.cells.contains_key(&position) {
            return false;
        }
        self.cells.insert(position, kind);
        true
    }

    pub fn place_random<R: Rng + ?Sized>(&mut self, kind: ResourceKind, rng: &mut R) -> bool {
        let position = random_position(self.field_size, rng);
        self.place(kind, position)
    }

    pub fn remove(&mut self, position: GridPosition) -> Option<ResourceKind> {
        self.cells.remove(&position.wrapped(self.field_size))
    }

    pub fn at(&self, position: GridPosition) -> Option<ResourceKind> {
        self.cells
            .get(&position.wrapped(self.field_size))
            .copied()
    }

    /// Clears every cell and resizes the torus.
    pub fn reset(&mut self, field_size: u32) {
        self.field_size = field_size;
        self.cells.clear();
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.cells.values().filter(|cell| **cell == kind).count()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GridPosition, ResourceKind)> + '_ {
        self.cells.iter().map(|(position, kind)| (*position, *kind))
    }

    pub(crate) fn cells(&self) -> Vec<ResourceCell> {
        self.iter()
            .map(|(position, kind)| ResourceCell {
                x: position.x,
                y: position.y,
                kind,
            })
            .collect()
    }
}
