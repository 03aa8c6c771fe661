use im::OrdMap;
use std::{
    collections::BTreeMap,
    fmt::{Debug, Formatter},
    ops::Index,
};

use crate::{Catalog, Cell, Id};

/// Every cell of a solve, keyed by cell identifier.
///
/// A field is a persistent value: cloning is cheap and a changed field shares
/// all untouched cells with the one it came from, so earlier snapshots stay
/// valid.
#[derive(Clone)]
pub struct Field<C, Sl> {
    cells: OrdMap<C, Cell<C, Sl>>,
}

impl<C: Id, Sl: Id> Field<C, Sl> {
    /// Collects cells into a field.
    pub fn new(cells: impl IntoIterator<Item = Cell<C, Sl>>) -> Self {
        Self {
            cells: cells
                .into_iter()
                .map(|cell| (cell.id().clone(), cell))
                .collect(),
        }
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True if the field has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The cell with identifier `id`.
    pub fn get(&self, id: &C) -> Option<&Cell<C, Sl>> {
        self.cells.get(id)
    }

    /// All cells in identifier order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell<C, Sl>> {
        self.cells.values()
    }

    /// True once every cell holds exactly one tile.
    pub fn is_collapsed(&self) -> bool {
        self.cells.values().all(Cell::is_collapsed)
    }

    /// Number of cells still holding more than one tile.
    pub fn uncollapsed(&self) -> usize {
        self.cells.values().filter(|cell| !cell.is_collapsed()).count()
    }

    /// Tile index of every collapsed cell.
    pub fn assignment(&self) -> BTreeMap<C, usize> {
        self.cells
            .iter()
            .filter_map(|(id, cell)| cell.tile().map(|tile| (id.clone(), tile)))
            .collect()
    }

    /// Tile identifier of every collapsed cell.
    pub fn resolve<T: Id, So: Id>(&self, catalog: &Catalog<T, Sl, So>) -> BTreeMap<C, T> {
        self.assignment()
            .into_iter()
            .map(|(id, tile)| (id, catalog.id(tile).clone()))
            .collect()
    }

    /// Applies `change` to one cell, leaving every other cell shared.
    pub(crate) fn modify(&mut self, id: &C, change: impl FnOnce(&mut Cell<C, Sl>)) -> bool {
        match self.cells.get_mut(id) {
            Some(cell) => {
                change(cell);
                true
            }
            None => false,
        }
    }
}

impl<C: Id, Sl: Id> Debug for Field<C, Sl> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.debug_map().entries(self.cells.iter()).finish()
    }
}

impl<C: Id, Sl: Id> PartialEq for Field<C, Sl> {
    fn eq(&self, other: &Self) -> bool {
        self.cells == other.cells
    }
}

impl<C: Id, Sl: Id> Eq for Field<C, Sl> {}

impl<C: Id, Sl: Id> Index<&C> for Field<C, Sl> {
    type Output = Cell<C, Sl>;
    fn index(&self, id: &C) -> &Self::Output {
        &self.cells[id]
    }
}
