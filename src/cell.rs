use fixedbitset::FixedBitSet;
use std::collections::BTreeSet;

use crate::Id;

/// One unit of the field and the tiles it may still become.
///
/// `collapsed` always matches `tile_map` holding exactly one tile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell<C, Sl> {
    id: C,
    slots: BTreeSet<Sl>,
    tile_map: FixedBitSet,
    collapsed: bool,
    observed: bool,
}

impl<C: Id, Sl: Id> Cell<C, Sl> {
    /// Creates a cell with the given candidate tiles.
    ///
    /// A cell created with a single candidate counts as collapsed, which is
    /// how callers seed a solve.
    pub fn new(id: C, slots: impl IntoIterator<Item = Sl>, tile_map: FixedBitSet) -> Self {
        let collapsed = tile_map.count_ones(..) == 1;
        Self {
            id,
            slots: slots.into_iter().collect(),
            tile_map,
            collapsed,
            observed: false,
        }
    }

    /// Cell identifier.
    pub fn id(&self) -> &C {
        &self.id
    }

    /// Slots across which this cell is constrained.
    pub fn slots(&self) -> &BTreeSet<Sl> {
        &self.slots
    }

    /// Indices of the tiles still possible here.
    pub fn tile_map(&self) -> &FixedBitSet {
        &self.tile_map
    }

    /// Number of tiles still possible here.
    pub fn count(&self) -> usize {
        self.tile_map.count_ones(..)
    }

    /// The single remaining tile, once collapsed.
    pub fn tile(&self) -> Option<usize> {
        if self.collapsed {
            self.tile_map.ones().next()
        } else {
            None
        }
    }

    /// True once exactly one tile remains.
    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    /// True if this cell was collapsed by a random choice rather than by
    /// propagation.
    pub fn is_observed(&self) -> bool {
        self.observed
    }

    /// Commits the cell to `tile` by choice.
    pub(crate) fn observe(&mut self, tile: usize) {
        debug_assert!(self.tile_map.contains(tile), "Tile must be a candidate");
        self.tile_map.clear();
        self.tile_map.insert(tile);
        self.collapsed = true;
        self.observed = true;
    }

    /// Narrows the candidates to `tiles`, as forced by a neighbour.
    pub(crate) fn restrict(&mut self, tiles: FixedBitSet) {
        debug_assert!(tiles.is_subset(&self.tile_map), "Candidates may only shrink");
        self.tile_map = tiles;
        self.collapsed = self.count() == 1;
        self.observed = false;
    }
}
