use fixedbitset::FixedBitSet;
use rayon::prelude::*;
use std::{collections::BTreeMap, ops::Index};

use crate::{Catalog, Id, SolverError};

/// For every tile and every slot it plugs, the tiles allowed to sit on the
/// far side of that slot.
#[derive(Clone, Debug)]
pub struct PossibilityMap<Sl> {
    masks: Vec<BTreeMap<Sl, FixedBitSet>>,
}

impl<Sl: Id> PossibilityMap<Sl> {
    /// Tile `b` is allowed across slot `s` of tile `a` when `a` plugs the
    /// socket `b` shows on `matching_slot(s)`.
    pub fn new<T: Id, So: Id>(
        catalog: &Catalog<T, Sl, So>,
        matching_slot: &(dyn Fn(&Sl) -> Sl + Sync),
    ) -> Self {
        let n = catalog.len();
        let masks = catalog
            .tiles()
            .par_iter()
            .map(|tile| {
                tile.plugs()
                    .iter()
                    .map(|(slot, accepted)| {
                        let inverse = matching_slot(slot);
                        let mut mask = FixedBitSet::with_capacity(n);
                        for (i, other) in catalog.tiles().iter().enumerate() {
                            if other
                                .socket(&inverse)
                                .is_some_and(|socket| accepted.contains(socket))
                            {
                                mask.insert(i);
                            }
                        }
                        (slot.clone(), mask)
                    })
                    .collect()
            })
            .collect();
        Self { masks }
    }

    /// Number of tiles covered.
    pub fn len(&self) -> usize {
        self.masks.len()
    }

    /// True if the map covers no tiles.
    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    /// Tiles allowed across `slot` from `tile`.
    ///
    /// # Errors
    ///
    /// Fails if `tile` is out of range or has no plug on `slot`.
    pub fn allowed(&self, tile: usize, slot: &Sl) -> Result<&FixedBitSet, SolverError> {
        let slots = self
            .masks
            .get(tile)
            .ok_or_else(|| SolverError::UnknownTile(format!("index {tile}")))?;
        slots
            .get(slot)
            .ok_or_else(|| SolverError::MissingPlug {
                tile: tile.to_string(),
                slot: format!("{slot:?}"),
            })
    }

    /// Union of the allowed sets of every tile in `tiles` across `slot`: the
    /// constraint a cell holding `tiles` projects onto that neighbour.
    ///
    /// # Errors
    ///
    /// Fails if any tile in `tiles` has no plug on `slot`.
    pub fn project(&self, tiles: &FixedBitSet, slot: &Sl) -> Result<FixedBitSet, SolverError> {
        let mut projection = FixedBitSet::with_capacity(self.len());
        for tile in tiles.ones() {
            projection.union_with(self.allowed(tile, slot)?);
        }
        Ok(projection)
    }

    /// Checks that `b` is allowed across `s` from `a` exactly when `a` is
    /// allowed across `matching_slot(s)` from `b`.
    pub fn is_symmetric(&self, matching_slot: &dyn Fn(&Sl) -> Sl) -> bool {
        self.masks.iter().enumerate().all(|(a, slots)| {
            slots.iter().all(|(slot, mask)| {
                let inverse = matching_slot(slot);
                (0..self.len()).all(|b| {
                    let back = self.masks[b]
                        .get(&inverse)
                        .is_some_and(|reverse| reverse.contains(a));
                    mask.contains(b) == back
                })
            })
        })
    }
}

impl<Sl> Index<usize> for PossibilityMap<Sl> {
    type Output = BTreeMap<Sl, FixedBitSet>;
    fn index(&self, idx: usize) -> &Self::Output {
        &self.masks[idx]
    }
}
