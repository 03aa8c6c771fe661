use fixedbitset::FixedBitSet;
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::collections::VecDeque;
use tracing::{debug, warn};

use super::{AdjacentCells, Neighbour, RandomSource, Solver, Stats, TileWeighting};
use crate::{Catalog, DebugTag, Entropy, Field, History, Id, PossibilityMap, SolverError};

type MatchingSlot<'a, Sl> = Box<dyn Fn(&Sl) -> Sl + Send + Sync + 'a>;

/// Collects everything a [`Solver`] needs before the first step.
///
/// `field`, `adjacent_cells`, `matching_slot` and `boundary_socket` are
/// required; the rest fall back to uniform choice, the thread RNG and no
/// debug tags.
pub struct SolverBuilder<'a, C, T, Sl, So> {
    catalog: &'a Catalog<T, Sl, So>,
    field: Option<Field<C, Sl>>,
    adjacent_cells: Option<AdjacentCells<'a, C, Sl>>,
    matching_slot: Option<MatchingSlot<'a, Sl>>,
    boundary_socket: Option<So>,
    tile_weighting: Option<TileWeighting<'a, C>>,
    random: Option<RandomSource<'a>>,
    debug: bool,
}

impl<'a, C: Id, T: Id, Sl: Id, So: Id> SolverBuilder<'a, C, T, Sl, So> {
    /// Starts configuring a solve over `catalog`.
    pub fn new(catalog: &'a Catalog<T, Sl, So>) -> Self {
        Self {
            catalog,
            field: None,
            adjacent_cells: None,
            matching_slot: None,
            boundary_socket: None,
            tile_weighting: None,
            random: None,
            debug: false,
        }
    }

    /// The starting field. Cells holding a single tile count as seeds.
    #[must_use]
    pub fn field(mut self, field: Field<C, Sl>) -> Self {
        self.field = Some(field);
        self
    }

    /// What lies across each slot of a cell.
    #[must_use]
    pub fn adjacent_cells(
        mut self,
        adjacent_cells: impl Fn(&C) -> Vec<(Sl, Neighbour<C>)> + 'a,
    ) -> Self {
        self.adjacent_cells = Some(Box::new(adjacent_cells));
        self
    }

    /// The slot facing back across a given slot.
    #[must_use]
    pub fn matching_slot(mut self, matching_slot: impl Fn(&Sl) -> Sl + Send + Sync + 'a) -> Self {
        self.matching_slot = Some(Box::new(matching_slot));
        self
    }

    /// The socket a tile must show on a slot that faces out of the field.
    #[must_use]
    pub fn boundary_socket(mut self, socket: So) -> Self {
        self.boundary_socket = Some(socket);
        self
    }

    /// Biases random choice: weight of a tile index at a cell.
    #[must_use]
    pub fn tile_weighting(mut self, weighting: impl Fn(usize, &C) -> f64 + 'a) -> Self {
        self.tile_weighting = Some(Box::new(weighting));
        self
    }

    /// Weights random choice by each tile's catalog weight.
    #[must_use]
    pub fn catalog_weights(self) -> Self {
        let catalog = self.catalog;
        self.tile_weighting(move |tile, _| catalog.weight(tile))
    }

    /// Source of random draws in `[0, 1)`.
    #[must_use]
    pub fn random_source(mut self, random: impl FnMut() -> f64 + 'a) -> Self {
        self.random = Some(Box::new(random));
        self
    }

    /// Draws from `rng`.
    #[must_use]
    pub fn rng<R: Rng + 'a>(self, mut rng: R) -> Self {
        self.random_source(move || rng.random::<f64>())
    }

    /// Draws from a [`StdRng`] seeded with `seed`.
    #[must_use]
    pub fn seed(self, seed: u64) -> Self {
        self.rng(StdRng::seed_from_u64(seed))
    }

    /// Enables per-cell debug tags and the extra inspection steps.
    #[must_use]
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Builds the possibility map, applies the boundary pre-pass and queues
    /// every seeded or boundary-narrowed cell for propagation.
    ///
    /// # Errors
    ///
    /// Fails when required configuration is missing, with
    /// [`SolverError::UnknownTile`] when a cell holds a tile index outside the
    /// catalog, or with [`SolverError::RollbackExhausted`] when the starting
    /// field already leaves some cell without candidates.
    pub fn build(self) -> Result<Solver<'a, C, T, Sl, So>, SolverError> {
        let mut field = self.field.ok_or(SolverError::MissingConfig("field"))?;
        let adjacent_cells = self
            .adjacent_cells
            .ok_or(SolverError::MissingConfig("adjacent_cells"))?;
        let matching_slot = self
            .matching_slot
            .ok_or(SolverError::MissingConfig("matching_slot"))?;
        let boundary_socket = self
            .boundary_socket
            .ok_or(SolverError::MissingConfig("boundary_socket"))?;
        for cell in field.cells() {
            if let Some(tile) = cell.tile_map().ones().find(|&tile| tile >= self.catalog.len()) {
                return Err(SolverError::UnknownTile(format!(
                    "index {tile} in cell {:?}",
                    cell.id()
                )));
            }
        }
        let mut random = self.random.unwrap_or_else(|| {
            let mut rng = rand::rng();
            Box::new(move || rng.random::<f64>())
        });

        let possibilities = PossibilityMap::new(self.catalog, &*matching_slot);
        if !possibilities.is_symmetric(&*matching_slot) {
            warn!("possibility map is not symmetric under the slot pairing");
        }

        let mut pending: VecDeque<C> = field
            .cells()
            .filter(|cell| cell.is_collapsed())
            .map(|cell| cell.id().clone())
            .collect();
        for id in apply_boundary(self.catalog, &mut field, &adjacent_cells, &boundary_socket) {
            if !pending.contains(&id) {
                pending.push_back(id);
            }
        }

        if let Some(empty) = field.cells().find(|cell| cell.count() == 0) {
            warn!(cell = ?empty.id(), "starting field leaves a cell without candidates");
            return Err(SolverError::RollbackExhausted);
        }

        let entropy = Entropy::new(&field, &mut *random);
        let debug_tags = self.debug.then(|| {
            field
                .cells()
                .map(|cell| (cell.id().clone(), DebugTag::Default))
                .collect()
        });
        debug!(
            cells = field.len(),
            tiles = self.catalog.len(),
            pending = pending.len(),
            "solver ready"
        );

        Ok(Solver {
            catalog: self.catalog,
            possibilities,
            adjacent_cells,
            tile_weighting: self.tile_weighting,
            random,
            initial_field: field.clone(),
            initial_entropy: entropy.clone(),
            field,
            entropy,
            debug: debug_tags,
            history: History::default(),
            pending,
            visit: None,
            retry: None,
            stats: Stats::default(),
            finished: false,
        })
    }
}

/// Removes, from every cell facing out of the field, the tiles that do not
/// show `boundary_socket` on the outward slots. Returns the narrowed cells.
fn apply_boundary<C: Id, T: Id, Sl: Id, So: Id>(
    catalog: &Catalog<T, Sl, So>,
    field: &mut Field<C, Sl>,
    adjacent_cells: &AdjacentCells<'_, C, Sl>,
    boundary_socket: &So,
) -> Vec<C> {
    let ids: Vec<C> = field.cells().map(|cell| cell.id().clone()).collect();
    let mut changed = Vec::new();

    for id in ids {
        let cell = &field[&id];
        let outward: Vec<Sl> = adjacent_cells(&id)
            .into_iter()
            .filter(|(slot, neighbour)| {
                matches!(neighbour, Neighbour::Boundary) && cell.slots().contains(slot)
            })
            .map(|(slot, _)| slot)
            .collect();
        if outward.is_empty() {
            continue;
        }

        let mut allowed = FixedBitSet::with_capacity(catalog.len());
        for tile in cell.tile_map().ones() {
            if outward
                .iter()
                .all(|slot| catalog[tile].socket(slot) == Some(boundary_socket))
            {
                allowed.insert(tile);
            }
        }

        if allowed.count_ones(..) < cell.count() {
            field.modify(&id, |cell| cell.restrict(allowed));
            changed.push(id);
        }
    }

    changed
}
