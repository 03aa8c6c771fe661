mod builder;
mod snapshot;

use fixedbitset::FixedBitSet;
use std::collections::VecDeque;
use tracing::{debug, info, trace, warn};

pub use builder::SolverBuilder;
pub use snapshot::{Event, Snapshot, Step};

use crate::{
    Catalog, CollapseEntry, DebugTag, DebugTags, Entropy, Field, History, HistoryEntry, Id,
    PossibilityMap, SolverError, UpdateEntry,
};

type AdjacentCells<'a, C, Sl> = Box<dyn Fn(&C) -> Vec<(Sl, Neighbour<C>)> + 'a>;
type TileWeighting<'a, C> = Box<dyn Fn(usize, &C) -> f64 + 'a>;
type RandomSource<'a> = Box<dyn FnMut() -> f64 + 'a>;

/// What lies across one slot of a cell.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Neighbour<C> {
    /// Another cell of the field.
    Cell(C),
    /// The outside of the field.
    Boundary,
}

/// Counts of the changes a solve has made so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Random collapses, including retries.
    pub collapses: usize,
    /// Propagation updates.
    pub updates: usize,
    /// Rollbacks.
    pub rollbacks: usize,
}

// A queued cell whose projection onto its neighbours is being applied.
struct Visit<C> {
    source: C,
    announced: bool,
    checks: VecDeque<Check<C>>,
}

struct Check<C> {
    neighbour: C,
    allowed: FixedBitSet,
    inspected: bool,
}

/// Step-wise Wave Function Collapse solver.
///
/// Each call to [`step`](Self::step) performs one state change (a collapse,
/// a propagation update or a rollback) and returns the resulting
/// [`Snapshot`]. In debug mode the inspections in between are returned as
/// steps too. The solver is also an iterator over those snapshots.
pub struct Solver<'a, C, T, Sl, So> {
    catalog: &'a Catalog<T, Sl, So>,
    possibilities: PossibilityMap<Sl>,
    adjacent_cells: AdjacentCells<'a, C, Sl>,
    tile_weighting: Option<TileWeighting<'a, C>>,
    random: RandomSource<'a>,
    initial_field: Field<C, Sl>,
    initial_entropy: Entropy<C>,
    field: Field<C, Sl>,
    entropy: Entropy<C>,
    debug: Option<DebugTags<C>>,
    history: History<C, Sl>,
    pending: VecDeque<C>,
    visit: Option<Visit<C>>,
    retry: Option<(C, FixedBitSet)>,
    stats: Stats,
    finished: bool,
}

impl<'a, C: Id, T: Id, Sl: Id, So: Id> Solver<'a, C, T, Sl, So> {
    /// Starts configuring a solve over `catalog`.
    pub fn builder(catalog: &'a Catalog<T, Sl, So>) -> SolverBuilder<'a, C, T, Sl, So> {
        SolverBuilder::new(catalog)
    }

    /// The catalog being solved over.
    pub fn catalog(&self) -> &'a Catalog<T, Sl, So> {
        self.catalog
    }

    /// The possibility map built from the catalog.
    pub fn possibility_map(&self) -> &PossibilityMap<Sl> {
        &self.possibilities
    }

    /// The current field.
    pub fn field(&self) -> &Field<C, Sl> {
        &self.field
    }

    /// The current entropy.
    pub fn entropy(&self) -> &Entropy<C> {
        &self.entropy
    }

    /// The current debug tags, when debugging is enabled.
    pub fn debug_tags(&self) -> Option<&DebugTags<C>> {
        self.debug.as_ref()
    }

    /// Changes recorded since the last rollback point.
    pub fn history(&self) -> &History<C, Sl> {
        &self.history
    }

    /// Change counts so far.
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// True once the solve has finished or failed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The current state, tagged with `event`.
    pub fn snapshot(&self, event: Event<C>) -> Snapshot<C, Sl> {
        Snapshot {
            field: self.field.clone(),
            entropy: self.entropy.clone(),
            debug: self.debug.clone(),
            event,
        }
    }

    /// Performs the next state change.
    ///
    /// # Errors
    ///
    /// [`SolverError::RollbackExhausted`] when a contradiction cannot be
    /// undone, [`SolverError::Finished`] when called after the solve ended,
    /// and configuration or consistency errors found along the way. Any
    /// error ends the solve.
    pub fn step(&mut self) -> Result<Step<C, Sl>, SolverError> {
        if self.finished {
            return Err(SolverError::Finished);
        }
        let result = self.advance();
        if !matches!(result, Ok(Step::Progress(_))) {
            self.finished = true;
        }
        result
    }

    /// Steps until every cell is collapsed.
    ///
    /// # Errors
    ///
    /// Returns the first error [`step`](Self::step) reports.
    pub fn run(&mut self) -> Result<Snapshot<C, Sl>, SolverError> {
        loop {
            if let Step::Done(snapshot) = self.step()? {
                return Ok(snapshot);
            }
        }
    }

    /// Checks that every cell's collapse flag and entropy agree with its
    /// candidates.
    ///
    /// # Errors
    ///
    /// [`SolverError::Inconsistent`] naming the first offending cell.
    pub fn check_consistency(&self) -> Result<(), SolverError> {
        for cell in self.field.cells() {
            let count = cell.count();
            let entropy = self.entropy.get(cell.id());
            let consistent = match entropy {
                Some(value) if cell.is_collapsed() => count == 1 && value.to_bits() == 1f64.to_bits(),
                Some(value) => count > 1 && value.floor() as usize == count,
                None => false,
            };
            if !consistent {
                return Err(SolverError::Inconsistent(format!(
                    "{:?} (count {count}, collapsed {}, entropy {entropy:?})",
                    cell.id(),
                    cell.is_collapsed()
                )));
            }
        }
        Ok(())
    }

    fn advance(&mut self) -> Result<Step<C, Sl>, SolverError> {
        loop {
            if let Some(mut visit) = self.visit.take() {
                if !visit.announced {
                    visit.announced = true;
                    let source = visit.source.clone();
                    self.visit = Some(visit);
                    if self.debug.is_some() {
                        self.tag(&source, DebugTag::SourceCell);
                        return Ok(self.progress(Event::Inspected {
                            cell: source,
                            tag: DebugTag::SourceCell,
                        }));
                    }
                    continue;
                }

                if let Some(check) = visit.checks.pop_front() {
                    let source = visit.source.clone();
                    self.visit = Some(visit);
                    if let Some(step) = self.check(source, check)? {
                        return Ok(step);
                    }
                    continue;
                }

                self.tag(&visit.source, DebugTag::Default);
                continue;
            }

            if let Some(id) = self.pending.pop_front() {
                self.visit = Some(self.visit(id)?);
                continue;
            }

            let Some(id) = self.entropy.lowest().cloned() else {
                let remaining = self.field.uncollapsed();
                if remaining > 0 {
                    return Err(SolverError::Exhausted(remaining));
                }
                info!(
                    collapses = self.stats.collapses,
                    updates = self.stats.updates,
                    rollbacks = self.stats.rollbacks,
                    "field collapsed"
                );
                return Ok(Step::Done(self.snapshot(Event::Finished)));
            };

            if let Some(tags) = &mut self.debug {
                *tags = tags
                    .keys()
                    .map(|id| (id.clone(), DebugTag::Default))
                    .collect();
            }

            return match self.collapse(&id)? {
                Some(tile) => Ok(self.progress(Event::Collapsed { cell: id, tile })),
                None => {
                    debug!(cell = ?id, "no untried tile left, rolling back");
                    let cell = self.rollback()?;
                    Ok(self.progress(Event::RolledBack { cell }))
                }
            };
        }
    }

    /// Projects the candidates of `id` across each of its slots.
    fn visit(&self, id: C) -> Result<Visit<C>, SolverError> {
        let cell = self
            .field
            .get(&id)
            .ok_or_else(|| SolverError::UnknownCell(format!("{id:?}")))?;

        let mut checks = VecDeque::new();
        for (slot, neighbour) in (self.adjacent_cells)(&id) {
            let Neighbour::Cell(neighbour) = neighbour else {
                continue;
            };
            if !cell.slots().contains(&slot) {
                continue;
            }
            checks.push_back(Check {
                neighbour,
                allowed: self.possibilities.project(cell.tile_map(), &slot)?,
                inspected: false,
            });
        }

        Ok(Visit {
            source: id,
            announced: false,
            checks,
        })
    }

    /// Applies one projection to a neighbour. Returns a step when the
    /// neighbour changed, a contradiction forced a rollback, or (in debug
    /// mode) the neighbour was inspected.
    ///
    /// A collapsed neighbour is never narrowed, but its tile must still be
    /// allowed by the projection.
    fn check(&mut self, source: C, mut check: Check<C>) -> Result<Option<Step<C, Sl>>, SolverError> {
        let target = self
            .field
            .get(&check.neighbour)
            .ok_or_else(|| SolverError::UnknownCell(format!("{:?}", check.neighbour)))?;
        if let Some(tile) = target.tile() {
            if check.allowed.contains(tile) {
                return Ok(None);
            }
            return self.contradiction(&source, check.neighbour).map(Some);
        }

        if self.debug.is_some() && !check.inspected {
            check.inspected = true;
            let neighbour = check.neighbour.clone();
            if let Some(visit) = self.visit.as_mut() {
                visit.checks.push_front(check);
            }
            self.tag(&neighbour, DebugTag::CheckedCell);
            return Ok(Some(self.progress(Event::Inspected {
                cell: neighbour,
                tag: DebugTag::CheckedCell,
            })));
        }

        if check.allowed.is_superset(target.tile_map()) {
            if self.debug.is_some() {
                self.tag(&check.neighbour, DebugTag::NoChange);
                return Ok(Some(self.progress(Event::Inspected {
                    cell: check.neighbour,
                    tag: DebugTag::NoChange,
                })));
            }
            return Ok(None);
        }

        let mut narrowed = target.tile_map().clone();
        narrowed.intersect_with(&check.allowed);
        if narrowed.count_ones(..) == 0 {
            return self.contradiction(&source, check.neighbour).map(Some);
        }

        self.update(&source, &check.neighbour, narrowed);
        Ok(Some(self.progress(Event::Updated {
            source,
            cell: check.neighbour,
        })))
    }

    fn contradiction(&mut self, source: &C, cell: C) -> Result<Step<C, Sl>, SolverError> {
        debug!(source = ?source, cell = ?cell, "contradiction found, rolling back");
        self.tag(&cell, DebugTag::Conflict);
        let cell = self.rollback()?;
        Ok(self.progress(Event::RolledBack { cell }))
    }

    fn collapse(&mut self, id: &C) -> Result<Option<usize>, SolverError> {
        let tried = match self.retry.take() {
            Some((cell, tried)) if &cell == id => tried,
            _ => FixedBitSet::with_capacity(self.catalog.len()),
        };

        let cell = self
            .field
            .get(id)
            .ok_or_else(|| SolverError::UnknownCell(format!("{id:?}")))?;
        if cell.is_collapsed() {
            return Err(SolverError::Inconsistent(format!("{id:?} selected while collapsed")));
        }

        let mut options = cell.tile_map().clone();
        options.difference_with(&tried);
        let options: Vec<usize> = options.ones().collect();
        if options.is_empty() {
            return Ok(None);
        }

        let tile = self.choose(id, &options);
        self.field.modify(id, |cell| cell.observe(tile));
        self.entropy.set_collapsed(id.clone());
        self.tag(id, DebugTag::Collapsed);
        self.pending.push_back(id.clone());

        let mut tried = tried;
        tried.grow(self.catalog.len());
        tried.insert(tile);
        self.history.push(HistoryEntry::Collapse(CollapseEntry {
            field: self.field.clone(),
            entropy: self.entropy.clone(),
            cell: id.clone(),
            tile,
            tried,
        }));
        self.stats.collapses += 1;
        trace!(cell = ?id, tile, "collapsed cell");
        Ok(Some(tile))
    }

    /// Picks one of `options`: by cumulative weight against a single draw
    /// when weighting is configured, uniformly otherwise.
    fn choose(&mut self, id: &C, options: &[usize]) -> usize {
        debug_assert!(!options.is_empty(), "Options must not be empty");
        if options.len() == 1 {
            return options[0];
        }

        // One draw scaled by the total weight. `WeightedIndex` would need an
        // `Rng`, and the random source here is a plain closure.
        if let Some(weighting) = &self.tile_weighting {
            let weights: Vec<f64> = options
                .iter()
                .map(|&tile| weighting(tile, id).max(0.0))
                .collect();
            let total: f64 = weights.iter().sum();
            if total > 0.0 {
                let threshold = (self.random)() * total;
                let mut cumulative = 0.0;
                for (&tile, weight) in options.iter().zip(&weights) {
                    cumulative += weight;
                    if threshold < cumulative {
                        return tile;
                    }
                }
                return options[options.len() - 1];
            }
        }

        let index = ((self.random)() * options.len() as f64) as usize;
        options[index.min(options.len() - 1)]
    }

    fn update(&mut self, source: &C, id: &C, tiles: FixedBitSet) {
        let count = tiles.count_ones(..);
        self.field.modify(id, |cell| cell.restrict(tiles.clone()));
        self.entropy.rescore(id.clone(), count, &mut *self.random);
        self.pending.push_back(id.clone());
        self.history.push(HistoryEntry::Update(UpdateEntry {
            field: self.field.clone(),
            entropy: self.entropy.clone(),
            source: source.clone(),
            cell: id.clone(),
            tiles,
        }));
        self.tag(id, DebugTag::Changed);
        self.stats.updates += 1;
        trace!(source = ?source, cell = ?id, count, "narrowed cell");
    }

    /// Undoes everything since the most recent collapse and remembers the
    /// tiles already tried there. Returns the cell whose collapse was undone.
    fn rollback(&mut self) -> Result<C, SolverError> {
        let Some(index) = self.history.last_collapse() else {
            warn!(
                collapses = self.stats.collapses,
                rollbacks = self.stats.rollbacks,
                "contradiction with nothing left to roll back"
            );
            return Err(SolverError::RollbackExhausted);
        };
        let Some(HistoryEntry::Collapse(entry)) = self.history.truncate(index) else {
            return Err(SolverError::Inconsistent(format!("history entry {index}")));
        };

        match self.history.last() {
            Some(previous) => {
                self.field = previous.field().clone();
                self.entropy = previous.entropy().clone();
            }
            None => {
                self.field = self.initial_field.clone();
                self.entropy = self.initial_entropy.clone();
            }
        }
        self.pending.clear();
        self.visit = None;
        self.stats.rollbacks += 1;
        debug!(
            cell = ?entry.cell,
            tile = entry.tile,
            tried = entry.tried.count_ones(..),
            "rolled back collapse"
        );

        self.retry = Some((entry.cell.clone(), entry.tried));
        Ok(entry.cell)
    }

    fn tag(&mut self, id: &C, tag: DebugTag) {
        if let Some(tags) = &mut self.debug {
            tags.insert(id.clone(), tag);
        }
    }

    fn progress(&self, event: Event<C>) -> Step<C, Sl> {
        Step::Progress(self.snapshot(event))
    }
}

impl<C: Id, T: Id, Sl: Id, So: Id> Iterator for Solver<'_, C, T, Sl, So> {
    type Item = Result<Snapshot<C, Sl>, SolverError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        Some(self.step().map(Step::into_snapshot))
    }
}
