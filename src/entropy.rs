use im::OrdMap;
use std::{
    fmt::{Debug, Formatter},
    ops::Index,
};

use crate::{Field, Id};

/// Collapsed cells hold exactly this value and are never selected.
pub(crate) const COLLAPSED: f64 = 1.0;

const JITTER_SCALE: f64 = 1.0 / 16.0;

/// Per-cell uncertainty: the candidate count plus a small random jitter, or
/// exactly `1` for collapsed cells.
#[derive(Clone)]
pub struct Entropy<C> {
    values: OrdMap<C, f64>,
}

impl<C: Id> Entropy<C> {
    /// Scores every cell of `field`, drawing one jitter value per
    /// uncollapsed cell in identifier order.
    pub fn new<Sl: Id>(field: &Field<C, Sl>, random: &mut dyn FnMut() -> f64) -> Self {
        Self {
            values: field
                .cells()
                .map(|cell| (cell.id().clone(), score(cell.count(), random)))
                .collect(),
        }
    }

    /// Entropy of `id`.
    pub fn get(&self, id: &C) -> Option<f64> {
        self.values.get(id).copied()
    }

    /// Number of scored cells.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if no cells are scored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Every cell and its score in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&C, f64)> {
        self.values.iter().map(|(id, value)| (id, *value))
    }

    /// The uncollapsed cell with the smallest score; ties go to the smallest
    /// identifier.
    #[allow(clippy::float_cmp)]
    pub fn lowest(&self) -> Option<&C> {
        self.values
            .iter()
            .filter(|(_, value)| **value != COLLAPSED)
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(id, _)| id)
    }

    pub(crate) fn set_collapsed(&mut self, id: C) {
        self.values.insert(id, COLLAPSED);
    }

    pub(crate) fn rescore(&mut self, id: C, count: usize, random: &mut dyn FnMut() -> f64) {
        self.values.insert(id, score(count, random));
    }
}

impl<C: Id> Debug for Entropy<C> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.debug_map().entries(self.values.iter()).finish()
    }
}

impl<C: Id> PartialEq for Entropy<C> {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl<C: Id> Index<&C> for Entropy<C> {
    type Output = f64;
    fn index(&self, id: &C) -> &Self::Output {
        &self.values[id]
    }
}

fn score(count: usize, random: &mut dyn FnMut() -> f64) -> f64 {
    if count == 1 {
        COLLAPSED
    } else {
        count as f64 + random() * JITTER_SCALE
    }
}
