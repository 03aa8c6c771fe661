use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{Id, SolverError};

const DEFAULT_WEIGHT: f64 = 1.0;

/// A tile variant: the socket it presents on every slot, and the sockets it
/// accepts from a neighbour across each slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize, Sl: Serialize, So: Serialize",
    deserialize = "T: Deserialize<'de>, Sl: Deserialize<'de> + Ord, So: Deserialize<'de> + Ord"
))]
pub struct Tile<T, Sl, So> {
    id: T,
    sockets: BTreeMap<Sl, So>,
    plugs: BTreeMap<Sl, BTreeSet<So>>,
    #[serde(default = "default_weight")]
    weight: f64,
}

fn default_weight() -> f64 {
    DEFAULT_WEIGHT
}

impl<T: Id, Sl: Id, So: Id> Tile<T, Sl, So> {
    /// Creates a tile with an explicit plug table.
    pub fn new(id: T, sockets: BTreeMap<Sl, So>, plugs: BTreeMap<Sl, BTreeSet<So>>) -> Self {
        Self {
            id,
            sockets,
            plugs,
            weight: DEFAULT_WEIGHT,
        }
    }

    /// Places `sockets[i]` on `slots[i]`; every slot plugs only its own socket.
    ///
    /// Surplus sockets are placed on the first slot.
    pub fn simple(id: T, slots: &[Sl], sockets: impl IntoIterator<Item = So>) -> Self {
        debug_assert!(!slots.is_empty(), "A tile needs at least one slot");
        let mut socket_map = BTreeMap::new();
        let mut plugs = BTreeMap::new();
        for (i, socket) in sockets.into_iter().enumerate() {
            let slot = slots.get(i).unwrap_or(&slots[0]).clone();
            plugs.insert(slot.clone(), BTreeSet::from([socket.clone()]));
            socket_map.insert(slot, socket);
        }
        Self::new(id, socket_map, plugs)
    }

    /// Sets the relative weight used by catalog-based weighting.
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        debug_assert!(weight >= 0.0, "Tile weight must not be negative");
        self.weight = weight;
        self
    }

    /// Returns a copy of this tile turned `rotations` steps along `slot_order`.
    ///
    /// # Errors
    ///
    /// Fails when `slot_order` is empty or names a slot this tile has no
    /// socket or plug for.
    pub fn rotated(&self, id: T, slot_order: &[Sl], rotations: i32) -> Result<Self, SolverError> {
        let missing = |slot: &Sl| SolverError::MissingPlug {
            tile: format!("{:?}", self.id),
            slot: format!("{slot:?}"),
        };

        let sockets = slot_order
            .iter()
            .map(|slot| self.sockets.get(slot).cloned().ok_or_else(|| missing(slot)))
            .collect::<Result<Vec<_>, _>>()?;
        let plugs = slot_order
            .iter()
            .map(|slot| self.plugs.get(slot).cloned().ok_or_else(|| missing(slot)))
            .collect::<Result<Vec<_>, _>>()?;

        let sockets = rotate_slots(&sockets, rotations)?;
        let plugs = rotate_slots(&plugs, rotations)?;

        Ok(Self {
            id,
            sockets: slot_order.iter().cloned().zip(sockets).collect(),
            plugs: slot_order.iter().cloned().zip(plugs).collect(),
            weight: self.weight,
        })
    }

    /// Tile identifier.
    pub fn id(&self) -> &T {
        &self.id
    }

    /// The socket shown on `slot`, if the tile has one there.
    pub fn socket(&self, slot: &Sl) -> Option<&So> {
        self.sockets.get(slot)
    }

    /// Every slot and the socket shown on it.
    pub fn sockets(&self) -> &BTreeMap<Sl, So> {
        &self.sockets
    }

    /// Every slot and the sockets accepted across it.
    pub fn plugs(&self) -> &BTreeMap<Sl, BTreeSet<So>> {
        &self.plugs
    }

    /// True if this tile accepts `socket` from a neighbour across `slot`.
    pub fn accepts(&self, slot: &Sl, socket: &So) -> bool {
        self.plugs
            .get(slot)
            .is_some_and(|accepted| accepted.contains(socket))
    }

    /// Relative weight.
    pub fn weight(&self) -> f64 {
        self.weight
    }
}

/// Rotates per-slot content by `rotations` steps.
///
/// A positive count rotates clockwise, moving the content of the last slot
/// onto the first; a negative count rotates the other way.
///
/// # Errors
///
/// Fails if `content` is empty.
pub fn rotate_slots<V: Clone>(content: &[V], rotations: i32) -> Result<Vec<V>, SolverError> {
    if content.is_empty() {
        return Err(SolverError::EmptySlots);
    }

    let mut rotated = content.to_vec();
    let steps = rotations.unsigned_abs() as usize % content.len();
    if rotations >= 0 {
        rotated.rotate_right(steps);
    } else {
        rotated.rotate_left(steps);
    }
    Ok(rotated)
}
