use fixedbitset::FixedBitSet;
use std::fmt::{Debug, Formatter};

use crate::{Entropy, Field, Id};

/// A random choice: `cell` was committed to `tile`, having already tried
/// `tried` (which includes `tile`).
#[derive(Clone)]
pub struct CollapseEntry<C, Sl> {
    /// Field after the collapse.
    pub field: Field<C, Sl>,
    /// Entropy after the collapse.
    pub entropy: Entropy<C>,
    /// The collapsed cell.
    pub cell: C,
    /// The chosen tile.
    pub tile: usize,
    /// Every tile tried at this cell from this state, including `tile`.
    pub tried: FixedBitSet,
}

/// A forced narrowing: `source` shrank `cell` down to `tiles`.
#[derive(Clone)]
pub struct UpdateEntry<C, Sl> {
    /// Field after the update.
    pub field: Field<C, Sl>,
    /// Entropy after the update.
    pub entropy: Entropy<C>,
    /// The cell whose candidates were projected.
    pub source: C,
    /// The narrowed cell.
    pub cell: C,
    /// The narrowed cell's new candidates.
    pub tiles: FixedBitSet,
}

/// One recorded solver change.
#[derive(Clone)]
pub enum HistoryEntry<C, Sl> {
    /// A random choice, and therefore a rollback target.
    Collapse(CollapseEntry<C, Sl>),
    /// A propagation update.
    Update(UpdateEntry<C, Sl>),
}

impl<C, Sl> HistoryEntry<C, Sl> {
    /// Field after this change.
    pub fn field(&self) -> &Field<C, Sl> {
        match self {
            HistoryEntry::Collapse(entry) => &entry.field,
            HistoryEntry::Update(entry) => &entry.field,
        }
    }

    /// Entropy after this change.
    pub fn entropy(&self) -> &Entropy<C> {
        match self {
            HistoryEntry::Collapse(entry) => &entry.entropy,
            HistoryEntry::Update(entry) => &entry.entropy,
        }
    }
}

/// Ordered log of changes since the start of the solve.
///
/// Entries share structure with each other through the persistent
/// [`Field`] and [`Entropy`] values, so pushing one costs only what changed.
#[derive(Clone)]
pub struct History<C, Sl> {
    entries: Vec<HistoryEntry<C, Sl>>,
}

impl<C, Sl> Default for History<C, Sl> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<C: Id, Sl: Id> History<C, Sl> {
    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in the order they were recorded.
    pub fn entries(&self) -> &[HistoryEntry<C, Sl>] {
        &self.entries
    }

    /// The most recent entry.
    pub fn last(&self) -> Option<&HistoryEntry<C, Sl>> {
        self.entries.last()
    }

    /// Position of the most recent collapse.
    pub fn last_collapse(&self) -> Option<usize> {
        self.entries
            .iter()
            .rposition(|entry| matches!(entry, HistoryEntry::Collapse(_)))
    }

    pub(crate) fn push(&mut self, entry: HistoryEntry<C, Sl>) {
        self.entries.push(entry);
    }

    /// Cuts the log back to its first `len` entries, returning the first
    /// entry removed.
    pub(crate) fn truncate(&mut self, len: usize) -> Option<HistoryEntry<C, Sl>> {
        let mut removed = self.entries.drain(len..);
        removed.next()
    }
}

impl<C: Id, Sl: Id> Debug for CollapseEntry<C, Sl> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.debug_struct("CollapseEntry")
            .field("cell", &self.cell)
            .field("tile", &self.tile)
            .field("tried", &self.tried)
            .field("field", &self.field)
            .finish_non_exhaustive()
    }
}

impl<C: Id, Sl: Id> Debug for UpdateEntry<C, Sl> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.debug_struct("UpdateEntry")
            .field("source", &self.source)
            .field("cell", &self.cell)
            .field("tiles", &self.tiles)
            .field("field", &self.field)
            .finish_non_exhaustive()
    }
}

impl<C: Id, Sl: Id> Debug for HistoryEntry<C, Sl> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            HistoryEntry::Collapse(entry) => f.debug_tuple("Collapse").field(entry).finish(),
            HistoryEntry::Update(entry) => f.debug_tuple("Update").field(entry).finish(),
        }
    }
}

impl<C: Id, Sl: Id> Debug for History<C, Sl> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.debug_list().entries(&self.entries).finish()
    }
}
