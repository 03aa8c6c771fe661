use std::fmt::{Debug, Formatter};

use crate::{DebugTag, DebugTags, Entropy, Field, Id};

/// What a step just did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event<C> {
    /// `cell` was committed to `tile` by a random choice.
    Collapsed {
        /// The collapsed cell.
        cell: C,
        /// Index of the chosen tile.
        tile: usize,
    },
    /// Propagation from `source` narrowed `cell`.
    Updated {
        /// The cell whose candidates were projected.
        source: C,
        /// The narrowed cell.
        cell: C,
    },
    /// A contradiction undid the most recent collapse of `cell`.
    RolledBack {
        /// The cell whose collapse was undone.
        cell: C,
    },
    /// Debug-only: `cell` was looked at without being changed yet.
    Inspected {
        /// The inspected cell.
        cell: C,
        /// How it was inspected.
        tag: DebugTag,
    },
    /// Every cell is collapsed.
    Finished,
}

/// The solver state handed out after a step.
///
/// Cloning a snapshot is cheap; it shares structure with the solver.
#[derive(Clone)]
pub struct Snapshot<C, Sl> {
    /// The field after the step.
    pub field: Field<C, Sl>,
    /// Entropy after the step.
    pub entropy: Entropy<C>,
    /// Debug tags after the step, when debugging is enabled.
    pub debug: Option<DebugTags<C>>,
    /// What the step did.
    pub event: Event<C>,
}

/// Result of pulling one step from a solver.
#[derive(Clone)]
pub enum Step<C, Sl> {
    /// An intermediate state; more steps follow.
    Progress(Snapshot<C, Sl>),
    /// The final state; every cell is collapsed.
    Done(Snapshot<C, Sl>),
}

impl<C, Sl> Step<C, Sl> {
    /// The snapshot carried by this step.
    pub fn snapshot(&self) -> &Snapshot<C, Sl> {
        match self {
            Step::Progress(snapshot) | Step::Done(snapshot) => snapshot,
        }
    }

    /// Unwraps the snapshot carried by this step.
    pub fn into_snapshot(self) -> Snapshot<C, Sl> {
        match self {
            Step::Progress(snapshot) | Step::Done(snapshot) => snapshot,
        }
    }

    /// True for the final step.
    pub fn is_done(&self) -> bool {
        matches!(self, Step::Done(_))
    }
}

impl<C: Id, Sl: Id> Debug for Snapshot<C, Sl> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("event", &self.event)
            .field("field", &self.field)
            .field("entropy", &self.entropy)
            .field("debug", &self.debug)
            .finish()
    }
}

impl<C: Id, Sl: Id> Debug for Step<C, Sl> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Step::Progress(snapshot) => f.debug_tuple("Progress").field(snapshot).finish(),
            Step::Done(snapshot) => f.debug_tuple("Done").field(snapshot).finish(),
        }
    }
}
