use thiserror::Error;

/// Everything that can stop a solve.
///
/// Contradictions found while propagating are not errors: the solver rolls
/// back on its own and only gives up with [`SolverError::RollbackExhausted`].
#[derive(Error, Debug)]
pub enum SolverError {
    /// A required piece of configuration was never supplied.
    #[error("solver configuration is missing `{0}`")]
    MissingConfig(&'static str),

    /// Two catalog tiles share an identifier.
    #[error("tile {0} appears more than once in the catalog")]
    DuplicateTile(String),

    /// A tile identifier that the catalog does not know.
    #[error("tile {0} is not in the catalog")]
    UnknownTile(String),

    /// The adjacency function named a cell that is not in the field.
    #[error("cell {0} is not in the field")]
    UnknownCell(String),

    /// A tile was asked about a slot it has no plug for.
    #[error("tile {tile} has no plug for slot {slot}")]
    MissingPlug {
        /// Tile identifier.
        tile: String,
        /// Slot identifier.
        slot: String,
    },

    /// A contradiction was found and there is no collapse left to undo.
    #[error("contradiction with no collapse left to roll back; the field is unsatisfiable")]
    RollbackExhausted,

    /// Cells remain uncollapsed but none can be selected.
    #[error("no cell can be selected but {0} cells are still uncollapsed")]
    Exhausted(usize),

    /// Entropy or collapse bookkeeping disagrees with a cell's candidates.
    #[error("inconsistent solver state at cell {0}")]
    Inconsistent(String),

    /// `step` was called after the solve finished.
    #[error("the solver has already finished")]
    Finished,

    /// Slot rotation was asked to rotate nothing.
    #[error("cannot rotate an empty slot list")]
    EmptySlots,

    /// The catalog document could not be parsed.
    #[error("failed to parse catalog: {0}")]
    Catalog(#[from] serde_yaml::Error),
}
