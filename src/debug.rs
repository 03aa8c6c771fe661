use im::OrdMap;
use std::fmt::{Display, Formatter};

/// Per-cell debug annotation: what the last step did to the cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DebugTag {
    /// Collapsed by a random choice.
    Collapsed,
    /// Candidates narrowed by propagation.
    Changed,
    /// Checked by propagation, nothing removed.
    NoChange,
    /// The cell propagation is currently spreading from.
    SourceCell,
    /// About to be checked by propagation.
    CheckedCell,
    /// Propagation emptied this cell's candidates.
    Conflict,
    /// Untouched.
    #[default]
    Default,
}

/// Debug annotations for every cell, present only when debugging is enabled.
pub type DebugTags<C> = OrdMap<C, DebugTag>;

impl Display for DebugTag {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let name = match self {
            DebugTag::Collapsed => "collapsed",
            DebugTag::Changed => "changed",
            DebugTag::NoChange => "noChange",
            DebugTag::SourceCell => "sourceCell",
            DebugTag::CheckedCell => "checkedCell",
            DebugTag::Conflict => "conflict",
            DebugTag::Default => "",
        };
        write!(f, "{name}")
    }
}
