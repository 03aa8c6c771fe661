//! # `WaveCollapse`
//!
//! `WaveCollapse` is a step-wise Wave Function Collapse solver over arbitrary
//! cell, tile, slot and socket identifiers.
//!
//! The solver is driven by pulling steps: every collapse, propagation update
//! and rollback hands back a [`Snapshot`] of the field. Fields and entropy
//! maps are persistent values, so snapshots (and the solver's own history)
//! stay valid after the solver moves on.

// #![deny(warnings)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]

use std::{fmt::Debug, hash::Hash};

mod catalog;
mod cell;
mod debug;
mod entropy;
mod error;
mod field;
mod history;
mod possibility_map;
pub mod progress;
mod solver;
mod tile;

pub use catalog::{Catalog, CatalogFile, TileSpec};
pub use cell::Cell;
pub use debug::{DebugTag, DebugTags};
pub use entropy::Entropy;
pub use error::SolverError;
pub use field::Field;
pub use history::{CollapseEntry, History, HistoryEntry, UpdateEntry};
pub use possibility_map::PossibilityMap;
pub use solver::{Event, Neighbour, Snapshot, Solver, SolverBuilder, Stats, Step};
pub use tile::{Tile, rotate_slots};

/// Identifier bound shared by cells, tiles, slots and sockets.
pub trait Id: Clone + Ord + Hash + Debug + Send + Sync {}

impl<T: Clone + Ord + Hash + Debug + Send + Sync> Id for T {}
