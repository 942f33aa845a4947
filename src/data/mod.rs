//! Data module: packed interval graphs
#![warn(missing_docs)]

pub mod packed_graph;

pub use crate::debug_invariants::DebugInvariants;

pub use packed_graph::{BoundaryRecord, IntervalIdx, IntervalRecord, PackedIntervalGraph, Splice};
