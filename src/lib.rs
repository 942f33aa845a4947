#![cfg_attr(docsrs, feature(doc_cfg))]
//! # hypercube-cycle
//!
//! hypercube-cycle detects directed cycles in a graph partitioned over `P`
//! cooperating processes (SPMD), without ever gathering the graph in one place.
//!
//! ## Pipeline
//! - Local reachability analysis finds cycles that use local arcs only and
//!   summarizes, per vertex, which trans-arc tails it can reach as label
//!   intervals.
//! - Trans-arcs are exchanged all-to-all so every partition sees the arcs that
//!   enter it.
//! - Each partition builds entry/exit vertices and packs them into a compact
//!   interval graph with a fixed integer wire layout.
//! - `ceil(log2 P)` hypercube rounds merge the packed graphs pairwise; a cycle
//!   shows up as an entry vertex that reaches the exit vertex pointing at it.
//!
//! ## Communication
//! Everything goes through the [`Communicator`](algs::communicator::Communicator)
//! trait: [`NoComm`](algs::communicator::NoComm) for one partition,
//! [`LocalComm`](algs::communicator::LocalComm) for `P` threads in one process,
//! and `MpiComm` behind the `mpi-support` feature.
//!
//! ## Determinism
//!
//! The random input generator uses `SmallRng` seeds taken from the caller, so
//! runs are reproducible.
//!
//! ## Usage
//!
//! ```no_run
//! use hypercube_cycle::prelude::*;
//!
//! let mut graph = hypercube_cycle::algs::graphgen::linear(1024, 0, 1, true)?;
//! let report = detect_cycle(&NoComm, &mut graph, &DetectConfig::default())?;
//! assert!(report.cycle_found);
//! # Ok::<(), CycleError>(())
//! ```

pub mod algs;
pub mod config;
pub mod cycle_error;
pub mod data;
pub mod debug_invariants;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{Communicator, LocalComm, NoComm};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::detect::{CycleReport, CycleWitness, detect_cycle};
    pub use crate::algs::graphgen::InputGraph;
    pub use crate::config::{DetectConfig, ReachMode};
    pub use crate::cycle_error::CycleError;
    pub use crate::data::packed_graph::PackedIntervalGraph;
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::topology::{Interval, IntervalSet, LocalGraph, OutArc, TransArc, Vertex};
}
