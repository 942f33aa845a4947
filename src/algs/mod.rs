//! Re-export public algorithms.

pub mod communicator;
pub mod detect;
pub mod express;
pub mod graphgen;
pub mod hypercube;
pub mod merge;
pub mod reachability;
pub mod transarc_exchange;
pub mod wire;

pub use detect::{CycleReport, CycleWitness, detect_cycle};
pub use reachability::analyze;
