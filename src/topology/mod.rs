//! Partitioned graph model: vertices, arcs, trans-arcs and label intervals.

pub mod interval;
pub mod local_graph;
pub mod vertex;

pub use interval::{Interval, IntervalSet};
pub use local_graph::LocalGraph;
pub use vertex::{Color, Label, OutArc, PartitionId, TransArc, Vertex};
