//! CycleError: Unified error type for hypercube-cycle public APIs
//!
//! Every fallible operation in the crate returns this type. Broken input
//! contracts and malformed packed graphs end the run with an error.

use thiserror::Error;

use crate::topology::vertex::{Label, PartitionId};

/// Unified error type for distributed cycle detection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CycleError {
    /// Point-to-point or collective communication with `neighbor` failed.
    #[error("communication error with rank {neighbor}: {message}")]
    CommError { neighbor: usize, message: String },
    /// A received buffer did not have the expected byte length.
    #[error("wire length mismatch: expected {expected} bytes, got {actual}")]
    WireLength { expected: usize, actual: usize },
    /// A packed graph is structurally invalid.
    #[error("malformed packed interval graph: {0}")]
    WireFormat(String),
    /// A label resolved to a partition other than the one asked to map it.
    #[error("label {label} belongs to partition {partition}, not to rank {rank}")]
    LabelOffPartition {
        label: Label,
        partition: PartitionId,
        rank: PartitionId,
    },
    /// A label inside this partition's range has no vertex.
    #[error("label {label} is not a vertex of rank {rank}")]
    UnknownLabel { label: Label, rank: PartitionId },
    /// Two counts that must agree did not.
    #[error("{what}: expected {expected}, got {actual}")]
    CountMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    /// An owned exit vertex has no live entry vertex paired with it.
    #[error("no live entry vertex {entry} paired with exit vertex {exit}")]
    MissingEntry { exit: Label, entry: Label },
    /// The partitioned input violates the input contract.
    #[error("invalid input graph: {0}")]
    InvalidInput(String),
    /// A configuration value is out of range or could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl CycleError {
    pub(crate) fn comm(neighbor: usize, message: impl Into<String>) -> Self {
        CycleError::CommError {
            neighbor,
            message: message.into(),
        }
    }
}
