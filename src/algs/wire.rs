//! Fixed, little-endian wire types for the trans-arc exchange and the packed
//! interval graph transfer.
//!
//! All multi-byte integers in these structs are **little-endian** on the wire.
//! We store them pre-LE with `.to_le()` and decode with `from_le()`.
//! Packed-graph words are signed 64-bit so `-1` can mark an unset index.

use bytemuck::{Pod, Zeroable};
use std::mem::{align_of, size_of};

use crate::cycle_error::CycleError;
use crate::topology::vertex::{Label, PartitionId, TransArc};

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn cast_slice_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

/// Decode a received byte buffer into records.
///
/// Receive buffers carry no alignment guarantee, so records are read
/// unaligned. The length must be a whole number of records.
pub fn decode_records<T: Pod>(bytes: &[u8]) -> Result<Vec<T>, CycleError> {
    let width = size_of::<T>();
    if bytes.len() % width != 0 {
        return Err(CycleError::WireLength {
            expected: bytes.len() - bytes.len() % width,
            actual: bytes.len(),
        });
    }
    Ok(bytes
        .chunks_exact(width)
        .map(bytemuck::pod_read_unaligned)
        .collect())
}

pub fn expect_exact_len(actual: usize, expected: usize) -> Result<(), CycleError> {
    if actual == expected {
        Ok(())
    } else {
        Err(CycleError::WireLength { expected, actual })
    }
}

/// Unset index / bound on the wire.
pub const NIL: i64 = -1;

/// Per-destination record count.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireCount {
    pub n_le: u64,
}
impl WireCount {
    pub fn new(n: usize) -> Self {
        Self {
            n_le: (n as u64).to_le(),
        }
    }
    pub fn get(&self) -> usize {
        u64::from_le(self.n_le) as usize
    }
}

/// A trans-arc `(tail, head, tailAssn, headAssn)`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireTransArc {
    pub tail_le: u64,
    pub head_le: u64,
    pub tail_assn_le: u64,
    pub head_assn_le: u64,
}
impl WireTransArc {
    pub fn of(arc: &TransArc) -> Self {
        Self {
            tail_le: arc.tail.to_le(),
            head_le: arc.head.to_le(),
            tail_assn_le: (arc.tail_assn as u64).to_le(),
            head_assn_le: (arc.head_assn as u64).to_le(),
        }
    }
    pub fn get(&self) -> TransArc {
        TransArc::new(
            u64::from_le(self.tail_le),
            u64::from_le(self.head_le),
            u64::from_le(self.tail_assn_le) as PartitionId,
            u64::from_le(self.head_assn_le) as PartitionId,
        )
    }
}

/// `(entrNum, exitNum, intervalNum)` size header of a packed graph.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct WireGraphHeader {
    pub entr_num_le: i64,
    pub exit_num_le: i64,
    pub interval_num_le: i64,
}
impl WireGraphHeader {
    pub fn new(entr_num: usize, exit_num: usize, interval_num: usize) -> Self {
        Self {
            entr_num_le: (entr_num as i64).to_le(),
            exit_num_le: (exit_num as i64).to_le(),
            interval_num_le: (interval_num as i64).to_le(),
        }
    }

    /// Decoded counts; negative counts are a format error.
    pub fn counts(&self) -> Result<(usize, usize, usize), CycleError> {
        let get = |v: i64, what: &str| {
            usize::try_from(i64::from_le(v))
                .map_err(|_| CycleError::WireFormat(format!("negative {what} count")))
        };
        Ok((
            get(self.entr_num_le, "entry")?,
            get(self.exit_num_le, "exit")?,
            get(self.interval_num_le, "interval")?,
        ))
    }

    /// Number of body words that follow this header.
    pub fn body_words(&self) -> Result<usize, CycleError> {
        let (e, x, i) = self.counts()?;
        e.checked_add(x)
            .and_then(|v| v.checked_mul(VERTEX_WORDS))
            .zip(i.checked_mul(INTERVAL_WORDS))
            .and_then(|(v, i)| v.checked_add(i))
            .ok_or_else(|| CycleError::WireFormat(format!("body of {e}+{x}+{i} records overflows")))
    }

    /// Body length in bytes; never more than an allocation can hold.
    pub fn body_bytes(&self) -> Result<usize, CycleError> {
        self.body_words()?
            .checked_mul(8)
            .filter(|&n| n <= isize::MAX as usize)
            .ok_or_else(|| CycleError::WireFormat("graph body too large".into()))
    }
}

/// Words per entry/exit record.
pub const VERTEX_WORDS: usize = 4;
/// Words per interval record.
pub const INTERVAL_WORDS: usize = 3;

/// Entry or exit record `(label, adjLabel, adjPartition, firstIntervalIndex)`.
/// Exit records carry `NIL` in the last field.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct WireVertexRecord {
    pub label_le: i64,
    pub adj_label_le: i64,
    pub adj_assn_le: i64,
    pub interval_le: i64,
}
impl WireVertexRecord {
    pub fn new(label: Label, adj_label: Label, adj_assn: PartitionId, interval: i64) -> Self {
        Self {
            label_le: (label as i64).to_le(),
            adj_label_le: (adj_label as i64).to_le(),
            adj_assn_le: (adj_assn as i64).to_le(),
            interval_le: interval.to_le(),
        }
    }
    pub fn label(&self) -> i64 {
        i64::from_le(self.label_le)
    }
    pub fn adj_label(&self) -> i64 {
        i64::from_le(self.adj_label_le)
    }
    pub fn adj_assn(&self) -> i64 {
        i64::from_le(self.adj_assn_le)
    }
    pub fn interval(&self) -> i64 {
        i64::from_le(self.interval_le)
    }
}

/// Interval record `(C0, C1, nextIntervalIndex)`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct WireIntervalRecord {
    pub c0_le: i64,
    pub c1_le: i64,
    pub next_le: i64,
}
impl WireIntervalRecord {
    pub fn new(c0: Label, c1: Label, next: i64) -> Self {
        Self {
            c0_le: (c0 as i64).to_le(),
            c1_le: (c1 as i64).to_le(),
            next_le: next.to_le(),
        }
    }
    pub fn c0(&self) -> i64 {
        i64::from_le(self.c0_le)
    }
    pub fn c1(&self) -> i64 {
        i64::from_le(self.c1_le)
    }
    pub fn next(&self) -> i64 {
        i64::from_le(self.next_le)
    }
}

// Compile-time layout checks
const _: () = {
    assert!(size_of::<WireCount>() == 8);
    assert!(align_of::<WireCount>() == 8);
    assert!(size_of::<WireTransArc>() == 32);
    assert!(size_of::<WireGraphHeader>() == 3 * 8);
    assert!(size_of::<WireVertexRecord>() == VERTEX_WORDS * 8);
    assert!(size_of::<WireIntervalRecord>() == INTERVAL_WORDS * 8);
};

static_assertions::const_assert_eq!(align_of::<WireVertexRecord>(), align_of::<i64>());
static_assertions::const_assert_eq!(align_of::<WireIntervalRecord>(), align_of::<i64>());
