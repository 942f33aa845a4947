//! Bit arithmetic of the recursive-doubling (hypercube) merge schedule.
//!
//! In round `h` only partitions whose low `h` bits are clear take part. Of
//! those, the ones with bit `h` set send their graph to the partner with the
//! bit cleared; a receiver whose partner does not exist (`P` not a power of
//! two) idles.

use crate::topology::vertex::PartitionId;

/// Bits of `z` below position `h`.
#[inline]
pub const fn last_b(z: PartitionId, h: u32) -> PartitionId {
    z & ((1 << h) - 1)
}

#[inline]
pub const fn set_b(z: PartitionId, h: u32) -> PartitionId {
    z | (1 << h)
}

#[inline]
pub const fn clear_b(z: PartitionId, h: u32) -> PartitionId {
    z & !(1 << h)
}

#[inline]
pub const fn test_b(z: PartitionId, h: u32) -> bool {
    z & (1 << h) != 0
}

/// `z` with bits `0..=h` cleared: the partition that holds `z`'s data after round `h`.
#[inline]
pub const fn clear_last_b(z: PartitionId, h: u32) -> PartitionId {
    z & !((1 << (h + 1)) - 1)
}

/// `ceil(log2(p))`; `0` for `p <= 1`.
#[inline]
pub const fn ceil_log2(p: usize) -> u32 {
    if p <= 1 {
        0
    } else {
        usize::BITS - (p - 1).leading_zeros()
    }
}

/// What partition `z` does in round `h` of a `parts`-way merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundRole {
    /// Already sent its graph in an earlier round.
    Inactive,
    /// Active but its partner does not exist.
    Idle,
    Receive { from: PartitionId },
    Send { to: PartitionId },
}

pub fn round_role(z: PartitionId, h: u32, parts: usize) -> RoundRole {
    if last_b(z, h) != 0 {
        RoundRole::Inactive
    } else if test_b(z, h) {
        RoundRole::Send { to: clear_b(z, h) }
    } else {
        match set_b(z, h) {
            from if from < parts => RoundRole::Receive { from },
            _ => RoundRole::Idle,
        }
    }
}
