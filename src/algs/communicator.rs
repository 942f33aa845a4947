//! Thin façade over intra-process (threads) or inter-process (MPI) message passing.
//!
//! Messages are *contiguous byte slices* (no zero-copy guarantees).
//! All handles are **waitable** but non-blocking: callers post every receive
//! and send of a phase first, then `.wait()` on each handle before trusting
//! the buffer.
//!
//! Collectives (`barrier`, `allreduce_*`) have default implementations built
//! from point-to-point messages on the reserved tags at
//! [`COLLECTIVE_TAG_BASE`]; backends with native collectives override them.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};

use crate::cycle_error::CycleError;

/// Tags at and above this value are reserved for collectives.
pub const COLLECTIVE_TAG_BASE: u16 = 0xFF00;

const TAG_REDUCE_GATHER: u16 = COLLECTIVE_TAG_BASE;
const TAG_REDUCE_BCAST: u16 = COLLECTIVE_TAG_BASE + 1;

/// Typed message tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommTag(pub u16);

impl CommTag {
    pub const fn new(v: u16) -> Self {
        Self(v)
    }

    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Tag `k` places after this one, wrapping at `u16::MAX`.
    #[inline]
    pub const fn offset(self, k: u16) -> Self {
        Self(self.0.wrapping_add(k))
    }
}

/// The tags used by one detection run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleCommTags {
    /// Per-destination trans-arc counts.
    pub arc_counts: CommTag,
    /// Trans-arc payloads.
    pub arc_data: CommTag,
    /// `(entrNum, exitNum, intervalNum)` header of a packed graph.
    pub graph_sizes: CommTag,
    /// Flat packed-graph body.
    pub graph_data: CommTag,
}

impl CycleCommTags {
    /// Number of consecutive tags taken from the base.
    pub const SPAN: u16 = 4;

    pub const fn from_base(base: CommTag) -> Self {
        Self {
            arc_counts: base,
            arc_data: base.offset(1),
            graph_sizes: base.offset(2),
            graph_data: base.offset(3),
        }
    }
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Non-blocking communication interface plus the collectives the
/// detection pipeline needs.
pub trait Communicator {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;

    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    /// Block until every rank has reached the barrier.
    fn barrier(&self) -> Result<(), CycleError> {
        self.allreduce_max(0).map(|_| ())
    }

    /// Logical OR of `flag` across all ranks.
    fn allreduce_or(&self, flag: bool) -> Result<bool, CycleError> {
        Ok(self.allreduce_max(u64::from(flag))? != 0)
    }

    /// Maximum of `value` across all ranks.
    fn allreduce_max(&self, value: u64) -> Result<u64, CycleError> {
        reduce_max_p2p(self, value)
    }
}

fn decode_u64(raw: &[u8]) -> Option<u64> {
    <[u8; 8]>::try_from(raw).ok().map(u64::from_le_bytes)
}

/// Gather to rank 0, fold with `max`, broadcast back.
fn reduce_max_p2p<C: Communicator + ?Sized>(comm: &C, value: u64) -> Result<u64, CycleError> {
    let size = comm.size();
    let rank = comm.rank();
    if size <= 1 {
        return Ok(value);
    }

    if rank == 0 {
        let mut recv = Vec::with_capacity(size - 1);
        for peer in 1..size {
            let mut buf = [0u8; 8];
            recv.push((peer, comm.irecv(peer, TAG_REDUCE_GATHER, &mut buf)));
        }
        let mut acc = value;
        let mut maybe_err = None;
        for (peer, h) in recv {
            match h.wait().as_deref().map(decode_u64) {
                Some(Some(v)) => acc = acc.max(v),
                Some(None) if maybe_err.is_none() => {
                    maybe_err = Some(CycleError::comm(peer, "malformed reduction operand"));
                }
                None if maybe_err.is_none() => {
                    maybe_err = Some(CycleError::comm(peer, "reduction operand never arrived"));
                }
                _ => {}
            }
        }
        // always broadcast so no peer stays blocked
        let out = acc.to_le_bytes();
        let sends: Vec<_> = (1..size)
            .map(|peer| comm.isend(peer, TAG_REDUCE_BCAST, &out))
            .collect();
        for s in sends {
            let _ = s.wait();
        }
        maybe_err.map_or(Ok(acc), Err)
    } else {
        let send = comm.isend(0, TAG_REDUCE_GATHER, &value.to_le_bytes());
        let mut buf = [0u8; 8];
        let h = comm.irecv(0, TAG_REDUCE_BCAST, &mut buf);
        let got = h.wait();
        let _ = send.wait();
        match got.as_deref().map(decode_u64) {
            Some(Some(v)) => Ok(v),
            Some(None) => Err(CycleError::comm(0, "malformed reduction result")),
            None => Err(CycleError::comm(0, "reduction result never arrived")),
        }
    }
}

/// Compile-time no-op comm for single-partition runs and serial unit tests.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}

    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }
}

// --- LocalComm: P ranks as threads of one process ---

type Key = (usize, usize, u16); // (src, dst, tag)

#[derive(Default)]
struct Mailbox {
    queues: DashMap<Key, VecDeque<Bytes>>,
    lock: Mutex<()>,
    arrived: Condvar,
}

impl Mailbox {
    fn post(&self, key: Key, data: Bytes) {
        self.queues.entry(key).or_default().push_back(data);
        let _guard = self.lock.lock();
        self.arrived.notify_all();
    }

    fn take(&self, key: &Key) -> Option<Bytes> {
        self.queues.get_mut(key).and_then(|mut q| q.pop_front())
    }
}

/// Receive handle of [`LocalComm`].
pub struct LocalHandle {
    mailbox: Arc<Mailbox>,
    key: Key,
    len: usize,
    timeout: Option<Duration>,
}

impl Wait for LocalHandle {
    fn wait(self) -> Option<Vec<u8>> {
        let started = std::time::Instant::now();
        let mut guard = self.mailbox.lock.lock();
        loop {
            if let Some(bytes) = self.mailbox.take(&self.key) {
                let n = bytes.len().min(self.len);
                return Some(bytes[..n].to_vec());
            }
            if let Some(limit) = self.timeout
                && started.elapsed() >= limit
            {
                log::warn!(
                    "rank {} gave up waiting for tag {:#x} from rank {}",
                    self.key.1,
                    self.key.2,
                    self.key.0
                );
                return None;
            }
            self.mailbox
                .arrived
                .wait_for(&mut guard, Duration::from_millis(20));
        }
    }
}

/// In-process communicator: every rank is a thread sharing one mailbox of
/// FIFO queues keyed by `(src, dst, tag)`.
#[derive(Clone)]
pub struct LocalComm {
    rank: usize,
    size: usize,
    mailbox: Arc<Mailbox>,
    timeout: Option<Duration>,
}

impl LocalComm {
    /// Default receive timeout of a local world.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

    /// Communicators for ranks `0..size` of one fresh world.
    pub fn world(size: usize) -> Vec<LocalComm> {
        Self::world_with_timeout(size, Some(Self::DEFAULT_TIMEOUT))
    }

    /// Like [`LocalComm::world`]; `None` blocks receives forever.
    pub fn world_with_timeout(size: usize, timeout: Option<Duration>) -> Vec<LocalComm> {
        let mailbox = Arc::new(Mailbox::default());
        (0..size)
            .map(|rank| LocalComm {
                rank,
                size,
                mailbox: Arc::clone(&mailbox),
                timeout,
            })
            .collect()
    }
}

impl Communicator for LocalComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        self.mailbox.post((self.rank, peer, tag), Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle {
        LocalHandle {
            mailbox: Arc::clone(&self.mailbox),
            key: (peer, self.rank, tag),
            len: buf.len(),
            timeout: self.timeout,
        }
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::collective::SystemOperation;
    use mpi::datatype::Equivalence;
    use mpi::environment::Universe;
    use mpi::request::{Request, StaticScope};
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    /// `MPI_COMM_WORLD` of an initialized MPI environment.
    pub struct MpiComm {
        world: SimpleCommunicator,
        rank: usize,
        size: usize,
        // dropped last: finalizes MPI
        _universe: Universe,
    }

    impl MpiComm {
        pub fn new() -> Result<Self, CycleError> {
            let universe = mpi::initialize()
                .ok_or_else(|| CycleError::comm(0, "MPI was already initialized"))?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Ok(Self {
                world,
                rank,
                size,
                _universe: universe,
            })
        }
    }

    /// Outstanding send; owns the leaked copy of the payload until completion.
    pub struct MpiSendHandle {
        req: Request<'static, [u8], StaticScope>,
        data: *mut [u8],
    }

    impl Wait for MpiSendHandle {
        fn wait(self) -> Option<Vec<u8>> {
            self.req.wait();
            // SAFETY: `data` came from `Box::leak` in `isend` and the request
            // borrowing it has completed.
            unsafe { drop(Box::from_raw(self.data)) };
            None
        }
    }

    /// Outstanding receive into a leaked buffer of the requested length.
    pub struct MpiRecvHandle {
        req: Request<'static, [u8], StaticScope>,
        buf: *mut [u8],
    }

    impl Wait for MpiRecvHandle {
        fn wait(self) -> Option<Vec<u8>> {
            let status = self.req.wait();
            // SAFETY: `buf` came from `Box::leak` in `irecv` and the request
            // writing into it has completed.
            let mut data = unsafe { Box::from_raw(self.buf) }.into_vec();
            let n = status.count(u8::equivalent_datatype()).max(0) as usize;
            data.truncate(n);
            Some(data)
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = MpiSendHandle;
        type RecvHandle = MpiRecvHandle;

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> MpiSendHandle {
            let data: &'static [u8] = Box::leak(buf.to_vec().into_boxed_slice());
            let ptr = data as *const [u8] as *mut [u8];
            let req = self
                .world
                .process_at_rank(peer as i32)
                .immediate_send_with_tag(StaticScope, data, i32::from(tag));
            MpiSendHandle { req, data: ptr }
        }

        fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> MpiRecvHandle {
            let data: &'static mut [u8] = Box::leak(vec![0u8; buf.len()].into_boxed_slice());
            let ptr = data as *mut [u8];
            let req = self
                .world
                .process_at_rank(peer as i32)
                .immediate_receive_into_with_tag(StaticScope, data, i32::from(tag));
            MpiRecvHandle { req, buf: ptr }
        }

        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn barrier(&self) -> Result<(), CycleError> {
            self.world.barrier();
            Ok(())
        }

        fn allreduce_max(&self, value: u64) -> Result<u64, CycleError> {
            let mut out = 0u64;
            self.world.all_reduce_into(&value, &mut out, SystemOperation::max());
            Ok(out)
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
