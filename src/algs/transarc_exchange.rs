//! All-to-all redistribution of trans-arcs to the partitions owning their heads.
//!
//! Two stages, like every exchange in this crate: per-destination counts
//! first, then the fixed-size payload records sized by those counts. Every
//! partition takes part in both stages even when it sends nothing. All
//! send/receive handles are drained before returning, even on error.

use itertools::Itertools;

use crate::algs::communicator::{CommTag, Communicator, CycleCommTags, Wait};
use crate::algs::wire::{WireCount, WireTransArc, cast_slice, cast_slice_mut, decode_records};
use crate::cycle_error::CycleError;
use crate::topology::vertex::{PartitionId, TransArc};

/// Group `arcs` by destination partition (`head_assn`), one bucket per rank.
pub fn bucket_by_destination(
    arcs: &[TransArc],
    parts: usize,
) -> Result<Vec<Vec<TransArc>>, CycleError> {
    let mut sorted = arcs.to_vec();
    sorted.sort_by_key(|a| a.head_assn);
    let mut buckets = vec![Vec::new(); parts];
    for (dst, group) in &sorted.into_iter().chunk_by(|a| a.head_assn) {
        let bucket = buckets.get_mut(dst).ok_or_else(|| {
            CycleError::InvalidInput(format!(
                "trans-arc assigned to partition {dst} of {parts}"
            ))
        })?;
        bucket.extend(group);
    }
    Ok(buckets)
}

/// Exchange one count with every other rank; `counts[r]` is what we send to `r`.
/// Returns what every rank sends to us (our own slot is copied locally).
pub fn exchange_counts<C: Communicator>(
    comm: &C,
    counts: &[usize],
    tag: CommTag,
) -> Result<Vec<usize>, CycleError> {
    let me = comm.rank();
    let size = comm.size();
    if counts.len() != size {
        return Err(CycleError::CountMismatch {
            what: "count slots",
            expected: size,
            actual: counts.len(),
        });
    }

    // 1) post all receives
    let mut recv_size = Vec::with_capacity(size.saturating_sub(1));
    for peer in (0..size).filter(|&p| p != me) {
        let mut cnt = WireCount::new(0);
        let h = comm.irecv(peer, tag.as_u16(), cast_slice_mut(std::slice::from_mut(&mut cnt)));
        recv_size.push((peer, h));
    }

    // 2) post all sends
    let mut pending_sends = Vec::with_capacity(size.saturating_sub(1));
    for peer in (0..size).filter(|&p| p != me) {
        let count = WireCount::new(counts[peer]);
        let bytes = cast_slice(std::slice::from_ref(&count));
        pending_sends.push(comm.isend(peer, tag.as_u16(), bytes));
    }

    // 3) wait for all recvs (but do not early-return)
    let mut sizes_in = vec![0usize; size];
    sizes_in[me] = counts[me];
    let mut maybe_err = None;
    for (peer, h) in recv_size {
        match h.wait() {
            Some(data) if data.len() == std::mem::size_of::<WireCount>() => {
                if maybe_err.is_none() {
                    match decode_records::<WireCount>(&data) {
                        Ok(c) => sizes_in[peer] = c[0].get(),
                        Err(e) => maybe_err = Some(e),
                    }
                }
            }
            Some(data) if maybe_err.is_none() => {
                maybe_err = Some(CycleError::comm(
                    peer,
                    format!(
                        "expected {} bytes for count, got {}",
                        std::mem::size_of::<WireCount>(),
                        data.len()
                    ),
                ));
            }
            None if maybe_err.is_none() => {
                maybe_err = Some(CycleError::comm(peer, "failed to receive count"));
            }
            _ => {} // already have an error; just drain
        }
    }

    // 4) always drain all send handles before returning
    for send in pending_sends {
        let _ = send.wait();
    }

    match maybe_err {
        Some(err) => Err(err),
        None => Ok(sizes_in),
    }
}

/// Redistribute `outgoing` so each trans-arc lands on the owner of its head.
///
/// The result is grouped by source rank in ascending order; within a group
/// the sender's order is kept.
pub fn exchange_trans_arcs<C: Communicator>(
    comm: &C,
    outgoing: &[TransArc],
    tags: &CycleCommTags,
) -> Result<Vec<TransArc>, CycleError> {
    let me = comm.rank();
    let size = comm.size();
    let buckets = bucket_by_destination(outgoing, size)?;
    let counts: Vec<usize> = buckets.iter().map(Vec::len).collect();
    let incoming = exchange_counts(comm, &counts, tags.arc_counts)?;

    // 1) post receives for every non-empty inbound payload
    let record = std::mem::size_of::<WireTransArc>();
    let mut recv_data = Vec::new();
    for peer in (0..size).filter(|&p| p != me && incoming[p] > 0) {
        let mut buf = vec![0u8; incoming[peer] * record];
        let h = comm.irecv(peer, tags.arc_data.as_u16(), &mut buf);
        recv_data.push((peer, h));
    }

    // 2) post sends, keeping the encoded buffers alive until completion
    let mut pending_sends = Vec::new();
    let mut send_bufs = Vec::new();
    for (peer, bucket) in buckets.iter().enumerate() {
        if peer == me || bucket.is_empty() {
            continue;
        }
        let wire: Vec<WireTransArc> = bucket.iter().map(WireTransArc::of).collect();
        pending_sends.push(comm.isend(peer, tags.arc_data.as_u16(), cast_slice(&wire)));
        send_bufs.push(wire);
    }

    // 3) collect payloads; self-addressed arcs never touch the wire
    let mut by_source: Vec<Vec<TransArc>> = vec![Vec::new(); size];
    by_source[me] = buckets[me].clone();
    let mut maybe_err = None;
    for (peer, h) in recv_data {
        let expected = incoming[peer] * record;
        match h.wait() {
            Some(data) if maybe_err.is_none() => {
                let decoded = crate::algs::wire::expect_exact_len(data.len(), expected)
                    .and_then(|()| decode_records::<WireTransArc>(&data));
                match decoded {
                    Ok(recs) => by_source[peer] = recs.iter().map(WireTransArc::get).collect(),
                    Err(e) => maybe_err = Some(e),
                }
            }
            None if maybe_err.is_none() => {
                maybe_err = Some(CycleError::comm(peer, "failed to receive trans-arcs"));
            }
            _ => {}
        }
    }

    // 4) drain sends
    for send in pending_sends {
        let _ = send.wait();
    }
    drop(send_bufs);

    if let Some(err) = maybe_err {
        return Err(err);
    }

    let received: Vec<TransArc> = by_source.into_iter().flatten().collect();
    if let Some(bad) = received.iter().find(|a| a.head_assn != me) {
        return Err(CycleError::LabelOffPartition {
            label: bad.head,
            partition: bad.head_assn,
            rank: me as PartitionId,
        });
    }
    log::debug!(
        "rank {me}: trans-arc exchange sent {} received {}",
        outgoing.len(),
        received.len()
    );
    Ok(received)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::{LocalComm, NoComm};

    #[test]
    fn buckets_reject_unknown_partition() {
        let arcs = [TransArc::new(0, 9, 0, 3)];
        assert!(matches!(
            bucket_by_destination(&arcs, 2),
            Err(CycleError::InvalidInput(_))
        ));
    }

    #[test]
    fn single_rank_keeps_self_arcs() {
        let tags = CycleCommTags::from_base(CommTag::new(0x40));
        let arcs = [TransArc::new(1, 2, 0, 0)];
        assert_eq!(exchange_trans_arcs(&NoComm, &arcs, &tags).unwrap(), arcs.to_vec());
    }

    #[test]
    fn three_ranks_route_by_head() {
        let world = LocalComm::world(3);
        let tags = CycleCommTags::from_base(CommTag::new(0x40));
        let results: Vec<Vec<TransArc>> = std::thread::scope(|s| {
            let handles: Vec<_> = world
                .iter()
                .map(|c| {
                    let tags = &tags;
                    s.spawn(move || {
                        let r = c.rank();
                        // every rank sends one arc to each other rank
                        let out: Vec<TransArc> = (0..3)
                            .filter(|&d| d != r)
                            .map(|d| TransArc::new(r as u64 * 10, d as u64 * 10 + 1, r, d))
                            .collect();
                        exchange_trans_arcs(c, &out, tags).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for (r, got) in results.iter().enumerate() {
            assert_eq!(got.len(), 2);
            assert!(got.iter().all(|a| a.head_assn == r && a.tail_assn != r));
            assert!(got.windows(2).all(|w| w[0].tail_assn < w[1].tail_assn));
        }
    }
}
