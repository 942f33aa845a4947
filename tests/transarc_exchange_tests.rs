use hypercube_cycle::algs::communicator::{
    CommTag, Communicator, CycleCommTags, LocalComm, NoComm, Wait,
};
use hypercube_cycle::algs::transarc_exchange::{
    bucket_by_destination, exchange_counts, exchange_trans_arcs,
};
use hypercube_cycle::cycle_error::CycleError;
use hypercube_cycle::topology::TransArc;

mod util;

#[test]
fn zero_partners() {
    let tags = CycleCommTags::from_base(CommTag::new(0x10));
    assert!(exchange_trans_arcs(&NoComm, &[], &tags).unwrap().is_empty());
    assert_eq!(exchange_counts(&NoComm, &[4], CommTag::new(0x10)).unwrap(), vec![4]);
}

#[test]
fn wrong_slot_count_is_rejected() {
    assert!(matches!(
        exchange_counts(&NoComm, &[1, 2], CommTag::new(0x11)),
        Err(CycleError::CountMismatch { .. })
    ));
}

#[test]
fn mismatch_drain() {
    let tag = CommTag::new(0x12);
    let world = LocalComm::world(3);

    // neighbor 1 sends a malformed count (3 bytes)
    world[1].isend(0, tag.as_u16(), &[1, 2, 3]);
    let mut r1 = [0u8; 8];
    let h1 = world[1].irecv(0, tag.as_u16(), &mut r1);

    // neighbor 2 sends a correct 8-byte count
    world[2].isend(0, tag.as_u16(), &[0; 8]);
    let mut r2 = [0u8; 8];
    let h2 = world[2].irecv(0, tag.as_u16(), &mut r2);

    let res = exchange_counts(&world[0], &[0, 0, 0], tag);
    assert!(matches!(res, Err(CycleError::CommError { neighbor: 1, .. })));

    // our sends to both neighbors still went out
    assert_eq!(h1.wait().unwrap().len(), 8);
    assert_eq!(h2.wait().unwrap().len(), 8);
}

#[test]
fn buckets_follow_head_owner() {
    let arcs = [
        TransArc::new(0, 9, 0, 2),
        TransArc::new(1, 4, 0, 1),
        TransArc::new(1, 8, 0, 2),
    ];
    let b = bucket_by_destination(&arcs, 3).unwrap();
    assert!(b[0].is_empty());
    assert_eq!(b[1], vec![arcs[1]]);
    util::assert_permutation(
        &b[2].iter().map(|a| a.head).collect::<Vec<_>>(),
        &[9, 8],
    );
}

#[test]
fn all_to_all_delivers_every_arc_once() {
    let parts = 5;
    let tags = CycleCommTags::from_base(CommTag::new(0x40));
    // rank r sends one arc to every other rank with a larger id
    let outgoing = |r: usize| -> Vec<TransArc> {
        (r + 1..parts)
            .map(|d| TransArc::new((r * 10) as u64, (d * 10 + r) as u64, r, d))
            .collect()
    };
    let got = util::run_world(parts, |c| exchange_trans_arcs(c, &outgoing(c.rank()), &tags));
    for (me, res) in got.into_iter().enumerate() {
        let arcs = res.unwrap();
        assert_eq!(arcs.len(), me);
        // grouped by ascending source
        let sources: Vec<usize> = arcs.iter().map(|a| a.tail_assn).collect();
        assert_eq!(sources, (0..me).collect::<Vec<_>>());
        assert!(arcs.iter().all(|a| a.head_assn == me));
    }
}
