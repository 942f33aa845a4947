use hypercube_cycle::algs::hypercube::{RoundRole, ceil_log2, clear_last_b, round_role};
use proptest::prelude::*;

proptest! {
    #[test]
    fn partners_agree(parts in 1usize..200, h in 0u32..8) {
        for z in 0..parts {
            match round_role(z, h, parts) {
                RoundRole::Send { to } => {
                    prop_assert_eq!(round_role(to, h, parts), RoundRole::Receive { from: z });
                }
                RoundRole::Receive { from } => {
                    prop_assert!(from < parts);
                    prop_assert_eq!(round_role(from, h, parts), RoundRole::Send { to: z });
                }
                RoundRole::Idle | RoundRole::Inactive => {}
            }
        }
    }

    #[test]
    fn every_partition_but_zero_sends_once(parts in 1usize..300) {
        let rounds = ceil_log2(parts);
        for z in 0..parts {
            let sends = (0..rounds)
                .filter(|&h| matches!(round_role(z, h, parts), RoundRole::Send { .. }))
                .count();
            prop_assert_eq!(sends, usize::from(z != 0));
        }
    }

    #[test]
    fn data_ends_at_the_holder(z in 0usize..1024, h in 0u32..10) {
        // after round h the data of z lives on clear_last_b(z, h), which is
        // active in round h + 1
        let holder = clear_last_b(z, h);
        prop_assert!(holder <= z);
        prop_assert_eq!(holder & ((1usize << (h + 1)) - 1), 0);
    }
}

#[test]
fn rounds_cover_the_world() {
    assert_eq!(ceil_log2(1), 0);
    assert_eq!(ceil_log2(2), 1);
    assert_eq!(ceil_log2(5), 3);
    assert_eq!(ceil_log2(8), 3);
    assert_eq!(ceil_log2(9), 4);
}
