#![allow(dead_code)]
use std::collections::VecDeque;

use hypercube_cycle::{
    algs::communicator::LocalComm,
    algs::detect::{CycleReport, detect_cycle},
    config::DetectConfig,
    cycle_error::CycleError,
    topology::LocalGraph,
};

/// Run `f` once per rank of a fresh `parts`-rank local world, each on its own
/// thread, and return the results in rank order.
pub fn run_world<R, F>(parts: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(&LocalComm) -> R + Sync,
{
    let world = LocalComm::world(parts);
    let f = &f;
    std::thread::scope(|s| {
        let handles: Vec<_> = world.iter().map(|c| s.spawn(move || f(c))).collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("rank thread panicked"))
            .collect()
    })
}

/// Build every partition with `build` and run detection on all of them.
pub fn detect_all<B>(parts: usize, cfg: &DetectConfig, build: B) -> Vec<CycleReport>
where
    B: Fn(usize) -> Result<LocalGraph, CycleError> + Sync,
{
    let graphs: Vec<LocalGraph> = (0..parts).map(|r| build(r).unwrap()).collect();
    let results = run_world(parts, |c| {
        use hypercube_cycle::algs::communicator::Communicator;
        let mut g = graphs[c.rank()].clone();
        detect_cycle(c, &mut g, cfg)
    });
    results.into_iter().map(|r| r.unwrap()).collect()
}

/// All ranks agree; return the shared verdict.
pub fn verdict(reports: &[CycleReport]) -> bool {
    let v = reports[0].cycle_found;
    assert!(
        reports.iter().all(|r| r.cycle_found == v),
        "ranks disagree: {:?}",
        reports.iter().map(|r| r.cycle_found).collect::<Vec<_>>()
    );
    v
}

/// Reference answer: Kahn's algorithm over the union of all partitions.
pub fn has_cycle_serial(parts: &[LocalGraph]) -> bool {
    let mut labels: Vec<u64> = parts
        .iter()
        .flat_map(|g| g.vertices().iter().map(|v| v.label))
        .collect();
    labels.sort_unstable();
    let idx = |l: u64| labels.binary_search(&l).expect("arc head is a vertex");
    let n = labels.len();
    let mut indeg = vec![0usize; n];
    let mut succ = vec![Vec::new(); n];
    for v in parts.iter().flat_map(|g| g.vertices()) {
        for a in &v.alist {
            succ[idx(v.label)].push(idx(a.head));
            indeg[idx(a.head)] += 1;
        }
    }
    let mut queue: VecDeque<usize> = (0..n).filter(|&i| indeg[i] == 0).collect();
    let mut seen = 0;
    while let Some(u) = queue.pop_front() {
        seen += 1;
        for &w in &succ[u] {
            indeg[w] -= 1;
            if indeg[w] == 0 {
                queue.push_back(w);
            }
        }
    }
    seen != n
}

/// Assert vec is a permutation of another vec (order-agnostic).
pub fn assert_permutation<T: Ord + Copy + std::fmt::Debug>(got: &[T], want: &[T]) {
    let mut a = got.to_vec();
    a.sort_unstable();
    let mut b = want.to_vec();
    b.sort_unstable();
    assert_eq!(a, b, "not a permutation\n got={:?}\nwant={:?}", got, want);
}
