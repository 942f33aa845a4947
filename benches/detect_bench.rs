use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use hypercube_cycle::algs::communicator::{LocalComm, NoComm};
use hypercube_cycle::algs::detect::detect_cycle;
use hypercube_cycle::algs::graphgen::{lattice, linear};
use hypercube_cycle::algs::reachability::analyze;
use hypercube_cycle::config::{DetectConfig, ReachMode};
use hypercube_cycle::topology::LocalGraph;

fn run_world(graphs: &[LocalGraph], cfg: &DetectConfig) -> bool {
    let world = LocalComm::world(graphs.len());
    std::thread::scope(|s| {
        let handles: Vec<_> = world
            .into_iter()
            .zip(graphs.iter().cloned())
            .map(|(comm, mut g)| s.spawn(move || detect_cycle(&comm, &mut g, cfg)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().ok().and_then(|r| r.ok()).is_some_and(|r| r.cycle_found))
            .fold(false, |a, b| a | b)
    })
}

fn bench_local_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_analysis");
    for &n in &[1 << 12, 1 << 16] {
        let g = lattice(n, 0, 1, false).unwrap();
        for mode in [ReachMode::Convex, ReachMode::Exact] {
            group.bench_with_input(BenchmarkId::new(format!("{mode:?}"), n), &g, |b, g| {
                b.iter(|| {
                    let mut g = g.clone();
                    analyze(&mut g, mode, true).unwrap()
                })
            });
        }
    }
    group.finish();
}

fn bench_single_partition(c: &mut Criterion) {
    let cfg = DetectConfig::default();
    let g = linear(1 << 16, 0, 1, false).unwrap();
    c.bench_function("detect_linear_nocomm", |b| {
        b.iter(|| {
            let mut g = g.clone();
            detect_cycle(&NoComm, &mut g, &cfg).unwrap()
        })
    });
}

fn bench_threaded_merge(c: &mut Criterion) {
    let cfg = DetectConfig::default();
    let mut group = c.benchmark_group("detect_lattice_threads");
    group.sample_size(20);
    for &parts in &[4usize, 16] {
        let n = parts * 64 * 64;
        let graphs: Vec<LocalGraph> = (0..parts)
            .map(|r| lattice(n, r, parts, true).unwrap())
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(parts), &graphs, |b, graphs| {
            b.iter(|| assert!(run_world(graphs, &cfg)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_local_analysis,
    bench_single_partition,
    bench_threaded_merge
);
criterion_main!(benches);
