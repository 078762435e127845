#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

// Benchmarks for the extraction pipeline
//
// Covers the recursive ping-pong loop, a ring of processes that each relay a
// token, and networks that need the search to backtrack.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rumpsteak_extraction::{Behaviour, ExtractionConfig, Extractor, Network, ProcessTerm, Strategy};

fn no_args() -> Vec<String> {
    Vec::new()
}

fn recursive(name: &str, body: Behaviour) -> ProcessTerm {
    ProcessTerm::new(Behaviour::call(name, no_args())).with_procedure(name, no_args(), body)
}

fn ping_pong() -> Network {
    Network::new([
        (
            "a",
            recursive(
                "X",
                Behaviour::send("b", "ping", Behaviour::receive("b", Behaviour::call("X", no_args()))),
            ),
        ),
        (
            "b",
            recursive(
                "Y",
                Behaviour::receive("a", Behaviour::send("a", "pong", Behaviour::call("Y", no_args()))),
            ),
        ),
    ])
}

// p0 starts the token, every other process waits for it before passing it on
fn ring(size: usize) -> Network {
    let name = |i: usize| format!("p{}", i % size);
    Network::new((0..size).map(|i| {
        let next = name(i + 1);
        let previous = name(i + size - 1);
        let body = if i == 0 {
            Behaviour::send(next, "token", Behaviour::receive(previous, Behaviour::call("R", no_args())))
        } else {
            Behaviour::receive(previous, Behaviour::send(next, "token", Behaviour::call("R", no_args())))
        };
        (name(i), recursive("R", body))
    }))
}

// Every process sends before it receives, so only multicoms make progress
fn swap(size: usize) -> Network {
    let name = |i: usize| format!("q{}", i % size);
    Network::new((0..size).map(|i| {
        let next = name(i + 1);
        let previous = name(i + size - 1);
        let body = Behaviour::send(next, "v", Behaviour::receive(previous, Behaviour::Terminate));
        (name(i), ProcessTerm::new(body))
    }))
}

fn bench_ping_pong(c: &mut Criterion) {
    let network = ping_pong();
    let extractor = Extractor::default();
    c.bench_function("extract_ping_pong", |b| {
        b.iter(|| extractor.extract(black_box(&network)).unwrap())
    });
}

fn bench_ring(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_ring");
    for size in [2, 4, 8, 16] {
        let network = ring(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &network, |b, network| {
            let extractor = Extractor::default();
            b.iter(|| extractor.extract(black_box(network)).unwrap())
        });
    }
    group.finish();
}

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_ring_strategy");
    let network = ring(8);
    for strategy in [
        Strategy::InteractionsFirst,
        Strategy::UnmarkedFirst,
        Strategy::LongestFirst,
        Strategy::Random { seed: 7 },
    ] {
        let extractor = Extractor::new(ExtractionConfig::default().with_strategy(strategy));
        group.bench_with_input(BenchmarkId::from_parameter(format!("{:?}", strategy)), &network, |b, network| {
            b.iter(|| extractor.extract(black_box(network)).unwrap())
        });
    }
    group.finish();
}

fn bench_multicom(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_multicom");
    for size in [2, 3, 5] {
        let network = swap(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &network, |b, network| {
            let extractor = Extractor::default();
            b.iter(|| extractor.extract(black_box(network)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ping_pong, bench_ring, bench_strategies, bench_multicom);
criterion_main!(benches);
