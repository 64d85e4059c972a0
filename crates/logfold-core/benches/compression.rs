//! Benchmarks for Markov-chain training and compression.
//!
//! Performance budgets:
//! - Training on 1000 traces, 4 workers: **< 10ms**
//! - Candidate discovery on a 40-state chain: **< 1ms**
//! - Full compression of a 40-state chain to 10 states: **< 500ms**

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use logfold_core::config::CompressionConfig;
use logfold_core::evaluation::EvaluationSet;
use logfold_core::markov_chain::MarkovChain;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn templates(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("t{i:02}")).collect()
}

/// Random walks over a banded template alphabet so neighboring templates
/// share structure and compress well.
fn synthetic_traces(names: &[String], count: usize, seed: u64) -> Vec<Vec<String>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let len = rng.random_range(2..=15);
            let mut at = rng.random_range(0..names.len());
            (0..len)
                .map(|_| {
                    at = (at + rng.random_range(0..3)) % names.len();
                    names[at].clone()
                })
                .collect()
        })
        .collect()
}

fn trained_chain(states: usize, traces: usize) -> MarkovChain {
    let names = templates(states);
    let training = synthetic_traces(&names, traces, 5);
    let evaluation = synthetic_traces(&names, traces / 10, 6);
    let mut chain = MarkovChain::new(names, CompressionConfig::default())
        .map(|chain| chain.with_workers(4))
        .unwrap_or_else(|err| panic!("chain setup failed: {err}"));
    chain
        .train_traces(&training)
        .unwrap_or_else(|err| panic!("training failed: {err}"));
    chain.set_evaluation(EvaluationSet::new(evaluation, Vec::new()));
    chain
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("markov_chain/train");
    let names = templates(40);

    for &count in &[100usize, 500, 1000] {
        let traces = synthetic_traces(&names, count, 5);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("traces", count), &traces, |b, traces| {
            b.iter(|| {
                let mut chain = MarkovChain::new(names.iter().cloned(), CompressionConfig::default())
                    .map(|chain| chain.with_workers(4))
                    .ok()?;
                chain.train_traces(traces).ok()?;
                Some(chain.size())
            });
        });
    }

    group.finish();
}

fn bench_candidates(c: &mut Criterion) {
    let mut group = c.benchmark_group("markov_chain/candidates");
    let chain = trained_chain(40, 1000);

    for &threshold in &[0.0, 0.05, 0.2] {
        group.bench_with_input(
            BenchmarkId::new("get_candidates", threshold),
            &threshold,
            |b, &threshold| {
                b.iter(|| {
                    let mut chain = chain.clone();
                    chain.get_candidates(threshold).len()
                });
            },
        );
    }

    group.finish();
}

fn bench_compress(c: &mut Criterion) {
    let mut group = c.benchmark_group("markov_chain/compress");
    group.sample_size(10);
    let chain = trained_chain(40, 1000);

    for &min_size in &[30usize, 20, 10] {
        group.bench_with_input(BenchmarkId::new("to_size", min_size), &min_size, |b, &min_size| {
            b.iter(|| {
                let mut chain = chain.clone();
                chain.compress(min_size, -1.0).ok().map(|s| s.final_size)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_training, bench_candidates, bench_compress);
criterion_main!(benches);
