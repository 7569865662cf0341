use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mm1sim::prelude::{FirstRecordPolicy, ProcessSamples, SimulationConfig, TraceSimulator};

fn trace_fold(c: &mut Criterion) {
    let mut group = c.benchmark_group("trace");

    for n in [1_000usize, 100_000, 1_000_000] {
        let samples = ProcessSamples::generate(&SimulationConfig::new(2.0, 2.1, n, 42)).unwrap();
        let sim = TraceSimulator::new(FirstRecordPolicy::Literal);

        group.bench_with_input(BenchmarkId::new("sequential", n), &samples, |b, s| {
            b.iter(|| sim.run(black_box(&s.inter_arrival_times), black_box(&s.service_times)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("parallel", n), &samples, |b, s| {
            b.iter(|| sim.run_parallel(black_box(&s.inter_arrival_times), black_box(&s.service_times)).unwrap())
        });
    }

    group.finish();
}

fn generation(c: &mut Criterion) {
    c.bench_function("generate 100k", |b| {
        b.iter(|| mm1sim::process::generate(black_box(2.0), 100_000, 42).unwrap())
    });
}

criterion_group!(benches, trace_fold, generation);
criterion_main!(benches);
