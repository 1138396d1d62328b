use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use atlas_meter::{Config, Registry};

fn registry() -> Registry {
    Registry::new(Config::default()).expect("default config is valid")
}

pub fn benchmark_lookup(c: &mut Criterion) {
    let r = registry();
    c.bench_function("counter-1-tag-new", |b| {
        let mut values = (0i64..).map(|i| i.to_string());
        b.iter(|| {
            let value = values.next().unwrap();
            r.counter("benchmarks/one-tag", &[("tag", value.as_str())])
        })
    });
    c.bench_function("counter-1-tag-existing", |b| {
        let _counter = black_box(r.counter("benchmarks/one-tag", &[("tag", "one")]));
        b.iter(|| r.counter("benchmarks/one-tag", &[("tag", "one")]));
    });
    c.bench_function("counter-8-tags-existing", |b| {
        let tags = [
            ("one", "1"),
            ("two", "2"),
            ("three", "3"),
            ("four", "4"),
            ("five", "5"),
            ("six", "6"),
            ("seven", "7"),
            ("eight", "8"),
        ];
        b.iter(|| r.counter("benchmarks/eight-tag", &tags));
    });
}

pub fn benchmark_update(c: &mut Criterion) {
    let r = registry();
    c.bench_function("counter-increment", |b| {
        let counter = r.counter("benchmarks/counter", &[("tag", "one")]);
        b.iter(|| counter.increment());
    });
    c.bench_function("timer-record", |b| {
        let timer = r.timer("benchmarks/timer", &[("tag", "one")]);
        b.iter(|| timer.record(black_box(Duration::from_micros(250))));
    });
    c.bench_function("gauge-set", |b| {
        let gauge = r.gauge("benchmarks/gauge", &[("tag", "one")]);
        b.iter(|| gauge.set(black_box(42.0)));
    });
}

pub fn benchmark_sweep(c: &mut Criterion) {
    let r = registry();
    for i in 0..1_000 {
        let shard = i.to_string();
        r.timer("benchmarks/sweep", &[("shard", shard.as_str())]);
    }
    c.bench_function("sweep-1000-timers", |b| {
        b.iter(|| black_box(r.measurements()));
    });
}

criterion_group!(benches, benchmark_lookup, benchmark_update, benchmark_sweep);
criterion_main!(benches);
