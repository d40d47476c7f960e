// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::Rect;
use quadtree_collision::{Detector, DetectorConfig, Item};

const FIELD: f64 = 2048.0;

fn gen_grid_items(n: usize, cell: f64, scale: f64) -> Vec<Item> {
    let mut out = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            let x0 = x as f64 * cell;
            let y0 = y as f64 * cell;
            out.push(Item::new(x0, y0, cell * scale, cell * scale));
        }
    }
    out
}

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

fn gen_random_items(count: usize, max_size: f64) -> Vec<Item> {
    let mut out = Vec::with_capacity(count);
    let mut rng = Rng::new(0xCAFE_F00D_DEAD_BEEF);
    for _ in 0..count {
        let w = 4.0 + rng.next_f64() * max_size;
        let h = 4.0 + rng.next_f64() * max_size;
        let x0 = rng.next_f64() * (FIELD - w);
        let y0 = rng.next_f64() * (FIELD - h);
        out.push(Item::new(x0, y0, w, h));
    }
    out
}

fn detector(depth: u32, items: &[Item]) -> Detector {
    Detector::with_items(DetectorConfig::new(FIELD, FIELD, depth), items.iter().copied())
        .map(|(det, _)| det)
        .expect("bench items are valid")
}

fn bench_detect_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_grid");
    for &n in &[32usize, 64, 128] {
        // Slightly oversized cells so each item touches its neighbours.
        let items = gen_grid_items(n, FIELD / n as f64, 1.1);
        let mut det = detector(6, &items);
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_function(format!("n{}", n), |b| {
            b.iter(|| {
                det.detect();
                black_box(det.groups().len());
            })
        });
    }
    group.finish();
}

fn bench_detect_random(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_random");
    for &depth in &[4u32, 6, 8] {
        let items = gen_random_items(4_000, 40.0);
        let mut det = detector(depth, &items);
        group.throughput(Throughput::Elements(items.len() as u64));
        group.bench_function(format!("depth{}", depth), |b| {
            b.iter(|| {
                det.detect();
                black_box(det.groups().len());
            })
        });
    }
    group.finish();
}

fn bench_detect_at(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_at");
    let items = gen_random_items(4_000, 40.0);
    let det = detector(6, &items);
    let mut rng = Rng::new(0xBADC_F00D_1234_5678);
    let probes: Vec<Rect> = (0..256)
        .map(|_| {
            let x = rng.next_f64() * FIELD;
            let y = rng.next_f64() * FIELD;
            Rect::new(x, y, x + 1.0, y + 1.0)
        })
        .collect();
    group.throughput(Throughput::Elements(probes.len() as u64));
    group.bench_function("point_probes", |b| {
        b.iter(|| {
            let hits: usize = probes.iter().map(|&p| det.detect_at(p).len()).sum();
            black_box(hits);
        })
    });
    group.bench_function("wide_probe", |b| {
        b.iter(|| black_box(det.detect_at(Rect::new(100.0, 100.0, 900.0, 900.0)).len()))
    });
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    let items = gen_random_items(4_000, 40.0);
    group.throughput(Throughput::Elements(items.len() as u64));
    group.bench_function("insert_then_detect", |b| {
        b.iter_batched(
            || items.clone(),
            |items| {
                let mut det = detector(6, &items);
                det.detect();
                black_box(det.len());
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_detect_grid,
    bench_detect_random,
    bench_detect_at,
    bench_build,
);
criterion_main!(benches);
