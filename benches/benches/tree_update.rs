// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use quadtree_index::{Aabb2D, LinearQuadTree, Residency};

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

fn populate(tree: &mut LinearQuadTree, count: usize) -> Vec<(Residency, Aabb2D<f64>)> {
    let mut rng = Rng::new(0xFACE_FEED_CAFE_BABE);
    (0..count)
        .map(|_| {
            let r = Aabb2D::from_xywh(rng.next_f64() * 1000.0, rng.next_f64() * 1000.0, 12.0, 12.0);
            let mut res = Residency::new();
            tree.update(&mut res, &r);
            (res, r)
        })
        .collect()
}

fn bench_jitter(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_update");
    for &depth in &[4u32, 8] {
        let mut tree = LinearQuadTree::new(1024.0, 1024.0, depth).expect("valid field");
        let mut items = populate(&mut tree, 5_000);
        group.throughput(Throughput::Elements(items.len() as u64));
        // Tiny moves mostly stay within their bucket.
        group.bench_function(format!("jitter_depth{}", depth), |b| {
            let mut flip = 0.5;
            b.iter(|| {
                flip = -flip;
                for (res, r) in &mut items {
                    let moved = Aabb2D::from_xywh(r.min_x + flip, r.min_y + flip, 12.0, 12.0);
                    black_box(tree.update(res, &moved));
                }
            })
        });
        // Large moves change bucket almost every time.
        group.bench_function(format!("teleport_depth{}", depth), |b| {
            let mut rng = Rng::new(0x1234_5678_9ABC_DEF0);
            b.iter(|| {
                for (res, _) in &mut items {
                    let to = Aabb2D::from_xywh(
                        rng.next_f64() * 1000.0,
                        rng.next_f64() * 1000.0,
                        12.0,
                        12.0,
                    );
                    black_box(tree.update(res, &to));
                }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_jitter);
criterion_main!(benches);
