use std::rc::Rc;

use broadphase2d::{
    Aabb, AugmentedTree, BitGrid, BruteForce, EndlessHashGrid, Grid, HashGrid, MutableAabb,
    Quadtree, SearchControl, SharedAabb, Space, STD_QUADTREE_DEPTH, STD_QUADTREE_SPLIT_CUTOFF,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::prelude::*;

const AXIS_CELLS: i32 = 25;

fn reference_area() -> SharedAabb {
    SharedAabb::new(0, 99, 0, 99)
}

fn all_spaces() -> Vec<(&'static str, Box<dyn Space>)> {
    let area = reference_area();
    vec![
        ("brute_force", Box::new(BruteForce::new())),
        ("augmented_tree", Box::new(AugmentedTree::new())),
        ("bit_grid", Box::new(BitGrid::new(&area, AXIS_CELLS, AXIS_CELLS))),
        ("grid", Box::new(Grid::new(&area, AXIS_CELLS, AXIS_CELLS))),
        ("hash_grid", Box::new(HashGrid::new(&area, AXIS_CELLS, AXIS_CELLS))),
        ("endless_hash_grid", Box::new(EndlessHashGrid::new(AXIS_CELLS, AXIS_CELLS))),
        (
            "quadtree",
            Box::new(Quadtree::new(&area, STD_QUADTREE_DEPTH, STD_QUADTREE_SPLIT_CUTOFF)),
        ),
    ]
}

fn random_box_99(rng: &mut StdRng) -> Rc<SharedAabb> {
    let x = rng.gen_range(0..80);
    let y = rng.gen_range(0..80);
    Rc::new(SharedAabb::new(x, x + rng.gen_range(0..21), y, y + rng.gen_range(0..21)))
}

fn random_stretched_box_99(rng: &mut StdRng) -> Rc<SharedAabb> {
    if rng.gen_range(0..2) == 0 {
        // wide
        let x = rng.gen_range(0..20);
        let y = rng.gen_range(0..80);
        Rc::new(SharedAabb::new(x, x + 30 + rng.gen_range(0..50), y, y + rng.gen_range(0..21)))
    } else {
        // tall
        let x = rng.gen_range(0..80);
        let y = rng.gen_range(0..20);
        Rc::new(SharedAabb::new(x, x + rng.gen_range(0..21), y, y + 30 + rng.gen_range(0..50)))
    }
}

fn count_all_collisions(space: &dyn Space) -> usize {
    let mut count = 0;
    for y in (0..100).step_by(10) {
        for x in (0..100).step_by(10) {
            let probe = SharedAabb::new(x, x + 9, y, y + 9);
            space.each_collision(&probe, &mut |_| {
                count += 1;
                SearchControl::Continue
            });
        }
    }
    count
}

fn fill(
    space: &mut dyn Space,
    count: usize,
    seed: u64,
    make: fn(&mut StdRng) -> Rc<SharedAabb>,
) -> Vec<Rc<SharedAabb>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut boxes = Vec::with_capacity(count);
    for _ in 0..count {
        let bx = make(&mut rng);
        space.insert(bx.clone());
        boxes.push(bx);
    }
    boxes
}

fn bench_probe_grid(c: &mut Criterion) {
    for (count, seed) in [(500usize, 0x4F22A80E3650CA81u64), (2000, 0x4F22A80E3652C2F5)] {
        let mut group = c.benchmark_group(format!("probe_grid_{}", count));
        for (name, mut space) in all_spaces() {
            fill(space.as_mut(), count, seed, random_box_99);
            group.bench_function(name, |b| {
                b.iter(|| black_box(count_all_collisions(space.as_ref())));
            });
        }
        group.finish();
    }
}

fn bench_probe_grid_stretched(c: &mut Criterion) {
    let mut group = c.benchmark_group("probe_grid_stretched_500");
    for (name, mut space) in all_spaces() {
        fill(space.as_mut(), 500, 0x02AD771296C456FB, random_stretched_box_99);
        group.bench_function(name, |b| {
            b.iter(|| black_box(count_all_collisions(space.as_ref())));
        });
    }
    group.finish();
}

fn bench_quarter_relocations(c: &mut Criterion) {
    let mut group = c.benchmark_group("quarter_relocations_1000");
    for (name, mut space) in all_spaces() {
        let boxes = fill(space.as_mut(), 1000, 0x81182930EB28, random_box_99);
        let mut rng = StdRng::seed_from_u64(0x7A33149CF);
        group.bench_function(name, |b| {
            b.iter(|| {
                for _ in 0..250 {
                    let target = rng.gen_range(0..boxes.len());
                    let to = random_box_99(&mut rng);
                    space.relocate(
                        boxes[target].as_ref(),
                        to.x_min(),
                        to.x_max(),
                        to.y_min(),
                        to.y_max(),
                    );
                }
            });
        });
    }
    group.finish();
}

fn bench_stabilize(c: &mut Criterion) {
    let mut group = c.benchmark_group("stabilize_2500");
    for (name, mut space) in all_spaces() {
        let boxes = fill(space.as_mut(), 2500, 0x81182930E140, random_box_99);
        let mut rng = StdRng::seed_from_u64(0xBFA491283A);
        group.bench_function(name, |b| {
            b.iter(|| {
                for bx in &boxes {
                    let x = rng.gen_range(0..80);
                    let y = rng.gen_range(0..80);
                    bx.set_bounds(x, x + rng.gen_range(0..21), y, y + rng.gen_range(0..21));
                }
                space.stabilize();
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_probe_grid,
    bench_probe_grid_stretched,
    bench_quarter_relocations,
    bench_stabilize
);
criterion_main!(benches);
