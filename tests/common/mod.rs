#![allow(dead_code)]

use std::collections::HashMap;
use std::rc::Rc;

use broadphase2d::{Aabb, BruteForce, MutableAabb, SearchControl, SharedAabb, Space};
use rand::prelude::*;

/// Cell count used per axis by the bounded grid-like spaces under test.
pub const AXIS_CELLS: i32 = 25;

pub fn new_box(x_min: i32, x_max: i32, y_min: i32, y_max: i32) -> Rc<SharedAabb> {
    Rc::new(SharedAabb::new(x_min, x_max, y_min, y_max))
}

pub fn reference_area() -> SharedAabb {
    SharedAabb::new(0, 99, 0, 99)
}

/// Probes guaranteed to miss the `[10..15, 10..15]` reference box.
const SINGLE_NO_COLLISION_PROBES: [(i32, i32, i32, i32); 6] = [
    (0, 5, 0, 5),
    (16, 18, 0, 5),
    (16, 18, 20, 99),
    (0, 9, 16, 22),
    (10, 15, 16, 16),
    (6, 8, 12, 14),
];

/// Probes guaranteed to hit it, including the degenerate point box and
/// edge-touching shapes.
const SINGLE_YES_COLLISION_PROBES: [(i32, i32, i32, i32); 9] = [
    (10, 15, 10, 15),
    (8, 18, 8, 10),
    (0, 99, 0, 99),
    (12, 14, 12, 14),
    (13, 13, 13, 13),
    (7, 12, 13, 19),
    (7, 10, 7, 10),
    (15, 99, 15, 99),
    (15, 15, 10, 10),
];

pub fn proc_single_collision(space: &mut dyn Space) {
    space.insert(new_box(10, 15, 10, 15));

    for (nth, &(x_min, x_max, y_min, y_max)) in SINGLE_NO_COLLISION_PROBES.iter().enumerate() {
        let probe = new_box(x_min, x_max, y_min, y_max);
        assert!(
            space.collision(probe.as_ref()).is_none(),
            "no-collision probe #{} reported a hit",
            nth
        );
    }

    for (nth, &(x_min, x_max, y_min, y_max)) in SINGLE_YES_COLLISION_PROBES.iter().enumerate() {
        let probe = new_box(x_min, x_max, y_min, y_max);
        assert!(
            space.collision(probe.as_ref()).is_some(),
            "collision probe #{} reported no hit",
            nth
        );
    }
}

/// A box up to 21x21 somewhere inside `[0..99, 0..99]`.
pub fn random_box_99(rng: &mut StdRng) -> Rc<SharedAabb> {
    let x = rng.gen_range(0..80);
    let y = rng.gen_range(0..80);
    new_box(x, x + rng.gen_range(0..21), y, y + rng.gen_range(0..21))
}

/// Total number of collision callbacks over a covering 10x10 probe grid.
pub fn count_all_collisions(space: &dyn Space) -> usize {
    let mut count = 0;
    for y in (0..100).step_by(10) {
        for x in (0..100).step_by(10) {
            let probe = new_box(x, x + 9, y, y + 9);
            space.each_collision(probe.as_ref(), &mut |_| {
                count += 1;
                SearchControl::Continue
            });
        }
    }
    count
}

/// Relocates every box through `space1` while `space2` and a fresh oracle
/// only learn about it from `stabilize`; all three must keep agreeing on
/// the total collision count, and then the same trick runs mirrored.
pub fn proc_mutate_vs_stabilize_1200(space1: &mut dyn Space, space2: &mut dyn Space) {
    const SEED: u64 = 0xC1024A5A83;
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut oracle = BruteForce::new();

    let mut boxes = Vec::with_capacity(1200);
    for _ in 0..1200 {
        let bx = random_box_99(&mut rng);
        space1.insert(bx.clone());
        space2.insert(bx.clone());
        oracle.insert(bx.clone());
        boxes.push(bx);
    }

    let count1 = count_all_collisions(space1);
    let count2 = count_all_collisions(space2);
    let reference = count_all_collisions(&oracle);
    assert!(count1 > 0, "degenerate workload, nothing collides");
    assert_eq!(count1, count2, "spaces disagree before any mutation");
    assert_eq!(count1, reference, "space disagrees with the oracle");

    for bx in &boxes {
        let to = random_box_99(&mut rng);
        space1.relocate(bx.as_ref(), to.x_min(), to.x_max(), to.y_min(), to.y_max());
    }
    space2.stabilize();
    oracle.stabilize();

    let count1 = count_all_collisions(space1);
    let count2 = count_all_collisions(space2);
    let reference = count_all_collisions(&oracle);
    assert_eq!(count1, count2, "relocate and stabilize disagree");
    assert_eq!(count1, reference, "space disagrees with the oracle after relocations");

    for bx in &boxes {
        let to = random_box_99(&mut rng);
        space2.relocate(bx.as_ref(), to.x_min(), to.x_max(), to.y_min(), to.y_max());
    }
    space1.stabilize();
    oracle.stabilize();

    let count1 = count_all_collisions(space1);
    let count2 = count_all_collisions(space2);
    let reference = count_all_collisions(&oracle);
    assert_eq!(count1, count2, "mirrored relocate and stabilize disagree");
    assert_eq!(count1, reference, "space disagrees with the oracle after mirrored relocations");
}

/// Stabilize with no out-of-band mutations must change nothing, both on a
/// fresh space and after removing a quarter of the boxes.
pub fn proc_neutral_stabilize(space1: &mut dyn Space, space2: &mut dyn Space, num_boxes: usize) {
    const SEED: u64 = 0x6719B80442A;
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut oracle = BruteForce::new();

    let mut boxes = Vec::with_capacity(num_boxes);
    for _ in 0..num_boxes {
        let bx = random_box_99(&mut rng);
        space1.insert(bx.clone());
        space2.insert(bx.clone());
        oracle.insert(bx.clone());
        boxes.push(bx);
    }

    space1.stabilize();
    let count1 = count_all_collisions(space1);
    let count2 = count_all_collisions(space2);
    let reference = count_all_collisions(&oracle);
    assert!(count1 > 0, "degenerate workload, nothing collides");
    assert_eq!(count1, count2, "neutral stabilize changed the results");
    assert_eq!(count1, reference, "space disagrees with the oracle");

    for (i, bx) in boxes.iter().take(num_boxes / 4).enumerate() {
        assert!(space1.remove(bx.as_ref()), "space1 failed to remove box at index {}", i);
        assert!(space2.remove(bx.as_ref()), "space2 failed to remove box at index {}", i);
        assert!(oracle.remove(bx.as_ref()), "oracle failed to remove box at index {}", i);
    }

    space1.stabilize();
    let count1 = count_all_collisions(space1);
    let count2 = count_all_collisions(space2);
    let reference = count_all_collisions(&oracle);
    assert_eq!(count1, count2, "neutral stabilize after removals changed the results");
    assert_eq!(count1, reference, "space disagrees with the oracle after removals");
}

/// Mutates every box behind the space's back, stabilizes, and verifies the
/// full per-instance collision multiset against the oracle.
pub fn proc_stabilize_n(space: &mut dyn Space, num_boxes: usize) {
    const SEED: u64 = 0x049C22B184;
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut oracle = BruteForce::new();

    let mut boxes = Vec::with_capacity(num_boxes);
    for _ in 0..num_boxes {
        let bx = random_box_99(&mut rng);
        space.insert(bx.clone());
        oracle.insert(bx.clone());
        boxes.push(bx);
    }

    for bx in &boxes {
        let to = random_box_99(&mut rng);
        bx.set_bounds(to.x_min(), to.x_max(), to.y_min(), to.y_max());
    }
    oracle.stabilize();
    space.stabilize();

    // collect the oracle's hit multiset keyed by instance
    let mut hit_counts: HashMap<*const u8, i64> = HashMap::new();
    for y in (0..100).step_by(10) {
        for x in (0..100).step_by(10) {
            let probe = new_box(x, x + 9, y, y + 9);
            oracle.each_collision(probe.as_ref(), &mut |hit| {
                *hit_counts.entry(Rc::as_ptr(hit) as *const u8).or_insert(0) += 1;
                SearchControl::Continue
            });
        }
    }

    // the space must drain it exactly
    for y in (0..100).step_by(10) {
        for x in (0..100).step_by(10) {
            let probe = new_box(x, x + 9, y, y + 9);
            space.each_collision(probe.as_ref(), &mut |hit| {
                let key = Rc::as_ptr(hit) as *const u8;
                let remaining = hit_counts
                    .get_mut(&key)
                    .unwrap_or_else(|| panic!("hit not in the oracle's result set: {:?}", hit.downcast_ref::<SharedAabb>()));
                assert!(
                    *remaining > 0,
                    "hit reported more often than by the oracle: {:?}",
                    hit.downcast_ref::<SharedAabb>()
                );
                *remaining -= 1;
                SearchControl::Continue
            });
        }
    }
    for (_, remaining) in hit_counts {
        assert_eq!(remaining, 0, "missed at least one collision the oracle found");
    }
}
