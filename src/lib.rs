//! Broad-phase collision spaces for 2D integer AABBs.
//!
//! Seven interchangeable implementations of one [`Space`] contract, so a
//! game can pick whichever index fits its level shape, box count and
//! update rate: [`BruteForce`] and [`BitGrid`] for small populations,
//! [`Grid`] and [`HashGrid`] for known working areas, [`EndlessHashGrid`]
//! for unbounded worlds, [`Quadtree`] for sparse ones, and
//! [`AugmentedTree`] for wide, frequently edited levels.
//!
//! Boxes stay owned by the caller: spaces hold [`AabbRef`] handles,
//! compare them by instance, and return the exact instances that were
//! inserted. Coordinates mutate through [`Space::relocate`], or freely as
//! long as [`Space::stabilize`] runs before the next operation.

mod aabb;
mod augmented_tree;
mod bit_grid;
mod brute_force;
mod cell_iter;
mod checks;
mod endless_hash_grid;
mod grid;
mod hash_grid;
mod marked_box;
mod quadtree;
mod space;

pub use aabb::{
    aabb_collides_with_area, aabb_contains, aabb_height, aabb_width, aabbs_collide, aabbs_equal,
    area_contains_aabb, assert_aabb_valid, format_aabb, same_aabb, segment_collides,
    segment_contains, Aabb, AabbRef, MutableAabb, SharedAabb,
};
pub use augmented_tree::AugmentedTree;
pub use bit_grid::{BitGrid, MAX_BIT_GRID_CELLS};
pub use brute_force::BruteForce;
pub use endless_hash_grid::EndlessHashGrid;
pub use grid::Grid;
pub use hash_grid::HashGrid;
pub use quadtree::{Quadtree, STD_QUADTREE_DEPTH, STD_QUADTREE_SPLIT_CUTOFF};
pub use space::{SearchControl, Space};
