use crate::aabb::{Aabb, AabbRef, MutableAabb};

/// Returned by `each_collision` callbacks to keep or stop the enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchControl {
    Continue,
    Stop,
}

/// The common contract every collision space implements.
///
/// Boxes are tracked by instance identity: inserting two equal-coordinate
/// boxes keeps two entries, queries never report the query instance itself,
/// and every reported box is the exact instance that was inserted.
pub trait Space {
    /// Removes every box while retaining allocated capacity.
    fn clear(&mut self);

    /// Adds a box. Duplicates and overlaps are allowed. Once inserted, the
    /// box's bounds must only change through [`Space::relocate`], or
    /// arbitrarily as long as [`Space::stabilize`] runs before any other
    /// operation.
    fn insert(&mut self, bx: AabbRef);

    /// Returns some box colliding with `query`, or `None`. When several
    /// candidates exist, which one is returned is unspecified.
    fn collision(&self, query: &dyn Aabb) -> Option<AabbRef>;

    /// Calls `visit` once for every box colliding with `query`. Returning
    /// [`SearchControl::Stop`] ends the enumeration. The visit order is
    /// structure-dependent and not part of the contract. `visit` must not
    /// mutate the space being enumerated.
    fn each_collision(&self, query: &dyn Aabb, visit: &mut dyn FnMut(&AabbRef) -> SearchControl);

    /// Removes the instance identical to `query`, reporting whether one was
    /// found. Equal coordinates are not enough; it must be the same box.
    fn remove(&mut self, query: &dyn Aabb) -> bool;

    /// Finds `bx` by identity, rewrites its bounds, and updates the index.
    /// Panics when the instance is not present. Prefer this over
    /// remove + mutate + insert: several spaces do it much cheaper as a
    /// single operation.
    fn relocate(&mut self, bx: &dyn MutableAabb, x_min: i32, x_max: i32, y_min: i32, y_max: i32);

    /// Rebuilds the index from the current box coordinates. Required after
    /// any out-of-band bounds mutation; until it runs, every other
    /// operation on the space is undefined.
    fn stabilize(&mut self);
}
