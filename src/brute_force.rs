use crate::aabb::{aabbs_collide, format_aabb, same_aabb, Aabb, AabbRef, MutableAabb};
use crate::space::{SearchControl, Space};

/// The naive O(n²) space: an unordered vector scanned in full by every
/// query. Slow past a few hundred boxes, but trivially correct and always
/// stable, which makes it the oracle the other spaces are checked against.
pub struct BruteForce {
    boxes: Vec<AabbRef>,
}

impl BruteForce {
    pub fn new() -> BruteForce {
        BruteForce {
            boxes: Vec::with_capacity(64),
        }
    }
}

impl Default for BruteForce {
    fn default() -> BruteForce {
        BruteForce::new()
    }
}

impl Space for BruteForce {
    fn clear(&mut self) {
        self.boxes.clear();
    }

    fn insert(&mut self, bx: AabbRef) {
        self.boxes.push(bx);
    }

    fn collision(&self, query: &dyn Aabb) -> Option<AabbRef> {
        for other in &self.boxes {
            if aabbs_collide(query, other.as_ref()) && !same_aabb(query, other.as_ref()) {
                return Some(other.clone());
            }
        }
        None
    }

    fn each_collision(&self, query: &dyn Aabb, visit: &mut dyn FnMut(&AabbRef) -> SearchControl) {
        for other in &self.boxes {
            if aabbs_collide(query, other.as_ref()) && !same_aabb(query, other.as_ref()) {
                if visit(other) == SearchControl::Stop {
                    return;
                }
            }
        }
    }

    fn remove(&mut self, query: &dyn Aabb) -> bool {
        for i in 0..self.boxes.len() {
            if same_aabb(self.boxes[i].as_ref(), query) {
                self.boxes.swap_remove(i);
                return true;
            }
        }
        false
    }

    fn relocate(&mut self, bx: &dyn MutableAabb, x_min: i32, x_max: i32, y_min: i32, y_max: i32) {
        for other in &self.boxes {
            if same_aabb(bx, other.as_ref()) {
                bx.set_bounds(x_min, x_max, y_min, y_max);
                return;
            }
        }
        panic!("box to relocate not found: {}", format_aabb(bx));
    }

    // Nothing is ordered or indexed, so there is nothing to rebuild.
    fn stabilize(&mut self) {}
}
