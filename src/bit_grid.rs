use crate::aabb::{
    aabb_height, aabb_width, aabbs_collide, format_aabb, same_aabb, Aabb, AabbRef, MutableAabb,
};
use crate::checks::check_box_in_area;
use crate::space::{SearchControl, Space};

/// Upper limit on cells per axis: one bit per strip in a `u32`.
pub const MAX_BIT_GRID_CELLS: i32 = 32;

struct BitGridBox {
    x_bits: u32,
    y_bits: u32,
    bx: AabbRef,
}

/// A linear scan with a bitwise fast path. Each box carries two masks
/// recording which horizontal and vertical strips of the working area it
/// overlaps; two boxes can only collide when both mask pairs intersect, so
/// most candidates are rejected with two `and` instructions before the
/// exact test runs. Still O(n) per query, but with constants good enough
/// to beat the structured spaces at small populations.
pub struct BitGrid {
    boxes: Vec<BitGridBox>,
    area_x_min: i32,
    area_x_max: i32,
    area_y_min: i32,
    area_y_max: i32,
    horz_cell_size: i32,
    vert_cell_size: i32,
}

impl BitGrid {
    /// Cell counts must be in `[1, 32]` and the working-area side lengths
    /// exact multiples of them. Panics otherwise.
    pub fn new(working_area: &dyn Aabb, horz_cells: i32, vert_cells: i32) -> BitGrid {
        if horz_cells < 1 || horz_cells > MAX_BIT_GRID_CELLS {
            panic!("horz_cells out of valid range 1 <= {} <= {}", horz_cells, MAX_BIT_GRID_CELLS);
        }
        if vert_cells < 1 || vert_cells > MAX_BIT_GRID_CELLS {
            panic!("vert_cells out of valid range 1 <= {} <= {}", vert_cells, MAX_BIT_GRID_CELLS);
        }

        let area_width = aabb_width(working_area);
        let area_height = aabb_height(working_area);
        if area_width % horz_cells != 0 {
            panic!("working area width {} not a multiple of horz_cells {}", area_width, horz_cells);
        }
        if area_height % vert_cells != 0 {
            panic!("working area height {} not a multiple of vert_cells {}", area_height, vert_cells);
        }

        BitGrid {
            boxes: Vec::with_capacity(64),
            area_x_min: working_area.x_min(),
            area_x_max: working_area.x_max(),
            area_y_min: working_area.y_min(),
            area_y_max: working_area.y_max(),
            horz_cell_size: area_width / horz_cells,
            vert_cell_size: area_height / vert_cells,
        }
    }

    /// Computes the strip masks for a box, validating it against the
    /// working area.
    fn grid_bits(&self, bx: &dyn Aabb) -> (u32, u32) {
        check_box_in_area(bx, self.area_x_min, self.area_x_max, self.area_y_min, self.area_y_max);

        let x_min_cell = (bx.x_min() - self.area_x_min) / self.horz_cell_size;
        let x_max_cell = (bx.x_max() - self.area_x_min) / self.horz_cell_size;
        if x_max_cell >= MAX_BIT_GRID_CELLS {
            panic!("x_max_cell {} >= {}", x_max_cell, MAX_BIT_GRID_CELLS);
        }

        let y_min_cell = (bx.y_min() - self.area_y_min) / self.vert_cell_size;
        let y_max_cell = (bx.y_max() - self.area_y_min) / self.vert_cell_size;
        if y_max_cell >= MAX_BIT_GRID_CELLS {
            panic!("y_max_cell {} >= {}", y_max_cell, MAX_BIT_GRID_CELLS);
        }

        (axis_bits(x_min_cell as u32, x_max_cell as u32), axis_bits(y_min_cell as u32, y_max_cell as u32))
    }
}

/// Sets bits `min_cell..=max_cell`.
fn axis_bits(min_cell: u32, max_cell: u32) -> u32 {
    if max_cell == min_cell {
        1 << max_cell
    } else {
        // widened so max_cell == 31 doesn't overflow the shift
        (((1u64 << (max_cell + 1)) - 1) as u32) ^ ((1u32 << min_cell) - 1)
    }
}

impl Space for BitGrid {
    fn clear(&mut self) {
        self.boxes.clear();
    }

    fn insert(&mut self, bx: AabbRef) {
        let (x_bits, y_bits) = self.grid_bits(bx.as_ref());
        self.boxes.push(BitGridBox { x_bits, y_bits, bx });
    }

    fn collision(&self, query: &dyn Aabb) -> Option<AabbRef> {
        let (qx_bits, qy_bits) = self.grid_bits(query);
        for other in &self.boxes {
            if (qx_bits & other.x_bits) != 0
                && (qy_bits & other.y_bits) != 0
                && aabbs_collide(query, other.bx.as_ref())
                && !same_aabb(query, other.bx.as_ref())
            {
                return Some(other.bx.clone());
            }
        }
        None
    }

    fn each_collision(&self, query: &dyn Aabb, visit: &mut dyn FnMut(&AabbRef) -> SearchControl) {
        let (qx_bits, qy_bits) = self.grid_bits(query);
        for other in &self.boxes {
            if (qx_bits & other.x_bits) != 0
                && (qy_bits & other.y_bits) != 0
                && aabbs_collide(query, other.bx.as_ref())
                && !same_aabb(query, other.bx.as_ref())
            {
                if visit(&other.bx) == SearchControl::Stop {
                    return;
                }
            }
        }
    }

    fn remove(&mut self, query: &dyn Aabb) -> bool {
        for i in 0..self.boxes.len() {
            if same_aabb(self.boxes[i].bx.as_ref(), query) {
                self.boxes.swap_remove(i);
                return true;
            }
        }
        false
    }

    fn relocate(&mut self, bx: &dyn MutableAabb, x_min: i32, x_max: i32, y_min: i32, y_max: i32) {
        for i in 0..self.boxes.len() {
            if same_aabb(bx, self.boxes[i].bx.as_ref()) {
                bx.set_bounds(x_min, x_max, y_min, y_max);
                let (x_bits, y_bits) = self.grid_bits(bx);
                self.boxes[i].x_bits = x_bits;
                self.boxes[i].y_bits = y_bits;
                return;
            }
        }
        panic!("box to relocate not found: {}", format_aabb(bx));
    }

    fn stabilize(&mut self) {
        for i in 0..self.boxes.len() {
            let bx = self.boxes[i].bx.clone();
            let (x_bits, y_bits) = self.grid_bits(bx.as_ref());
            self.boxes[i].x_bits = x_bits;
            self.boxes[i].y_bits = y_bits;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aabb::SharedAabb;

    #[test]
    fn strip_masks() {
        let area = SharedAabb::new(0, 99, 0, 99);
        let grid = BitGrid::new(&area, 10, 10);

        let (x_bits, y_bits) = grid.grid_bits(&SharedAabb::new(0, 99, 0, 99));
        assert_eq!(x_bits, 0x0000_03FF);
        assert_eq!(y_bits, 0x0000_03FF);

        let (x_bits, y_bits) = grid.grid_bits(&SharedAabb::new(0, 0, 0, 0));
        assert_eq!(x_bits, 0x0000_0001);
        assert_eq!(y_bits, 0x0000_0001);

        let (x_bits, y_bits) = grid.grid_bits(&SharedAabb::new(10, 19, 10, 19));
        assert_eq!(x_bits, 0x0000_0002);
        assert_eq!(y_bits, 0x0000_0002);

        let (x_bits, y_bits) = grid.grid_bits(&SharedAabb::new(10, 29, 10, 29));
        assert_eq!(x_bits, 0x0000_0006);
        assert_eq!(y_bits, 0x0000_0006);
    }

    #[test]
    fn full_width_masks_at_32_cells() {
        let area = SharedAabb::new(0, 31, 0, 31);
        let grid = BitGrid::new(&area, 32, 32);
        let (x_bits, y_bits) = grid.grid_bits(&SharedAabb::new(0, 31, 0, 31));
        assert_eq!(x_bits, u32::MAX);
        assert_eq!(y_bits, u32::MAX);
    }

    #[test]
    #[should_panic(expected = "horz_cells out of valid range")]
    fn too_many_cells_panics() {
        let area = SharedAabb::new(0, 32, 0, 32);
        BitGrid::new(&area, 33, 33);
    }

    #[test]
    #[should_panic(expected = "not a multiple")]
    fn non_multiple_area_panics() {
        let area = SharedAabb::new(0, 99, 0, 99); // width 100
        BitGrid::new(&area, 7, 10);
    }

    #[test]
    #[should_panic(expected = "working area")]
    fn out_of_area_box_panics() {
        let area = SharedAabb::new(0, 99, 0, 99);
        let mut grid = BitGrid::new(&area, 10, 10);
        grid.insert(std::rc::Rc::new(SharedAabb::new(90, 120, 0, 9)));
    }
}
