use fxhash::FxHashMap;

use crate::aabb::{aabb_height, aabb_width, format_aabb, Aabb, AabbRef, MutableAabb};
use crate::cell_iter::CellIterList;
use crate::checks::check_box_in_area;
use crate::marked_box::MarkedBoxList;
use crate::space::{SearchControl, Space};

/// A [`Grid`](crate::Grid) that stores only occupied cells, in a hash map
/// keyed by the linearised cell index. Identical query semantics for the
/// same working area and cell counts; the saving is memory when most cells
/// are empty, paid for with some lookup overhead.
pub struct HashGrid {
    x_min: i32,
    x_max: i32,
    y_min: i32,
    y_max: i32,
    cell_width: i32,
    cell_height: i32,
    horz_cells: i32,

    cell_iters: CellIterList,
    marked_boxes: MarkedBoxList,
    cells: FxHashMap<i32, i32>,
}

impl HashGrid {
    /// Same constructor contract as [`Grid`](crate::Grid): counts at least
    /// 1, no larger than the side lengths, side lengths exact multiples.
    pub fn new(working_area: &dyn Aabb, horz_cells: i32, vert_cells: i32) -> HashGrid {
        if horz_cells < 1 {
            panic!("horz_cells < 1 [{}]", horz_cells);
        }
        if vert_cells < 1 {
            panic!("vert_cells < 1 [{}]", vert_cells);
        }
        let area_width = aabb_width(working_area);
        let area_height = aabb_height(working_area);
        if horz_cells > area_width {
            panic!("horz_cells {} > working area width {}", horz_cells, area_width);
        }
        if vert_cells > area_height {
            panic!("vert_cells {} > working area height {}", vert_cells, area_height);
        }
        if area_width % horz_cells != 0 {
            panic!("working area width {} not a multiple of horz_cells {}", area_width, horz_cells);
        }
        if area_height % vert_cells != 0 {
            panic!("working area height {} not a multiple of vert_cells {}", area_height, vert_cells);
        }

        HashGrid {
            x_min: working_area.x_min(),
            x_max: working_area.x_max(),
            y_min: working_area.y_min(),
            y_max: working_area.y_max(),
            cell_width: area_width / horz_cells,
            cell_height: area_height / vert_cells,
            horz_cells,
            cell_iters: CellIterList::with_capacity(64),
            marked_boxes: MarkedBoxList::with_capacity(32),
            cells: FxHashMap::default(),
        }
    }

    fn cell_range(&self, bx: &dyn Aabb) -> (i32, i32, i32, i32) {
        let x_min_cell = (bx.x_min() - self.x_min) / self.cell_width;
        let x_max_cell = (bx.x_max() - self.x_min) / self.cell_width;
        let y_min_cell = (bx.y_min() - self.y_min) / self.cell_height;
        let y_max_cell = (bx.y_max() - self.y_min) / self.cell_height;
        (x_min_cell, x_max_cell, y_min_cell, y_max_cell)
    }

    fn inner_add(&mut self, bx: &dyn Aabb, box_index: i32) {
        check_box_in_area(bx, self.x_min, self.x_max, self.y_min, self.y_max);
        let (x_min_cell, x_max_cell, y_min_cell, y_max_cell) = self.cell_range(bx);
        let mut cell_index = y_min_cell * self.horz_cells + x_min_cell;
        let row_stride = self.horz_cells - x_max_cell + x_min_cell - 1;
        for _y in y_min_cell..=y_max_cell {
            for _x in x_min_cell..=x_max_cell {
                let head = self.cells.get(&cell_index).copied().unwrap_or(-1);
                let new_head = self.cell_iters.add_iter_to(box_index, head);
                self.cells.insert(cell_index, new_head);
                cell_index += 1;
            }
            cell_index += row_stride;
        }
    }

    fn inner_remove(&mut self, query: &dyn Aabb) -> i32 {
        let (x_min_cell, x_max_cell, y_min_cell, y_max_cell) = self.cell_range(query);
        let mut removed_box_index = -1;
        let mut cell_index = y_min_cell * self.horz_cells + x_min_cell;
        let row_stride = self.horz_cells - x_max_cell + x_min_cell - 1;
        for _y in y_min_cell..=y_max_cell {
            for _x in x_min_cell..=x_max_cell {
                if let Some(head) = self.cells.get(&cell_index).copied() {
                    if removed_box_index == -1 {
                        removed_box_index = self.remove_first_equal_box_in_cell(query, cell_index, head);
                    } else {
                        self.remove_box_in_cell_by_index(removed_box_index, cell_index, head);
                    }
                }
                cell_index += 1;
            }
            cell_index += row_stride;
        }
        removed_box_index
    }

    fn remove_first_equal_box_in_cell(&mut self, query: &dyn Aabb, cell_index: i32, mut iter_index: i32) -> i32 {
        let mut prev_iter_index = -1;
        while iter_index != -1 {
            let (box_index, next_iter_index) = self.cell_iters.next(iter_index);
            if self.marked_boxes.box_at_equals(query, box_index) {
                self.remove_cell_iter(cell_index, iter_index, prev_iter_index, next_iter_index);
                return box_index;
            }
            prev_iter_index = iter_index;
            iter_index = next_iter_index;
        }
        -1
    }

    fn remove_box_in_cell_by_index(&mut self, known_box_index: i32, cell_index: i32, mut iter_index: i32) {
        let mut prev_iter_index = -1;
        while iter_index != -1 {
            let (box_index, next_iter_index) = self.cell_iters.next(iter_index);
            if box_index == known_box_index {
                self.remove_cell_iter(cell_index, iter_index, prev_iter_index, next_iter_index);
                return;
            }
            prev_iter_index = iter_index;
            iter_index = next_iter_index;
        }
    }

    fn remove_cell_iter(&mut self, cell_index: i32, iter_index: i32, prev_iter_index: i32, next_iter_index: i32) {
        self.cell_iters.cut_iter(iter_index, prev_iter_index);
        if prev_iter_index == -1 {
            if next_iter_index == -1 {
                self.cells.remove(&cell_index);
            } else {
                self.cells.insert(cell_index, next_iter_index);
            }
        }
    }
}

impl Space for HashGrid {
    fn clear(&mut self) {
        self.marked_boxes.clear();
        self.cell_iters.clear();
        self.cells.clear();
    }

    fn insert(&mut self, bx: AabbRef) {
        let box_index = self.marked_boxes.add_box(bx.clone());
        self.inner_add(bx.as_ref(), box_index);
    }

    fn collision(&self, query: &dyn Aabb) -> Option<AabbRef> {
        let (x_min_cell, x_max_cell, y_min_cell, y_max_cell) = self.cell_range(query);
        let mut cell_index = y_min_cell * self.horz_cells + x_min_cell;
        let row_stride = self.horz_cells - x_max_cell + x_min_cell - 1;
        let (x_min, x_max, y_min, y_max) = (query.x_min(), query.x_max(), query.y_min(), query.y_max());
        for _y in y_min_cell..=y_max_cell {
            for _x in x_min_cell..=x_max_cell {
                if let Some(head) = self.cells.get(&cell_index).copied() {
                    let mut iter_index = head;
                    while iter_index != -1 {
                        let (box_index, next_iter) = self.cell_iters.next(iter_index);
                        iter_index = next_iter;
                        if let Some(hit) =
                            self.marked_boxes.collision_with_area_at(query, x_min, x_max, y_min, y_max, box_index)
                        {
                            return Some(hit);
                        }
                    }
                }
                cell_index += 1;
            }
            cell_index += row_stride;
        }
        None
    }

    fn each_collision(&self, query: &dyn Aabb, visit: &mut dyn FnMut(&AabbRef) -> SearchControl) {
        let (x_min_cell, x_max_cell, y_min_cell, y_max_cell) = self.cell_range(query);
        let mut cell_index = y_min_cell * self.horz_cells + x_min_cell;
        let row_stride = self.horz_cells - x_max_cell + x_min_cell - 1;
        self.marked_boxes.bump_no_dup_index();
        let (x_min, x_max, y_min, y_max) = (query.x_min(), query.x_max(), query.y_min(), query.y_max());
        for _y in y_min_cell..=y_max_cell {
            for _x in x_min_cell..=x_max_cell {
                if let Some(head) = self.cells.get(&cell_index).copied() {
                    let mut iter_index = head;
                    while iter_index != -1 {
                        let (box_index, next_iter) = self.cell_iters.next(iter_index);
                        iter_index = next_iter;
                        let hit = match self
                            .marked_boxes
                            .collision_no_dup_with_area_at(query, x_min, x_max, y_min, y_max, box_index)
                        {
                            Some(hit) => hit,
                            None => continue,
                        };
                        if visit(&hit) == SearchControl::Stop {
                            return;
                        }
                    }
                }
                cell_index += 1;
            }
            cell_index += row_stride;
        }
    }

    fn remove(&mut self, query: &dyn Aabb) -> bool {
        let box_index = self.inner_remove(query);
        if box_index == -1 {
            return false;
        }
        self.marked_boxes.remove_box_at(box_index);
        true
    }

    fn relocate(&mut self, bx: &dyn MutableAabb, x_min: i32, x_max: i32, y_min: i32, y_max: i32) {
        let box_index = self.inner_remove(bx);
        if box_index == -1 {
            panic!("box to relocate not found in the hash grid: {}", format_aabb(bx));
        }
        bx.set_bounds(x_min, x_max, y_min, y_max);
        let stored = self.marked_boxes.get(box_index).clone();
        self.inner_add(stored.as_ref(), box_index);
    }

    fn stabilize(&mut self) {
        self.marked_boxes.pack();
        self.cell_iters.clear();
        self.cells.clear();

        for box_index in 0..self.marked_boxes.len() as i32 {
            let bx = self.marked_boxes.get(box_index).clone();
            self.inner_add(bx.as_ref(), box_index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aabb::SharedAabb;
    use std::rc::Rc;

    #[test]
    fn drained_cells_are_dropped_from_the_map() {
        let mut grid = HashGrid::new(&SharedAabb::new(0, 99, 0, 99), 10, 10);
        let a: Rc<SharedAabb> = Rc::new(SharedAabb::new(0, 25, 0, 25));
        grid.insert(a.clone());
        assert!(!grid.cells.is_empty());
        assert!(grid.remove(a.as_ref()));
        assert!(grid.cells.is_empty());
    }

    #[test]
    #[should_panic(expected = "working area")]
    fn out_of_area_box_panics() {
        let mut grid = HashGrid::new(&SharedAabb::new(0, 99, 0, 99), 10, 10);
        grid.insert(Rc::new(SharedAabb::new(0, 9, 50, 120)));
    }
}
