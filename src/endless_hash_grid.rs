use fxhash::FxHashMap;

use crate::aabb::{assert_aabb_valid, format_aabb, Aabb, AabbRef, MutableAabb};
use crate::cell_iter::CellIterList;
use crate::marked_box::MarkedBoxList;
use crate::space::{SearchControl, Space};

/// A sparse grid over the whole integer plane: no working area, just a
/// fixed cell size picked at construction. Cells exist only while
/// occupied, keyed by their signed cell coordinates packed into a `u64`.
/// Not the fastest space at anything, but competitive everywhere and the
/// only grid that needs no up-front bounds.
pub struct EndlessHashGrid {
    cell_width: i32,
    cell_height: i32,
    cell_iters: CellIterList,
    marked_boxes: MarkedBoxList,
    cells: FxHashMap<u64, i32>,
}

/// Cell coordinate of `v` along an axis with the given cell length. The
/// negative branch mirrors the mapping the cell keys are defined by; it is
/// applied identically on insert, query and removal, so cells agree across
/// the sign boundary.
#[inline]
fn value_cell(v: i32, cell_length: i32) -> i32 {
    if v >= 0 {
        v / cell_length
    } else {
        -((-v + 1) / cell_length)
    }
}

#[inline]
fn values_cells(v_min: i32, v_max: i32, cell_length: i32) -> (i32, i32) {
    (value_cell(v_min, cell_length), value_cell(v_max, cell_length))
}

/// Packs signed cell coordinates into one map key.
#[inline]
fn cell_key(x: i32, y: i32) -> u64 {
    ((x as u32 as u64) << 32) | (y as u32 as u64)
}

impl EndlessHashGrid {
    /// Panics unless both cell dimensions are at least 1.
    pub fn new(cell_width: i32, cell_height: i32) -> EndlessHashGrid {
        if cell_width < 1 {
            panic!("cell_width < 1 [{}]", cell_width);
        }
        if cell_height < 1 {
            panic!("cell_height < 1 [{}]", cell_height);
        }
        EndlessHashGrid {
            cell_width,
            cell_height,
            cell_iters: CellIterList::with_capacity(64),
            marked_boxes: MarkedBoxList::with_capacity(32),
            cells: FxHashMap::default(),
        }
    }

    fn point_box_to_its_cells(&mut self, bx: &dyn Aabb, box_index: i32) {
        assert_aabb_valid(bx);
        let (x_min_cell, x_max_cell) = values_cells(bx.x_min(), bx.x_max(), self.cell_width);
        let (y_min_cell, y_max_cell) = values_cells(bx.y_min(), bx.y_max(), self.cell_height);
        for y in y_min_cell..=y_max_cell {
            for x in x_min_cell..=x_max_cell {
                let key = cell_key(x, y);
                let head = self.cells.get(&key).copied().unwrap_or(-1);
                let new_head = self.cell_iters.add_iter_to(box_index, head);
                self.cells.insert(key, new_head);
            }
        }
    }

    /// Cuts the first identity match out of every cell it covers,
    /// returning its slot or `-1`.
    fn unregister_equal_box_from_its_cells(&mut self, query: &dyn Aabb) -> i32 {
        let (x_min_cell, x_max_cell) = values_cells(query.x_min(), query.x_max(), self.cell_width);
        let (y_min_cell, y_max_cell) = values_cells(query.y_min(), query.y_max(), self.cell_height);
        let mut equal_box_index = -1;
        for y in y_min_cell..=y_max_cell {
            for x in x_min_cell..=x_max_cell {
                let key = cell_key(x, y);
                let mut iter_index = match self.cells.get(&key).copied() {
                    Some(head) => head,
                    None => continue,
                };

                let mut prev_iter_index = -1;
                while iter_index != -1 {
                    let (box_index, next_iter_index) = self.cell_iters.next(iter_index);
                    if self.has_to_apply_remove(query, box_index, equal_box_index) {
                        if equal_box_index == -1 {
                            equal_box_index = box_index;
                        }
                        self.cell_iters.cut_iter(iter_index, prev_iter_index);
                        if prev_iter_index == -1 {
                            if next_iter_index == -1 {
                                self.cells.remove(&key);
                            } else {
                                self.cells.insert(key, next_iter_index);
                            }
                        }
                        break;
                    }
                    prev_iter_index = iter_index;
                    iter_index = next_iter_index;
                }
            }
        }
        equal_box_index
    }

    fn has_to_apply_remove(&self, query: &dyn Aabb, box_index: i32, equal_box_index: i32) -> bool {
        if equal_box_index != -1 {
            return box_index == equal_box_index;
        }
        self.marked_boxes.box_at_equals(query, box_index)
    }
}

impl Space for EndlessHashGrid {
    fn clear(&mut self) {
        self.marked_boxes.clear();
        self.cell_iters.clear();
        self.cells.clear();
    }

    fn insert(&mut self, bx: AabbRef) {
        let box_index = self.marked_boxes.add_box(bx.clone());
        self.point_box_to_its_cells(bx.as_ref(), box_index);
    }

    fn collision(&self, query: &dyn Aabb) -> Option<AabbRef> {
        let (x_min, x_max, y_min, y_max) = (query.x_min(), query.x_max(), query.y_min(), query.y_max());
        let (x_min_cell, x_max_cell) = values_cells(x_min, x_max, self.cell_width);
        let (y_min_cell, y_max_cell) = values_cells(y_min, y_max, self.cell_height);
        for y in y_min_cell..=y_max_cell {
            for x in x_min_cell..=x_max_cell {
                let mut iter_index = match self.cells.get(&cell_key(x, y)).copied() {
                    Some(head) => head,
                    None => continue,
                };
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
        }
        None
    }

    fn each_collision(&self, query: &dyn Aabb, visit: &mut dyn FnMut(&AabbRef) -> SearchControl) {
        self.marked_boxes.bump_no_dup_index();
        let (x_min, x_max, y_min, y_max) = (query.x_min(), query.x_max(), query.y_min(), query.y_max());
        let (x_min_cell, x_max_cell) = values_cells(x_min, x_max, self.cell_width);
        let (y_min_cell, y_max_cell) = values_cells(y_min, y_max, self.cell_height);
        for y in y_min_cell..=y_max_cell {
            for x in x_min_cell..=x_max_cell {
                let mut iter_index = match self.cells.get(&cell_key(x, y)).copied() {
                    Some(head) => head,
                    None => continue,
                };
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
        }
    }

    fn remove(&mut self, query: &dyn Aabb) -> bool {
        let box_index = self.unregister_equal_box_from_its_cells(query);
        if box_index == -1 {
            return false;
        }
        self.marked_boxes.remove_box_at(box_index);
        true
    }

    fn relocate(&mut self, bx: &dyn MutableAabb, x_min: i32, x_max: i32, y_min: i32, y_max: i32) {
        let box_index = self.unregister_equal_box_from_its_cells(bx);
        if box_index == -1 {
            panic!("box to relocate not found in the endless hash grid: {}", format_aabb(bx));
        }
        bx.set_bounds(x_min, x_max, y_min, y_max);
        self.point_box_to_its_cells(bx, box_index);
    }

    fn stabilize(&mut self) {
        self.marked_boxes.pack();
        self.cell_iters.clear();
        self.cells.clear();

        for box_index in 0..self.marked_boxes.len() as i32 {
            let bx = self.marked_boxes.get(box_index).clone();
            self.point_box_to_its_cells(bx.as_ref(), box_index);
        }
    }
}
