use std::fmt;

use smallvec::SmallVec;

use crate::aabb::{
    aabb_collides_with_area, aabb_height, aabb_width, assert_aabb_valid, format_aabb, Aabb,
    AabbRef, MutableAabb,
};
use crate::cell_iter::CellIterList;
use crate::checks::check_box_in_area;
use crate::marked_box::MarkedBoxList;
use crate::space::{SearchControl, Space};

/// Reasonable default depth; common values run from 4 to 8.
pub const STD_QUADTREE_DEPTH: i32 = 4;
/// Reasonable default split cutoff; common values run from 6 to 12.
pub const STD_QUADTREE_SPLIT_CUTOFF: i32 = 8;

/// Descent frame: a quad's first entry index plus the area it covers.
type QuadFrame = (i32, i32, i32, i32, i32);
type QuadStack = SmallVec<[QuadFrame; 32]>;

/// An implicit quadtree packed into a single `Vec<i32>`. The root cell is
/// never stored (entries `0..4` are its four children) and each entry is
/// read by sign: positive points at another quad of four entries, zero is
/// an empty leaf, negative is a leaf whose bitwise complement heads a
/// chain in the iterator arena. Freed quads thread through the same array.
///
/// Leaves split lazily once they hold `split_cutoff` boxes (unless already
/// at `max_depth`) and collapse back only during removal. Worth it when
/// large parts of the working area stay empty; a mostly-full quadtree is
/// just a grid with extra pointer chasing, so measure before reaching for
/// this one.
pub struct Quadtree {
    area_x_min: i32,
    area_x_max: i32,
    area_y_min: i32,
    area_y_max: i32,
    max_depth: i32,
    split_cutoff: i32,

    cell_iters: CellIterList,
    marked_boxes: MarkedBoxList,
    nodes: Vec<i32>,
    nodes_free_index: i32,
}

impl Quadtree {
    /// Panics unless `max_depth >= 1`, `split_cutoff >= 1`, the working
    /// area is a valid box and `2^max_depth` fits in both of its side
    /// lengths.
    pub fn new(working_area: &dyn Aabb, max_depth: i32, split_cutoff: i32) -> Quadtree {
        assert_aabb_valid(working_area);
        if split_cutoff < 1 {
            panic!("split_cutoff < 1 [{}]", split_cutoff);
        }
        if max_depth < 1 {
            panic!("max_depth < 1 [{}]", max_depth);
        }
        let cells_per_axis = if max_depth < 31 { 1i64 << max_depth } else { i64::MAX };
        if cells_per_axis > aabb_width(working_area) as i64 {
            panic!(
                "2^max_depth exceeds the working area width [2^{} > {}]",
                max_depth,
                aabb_width(working_area)
            );
        }
        if cells_per_axis > aabb_height(working_area) as i64 {
            panic!(
                "2^max_depth exceeds the working area height [2^{} > {}]",
                max_depth,
                aabb_height(working_area)
            );
        }

        let mut nodes = Vec::with_capacity(128);
        nodes.extend_from_slice(&[0, 0, 0, 0]);
        Quadtree {
            area_x_min: working_area.x_min(),
            area_x_max: working_area.x_max(),
            area_y_min: working_area.y_min(),
            area_y_max: working_area.y_max(),
            max_depth,
            split_cutoff,
            cell_iters: CellIterList::with_capacity(64),
            marked_boxes: MarkedBoxList::with_capacity(32),
            nodes,
            nodes_free_index: -1,
        }
    }

    /// Offers the box to all four entries of a quad.
    fn quad_add(
        &mut self,
        bx: &dyn Aabb,
        box_index: i32,
        quad_idx: i32,
        quad_depth: i32,
        x_min: i32,
        x_max: i32,
        y_min: i32,
        y_max: i32,
    ) {
        // the partition is recomputed on the fly, never stored
        let center_x = x_min + ((x_max - x_min) >> 1);
        let center_y = y_min + ((y_max - y_min) >> 1);

        self.node_add(bx, box_index, quad_idx, quad_depth, x_min, center_x, y_min, center_y);
        self.node_add(bx, box_index, quad_idx + 1, quad_depth, center_x + 1, x_max, y_min, center_y);
        self.node_add(bx, box_index, quad_idx + 2, quad_depth, center_x + 1, x_max, center_y + 1, y_max);
        self.node_add(bx, box_index, quad_idx + 3, quad_depth, x_min, center_x, center_y + 1, y_max);
    }

    fn node_add(
        &mut self,
        bx: &dyn Aabb,
        box_index: i32,
        node_idx: i32,
        node_depth: i32,
        x_min: i32,
        x_max: i32,
        y_min: i32,
        y_max: i32,
    ) {
        if !aabb_collides_with_area(bx, x_min, x_max, y_min, y_max) {
            return;
        }

        let node_value = self.nodes[node_idx as usize];
        if node_value > 0 {
            self.quad_add(bx, box_index, node_value, node_depth + 1, x_min, x_max, y_min, y_max);
        } else if node_value == 0 {
            self.nodes[node_idx as usize] = !self.cell_iters.add_iter_to(box_index, -1);
        } else if node_depth >= self.max_depth || self.cell_has_room(!node_value) {
            self.nodes[node_idx as usize] = !self.cell_iters.add_iter_to(box_index, !node_value);
        } else {
            // split: redirect the entry to a fresh quad, reflow the old
            // chain into it, then place the new box
            let quad_index = self.register_quad();
            self.nodes[node_idx as usize] = quad_index;

            self.quad_add(bx, box_index, quad_index, node_depth + 1, x_min, x_max, y_min, y_max);

            let mut iter_index = !node_value;
            while iter_index != -1 {
                let (reflow_box_index, next_index) = self.cell_iters.next(iter_index);
                self.cell_iters.cut_iter(iter_index, -1);
                let reflown = self.marked_boxes.get(reflow_box_index).clone();
                self.quad_add(
                    reflown.as_ref(),
                    reflow_box_index,
                    quad_index,
                    node_depth + 1,
                    x_min,
                    x_max,
                    y_min,
                    y_max,
                );
                iter_index = next_index;
            }
        }
    }

    fn cell_has_room(&self, mut iter_index: i32) -> bool {
        let mut box_room = self.split_cutoff;
        while iter_index != -1 {
            box_room -= 1;
            if box_room <= 0 {
                return false;
            }
            iter_index = self.cell_iters.next(iter_index).1;
        }
        true
    }

    fn register_quad(&mut self) -> i32 {
        if self.nodes_free_index != -1 {
            let new_index = self.nodes_free_index;
            self.nodes_free_index = self.nodes[new_index as usize];
            for i in 0..4 {
                self.nodes[(new_index + i) as usize] = 0;
            }
            new_index
        } else {
            let new_index = self.nodes.len() as i32;
            self.nodes.extend_from_slice(&[0, 0, 0, 0]);
            new_index
        }
    }

    /// Unlinks the first identity match from every leaf that holds it and
    /// returns its slot (still allocated), `-1` when absent. Collapses
    /// drained quads on the way out.
    fn remove_from_cells(&mut self, query: &dyn Aabb) -> i32 {
        let mut found = -1;
        self.quad_remove(
            query,
            0,
            self.area_x_min,
            self.area_x_max,
            self.area_y_min,
            self.area_y_max,
            &mut found,
        );
        found
    }

    /// Returns whether all four entries are now empty leaves.
    fn quad_remove(
        &mut self,
        query: &dyn Aabb,
        quad_idx: i32,
        x_min: i32,
        x_max: i32,
        y_min: i32,
        y_max: i32,
        found: &mut i32,
    ) -> bool {
        let center_x = x_min + ((x_max - x_min) >> 1);
        let center_y = y_min + ((y_max - y_min) >> 1);

        // all four must run: the box may sit in several children
        let empty_sub1 = self.node_remove(query, quad_idx, x_min, center_x, y_min, center_y, found);
        let empty_sub2 = self.node_remove(query, quad_idx + 1, center_x + 1, x_max, y_min, center_y, found);
        let empty_sub3 = self.node_remove(query, quad_idx + 2, center_x + 1, x_max, center_y + 1, y_max, found);
        let empty_sub4 = self.node_remove(query, quad_idx + 3, x_min, center_x, center_y + 1, y_max, found);
        empty_sub1 && empty_sub2 && empty_sub3 && empty_sub4
    }

    /// Returns whether the entry is, or just became, an empty leaf.
    fn node_remove(
        &mut self,
        query: &dyn Aabb,
        node_idx: i32,
        x_min: i32,
        x_max: i32,
        y_min: i32,
        y_max: i32,
        found: &mut i32,
    ) -> bool {
        let node_value = self.nodes[node_idx as usize];
        if node_value == 0 {
            return true;
        }
        if !aabb_collides_with_area(query, x_min, x_max, y_min, y_max) {
            return false;
        }
        if node_value > 0 {
            let empty_subtree = self.quad_remove(query, node_value, x_min, x_max, y_min, y_max, found);
            if !empty_subtree {
                return false;
            }

            // collapse: the quad goes back to the free list
            self.nodes[node_idx as usize] = 0;
            self.nodes[node_value as usize] = self.nodes_free_index;
            self.nodes_free_index = node_value;
            true
        } else {
            let mut iter_index = !node_value;
            let mut prev_index = -1;
            while iter_index != -1 {
                let (box_index, next_iter) = self.cell_iters.next(iter_index);
                if box_index == *found {
                    return self.remove_cell_iter(node_idx, iter_index, prev_index, next_iter);
                } else if *found == -1 && self.marked_boxes.box_at_equals(query, box_index) {
                    *found = box_index;
                    return self.remove_cell_iter(node_idx, iter_index, prev_index, next_iter);
                }

                prev_index = iter_index;
                iter_index = next_iter;
            }
            false
        }
    }

    /// Returns whether the cut left the leaf completely empty.
    fn remove_cell_iter(
        &mut self,
        leaf_node_index: i32,
        iter_index: i32,
        prev_iter_index: i32,
        next_iter_index: i32,
    ) -> bool {
        self.cell_iters.cut_iter(iter_index, prev_iter_index);
        if prev_iter_index == -1 {
            if next_iter_index == -1 {
                self.nodes[leaf_node_index as usize] = 0;
                return true;
            }
            self.nodes[leaf_node_index as usize] = !next_iter_index;
        }
        false
    }

    #[inline]
    fn root_frame(&self) -> QuadFrame {
        (0, self.area_x_min, self.area_x_max, self.area_y_min, self.area_y_max)
    }
}

impl Space for Quadtree {
    fn clear(&mut self) {
        self.marked_boxes.clear();
        self.cell_iters.clear();
        self.nodes_free_index = -1;
        self.nodes.truncate(4);
        for i in 0..4 {
            self.nodes[i] = 0;
        }
    }

    fn insert(&mut self, bx: AabbRef) {
        check_box_in_area(bx.as_ref(), self.area_x_min, self.area_x_max, self.area_y_min, self.area_y_max);
        let box_index = self.marked_boxes.add_box(bx.clone());
        self.quad_add(
            bx.as_ref(),
            box_index,
            0,
            1, // depth 0 would be the omitted root
            self.area_x_min,
            self.area_x_max,
            self.area_y_min,
            self.area_y_max,
        );
    }

    fn collision(&self, query: &dyn Aabb) -> Option<AabbRef> {
        let mut stack: QuadStack = SmallVec::new();
        stack.push(self.root_frame());
        while let Some((quad_idx, x_min, x_max, y_min, y_max)) = stack.pop() {
            let center_x = x_min + ((x_max - x_min) >> 1);
            let center_y = y_min + ((y_max - y_min) >> 1);
            let children: [QuadFrame; 4] = [
                (quad_idx, x_min, center_x, y_min, center_y),
                (quad_idx + 1, center_x + 1, x_max, y_min, center_y),
                (quad_idx + 2, center_x + 1, x_max, center_y + 1, y_max),
                (quad_idx + 3, x_min, center_x, center_y + 1, y_max),
            ];
            for (node_idx, cx_min, cx_max, cy_min, cy_max) in children {
                if !aabb_collides_with_area(query, cx_min, cx_max, cy_min, cy_max) {
                    continue;
                }
                let node_value = self.nodes[node_idx as usize];
                if node_value == 0 {
                    continue;
                }
                if node_value > 0 {
                    stack.push((node_value, cx_min, cx_max, cy_min, cy_max));
                } else {
                    let mut iter_index = !node_value;
                    while iter_index != -1 {
                        let (box_index, next_iter) = self.cell_iters.next(iter_index);
                        iter_index = next_iter;
                        if let Some(hit) = self.marked_boxes.collision_at(query, box_index) {
                            return Some(hit);
                        }
                    }
                }
            }
        }
        None
    }

    fn each_collision(&self, query: &dyn Aabb, visit: &mut dyn FnMut(&AabbRef) -> SearchControl) {
        self.marked_boxes.bump_no_dup_index();
        let mut stack: QuadStack = SmallVec::new();
        stack.push(self.root_frame());
        while let Some((quad_idx, x_min, x_max, y_min, y_max)) = stack.pop() {
            let center_x = x_min + ((x_max - x_min) >> 1);
            let center_y = y_min + ((y_max - y_min) >> 1);
            let children: [QuadFrame; 4] = [
                (quad_idx, x_min, center_x, y_min, center_y),
                (quad_idx + 1, center_x + 1, x_max, y_min, center_y),
                (quad_idx + 2, center_x + 1, x_max, center_y + 1, y_max),
                (quad_idx + 3, x_min, center_x, center_y + 1, y_max),
            ];
            for (node_idx, cx_min, cx_max, cy_min, cy_max) in children {
                if !aabb_collides_with_area(query, cx_min, cx_max, cy_min, cy_max) {
                    continue;
                }
                let node_value = self.nodes[node_idx as usize];
                if node_value == 0 {
                    continue;
                }
                if node_value > 0 {
                    stack.push((node_value, cx_min, cx_max, cy_min, cy_max));
                } else {
                    let mut iter_index = !node_value;
                    while iter_index != -1 {
                        let (box_index, next_iter) = self.cell_iters.next(iter_index);
                        iter_index = next_iter;
                        let hit = match self.marked_boxes.collision_no_dup_at(query, box_index) {
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
    }

    fn remove(&mut self, query: &dyn Aabb) -> bool {
        let found = self.remove_from_cells(query);
        if found == -1 {
            return false;
        }
        self.marked_boxes.remove_box_at(found);
        true
    }

    fn relocate(&mut self, bx: &dyn MutableAabb, x_min: i32, x_max: i32, y_min: i32, y_max: i32) {
        let found = self.remove_from_cells(bx);
        if found == -1 {
            panic!("box to relocate not found in the quadtree: {}", format_aabb(bx));
        }
        bx.set_bounds(x_min, x_max, y_min, y_max);
        check_box_in_area(bx, self.area_x_min, self.area_x_max, self.area_y_min, self.area_y_max);

        let stored = self.marked_boxes.get(found).clone();
        self.quad_add(
            stored.as_ref(),
            found,
            0,
            1,
            self.area_x_min,
            self.area_x_max,
            self.area_y_min,
            self.area_y_max,
        );
    }

    fn stabilize(&mut self) {
        // keep the boxes, restart the node array and iterators
        self.cell_iters.clear();
        self.nodes_free_index = -1;
        self.nodes.truncate(4);
        for i in 0..4 {
            self.nodes[i] = 0;
        }
        self.marked_boxes.pack();

        for box_index in 0..self.marked_boxes.len() as i32 {
            let bx = self.marked_boxes.get(box_index).clone();
            check_box_in_area(bx.as_ref(), self.area_x_min, self.area_x_max, self.area_y_min, self.area_y_max);
            self.quad_add(
                bx.as_ref(),
                box_index,
                0,
                1,
                self.area_x_min,
                self.area_x_max,
                self.area_y_min,
                self.area_y_max,
            );
        }
    }
}

impl fmt::Debug for Quadtree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn rec(f: &mut fmt::Formatter<'_>, tree: &Quadtree, frame: QuadFrame, depth: i32) -> fmt::Result {
            let (quad_idx, x_min, x_max, y_min, y_max) = frame;
            let center_x = x_min + ((x_max - x_min) >> 1);
            let center_y = y_min + ((y_max - y_min) >> 1);
            let children: [QuadFrame; 4] = [
                (quad_idx, x_min, center_x, y_min, center_y),
                (quad_idx + 1, center_x + 1, x_max, y_min, center_y),
                (quad_idx + 2, center_x + 1, x_max, center_y + 1, y_max),
                (quad_idx + 3, x_min, center_x, center_y + 1, y_max),
            ];
            for (node_idx, cx_min, cx_max, cy_min, cy_max) in children {
                let node_value = tree.nodes[node_idx as usize];
                let area = format!("[ X {} {}, Y {} {} ]", cx_min, cx_max, cy_min, cy_max);
                if node_value > 0 {
                    writeln!(f, "inode @{} / depth {} / area {}", node_idx, depth, area)?;
                    rec(f, tree, (node_value, cx_min, cx_max, cy_min, cy_max), depth + 1)?;
                } else if node_value == 0 {
                    writeln!(f, "leaf @{} / depth {} / area {} ||", node_idx, depth, area)?;
                } else {
                    write!(f, "leaf @{} / depth {} / area {} ||", node_idx, depth, area)?;
                    let mut iter_index = !node_value;
                    while iter_index != -1 {
                        let (box_index, next_iter) = tree.cell_iters.next(iter_index);
                        write!(f, " ({}){}", box_index, format_aabb(tree.marked_boxes.get(box_index).as_ref()))?;
                        iter_index = next_iter;
                    }
                    writeln!(f)?;
                }
            }
            Ok(())
        }
        writeln!(
            f,
            "root [ X {} {}, Y {} {} ]",
            self.area_x_min, self.area_x_max, self.area_y_min, self.area_y_max
        )?;
        rec(f, self, self.root_frame(), 1)
    }
}
