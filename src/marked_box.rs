use std::cell::Cell;
use std::fmt;

use crate::aabb::{aabb_collides_with_area, aabbs_collide, format_aabb, same_aabb, Aabb, AabbRef};

/// A stable slot for one inserted box. While the slot is live, `mark`
/// records the no-dup counter value of the enumeration that last yielded
/// it. While the slot is free, `mark` holds the next free slot instead.
struct MarkedBox {
    bx: Option<AabbRef>,
    mark: Cell<i64>,
}

/// Arena of box slots shared by the cell-based spaces. Slot indices stay
/// valid across insertions and removals; only [`MarkedBoxList::pack`]
/// invalidates them, which is why stabilizing rebuilds the whole index.
///
/// The marks exist because a box covering several cells sits in several
/// chains: before an enumeration the space bumps `no_dup_index`, and each
/// slot is yielded only the first time its mark is behind the counter.
pub(crate) struct MarkedBoxList {
    list: Vec<MarkedBox>,
    free_index: i32,
    no_dup_index: Cell<i64>,
}

impl MarkedBoxList {
    pub(crate) fn with_capacity(capacity: usize) -> MarkedBoxList {
        MarkedBoxList {
            list: Vec::with_capacity(capacity),
            free_index: -1,
            no_dup_index: Cell::new(1),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.list.clear();
        self.free_index = -1;
    }

    pub(crate) fn len(&self) -> usize {
        self.list.len()
    }

    /// Moves live slots to the front and truncates the free tail. Every
    /// slot index held outside the list is invalid afterwards.
    pub(crate) fn pack(&mut self) {
        if self.free_index == -1 {
            return;
        }

        self.free_index = -1;
        let mut i = 0;
        while i < self.list.len() {
            if self.list[i].bx.is_some() {
                i += 1;
                continue;
            }
            let last = self.list.len() - 1;
            self.list.swap(i, last);
            self.list.truncate(last);
        }
    }

    pub(crate) fn get(&self, box_index: i32) -> &AabbRef {
        self.list[box_index as usize]
            .bx
            .as_ref()
            .expect("slot references a removed box")
    }

    /// Pins a box at a stable slot, reusing a freed slot when one exists.
    pub(crate) fn add_box(&mut self, bx: AabbRef) -> i32 {
        if self.free_index != -1 {
            let new_index = self.free_index;
            self.free_index = self.list[new_index as usize].mark.get() as i32;
            self.list[new_index as usize] = MarkedBox {
                bx: Some(bx),
                mark: Cell::new(0),
            };
            new_index
        } else {
            let new_index = self.list.len() as i32;
            self.list.push(MarkedBox {
                bx: Some(bx),
                mark: Cell::new(0),
            });
            new_index
        }
    }

    pub(crate) fn remove_box_at(&mut self, box_index: i32) {
        self.list[box_index as usize] = MarkedBox {
            bx: None,
            mark: Cell::new(self.free_index as i64),
        };
        self.free_index = box_index;
    }

    /// Identity check against the slot's box.
    pub(crate) fn box_at_equals(&self, query: &dyn Aabb, box_index: i32) -> bool {
        match &self.list[box_index as usize].bx {
            Some(bx) => same_aabb(query, bx.as_ref()),
            None => false,
        }
    }

    pub(crate) fn collision_at(&self, query: &dyn Aabb, box_index: i32) -> Option<AabbRef> {
        let target = self.get(box_index);
        if aabbs_collide(query, target.as_ref()) && !same_aabb(query, target.as_ref()) {
            return Some(target.clone());
        }
        None
    }

    /// Same as [`MarkedBoxList::collision_at`] with the query bounds
    /// pre-read, for the hot per-cell loops.
    pub(crate) fn collision_with_area_at(
        &self,
        query: &dyn Aabb,
        x_min: i32,
        x_max: i32,
        y_min: i32,
        y_max: i32,
        box_index: i32,
    ) -> Option<AabbRef> {
        let target = self.get(box_index);
        if aabb_collides_with_area(target.as_ref(), x_min, x_max, y_min, y_max)
            && !same_aabb(query, target.as_ref())
        {
            return Some(target.clone());
        }
        None
    }

    /// Collision test that yields each slot at most once per enumeration.
    /// Call [`MarkedBoxList::bump_no_dup_index`] before the enumeration.
    pub(crate) fn collision_no_dup_at(&self, query: &dyn Aabb, box_index: i32) -> Option<AabbRef> {
        let entry = &self.list[box_index as usize];
        if entry.mark.get() == self.no_dup_index.get() {
            return None;
        }
        let target = entry.bx.as_ref().expect("slot references a removed box");
        if aabbs_collide(query, target.as_ref()) && !same_aabb(query, target.as_ref()) {
            entry.mark.set(self.no_dup_index.get());
            return Some(target.clone());
        }
        None
    }

    pub(crate) fn collision_no_dup_with_area_at(
        &self,
        query: &dyn Aabb,
        x_min: i32,
        x_max: i32,
        y_min: i32,
        y_max: i32,
        box_index: i32,
    ) -> Option<AabbRef> {
        let entry = &self.list[box_index as usize];
        if entry.mark.get() == self.no_dup_index.get() {
            return None;
        }
        let target = entry.bx.as_ref().expect("slot references a removed box");
        if aabb_collides_with_area(target.as_ref(), x_min, x_max, y_min, y_max)
            && !same_aabb(query, target.as_ref())
        {
            entry.mark.set(self.no_dup_index.get());
            return Some(target.clone());
        }
        None
    }

    /// Starts a fresh dedup generation. On wrap-around every live mark is
    /// reset to 0 and the counter restarts at 1.
    pub(crate) fn bump_no_dup_index(&self) {
        let bumped = self.no_dup_index.get().wrapping_add(1);
        if bumped < 0 {
            for entry in &self.list {
                if entry.bx.is_some() {
                    entry.mark.set(0);
                }
            }
            self.no_dup_index.set(1);
        } else {
            self.no_dup_index.set(bumped);
        }
    }
}

impl fmt::Debug for MarkedBoxList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MarkedBoxList {{ no_dup:{}, slots:", self.no_dup_index.get())?;
        for (i, entry) in self.list.iter().enumerate() {
            match &entry.bx {
                Some(bx) => write!(f, " (#{} m{} {})", i, entry.mark.get(), format_aabb(bx.as_ref()))?,
                None => write!(f, " (#{} free next:{})", i, entry.mark.get())?,
            }
        }
        write!(f, " }}")
    }
}
