use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::ptr;
use std::rc::Rc;

/// Read-only capability for an axis-aligned box with inclusive integer
/// bounds. Implementors must keep `x_min() <= x_max()` and
/// `y_min() <= y_max()`; spaces treat a violation as a programming error.
///
/// Spaces compare boxes by instance, not by coordinates: the exact value
/// you insert is the exact value queries hand back, so `Any`-based
/// downcasting to your concrete type is reliable.
pub trait Aabb: Any {
    fn x_min(&self) -> i32;
    fn x_max(&self) -> i32;
    fn y_min(&self) -> i32;
    fn y_max(&self) -> i32;
}

/// An [`Aabb`] whose bounds can be rewritten in place. Only these can be
/// passed to [`Space::relocate`](crate::Space::relocate).
///
/// `set_bounds` takes `&self`: implementations are expected to use interior
/// mutability (see [`SharedAabb`]), since spaces hold shared handles.
pub trait MutableAabb: Aabb {
    fn set_bounds(&self, x_min: i32, x_max: i32, y_min: i32, y_max: i32);
}

/// Shared handle to a user-owned box. Spaces store and return these.
pub type AabbRef = Rc<dyn Aabb>;

impl dyn Aabb {
    /// Recover the concrete type behind a query result.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        let any: &dyn Any = self;
        any.downcast_ref::<T>()
    }
}

/// Instance identity: do `a` and `b` refer to the same allocation?
#[inline]
pub fn same_aabb(a: &dyn Aabb, b: &dyn Aabb) -> bool {
    ptr::addr_eq(a as *const dyn Aabb, b as *const dyn Aabb)
}

/// Coordinate equality. Two distinct instances with equal coordinates are
/// equal here but still collide with each other.
pub fn aabbs_equal(a: &dyn Aabb, b: &dyn Aabb) -> bool {
    a.x_min() == b.x_min()
        && a.x_max() == b.x_max()
        && a.y_min() == b.y_min()
        && a.y_max() == b.y_max()
}

#[inline]
pub fn aabbs_collide(a: &dyn Aabb, b: &dyn Aabb) -> bool {
    segment_collides(a.x_min(), a.x_max(), b.x_min(), b.x_max())
        && segment_collides(a.y_min(), a.y_max(), b.y_min(), b.y_max())
}

#[inline]
pub fn aabb_collides_with_area(
    bx: &dyn Aabb,
    x_min_area: i32,
    x_max_area: i32,
    y_min_area: i32,
    y_max_area: i32,
) -> bool {
    segment_collides(bx.x_min(), bx.x_max(), x_min_area, x_max_area)
        && segment_collides(bx.y_min(), bx.y_max(), y_min_area, y_max_area)
}

pub fn aabb_contains(container: &dyn Aabb, contained: &dyn Aabb) -> bool {
    segment_contains(container.x_min(), container.x_max(), contained.x_min(), contained.x_max())
        && segment_contains(container.y_min(), container.y_max(), contained.y_min(), contained.y_max())
}

pub fn area_contains_aabb(
    x_min_area: i32,
    x_max_area: i32,
    y_min_area: i32,
    y_max_area: i32,
    contained: &dyn Aabb,
) -> bool {
    segment_contains(x_min_area, x_max_area, contained.x_min(), contained.x_max())
        && segment_contains(y_min_area, y_max_area, contained.y_min(), contained.y_max())
}

/// Overlap test for inclusive segments.
#[inline]
pub fn segment_collides(a_min: i32, a_max: i32, b_min: i32, b_max: i32) -> bool {
    if a_min <= b_min {
        a_max >= b_min
    } else {
        b_max >= a_min
    }
}

/// Containment test for inclusive segments.
#[inline]
pub fn segment_contains(container_min: i32, container_max: i32, contained_min: i32, contained_max: i32) -> bool {
    container_min <= contained_min && container_max >= contained_max
}

#[inline]
pub fn aabb_width(bx: &dyn Aabb) -> i32 {
    bx.x_max() - bx.x_min() + 1
}

#[inline]
pub fn aabb_height(bx: &dyn Aabb) -> i32 {
    bx.y_max() - bx.y_min() + 1
}

/// Panics when the box has inverted bounds, naming the offending values.
pub fn assert_aabb_valid(bx: &dyn Aabb) {
    if bx.x_min() > bx.x_max() {
        panic!("box x_min > x_max [{} > {}]", bx.x_min(), bx.x_max());
    }
    if bx.y_min() > bx.y_max() {
        panic!("box y_min > y_max [{} > {}]", bx.y_min(), bx.y_max());
    }
}

/// Compact textual form for diagnostics and panic messages.
pub fn format_aabb(bx: &dyn Aabb) -> String {
    format!(
        "[ X {} {}, Y {} {} ]",
        bx.x_min(),
        bx.x_max(),
        bx.y_min(),
        bx.y_max()
    )
}

/// Default box implementation: `Cell`-backed so bounds can be rewritten
/// through the shared handles spaces keep.
pub struct SharedAabb {
    x_min: Cell<i32>,
    x_max: Cell<i32>,
    y_min: Cell<i32>,
    y_max: Cell<i32>,
}

impl SharedAabb {
    /// Panics on inverted bounds.
    pub fn new(x_min: i32, x_max: i32, y_min: i32, y_max: i32) -> SharedAabb {
        let bx = SharedAabb {
            x_min: Cell::new(x_min),
            x_max: Cell::new(x_max),
            y_min: Cell::new(y_min),
            y_max: Cell::new(y_max),
        };
        assert_aabb_valid(&bx);
        bx
    }

    /// Copies the coordinates of another box into a fresh instance.
    pub fn from_aabb(bx: &dyn Aabb) -> SharedAabb {
        SharedAabb {
            x_min: Cell::new(bx.x_min()),
            x_max: Cell::new(bx.x_max()),
            y_min: Cell::new(bx.y_min()),
            y_max: Cell::new(bx.y_max()),
        }
    }
}

impl Aabb for SharedAabb {
    fn x_min(&self) -> i32 {
        self.x_min.get()
    }
    fn x_max(&self) -> i32 {
        self.x_max.get()
    }
    fn y_min(&self) -> i32 {
        self.y_min.get()
    }
    fn y_max(&self) -> i32 {
        self.y_max.get()
    }
}

impl MutableAabb for SharedAabb {
    fn set_bounds(&self, x_min: i32, x_max: i32, y_min: i32, y_max: i32) {
        self.x_min.set(x_min);
        self.x_max.set(x_max);
        self.y_min.set(y_min);
        self.y_max.set(y_max);
    }
}

impl fmt::Debug for SharedAabb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedAabb{}", format_aabb(self))
    }
}
