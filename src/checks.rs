use crate::aabb::{assert_aabb_valid, Aabb};

/// Validates a box against a bounded space's working area, panicking with
/// the offending values on any violation.
pub(crate) fn check_box_in_area(
    bx: &dyn Aabb,
    area_x_min: i32,
    area_x_max: i32,
    area_y_min: i32,
    area_y_max: i32,
) {
    assert_aabb_valid(bx);
    if bx.x_min() < area_x_min {
        panic!("box x_min < working area x_min [{} < {}]", bx.x_min(), area_x_min);
    }
    if bx.x_max() > area_x_max {
        panic!("box x_max > working area x_max [{} > {}]", bx.x_max(), area_x_max);
    }
    if bx.y_min() < area_y_min {
        panic!("box y_min < working area y_min [{} < {}]", bx.y_min(), area_y_min);
    }
    if bx.y_max() > area_y_max {
        panic!("box y_max > working area y_max [{} > {}]", bx.y_max(), area_y_max);
    }
}
