mod common;

use broadphase2d::HashGrid;
use common::AXIS_CELLS;

#[test]
fn single_collision() {
    let area = common::reference_area();
    common::proc_single_collision(&mut HashGrid::new(&area, AXIS_CELLS, AXIS_CELLS));
}

#[test]
fn mutate_vs_stabilize_1200() {
    let area = common::reference_area();
    common::proc_mutate_vs_stabilize_1200(
        &mut HashGrid::new(&area, AXIS_CELLS, AXIS_CELLS),
        &mut HashGrid::new(&area, AXIS_CELLS, AXIS_CELLS),
    );
}

#[test]
fn stabilize_600() {
    let area = common::reference_area();
    common::proc_stabilize_n(&mut HashGrid::new(&area, AXIS_CELLS, AXIS_CELLS), 600);
}

#[test]
fn neutral_stabilize_3000() {
    let area = common::reference_area();
    common::proc_neutral_stabilize(
        &mut HashGrid::new(&area, AXIS_CELLS, AXIS_CELLS),
        &mut HashGrid::new(&area, AXIS_CELLS, AXIS_CELLS),
        3000,
    );
}
