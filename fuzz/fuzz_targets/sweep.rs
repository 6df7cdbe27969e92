#![no_main]

use arbitrary::Unstructured;
use conesweeper::{arbitrary as arb, LineSweeper, Polyline, VisibilityGraph};
use libfuzzer_sys::fuzz_target;

fn sweep(u: &mut Unstructured) -> Result<(), arbitrary::Error> {
    let obstacles = arb::grid_obstacles(u)?;
    let dir = arb::direction(u)?;
    let angle = arb::cone_angle(u)?;
    let Some(mut border) = Polyline::bounding_box_border(&obstacles, 5.0) else {
        return Ok(());
    };

    let mut graph = VisibilityGraph::new();
    let stats = LineSweeper::new(&obstacles, dir, angle)
        .unwrap()
        .with_border(&mut border)
        .calculate(&mut graph)
        .unwrap();
    assert_eq!(stats.unclosed_cones, 0);
    Ok(())
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let _ = sweep(&mut u);
});
