#![no_main]

use arbitrary::Unstructured;
use conesweeper::{arbitrary as arb, ConeSpanner, Point};
use libfuzzer_sys::fuzz_target;

fn spanner(u: &mut Unstructured) -> Result<(), arbitrary::Error> {
    let obstacles = arb::grid_obstacles(u)?;
    let angle = arb::cone_angle(u)?;
    let port = Point::new(
        arb::float_in_range(-5.0, 45.0, u)?,
        arb::float_in_range(-5.0, 45.0, u)?,
    );
    let bidirectional: bool = u.arbitrary()?;

    let out = ConeSpanner::new(obstacles, angle)
        .with_ports([port])
        .bidirectional(bidirectional)
        .calculate()
        .unwrap();
    assert!(out.graph.edges().all(|(_, e)| {
        let (a, b) = out.graph.edge_points(e);
        a != b
    }));
    Ok(())
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let _ = spanner(&mut u);
});
