#![no_main]

use arbitrary::{Arbitrary, Unstructured};

use conesweeper::order::SweepFrame;
use conesweeper::sweep::cone::Cones;
use conesweeper::sweep::status::SideTree;
use conesweeper::Point;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Op {
    // Starts a cone at (x, 0).
    Insert { x: i16 },
    Remove { idx: usize },
}

fn arbitrary_ops(mut u: Unstructured) -> Result<(), arbitrary::Error> {
    // Sweeping upwards, with cone sides leaning left.
    let frame = SweepFrame::new(Point::new(0.0, 1.0), 0.0);
    let mut cones = Cones::default();
    let mut tree = SideTree::default();

    let len = u.arbitrary_len::<Op>()?;
    for _ in 0..len {
        match u.arbitrary()? {
            Op::Insert { x } => {
                let c = cones.new_cone(
                    Point::new(x as f64, 0.0),
                    Point::new(-1.0, 1.0),
                    Point::new(1.0, 1.0),
                );
                tree.insert(&frame, &cones.sides, cones.cones[c].left_side);
            }
            Op::Remove { idx } => {
                if !tree.is_empty() {
                    tree.remove_at(idx % tree.len());
                }
            }
        }

        let xs: Vec<f64> = tree.iter().map(|s| cones.sides[s].start.x).collect();
        assert!(xs.is_sorted());
        for (i, s) in tree.iter().enumerate() {
            assert_eq!(tree.position(&frame, &cones.sides, s), Some(i));
        }
    }
    Ok(())
}

fuzz_target!(|data: &[u8]| {
    let u = Unstructured::new(data);
    let _ = arbitrary_ops(u);
});
