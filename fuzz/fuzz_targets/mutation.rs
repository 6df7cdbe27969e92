#![no_main]

use arbitrary::{Arbitrary, Unstructured};

use conesweeper::treevec::TreeVec;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Op {
    Insert { idx: usize, val: i16 },
    InsertSorted { val: i16 },
    Remove { idx: usize },
}

// Applies the same operation to a `Vec` and a `TreeVec`, which should agree
// afterwards.
fn apply<const B: usize>(op: &Op, vec: &mut Vec<i16>, tree_vec: &mut TreeVec<i16, B>) {
    match *op {
        Op::Insert { idx, val } => {
            let idx = idx % (vec.len() + 1);
            vec.insert(idx, val);
            tree_vec.insert(idx, val);
        }
        Op::InsertSorted { val } => {
            // Only meaningful if the vec is sorted, but the two should agree
            // on where the partition point is regardless.
            let idx = vec.partition_point(|x| *x <= val);
            assert_eq!(idx, tree_vec.partition_point(|x| *x <= val));
            vec.insert(idx, val);
            tree_vec.insert(idx, val);
        }
        Op::Remove { idx } => {
            if !vec.is_empty() {
                let idx = idx % vec.len();
                assert_eq!(vec.remove(idx), tree_vec.remove(idx));
            }
        }
    }
}

fn arbitrary_ops(mut u: Unstructured) -> Result<(), arbitrary::Error> {
    let sorted_only: bool = u.arbitrary()?;
    let len = u.arbitrary_len::<Op>()?;
    let mut vec = Vec::new();
    let mut tree_vec = TreeVec::<_, 4>::new();
    for _ in 0..len {
        let mut op: Op = u.arbitrary()?;
        if sorted_only {
            if let Op::Insert { val, .. } = op {
                op = Op::InsertSorted { val };
            }
        }
        apply(&op, &mut vec, &mut tree_vec);
        tree_vec.check_invariants();

        assert_eq!(tree_vec.len(), vec.len());
        assert_eq!(tree_vec.iter().copied().collect::<Vec<_>>(), vec);
        if sorted_only {
            assert!(vec.is_sorted());
        }
    }
    Ok(())
}

fuzz_target!(|data: &[u8]| {
    let u = Unstructured::new(data);
    let _ = arbitrary_ops(u);
});
