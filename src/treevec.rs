//! An ordered vector with cheap insertion and removal in the middle.
//!
//! The sweep status trees keep a few dozen to a few thousand elements sorted
//! by a comparator that changes as the sweep advances, so they need positional
//! access (`partition_point`, `insert`, `remove` at an offset) rather than a
//! keyed map. We store the elements in a list of bounded chunks: every chunk is
//! non-empty and holds at most `B` elements.

use arrayvec::ArrayVec;

/// A vector stored as a sequence of chunks of at most `B` elements.
#[derive(Clone, Debug)]
pub struct TreeVec<T, const B: usize> {
    chunks: Vec<ArrayVec<T, B>>,
    len: usize,
}

impl<T, const B: usize> Default for TreeVec<T, B> {
    fn default() -> Self {
        Self {
            chunks: Vec::new(),
            len: 0,
        }
    }
}

impl<T, const B: usize> TreeVec<T, B> {
    /// Creates an empty vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Are we empty?
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // Finds the chunk containing `offset`, and the offset within that chunk.
    fn locate(&self, mut offset: usize) -> Option<(usize, usize)> {
        for (idx, chunk) in self.chunks.iter().enumerate() {
            if offset < chunk.len() {
                return Some((idx, offset));
            }
            offset -= chunk.len();
        }
        None
    }

    /// Returns the element at `index`, if there is one.
    pub fn get(&self, index: usize) -> Option<&T> {
        let (chunk, offset) = self.locate(index)?;
        self.chunks[chunk].get(offset)
    }

    /// Inserts `element` at position `index`, shifting everything after it.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, element: T) {
        assert!(index <= self.len, "insertion index out of bounds");
        self.len += 1;

        // Inserting at the very end goes into the last chunk, which `locate`
        // can't find because the offset is one past it.
        let (chunk_idx, offset) = match self.locate(index) {
            Some(loc) => loc,
            None => match self.chunks.last() {
                Some(last) => (self.chunks.len() - 1, last.len()),
                None => {
                    self.chunks.push(ArrayVec::new());
                    (0, 0)
                }
            },
        };

        let chunk = &mut self.chunks[chunk_idx];
        if chunk.is_full() {
            let mut second_half: ArrayVec<T, B> = chunk.drain(B / 2..).collect();
            if offset <= B / 2 {
                chunk.insert(offset, element);
            } else {
                second_half.insert(offset - B / 2, element);
            }
            self.chunks.insert(chunk_idx + 1, second_half);
        } else {
            chunk.insert(offset, element);
        }
    }

    /// Removes and returns the element at position `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn remove(&mut self, index: usize) -> T {
        let Some((chunk_idx, offset)) = self.locate(index) else {
            panic!("removal index out of bounds");
        };
        self.len -= 1;
        let ret = self.chunks[chunk_idx].remove(offset);

        let len = self.chunks[chunk_idx].len();
        if len == 0 {
            self.chunks.remove(chunk_idx);
        } else if len < B / 2 {
            // Try to absorb a small chunk into one of its neighbors.
            if chunk_idx + 1 < self.chunks.len() && len + self.chunks[chunk_idx + 1].len() <= B {
                let next = self.chunks.remove(chunk_idx + 1);
                self.chunks[chunk_idx].extend(next);
            } else if chunk_idx > 0 && len + self.chunks[chunk_idx - 1].len() <= B {
                let cur = self.chunks.remove(chunk_idx);
                self.chunks[chunk_idx - 1].extend(cur);
            }
        }
        ret
    }

    /// Iterates over the elements in order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.chunks.iter().flat_map(|chunk| chunk.iter())
    }

    /// Returns the index of the partition point according to the given predicate.
    ///
    /// As with [`slice::partition_point`], the predicate must be true for some
    /// (possibly empty) prefix of the elements and false for all the rest.
    pub fn partition_point<P>(&self, mut pred: P) -> usize
    where
        P: FnMut(&T) -> bool,
    {
        // unwrap: chunks are never empty
        let full_chunks = self
            .chunks
            .partition_point(|chunk| pred(chunk.last().unwrap()));
        let before: usize = self.chunks[..full_chunks].iter().map(|c| c.len()).sum();
        match self.chunks.get(full_chunks) {
            Some(chunk) => before + chunk.partition_point(pred),
            None => before,
        }
    }

    /// Panics if the internal structure is inconsistent.
    pub fn check_invariants(&self) {
        for chunk in &self.chunks {
            assert!(!chunk.is_empty());
        }
        assert_eq!(self.len, self.chunks.iter().map(|c| c.len()).sum::<usize>());
    }
}

impl<T, const B: usize> FromIterator<T> for TreeVec<T, B> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut ret = TreeVec::new();
        for x in iter {
            ret.insert(ret.len(), x);
        }
        ret
    }
}

impl<T, const B: usize> std::ops::Index<usize> for TreeVec<T, B> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        // unwrap: out-of-bounds indexing panics, as it does for slices
        self.get(index).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn insert_get() {
        let mut vec = TreeVec::<i32, 4>::default();
        for x in 1..=4 {
            vec.insert(0, x);
        }
        assert_eq!(vec.iter().copied().collect::<Vec<_>>(), vec![4, 3, 2, 1]);
        vec.check_invariants();

        for x in 1..=4 {
            vec.insert(0, x);
        }
        vec.check_invariants();
        assert_eq!(
            vec.iter().copied().collect::<Vec<_>>(),
            vec![4, 3, 2, 1, 4, 3, 2, 1]
        );
        assert_eq!(vec[5], 3);
        assert_eq!(vec.get(8), None);
    }

    #[test]
    fn insert_remove() {
        let mut vec = TreeVec::<i32, 4>::default();
        for x in 1..=4 {
            vec.insert(0, x);
        }
        assert_eq!(vec.remove(1), 3);
        vec.check_invariants();
        assert_eq!(vec.iter().copied().collect::<Vec<_>>(), vec![4, 2, 1]);

        for x in 1..=4 {
            vec.insert(0, x);
        }
        assert_eq!(vec.remove(5), 2);
        vec.check_invariants();
        assert_eq!(
            vec.iter().copied().collect::<Vec<_>>(),
            vec![4, 3, 2, 1, 4, 1]
        );

        while !vec.is_empty() {
            vec.remove(0);
            vec.check_invariants();
        }
        assert_eq!(vec.iter().count(), 0);
    }

    #[test]
    fn partition_point_across_chunks() {
        let vec: TreeVec<i32, 4> = (0..20).collect();
        vec.check_invariants();
        for search in -1..=20 {
            assert_eq!(vec.partition_point(|x| *x < search), search.clamp(0, 20) as usize);
        }
        assert_eq!(TreeVec::<i32, 4>::new().partition_point(|_| true), 0);
    }

    #[derive(Clone, Debug)]
    enum Op {
        Insert(usize, i32),
        Remove(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (any::<usize>(), any::<i32>()).prop_map(|(i, x)| Op::Insert(i, x)),
            any::<usize>().prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn agrees_with_vec(ops in prop::collection::vec(op(), 0..200)) {
            let mut vec = Vec::new();
            let mut tree_vec = TreeVec::<i32, 4>::new();
            for op in ops {
                match op {
                    Op::Insert(i, x) => {
                        let i = i % (vec.len() + 1);
                        vec.insert(i, x);
                        tree_vec.insert(i, x);
                    }
                    Op::Remove(i) => {
                        if !vec.is_empty() {
                            let i = i % vec.len();
                            prop_assert_eq!(vec.remove(i), tree_vec.remove(i));
                        }
                    }
                }
                tree_vec.check_invariants();
                prop_assert_eq!(tree_vec.len(), vec.len());
            }
            prop_assert_eq!(tree_vec.iter().copied().collect::<Vec<_>>(), vec);
        }
    }
}
