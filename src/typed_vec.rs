// Declares an index newtype together with a vector that can only be indexed by it.
//
// Arenas of polyline nodes, graph vertices, cones and cone sides all hand out
// these indices, so a cone handle can't accidentally be used to look up a side.
macro_rules! typed_vec {
    ($(#[$vec_meta:meta])* $vec_name:ident, $(#[$idx_meta:meta])* $idx_name:ident, $dbg_prefix:expr) => {
        $(#[$idx_meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
        pub struct $idx_name(pub(crate) usize);

        $(#[$vec_meta])*
        #[derive(Clone, PartialEq)]
        pub struct $vec_name<T> {
            inner: Vec<T>,
        }

        impl $idx_name {
            /// The raw index, for use in debug output and tests.
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl std::fmt::Debug for $idx_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}_{}", $dbg_prefix, self.0)
            }
        }

        #[allow(dead_code)]
        impl<T> $vec_name<T> {
            /// Creates a new vector with capacity for at least `cap` elements before reallocating.
            pub fn with_capacity(cap: usize) -> Self {
                Self {
                    inner: Vec::with_capacity(cap),
                }
            }

            /// Returns an iterator over all indices into this vector.
            pub fn indices(&self) -> impl Iterator<Item = $idx_name> {
                (0..self.inner.len()).map($idx_name)
            }

            /// The length of this vector.
            pub fn len(&self) -> usize {
                self.inner.len()
            }

            /// Are we empty?
            pub fn is_empty(&self) -> bool {
                self.inner.is_empty()
            }

            /// The index that the next call to `push` will return.
            pub fn next_idx(&self) -> $idx_name {
                $idx_name(self.inner.len())
            }

            /// Adds a new element, returning its index.
            pub fn push(&mut self, elt: T) -> $idx_name {
                self.inner.push(elt);
                $idx_name(self.len() - 1)
            }

            /// Returns the element at `idx`, if there is one.
            pub fn get(&self, idx: $idx_name) -> Option<&T> {
                self.inner.get(idx.0)
            }

            /// Removes all elements.
            pub fn clear(&mut self) {
                self.inner.clear();
            }

            /// Returns an iterator over indices and elements.
            pub fn iter(&self) -> impl Iterator<Item = ($idx_name, &T)> + '_ {
                self.inner
                    .iter()
                    .enumerate()
                    .map(|(idx, t)| ($idx_name(idx), t))
            }

            /// Returns an iterator over indices and mutable elements.
            pub fn iter_mut(&mut self) -> impl Iterator<Item = ($idx_name, &mut T)> + '_ {
                self.inner
                    .iter_mut()
                    .enumerate()
                    .map(|(idx, t)| ($idx_name(idx), t))
            }
        }

        impl<T> Default for $vec_name<T> {
            fn default() -> Self {
                Self { inner: Vec::new() }
            }
        }

        impl<T> std::ops::Index<$idx_name> for $vec_name<T> {
            type Output = T;

            fn index(&self, index: $idx_name) -> &Self::Output {
                &self.inner[index.0]
            }
        }

        impl<T> std::ops::IndexMut<$idx_name> for $vec_name<T> {
            fn index_mut(&mut self, index: $idx_name) -> &mut T {
                &mut self.inner[index.0]
            }
        }

        impl<T: std::fmt::Debug> std::fmt::Debug for $vec_name<T> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                struct Entry<'a, T> {
                    idx: $idx_name,
                    inner: &'a T,
                }

                impl<T: std::fmt::Debug> std::fmt::Debug for Entry<'_, T> {
                    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                        write!(f, "{idx:?}: {inner:?}", idx = self.idx, inner = self.inner)
                    }
                }

                let mut list = f.debug_list();
                for (idx, inner) in self.iter() {
                    list.entry(&Entry { idx, inner });
                }
                list.finish()
            }
        }
    };
}
