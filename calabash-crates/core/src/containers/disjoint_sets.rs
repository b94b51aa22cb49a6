use std::cmp::Ordering;

use crate::calabash_assert_simple;

/// A disjoint-set (union-find) structure over the indices `0..len`.
///
/// Two indices have the same representative exactly when they have been
/// merged by a chain of [`DisjointSets::union`] calls. The solver uses this
/// to compute the orbits of a set of permutations: merging `i` with
/// `perm[i]` for every generator partitions the indices into orbits.
#[derive(Clone, Debug)]
pub struct DisjointSets {
    parents: Vec<usize>,
    ranks: Vec<u32>,
}

impl DisjointSets {
    pub fn new(len: usize) -> DisjointSets {
        DisjointSets {
            parents: (0..len).collect(),
            ranks: vec![0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Returns the representative of the set containing `index`.
    ///
    /// The representative is canonical: `find(a) == find(b)` if and only if
    /// `a` and `b` have been merged, directly or transitively. No other
    /// property of the returned index is guaranteed.
    pub fn find(&mut self, index: usize) -> usize {
        calabash_assert_simple!(index < self.parents.len());

        let mut current = index;
        while self.parents[current] != current {
            // Path halving keeps later lookups cheap.
            self.parents[current] = self.parents[self.parents[current]];
            current = self.parents[current];
        }
        current
    }

    /// Merges the sets containing `a` and `b`.
    pub fn union(&mut self, a: usize, b: usize) {
        let root_a = self.find(a);
        let root_b = self.find(b);

        if root_a == root_b {
            return;
        }

        match self.ranks[root_a].cmp(&self.ranks[root_b]) {
            Ordering::Less => self.parents[root_a] = root_b,
            Ordering::Greater => self.parents[root_b] = root_a,
            Ordering::Equal => {
                self.parents[root_b] = root_a;
                self.ranks[root_a] += 1;
            }
        }
    }
}
