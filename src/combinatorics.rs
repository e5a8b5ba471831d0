//! Deterministic enumeration of k-permutations and unordered pairs.
//!
//! Both enumerations follow lexicographic order over *positions* of the
//! input slice, so for a sorted input the output is lexicographically sorted.
//! Search traces rely on this order being stable.

/// Iterator over all ordered selections of `k` items from a pool.
pub struct Permutations<T: Clone> {
    pool: Vec<T>,
    k: usize,
    indices: Vec<usize>,
    cycles: Vec<usize>,
    started: bool,
    done: bool,
}

impl<T: Clone> Permutations<T> {
    pub fn new(pool: &[T], k: usize) -> Self {
        let n = pool.len();
        Permutations {
            pool: pool.to_vec(),
            k,
            indices: (0..n).collect(),
            cycles: (0..k.min(n)).map(|i| n - i).collect(),
            started: false,
            done: k > n,
        }
    }

    fn current(&self) -> Vec<T> {
        self.indices[..self.k]
            .iter()
            .map(|&i| self.pool[i].clone())
            .collect()
    }
}

impl<T: Clone> Iterator for Permutations<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Vec<T>> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.current());
        }

        let n = self.pool.len();
        for i in (0..self.k).rev() {
            self.cycles[i] -= 1;
            if self.cycles[i] == 0 {
                self.indices[i..].rotate_left(1);
                self.cycles[i] = n - i;
            } else {
                let j = self.cycles[i];
                self.indices.swap(i, n - j);
                return Some(self.current());
            }
        }

        self.done = true;
        None
    }
}

/// All ordered selections of `k` items from `pool`.
pub fn permutations<T: Clone>(pool: &[T], k: usize) -> Permutations<T> {
    Permutations::new(pool, k)
}

/// All unordered index pairs `(a, b)` with `a < b < len`, lexicographically.
pub fn index_pairs(len: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..len).flat_map(move |a| (a + 1..len).map(move |b| (a, b)))
}

/// Number of ways to pick 2 out of `n`.
pub fn pair_count(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// `n!`, saturating on overflow.
pub fn factorial(n: usize) -> usize {
    (1..=n).fold(1usize, |acc, k| acc.saturating_mul(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_permutations_in_lexicographic_order() {
        let perms: Vec<Vec<usize>> = permutations(&[1, 2, 3], 3).collect();
        assert_eq!(
            perms,
            vec![
                vec![1, 2, 3],
                vec![1, 3, 2],
                vec![2, 1, 3],
                vec![2, 3, 1],
                vec![3, 1, 2],
                vec![3, 2, 1],
            ]
        );
    }

    #[test]
    fn test_partial_permutations() {
        let perms: Vec<Vec<char>> = permutations(&['a', 'b', 'c', 'd'], 2).collect();
        assert_eq!(perms.len(), 12);
        assert_eq!(perms[0], vec!['a', 'b']);
        assert_eq!(perms[1], vec!['a', 'c']);
        assert_eq!(perms[3], vec!['b', 'a']);
        assert_eq!(perms[11], vec!['d', 'c']);
    }

    #[test]
    fn test_edge_cases() {
        assert_eq!(permutations(&[1, 2], 3).count(), 0);
        assert_eq!(permutations(&[1, 2], 0).collect::<Vec<_>>(), vec![Vec::<i32>::new()]);
        assert_eq!(permutations::<u8>(&[], 0).count(), 1);
        assert_eq!(permutations(&[0usize; 5], 5).count(), factorial(5));
    }

    #[test]
    fn test_index_pairs() {
        let pairs: Vec<_> = index_pairs(4).collect();
        assert_eq!(pairs, vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);
        assert_eq!(pairs.len(), pair_count(4));
        assert_eq!(index_pairs(1).count(), 0);
    }
}
