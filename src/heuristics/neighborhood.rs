//! Swap neighborhood.
//!
//! The only elementary move is exchanging the positions of two customers;
//! the depot stays fixed at both ends of the tour.

use crate::combinatorics::index_pairs;
use crate::error::TourError;
use crate::evaluator::Tour;
use std::fmt;

/// Swap of two customer nodes, stored with `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Move {
    a: usize,
    b: usize,
}

impl Move {
    /// Normalized swap of two distinct customers.
    pub fn swap(u: usize, v: usize) -> Self {
        debug_assert!(u != v, "a swap needs two distinct nodes");
        Move {
            a: u.min(v),
            b: u.max(v),
        }
    }

    pub fn nodes(&self) -> (usize, usize) {
        (self.a, self.b)
    }

    /// Apply the swap to a copy of `tour`.
    pub fn try_apply(&self, tour: &[usize]) -> Result<Tour, TourError> {
        let locate = |node: usize| {
            tour.iter()
                .position(|&n| n == node)
                .filter(|&pos| pos != 0 && pos + 1 != tour.len())
                .ok_or_else(|| {
                    TourError::malformed(format!("customer {} not found in {:?}", node, tour))
                })
        };
        let i = locate(self.a)?;
        let j = locate(self.b)?;
        let mut swapped = tour.to_vec();
        swapped.swap(i, j);
        Ok(swapped)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "swap({}, {})", self.a, self.b)
    }
}

/// Every unordered customer pair, in lexicographic order of `customers`.
pub fn swap_moves(customers: &[usize]) -> Vec<Move> {
    index_pairs(customers.len())
        .map(|(i, j)| Move::swap(customers[i], customers[j]))
        .collect()
}

/// All tours one swap away from `tour`.
///
/// Pairs of non-depot positions are visited in combination order, so the
/// result is reproducible.
pub fn neighbors(tour: &[usize]) -> Vec<Tour> {
    if tour.len() < 2 {
        return Vec::new();
    }
    let inner = tour.len() - 2;
    index_pairs(inner)
        .map(|(i, j)| {
            let mut candidate = tour.to_vec();
            candidate.swap(i + 1, j + 1);
            candidate
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinatorics::pair_count;

    #[test]
    fn test_neighborhood_size_and_shape() {
        let tour = vec![0, 4, 2, 3, 1, 0];
        let hood = neighbors(&tour);
        assert_eq!(hood.len(), pair_count(4));
        for candidate in &hood {
            assert_eq!(candidate.len(), tour.len());
            assert_eq!(candidate[0], 0);
            assert_eq!(candidate[5], 0);
            let diffs: Vec<usize> = (0..tour.len()).filter(|&k| candidate[k] != tour[k]).collect();
            assert_eq!(diffs.len(), 2);
            assert!(diffs.iter().all(|&k| k != 0 && k != tour.len() - 1));
        }
        assert_eq!(hood[0], vec![0, 2, 4, 3, 1, 0]);
        assert_eq!(hood[5], vec![0, 4, 2, 1, 3, 0]);
        assert_eq!(tour, vec![0, 4, 2, 3, 1, 0]);
    }

    #[test]
    fn test_swap_is_an_involution() {
        let tour = vec![0, 3, 1, 2, 0];
        for mv in swap_moves(&[1, 2, 3]) {
            let once = mv.try_apply(&tour).unwrap();
            assert_ne!(once, tour);
            assert_eq!(mv.try_apply(&once).unwrap(), tour);
        }
    }

    #[test]
    fn test_swap_moves_order() {
        let moves = swap_moves(&[1, 2, 3]);
        assert_eq!(moves, vec![Move::swap(1, 2), Move::swap(1, 3), Move::swap(2, 3)]);
        assert_eq!(Move::swap(3, 1).nodes(), (1, 3));
        assert_eq!(Move::swap(2, 3).to_string(), "swap(2, 3)");
    }

    #[test]
    fn test_swap_with_missing_node_fails() {
        let err = Move::swap(1, 9).try_apply(&[0, 1, 2, 0]).unwrap_err();
        assert!(matches!(err, TourError::Malformed { .. }));
        assert!(Move::swap(1, 2).try_apply(&[0, 1, 2, 0]).is_ok());
    }

    #[test]
    fn test_tiny_tours() {
        assert!(neighbors(&[0, 1, 0]).is_empty());
        assert!(neighbors(&[0]).is_empty());
    }
}
