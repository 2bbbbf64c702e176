// SPDX-License-Identifier: Apache-2.0
//! Logarithmically-sparse history indices for PING consistency probes.

/// Given a history length `n`, produce an increasing sequence of indices
/// `n - k` for every power of two `k <= n`, sparse near the origin and
/// dense near `n`.
pub fn snapshot_indices(n: usize) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    let mut indices = Vec::new();
    let mut k = 1usize;
    while k <= n {
        indices.push(n - k);
        k *= 2;
    }
    indices.sort_unstable();
    indices.dedup();
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_has_no_snapshots() {
        assert_eq!(snapshot_indices(0), Vec::<usize>::new());
    }

    #[test]
    fn strictly_increasing_and_in_bounds() {
        for n in [1usize, 2, 3, 5, 7, 16, 17, 100, 1000, 12345] {
            let idx = snapshot_indices(n);
            for w in idx.windows(2) {
                assert!(w[0] < w[1], "not increasing for n={n}: {idx:?}");
            }
            for &i in &idx {
                assert!(i < n, "index {i} out of bounds for n={n}");
            }
        }
    }

    #[test]
    fn cardinality_is_logarithmic() {
        let idx = snapshot_indices(1_000_000);
        assert!(idx.len() <= 32, "expected O(log n), got {}", idx.len());
    }

    #[test]
    fn small_histories_stay_dense() {
        assert_eq!(snapshot_indices(1), vec![0]);
        assert_eq!(snapshot_indices(2), vec![0, 1]);
    }
}
