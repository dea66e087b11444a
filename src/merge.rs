//! Merger (component C9): combines each worker's per-class result into the
//! caller-facing total.
//!
//! Within a dispatch batch every class's line is sieved independently and
//! disjointly (spec.md §5 "Ordering guarantees"), so the merge step never
//! needs to synchronize anything beyond the plain data combination below:
//! sum counts, sum special-count bins elementwise, and two-pointer merge
//! ascending prime lists. The final step folds in every sieving prime in
//! `[lo, hi]`, none of which ever survives as a flag in its own class's line
//! (spec.md §4.7/§4.9; see `post::seed_primes_in_range` for why).

use crate::context::Mode;
use crate::post;

/// One worker's output for one residue class, already clipped to the
/// caller's original `[lo, hi]`.
pub struct ClassResult {
    pub count: u64,
    pub primes: Option<Vec<u64>>,
    pub special_counts: Option<Vec<u64>>,
}

/// Accumulates [`ClassResult`]s across every residue class into the final
/// count / ascending prime list / special-count bins.
pub struct Merger {
    mode: Mode,
    total_count: u64,
    primes: Option<Vec<u64>>,
    special_counts: Option<Vec<u64>>,
}

impl Merger {
    pub fn new(mode: Mode, num_special_bins: Option<usize>) -> Merger {
        Merger {
            mode,
            total_count: 0,
            primes: match mode {
                Mode::Enumerate => Some(Vec::new()),
                Mode::Count => None,
            },
            special_counts: num_special_bins.map(|n| vec![0u64; n]),
        }
    }

    /// Fold in one class's result. Called by the dispatcher between
    /// batches; never touched by a worker thread.
    pub fn absorb(&mut self, result: ClassResult) {
        self.total_count += result.count;

        if let (Some(bins), Some(new_bins)) = (self.special_counts.as_mut(), result.special_counts) {
            for (acc, n) in bins.iter_mut().zip(new_bins) {
                *acc += n;
            }
        }

        if let (Some(acc), Some(new_primes)) = (self.primes.as_mut(), result.primes) {
            *acc = merge_sorted(acc, &new_primes);
        }

        debug_assert!(
            matches!(self.mode, Mode::Enumerate) == self.primes.is_some(),
            "mode/accumulator mismatch"
        );
    }

    /// Fold in every sieving prime in `[orig_lo, orig_hi]` - none of them
    /// survive as a flag in their own class's line, whether they divide
    /// `prod_n` or were struck by their own first-hit - then return the
    /// final `(count, primes, special_counts)`.
    pub fn finish(mut self, sieve_p: &[u32], orig_lo: u64, orig_hi: u64) -> (u64, Option<Vec<u64>>, Option<Vec<u64>>) {
        let excluded = post::seed_primes_in_range(sieve_p, orig_lo, orig_hi);
        self.total_count += excluded.len() as u64;
        if let Some(bins) = self.special_counts.as_mut() {
            for &p in &excluded {
                let bin = ((p - orig_lo) / post::SPECIAL_BIN_WIDTH) as usize;
                bins[bin.min(bins.len() - 1)] += 1;
            }
        }
        if let Some(acc) = self.primes.as_mut() {
            *acc = merge_sorted(acc, &excluded);
        }
        (self.total_count, self.primes, self.special_counts)
    }
}

/// Standard two-pointer ascending merge (spec.md §4.9).
fn merge_sorted(a: &[u64], b: &[u64]) -> Vec<u64> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0usize, 0usize);
    while i < a.len() && j < b.len() {
        if a[i] <= b[j] {
            out.push(a[i]);
            i += 1;
        } else {
            out.push(b[j]);
            j += 1;
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_sorted_interleaves() {
        assert_eq!(merge_sorted(&[1, 3, 5], &[2, 4, 6]), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(merge_sorted(&[], &[1, 2]), vec![1, 2]);
        assert_eq!(merge_sorted(&[1, 2], &[]), vec![1, 2]);
    }

    #[test]
    fn merger_sums_counts_and_merges_primes() {
        let mut m = Merger::new(Mode::Enumerate, None);
        m.absorb(ClassResult { count: 2, primes: Some(vec![7, 19]), special_counts: None });
        m.absorb(ClassResult { count: 1, primes: Some(vec![13]), special_counts: None });
        let (count, primes, _) = m.finish(&[2, 3, 5], 0, 30);
        // excluded primes 2,3,5 fold in, plus the two absorbed results.
        assert_eq!(count, 5);
        assert_eq!(primes.unwrap(), vec![2, 3, 5, 7, 13, 19]);
    }

    #[test]
    fn merger_count_mode_sums_special_bins() {
        let mut m = Merger::new(Mode::Count, Some(3));
        m.absorb(ClassResult { count: 10, primes: None, special_counts: Some(vec![4, 3, 3]) });
        m.absorb(ClassResult { count: 5, primes: None, special_counts: Some(vec![1, 2, 2]) });
        let (count, primes, bins) = m.finish(&[2, 3, 5], 100, 200);
        assert_eq!(count, 15);
        assert!(primes.is_none());
        assert_eq!(bins.unwrap(), vec![5, 5, 5]);
    }

    #[test]
    fn seed_primes_in_range_land_in_special_bins() {
        // 2, 3 and 5 are never flagged on any line (2,3 divide prod_n; 5 is
        // struck as its own first hit), so finish() must still fold them
        // into the right bin, not just into the plain count, or bins.sum()
        // would undercount the total.
        let mut m = Merger::new(Mode::Count, Some(1));
        m.absorb(ClassResult { count: 10, primes: None, special_counts: Some(vec![10]) });
        let (count, _, bins) = m.finish(&[2, 3, 5], 0, 5_000_000);
        assert_eq!(count, 13);
        let bins = bins.unwrap();
        assert_eq!(bins.iter().sum::<u64>(), count);
    }
}
