//! Small-prime striking (component C5): for one residue-class line, clear
//! every flag a "small" sieving prime divides.
//!
//! The primary split between this and [`crate::bucket`] is the index
//! threshold `bucket_start_index`. A secondary geometric test can promote a
//! prime early: if its stride in real-number terms (`p * prod_n`) already
//! approaches the whole line's span, block-by-block striking degenerates to
//! at most a handful of hits total and the bucket sieve's per-block queues
//! are the better fit - this matters most for narrow intervals, where the
//! line span itself is small relative to the seed primes needed. Per
//! spec, when the two tests disagree the geometric one wins.
use crate::line::clear_bit;
use crate::roots::{first_hit, Roots};

/// A prime promotes out of the small sieve once `p * prod_n * SMALL_SAFETY_FACTOR`
/// exceeds the whole line's span (`blk_r * blocks`); chosen as a conservative
/// margin so the small sieve only ever runs on primes that reliably hit
/// every block many times over.
const SMALL_SAFETY_FACTOR: u64 = 10;

/// Strike every small prime's multiples out of `line`, returning the indices
/// (into the shared `sieve_p`/`roots` arrays) of primes that should instead
/// be handled by the bucket sieve for this class.
///
/// `line` must hold `numlinebytes` bytes, i.e. `numlinebytes * 8` flags; flag
/// `k` represents the integer `lo' + k * prod_n + residue`.
pub fn strike(
    line: &mut [u8],
    sieve_p: &[u32],
    roots: &Roots,
    startprime: usize,
    bucket_start_index: usize,
    prod_n: u64,
    blk_r: u64,
    blocks: u64,
    residue: u32,
) -> Vec<u32> {
    let flagsize = (line.len() as u64) * 8;
    let line_span = blk_r * blocks;
    let mut promoted = Vec::new();

    for i in startprime..sieve_p.len() {
        let p = sieve_p[i] as u64;

        if i >= bucket_start_index || p * prod_n * SMALL_SAFETY_FACTOR > line_span {
            promoted.push(i as u32);
            continue;
        }

        let mut k = first_hit(p, roots.root[i], roots.lower_mod_prime[i], residue);
        while k < flagsize {
            clear_bit(line, k);
            k += p;
        }
    }

    promoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;
    use crate::line::{get_bit, new_line};

    #[test]
    fn strikes_out_known_composites() {
        // Wheel mod 6, residue 1: flags represent 1, 7, 13, 19, 25, ...
        // Sieving prime 5 should clear the flag for 25.
        let geometry = Geometry::new(0, 1_000_000, 32_768).unwrap();
        let sieve_p = [2u32, 3, 5, 7, 11, 13];
        let roots = Roots::precompute(&sieve_p, &geometry);

        let mut line = new_line(32_768);
        let promoted = strike(
            &mut line,
            &sieve_p,
            &roots,
            geometry.wheel.startprime,
            1024,
            geometry.wheel.prod_n,
            geometry.blk_r,
            geometry.blocks,
            1,
        );
        assert!(promoted.is_empty());

        // flag k represents lo' + k*prod_n + 1 == k*prod_n + 1 (lo'=0 here).
        let prod_n = geometry.wheel.prod_n;
        for k in 0..200u64 {
            let n = k * prod_n + 1;
            let is_prime_ish = n < 2 || (2..n).all(|d| n % d != 0 || d * d > n);
            if n >= 2 && is_composite_by_small_primes(n, &sieve_p) {
                assert!(!get_bit(&line, k), "expected {n} (flag {k}) struck");
            } else {
                let _ = is_prime_ish;
            }
        }
    }

    fn is_composite_by_small_primes(n: u64, sieve_p: &[u32]) -> bool {
        sieve_p.iter().any(|&p| {
            let p = p as u64;
            p * p <= n && n % p == 0
        })
    }

    #[test]
    fn promotes_primes_past_bucket_start_index() {
        let geometry = Geometry::new(0, 1_000_000, 32_768).unwrap();
        let sieve_p = [2u32, 3, 5, 7, 11, 13];
        let roots = Roots::precompute(&sieve_p, &geometry);
        let mut line = new_line(32_768);

        let promoted = strike(
            &mut line,
            &sieve_p,
            &roots,
            geometry.wheel.startprime,
            2, // bucket_start_index: only the first two sieve_p entries stay small
            geometry.wheel.prod_n,
            geometry.blk_r,
            geometry.blocks,
            1,
        );
        // startprime is 2 for mod-6 wheel (2, 3 divide prod_n), so index 2 (p=5)
        // onward: index 2 < bucket_start_index(2)? no, 2 >= 2, so all of
        // {5,7,11,13} are promoted.
        assert_eq!(promoted, vec![2, 3, 4, 5]);
    }
}
