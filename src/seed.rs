//! Seed-prime generator (component C1): every prime up to `sqrt(hi')`,
//! needed to strike composites out of the segmented interval sieve's lines.
//!
//! Below 10^6 this is a small self-contained mod-30 wheel sieve (the
//! teacher's `segsieve`/`segment`/`iterator`/`wheel` quartet, generalized
//! only in name). Above it, spec.md §4.3 has the generator recurse into the
//! segmented interval sieve itself with `[0, pbound]` - so the "seed" for a
//! huge interval is itself produced by running the whole machine on a much
//! smaller one.

use std::slice::from_raw_parts_mut;

use crate::context::{Mode, SoeOptions};
use crate::error::Result;
use crate::iterbits::{BitPopulationIter, MODULUS};
use crate::wheel::Wheel30;

const SEGMENT_LEN: usize = 32_768;
const SEGMENT_SIZE: u64 = MODULUS * SEGMENT_LEN as u64;

/// Largest bound for which the tiny mod-30 sieve is used directly; above
/// this, [`primes_up_to`] recurses into the full segmented sieve. Matches
/// spec.md §4.3's `pbound <= 10^6` base case, which yields at most 78498
/// primes.
pub const TINY_SIEVE_LIMIT: u64 = 1_000_000;

/// Every prime `p <= bound`, ascending. Used to seed the segmented interval
/// sieve's small-prime and bucket-sieve passes with striking primes up to
/// `sqrt(hi')`.
pub fn primes_up_to(bound: u64, options: &SoeOptions) -> Result<Vec<u64>> {
    if bound <= TINY_SIEVE_LIMIT {
        return Ok(tiny_sieve(bound));
    }

    log::info!("seed: recursing into full sieve for bound {bound}");
    let result = crate::sieve_with_options(0, bound, Mode::Enumerate, options.clone())?;
    Ok(result.primes.unwrap_or_default())
}

/// A compact mod-30 wheel sieve of every prime up to `limit`, inclusive of
/// 2, 3 and 5. Mirrors the teacher's `Sieve::to_limit` machinery, generalized
/// only to return a flat `Vec<u64>` instead of a queryable structure.
fn tiny_sieve(limit: u64) -> Vec<u64> {
    if limit < 2 {
        return Vec::new();
    }

    let words = segmented_sieve(limit);
    let mut primes = Vec::with_capacity((limit as f64 / (limit as f64).ln().max(1.0) * 1.2) as usize + 8);
    if limit >= 2 {
        primes.push(2);
    }
    if limit >= 3 {
        primes.push(3);
    }
    if limit >= 5 {
        primes.push(5);
    }
    primes.extend(BitPopulationIter::new(&words).take_while(|&p| p <= limit));
    primes
}

/// Returns a sequence of `u64`s encoding the primes up to the square root of
/// the given limit, excluding 2, 3 and 5.
fn small_primes(limit: u64) -> Vec<u64> {
    let sqrt = (limit as f64).sqrt() as u64;
    let mut sieve = vec![!0u64; (sqrt / MODULUS + 1) as usize];
    let small_limit = MODULUS * sieve.len() as u64;

    // Position 0 of word 0 represents 1, not a prime; clear it up front so
    // the iterator below never offers it as a striking prime.
    sieve[0] &= !1u64;

    // SAFETY: `sieve_mut` and the iterator alias the same backing storage,
    // but the loop only ever writes to positions strictly ahead of the
    // iterator's current read cursor (future multiples of the current
    // prime), so the two views never observe each other's in-flight writes.
    unsafe {
        let sieve_mut = from_raw_parts_mut(sieve.as_mut_ptr(), sieve.len());
        let iter = BitPopulationIter::new(&sieve);
        for prime in iter {
            let mut wheel = Wheel30::new(prime, prime);
            let mut multiple = prime * prime;
            if multiple >= small_limit {
                break;
            }
            while multiple < small_limit {
                clear_bit(sieve_mut, multiple);
                multiple += wheel.next_diff();
            }
        }
    }

    sieve
}

/// Sieve every prime up to `limit` using a segmented mod-30 wheel sieve.
/// Returns the packed `u64` word array; decode with [`BitPopulationIter`].
fn segmented_sieve(limit: u64) -> Vec<u64> {
    let lim = limit + MODULUS - (limit % MODULUS);
    let small = small_primes(lim);
    let mut small_iter = BitPopulationIter::new(&small);

    let mut segment = vec![!0u64; SEGMENT_LEN];
    segment[0] &= !1u64;
    let mut segments = Vec::with_capacity((lim / MODULUS) as usize);

    let mut next_indices: Vec<(u64, Wheel30)> = Vec::new();

    let mut low = 0u64;
    while low <= lim {
        let high = std::cmp::min(low + SEGMENT_SIZE, lim);
        let segment_size = high - low;

        while let Some(prime) = small_iter.next() {
            next_indices.push((prime * prime - low, Wheel30::new(prime, prime)));
            if prime * prime >= high {
                break;
            }
        }

        for (index, wheel) in &mut next_indices {
            while *index < segment_size {
                clear_bit(&mut segment, *index);
                *index += wheel.next_diff();
            }
            *index -= segment_size;
        }

        segments.extend_from_slice(if segment_size < SEGMENT_SIZE {
            &segment[..(segment_size / MODULUS) as usize]
        } else {
            &segment
        });

        low += SEGMENT_SIZE;
        segment = vec![!0u64; SEGMENT_LEN];
    }

    segments
}

#[inline]
fn clear_bit(words: &mut [u64], idx: u64) {
    if let Some(bit) = mod30_bit(idx % MODULUS) {
        let word = (idx / MODULUS) as usize;
        words[word] &= !(1u64 << bit);
    }
}

/// For `r` in `0..240`, returns the bit (0..64) representing `r` in one
/// packed word, or `None` if `r` is not a mod-30-wheel residue (i.e. shares
/// a factor with 30).
#[inline]
const fn mod30_bit(r: u64) -> Option<u64> {
    let group = r / 30;
    let rem = r % 30;
    let local = match rem {
        1 => 0,
        7 => 1,
        11 => 2,
        13 => 3,
        17 => 4,
        19 => 5,
        23 => 6,
        29 => 7,
        _ => return None,
    };
    Some(group * 8 + local)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiny_sieve_matches_known_primes() {
        assert_eq!(
            tiny_sieve(100),
            vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97]
        );
    }

    #[test]
    fn tiny_sieve_empty_below_two() {
        assert_eq!(tiny_sieve(0), Vec::<u64>::new());
        assert_eq!(tiny_sieve(1), Vec::<u64>::new());
    }

    #[test]
    fn tiny_sieve_count_up_to_1e6() {
        let primes = tiny_sieve(1_000_000);
        assert_eq!(primes.len(), 78498);
        assert_eq!(*primes.last().unwrap(), 999983);
    }

    #[test]
    fn small_primes_to_sqrt_of_1e6() {
        let sieve = small_primes(1_000_000);
        let primes: Vec<u64> = BitPopulationIter::new(&sieve).collect();
        assert_eq!(primes[..10], [7, 11, 13, 17, 19, 23, 29, 31, 37, 41]);
    }
}
