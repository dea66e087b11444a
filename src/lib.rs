//! A multithreaded segmented wheel Sieve of Eratosthenes over arbitrary
//! 64-bit intervals.
//!
//! [`sieve`] enumerates or counts every prime in `[lo, hi]`, `hi - lo <=
//! 10^12`, by picking a wheel modulus from the interval's width (module
//! [`wheel`]), laying one packed bit-line per residue class across
//! cache-sized blocks (module [`geometry`]/[`line`]), striking small
//! sieving primes directly (module [`smallsieve`]) and deferring large ones
//! into per-block buckets (module [`bucket`]), then counting or extracting
//! each line (module [`post`]) and merging the per-class results (module
//! [`merge`]) produced by a pool of worker threads (module [`pool`]).

mod bucket;
mod context;
mod error;
mod geometry;
mod iterbits;
mod line;
mod merge;
mod pool;
mod post;
mod roots;
mod seed;
mod smallsieve;
mod tables;
mod wheel;

pub use context::{Mode, SieveResult, SoeOptions};
pub use error::SoeError;

use error::Result;
use geometry::Geometry;
use pool::SharedState;
use roots::Roots;

/// Sieve `[lo, hi]` with default options (see [`SoeOptions::default`]).
///
/// `lo <= hi`; `hi` is widened internally to a minimum 10^6-wide, block-
/// aligned interval but the returned [`SieveResult`] is clipped back to the
/// caller's original bounds. See spec.md §6 for the full interface
/// contract and §7 for the error taxonomy.
pub fn sieve(lo: u64, hi: u64, mode: Mode) -> Result<SieveResult> {
    sieve_with_options(lo, hi, mode, SoeOptions::default())
}

/// Like [`sieve`], but with explicit tuning knobs.
pub fn sieve_with_options(lo: u64, hi: u64, mode: Mode, options: SoeOptions) -> Result<SieveResult> {
    let geometry = Geometry::new(lo, hi, options.blocksize)?;

    log::debug!(
        "{mode} [{lo}, {hi}] -> [{}, {}], wheel prodN={} numclasses={}, {} threads",
        geometry.lo_prime,
        geometry.hi_prime,
        geometry.wheel.prod_n,
        geometry.wheel.numclasses,
        options.threads,
    );

    let seed_start = std::time::Instant::now();
    let bound = geometry.seed_bound();
    let sieve_p: Vec<u32> = seed::primes_up_to(bound, &options)?.into_iter().map(|p| p as u32).collect();
    if options.vflag >= 1 {
        log::info!("seed-prime generation to {bound}: {} primes in {:?}", sieve_p.len(), seed_start.elapsed());
    }

    let root_start = std::time::Instant::now();
    let roots = Roots::precompute(&sieve_p, &geometry);
    if options.vflag >= 1 {
        log::info!("root/offset precompute for {} primes in {:?}", sieve_p.len(), root_start.elapsed());
    }
    if options.vflag >= 2 {
        log::debug!(
            "bucket sieve active above index {} (p >= {})",
            options.bucket_start_index,
            sieve_p.get(options.bucket_start_index).copied().unwrap_or(0)
        );
    }

    let special_bins = options
        .special_count
        .then(|| ((geometry.orig_hi - geometry.orig_lo) / post::SPECIAL_BIN_WIDTH + 1) as usize);

    let shared = SharedState { geometry: geometry.clone(), sieve_p, roots, options: options.clone(), mode, special_bins };

    let dispatch_start = std::time::Instant::now();
    let (count, primes, special_counts) = pool::run(shared);
    if options.vflag >= 1 {
        log::info!("dispatch + merge for [{lo}, {hi}] in {:?}", dispatch_start.elapsed());
    }

    Ok(SieveResult { count, primes, effective_hi: geometry.hi_prime, special_counts })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_0_to_30() {
        let result = sieve(0, 30, Mode::Enumerate).unwrap();
        assert_eq!(result.count, 10);
        assert_eq!(result.primes.unwrap(), vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
    }

    #[test]
    fn scenario_0_to_100() {
        let result = sieve(0, 100, Mode::Enumerate).unwrap();
        assert_eq!(result.count, 25);
        assert_eq!(
            result.primes.unwrap(),
            vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97]
        );
    }

    #[test]
    fn scenario_1e6_count() {
        let result = sieve(1_000_000, 1_001_000, Mode::Count).unwrap();
        assert_eq!(result.count, 75);
    }

    #[test]
    fn single_prime_interval() {
        let result = sieve(999_983, 999_983, Mode::Enumerate).unwrap();
        assert_eq!(result.primes.unwrap(), vec![999_983]);
        assert_eq!(result.count, 1);
    }

    #[test]
    fn rejects_inverted_range() {
        assert!(matches!(sieve(100, 50, Mode::Count), Err(SoeError::InvalidRange { .. })));
    }

    #[test]
    fn rejects_too_large_hi() {
        assert!(matches!(sieve(0, crate::error::MAX_HIGHLIMIT + 1, Mode::Count), Err(SoeError::TooLarge { .. })));
    }

    #[test]
    fn count_and_enumerate_agree() {
        let counted = sieve(10_000, 20_000, Mode::Count).unwrap();
        let enumerated = sieve(10_000, 20_000, Mode::Enumerate).unwrap();
        assert_eq!(counted.count, enumerated.count);
        assert_eq!(enumerated.primes.as_ref().unwrap().len() as u64, enumerated.count);
    }

    #[test]
    fn special_count_bins_sum_to_total() {
        let options = SoeOptions { special_count: true, ..SoeOptions::default() };
        let result = sieve_with_options(0, 5_000_000, Mode::Count, options).unwrap();
        let bins = result.special_counts.unwrap();
        assert_eq!(bins.iter().sum::<u64>(), result.count);
    }
}
