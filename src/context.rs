//! Explicit, caller-supplied configuration.
//!
//! The original C core communicated its tuning knobs (`VFLAG`, `THREADS`,
//! `BUCKETSTARTI`, the `DO_SPECIAL_COUNT`/`DO_LARGE_BUCKETS` compile-time
//! switches) through process-wide globals. Here they're just fields on a
//! plain struct threaded through the worker pool - see DESIGN.md for the
//! rationale.

/// Which of the two command codes the original dispatch loop could hand to
/// a worker: `SOE_COMMAND_SIEVE_AND_COUNT` or `SOE_COMMAND_SIEVE_AND_COMPUTE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Only a popcount of surviving flags is needed.
    Count,
    /// An ascending list of primes is needed.
    Enumerate,
}

/// Tuning knobs recognized by [`crate::sieve`].
#[derive(Debug, Clone)]
pub struct SoeOptions {
    /// Number of worker threads. The last member of each dispatch batch
    /// always runs inline on the calling thread.
    pub threads: usize,
    /// Bytes per sieving block; should fit comfortably in L1 data cache.
    /// Must be a power of two.
    pub blocksize: usize,
    /// Index into the sieving-prime array above which the bucket sieve
    /// takes over from the small-prime block sieve.
    pub bucket_start_index: usize,
    /// Verbosity, 0..=3. Purely observational - routed to the `log` crate.
    pub vflag: u8,
    /// Bin counts into 10^9-wide windows in [`Mode::Count`] mode.
    pub special_count: bool,
    /// Enable the large-prime bucket tier (primes that hit a line's blocks
    /// at most once apiece).
    pub large_buckets: bool,
}

impl Default for SoeOptions {
    fn default() -> Self {
        SoeOptions {
            threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            blocksize: 32_768,
            bucket_start_index: 1_024,
            vflag: 0,
            special_count: false,
            large_buckets: true,
        }
    }
}

/// The result of a call to [`crate::sieve`].
#[derive(Debug, Clone, Default)]
pub struct SieveResult {
    /// Number of primes in the caller's original `[lo, hi]`.
    pub count: u64,
    /// Ascending list of primes in `[lo, hi]`, present only in
    /// [`Mode::Enumerate`].
    pub primes: Option<Vec<u64>>,
    /// The (possibly widened) upper bound actually sieved internally.
    /// `count`/`primes` are already clipped back to the caller's `hi`.
    pub effective_hi: u64,
    /// 10^9-wide count bins, present only when `SoeOptions::special_count`
    /// was set.
    pub special_counts: Option<Vec<u64>>,
}
