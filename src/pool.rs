//! Worker pool (component C8): `options.threads` long-lived OS threads,
//! each handed one residue class at a time in batches, synchronized with a
//! run-lock/run-condition/finish-event per worker exactly as spec.md §4.8
//! describes (and as the reference C core implements with
//! `pthread_cond_t run_cond` / `pthread_mutex_t run_lock`, see
//! `original_source/trunk/eratosthenes/soe.c` around its `pthread_cond_wait`
//! dispatch loop). The last member of each batch runs inline on the
//! dispatcher's own thread instead of being handed to a worker, saving one
//! context handoff - spec.md's "master thread is thread N-1".

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crate::bucket::Buckets;
use crate::context::{Mode, SoeOptions};
use crate::geometry::Geometry;
use crate::line;
use crate::merge::{ClassResult, Merger};
use crate::post;
use crate::roots::Roots;
use crate::smallsieve;

/// Read-only state shared by every worker for the lifetime of one `sieve()`
/// call. Built once by the dispatcher before any thread is spawned; never
/// mutated afterwards (spec.md §5 "Shared resources").
pub struct SharedState {
    pub geometry: Geometry,
    pub sieve_p: Vec<u32>,
    pub roots: Roots,
    pub options: SoeOptions,
    pub mode: Mode,
    pub special_bins: Option<usize>,
}

impl SharedState {
    /// Sieve one residue class end to end (C5 + C6 + C7): strike small
    /// primes, seed and drain the bucket tiers block by block, then count
    /// or extract, clipped to the caller's original interval.
    fn sieve_class(&self, class: usize, scratch: &mut ClassScratch) -> ClassResult {
        let wheel = &self.geometry.wheel;
        let residue = wheel.rclass[class];
        let prod_n = wheel.prod_n;
        let blk_r = self.geometry.blk_r;
        let blocks = self.geometry.blocks;
        let flags_per_block = blk_r / prod_n;
        let line_span = blk_r * blocks;

        scratch.line.iter_mut().for_each(|b| *b = 0xFF);
        scratch.buckets.reset();

        // The residue-1 class's first flag represents lo' + 1, which is the
        // integer 1 whenever lo' == 0. No striking prime ever clears it, so
        // it must be cleared here, same as the tiny sieve's `sieve[0] &= !1u64`
        // (see `seed::tiny_sieve`).
        if self.geometry.lo_prime == 0 && residue == 1 {
            line::clear_bit(&mut scratch.line, 0);
        }

        let promoted = smallsieve::strike(
            &mut scratch.line,
            &self.sieve_p,
            &self.roots,
            wheel.startprime,
            self.options.bucket_start_index,
            prod_n,
            blk_r,
            blocks,
            residue,
        );

        scratch.buckets.seed(&self.sieve_p, &self.roots, &promoted, prod_n, line_span, residue);

        for b in 0..blocks as usize {
            scratch.buckets.drain_block(&mut scratch.line, b, &self.sieve_p);
        }
        scratch.buckets.assert_drained();

        match self.mode {
            Mode::Count => {
                let count = post::popcount_in_range(
                    &scratch.line,
                    self.geometry.lo_prime,
                    prod_n,
                    residue,
                    self.geometry.orig_lo,
                    self.geometry.orig_hi,
                );
                let special_counts = self.special_bins.map(|_| {
                    post::special_bins(
                        &scratch.line,
                        self.geometry.lo_prime,
                        prod_n,
                        residue,
                        self.geometry.orig_lo,
                        self.geometry.orig_hi,
                    )
                });
                ClassResult { count, primes: None, special_counts }
            }
            Mode::Enumerate => {
                let mut out = Vec::new();
                post::extract_in_range(
                    &scratch.line,
                    self.geometry.lo_prime,
                    prod_n,
                    residue,
                    self.geometry.orig_lo,
                    self.geometry.orig_hi,
                    &mut out,
                );
                let count = out.len() as u64;
                ClassResult { count, primes: Some(out), special_counts: None }
            }
        }
    }
}

/// Per-worker scratch state: one line, reused across classes, and the
/// per-block bucket queues, reset (not reallocated) between classes
/// (spec.md §3 "Lifecycles").
struct ClassScratch {
    line: Vec<u8>,
    buckets: Buckets,
}

impl ClassScratch {
    fn new(shared: &SharedState) -> ClassScratch {
        let (small_hint, large_hint) = bucket_capacity_hints(shared);
        let flags_per_block = shared.geometry.blk_r / shared.geometry.wheel.prod_n;
        ClassScratch {
            line: line::new_line(shared.geometry.numlinebytes as usize),
            buckets: Buckets::new(shared.geometry.blocks, flags_per_block, small_hint, large_hint),
        }
    }
}

/// Average expected hits per block for the small and large bucket tiers,
/// with a 10% margin - ported from `original_source/trunk/eratosthenes/soe.c`
/// lines 330-378 ("assume hits are evenly distributed among buckets ...
/// add some margin"). Unlike that C core's fixed-size arrays, this crate's
/// buckets are plain `Vec`s that grow on demand, so under-estimating here
/// costs a reallocation, not the overflow spec.md §7 calls a bug - these
/// hints only avoid the common case of repeated small growths.
fn bucket_capacity_hints(shared: &SharedState) -> (usize, usize) {
    let wheel = &shared.geometry.wheel;
    let bucket_start = shared.options.bucket_start_index.min(shared.sieve_p.len());
    let blocks = shared.geometry.blocks.max(1);
    let prod_n = wheel.prod_n;
    let line_span = shared.geometry.blk_r * shared.geometry.blocks;
    let flags_per_line = shared.geometry.numlinebytes * 8;

    let mut small_hits = 0u64;
    let mut large_start = shared.sieve_p.len();
    for (i, &p) in shared.sieve_p.iter().enumerate().skip(bucket_start) {
        if (p as u64) * prod_n > line_span {
            large_start = i;
            break;
        }
        small_hits += flags_per_line / p as u64 + 1;
    }
    let small_hint = ((small_hits / blocks) as f64 * 1.10) as usize + 8;

    let large_count = shared.sieve_p.len().saturating_sub(large_start) as u64;
    let large_hint = if large_count > 0 {
        let avg = ((large_count / blocks) as f64 * 1.10) as usize;
        avg.max(50_000).min(large_count as usize + 64)
    } else {
        0
    };

    (small_hint.max(8), large_hint)
}

enum Command {
    Run(usize),
    Shutdown,
}

/// One persistent worker's synchronization handles: a run-lock/run-condition
/// pair the dispatcher uses to hand over the next class, and a
/// result-lock/result-condition pair (the "finish event") the dispatcher
/// waits on to collect that class's output.
struct Worker {
    command: Mutex<Option<Command>>,
    command_ready: Condvar,
    result: Mutex<Option<ClassResult>>,
    result_ready: Condvar,
}

impl Worker {
    fn new() -> Worker {
        Worker {
            command: Mutex::new(None),
            command_ready: Condvar::new(),
            result: Mutex::new(None),
            result_ready: Condvar::new(),
        }
    }

    fn dispatch(&self, class: usize) {
        let mut guard = self.command.lock().unwrap();
        *guard = Some(Command::Run(class));
        self.command_ready.notify_one();
    }

    fn shutdown(&self) {
        let mut guard = self.command.lock().unwrap();
        *guard = Some(Command::Shutdown);
        self.command_ready.notify_one();
    }

    fn take_result(&self) -> ClassResult {
        let mut guard = self.result.lock().unwrap();
        while guard.is_none() {
            guard = self.result_ready.wait(guard).unwrap();
        }
        guard.take().unwrap()
    }

    fn run_loop(&self, shared: &Arc<SharedState>) {
        let mut scratch = ClassScratch::new(shared);
        loop {
            let command = {
                let mut guard = self.command.lock().unwrap();
                while guard.is_none() {
                    guard = self.command_ready.wait(guard).unwrap();
                }
                guard.take().unwrap()
            };
            match command {
                Command::Shutdown => return,
                Command::Run(class) => {
                    let result = shared.sieve_class(class, &mut scratch);
                    let mut guard = self.result.lock().unwrap();
                    *guard = Some(result);
                    self.result_ready.notify_one();
                }
            }
        }
    }
}

/// Dispatches `numclasses` residue classes across `options.threads` workers
/// in batches, merging each batch's results as it completes.
pub fn run(shared: SharedState) -> (u64, Option<Vec<u64>>, Option<Vec<u64>>) {
    let numclasses = shared.geometry.wheel.numclasses as usize;
    let threads = shared.options.threads.max(1).min(numclasses.max(1));
    let sieve_p = shared.sieve_p.clone();
    let orig_lo = shared.geometry.orig_lo;
    let orig_hi = shared.geometry.orig_hi;
    let mode = shared.mode;
    let special_bins = shared.special_bins;

    let shared = Arc::new(shared);
    let mut merger = Merger::new(mode, special_bins);

    if threads <= 1 {
        let mut scratch = ClassScratch::new(&shared);
        for class in 0..numclasses {
            merger.absorb(shared.sieve_class(class, &mut scratch));
        }
        return merger.finish(&sieve_p, orig_lo, orig_hi);
    }

    // threads - 1 persistent background workers; the dispatcher itself
    // plays the role of the last ("inline") worker in every batch.
    let workers: Vec<Arc<Worker>> = (0..threads - 1).map(|_| Arc::new(Worker::new())).collect();
    let handles: Vec<JoinHandle<()>> = workers
        .iter()
        .map(|w| {
            let w = Arc::clone(w);
            let shared = Arc::clone(&shared);
            thread::spawn(move || w.run_loop(&shared))
        })
        .collect();

    let mut inline_scratch = ClassScratch::new(&shared);
    let classes: Vec<usize> = (0..numclasses).collect();
    for batch in classes.chunks(threads) {
        let (dispatched, inline) = batch.split_at(batch.len() - 1);

        for (worker, &class) in workers.iter().zip(dispatched) {
            worker.dispatch(class);
        }

        let inline_result = shared.sieve_class(inline[0], &mut inline_scratch);

        for (worker, _) in workers.iter().zip(dispatched) {
            merger.absorb(worker.take_result());
        }
        merger.absorb(inline_result);
    }

    for worker in &workers {
        worker.shutdown();
    }
    for handle in handles {
        handle.join().expect("sieve worker thread panicked");
    }

    merger.finish(&sieve_p, orig_lo, orig_hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SoeOptions;
    use crate::geometry::Geometry;
    use crate::seed;

    fn build_shared(lo: u64, hi: u64, mode: Mode, threads: usize) -> SharedState {
        let options = SoeOptions { threads, ..SoeOptions::default() };
        let geometry = Geometry::new(lo, hi, options.blocksize).unwrap();
        let bound = geometry.seed_bound();
        let sieve_p: Vec<u32> = seed::primes_up_to(bound, &options).unwrap().into_iter().map(|p| p as u32).collect();
        let roots = Roots::precompute(&sieve_p, &geometry);
        SharedState { geometry, sieve_p, roots, options, mode, special_bins: None }
    }

    #[test]
    fn single_thread_matches_multi_thread_count() {
        let single = build_shared(0, 100_000, Mode::Count, 1);
        let (c1, _, _) = run(single);
        let multi = build_shared(0, 100_000, Mode::Count, 4);
        let (c2, _, _) = run(multi);
        assert_eq!(c1, c2);
    }

    #[test]
    fn enumerate_small_range_matches_known_primes() {
        let shared = build_shared(0, 100, Mode::Enumerate, 2);
        let (count, primes, _) = run(shared);
        assert_eq!(count, 25);
        assert_eq!(
            primes.unwrap(),
            vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97]
        );
    }
}
