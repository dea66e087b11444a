//! Bucket sieve (component C6): per-block deferred-hit queues for primes
//! promoted out of [`crate::smallsieve`].
//!
//! Two tiers, distinguished by how many blocks a prime's stride can still
//! touch on this line:
//!
//! - *Small bucket*: the prime's stride (`p * prod_n`) is smaller than the
//!   whole line's span, so it strikes more than once and must be requeued
//!   into a later block after each hit.
//! - *Large bucket*: the stride already exceeds the line's span, so the
//!   prime hits at most once total; no requeue is needed.
//!
//! Both tiers share one entry encoding (`block_local offset + sieve_p
//! index`), unlike the teacher's packed 32-bit rotor encoding - this
//! repository's lines use a closed-form constant stride per prime (see
//! [`crate::roots`]) rather than a residue-difference table, so there is no
//! rotor index to carry.

use crate::line::clear_bit;
use crate::roots::{first_hit, Roots};

#[derive(Clone, Copy)]
struct Entry {
    offset: u32,
    prime_idx: u32,
}

/// Per-block write-arenas for one residue-class line, covering every prime
/// promoted out of the small sieve.
pub struct Buckets {
    flags_per_block: u64,
    blocks: u64,
    small: Vec<Vec<Entry>>,
    large: Vec<Vec<Entry>>,
    scratch: Vec<Entry>,
}

impl Buckets {
    /// Allocate empty per-block queues. `small_cap_hint`/`large_cap_hint` are
    /// the average number of entries expected per block for each tier. Per
    /// spec, preallocation should carry a 10% margin over the average and
    /// clamp the large tier to a 50000-entry floor - see
    /// [`crate::context::SoeOptions`] for where those estimates are derived.
    pub fn new(blocks: u64, flags_per_block: u64, small_cap_hint: usize, large_cap_hint: usize) -> Buckets {
        Buckets {
            flags_per_block,
            blocks,
            small: (0..blocks).map(|_| Vec::with_capacity(small_cap_hint)).collect(),
            large: (0..blocks).map(|_| Vec::with_capacity(large_cap_hint)).collect(),
            scratch: Vec::new(),
        }
    }

    /// Seed pass (spec.md §4.6 step 1): compute every promoted prime's first
    /// hit on this line and push it into the block that will strike it.
    /// `line_span` is the whole line's width in real numbers
    /// (`blk_r * blocks`), used to classify small vs large tier.
    pub fn seed(
        &mut self,
        sieve_p: &[u32],
        roots: &Roots,
        promoted: &[u32],
        prod_n: u64,
        line_span: u64,
        residue: u32,
    ) {
        let flagsize = self.blocks * self.flags_per_block;

        for &i in promoted {
            let idx = i as usize;
            let p = sieve_p[idx] as u64;
            let k0 = first_hit(p, roots.root[idx], roots.lower_mod_prime[idx], residue);
            if k0 >= flagsize {
                continue;
            }

            let block = (k0 / self.flags_per_block) as usize;
            let entry = Entry { offset: (k0 % self.flags_per_block) as u32, prime_idx: i };

            if p * prod_n > line_span {
                self.large[block].push(entry);
            } else {
                self.small[block].push(entry);
            }
        }
    }

    /// Drain both tiers' queues for block `b`: clear every enqueued bit,
    /// and requeue each small-tier entry into whichever later block its next
    /// hit falls in (dropped if it falls past the end of the line).
    pub fn drain_block(&mut self, line: &mut [u8], block: usize, sieve_p: &[u32]) {
        Self::drain_tier(
            &mut self.small,
            &mut self.scratch,
            line,
            block,
            sieve_p,
            self.flags_per_block,
            self.blocks,
        );
        Self::drain_tier(
            &mut self.large,
            &mut self.scratch,
            line,
            block,
            sieve_p,
            self.flags_per_block,
            self.blocks,
        );
    }

    fn drain_tier(
        tier: &mut [Vec<Entry>],
        scratch: &mut Vec<Entry>,
        line: &mut [u8],
        block: usize,
        sieve_p: &[u32],
        flags_per_block: u64,
        blocks: u64,
    ) {
        scratch.clear();
        scratch.extend(tier[block].drain(..));

        for entry in scratch.iter() {
            let abs = block as u64 * flags_per_block + entry.offset as u64;
            clear_bit(line, abs);

            let p = sieve_p[entry.prime_idx as usize] as u64;
            let next_abs = abs + p;
            let next_block = next_abs / flags_per_block;
            if next_block < blocks {
                tier[next_block as usize].push(Entry {
                    offset: (next_abs % flags_per_block) as u32,
                    prime_idx: entry.prime_idx,
                });
            }
        }
    }

    /// Clears every per-block queue without shrinking their capacity, so a
    /// worker can reuse one `Buckets` allocation across residue classes
    /// (spec.md §3 "Lifecycles"). A full `drain_block` pass already empties
    /// every queue, so this only needs to handle a class that was never
    /// fully drained (e.g. after a prior run's `assert_drained` panic in a
    /// debug build, or before the very first `seed`).
    pub fn reset(&mut self) {
        for q in self.small.iter_mut() {
            q.clear();
        }
        for q in self.large.iter_mut() {
            q.clear();
        }
    }

    /// Asserts every queue is empty, i.e. no prime's hits ran past the end
    /// of the line without being fully drained. A non-empty queue here is
    /// the fatal invariant violation spec.md §7 describes.
    pub fn assert_drained(&self) {
        for (b, q) in self.small.iter().enumerate() {
            assert!(q.is_empty(), "small bucket {b} not drained: {} entries remain", q.len());
        }
        for (b, q) in self.large.iter().enumerate() {
            assert!(q.is_empty(), "large bucket {b} not drained: {} entries remain", q.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;
    use crate::line::{get_bit, new_line};

    #[test]
    fn bucket_sieve_matches_brute_force_striking() {
        // Force a narrow line so even modest seed primes exceed the
        // small-sieve's geometric threshold and land in the bucket tiers.
        let geometry = Geometry::new(0, 1_000_000, 256).unwrap();
        let sieve_p: Vec<u32> = (2u32..2000).filter(|&n| (2..n).all(|d| n % d != 0 || d * d > n)).collect();
        let roots = Roots::precompute(&sieve_p, &geometry);

        let prod_n = geometry.wheel.prod_n;
        let startprime = geometry.wheel.startprime;
        let residue = geometry.wheel.rclass[0];
        let line_span = geometry.blk_r * geometry.blocks;
        let flags_per_block = geometry.blk_r / prod_n;

        let mut expected = new_line(geometry.numlinebytes as usize);
        let flagsize = expected.len() as u64 * 8;
        for i in startprime..sieve_p.len() {
            let p = sieve_p[i] as u64;
            let mut k = first_hit(p, roots.root[i], roots.lower_mod_prime[i], residue);
            while k < flagsize {
                crate::line::clear_bit(&mut expected, k);
                k += p;
            }
        }

        let mut actual = new_line(geometry.numlinebytes as usize);
        let promoted: Vec<u32> = (startprime as u32..sieve_p.len() as u32).collect();
        let mut buckets = Buckets::new(geometry.blocks, flags_per_block, 64, 64);
        buckets.seed(&sieve_p, &roots, &promoted, prod_n, line_span, residue);
        for b in 0..geometry.blocks as usize {
            buckets.drain_block(&mut actual, b, &sieve_p);
        }
        buckets.assert_drained();

        for k in 0..flagsize {
            assert_eq!(get_bit(&expected, k), get_bit(&actual, k), "mismatch at flag {k}");
        }
    }
}
