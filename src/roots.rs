//! Root/offset precompute (component C4).
//!
//! For every sieving prime `p` at or above the wheel's `startprime`, this
//! computes `root[i] = prod_n^-1 mod p` via the extended Euclidean
//! algorithm, plus `lower_mod_prime[i] = (lo' / prod_n) mod p`. Together
//! these give an O(1) closed form for the first flag a prime strikes in any
//! residue-class line - see [`first_hit`].

use crate::geometry::Geometry;

/// Per-prime precomputed state shared read-only by every worker for the
/// lifetime of one `sieve()` call.
pub struct Roots {
    /// `root[i] = prod_n^-1 mod sieve_p[i]`, for `i >= startprime`.
    pub root: Vec<u32>,
    /// `lower_mod_prime[i] = (lo' / prod_n) mod sieve_p[i]`.
    pub lower_mod_prime: Vec<u32>,
}

impl Roots {
    /// Precompute roots and lower-mod-prime residues for every sieving
    /// prime in `sieve_p`. Entries below `geometry.wheel.startprime` are
    /// zero-filled placeholders; those primes divide `prod_n` and are never
    /// used for striking.
    pub fn precompute(sieve_p: &[u32], geometry: &Geometry) -> Roots {
        let prod_n = geometry.wheel.prod_n;
        let l = geometry.lo_prime / prod_n;
        debug_assert_eq!(geometry.lo_prime % prod_n, 0, "lo' must be a multiple of prod_n");

        let mut root = vec![0u32; sieve_p.len()];
        let mut lower_mod_prime = vec![0u32; sieve_p.len()];

        for (i, &p) in sieve_p.iter().enumerate().skip(geometry.wheel.startprime) {
            let p = p as u64;
            root[i] = mod_inverse(prod_n % p, p) as u32;
            lower_mod_prime[i] = (l % p) as u32;
        }

        Roots { root, lower_mod_prime }
    }
}

/// The smallest non-negative `k` such that
/// `lo' + k * prod_n + residue` is divisible by `p`, given that prime's
/// precomputed `root`/`lower_mod_prime` (spec.md §4.4).
///
/// Derivation: writing `lo' = prod_n * lower_mod_prime (mod p)`, we need
/// `prod_n * (lower_mod_prime + k) + residue == 0 (mod p)`, i.e.
/// `k == -(residue * root + lower_mod_prime) (mod p)`.
#[inline]
pub fn first_hit(p: u64, root: u32, lower_mod_prime: u32, residue: u32) -> u64 {
    let residue_term = (residue as u64 * root as u64) % p;
    let sum = (residue_term + lower_mod_prime as u64) % p;
    (p - sum) % p
}

/// Extended-Euclid modular inverse of `a` modulo `m`, for `gcd(a, m) == 1`.
fn mod_inverse(a: u64, m: u64) -> u64 {
    let (mut old_r, mut r) = (a as i128, m as i128);
    let (mut old_s, mut s) = (1i128, 0i128);

    while r != 0 {
        let q = old_r / r;
        let new_r = old_r - q * r;
        old_r = r;
        r = new_r;
        let new_s = old_s - q * s;
        old_s = s;
        s = new_s;
    }

    debug_assert_eq!(old_r, 1, "prod_n and a sieving prime must be coprime");
    ((old_s % m as i128 + m as i128) % m as i128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mod_inverse_matches_definition() {
        for (a, m) in [(7u64, 30u64), (11, 210), (13, 2310), (209, 30030)] {
            let inv = mod_inverse(a % m, m);
            assert_eq!((a % m) * inv % m, 1);
        }
    }

    #[test]
    fn first_hit_is_a_true_zero_of_the_linear_form() {
        let p = 97u64;
        let prod_n = 30u64;
        let root = mod_inverse(prod_n % p, p) as u32;
        let lo_prime = 30 * 1_000_003; // multiple of prod_n
        let lower_mod_prime = ((lo_prime / prod_n) % p) as u32;

        for residue in [1u32, 7, 11, 13, 17, 19, 23, 29] {
            let k = first_hit(p, root, lower_mod_prime, residue);
            let n = lo_prime + k * prod_n + residue as u64;
            assert_eq!(n % p, 0, "k={k} residue={residue} n={n}");
        }
    }
}
