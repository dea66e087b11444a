//! Line/block layout (component C3): from the chosen wheel and the
//! caller's `[lo, hi]`, derive the block-aligned `[lo', hi']` the segmented
//! sieve actually operates over, and how many bytes/blocks each residue
//! class's line needs.

use crate::error::{Result, SoeError, MAX_HIGHLIMIT, MAX_WIDTH};
use crate::wheel::WheelSpec;

/// Minimum interval width the sieve will ever actually run - spec.md §4.2
/// step 1 widens anything narrower than this.
pub const MIN_WIDTH: u64 = 1_000_000;

/// The block-aligned geometry a sieve call will run over, plus enough of
/// the original request to clip results back down at the end.
#[derive(Debug, Clone)]
pub struct Geometry {
    /// Caller's original lower bound (inclusive).
    pub orig_lo: u64,
    /// Caller's original upper bound (inclusive).
    pub orig_hi: u64,
    /// Block-aligned lower bound the sieve's lines actually start at.
    pub lo_prime: u64,
    /// Block-aligned upper bound the sieve's lines actually cover.
    pub hi_prime: u64,
    /// Bytes per residue-class line.
    pub numlinebytes: u64,
    /// `numlinebytes / blocksize`.
    pub blocks: u64,
    /// Flags represented by one block: `(blocksize * 8) * prod_n`.
    pub blk_r: u64,
    pub wheel: WheelSpec,
}

impl Geometry {
    /// Derive the sieve geometry for `[lo, hi]`, selecting a wheel from the
    /// (possibly-widened) interval width and laying out block-aligned lines
    /// sized in multiples of `blocksize` bytes.
    pub fn new(lo: u64, hi: u64, blocksize: usize) -> Result<Geometry> {
        if hi < lo {
            return Err(SoeError::InvalidRange { lo, hi });
        }
        if hi > MAX_HIGHLIMIT {
            return Err(SoeError::too_large(lo, hi));
        }

        let mut hi_eff = hi;
        if hi_eff - lo < MIN_WIDTH {
            hi_eff = lo + MIN_WIDTH;
        }
        if hi_eff - lo > MAX_WIDTH {
            return Err(SoeError::TooLarge { lo, hi, limit: MAX_WIDTH });
        }

        let wheel = WheelSpec::for_width(hi_eff - lo);
        let prod_n = wheel.prod_n;
        let numclasses = wheel.numclasses;

        let lo_prime = (lo / (prod_n * numclasses)) * (prod_n * numclasses);

        let numflags_raw = (hi_eff - lo_prime).div_ceil(prod_n) * numclasses;
        let numbytes = numflags_raw.div_ceil(8);
        let mut numlinebytes = numbytes.div_ceil(numclasses);

        let blocksize = blocksize as u64;
        numlinebytes = numlinebytes.div_ceil(blocksize) * blocksize;

        let hi_prime = lo_prime + numlinebytes * 8 * prod_n;
        let blocks = numlinebytes / blocksize;
        let blk_r = blocksize * 8 * prod_n;

        log::debug!(
            "geometry: wheel prod_n={prod_n} numclasses={numclasses} lo'={lo_prime} hi'={hi_prime} \
             numlinebytes={numlinebytes} blocks={blocks}"
        );

        Ok(Geometry {
            orig_lo: lo,
            orig_hi: hi,
            lo_prime,
            hi_prime,
            numlinebytes,
            blocks,
            blk_r,
            wheel,
        })
    }

    /// Upper bound of the seed-prime sieve needed to strike every composite
    /// in `[lo', hi']`: `floor(sqrt(hi')) + 1`.
    pub fn seed_bound(&self) -> u64 {
        (self.hi_prime as f64).sqrt() as u64 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_range() {
        assert!(matches!(Geometry::new(100, 50, 32768), Err(SoeError::InvalidRange { .. })));
    }

    #[test]
    fn rejects_too_large_hi() {
        assert!(matches!(Geometry::new(0, MAX_HIGHLIMIT + 1, 32768), Err(SoeError::TooLarge { .. })));
    }

    #[test]
    fn widens_narrow_interval() {
        let g = Geometry::new(0, 30, 32768).unwrap();
        assert!(g.hi_prime - g.lo_prime >= MIN_WIDTH);
        assert_eq!(g.orig_lo, 0);
        assert_eq!(g.orig_hi, 30);
    }

    #[test]
    fn rejects_too_wide_interval() {
        assert!(matches!(Geometry::new(0, MAX_WIDTH + 2, 32768), Err(SoeError::TooLarge { .. })));
    }

    #[test]
    fn line_layout_is_block_aligned() {
        let g = Geometry::new(0, 10_000_000_000, 32768).unwrap();
        assert_eq!(g.numlinebytes % 32768, 0);
        assert_eq!(g.numlinebytes / 32768, g.blocks);
        assert!(g.hi_prime >= g.orig_hi);
        assert!(g.lo_prime <= g.orig_lo);
    }
}
