//! PRNG utility
//!
//! Grounded in `original_source/src/core/Random.h`'s `rand32`/`rand64`/
//! `oneIn` surface, reimplemented over the `rand` crate's thread-local
//! generator rather than a hand-rolled Mersenne Twister.

use rand::Rng;

/// Returns a random `u32` in `[0, max)`. Returns `0` if `max == 0`.
#[must_use]
pub fn rand32(max: u32) -> u32 {
    if max == 0 {
        return 0;
    }
    rand::thread_rng().gen_range(0..max)
}

/// Returns a random `u32` in `[min, max)`. Returns `0` if `min == max`.
#[must_use]
pub fn rand32_range(min: u32, max: u32) -> u32 {
    if min == max {
        return 0;
    }
    rand::thread_rng().gen_range(min..max)
}

/// Returns a random `u64` in `[0, max)`. Returns `0` if `max == 0`.
#[must_use]
pub fn rand64(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    rand::thread_rng().gen_range(0..max)
}

/// Returns `true` with probability `1/n`. Always `false` if `n == 0`.
#[must_use]
pub fn one_in(n: u32) -> bool {
    n != 0 && rand32(n) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rand32_zero_max_is_zero() {
        assert_eq!(rand32(0), 0);
    }

    #[test]
    fn rand32_respects_upper_bound() {
        for _ in 0..100 {
            assert!(rand32(10) < 10);
        }
    }

    #[test]
    fn rand32_range_equal_bounds_is_zero() {
        assert_eq!(rand32_range(5, 5), 0);
    }

    #[test]
    fn one_in_zero_is_always_false() {
        assert!(!one_in(0));
    }
}
