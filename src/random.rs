//!
//! Randomness helpers for the registry's probabilistic decisions.
//!
//! Nothing here owns a generator: callers pass any `RngCore`, which lets tests
//! script decisions exactly and lets each worker replay a campaign from its seed.

use rand_chacha::ChaCha8Rng;
use rand_core::{OsRng, RngCore, SeedableRng};

/// Uniform value in `[0, n)`. `n` must be non-zero.
#[inline]
pub fn rnd_below<R: RngCore + ?Sized>(rng: &mut R, n: u32) -> u32 {
    debug_assert!(n > 0, "rnd_below called with an empty range");
    rng.next_u32() % n
}

/// True with probability `1/n`.
#[inline]
pub fn one_in<R: RngCore + ?Sized>(rng: &mut R, n: u32) -> bool {
    rnd_below(rng, n) == 0
}

/// A fair coin flip.
#[inline]
pub fn rand_bool<R: RngCore + ?Sized>(rng: &mut R) -> bool {
    rng.next_u32() & 1 == 1
}

/// Seed for worker `num` of a campaign started with `campaign_seed`.
/// Distinct workers get distinct, reproducible streams.
pub fn worker_seed(campaign_seed: u64, num: u32) -> u64 {
    // splitmix64 finaliser over the combined value
    let mut z = campaign_seed ^ (u64::from(num).wrapping_add(1)).wrapping_mul(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Generator used by workers.
pub fn worker_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// A fresh campaign seed from the operating system.
pub fn os_seed() -> u64 {
    OsRng.next_u64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rnd_below_stays_in_range() {
        let mut rng = worker_rng(1);
        for n in 1..50 {
            for _ in 0..20 {
                assert!(rnd_below(&mut rng, n) < n);
            }
        }
    }

    #[test]
    fn test_one_in_one_is_always_true() {
        let mut rng = worker_rng(2);
        assert!((0..100).all(|_| one_in(&mut rng, 1)));
    }

    #[test]
    fn test_worker_seeds_differ_and_repeat() {
        assert_ne!(worker_seed(7, 0), worker_seed(7, 1));
        assert_ne!(worker_seed(7, 0), worker_seed(8, 0));
        assert_eq!(worker_seed(7, 3), worker_seed(7, 3));
    }

    #[test]
    fn test_worker_rng_is_reproducible() {
        let mut a = worker_rng(99);
        let mut b = worker_rng(99);
        for _ in 0..16 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }
}
