//! Seedable 32-bit PRNG for reproducible simulation runs.
//!
//! Mulberry32: one `u32` of state, a Weyl increment and an avalanche
//! output mix. The output depends only on the seed, so the same seed
//! replays the same sequence on every platform.

use rand::{RngCore, SeedableRng};

const WEYL_INCREMENT: u32 = 0x6D2B_79F5;
const UNIT_SCALE: f64 = 1.0 / 4_294_967_296.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Stream for path `index` of a batch seeded with `batch_seed`.
    pub fn for_path(batch_seed: u32, index: usize) -> Self {
        Self::new(derive_seed(batch_seed, index))
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(WEYL_INCREMENT);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Uniform sample in `[0, 1)`.
    #[inline]
    pub fn next_unit(&mut self) -> f64 {
        self.next_u32() as f64 * UNIT_SCALE
    }
}

/// Derive an independent per-path seed from a batch seed.
///
/// SplitMix64 finalizer over `(batch_seed, index)`, keeping the high word.
pub fn derive_seed(batch_seed: u32, index: usize) -> u32 {
    let mut z = ((batch_seed as u64) << 32) | (index as u64 & 0xFFFF_FFFF);
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z >> 32) as u32
}

impl RngCore for Mulberry32 {
    fn next_u32(&mut self) -> u32 {
        Mulberry32::next_u32(self)
    }

    fn next_u64(&mut self) -> u64 {
        let hi = Mulberry32::next_u32(self) as u64;
        let lo = Mulberry32::next_u32(self) as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = Mulberry32::next_u32(self).to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Mulberry32 {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use statrs::distribution::{ChiSquared, ContinuousCDF};
    use statrs::statistics::Statistics;

    fn draws(seed: u32, n: usize) -> Vec<f64> {
        let mut rng = Mulberry32::new(seed);
        (0..n).map(|_| rng.next_unit()).collect()
    }

    fn correlation(a: &[f64], b: &[f64]) -> f64 {
        let ma = a.iter().mean();
        let mb = b.iter().mean();
        let mut cov = 0.0;
        let mut va = 0.0;
        let mut vb = 0.0;
        for (x, y) in a.iter().zip(b) {
            cov += (x - ma) * (y - mb);
            va += (x - ma).powi(2);
            vb += (y - mb).powi(2);
        }
        cov / (va.sqrt() * vb.sqrt())
    }

    #[test]
    fn test_same_seed_same_stream() {
        assert_eq!(draws(555, 10_000), draws(555, 10_000));
        assert_ne!(draws(555, 100), draws(556, 100));
    }

    #[test]
    fn test_known_first_output() {
        // Reference value of mulberry32 seeded with 0
        let mut rng = Mulberry32::new(0);
        assert_eq!(rng.next_u32(), 1_144_304_738);
    }

    #[test]
    fn test_unit_interval() {
        assert!(draws(7, 50_000).iter().all(|u| (0.0..1.0).contains(u)));
    }

    #[test]
    fn test_chi_square_uniformity() {
        const BINS: usize = 10;
        let n = 100_000;
        let mut counts = [0usize; BINS];
        for u in draws(2024, n) {
            counts[(u * BINS as f64) as usize] += 1;
        }
        let expected = n as f64 / BINS as f64;
        let chi2: f64 = counts
            .iter()
            .map(|&c| (c as f64 - expected).powi(2) / expected)
            .sum();

        let critical = ChiSquared::new((BINS - 1) as f64).unwrap().inverse_cdf(0.999);
        assert!(chi2 < critical, "chi2 {chi2} >= {critical}");
    }

    #[test]
    fn test_lag_one_autocorrelation() {
        let xs = draws(99, 100_000);
        let rho = correlation(&xs[..xs.len() - 1], &xs[1..]);
        assert!(rho.abs() < 0.02, "lag-1 autocorrelation {rho}");
    }

    #[test]
    fn test_streams_uncorrelated() {
        let a = draws(derive_seed(42, 0), 50_000);
        let b = draws(derive_seed(42, 1), 50_000);
        assert!(correlation(&a, &b).abs() < 0.02);

        let c = draws(123, 50_000);
        let d = draws(456, 50_000);
        assert!(correlation(&c, &d).abs() < 0.02);
    }

    #[test]
    fn test_derive_seed_spreads_indices() {
        let seeds: std::collections::HashSet<u32> = (0..2_000).map(|i| derive_seed(42, i)).collect();
        assert_eq!(seeds.len(), 2_000);
        assert_ne!(derive_seed(42, 0), derive_seed(43, 0));
    }

    #[test]
    fn test_rand_integration() {
        let mut a = Mulberry32::seed_from_u64(11);
        let mut b = a.clone();
        let x: u32 = a.gen();
        assert_eq!(x, RngCore::next_u32(&mut b));

        let mut buf = [0u8; 7];
        a.fill_bytes(&mut buf);
        assert!(a.gen_range(0..10) < 10);
    }
}
