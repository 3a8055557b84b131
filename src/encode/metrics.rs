//! Error, similarity and glitch measures of a decoded block against its source.

use crate::{
    encode::{
        cell::Cell,
        common::{
            denoised_error, BlockError, BlockSsim, K_BLUE, K_GLITCH_TOLERANCE, K_GREEN, K_RED,
            WEIGHTS_AGRB,
        },
    },
    format::{CH_A, CH_B, CH_G, CH_R},
};

const C1: f64 = (0.01 * 255.0) * (0.01 * 255.0);
const C2: f64 = (0.03 * 255.0) * (0.03 * 255.0);

/// Running sums of two value sequences for a structural similarity index.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct SsimSums {
    a: i64,
    b: i64,
    aa: i64,
    bb: i64,
    ab: i64,
}

impl SsimSums {
    #[inline(always)]
    pub(crate) fn add(&mut self, a: i32, b: i32) {
        let (a, b) = (a as i64, b as i64);
        self.a += a;
        self.b += b;
        self.aa += a * a;
        self.bb += b * b;
        self.ab += a * b;
    }

    /// Similarity of `n` value pairs, `1.0` for an empty sequence.
    pub(crate) fn ssim(&self, n: f64) -> f64 {
        if n <= 0.0 {
            return 1.0;
        }

        let sa = self.a as f64;
        let sb = self.b as f64;
        let nn = n * n;

        let numerator =
            (2.0 * sa * sb + C1 * nn) * (2.0 * (n * self.ab as f64 - sa * sb) + C2 * nn);
        let denominator = (sa * sa + sb * sb + C1 * nn)
            * (n * (self.aa + self.bb) as f64 - sa * sa - sb * sb + C2 * nn);

        numerator / denominator
    }
}

/// Weighted denoised error of `decoded` (A, G, R, B per pixel) against the source of `cell`.
pub(crate) fn compare_blocks(cell: &Cell, decoded: &[[u8; 4]; 16]) -> BlockError {
    let mut alpha = 0;
    let mut total = 0;

    for ((pixel, value), mask) in decoded.iter().zip(&cell.values).zip(&cell.masks) {
        for c in 0..4 {
            let diff = (pixel[c] as i32 & mask[c]) - value[c];
            let error = denoised_error(diff, WEIGHTS_AGRB[c]);
            total += error;
            if c == CH_A {
                alpha += error;
            }
        }
    }

    BlockError::new(alpha, total)
}

/// Structural similarity of `decoded` against the source of `cell`.
pub(crate) fn compare_blocks_ssim(cell: &Cell, decoded: &[[u8; 4]; 16]) -> BlockSsim {
    let mut sums = [SsimSums::default(); 4];

    for ((pixel, value), mask) in decoded.iter().zip(&cell.values).zip(&cell.masks) {
        for c in 0..4 {
            sums[c].add(value[c], pixel[c] as i32 & mask[c]);
        }
    }

    let ssim = sums.map(|s| s.ssim(16.0));

    let color = (ssim[CH_G] * K_GREEN as f64
        + ssim[CH_R] * K_RED as f64
        + ssim[CH_B] * K_BLUE as f64)
        / (K_GREEN + K_RED + K_BLUE) as f64;

    BlockSsim {
        alpha: ssim[CH_A],
        color,
    }
}

/// Whether a visible channel of `decoded` strays from the source by more than the tolerance.
pub(crate) fn detect_glitches(cell: &Cell, decoded: &[[u8; 4]; 16]) -> bool {
    decoded
        .iter()
        .zip(&cell.values)
        .zip(&cell.masks)
        .any(|((pixel, value), mask)| {
            (0..4).any(|c| mask[c] != 0 && (pixel[c] as i32 - value[c]).abs() > K_GLITCH_TOLERANCE)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sums_of(a: &[i32], b: &[i32]) -> SsimSums {
        let mut sums = SsimSums::default();
        for (&x, &y) in a.iter().zip(b) {
            sums.add(x, y);
        }
        sums
    }

    #[test]
    fn identical_sequences_are_perfect() {
        let a = [3, 80, 120, 255, 0, 17];
        let ssim = sums_of(&a, &a).ssim(a.len() as f64);
        assert!((ssim - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_sequence_is_perfect() {
        assert_eq!(SsimSums::default().ssim(0.0), 1.0);
    }

    #[test]
    fn distortion_lowers_similarity() {
        let a = [10, 20, 30, 40, 50, 60, 70, 80];
        let close = [11, 19, 31, 41, 49, 60, 71, 79];
        let far = [80, 10, 70, 20, 60, 30, 50, 40];

        let close = sums_of(&a, &close).ssim(8.0);
        let far = sums_of(&a, &far).ssim(8.0);

        assert!(close < 1.0);
        assert!(far < close);
    }

    #[test]
    fn matches_the_mean_variance_form() {
        let a = [12, 250, 33, 90];
        let b = [15, 240, 40, 80];
        let n = 4.0;

        let mean = |v: &[i32]| v.iter().map(|&x| x as f64).sum::<f64>() / n;
        let (ma, mb) = (mean(&a), mean(&b));
        let var = |v: &[i32], m: f64| v.iter().map(|&x| (x as f64 - m).powi(2)).sum::<f64>() / n;
        let cov = a
            .iter()
            .zip(&b)
            .map(|(&x, &y)| (x as f64 - ma) * (y as f64 - mb))
            .sum::<f64>()
            / n;

        let expected = ((2.0 * ma * mb + C1) * (2.0 * cov + C2))
            / ((ma * ma + mb * mb + C1) * (var(&a, ma) + var(&b, mb) + C2));

        assert!((sums_of(&a, &b).ssim(n) - expected).abs() < 1e-9);
    }
}
