//! Weights, limits and the small value types every search stage shares.

use crate::format::{CH_A, CH_B, CH_G, CH_R};

pub(crate) const K_ALPHA: i32 = 10;
pub(crate) const K_GREEN: i32 = 6;
pub(crate) const K_RED: i32 = 3;
pub(crate) const K_BLUE: i32 = 1;
pub(crate) const K_COLOR: i32 = K_GREEN + K_RED + K_BLUE;

/// Right shift applied to every channel distance before it is squared.
pub(crate) const K_DENOISE: u32 = 1;
pub(crate) const K_DENOISE_STEP: i32 = 2;

pub(crate) const K_BLOCK_MAXIMAL_ALPHA_ERROR: i32 = 16 * 255 * 255 * K_ALPHA;
pub(crate) const K_BLOCK_MAXIMAL_COLOR_ERROR: i32 = 16 * 255 * 255 * K_COLOR;
pub(crate) const K_BLOCK_MAXIMAL_ERROR: i32 =
    K_BLOCK_MAXIMAL_ALPHA_ERROR + K_BLOCK_MAXIMAL_COLOR_ERROR;

/// Largest per channel deviation of a visible value that is not reported as a glitch.
pub(crate) const K_GLITCH_TOLERANCE: i32 = 16;

pub(crate) const WEIGHTS_AGRB: [i32; 4] = weights(true, true, true, true);
pub(crate) const WEIGHTS_AG: [i32; 4] = weights(true, true, false, false);
pub(crate) const WEIGHTS_AR: [i32; 4] = weights(true, false, true, false);
pub(crate) const WEIGHTS_AGR: [i32; 4] = weights(true, true, true, false);
pub(crate) const WEIGHTS_AGB: [i32; 4] = weights(true, true, false, true);
pub(crate) const WEIGHTS_GRB: [i32; 4] = weights(false, true, true, true);
pub(crate) const WEIGHTS_GR: [i32; 4] = weights(false, true, true, false);
pub(crate) const WEIGHTS_GB: [i32; 4] = weights(false, true, false, true);

const fn weights(a: bool, g: bool, r: bool, b: bool) -> [i32; 4] {
    let mut w = [0; 4];
    if a {
        w[CH_A] = K_ALPHA;
    }
    if g {
        w[CH_G] = K_GREEN;
    }
    if r {
        w[CH_R] = K_RED;
    }
    if b {
        w[CH_B] = K_BLUE;
    }
    w
}

/// Weighted error of a single channel distance.
#[inline(always)]
pub(crate) const fn denoised_error(diff: i32, weight: i32) -> i32 {
    let y = diff.abs() >> K_DENOISE;
    y * y * weight
}

/// Error of a block split into its alpha part and the sum over all channels.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct BlockError {
    pub alpha: i32,
    pub total: i32,
}

impl BlockError {
    pub(crate) const fn new(alpha: i32, total: i32) -> Self {
        Self { alpha, total }
    }

    pub(crate) const fn color(&self) -> i32 {
        self.total - self.alpha
    }
}

/// Structural similarity of a block, alpha and weighted color.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct BlockSsim {
    pub alpha: f64,
    pub color: f64,
}

impl BlockSsim {
    pub(crate) const PERFECT: Self = Self {
        alpha: 1.0,
        color: 1.0,
    };
}

impl Default for BlockSsim {
    fn default() -> Self {
        Self::PERFECT
    }
}
