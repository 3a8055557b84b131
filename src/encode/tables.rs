//! Distance tables of the endpoint search, built once per process on first use.

use std::sync::OnceLock;

use tracing::debug;

use crate::{
    encode::common::K_DENOISE,
    format::{expand, interpolate, WEIGHT2, WEIGHT4},
};

/// Denoised distance from every 8-bit value to the closest interpolant of every endpoint pair.
///
/// Entry `[value][(hi << shift) | lo]` holds `min_k |interpolate(lo, hi, w_k) - value| >> K_DENOISE`
/// where `lo` and `hi` are endpoint codes of `shift` bits, expanded to 8 bits by bit replication.
/// With `shift == 8` the codes are the endpoint values themselves, which also covers 7-bit
/// endpoints with a parity bit.
pub(crate) struct LevelsTable {
    shift: u32,
    data: Box<[u8]>,
}

impl LevelsTable {
    fn build(shift: u32, weights: &[i32]) -> Self {
        let codes = 1usize << shift;
        let pairs = codes * codes;

        let mut data = vec![0u8; 256 * pairs].into_boxed_slice();
        let mut points = [0i32; 16];

        for hi in 0..codes {
            let e_hi = expand(hi as i32, shift);

            for lo in 0..codes {
                let e_lo = expand(lo as i32, shift);

                let points = &mut points[..weights.len()];
                for (point, &weight) in points.iter_mut().zip(weights) {
                    *point = interpolate(e_lo, e_hi, weight);
                }
                points.sort_unstable();

                let pair = (hi << shift) | lo;

                // Both the values and the sorted points grow, so the nearest point only moves forward.
                let mut nearest = 0;
                for value in 0..256i32 {
                    while nearest + 1 < points.len()
                        && (points[nearest + 1] - value).abs() <= (points[nearest] - value).abs()
                    {
                        nearest += 1;
                    }

                    data[value as usize * pairs + pair] =
                        ((points[nearest] - value).abs() >> K_DENOISE) as u8;
                }
            }
        }

        Self { shift, data }
    }

    /// Number of bits of one endpoint code.
    #[inline(always)]
    pub(crate) fn shift(&self) -> u32 {
        self.shift
    }

    /// All endpoint pairs for one 8-bit value.
    #[inline(always)]
    pub(crate) fn row(&self, value: i32) -> &[u8] {
        let pairs = 1usize << (2 * self.shift);
        let start = (value as usize & 0xFF) * pairs;
        &self.data[start..start + pairs]
    }
}

static LEVELS2_7: OnceLock<LevelsTable> = OnceLock::new();
static LEVELS2_8: OnceLock<LevelsTable> = OnceLock::new();
static LEVELS4_8: OnceLock<LevelsTable> = OnceLock::new();

/// 7-bit replicated endpoints with 2-bit indices.
pub(crate) fn levels2_7() -> &'static LevelsTable {
    LEVELS2_7.get_or_init(|| {
        debug!("building 2-bit index levels for 7-bit endpoints");
        LevelsTable::build(7, &WEIGHT2)
    })
}

/// 8-bit endpoints (or 7-bit endpoints with parity) with 2-bit indices.
pub(crate) fn levels2_8() -> &'static LevelsTable {
    LEVELS2_8.get_or_init(|| {
        debug!("building 2-bit index levels for 8-bit endpoints");
        LevelsTable::build(8, &WEIGHT2)
    })
}

/// 7-bit endpoints with parity and 4-bit indices.
pub(crate) fn levels4_8() -> &'static LevelsTable {
    LEVELS4_8.get_or_init(|| {
        debug!("building 4-bit index levels for 8-bit endpoints");
        LevelsTable::build(8, &WEIGHT4)
    })
}

/// Forces every table. Safe to call any number of times from any thread.
pub(crate) fn init() {
    levels2_7();
    levels2_8();
    levels4_8();
}
