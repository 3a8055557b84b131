//! Pixel subsets of a block with their bounds and canonical channel orientation.

use crate::{
    encode::common::{denoised_error, K_ALPHA, K_BLUE, K_GREEN, K_RED},
    format::{CH_A, CH_B, CH_G, CH_R},
};

const CHANNEL_WEIGHTS: [i64; 4] = [K_ALPHA as i64, K_GREEN as i64, K_RED as i64, K_BLUE as i64];

/// Value of a pixel that takes no part in the error.
const NEUTRAL_VALUE: [i32; 4] = [255, 0, 0, 0];

/// Up to 16 pixels of one subset.
///
/// The relevant pixels come first, `active` of them, followed by neutral placeholders so every
/// loop can run over `count` entries without looking at the masks.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Area {
    pub count: usize,
    pub active: usize,
    /// Pixel slot of the first listed pixel, which is the anchor of the subset.
    pub zero_index: usize,
    /// Pixel slot of every entry.
    pub indices: [u8; 16],
    /// Masked values in A, G, R, B order.
    pub values: [[i32; 4]; 16],
    /// `-1` for visible channels, `0` otherwise.
    pub masks: [[i32; 4]; 16],
    /// Channel minimum and maximum over visible values.
    pub min_max: [[i32; 2]; 4],
    /// `min_max` with some channels swapped so that all channels grow together.
    pub bounds: [[i32; 2]; 4],
    pub is_opaque: bool,
}

impl Default for Area {
    fn default() -> Self {
        Self {
            count: 0,
            active: 0,
            zero_index: 0,
            indices: [0; 16],
            values: [NEUTRAL_VALUE; 16],
            masks: [[0; 4]; 16],
            min_max: [[255, 255], [0, 0], [0, 0], [0, 0]],
            bounds: [[255, 255], [0, 0], [0, 0], [0, 0]],
            is_opaque: true,
        }
    }
}

impl Area {
    /// Builds the area of the listed pixel slots. The first slot must be the subset anchor.
    pub(crate) fn build(values: &[[i32; 4]; 16], masks: &[[i32; 4]; 16], pixels: &[u8]) -> Self {
        debug_assert!(!pixels.is_empty() && pixels.len() <= 16);

        let mut area = Self {
            count: pixels.len(),
            zero_index: pixels[0] as usize,
            ..Self::default()
        };

        let mut hidden = [0u8; 16];
        let mut hidden_count = 0;

        for &pixel in pixels {
            let p = pixel as usize;
            if masks[p].iter().any(|&m| m != 0) {
                area.indices[area.active] = pixel;
                area.values[area.active] = values[p];
                area.masks[area.active] = masks[p];
                area.active += 1;
            } else {
                hidden[hidden_count] = pixel;
                hidden_count += 1;
            }
        }

        for (slot, &pixel) in hidden[..hidden_count].iter().enumerate() {
            area.indices[area.active + slot] = pixel;
        }

        let mut min_max = [[i32::MAX, i32::MIN]; 4];
        for i in 0..area.active {
            for (ch, bound) in min_max.iter_mut().enumerate() {
                if area.masks[i][ch] != 0 {
                    let v = area.values[i][ch];
                    bound[0] = bound[0].min(v);
                    bound[1] = bound[1].max(v);
                }
            }
        }
        for (ch, bound) in min_max.iter_mut().enumerate() {
            if bound[0] > bound[1] {
                *bound = if ch == CH_A { [255, 255] } else { [0, 0] };
            }
        }

        area.min_max = min_max;
        area.bounds = min_max;
        area.is_opaque = min_max[CH_A][0] == 255;

        area.orient();

        area
    }

    /// Swaps the bounds of channels that decrease while the others increase.
    fn orient(&mut self) {
        let n = self.active as i64;

        let mut sum = [0i64; 4];
        let mut sum2 = [[0i64; 4]; 4];
        for i in 0..self.active {
            let v = self.values[i].map(i64::from);
            for a in 0..4 {
                sum[a] += v[a];
                for b in 0..4 {
                    sum2[a][b] += v[a] * v[b];
                }
            }
        }

        let mut cov = [[0i64; 4]; 4];
        for a in 0..4 {
            for b in 0..4 {
                cov[a][b] = n * sum2[a][b] - sum[a] * sum[b];
            }
        }

        if self.is_opaque {
            if cov[CH_G][CH_R] < 0 {
                self.flip(&mut cov, CH_R);
            }
            if cov[CH_B][CH_G] < 0 {
                self.flip(&mut cov, CH_B);
            }
            if cov[CH_G][CH_R] == 0 && cov[CH_B][CH_G] == 0 && cov[CH_R][CH_B] < 0 {
                self.flip(&mut cov, CH_B);
            }

            self.settle(&mut cov, &[CH_B, CH_R], &[CH_G, CH_R, CH_B]);
        } else {
            if cov[CH_A][CH_G] < 0 {
                self.flip(&mut cov, CH_G);
            }
            if cov[CH_A][CH_R] < 0 {
                self.flip(&mut cov, CH_R);
            }
            if cov[CH_A][CH_B] < 0 {
                self.flip(&mut cov, CH_B);
            }
            if cov[CH_A][CH_R] == 0 && cov[CH_G][CH_R] < 0 {
                self.flip(&mut cov, CH_R);
            }
            if cov[CH_A][CH_B] == 0 && cov[CH_B][CH_G] < 0 {
                self.flip(&mut cov, CH_B);
            }
            if cov[CH_A][CH_R] == 0
                && cov[CH_A][CH_B] == 0
                && cov[CH_G][CH_R] == 0
                && cov[CH_B][CH_G] == 0
                && cov[CH_R][CH_B] < 0
            {
                self.flip(&mut cov, CH_B);
            }

            self.settle(&mut cov, &[CH_B, CH_R, CH_G], &[CH_A, CH_G, CH_R, CH_B]);
        }
    }

    /// Flips channels whose weighted covariance with the others stays negative.
    fn settle(&mut self, cov: &mut [[i64; 4]; 4], order: &[usize], scope: &[usize]) {
        for _ in 0..16 {
            let mut changes = false;

            for &ch in order {
                let pull: i64 = scope
                    .iter()
                    .filter(|&&other| other != ch)
                    .map(|&other| cov[ch][other] * CHANNEL_WEIGHTS[other])
                    .sum();

                if pull < 0 {
                    self.flip(cov, ch);
                    changes = true;
                }
            }

            if !changes {
                break;
            }
        }
    }

    fn flip(&mut self, cov: &mut [[i64; 4]; 4], ch: usize) {
        self.bounds[ch].swap(0, 1);
        for other in 0..4 {
            if other != ch {
                cov[ch][other] = -cov[ch][other];
                cov[other][ch] = -cov[other][ch];
            }
        }
    }

    /// Whether the canonical bounds of `channel` run from maximum to minimum.
    #[inline(always)]
    pub(crate) fn is_reversed(&self, channel: usize) -> bool {
        self.bounds[channel][0] != self.min_max[channel][0]
    }

    /// Smallest visible alpha.
    #[inline(always)]
    pub(crate) fn min_alpha(&self) -> i32 {
        self.min_max[CH_A][0]
    }

    /// Error of encoding this area with alpha forced to 255.
    pub(crate) fn opaque_alpha_error(&self) -> i32 {
        if self.is_opaque {
            return 0;
        }

        let error: i32 = (0..self.count)
            .map(|i| {
                let da = (255 - self.values[i][CH_A]) & self.masks[i][CH_A];
                denoised_error(da, 1)
            })
            .sum();

        error * K_ALPHA
    }

    /// Pixel slots of this area as a bit set.
    pub(crate) fn pixel_set(&self) -> u32 {
        self.indices[..self.count]
            .iter()
            .fold(0, |set, &pixel| set | 1 << pixel)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn block(pixels: impl Fn(usize) -> [i32; 4]) -> ([[i32; 4]; 16], [[i32; 4]; 16]) {
        let mut values = [[0; 4]; 16];
        for (i, v) in values.iter_mut().enumerate() {
            *v = pixels(i);
        }
        (values, [[-1; 4]; 16])
    }

    const ALL: [u8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];

    #[test]
    fn uniform_block_has_collapsed_bounds() {
        let (values, masks) = block(|_| [255, 40, 50, 60]);
        let area = Area::build(&values, &masks, &ALL);

        assert_eq!(area.count, 16);
        assert_eq!(area.active, 16);
        assert!(area.is_opaque);
        assert_eq!(area.min_max, [[255, 255], [40, 40], [50, 50], [60, 60]]);
        assert_eq!(area.bounds, area.min_max);
        assert_eq!(area.opaque_alpha_error(), 0);
    }

    #[rstest]
    #[case::rising([1, 1, 1], [false, false, false])]
    #[case::falling_red([1, -1, 1], [false, true, false])]
    #[case::falling_blue([1, 1, -1], [false, false, true])]
    fn opaque_orientation_follows_green(#[case] slope: [i32; 3], #[case] reversed: [bool; 3]) {
        let (values, masks) = block(|i| {
            let t = i as i32 * 10;
            let channel = |s: i32| if s > 0 { 20 + t } else { 200 - t };
            [255, channel(slope[0]), channel(slope[1]), channel(slope[2])]
        });
        let area = Area::build(&values, &masks, &ALL);

        assert_eq!(
            [
                area.is_reversed(CH_G),
                area.is_reversed(CH_R),
                area.is_reversed(CH_B)
            ],
            reversed
        );
    }

    #[test]
    fn alpha_leads_orientation_of_transparent_areas() {
        let (values, masks) = block(|i| {
            let t = i as i32 * 8;
            [t, 255 - t, t, 255 - t]
        });
        let area = Area::build(&values, &masks, &ALL);

        assert!(!area.is_opaque);
        assert!(!area.is_reversed(CH_A));
        assert!(area.is_reversed(CH_G));
        assert!(!area.is_reversed(CH_R));
        assert!(area.is_reversed(CH_B));
    }

    #[test]
    fn orientation_is_stable() {
        let (values, masks) = block(|i| {
            let t = (i as i32 * 37) % 256;
            [255, t, 255 - t, (t * 3) % 256]
        });
        let area = Area::build(&values, &masks, &ALL);
        let again = Area::build(&area.values, &area.masks, &ALL);

        assert_eq!(area.bounds, again.bounds);
    }

    #[test]
    fn hidden_pixels_move_behind_relevant_ones() {
        let (values, mut masks) = block(|i| [i as i32, 1, 2, 3]);
        masks[0] = [0; 4];
        masks[5] = [0; 4];

        let area = Area::build(&values, &masks, &ALL);

        assert_eq!(area.count, 16);
        assert_eq!(area.active, 14);
        assert_eq!(area.zero_index, 0);
        assert_eq!(&area.indices[14..], &[0, 5]);
        assert_eq!(area.masks[15], [0; 4]);
        assert_eq!(area.values[15], [255, 0, 0, 0]);
        assert_eq!(area.min_max[CH_A], [1, 15]);
        assert_eq!(area.pixel_set(), 0xFFFF);
    }

    #[test]
    fn invisible_area_is_neutral() {
        let (values, _) = block(|_| [10, 20, 30, 40]);
        let masks = [[0; 4]; 16];

        let area = Area::build(&values, &masks, &ALL);

        assert_eq!(area.active, 0);
        assert!(area.is_opaque);
        assert_eq!(area.min_max, [[255, 255], [0, 0], [0, 0], [0, 0]]);
        assert_eq!(area.opaque_alpha_error(), 0);
    }
}
