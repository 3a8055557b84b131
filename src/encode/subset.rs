//! Index selection for fixed endpoints and the partial error of endpoint candidates.

use crate::{
    encode::{
        area::Area,
        common::{
            denoised_error, K_ALPHA, K_BLOCK_MAXIMAL_ERROR, K_COLOR, K_DENOISE, K_DENOISE_STEP,
        },
        metrics::SsimSums,
    },
    format::{interpolate, Endpoints},
};

/// Interpolated values of one endpoint pair and the index chosen for every area entry.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Modulations {
    /// Interpolated value per index, A, G, R, B.
    pub values: [[i32; 4]; 16],
    /// Index currently tried per area entry.
    pub loops: [usize; 16],
    /// Equally good indices per area entry as a bit set, zero when there is no choice.
    pub ways: [u32; 16],
    /// Chosen index per area entry.
    pub best: [usize; 16],
}

impl Default for Modulations {
    fn default() -> Self {
        Self {
            values: [[0; 4]; 16],
            loops: [0; 16],
            ways: [0; 16],
            best: [0; 16],
        }
    }
}

impl Modulations {
    /// Interpolates every channel of `endpoints` with `weights`.
    pub(crate) fn from_endpoints(endpoints: &Endpoints, weights: &[i32]) -> Self {
        let mut state = Self::default();
        for (k, &w) in weights.iter().enumerate() {
            for (c, pair) in endpoints.iter().enumerate() {
                state.values[k][c] = interpolate(pair[0] as i32, pair[1] as i32, w);
            }
        }
        state
    }

    /// Clears a channel in every interpolated value.
    pub(crate) fn clear_channel(&mut self, channel: usize) {
        for value in self.values.iter_mut() {
            value[channel] = 0;
        }
    }
}

/// Indices that are not a duplicate of a neighbour, as a bit set over `m` values.
///
/// The lower half keeps the first of equal neighbours, the upper half the last one. Bits at and
/// above `m` stay clear.
fn good_positions(values: &[[i32; 4]; 16], m: usize) -> u32 {
    let half = m >> 1;
    let mut good = (1u32 << m) - 1;

    for i in 1..half {
        good ^= ((values[i - 1] == values[i]) as u32) << i;
    }
    for i in (half..=m - 2).rev() {
        good ^= ((values[i + 1] == values[i]) as u32) << i;
    }
    good &= !(((values[half - 1] == values[half]) as u32) << half);
    good ^= ((values[0] == values[m - 1]) as u32) << (m - 1);

    good
}

/// Weighted structural similarity of the chosen indices against the area.
fn selection_ssim(area: &Area, state: &Modulations, weights: &[i32; 4]) -> f64 {
    let n = area.count as f64;

    (0..4)
        .filter(|&c| weights[c] != 0)
        .map(|c| {
            let mut sums = SsimSums::default();
            for i in 0..area.count {
                let b = state.values[state.loops[i]][c] & area.masks[i][c];
                sums.add(area.values[i][c], b);
            }
            sums.ssim(n) * weights[c] as f64
        })
        .sum()
}

/// Picks the index of every area entry for the first `m` values of `state`.
///
/// Every entry takes the index with the smallest denoised error, the full squared distance
/// breaks ties. Entries that keep more than one equally good index are then resolved by the
/// combination with the best structural similarity. Returns the summed denoised error.
pub(crate) fn compute_subset_table(
    area: &Area,
    weights: &[i32; 4],
    state: &mut Modulations,
    m: usize,
) -> i32 {
    debug_assert!(m >= 4 && m <= 16);

    let denoise_step = K_DENOISE_STEP * if area.is_opaque { K_COLOR } else { K_COLOR + K_ALPHA };

    let good = good_positions(&state.values, m);

    let mut error_block = 0;

    for i in 0..area.count {
        let pixel = &area.values[i];
        let mask = &area.masks[i];

        let mut positions = [-1i32; 16];
        let mut position = 0;
        let mut bottom = K_BLOCK_MAXIMAL_ERROR;
        let mut bottom_full = i32::MAX;

        for (j, slot) in positions.iter_mut().enumerate().take(m) {
            let mut error = 0;
            let mut error_full = 0;
            for c in 0..4 {
                if mask[c] != 0 {
                    let x = state.values[j][c] - pixel[c];
                    error += denoised_error(x, weights[c]);
                    error_full += x * x * weights[c];
                }
            }

            if bottom > error || (bottom == error && bottom_full > error_full) {
                bottom = error;
                bottom_full = error_full;
                position = j;
            }

            *slot = if bottom != error || bottom_full != error_full {
                -1
            } else {
                position as i32
            };
        }

        error_block += bottom;

        let mut way = positions[..m]
            .iter()
            .enumerate()
            .fold(0u32, |way, (j, &p)| way | ((p == position as i32) as u32) << j);
        way &= good;

        if (bottom << (2 * K_DENOISE)) <= denoise_step {
            way &= !way.wrapping_sub(1);
        }

        way |= 1 << m;

        state.ways[i] = if way & way.wrapping_sub(1) & good != 0 {
            way
        } else {
            0
        };
        state.loops[i] = way.trailing_zeros() as usize;
        state.best[i] = state.loops[i];
    }

    if state.ways[..area.count].iter().all(|&way| way == 0) {
        return error_block;
    }

    let mut best = -f64::from(K_ALPHA + K_COLOR) - 0.1;

    loop {
        let score = selection_ssim(area, state, weights);
        if best < score {
            best = score;
            state.best = state.loops;
        }

        let mut i = 0;
        loop {
            let way = state.ways[i];
            if way != 0 {
                let mut k = state.loops[i] + 1;
                while way & (1 << k) == 0 {
                    k += 1;
                }

                if k < m {
                    state.loops[i] = k;
                    break;
                }

                state.loops[i] = way.trailing_zeros() as usize;
            }

            i += 1;
            if i >= area.count {
                return error_block;
            }
        }
    }
}

/// Error of an endpoint pair over `area` when every pixel picks its nearest interpolant.
///
/// The channels other than `scalar` share one index, the `scalar` channel picks its own.
/// Stops summing once the error reaches `water`.
pub(crate) fn subset_error(
    area: &Area,
    endpoints: &Endpoints,
    weights: &[i32; 4],
    scalar: Option<usize>,
    interpolation: &[i32],
    water: i32,
) -> i32 {
    let mut points = [[0i32; 4]; 16];
    for (k, &w) in interpolation.iter().enumerate() {
        for c in 0..4 {
            points[k][c] = interpolate(endpoints[c][0] as i32, endpoints[c][1] as i32, w);
        }
    }
    let points = &points[..interpolation.len()];

    let mut error = 0;

    for i in 0..area.active {
        let pixel = &area.values[i];
        let mask = &area.masks[i];

        let shared = points
            .iter()
            .map(|point| {
                (0..4)
                    .filter(|&c| Some(c) != scalar && mask[c] != 0)
                    .map(|c| denoised_error(point[c] - pixel[c], weights[c]))
                    .sum::<i32>()
            })
            .min()
            .unwrap_or(0);

        let single = match scalar {
            Some(c) if mask[c] != 0 => points
                .iter()
                .map(|point| denoised_error(point[c] - pixel[c], weights[c]))
                .min()
                .unwrap_or(0),
            _ => 0,
        };

        error += shared + single;
        if error >= water {
            break;
        }
    }

    error
}

/// Makes sure the anchor of `area` has a zero top index bit.
///
/// `indices` holds `bits` per pixel slot. When the anchor's top bit is set, all indices of the
/// area are complemented and the endpoints of `lanes` are swapped.
pub(crate) fn reduce_index_table(
    area: &Area,
    bits: usize,
    indices: &mut u64,
    endpoints: &mut Endpoints,
    lanes: &[usize],
) {
    let top_bit = area.zero_index * bits + bits - 1;
    if (*indices >> top_bit) & 1 == 0 {
        return;
    }

    let full = (1u64 << bits) - 1;
    let mask = area.indices[..area.count]
        .iter()
        .fold(0u64, |mask, &pixel| mask | full << (pixel as usize * bits));

    *indices ^= mask;
    for &lane in lanes {
        endpoints[lane].swap(0, 1);
    }
}

/// Error of one channel under the chosen indices.
pub(crate) fn selection_error(area: &Area, state: &Modulations, channel: usize, weight: i32) -> i32 {
    (0..area.count)
        .filter(|&i| area.masks[i][channel] != 0)
        .map(|i| {
            let diff = state.values[state.best[i]][channel] - area.values[i][channel];
            denoised_error(diff, weight)
        })
        .sum()
}

/// Packs the chosen indices of `state` into `bits` per pixel slot.
pub(crate) fn index_table(area: &Area, state: &Modulations, bits: usize) -> u64 {
    (0..area.count).fold(0u64, |table, i| {
        table | (state.best[i] as u64) << (area.indices[i] as usize * bits)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        encode::common::{WEIGHTS_AGRB, WEIGHTS_GRB},
        format::{CH_G, WEIGHT2, WEIGHT4},
    };

    const ALL: [u8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];

    fn area_of(values: impl Fn(usize) -> [i32; 4]) -> Area {
        let mut v = [[0; 4]; 16];
        for (i, p) in v.iter_mut().enumerate() {
            *p = values(i);
        }
        Area::build(&v, &[[-1; 4]; 16], &ALL)
    }

    #[test]
    fn duplicates_are_not_good() {
        let endpoints: Endpoints = [[255, 255], [10, 10], [10, 10], [10, 10]];
        let state = Modulations::from_endpoints(&endpoints, &WEIGHT2);
        assert_eq!(good_positions(&state.values, 4), 0b0001);

        let endpoints: Endpoints = [[255, 255], [0, 255], [0, 255], [0, 255]];
        let state = Modulations::from_endpoints(&endpoints, &WEIGHT2);
        assert_eq!(good_positions(&state.values, 4), 0b1111);
    }

    #[test]
    fn exact_interpolants_are_picked() {
        let endpoints: Endpoints = [[255, 255], [0, 252], [0, 0], [0, 0]];
        let mut state = Modulations::from_endpoints(&endpoints, &WEIGHT2);
        let area = area_of(|i| [255, state.values[i & 3][CH_G], 0, 0]);

        let error = compute_subset_table(&area, &WEIGHTS_GRB, &mut state, 4);

        assert_eq!(error, 0);
        for i in 0..16 {
            assert_eq!(state.best[i], i & 3);
        }
    }

    #[test]
    fn single_choices_leave_nothing_to_resolve() {
        let endpoints: Endpoints = [[255, 255], [0, 252], [0, 0], [0, 0]];
        let mut state = Modulations::from_endpoints(&endpoints, &WEIGHT2);
        let area = area_of(|i| [255, state.values[i & 3][CH_G], 0, 0]);

        compute_subset_table(&area, &WEIGHTS_GRB, &mut state, 4);

        assert_eq!(state.ways, [0; 16]);
        assert_eq!(good_positions(&state.values, 4) >> 4, 0);
    }

    #[test]
    fn table_error_matches_partial_error() {
        let endpoints: Endpoints = [[255, 255], [12, 200], [40, 90], [3, 250]];
        let area = area_of(|i| {
            let t = (i as i32 * 53) % 256;
            [255, t, (t + 30) % 256, 255 - t]
        });

        let mut state = Modulations::from_endpoints(&endpoints, &WEIGHT4);
        let table = compute_subset_table(&area, &WEIGHTS_AGRB, &mut state, 16);
        let partial = subset_error(&area, &endpoints, &WEIGHTS_AGRB, None, &WEIGHT4, i32::MAX);

        assert_eq!(table, partial);
    }

    #[test]
    fn scalar_channel_picks_its_own_index() {
        let endpoints: Endpoints = [[0, 255], [0, 255], [0, 0], [0, 0]];
        let area = area_of(|i| if i & 1 == 0 { [0, 255, 0, 0] } else { [255, 0, 0, 0] });

        let shared = subset_error(&area, &endpoints, &WEIGHTS_AGRB, None, &WEIGHT2, i32::MAX);
        let split =
            subset_error(&area, &endpoints, &WEIGHTS_AGRB, Some(CH_G), &WEIGHT2, i32::MAX);

        assert!(shared > 0);
        assert_eq!(split, 0);
    }

    #[test]
    fn partial_error_stops_at_water() {
        let endpoints: Endpoints = [[255, 255], [0, 0], [0, 0], [0, 0]];
        let area = area_of(|_| [255, 255, 255, 255]);

        let error = subset_error(&area, &endpoints, &WEIGHTS_AGRB, None, &WEIGHT2, 1);
        assert!(error >= 1);
        assert!(error < subset_error(&area, &endpoints, &WEIGHTS_AGRB, None, &WEIGHT2, i32::MAX));
    }

    #[test]
    fn reduction_clears_the_anchor_bit() {
        let area = area_of(|_| [255, 0, 0, 0]);
        let mut endpoints: Endpoints = [[1, 2], [3, 4], [5, 6], [7, 8]];
        let mut indices = 0b11u64 | 0b01 << 2;

        reduce_index_table(&area, 2, &mut indices, &mut endpoints, &[1, 2, 3]);

        assert_eq!(indices & 0b1111, 0b10 << 2);
        assert_eq!(indices >> 4, (1 << 28) - 1);
        assert_eq!(endpoints, [[1, 2], [4, 3], [6, 5], [8, 7]]);

        let before = indices;
        reduce_index_table(&area, 2, &mut indices, &mut endpoints, &[1, 2, 3]);
        assert_eq!(indices, before);
    }
}
