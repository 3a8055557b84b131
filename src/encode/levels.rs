//! Candidate endpoint pairs of one channel, ordered by their smallest possible error.

use crate::{
    counters::Counters,
    encode::{
        area::Area,
        common::{K_BLOCK_MAXIMAL_ERROR, K_DENOISE},
        estimate::{batch_full, batch_minimum, batch_short, BATCH},
        radix::{radix_sort, radix_sort_short, Node, NodeShort},
        tables::LevelsTable,
    },
    format::expand,
};

/// Reusable candidate storage of one worker.
#[derive(Default)]
pub(crate) struct LevelsScratch {
    short: Vec<NodeShort>,
    short_work: Vec<NodeShort>,
    full: Vec<Node>,
    full_work: Vec<Node>,
}

/// Table rows of the pixels whose `channel` is visible.
fn channel_rows<'t>(
    area: &Area,
    table: &'t LevelsTable,
    channel: usize,
) -> ([&'t [u8]; 16], usize) {
    let mut rows: [&[u8]; 16] = [&[]; 16];
    let mut n = 0;
    for i in 0..area.active {
        if area.masks[i][channel] != 0 {
            rows[n] = table.row(area.values[i][channel]);
            n += 1;
        }
    }
    (rows, n)
}

/// Largest distance whose denoised square stays below `top`, in 8-bit units.
fn search_radius(top: i32) -> i32 {
    let mut d = f64::from(top).sqrt() as i32;
    while d > 0 && d * d >= top {
        d -= 1;
    }
    while (d + 1) * (d + 1) < top {
        d += 1;
    }
    (d << K_DENOISE) + (1 << K_DENOISE) - 1
}

/// Code range `(lh, hl)`: the largest useful low code and the smallest useful high code.
///
/// `bits` is the endpoint precision without parity, `shift` the width of a code in the table.
#[inline(always)]
fn code_range(low: i32, high: i32, d: i32, bits: u32, shift: u32) -> (i32, i32) {
    let tailmask = (1 << (8 - bits)) - 1;

    let lh = (low + d).min(255);
    let hl = (high - d).max(0);

    let lh = (high - (high >> shift) + tailmask).min(lh - (lh >> shift)) & !tailmask;
    let hl = (low - (low >> shift)).max(hl - (hl >> shift) + tailmask) & !tailmask;

    (lh >> (8 - shift), hl >> (8 - shift))
}

/// Parity of the high and the low code for a `PBITS` value.
#[inline(always)]
fn parities(pbits: i32, reverse: bool) -> (i32, i32) {
    let first = pbits & 1;
    let second = (pbits >> 8) & 1;
    if reverse {
        (first, second)
    } else {
        (second, first)
    }
}

/// Visits every batch of table columns `(hi << shift) | lo` inside the code ranges.
///
/// The callback receives the first column and the number of lanes. Without parity the lanes are
/// adjacent, with parity every second column is visited.
#[inline(always)]
fn for_each_batch<const PBITS: i32, const SINGLE: bool>(
    (lh, hl): (i32, i32),
    shift: u32,
    reverse: bool,
    mut visit: impl FnMut(usize, usize),
) {
    let hh = 1i32 << shift;

    if PBITS < 0 {
        for ih in hl..hh {
            let limit = if SINGLE { lh.min(ih) } else { lh };
            let c_h = (ih << shift) as usize;

            let mut il = 0;
            while il <= limit {
                let lanes = ((limit - il + 1) as usize).min(BATCH);
                visit(c_h + il as usize, lanes);
                il += BATCH as i32;
            }
        }
    } else {
        let (p_h, p_l) = parities(PBITS, reverse);

        let mut ih = hl + p_h;
        while ih < hh {
            let limit = if SINGLE { lh.min(ih) } else { lh };
            let c_h = (ih << shift) as usize;

            let mut k = 0;
            while 2 * k <= limit {
                let lanes = ((limit / 2 - k + 1) as usize).min(BATCH);
                visit(c_h + (p_l + 2 * k) as usize, lanes);
                k += BATCH as i32;
            }

            ih += 2;
        }
    }
}

/// Turns a table column into a candidate color.
#[inline(always)]
fn decode_color(column: u32, shift: u32, reverse: bool) -> i32 {
    let mut hi = (column >> shift) as i32;
    let mut lo = (column & ((1 << shift) - 1)) as i32;

    if shift != 8 {
        hi = expand(hi, shift);
        lo = expand(lo, shift);
    }

    if reverse {
        (lo << 8) | hi
    } else {
        (hi << 8) | lo
    }
}

/// Up to `N` candidates for one channel, best first.
#[derive(Copy, Clone, Debug)]
pub(crate) struct LevelsBuffer<const N: usize> {
    pub min_err: i32,
    pub count: usize,
    pub err: [Node; N],
}

impl<const N: usize> Default for LevelsBuffer<N> {
    fn default() -> Self {
        Self {
            min_err: K_BLOCK_MAXIMAL_ERROR,
            count: 0,
            err: [Node::default(); N],
        }
    }
}

impl<const N: usize> LevelsBuffer<N> {
    pub(crate) fn set_zero_error(&mut self, color: i32) {
        self.min_err = 0;
        self.count = 1;
        self.err[0] = Node { error: 0, color };
    }

    /// The candidates found, best first.
    #[inline(always)]
    pub(crate) fn nodes(&self) -> &[Node] {
        &self.err[..self.count]
    }

    /// Collects the endpoint pairs of `channel` whose error can stay below `water`.
    ///
    /// `BITS` is the endpoint precision without parity. `PBITS` is negative for modes without
    /// parity, otherwise it holds the parity of the first endpoint in bit 0 and of the second
    /// endpoint in bit 8. `SINGLE` keeps only the best pair.
    ///
    /// A candidate color holds the first endpoint in its low byte and the second endpoint in its
    /// high byte, both as 8-bit values. For a reversed channel the first endpoint is the high one.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn compute_channel_levels_reduced<
        const BITS: u32,
        const PBITS: i32,
        const SINGLE: bool,
    >(
        &mut self,
        area: &Area,
        table: &LevelsTable,
        channel: usize,
        weight: i32,
        water: i32,
        scratch: &mut LevelsScratch,
        counters: Option<&Counters>,
    ) {
        let (rows, n) = channel_rows(area, table, channel);
        let rows = &rows[..n];

        if n == 0 {
            self.set_zero_error(if PBITS < 0 { 0 } else { PBITS });
            return;
        }

        let top = (water + weight - 1) / weight;
        if top <= 0 {
            return;
        }

        let d = search_radius(top);

        let shift = if PBITS < 0 { BITS } else { BITS + 1 };
        debug_assert_eq!(shift, table.shift());

        let low = area.min_max[channel][0];
        let high = area.min_max[channel][1];

        let reverse = area.is_reversed(channel);

        if low == high && (PBITS < 0 || (PBITS >> 8) == (PBITS & 1)) {
            let exact = if PBITS < 0 {
                expand(low >> (8 - BITS), BITS) == low
            } else {
                (low & 1) == (PBITS & 1)
            };

            if exact {
                self.set_zero_error((high << 8) | low);
                return;
            }
        }

        let range = code_range(low, high, d, BITS, shift);

        let short = top <= 0xFFFF;
        if let Some(c) = counters {
            c.add_levels(n, short);
        }

        if short {
            let top = top as u16;

            scratch.short.clear();
            let nodes = &mut scratch.short;

            for_each_batch::<PBITS, SINGLE>(range, shift, reverse, |base, lanes| {
                let (sums, mut flags) = if PBITS < 0 {
                    batch_short::<1>(rows, base, lanes, top)
                } else {
                    batch_short::<2>(rows, base, lanes, top)
                };

                let step = if PBITS < 0 { 1 } else { 2 };
                while flags != 0 {
                    let lane = flags.trailing_zeros() as usize;
                    nodes.push(NodeShort::new(sums[lane], (base + lane * step) as u16));
                    flags &= flags - 1;
                }
            });

            self.finish_short::<SINGLE>(scratch, weight, shift, reverse);
        } else {
            let bound = top as u32;

            scratch.full.clear();
            let nodes = &mut scratch.full;

            for_each_batch::<PBITS, SINGLE>(range, shift, reverse, |base, lanes| {
                let (sums, mut flags) = if PBITS < 0 {
                    batch_full::<1>(rows, base, lanes, bound)
                } else {
                    batch_full::<2>(rows, base, lanes, bound)
                };

                let step = if PBITS < 0 { 1 } else { 2 };
                while flags != 0 {
                    let lane = flags.trailing_zeros() as usize;
                    nodes.push(Node {
                        error: sums[lane] as i32,
                        color: (base + lane * step) as i32,
                    });
                    flags &= flags - 1;
                }
            });

            self.finish_full::<SINGLE>(scratch, weight, shift, reverse);
        }
    }

    fn finish_short<const SINGLE: bool>(
        &mut self,
        scratch: &mut LevelsScratch,
        weight: i32,
        shift: u32,
        reverse: bool,
    ) {
        let total = scratch.short.len();
        if total == 0 {
            return;
        }

        let sorted: &[NodeShort] = if SINGLE {
            let best = scratch.short.iter().map(|node| node.0).min().unwrap_or(0);
            scratch.short[0] = NodeShort(best);
            &scratch.short[..1]
        } else {
            scratch.short_work.resize(total, NodeShort::default());
            radix_sort_short(&mut scratch.short, &mut scratch.short_work)
        };

        self.count = sorted.len().min(N);
        self.min_err = sorted[0].error() as i32 * weight;

        for (slot, node) in self.err.iter_mut().zip(sorted) {
            *slot = Node {
                error: node.error() as i32 * weight,
                color: decode_color(node.color(), shift, reverse),
            };
        }
    }

    fn finish_full<const SINGLE: bool>(
        &mut self,
        scratch: &mut LevelsScratch,
        weight: i32,
        shift: u32,
        reverse: bool,
    ) {
        let total = scratch.full.len();
        if total == 0 {
            return;
        }

        let sorted: &[Node] = if SINGLE {
            let best = scratch
                .full
                .iter()
                .copied()
                .min_by_key(|node| (node.error, node.color))
                .unwrap_or_default();
            scratch.full[0] = best;
            &scratch.full[..1]
        } else {
            scratch.full_work.resize(total, Node::default());
            radix_sort(&mut scratch.full, &mut scratch.full_work)
        };

        self.count = sorted.len().min(N);
        self.min_err = sorted[0].error.saturating_mul(weight);

        for (slot, node) in self.err.iter_mut().zip(sorted) {
            *slot = Node {
                error: node.error.saturating_mul(weight),
                color: decode_color(node.color as u32, shift, reverse),
            };
        }
    }
}

/// Lower bound of the error of `channel` for `BITS` wide endpoints without parity.
///
/// Returns a value of at least `water` when no pair can stay below it.
pub(crate) fn estimate_channel_levels_minimum<const BITS: u32>(
    area: &Area,
    table: &LevelsTable,
    channel: usize,
    weight: i32,
    water: i32,
    counters: Option<&Counters>,
) -> i32 {
    let (rows, n) = channel_rows(area, table, channel);
    let rows = &rows[..n];

    if n == 0 {
        return 0;
    }

    let top = (water + weight - 1) / weight;
    if top <= 0 {
        return 0;
    }

    let low = area.min_max[channel][0];
    let high = area.min_max[channel][1];
    if low == high {
        return 0;
    }

    if let Some(c) = counters {
        c.add_minimum();
    }

    let shift = BITS;
    debug_assert_eq!(shift, table.shift());

    let d = search_radius(top);
    let range = code_range(low, high, d, BITS, shift);

    let mut best = top as u32;
    for_each_batch::<{ -1 }, true>(range, shift, false, |base, lanes| {
        best = batch_minimum::<1>(rows, base, lanes, best);
    });

    (best.min(top as u32) as i32).saturating_mul(weight)
}
