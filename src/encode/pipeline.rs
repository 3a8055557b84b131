//! The per block cascade: decode what the destination holds, run the configured search stages
//! and re-pack when one of them found a better encoding.

#[cfg(feature = "self-check")]
use tracing::error;

use crate::{
    decode::decode_block,
    encode::{
        cell::Cell,
        common::{BlockSsim, K_ALPHA, K_COLOR, K_DENOISE_STEP},
        metrics::{compare_blocks, compare_blocks_ssim, detect_glitches},
        modes::{mode_ops, Context},
    },
};

/// Mode 6 with all endpoints and indices zero, decodes to transparent black.
const EMPTY_BLOCK: [u8; 16] = [0x40, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];

/// Fast heuristics that can express transparency, in cascade order.
const FAST_TRANSPARENT: [u8; 2] = [6, 5];
/// Fast heuristics of the opaque modes.
const FAST_OPAQUE: [u8; 1] = [3];
const FULL_NORMAL: [u8; 1] = [5];
const FULL_SLOW: [u8; 2] = [3, 6];

/// Smallest alpha that still lets the opaque modes compete, in the fast and the full stages.
const OPAQUE_MODES_MIN_ALPHA: i32 = 239;

/// Compresses the loaded `cell` into `output`.
///
/// `output` holds the starting encoding and is only replaced by a block with a strictly smaller
/// error. Leaves the exact error of `output` in `cell.error` and its similarity in
/// `cell.quality`.
pub(crate) fn compress_cell(cell: &mut Cell, output: &mut [u8; 16], ctx: &Context) {
    if ctx.settings.is_draft() && output[0] == 0 {
        *output = EMPTY_BLOCK;
    }

    let decoded = decode_block(output);
    cell.adopt(&decoded);
    cell.error = compare_blocks(cell, &decoded.pixels);

    if cell.error.total <= 0 {
        cell.quality = BlockSsim::PERFECT;
        if let Some(counters) = ctx.counters {
            counters.add_already_encoded();
            counters.add_mode(cell.best.mode);
        }
        return;
    }

    let pixels = if ctx.settings.is_draft() {
        search(cell, output, ctx)
    } else {
        decoded.pixels
    };

    if let Some(counters) = ctx.counters {
        if detect_glitches(cell, &pixels) {
            counters.add_glitch();
        }
        counters.add_mode(cell.best.mode);
    }

    cell.quality = compare_blocks_ssim(cell, &pixels);
}

/// Runs the search stages and returns the decoded pixels of the final `output`.
fn search(cell: &mut Cell, output: &mut [u8; 16], ctx: &Context) -> [[u8; 4]; 16] {
    #[cfg(feature = "self-check")]
    let saved = *output;

    cell.build_area1();

    let water = cell.error.total;

    let channels = if cell.area1.is_opaque {
        K_COLOR
    } else {
        K_COLOR + K_ALPHA
    };
    cell.denoise_step = cell.area1.active as i32 * ((K_DENOISE_STEP * channels) >> 2);
    cell.opaque_alpha_error = cell.area1.opaque_alpha_error();

    if let Some(counters) = ctx.counters {
        counters.add_compressed();
    }

    for mode in FAST_TRANSPARENT {
        if cell.error.total <= cell.denoise_step {
            break;
        }
        if let Some(fast) = mode_ops(mode).fast {
            fast(cell, ctx);
        }
    }

    let opaque_modes = cell.area1.min_alpha() > OPAQUE_MODES_MIN_ALPHA;

    if opaque_modes {
        for mode in FAST_OPAQUE {
            if cell.error.total <= cell.opaque_alpha_error + cell.denoise_step {
                break;
            }
            if let Some(fast) = mode_ops(mode).fast {
                fast(cell, ctx);
            }
        }
    }

    if ctx.settings.is_normal() {
        let ops = mode_ops(cell.best.mode);
        let reachable = if ops.opaque { cell.opaque_alpha_error } else { 0 };
        if cell.error.total > reachable {
            if let Some(thorough) = ops.thorough {
                thorough(cell, ctx);
            }
        }

        cell.personal_mode = cell.best.mode;
        cell.personal_parameter = cell.best.parameter;

        let slow: &[u8] = if ctx.settings.is_slow() { &FULL_SLOW } else { &[] };

        for &mode in FULL_NORMAL.iter().chain(slow) {
            let ops = mode_ops(mode);
            let settled = if ops.opaque {
                if !opaque_modes {
                    continue;
                }
                cell.opaque_alpha_error + cell.denoise_step
            } else {
                cell.denoise_step
            };

            if cell.error.total <= settled {
                continue;
            }

            if let (Some(full), Some(floor)) = (ops.full, ops.floor) {
                if floor(cell, ctx) < cell.error.total {
                    full(cell, ctx);
                }
            }
        }
    }

    if water > cell.error.total {
        if let Some(pack) = mode_ops(cell.best.mode).pack {
            *output = pack(cell);
        }
    }

    let decoded = decode_block(output);

    #[cfg(feature = "self-check")]
    {
        let actual = compare_blocks(cell, &decoded.pixels);
        if actual != cell.error {
            error!(
                block = ?output,
                mode = cell.best.mode,
                expected = ?cell.error,
                actual = ?actual,
                "packed block does not reproduce its recorded error"
            );

            *output = saved;
            let decoded = decode_block(output);
            cell.adopt(&decoded);
            cell.error = compare_blocks(cell, &decoded.pixels);
            return decoded.pixels;
        }
    }

    cell.adopt(&decoded);
    decoded.pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        counters::Counters,
        encode::{common::BlockError, SourceBlock},
        format::{partition_subset, CH_A},
        Bc7Settings,
    };

    fn source_of(pixel: impl Fn(usize) -> [u8; 4]) -> SourceBlock {
        let mut pixels = [[0u8; 16]; 4];
        for i in 0..16 {
            pixels[i >> 2][(i & 3) * 4..(i & 3) * 4 + 4].copy_from_slice(&pixel(i));
        }
        SourceBlock {
            pixels,
            mask: [[-1; 16]; 4],
        }
    }

    fn noisy(i: usize) -> [u8; 4] {
        let h = (i as u32).wrapping_mul(2_654_435_761) >> 7;
        [
            (h & 0xFF) as u8,
            ((h >> 8) & 0xFF) as u8,
            (i * 16) as u8,
            200 + (i as u8 & 7) * 7,
        ]
    }

    fn run(source: &SourceBlock, output: &mut [u8; 16], settings: Bc7Settings) -> Cell {
        let ctx = Context {
            settings,
            counters: None,
        };
        let mut cell = Cell::default();
        cell.load(source);
        compress_cell(&mut cell, output, &ctx);
        cell
    }

    #[test]
    fn uniform_block_compresses_exactly() {
        let source = source_of(|_| [40, 80, 120, 255]);
        let mut output = [0u8; 16];
        let cell = run(&source, &mut output, Bc7Settings::draft());

        assert_eq!(cell.error, BlockError::new(0, 0));
        assert_eq!(decode_block(&output).encoding.mode, 6);
    }

    #[test]
    fn recorded_error_matches_the_output() {
        let source = source_of(noisy);

        for settings in [Bc7Settings::draft(), Bc7Settings::normal(), Bc7Settings::slow()] {
            let mut output = [0u8; 16];
            let cell = run(&source, &mut output, settings);

            let decoded = decode_block(&output);
            assert_eq!(compare_blocks(&cell, &decoded.pixels), cell.error);
        }
    }

    #[test]
    fn more_effort_never_hurts() {
        let source = source_of(noisy);

        let errors: Vec<i32> = [Bc7Settings::draft(), Bc7Settings::normal(), Bc7Settings::slow()]
            .into_iter()
            .map(|settings| run(&source, &mut [0u8; 16], settings).error.total)
            .collect();

        assert!(errors[1] <= errors[0]);
        assert!(errors[2] <= errors[1]);
    }

    #[test]
    fn decoded_output_is_already_encoded() {
        let source = source_of(noisy);
        let mut output = [0u8; 16];
        run(&source, &mut output, Bc7Settings::slow());

        let decoded = decode_block(&output);
        let reproduced = source_of(|i| {
            let [a, g, r, b] = decoded.pixels[i];
            [b, g, r, a]
        });

        let counters = Counters::new();
        let ctx = Context {
            settings: Bc7Settings::slow(),
            counters: Some(&counters),
        };
        let mut cell = Cell::default();
        cell.load(&reproduced);

        let before = output;
        compress_cell(&mut cell, &mut output, &ctx);

        assert_eq!(output, before);
        assert_eq!(cell.error.total, 0);
        assert_eq!(counters.already_encoded(), 1);
        assert_eq!(counters.compressed(), 0);
    }

    #[test]
    fn invisible_block_costs_nothing() {
        let mut source = source_of(noisy);
        source.mask = [[0; 16]; 4];

        let mut output = [0u8; 16];
        let cell = run(&source, &mut output, Bc7Settings::slow());

        assert_eq!(cell.error, BlockError::new(0, 0));
        assert_eq!(output, EMPTY_BLOCK);
    }

    #[test]
    fn without_draft_the_destination_is_kept() {
        let source = source_of(noisy);
        let mut output = [0u8; 16];
        let cell = run(&source, &mut output, Bc7Settings::none());

        assert_eq!(output, [0u8; 16]);
        assert!(cell.error.total > 0);
    }

    #[test]
    fn transparent_pixels_keep_their_alpha() {
        let source = source_of(|i| [(i * 9) as u8, 60, 90, if i < 8 { 0 } else { 255 }]);
        let mut output = [0u8; 16];
        run(&source, &mut output, Bc7Settings::normal());

        let decoded = decode_block(&output);
        assert!(decoded.pixels[..8].iter().all(|p| p[CH_A] <= 16));
        assert!(decoded.pixels[8..].iter().all(|p| p[CH_A] >= 239));
    }

    #[test]
    fn opaque_two_region_blocks_get_the_deep_searches() {
        // Green of subset 0 sits on the inner levels of a 2-bit ramp that rounding misses.
        let source = source_of(|i| {
            if partition_subset(2, 13, i) == 0 {
                [60, [0, 83, 169][i % 3], 100, 255]
            } else {
                [200, 30, 90, 255]
            }
        });

        let draft = run(&source, &mut [0u8; 16], Bc7Settings::draft());
        let normal = run(&source, &mut [0u8; 16], Bc7Settings::normal());

        let mut output = [0u8; 16];
        let slow = run(&source, &mut output, Bc7Settings::slow());

        assert!(draft.error.total > 0);
        assert!(normal.error.total <= draft.error.total);
        assert_eq!(slow.error, BlockError::new(0, 0));
        assert_eq!(decode_block(&output).encoding.mode, 3);
    }
}
