//! Mode 3: two subsets over one of 64 partitions, opaque 7-bit RGB with a parity bit per
//! endpoint and 2-bit indices.

use crate::{
    counters::Counters,
    encode::{
        area::Area,
        cell::Cell,
        common::{BlockError, K_BLOCK_MAXIMAL_ERROR, WEIGHTS_GB, WEIGHTS_GR, WEIGHTS_GRB},
        levels::{estimate_channel_levels_minimum, LevelsBuffer, LevelsScratch},
        modes::{endpoint_pair, round_bounds_with_parity, Context},
        subset::{compute_subset_table, index_table, reduce_index_table, subset_error, Modulations},
        tables::levels2_8,
    },
    format::{is_anchor, BitWriter, Encoding, Endpoints, CH_A, CH_B, CH_G, CH_R, WEIGHT2},
};

const MODE: u8 = 3;

const LEVELS: usize = 32;

type Levels = LevelsBuffer<LEVELS>;

const OPAQUE: [u8; 2] = [255, 255];

/// Tries the rounded bounds of every partition.
///
/// Alpha is always 255, so every candidate starts from the opaque alpha error of the block.
pub(crate) fn compress_block_fast(cell: &mut Cell, _ctx: &Context) {
    let alpha_error = cell.opaque_alpha_error;

    for partition in 0..64 {
        let water = cell.error.total;
        if water <= alpha_error {
            break;
        }

        let mut error = alpha_error;
        let mut colors = [[[0u8; 2]; 4]; 3];

        for (subset, area) in cell.ensure_area2(partition).iter().enumerate() {
            let endpoints = round_bounds_with_parity(area, &[CH_G, CH_R, CH_B], &WEIGHTS_GRB);
            error += subset_error(area, &endpoints, &WEIGHTS_GRB, None, &WEIGHT2, water - error);
            colors[subset] = endpoints;

            if error >= water {
                break;
            }
        }

        if error < water {
            cell.error.total = error;
            cell.best = Encoding {
                mode: MODE,
                parameter: partition as u32,
                colors,
            };
        }
    }
}

fn init_levels<const PBITS: i32>(
    area: &Area,
    water: i32,
    scratch: &mut LevelsScratch,
    counters: Option<&Counters>,
) -> Option<[Levels; 4]> {
    let mut levels = [Levels::default(); 4];
    levels[CH_A].set_zero_error(0xFFFF);

    let mut floor = 0;

    for channel in [CH_G, CH_R, CH_B] {
        let level = &mut levels[channel];
        level.compute_channel_levels_reduced::<7, PBITS, false>(
            area,
            levels2_8(),
            channel,
            WEIGHTS_GRB[channel],
            water - floor,
            scratch,
            counters,
        );

        if level.count == 0 {
            return None;
        }

        floor += level.min_err;
        if floor >= water {
            return None;
        }
    }

    Some(levels)
}

/// Joint search over the color candidates, all channels share one index.
fn try_variants(area: &Area, levels: &[Levels; 4], water: &mut i32) -> Option<Endpoints> {
    let min_r = levels[CH_R].min_err;
    let min_b = levels[CH_B].min_err;

    let mut best = None;

    let mut mem_gb = [-1i32; LEVELS];

    for g in levels[CH_G].nodes() {
        if g.error + min_r + min_b >= *water {
            break;
        }

        mem_gb.fill(-1);

        for r in levels[CH_R].nodes() {
            if g.error + r.error + min_b >= *water {
                break;
            }

            let endpoints = [OPAQUE, endpoint_pair(g.color), endpoint_pair(r.color), [0; 2]];
            let e_r = subset_error(area, &endpoints, &WEIGHTS_GR, None, &WEIGHT2, *water - min_b);
            if e_r + min_b >= *water {
                continue;
            }

            for (ib, b) in levels[CH_B].nodes().iter().enumerate() {
                if e_r + b.error >= *water {
                    break;
                }

                let endpoints = [
                    OPAQUE,
                    endpoint_pair(g.color),
                    endpoint_pair(r.color),
                    endpoint_pair(b.color),
                ];

                let e_gb = if mem_gb[ib] >= 0 {
                    mem_gb[ib]
                } else {
                    let e = subset_error(
                        area,
                        &endpoints,
                        &WEIGHTS_GB,
                        None,
                        &WEIGHT2,
                        *water - min_r,
                    );
                    mem_gb[ib] = e;
                    e
                };
                if e_gb + min_r >= *water {
                    continue;
                }

                let e_b = subset_error(area, &endpoints, &WEIGHTS_GRB, None, &WEIGHT2, *water);
                if *water > e_b {
                    *water = e_b;
                    best = Some(endpoints);

                    if e_b <= 0 {
                        return best;
                    }
                }
            }
        }
    }

    best
}

fn compress_subset<const PBITS: i32>(
    area: &Area,
    water: i32,
    scratch: &mut LevelsScratch,
    counters: Option<&Counters>,
) -> Option<(i32, Endpoints)> {
    let levels = init_levels::<PBITS>(area, water, scratch, counters)?;

    let mut water = water;
    let best = try_variants(area, &levels, &mut water)?;

    Some((water, best))
}

/// Searches both subsets of `partition` over the four parity combinations.
///
/// Each subset starts from its current endpoints when the block already uses `partition`, from
/// the rounded bounds otherwise, and has to stay below what the other subset leaves of the block
/// error.
fn search_partition(cell: &mut Cell, partition: usize, ctx: &Context) {
    type Search = fn(&Area, i32, &mut LevelsScratch, Option<&Counters>) -> Option<(i32, Endpoints)>;

    const PARITIES: [Search; 4] = [
        compress_subset::<0x000>,
        compress_subset::<0x001>,
        compress_subset::<0x100>,
        compress_subset::<0x101>,
    ];

    let alpha_error = cell.opaque_alpha_error;
    let water = cell.error.total;
    if water <= alpha_error {
        return;
    }

    let areas = *cell.ensure_area2(partition);
    let current = cell.best.mode == MODE && cell.best.parameter as usize & 63 == partition;

    let mut colors = [[[0u8; 2]; 4]; 3];
    let mut errors = [0i32; 2];
    for (subset, area) in areas.iter().enumerate() {
        colors[subset] = if current {
            cell.best.colors[subset]
        } else {
            round_bounds_with_parity(area, &[CH_G, CH_R, CH_B], &WEIGHTS_GRB)
        };
        errors[subset] = subset_error(
            area,
            &colors[subset],
            &WEIGHTS_GRB,
            None,
            &WEIGHT2,
            K_BLOCK_MAXIMAL_ERROR,
        );
    }

    for subset in 0..2 {
        let mut bound = errors[subset].min(water - alpha_error - errors[1 - subset]);

        for search in PARITIES {
            if bound <= 0 {
                break;
            }

            if let Some((error, endpoints)) =
                search(&areas[subset], bound, &mut cell.scratch, ctx.counters)
            {
                bound = error;
                errors[subset] = error;
                colors[subset] = endpoints;
            }
        }
    }

    let error = alpha_error + errors[0] + errors[1];
    if error < water {
        cell.error.total = error;
        cell.best = Encoding {
            mode: MODE,
            parameter: partition as u32,
            colors,
        };
    }
}

/// Full search of the partition the block currently uses.
pub(crate) fn compress_block(cell: &mut Cell, ctx: &Context) {
    let partition = if cell.best.mode == MODE {
        cell.best.parameter as usize & 63
    } else {
        0
    };
    search_partition(cell, partition, ctx);
}

/// Full search of every partition except the one already searched.
pub(crate) fn compress_block_full(cell: &mut Cell, ctx: &Context) {
    for partition in 0..64 {
        if cell.error.total <= cell.opaque_alpha_error {
            break;
        }
        if cell.personal_mode == MODE && cell.personal_parameter as usize & 63 == partition {
            continue;
        }

        search_partition(cell, partition, ctx);
    }
}

/// Opaque alpha error plus the smallest sum of per channel minimums over the partitions.
///
/// Partitions whose areas are not built yet bound the colors by zero.
pub(crate) fn estimate_floor(cell: &Cell, ctx: &Context) -> i32 {
    let alpha_error = cell.opaque_alpha_error;
    let water = cell.error.total - alpha_error;

    let mut color = i32::MAX;
    for partition in 0..64 {
        let Some(areas) = cell.area2(partition) else {
            color = 0;
            break;
        };

        let mut sum = 0i32;
        for area in areas {
            for channel in [CH_G, CH_R, CH_B] {
                sum = sum.saturating_add(estimate_channel_levels_minimum::<8>(
                    area,
                    levels2_8(),
                    channel,
                    WEIGHTS_GRB[channel],
                    water,
                    ctx.counters,
                ));
            }
        }

        color = color.min(sum);
        if color == 0 {
            break;
        }
    }

    alpha_error.saturating_add(color)
}

pub(crate) fn final_pack_block(cell: &mut Cell) -> [u8; 16] {
    let partition = cell.best.parameter as usize & 63;
    let areas = *cell.ensure_area2(partition);
    let mut colors = cell.best.colors;

    let mut color_error = 0;
    let mut indices = 0u64;

    for (subset, area) in areas.iter().enumerate() {
        let mut state = Modulations::from_endpoints(&colors[subset], &WEIGHT2);
        state.clear_channel(CH_A);
        color_error += compute_subset_table(area, &WEIGHTS_GRB, &mut state, 4);

        let mut table = index_table(area, &state, 2);
        reduce_index_table(area, 2, &mut table, &mut colors[subset], &[CH_A, CH_G, CH_R, CH_B]);
        indices |= table;
    }

    let alpha_error = cell.opaque_alpha_error;
    cell.error = BlockError::new(alpha_error, alpha_error + color_error);
    cell.best.colors = colors;

    let mut writer = BitWriter::default();
    writer.write(1 << MODE, MODE as u32 + 1);
    writer.write(partition as u64, 6);
    for channel in [CH_R, CH_G, CH_B] {
        for endpoints in &colors[..2] {
            for &v in &endpoints[channel] {
                writer.write((v >> 1) as u64, 7);
            }
        }
    }
    for endpoints in &colors[..2] {
        for &v in &endpoints[CH_R] {
            writer.write((v & 1) as u64, 1);
        }
    }
    writer.write_indices(indices, 2, |pixel| is_anchor(2, partition, pixel));

    writer.finish()
}
