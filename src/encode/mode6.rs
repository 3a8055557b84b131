//! Mode 6: one subset, 7-bit RGBA with a parity bit per endpoint and 4-bit indices.

use crate::{
    counters::Counters,
    encode::{
        area::Area,
        cell::Cell,
        common::{BlockError, WEIGHTS_AG, WEIGHTS_AGB, WEIGHTS_AGR, WEIGHTS_AGRB, WEIGHTS_AR},
        levels::{estimate_channel_levels_minimum, LevelsBuffer, LevelsScratch},
        modes::{endpoint_pair, round_bounds_with_parity, Context},
        subset::{
            compute_subset_table, index_table, reduce_index_table, selection_error, subset_error,
            Modulations,
        },
        tables::levels4_8,
    },
    format::{BitWriter, Encoding, Endpoints, CH_A, CH_B, CH_G, CH_R, WEIGHT4},
};

const MODE: u8 = 6;

const LEVELS: usize = 48;

type Levels = LevelsBuffer<LEVELS>;

#[inline(always)]
fn encoding(endpoints: Endpoints) -> Encoding {
    let mut colors = [[[0; 2]; 4]; 3];
    colors[0] = endpoints;
    Encoding {
        mode: MODE,
        parameter: 0,
        colors,
    }
}

/// Rounds the bounds to the mode's precision with the better parity per endpoint.
pub(crate) fn compress_block_fast(cell: &mut Cell, _ctx: &Context) {
    let area = &cell.area1;

    let endpoints = round_bounds_with_parity(area, &[CH_A, CH_G, CH_R, CH_B], &WEIGHTS_AGRB);
    let error = subset_error(
        area,
        &endpoints,
        &WEIGHTS_AGRB,
        None,
        &WEIGHT4,
        cell.error.total,
    );

    if error < cell.error.total {
        cell.error.total = error;
        cell.best = encoding(endpoints);
    }
}

fn init_levels<const PBITS: i32>(
    area: &Area,
    water: i32,
    scratch: &mut LevelsScratch,
    counters: Option<&Counters>,
) -> Option<[Levels; 4]> {
    let mut levels = [Levels::default(); 4];
    let mut floor = 0;

    for channel in [CH_A, CH_G, CH_R, CH_B] {
        let level = &mut levels[channel];
        level.compute_channel_levels_reduced::<7, PBITS, false>(
            area,
            levels4_8(),
            channel,
            WEIGHTS_AGRB[channel],
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

/// Joint search over the channel candidates, all channels share one index.
fn try_variants(area: &Area, levels: &[Levels; 4], water: &mut i32) -> Option<Endpoints> {
    let min_g = levels[CH_G].min_err;
    let min_r = levels[CH_R].min_err;
    let min_b = levels[CH_B].min_err;

    let mut best = None;

    let mut mem_ar = [-1i32; LEVELS];
    let mut mem_agb = [-1i32; LEVELS];

    for a in levels[CH_A].nodes() {
        if a.error + min_g + min_r + min_b >= *water {
            break;
        }

        mem_ar.fill(-1);

        for g in levels[CH_G].nodes() {
            if a.error + g.error + min_r + min_b >= *water {
                break;
            }

            let endpoints = [endpoint_pair(a.color), endpoint_pair(g.color), [0; 2], [0; 2]];
            let e_g = subset_error(
                area,
                &endpoints,
                &WEIGHTS_AG,
                None,
                &WEIGHT4,
                *water - min_r - min_b,
            );
            if e_g + min_r + min_b >= *water {
                continue;
            }

            mem_agb.fill(-1);

            for (ir, r) in levels[CH_R].nodes().iter().enumerate() {
                if e_g + r.error + min_b >= *water {
                    break;
                }

                let e_ar = if mem_ar[ir] >= 0 {
                    mem_ar[ir]
                } else {
                    let endpoints = [endpoint_pair(a.color), [0; 2], endpoint_pair(r.color), [0; 2]];
                    let e = subset_error(
                        area,
                        &endpoints,
                        &WEIGHTS_AR,
                        None,
                        &WEIGHT4,
                        *water - min_g - min_b,
                    );
                    mem_ar[ir] = e;
                    e
                };
                if e_ar + min_g + min_b >= *water {
                    continue;
                }

                let endpoints = [
                    endpoint_pair(a.color),
                    endpoint_pair(g.color),
                    endpoint_pair(r.color),
                    [0; 2],
                ];
                let e_r = subset_error(
                    area,
                    &endpoints,
                    &WEIGHTS_AGR,
                    None,
                    &WEIGHT4,
                    *water - min_b,
                );
                if e_r + min_b >= *water {
                    continue;
                }

                for (ib, b) in levels[CH_B].nodes().iter().enumerate() {
                    if e_r + b.error >= *water {
                        break;
                    }

                    let endpoints = [
                        endpoint_pair(a.color),
                        endpoint_pair(g.color),
                        endpoint_pair(r.color),
                        endpoint_pair(b.color),
                    ];

                    let e_agb = if mem_agb[ib] >= 0 {
                        mem_agb[ib]
                    } else {
                        let e = subset_error(
                            area,
                            &endpoints,
                            &WEIGHTS_AGB,
                            None,
                            &WEIGHT4,
                            *water - min_r,
                        );
                        mem_agb[ib] = e;
                        e
                    };
                    if e_agb + min_r >= *water {
                        continue;
                    }

                    let e_b = subset_error(area, &endpoints, &WEIGHTS_AGRB, None, &WEIGHT4, *water);
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

/// Full search over the four parity combinations.
pub(crate) fn compress_block(cell: &mut Cell, ctx: &Context) {
    type Search = fn(&Area, i32, &mut LevelsScratch, Option<&Counters>) -> Option<(i32, Endpoints)>;

    const PARITIES: [Search; 4] = [
        compress_subset::<0x000>,
        compress_subset::<0x001>,
        compress_subset::<0x100>,
        compress_subset::<0x101>,
    ];

    for search in PARITIES {
        if let Some((error, endpoints)) =
            search(&cell.area1, cell.error.total, &mut cell.scratch, ctx.counters)
        {
            cell.error.total = error;
            cell.best = encoding(endpoints);
        }

        if cell.error.total <= 0 {
            break;
        }
    }
}

/// Full search unless it already ran as the thorough search of this block.
pub(crate) fn compress_block_full(cell: &mut Cell, ctx: &Context) {
    if cell.personal_mode != MODE {
        compress_block(cell, ctx);
    }
}

/// Sum of per channel minimums over 8-bit endpoints.
pub(crate) fn estimate_floor(cell: &Cell, ctx: &Context) -> i32 {
    [CH_A, CH_G, CH_R, CH_B]
        .into_iter()
        .map(|channel| {
            estimate_channel_levels_minimum::<8>(
                &cell.area1,
                levels4_8(),
                channel,
                WEIGHTS_AGRB[channel],
                cell.error.total,
                ctx.counters,
            )
        })
        .fold(0i32, |sum, e| sum.saturating_add(e))
}

pub(crate) fn final_pack_block(cell: &mut Cell) -> [u8; 16] {
    let area = &cell.area1;
    let mut endpoints = cell.best.colors[0];

    let mut state = Modulations::from_endpoints(&endpoints, &WEIGHT4);
    let error = compute_subset_table(area, &WEIGHTS_AGRB, &mut state, 16);
    let alpha_error = selection_error(area, &state, CH_A, WEIGHTS_AGRB[CH_A]);

    let mut indices = index_table(area, &state, 4);
    reduce_index_table(area, 4, &mut indices, &mut endpoints, &[CH_A, CH_G, CH_R, CH_B]);

    cell.error = BlockError::new(alpha_error, error);
    cell.best.colors[0] = endpoints;

    let mut writer = BitWriter::default();
    writer.write(1 << MODE, MODE as u32 + 1);
    for channel in [CH_R, CH_G, CH_B, CH_A] {
        for &v in &endpoints[channel] {
            writer.write((v >> 1) as u64, 7);
        }
    }
    for &v in &endpoints[CH_R] {
        writer.write((v & 1) as u64, 1);
    }
    writer.write_indices(indices, 4, |pixel| pixel == 0);

    writer.finish()
}
