//! Mode 5: one subset, 7-bit color with an 8-bit scalar channel that has its own 2-bit indices.
//!
//! The rotation picks the source channel that travels in the alpha slot. Every search works in
//! the source frame and rotates the winning endpoints into the encoded frame at the end.

use crate::{
    counters::{Counters, SearchPath},
    encode::{
        area::Area,
        cell::Cell,
        common::{BlockError, WEIGHTS_AG, WEIGHTS_AGB, WEIGHTS_AGR, WEIGHTS_AGRB, WEIGHTS_AR},
        levels::{estimate_channel_levels_minimum, LevelsBuffer, LevelsScratch},
        modes::{endpoint_pair, Context},
        subset::{
            compute_subset_table, index_table, reduce_index_table, selection_error, subset_error,
            Modulations,
        },
        tables::{levels2_7, levels2_8},
    },
    format::{
        rotate, rotation_channel, BitWriter, Encoding, Endpoints, CH_A, CH_B, CH_G, CH_R, WEIGHT2,
    },
};

const MODE: u8 = 5;

/// Candidates kept per channel.
const LEVELS: usize = 48;

type Levels = LevelsBuffer<LEVELS>;

#[inline(always)]
fn encoding(rotation: u32, endpoints: Endpoints) -> Encoding {
    let mut colors = [[[0; 2]; 4]; 3];
    colors[0] = endpoints;
    Encoding {
        mode: MODE,
        parameter: rotation,
        colors,
    }
}

/// Truncates the rotated bounds to the mode's precision and keeps the best rotation.
pub(crate) fn compress_block_fast(cell: &mut Cell, _ctx: &Context) {
    let area = &cell.area1;

    let source: Endpoints = area.bounds.map(|pair| pair.map(|v| v as u8));

    for rotation in 0..4 {
        let mut encoded = rotate(&source, rotation);
        for lane in [CH_G, CH_R, CH_B] {
            for v in encoded[lane].iter_mut() {
                *v = (*v & 0xFE) | (*v >> 7);
            }
        }

        let error = subset_error(
            area,
            &rotate(&encoded, rotation),
            &WEIGHTS_AGRB,
            Some(rotation_channel(rotation)),
            &WEIGHT2,
            cell.error.total,
        );

        if error < cell.error.total {
            cell.error.total = error;
            cell.best = encoding(rotation, encoded);
        }

        if cell.error.total <= 0 {
            break;
        }
    }
}

/// Collects the candidates of every channel for `rotation`.
///
/// The scalar channel keeps its single best 8-bit pair, the others 7-bit pairs. Returns `None`
/// when the channel minimums alone already reach `water`.
fn init_levels(
    area: &Area,
    rotation: u32,
    water: i32,
    scratch: &mut LevelsScratch,
    counters: Option<&Counters>,
) -> Option<[Levels; 4]> {
    let scalar = rotation_channel(rotation);

    let mut levels = [Levels::default(); 4];
    let mut floor = 0;

    for channel in [CH_A, CH_G, CH_R, CH_B] {
        let weight = WEIGHTS_AGRB[channel];
        let level = &mut levels[channel];
        let remaining = water - floor;

        if channel == CH_A && area.is_opaque {
            level.set_zero_error(0xFFFF);
        } else if channel == scalar {
            level.compute_channel_levels_reduced::<8, { -1 }, true>(
                area,
                levels2_8(),
                channel,
                weight,
                remaining,
                scratch,
                counters,
            );
        } else {
            level.compute_channel_levels_reduced::<7, { -1 }, false>(
                area,
                levels2_7(),
                channel,
                weight,
                remaining,
                scratch,
                counters,
            );
        }

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

/// Joint search over the channel candidates of one rotation.
///
/// Channels sharing the color indices are scored together as soon as two of them are fixed, the
/// scalar channel adds its own error. Returns the best source frame endpoints below `water`.
fn try_variants<const ROTATION: u32>(
    area: &Area,
    levels: &[Levels; 4],
    water: &mut i32,
    counters: Option<&Counters>,
) -> Option<Endpoints> {
    let scalar = Some(rotation_channel(ROTATION));

    let count = |path: SearchPath| {
        if let Some(c) = counters {
            c.add_search_path(ROTATION, path);
        }
    };

    let min_g = levels[CH_G].min_err;
    let min_r = levels[CH_R].min_err;
    let min_b = levels[CH_B].min_err;

    let mut best = None;

    let mut mem_ar = [-1i32; LEVELS];
    let mut mem_agb = [-1i32; LEVELS];

    for a in levels[CH_A].nodes() {
        let e_a = a.error;
        if e_a + min_g + min_r + min_b >= *water {
            break;
        }

        mem_ar.fill(-1);

        for g in levels[CH_G].nodes() {
            let mut e_g = e_a + g.error;
            if e_g + min_r + min_b >= *water {
                break;
            }

            if ROTATION != 0 && ROTATION != 2 {
                let endpoints = [endpoint_pair(a.color), endpoint_pair(g.color), [0; 2], [0; 2]];
                e_g = subset_error(
                    area,
                    &endpoints,
                    &WEIGHTS_AG,
                    scalar,
                    &WEIGHT2,
                    *water - min_r - min_b,
                );
                count(SearchPath::Ag);
                if e_g + min_r + min_b >= *water {
                    continue;
                }
            }

            mem_agb.fill(-1);

            for (ir, r) in levels[CH_R].nodes().iter().enumerate() {
                let mut e_r = e_g + r.error;
                if e_r + min_b >= *water {
                    break;
                }

                if ROTATION != 0 && ROTATION != 1 {
                    let e_ar = if mem_ar[ir] >= 0 {
                        mem_ar[ir]
                    } else {
                        let endpoints =
                            [endpoint_pair(a.color), [0; 2], endpoint_pair(r.color), [0; 2]];
                        let e = subset_error(
                            area,
                            &endpoints,
                            &WEIGHTS_AR,
                            scalar,
                            &WEIGHT2,
                            *water - min_g - min_b,
                        );
                        count(SearchPath::Ar);
                        mem_ar[ir] = e;
                        e
                    };
                    if e_ar + min_g + min_b >= *water {
                        continue;
                    }

                    if ROTATION == 2 {
                        e_r = e_ar + g.error;
                        if e_r + min_b >= *water {
                            continue;
                        }
                    }
                }

                if ROTATION != 1 && ROTATION != 2 {
                    let endpoints = [
                        endpoint_pair(a.color),
                        endpoint_pair(g.color),
                        endpoint_pair(r.color),
                        [0; 2],
                    ];
                    e_r = subset_error(
                        area,
                        &endpoints,
                        &WEIGHTS_AGR,
                        scalar,
                        &WEIGHT2,
                        *water - min_b,
                    );
                    count(SearchPath::Agr);
                    if e_r + min_b >= *water {
                        continue;
                    }
                }

                for (ib, b) in levels[CH_B].nodes().iter().enumerate() {
                    let mut e_b = e_r + b.error;
                    if e_b >= *water {
                        break;
                    }

                    let endpoints = [
                        endpoint_pair(a.color),
                        endpoint_pair(g.color),
                        endpoint_pair(r.color),
                        endpoint_pair(b.color),
                    ];

                    if ROTATION != 3 {
                        let e_agb = if mem_agb[ib] >= 0 {
                            mem_agb[ib]
                        } else {
                            let e = subset_error(
                                area,
                                &endpoints,
                                &WEIGHTS_AGB,
                                scalar,
                                &WEIGHT2,
                                *water - min_r,
                            );
                            count(SearchPath::Agb);
                            mem_agb[ib] = e;
                            e
                        };
                        if e_agb + min_r >= *water {
                            continue;
                        }

                        if ROTATION == 1 {
                            e_b = e_agb + r.error;
                        }
                    }

                    if ROTATION != 1 && ROTATION != 3 {
                        e_b = subset_error(
                            area,
                            &endpoints,
                            &WEIGHTS_AGRB,
                            scalar,
                            &WEIGHT2,
                            *water,
                        );
                        count(SearchPath::Agrb);
                    }

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

/// Searches `rotation` below `water`. Returns the error and the encoded frame endpoints.
fn compress_subset(
    area: &Area,
    rotation: u32,
    water: i32,
    scratch: &mut LevelsScratch,
    counters: Option<&Counters>,
) -> Option<(i32, Endpoints)> {
    let levels = init_levels(area, rotation, water, scratch, counters)?;

    let mut water = water;
    let best = match rotation {
        0 => try_variants::<0>(area, &levels, &mut water, counters),
        1 => try_variants::<1>(area, &levels, &mut water, counters),
        2 => try_variants::<2>(area, &levels, &mut water, counters),
        _ => try_variants::<3>(area, &levels, &mut water, counters),
    }?;

    Some((water, rotate(&best, rotation)))
}

fn search_rotation(cell: &mut Cell, ctx: &Context, rotation: u32) {
    if let Some((error, endpoints)) = compress_subset(
        &cell.area1,
        rotation,
        cell.error.total,
        &mut cell.scratch,
        ctx.counters,
    ) {
        cell.error.total = error;
        cell.best = encoding(rotation, endpoints);
    }
}

/// Full search of the rotation the block currently uses.
pub(crate) fn compress_block(cell: &mut Cell, ctx: &Context) {
    let rotation = if cell.best.mode == MODE {
        cell.best.parameter & 3
    } else {
        0
    };
    search_rotation(cell, ctx, rotation);
}

/// Full search of every rotation except the one already searched.
pub(crate) fn compress_block_full(cell: &mut Cell, ctx: &Context) {
    for rotation in 0..4 {
        if cell.personal_mode == MODE && cell.personal_parameter & 3 == rotation {
            continue;
        }

        search_rotation(cell, ctx, rotation);

        if cell.error.total <= 0 {
            break;
        }
    }
}

/// Smallest sum of per channel minimums over all rotations.
pub(crate) fn estimate_floor(cell: &Cell, ctx: &Context) -> i32 {
    let area = &cell.area1;
    let water = cell.error.total;

    (0..4)
        .map(|rotation| {
            let scalar = rotation_channel(rotation);
            [CH_A, CH_G, CH_R, CH_B]
                .into_iter()
                .map(|channel| {
                    let weight = WEIGHTS_AGRB[channel];
                    if channel == scalar {
                        estimate_channel_levels_minimum::<8>(
                            area,
                            levels2_8(),
                            channel,
                            weight,
                            water,
                            ctx.counters,
                        )
                    } else {
                        estimate_channel_levels_minimum::<7>(
                            area,
                            levels2_7(),
                            channel,
                            weight,
                            water,
                            ctx.counters,
                        )
                    }
                })
                .fold(0i32, |sum, e| sum.saturating_add(e))
        })
        .min()
        .unwrap_or(0)
}

pub(crate) fn final_pack_block(cell: &mut Cell) -> [u8; 16] {
    let area = &cell.area1;

    let rotation = cell.best.parameter & 3;
    let mut encoded = cell.best.colors[0];
    let source = rotate(&encoded, rotation);
    let scalar = rotation_channel(rotation);

    let mut vector = Modulations::from_endpoints(&source, &WEIGHT2);
    vector.clear_channel(scalar);
    let mut vector_weights = WEIGHTS_AGRB;
    vector_weights[scalar] = 0;

    let mut single = Modulations::from_endpoints(&source, &WEIGHT2);
    let mut single_weights = [0; 4];
    for channel in [CH_A, CH_G, CH_R, CH_B] {
        if channel == scalar {
            single_weights[channel] = WEIGHTS_AGRB[channel];
        } else {
            single.clear_channel(channel);
        }
    }

    let vector_error = compute_subset_table(area, &vector_weights, &mut vector, 4);
    let single_error = compute_subset_table(area, &single_weights, &mut single, 4);

    let alpha_state = if scalar == CH_A { &single } else { &vector };
    let alpha_error = selection_error(area, alpha_state, CH_A, WEIGHTS_AGRB[CH_A]);

    let mut color_indices = index_table(area, &vector, 2);
    let mut alpha_indices = index_table(area, &single, 2);
    reduce_index_table(area, 2, &mut color_indices, &mut encoded, &[CH_G, CH_R, CH_B]);
    reduce_index_table(area, 2, &mut alpha_indices, &mut encoded, &[CH_A]);

    cell.error = BlockError::new(alpha_error, vector_error + single_error);
    cell.best.colors[0] = encoded;

    let mut writer = BitWriter::default();
    writer.write(1 << MODE, MODE as u32 + 1);
    writer.write(rotation as u64, 2);
    for channel in [CH_R, CH_G, CH_B] {
        for &v in &encoded[channel] {
            writer.write((v >> 1) as u64, 7);
        }
    }
    for &v in &encoded[CH_A] {
        writer.write(v as u64, 8);
    }
    writer.write_indices(color_indices, 2, |pixel| pixel == 0);
    writer.write_indices(alpha_indices, 2, |pixel| pixel == 0);

    writer.finish()
}
