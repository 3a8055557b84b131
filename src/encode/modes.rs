//! Dispatch over the block modes.

use crate::{
    counters::Counters,
    encode::{area::Area, cell::Cell, mode3, mode5, mode6},
    format::Endpoints,
    Bc7Settings,
};

/// Read-only inputs shared by every stage of one block.
#[derive(Copy, Clone)]
pub(crate) struct Context<'a> {
    pub settings: Bc7Settings,
    pub counters: Option<&'a Counters>,
}

type Search = fn(&mut Cell, &Context);
type Floor = fn(&Cell, &Context) -> i32;
type Pack = fn(&mut Cell) -> [u8; 16];

/// What the encoder can do with one mode.
///
/// `fast` and the searches lower `cell.error.total` and replace `cell.best` whenever they find a
/// strictly better encoding. `floor` is a lower bound of what `full` can reach. `pack` writes the
/// block of `cell.best` and sets `cell.error` to its exact error. `opaque` modes always decode
/// alpha as 255 and never get below the opaque alpha error of the block.
pub(crate) struct ModeOps {
    pub opaque: bool,
    pub fast: Option<Search>,
    pub thorough: Option<Search>,
    pub full: Option<Search>,
    pub floor: Option<Floor>,
    pub pack: Option<Pack>,
}

const DECODE_ONLY: ModeOps = ModeOps {
    opaque: false,
    fast: None,
    thorough: None,
    full: None,
    floor: None,
    pack: None,
};

pub(crate) static MODES: [ModeOps; 8] = [
    DECODE_ONLY,
    DECODE_ONLY,
    DECODE_ONLY,
    ModeOps {
        opaque: true,
        fast: Some(mode3::compress_block_fast),
        thorough: Some(mode3::compress_block),
        full: Some(mode3::compress_block_full),
        floor: Some(mode3::estimate_floor),
        pack: Some(mode3::final_pack_block),
    },
    DECODE_ONLY,
    ModeOps {
        opaque: false,
        fast: Some(mode5::compress_block_fast),
        thorough: Some(mode5::compress_block),
        full: Some(mode5::compress_block_full),
        floor: Some(mode5::estimate_floor),
        pack: Some(mode5::final_pack_block),
    },
    ModeOps {
        opaque: false,
        fast: Some(mode6::compress_block_fast),
        thorough: Some(mode6::compress_block),
        full: Some(mode6::compress_block_full),
        floor: Some(mode6::estimate_floor),
        pack: Some(mode6::final_pack_block),
    },
    DECODE_ONLY,
];

/// Operations of `mode`, nothing for the invalid mode.
#[inline(always)]
pub(crate) fn mode_ops(mode: u8) -> &'static ModeOps {
    MODES.get(mode as usize).unwrap_or(&DECODE_ONLY)
}

/// Splits a node color into its endpoint pair.
#[inline(always)]
pub(crate) fn endpoint_pair(color: i32) -> [u8; 2] {
    [(color & 0xFF) as u8, ((color >> 8) & 0xFF) as u8]
}

/// Rounds the canonical bounds of `channels` to 7 bits plus one parity bit per endpoint.
///
/// Each endpoint takes the parity with the smaller weighted rounding error over all channels.
/// Channels outside `channels` stay at 255.
pub(crate) fn round_bounds_with_parity(
    area: &Area,
    channels: &[usize],
    weights: &[i32; 4],
) -> Endpoints {
    #[inline(always)]
    fn round(value: i32, parity: i32) -> i32 {
        ((((value - parity + 1) >> 1).clamp(0, 127)) << 1) | parity
    }

    let mut endpoints = [[255u8; 2]; 4];

    for endpoint in 0..2 {
        let error = |parity: i32| -> i32 {
            channels
                .iter()
                .map(|&c| {
                    let v = area.bounds[c][endpoint];
                    let d = round(v, parity) - v;
                    d * d * weights[c]
                })
                .sum()
        };

        let parity = if error(1) < error(0) { 1 } else { 0 };

        for &c in channels {
            endpoints[c][endpoint] = round(area.bounds[c][endpoint], parity) as u8;
        }
    }

    endpoints
}
