//! BC7 block decoding after "bcdec.h - v0.98"
//!
//! <https://github.com/iOrange/bcdec/blob/main/bcdec.h>
//!
//! # CREDITS
//!
//! Aras Pranckevicius (@aras-p)
//! - BC6H/BC7 bits pulling routines optimizations
//!
//! # License
//!
//! This is free and unencumbered software released into the public domain.
//!
//! Anyone is free to copy, modify, publish, use, compile, sell, or
//! distribute this software, either in source code form or as a compiled
//! binary, for any purpose, commercial or non-commercial, and by any
//! means.
//!
//! In jurisdictions that recognize copyright laws, the author or authors
//! of this software dedicate any and all copyright interest in the
//! software to the public domain. We make this dedication for the benefit
//! of the public at large and to the detriment of our heirs and
//! successors. We intend this dedication to be an overt act of
//! relinquishment in perpetuity of all present and future rights to this
//! software under copyright law.
//!
//! THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
//! EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
//! MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT.
//! IN NO EVENT SHALL THE AUTHORS BE LIABLE FOR ANY CLAIM, DAMAGES OR
//! OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE,
//! ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR
//! OTHER DEALINGS IN THE SOFTWARE.
//!
//! For more information, please refer to <https://unlicense.org>

use crate::format::{
    expand, interpolate, is_anchor, partition_subset, rotation_channel, Encoding, ParityBits,
    CH_A, CH_B, CH_G, CH_R, MODE_INFO, MODE_INVALID, WEIGHT2, WEIGHT3, WEIGHT4,
};

/// Pixels of a decoded block in A, G, R, B order together with the encoding that produced them.
#[derive(Copy, Clone, Debug)]
pub(crate) struct DecodedBlock {
    pub pixels: [[u8; 4]; 16],
    pub encoding: Encoding,
}

impl Default for DecodedBlock {
    fn default() -> Self {
        Self {
            pixels: [[0; 4]; 16],
            encoding: Encoding::default(),
        }
    }
}

#[inline(always)]
fn weights_of(bits: u32) -> &'static [i32] {
    match bits {
        2 => &WEIGHT2,
        3 => &WEIGHT3,
        _ => &WEIGHT4,
    }
}

/// Decodes a block into pixels and its encoding. Blocks without a mode bit decode to
/// transparent black.
pub(crate) fn decode_block(block: &[u8; 16]) -> DecodedBlock {
    let mut decoded = DecodedBlock::default();

    if block[0] == 0 {
        return decoded;
    }

    let mode = block[0].trailing_zeros() as usize;
    let info = &MODE_INFO[mode];

    let mut bstream = BitStream::new(block);
    bstream.read_bits(mode as u32 + 1);

    let partition = bstream.read_bits(info.partition_bits) as usize;
    let rotation = bstream.read_bits(info.rotation_bits);
    let index_selection_bit = bstream.read_bits(info.selector_bits);

    // [subset][channel][endpoint]
    let mut raw = [[[0i32; 2]; 4]; 3];

    for channel in [CH_R, CH_G, CH_B] {
        for subset in raw.iter_mut().take(info.subsets) {
            for endpoint in subset[channel].iter_mut() {
                *endpoint = bstream.read_bits(info.color_bits) as i32;
            }
        }
    }

    if info.alpha_bits > 0 {
        for subset in raw.iter_mut().take(info.subsets) {
            for endpoint in subset[CH_A].iter_mut() {
                *endpoint = bstream.read_bits(info.alpha_bits) as i32;
            }
        }
    }

    let mut parity = [[0i32; 2]; 3];
    match info.parity {
        ParityBits::None => {}
        ParityBits::Shared => {
            for p in parity.iter_mut().take(info.subsets) {
                let bit = bstream.read_bit() as i32;
                *p = [bit, bit];
            }
        }
        ParityBits::Unique => {
            for p in parity.iter_mut().take(info.subsets) {
                for bit in p.iter_mut() {
                    *bit = bstream.read_bit() as i32;
                }
            }
        }
    }
    let parity_bits = (info.parity != ParityBits::None) as u32;

    let mut colors = [[[0u8; 2]; 4]; 3];
    for subset in 0..info.subsets {
        for channel in 0..4 {
            let bits = if channel == CH_A {
                info.alpha_bits
            } else {
                info.color_bits
            };

            for endpoint in 0..2 {
                colors[subset][channel][endpoint] = if bits == 0 {
                    0xFF
                } else {
                    let value = (raw[subset][channel][endpoint] << parity_bits)
                        | (parity[subset][endpoint] & parity_bits as i32);
                    expand(value, bits + parity_bits) as u8
                };
            }
        }
    }

    // All primary indices precede the secondary ones.
    let mut indices = [0usize; 16];
    for (pixel, index) in indices.iter_mut().enumerate() {
        let anchor = is_anchor(info.subsets, partition, pixel) as u32;
        *index = bstream.read_bits(info.index_bits - anchor) as usize;
    }

    let mut indices2 = [0usize; 16];
    if info.index_bits2 > 0 {
        for (pixel, index) in indices2.iter_mut().enumerate() {
            *index = bstream.read_bits(info.index_bits2 - (pixel == 0) as u32) as usize;
        }
    }

    let weights = weights_of(info.index_bits);
    let weights2 = weights_of(info.index_bits2);

    for (pixel, out) in decoded.pixels.iter_mut().enumerate() {
        let subset = if info.subsets > 1 {
            partition_subset(info.subsets, partition, pixel)
        } else {
            0
        };
        let endpoints = &colors[subset];

        let (color_weight, alpha_weight) = if info.index_bits2 == 0 {
            (weights[indices[pixel]], weights[indices[pixel]])
        } else if index_selection_bit == 0 {
            (weights[indices[pixel]], weights2[indices2[pixel]])
        } else {
            (weights2[indices2[pixel]], weights[indices[pixel]])
        };

        for (channel, value) in out.iter_mut().enumerate() {
            let weight = if channel == CH_A {
                alpha_weight
            } else {
                color_weight
            };
            let pair = endpoints[channel];
            *value = interpolate(pair[0] as i32, pair[1] as i32, weight) as u8;
        }

        if rotation != 0 {
            out.swap(CH_A, rotation_channel(rotation));
        }
    }

    decoded.encoding = Encoding {
        mode: mode as u8,
        parameter: if info.subsets > 1 {
            partition as u32
        } else {
            rotation | (index_selection_bit << 2)
        },
        colors,
    };

    decoded
}

/// Decodes a BC7 block by reading 16 bytes from `compressed_block` and writing the BGRA8 data
/// into `decompressed_block` with `destination_pitch` many bytes per output row.
///
/// # Panics
///
/// Panics when `compressed_block` is shorter than 16 bytes or `decompressed_block` cannot hold
/// four rows of `destination_pitch` bytes.
pub fn decode_block_bc7(
    compressed_block: &[u8],
    decompressed_block: &mut [u8],
    destination_pitch: usize,
) {
    let mut block = [0u8; 16];
    block.copy_from_slice(&compressed_block[..16]);

    let decoded = decode_block(&block);
    write_bgra(&decoded.pixels, decompressed_block, destination_pitch);
}

/// Writes A, G, R, B pixels as BGRA rows.
fn write_bgra(pixels: &[[u8; 4]; 16], destination: &mut [u8], pitch: usize) {
    for (i, pixel) in pixels.iter().enumerate() {
        let offset = (i >> 2) * pitch + (i & 3) * 4;
        destination[offset..offset + 4].copy_from_slice(&[
            pixel[CH_B],
            pixel[CH_G],
            pixel[CH_R],
            pixel[CH_A],
        ]);
    }
}

/// Internal bitstream helper for reading bits from compressed data
#[derive(Debug, Clone, Copy)]
struct BitStream {
    low: u64,
    high: u64,
}

impl BitStream {
    #[inline]
    fn new(data: &[u8; 16]) -> Self {
        let bits = u128::from_le_bytes(*data);
        Self {
            low: bits as u64,
            high: (bits >> 64) as u64,
        }
    }

    #[inline]
    fn read_bit(&mut self) -> u32 {
        self.read_bits(1)
    }

    #[inline]
    fn read_bits(&mut self, num_bits: u32) -> u32 {
        if num_bits == 0 {
            return 0;
        }

        let mask = (1u64 << num_bits) - 1;
        // Read the low N bits.
        let bits = (self.low & mask) as u32;
        self.low >>= num_bits;

        // Put the low N bits of "high" into the high 64-N bits of "low".
        self.low |= (self.high & mask) << (64 - num_bits);
        self.high >>= num_bits;

        bits
    }
}
