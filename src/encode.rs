//! CPU based BC7 encoding.

mod area;
mod cell;
mod common;
mod estimate;
mod levels;
mod metrics;
mod mode3;
mod mode5;
mod mode6;
mod modes;
mod pipeline;
mod radix;
mod subset;
mod tables;

use std::{ops::Add, sync::Arc};

#[cfg(feature = "rayon")]
use rayon::prelude::*;
#[cfg(feature = "rayon")]
use strength_reduce::StrengthReducedUsize;
use tracing::debug;

use crate::{
    blocks_byte_size, check_dimensions,
    encode::{cell::Cell, modes::Context, pipeline::compress_cell},
    Bc7Settings, Counters, Error, BLOCK_BYTE_SIZE,
};

/// One 4x4 block of source pixels.
///
/// Every row holds four BGRA pixels. `mask` has the same shape, a non-zero byte marks the
/// channel as visible. Hidden channels never add to the error.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SourceBlock {
    pub pixels: [[u8; 16]; 4],
    pub mask: [[i8; 16]; 4],
}

impl SourceBlock {
    /// A block with every channel visible.
    pub const fn opaque(pixels: [[u8; 16]; 4]) -> Self {
        Self {
            pixels,
            mask: [[-1; 16]; 4],
        }
    }

    /// Copies the block at pixel `(x, y)` out of an image. `mask` shares the layout of `bgra`.
    fn load_bgra8(bgra: &[u8], mask: Option<&[i8]>, x: usize, y: usize, stride: usize) -> Self {
        let mut block = Self::opaque([[0; 16]; 4]);

        for row in 0..4 {
            let offset = (y + row) * stride + x * 4;
            block.pixels[row].copy_from_slice(&bgra[offset..offset + 16]);
            if let Some(mask) = mask {
                block.mask[row].copy_from_slice(&mask[offset..offset + 16]);
            }
        }

        block
    }
}

/// Accumulated result of a compression run.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CompressStats {
    /// Summed weighted alpha error.
    pub error_alpha: i64,
    /// Summed weighted color error.
    pub error_color: i64,
    /// Summed alpha similarity, one per block.
    pub ssim_alpha: f64,
    /// Summed color similarity, one per block.
    pub ssim_color: f64,
    pub blocks: usize,
}

impl CompressStats {
    fn of_cell(cell: &Cell) -> Self {
        Self {
            error_alpha: cell.error.alpha as i64,
            error_color: cell.error.color() as i64,
            ssim_alpha: cell.quality.alpha,
            ssim_color: cell.quality.color,
            blocks: 1,
        }
    }

    /// Mean similarity per block as `(alpha, color)`, perfect for an empty run.
    pub fn mean_ssim(&self) -> (f64, f64) {
        if self.blocks == 0 {
            return (1.0, 1.0);
        }
        let n = self.blocks as f64;
        (self.ssim_alpha / n, self.ssim_color / n)
    }
}

impl Add for CompressStats {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            error_alpha: self.error_alpha + other.error_alpha,
            error_color: self.error_color + other.error_color,
            ssim_alpha: self.ssim_alpha + other.ssim_alpha,
            ssim_color: self.ssim_color + other.ssim_color,
            blocks: self.blocks + other.blocks,
        }
    }
}

/// BC7 block compressor.
///
/// Creating one builds the static level tables on first use. A compressor holds no per block
/// state and can be shared between threads.
#[derive(Clone, Debug)]
pub struct Compressor {
    settings: Bc7Settings,
    counters: Option<Arc<Counters>>,
}

impl Compressor {
    pub fn new(settings: Bc7Settings) -> Self {
        tables::init();
        Self {
            settings,
            counters: None,
        }
    }

    /// A compressor that tallies its decisions into `counters`.
    pub fn with_counters(settings: Bc7Settings, counters: Arc<Counters>) -> Self {
        Self {
            counters: Some(counters),
            ..Self::new(settings)
        }
    }

    pub fn settings(&self) -> Bc7Settings {
        self.settings
    }

    pub fn counters(&self) -> Option<&Arc<Counters>> {
        self.counters.as_ref()
    }

    fn context(&self) -> Context<'_> {
        Context {
            settings: self.settings,
            counters: self.counters.as_deref(),
        }
    }

    /// Compresses a run of blocks.
    ///
    /// Each slot of `outputs` holds the starting encoding of its block and is only replaced by
    /// a block with a smaller error. With draft settings, slots whose first byte is zero (no
    /// valid mode) start as an empty block. Settings without draft leave every slot as it is.
    /// Pairs are formed up to the shorter of both slices.
    pub fn compress_blocks(
        &self,
        sources: &[SourceBlock],
        outputs: &mut [[u8; 16]],
    ) -> CompressStats {
        let ctx = self.context();
        let mut cell = Cell::default();

        sources
            .iter()
            .zip(outputs.iter_mut())
            .fold(CompressStats::default(), |stats, (source, output)| {
                stats + compress_one(&mut cell, source, output, &ctx)
            })
    }

    /// Compresses a BGRA8 image into BC7 blocks.
    ///
    /// # Data Layout Requirements
    /// Rows of `bgra` are `stride` bytes apart. The optional `mask` has the same layout, a
    /// non-zero byte marks a channel as visible. Without a mask every channel is visible.
    ///
    /// # Buffer Requirements
    /// `blocks` receives the blocks in row-major order and must hold at least
    /// [`blocks_byte_size()`](crate::blocks_byte_size) bytes. Its current content is the starting
    /// encoding, so compressing into a buffer of earlier results only improves on them.
    ///
    /// # Errors
    /// * [`Error::InvalidDimensions`] if `width` or `height` is not a multiple of 4
    /// * [`Error::InvalidStride`] if `stride` is smaller than `width * 4`
    /// * [`Error::BufferTooSmall`] if a buffer is too small for the image
    ///
    /// # Example
    /// ```
    /// use bc7_core::{blocks_byte_size, Bc7Settings, Compressor};
    ///
    /// let width = 8;
    /// let height = 8;
    /// let bgra = vec![128u8; (width * height * 4) as usize];
    /// let mut blocks = vec![0u8; blocks_byte_size(width, height)];
    ///
    /// let compressor = Compressor::new(Bc7Settings::draft());
    /// let stats = compressor
    ///     .compress_bgra8(&bgra, None, width, height, width * 4, &mut blocks)
    ///     .unwrap();
    ///
    /// assert_eq!(stats.blocks, 4);
    /// ```
    pub fn compress_bgra8(
        &self,
        bgra: &[u8],
        mask: Option<&[i8]>,
        width: u32,
        height: u32,
        stride: u32,
        blocks: &mut [u8],
    ) -> Result<CompressStats, Error> {
        check_dimensions(width, height)?;

        let stride = stride as usize;
        let row_bytes = width as usize * 4;
        if stride < row_bytes {
            return Err(Error::InvalidStride {
                stride,
                min: row_bytes,
            });
        }

        let required = match height as usize {
            0 => 0,
            rows => (rows - 1) * stride + row_bytes,
        };
        if bgra.len() < required {
            return Err(Error::BufferTooSmall {
                name: "bgra",
                actual: bgra.len(),
                required,
            });
        }
        if let Some(mask) = mask {
            if mask.len() < required {
                return Err(Error::BufferTooSmall {
                    name: "mask",
                    actual: mask.len(),
                    required,
                });
            }
        }

        let required = blocks_byte_size(width, height);
        if blocks.len() < required {
            return Err(Error::BufferTooSmall {
                name: "blocks",
                actual: blocks.len(),
                required,
            });
        }

        debug!(width, height, effort = self.settings.name(), "compressing BC7 image");

        let blocks_x = width as usize / 4;
        if blocks_x == 0 || height == 0 {
            return Ok(CompressStats::default());
        }

        let outputs: &mut [[u8; BLOCK_BYTE_SIZE]] =
            bytemuck::cast_slice_mut(&mut blocks[..required]);
        let ctx = self.context();

        #[cfg(feature = "rayon")]
        let stats = {
            let blocks_x = StrengthReducedUsize::new(blocks_x);
            outputs
                .par_iter_mut()
                .enumerate()
                .map_init(Cell::default, |cell, (index, output)| {
                    let (by, bx) = StrengthReducedUsize::div_rem(index, blocks_x);
                    let source = SourceBlock::load_bgra8(bgra, mask, bx * 4, by * 4, stride);
                    compress_one(cell, &source, output, &ctx)
                })
                .reduce(CompressStats::default, |a, b| a + b)
        };

        #[cfg(not(feature = "rayon"))]
        let stats = {
            let mut cell = Cell::default();
            outputs
                .iter_mut()
                .enumerate()
                .fold(CompressStats::default(), |stats, (index, output)| {
                    let (by, bx) = (index / blocks_x, index % blocks_x);
                    let source = SourceBlock::load_bgra8(bgra, mask, bx * 4, by * 4, stride);
                    stats + compress_one(&mut cell, &source, output, &ctx)
                })
        };

        Ok(stats)
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new(Bc7Settings::default())
    }
}

fn compress_one(
    cell: &mut Cell,
    source: &SourceBlock,
    output: &mut [u8; 16],
    ctx: &Context,
) -> CompressStats {
    cell.load(source);
    compress_cell(cell, output, ctx);
    CompressStats::of_cell(cell)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(width: usize, height: usize) -> Vec<u8> {
        (0..width * height)
            .flat_map(|i| {
                let (x, y) = (i % width, i / width);
                let v = if (x / 2 + y / 2) % 2 == 0 { 30 } else { 220 };
                [v, v / 2, 255 - v, 255]
            })
            .collect()
    }

    #[test]
    fn image_and_block_runs_agree() {
        let (width, height) = (8u32, 4u32);
        let bgra = checker(8, 4);
        let compressor = Compressor::new(Bc7Settings::normal());

        let mut image_blocks = vec![0u8; blocks_byte_size(width, height)];
        let image_stats = compressor
            .compress_bgra8(&bgra, None, width, height, width * 4, &mut image_blocks)
            .unwrap();

        let sources = [
            SourceBlock::load_bgra8(&bgra, None, 0, 0, 32),
            SourceBlock::load_bgra8(&bgra, None, 4, 0, 32),
        ];
        let mut outputs = [[0u8; 16]; 2];
        let block_stats = compressor.compress_blocks(&sources, &mut outputs);

        assert_eq!(image_blocks, outputs.concat());
        assert_eq!(image_stats, block_stats);
        assert_eq!(block_stats.blocks, 2);
    }

    #[test]
    fn stride_padding_is_skipped() {
        let bgra = checker(4, 4);
        let mut padded = vec![0xAB; 24 * 4];
        for row in 0..4 {
            padded[row * 24..row * 24 + 16].copy_from_slice(&bgra[row * 16..row * 16 + 16]);
        }

        let compressor = Compressor::new(Bc7Settings::draft());
        let mut tight = [0u8; 16];
        let mut loose = [0u8; 16];
        compressor.compress_bgra8(&bgra, None, 4, 4, 16, &mut tight).unwrap();
        compressor.compress_bgra8(&padded, None, 4, 4, 24, &mut loose).unwrap();

        assert_eq!(tight, loose);
    }

    #[test]
    fn mask_hides_channels() {
        let bgra = checker(4, 4);
        let mut mask = vec![-1i8; 64];
        for pixel in mask.chunks_exact_mut(4) {
            pixel[3] = 0;
        }

        let compressor = Compressor::new(Bc7Settings::normal());
        let mut blocks = [0u8; 16];
        let stats = compressor
            .compress_bgra8(&bgra, Some(&mask), 4, 4, 16, &mut blocks)
            .unwrap();

        assert_eq!(stats.error_alpha, 0);
    }

    #[test]
    fn invalid_input_is_rejected() {
        let compressor = Compressor::new(Bc7Settings::draft());
        let mut blocks = [0u8; 16];

        assert_eq!(
            compressor.compress_bgra8(&[0; 64], None, 6, 4, 24, &mut blocks),
            Err(Error::InvalidDimensions {
                width: 6,
                height: 4
            })
        );
        assert_eq!(
            compressor.compress_bgra8(&[0; 64], None, 4, 4, 8, &mut blocks),
            Err(Error::InvalidStride { stride: 8, min: 16 })
        );
        assert_eq!(
            compressor.compress_bgra8(&[0; 63], None, 4, 4, 16, &mut blocks),
            Err(Error::BufferTooSmall {
                name: "bgra",
                actual: 63,
                required: 64
            })
        );
        assert_eq!(
            compressor.compress_bgra8(&[0; 64], None, 4, 8, 16, &mut blocks),
            Err(Error::BufferTooSmall {
                name: "bgra",
                actual: 64,
                required: 128
            })
        );
        assert_eq!(
            compressor.compress_bgra8(&[0; 128], None, 4, 8, 16, &mut blocks),
            Err(Error::BufferTooSmall {
                name: "blocks",
                actual: 16,
                required: 32
            })
        );
    }

    #[test]
    fn counters_see_every_block() {
        let counters = Arc::new(Counters::new());
        let compressor = Compressor::with_counters(Bc7Settings::draft(), counters.clone());
        let bgra = checker(8, 8);
        let mut blocks = vec![0u8; blocks_byte_size(8, 8)];

        compressor.compress_bgra8(&bgra, None, 8, 8, 32, &mut blocks).unwrap();

        let modes: u64 = (0..9).map(|m| counters.mode(m)).sum();
        assert_eq!(modes, 4);
        assert_eq!(counters.compressed() + counters.already_encoded(), 4);
    }

    #[test]
    fn only_draft_resets_slots_without_a_mode() {
        let hidden = SourceBlock {
            pixels: [[90; 16]; 4],
            mask: [[0; 16]; 4],
        };

        let mut outputs = [[0u8; 16]];
        Compressor::new(Bc7Settings::none()).compress_blocks(&[hidden], &mut outputs);
        assert_eq!(outputs[0], [0u8; 16]);

        Compressor::new(Bc7Settings::draft()).compress_blocks(&[hidden], &mut outputs);
        assert_eq!(outputs[0][0], 0x40);
        assert_eq!(outputs[0][1..], [0u8; 15]);
    }
}
