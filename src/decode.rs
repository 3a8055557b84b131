//! BC7 decoding.

mod block;

#[cfg(feature = "rayon")]
use rayon::prelude::*;
use tracing::debug;

pub use self::block::decode_block_bc7;
pub(crate) use self::block::{decode_block, DecodedBlock};
use crate::{blocks_byte_size, check_dimensions, Error, BLOCK_BYTE_SIZE};

/// Decodes a BC7 image into tightly packed BGRA8 pixels.
///
/// `width` and `height` must be multiples of 4. `blocks` holds the blocks in row-major order,
/// `output` receives `width * height * 4` bytes.
pub fn decompress_blocks_bgra8(
    blocks: &[u8],
    width: u32,
    height: u32,
    output: &mut [u8],
) -> Result<(), Error> {
    check_dimensions(width, height)?;

    let required = blocks_byte_size(width, height);
    if blocks.len() < required {
        return Err(Error::BufferTooSmall {
            name: "blocks",
            actual: blocks.len(),
            required,
        });
    }

    let row_pitch = width as usize * 4;
    let required = row_pitch * height as usize;
    if output.len() < required {
        return Err(Error::BufferTooSmall {
            name: "output",
            actual: output.len(),
            required,
        });
    }

    debug!(width, height, "decompressing BC7 image");

    let blocks_x = width as usize / 4;
    let block_row_bytes = blocks_x * BLOCK_BYTE_SIZE;
    let pixel_rows = &mut output[..required];

    let decode_row = |(block_row, pixels): (&[u8], &mut [u8])| {
        for (bx, block) in block_row.chunks_exact(BLOCK_BYTE_SIZE).enumerate() {
            decode_block_bc7(block, &mut pixels[bx * 16..], row_pitch);
        }
    };

    #[cfg(feature = "rayon")]
    blocks[..block_row_bytes * (height as usize / 4)]
        .par_chunks_exact(block_row_bytes)
        .zip(pixel_rows.par_chunks_exact_mut(row_pitch * 4))
        .for_each(decode_row);

    #[cfg(not(feature = "rayon"))]
    blocks[..block_row_bytes * (height as usize / 4)]
        .chunks_exact(block_row_bytes)
        .zip(pixel_rows.chunks_exact_mut(row_pitch * 4))
        .for_each(decode_row);

    Ok(())
}
