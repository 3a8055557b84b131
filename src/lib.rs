//! # bc7_core
//!
//! BC7 texture block compression on the CPU.
//!
//! Every 4x4 block is searched for the endpoints and indices with the smallest perceptually
//! weighted error. Candidate endpoints are enumerated per channel and combined under a running
//! error bound that prunes every branch which can no longer win.
//!
//! ## Encoded modes
//!
//!  * Mode 3: two subsets, opaque 7-bit color with parity bits
//!  * Mode 5: one subset, 7-bit color and an 8-bit channel with its own indices
//!  * Mode 6: one subset, 7-bit color and alpha with parity bits
//!
//! All eight modes decode.
//!
//! ## Features
//!
//!  * `rayon`: compress and decompress whole images in parallel
//!  * `self-check`: decode every packed block again and roll back on a mismatch
mod counters;
pub mod decode;
pub mod encode;
mod error;
mod format;
mod settings;

pub use counters::Counters;
pub use encode::{CompressStats, Compressor, SourceBlock};
pub use error::Error;
pub use settings::Bc7Settings;

/// Byte size of one compressed block.
pub const BLOCK_BYTE_SIZE: usize = 16;

/// Returns the byte size required for storing compressed blocks for the given dimensions.
///
/// Width and height are rounded up to the nearest multiple of 4.
pub const fn blocks_byte_size(width: u32, height: u32) -> usize {
    let block_width = (width as usize + 3) / 4;
    let block_height = (height as usize + 3) / 4;
    block_width * block_height * BLOCK_BYTE_SIZE
}

pub(crate) fn check_dimensions(width: u32, height: u32) -> Result<(), Error> {
    if width % 4 != 0 || height % 4 != 0 {
        return Err(Error::InvalidDimensions { width, height });
    }
    Ok(())
}
