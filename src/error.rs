use thiserror::Error;

/// Errors of the image level entry points.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("image dimensions {width}x{height} are not a multiple of 4")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("{name} buffer holds {actual} bytes, {required} are required")]
    BufferTooSmall {
        name: &'static str,
        actual: usize,
        required: usize,
    },
    #[error("row stride {stride} is smaller than {min} bytes")]
    InvalidStride { stride: usize, min: usize },
}
