#![allow(dead_code)]

use bc7_core::{blocks_byte_size, decode::decompress_blocks_bgra8};

/// Per channel error weights in BGRA order.
const WEIGHTS_BGRA: [i64; 4] = [1, 6, 3, 10];

/// Opaque image with color ramps along both axes.
pub fn gradient_image(width: u32, height: u32) -> Vec<u8> {
    pixels(width, height, |x, y| {
        [
            ramp(x, width),
            ramp(y, height),
            ramp(x + y, width + height - 1),
            255,
        ]
    })
}

/// Color ramps with an alpha ramp running across the image.
pub fn translucent_image(width: u32, height: u32) -> Vec<u8> {
    let mut image = gradient_image(width, height);
    for (i, pixel) in image.chunks_exact_mut(4).enumerate() {
        let x = i as u32 % width;
        pixel[3] = ramp(x, width);
    }
    image
}

/// Deterministic pseudo random pixels.
pub fn noise_image(width: u32, height: u32, seed: u32) -> Vec<u8> {
    pixels(width, height, |x, y| {
        let mut h = (x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663)) ^ seed;
        h = h.wrapping_mul(0x9E37_79B9);
        h ^= h >> 15;
        h.to_le_bytes()
    })
}

/// `value` of `0..n` spread over `0..=255`.
fn ramp(value: u32, n: u32) -> u8 {
    (value * 255 / (n - 1).max(1)) as u8
}

fn pixels(width: u32, height: u32, pixel: impl Fn(u32, u32) -> [u8; 4]) -> Vec<u8> {
    (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .flat_map(|(x, y)| pixel(x, y))
        .collect()
}

pub fn empty_blocks(width: u32, height: u32) -> Vec<u8> {
    vec![0; blocks_byte_size(width, height)]
}

pub fn decompress(blocks: &[u8], width: u32, height: u32) -> Vec<u8> {
    let mut output = vec![0; (width * height * 4) as usize];
    decompress_blocks_bgra8(blocks, width, height, &mut output).expect("valid image");
    output
}

/// Error of `decoded` against `source` under the encoder's metric, as `(alpha, color)`.
///
/// Distances are halved before squaring. Channels with a zero mask byte are skipped.
pub fn weighted_error(source: &[u8], mask: Option<&[i8]>, decoded: &[u8]) -> (i64, i64) {
    let mut alpha = 0;
    let mut color = 0;

    for (i, (&a, &b)) in source.iter().zip(decoded).enumerate() {
        if mask.is_some_and(|m| m[i] == 0) {
            continue;
        }
        let d = ((a as i64 - b as i64).abs() >> 1).pow(2) * WEIGHTS_BGRA[i & 3];
        if i & 3 == 3 {
            alpha += d;
        } else {
            color += d;
        }
    }

    (alpha, color)
}

/// Peak signal to noise ratio in dB, per BGRA channel and over the first `channels` of them.
#[derive(Debug, Clone, Copy)]
pub struct Psnr {
    pub overall: f64,
    pub bgra: [f64; 4],
}

impl Psnr {
    pub fn alpha(&self) -> f64 {
        self.bgra[3]
    }
}

fn decibels(mse: f64) -> f64 {
    if mse == 0.0 {
        f64::INFINITY
    } else {
        10.0 * (255.0 * 255.0 / mse).log10()
    }
}

/// Compares two BGRA images of equal size. Opaque images pass `channels = 3` to leave out alpha.
pub fn psnr(source: &[u8], decoded: &[u8], channels: usize) -> Psnr {
    assert_eq!(source.len(), decoded.len(), "images differ in size");

    let mut sums = [0.0f64; 4];
    for (a, b) in source.chunks_exact(4).zip(decoded.chunks_exact(4)) {
        for (sum, (&x, &y)) in sums.iter_mut().zip(a.iter().zip(b)) {
            let d = f64::from(x) - f64::from(y);
            *sum += d * d;
        }
    }

    let pixels = (source.len() / 4).max(1) as f64;
    let mse = sums.map(|sum| sum / pixels);

    Psnr {
        overall: decibels(mse[..channels].iter().sum::<f64>() / channels as f64),
        bgra: mse.map(decibels),
    }
}
