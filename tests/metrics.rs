use bc7_core::{Bc7Settings, CompressStats, Compressor};
use rstest::rstest;

use crate::common::{
    decompress, empty_blocks, gradient_image, noise_image, psnr, translucent_image, Psnr,
};

mod common;

const WIDTH: u32 = 64;
const HEIGHT: u32 = 64;

fn compress_image(bgra: &[u8], settings: Bc7Settings) -> (Vec<u8>, CompressStats) {
    let compressor = Compressor::new(settings);
    let mut blocks = empty_blocks(WIDTH, HEIGHT);
    let stats = compressor
        .compress_bgra8(bgra, None, WIDTH, HEIGHT, WIDTH * 4, &mut blocks)
        .expect("valid image");
    (blocks, stats)
}

fn measure(name: &str, bgra: &[u8], channels: usize, settings: Bc7Settings) -> Psnr {
    let (blocks, _) = compress_image(bgra, settings);
    let result = psnr(bgra, &decompress(&blocks, WIDTH, HEIGHT), channels);

    let [b, g, r, a] = result.bgra;
    println!(
        "{name}: {:.2} dB, B {b:.2} G {g:.2} R {r:.2} A {a:.2}",
        result.overall,
    );
    result
}

#[rstest]
#[case::draft(Bc7Settings::draft())]
#[case::normal(Bc7Settings::normal())]
#[case::slow(Bc7Settings::slow())]
fn psnr_gradient(#[case] settings: Bc7Settings) {
    let result = measure("gradient", &gradient_image(WIDTH, HEIGHT), 3, settings);
    assert!(result.overall > 30.0, "{result:?}");
    assert!(result.alpha() > 40.0, "{result:?}");
}

#[rstest]
#[case::draft(Bc7Settings::draft())]
#[case::slow(Bc7Settings::slow())]
fn psnr_translucent(#[case] settings: Bc7Settings) {
    let result = measure("translucent", &translucent_image(WIDTH, HEIGHT), 4, settings);
    assert!(result.overall > 30.0, "{result:?}");
}

#[rstest]
#[case::gradient(gradient_image(WIDTH, HEIGHT))]
#[case::translucent(translucent_image(WIDTH, HEIGHT))]
#[case::noise(noise_image(WIDTH, HEIGHT, 7))]
fn effort_never_raises_the_error(#[case] bgra: Vec<u8>) {
    let errors: Vec<i64> = [Bc7Settings::draft(), Bc7Settings::normal(), Bc7Settings::slow()]
        .into_iter()
        .map(|settings| {
            let (_, stats) = compress_image(&bgra, settings);
            stats.error_alpha + stats.error_color
        })
        .collect();

    assert!(errors[1] <= errors[0], "{errors:?}");
    assert!(errors[2] <= errors[1], "{errors:?}");
}

#[test]
fn recompressing_keeps_improving() {
    let bgra = noise_image(WIDTH, HEIGHT, 11);
    let (mut blocks, draft) = compress_image(&bgra, Bc7Settings::draft());

    let compressor = Compressor::new(Bc7Settings::normal());
    let normal = compressor
        .compress_bgra8(&bgra, None, WIDTH, HEIGHT, WIDTH * 4, &mut blocks)
        .expect("valid image");

    assert!(normal.error_alpha + normal.error_color <= draft.error_alpha + draft.error_color);
    assert_eq!(normal.blocks, draft.blocks);
}
