use bc7_core::{decode::decode_block_bc7, Bc7Settings, Compressor, SourceBlock};
use proptest::{array, prelude::*};
use rstest::rstest;

use crate::common::weighted_error;

mod common;

fn block_strategy() -> impl Strategy<Value = SourceBlock> {
    let pixels = array::uniform4(array::uniform16(any::<u8>()));
    let mask = array::uniform4(array::uniform16(prop_oneof![3 => Just(-1i8), 1 => Just(0i8)]));
    (pixels, mask).prop_map(|(pixels, mask)| SourceBlock { pixels, mask })
}

fn settings_strategy() -> impl Strategy<Value = Bc7Settings> {
    prop_oneof![
        Just(Bc7Settings::draft()),
        Just(Bc7Settings::normal()),
        Just(Bc7Settings::slow()),
    ]
}

fn decode(block: &[u8; 16]) -> [u8; 64] {
    let mut pixels = [0u8; 64];
    decode_block_bc7(block, &mut pixels, 16);
    pixels
}

fn flat(rows: &[[u8; 16]; 4]) -> Vec<u8> {
    rows.concat()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn recorded_error_matches_the_decoded_block(
        source in block_strategy(),
        settings in settings_strategy(),
    ) {
        let compressor = Compressor::new(settings);
        let mut output = [[0u8; 16]];
        let stats = compressor.compress_blocks(&[source], &mut output);

        let mask: Vec<i8> = source.mask.concat();
        let (alpha, color) = weighted_error(&flat(&source.pixels), Some(&mask), &decode(&output[0]));

        prop_assert_eq!(stats.error_alpha, alpha);
        prop_assert_eq!(stats.error_color, color);
        prop_assert_eq!(stats.blocks, 1);
    }

    #[test]
    fn decoded_output_compresses_to_itself(source in block_strategy()) {
        let compressor = Compressor::new(Bc7Settings::normal());
        let mut output = [[0u8; 16]];
        compressor.compress_blocks(&[source], &mut output);

        let pixels = decode(&output[0]);
        let mut rows = [[0u8; 16]; 4];
        for (row, chunk) in rows.iter_mut().zip(pixels.chunks_exact(16)) {
            row.copy_from_slice(chunk);
        }

        let first = output;
        let stats = compressor.compress_blocks(&[SourceBlock::opaque(rows)], &mut output);

        prop_assert_eq!(output, first);
        prop_assert_eq!(stats.error_alpha + stats.error_color, 0);
        prop_assert_eq!(stats.ssim_alpha, 1.0);
        prop_assert_eq!(stats.ssim_color, 1.0);
    }

    #[test]
    fn hidden_blocks_cost_nothing(pixels in array::uniform4(array::uniform16(any::<u8>()))) {
        let compressor = Compressor::new(Bc7Settings::slow());
        let mut output = [[0u8; 16]];
        let source = SourceBlock { pixels, mask: [[0; 16]; 4] };

        let stats = compressor.compress_blocks(&[source], &mut output);

        prop_assert_eq!(stats.error_alpha, 0);
        prop_assert_eq!(stats.error_color, 0);
    }
}

#[rstest]
#[case::black([0, 0, 0, 255])]
#[case::white([255, 255, 255, 255])]
#[case::even([40, 80, 120, 255])]
#[case::transparent([12, 34, 56, 0])]
fn uniform_blocks_are_exact(#[case] bgra: [u8; 4]) {
    let mut rows = [[0u8; 16]; 4];
    for row in rows.iter_mut() {
        for pixel in row.chunks_exact_mut(4) {
            pixel.copy_from_slice(&bgra);
        }
    }

    let compressor = Compressor::new(Bc7Settings::draft());
    let mut output = [[0u8; 16]];
    let stats = compressor.compress_blocks(&[SourceBlock::opaque(rows)], &mut output);

    assert_eq!(stats.error_alpha, 0);
    assert_eq!(stats.error_color, 0);
}

#[test]
fn settings_without_draft_keep_the_destination() {
    let compressor = Compressor::new(Bc7Settings::none());
    let source = SourceBlock::opaque([[200; 16]; 4]);
    let mut output = [[0u8; 16]];

    let stats = compressor.compress_blocks(&[source], &mut output);

    assert_eq!(output, [[0u8; 16]]);
    assert!(stats.error_color > 0);
}
