use std::{fs::File, path::PathBuf, sync::Arc, time::Instant};

use bc7_core::{
    blocks_byte_size, decode::decompress_blocks_bgra8, Bc7Settings, Compressor, Counters,
};
use ddsfile::{AlphaMode, D3D10ResourceDimension, Dds, DxgiFormat, NewDxgiParams};
use image::ImageReader;
use tracing_subscriber::EnvFilter;

/// Source pixels padded to whole blocks. Padding is hidden by the mask.
struct SourceImage {
    width: u32,
    height: u32,
    padded_width: u32,
    padded_height: u32,
    bgra: Vec<u8>,
    mask: Vec<i8>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let (settings, file_name) = match parse_args() {
        Some(args) => args,
        None => return,
    };

    let start = Instant::now();

    let source = read_image(&file_name);

    let duration = start.elapsed();
    println!(
        "Image read took: {:.3} ms",
        duration.as_secs_f64() * 1000.0
    );

    let counters = Arc::new(Counters::new());
    let compressor = Compressor::with_counters(settings, counters.clone());
    let mut block_data = vec![0u8; blocks_byte_size(source.padded_width, source.padded_height)];

    let start = Instant::now();

    let stats = compressor
        .compress_bgra8(
            &source.bgra,
            Some(&source.mask),
            source.padded_width,
            source.padded_height,
            source.padded_width * 4,
            &mut block_data,
        )
        .expect("failed to compress image");

    let duration = start.elapsed();
    println!(
        "Compression took: {:.3} ms",
        duration.as_secs_f64() * 1000.0
    );

    let (ssim_alpha, ssim_color) = stats.mean_ssim();
    println!(
        "Blocks: {}, alpha error: {}, color error: {}, SSIM alpha: {:.5}, SSIM color: {:.5}",
        stats.blocks, stats.error_alpha, stats.error_color, ssim_alpha, ssim_color
    );
    counters.report();

    let start = Instant::now();

    let mut decoded = vec![0u8; source.bgra.len()];
    decompress_blocks_bgra8(
        &block_data,
        source.padded_width,
        source.padded_height,
        &mut decoded,
    )
    .expect("failed to decompress blocks");

    let duration = start.elapsed();
    println!(
        "Decompression took: {:.3} ms, PSNR: {:.2} dB",
        duration.as_secs_f64() * 1000.0,
        psnr(&source, &decoded)
    );

    let start = Instant::now();

    write_dds_file(&file_name, source.width, source.height, block_data);

    let duration = start.elapsed();
    println!(
        "DDS output to disk took: {:.3} ms",
        duration.as_secs_f64() * 1000.0
    );
}

fn read_image(file_name: &str) -> SourceImage {
    let image = ImageReader::open(file_name)
        .expect("can't open input image")
        .decode()
        .expect("can't decode image");

    let mut rgba_image = image.to_rgba8();
    let width = rgba_image.width();
    let height = rgba_image.height();

    for pixel in bytemuck::cast_slice_mut::<u8, [u8; 4]>(&mut rgba_image) {
        pixel.swap(0, 2);
    }

    let padded_width = (width + 3) & !3;
    let padded_height = (height + 3) & !3;
    let padded_row = padded_width as usize * 4;
    let row = width as usize * 4;

    let mut bgra = vec![0u8; padded_row * padded_height as usize];
    let mut mask = vec![0i8; bgra.len()];

    for (y, source_row) in rgba_image.chunks_exact(row).enumerate() {
        let start = y * padded_row;
        bgra[start..start + row].copy_from_slice(source_row);
        mask[start..start + row].fill(-1);
    }

    SourceImage {
        width,
        height,
        padded_width,
        padded_height,
        bgra,
        mask,
    }
}

/// Peak signal to noise ratio over the visible channels.
fn psnr(source: &SourceImage, decoded: &[u8]) -> f64 {
    let (sum, count) = source
        .bgra
        .iter()
        .zip(decoded)
        .zip(&source.mask)
        .filter(|&(_, &mask)| mask != 0)
        .fold((0.0, 0usize), |(sum, count), ((&a, &b), _)| {
            let d = a as f64 - b as f64;
            (sum + d * d, count + 1)
        });

    if count == 0 || sum == 0.0 {
        return f64::INFINITY;
    }

    let mse = sum / count as f64;
    10.0 * (255.0 * 255.0 / mse).log10()
}

fn write_dds_file(file_name: &str, width: u32, height: u32, block_data: Vec<u8>) {
    let mut dds = Dds::new_dxgi(NewDxgiParams {
        height,
        width,
        depth: None,
        format: DxgiFormat::BC7_UNorm,
        mipmap_levels: Some(1),
        array_layers: None,
        caps2: None,
        is_cubemap: false,
        resource_dimension: D3D10ResourceDimension::Texture2D,
        alpha_mode: AlphaMode::Straight,
    })
    .expect("failed to create DDS header");

    dds.data = block_data;

    let mut dds_name = PathBuf::from(file_name);
    dds_name.set_extension("dds");

    let mut file = File::create(dds_name).expect("failed to create output file");
    dds.write(&mut file).expect("failed to write DDS file");
}

fn print_help() {
    println!("Usage: compressor <effort> <input_file>");
    println!("\nEffort:");
    println!("  draft  - fast heuristics of modes 6, 5 and 3");
    println!("  normal - adds the thorough search of the winning mode and the full mode 5 search");
    println!("  slow   - adds the full mode 6 search");
}

fn parse_args() -> Option<(Bc7Settings, String)> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() != 3 || args.contains(&"--help".to_string()) {
        print_help();
        return None;
    }

    let settings = match args[1].to_lowercase().as_str() {
        "draft" => Bc7Settings::draft(),
        "normal" => Bc7Settings::normal(),
        "slow" => Bc7Settings::slow(),
        _ => {
            println!("Error: Invalid effort");
            print_help();
            return None;
        }
    };

    let file_name = args[2].clone();

    Some((settings, file_name))
}
