//! Working state of one block while it is being compressed.

use crate::{
    decode::DecodedBlock,
    encode::{
        area::Area,
        common::{BlockError, BlockSsim},
        levels::LevelsScratch,
        SourceBlock,
    },
    format::{is_anchor, partition_subset, Encoding},
};

/// BGRA byte offset of every engine channel.
const FROM_BGRA: [usize; 4] = [3, 1, 2, 0];

/// Per block state. One cell is reused for all blocks a worker compresses.
pub(crate) struct Cell {
    /// Masked source values, A, G, R, B per pixel.
    pub values: [[i32; 4]; 16],
    /// `-1` for visible channels, `0` otherwise.
    pub masks: [[i32; 4]; 16],
    pub best: Encoding,
    /// Encoding the destination held before the search.
    pub personal_mode: u8,
    pub personal_parameter: u32,
    pub error: BlockError,
    pub quality: BlockSsim,
    /// Errors at or below this are not worth another search stage.
    pub denoise_step: i32,
    /// Error of forcing the alpha of the whole block to 255.
    pub opaque_alpha_error: i32,
    pub area1: Area,
    areas2: Box<[[Area; 2]; 64]>,
    built2: u64,
    pub scratch: LevelsScratch,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            values: [[0; 4]; 16],
            masks: [[0; 4]; 16],
            best: Encoding::default(),
            personal_mode: 0,
            personal_parameter: 0,
            error: BlockError::default(),
            quality: BlockSsim::PERFECT,
            denoise_step: 0,
            opaque_alpha_error: 0,
            area1: Area::default(),
            areas2: Box::new([[Area::default(); 2]; 64]),
            built2: 0,
            scratch: LevelsScratch::default(),
        }
    }
}

impl Cell {
    /// Loads the pixels and the visibility mask of a source block.
    pub(crate) fn load(&mut self, source: &SourceBlock) {
        for i in 0..16 {
            let (y, x) = (i >> 2, (i & 3) << 2);
            for (c, &offset) in FROM_BGRA.iter().enumerate() {
                let mask = if source.mask[y][x + offset] != 0 { -1 } else { 0 };
                self.masks[i][c] = mask;
                self.values[i][c] = source.pixels[y][x + offset] as i32 & mask;
            }
        }

        self.best = Encoding::default();
        self.personal_mode = self.best.mode;
        self.personal_parameter = 0;
        self.error = BlockError::default();
        self.quality = BlockSsim::PERFECT;
        self.denoise_step = 0;
        self.opaque_alpha_error = 0;
        self.built2 = 0;
    }

    /// Takes over a decoded encoding as the current best.
    pub(crate) fn adopt(&mut self, decoded: &DecodedBlock) {
        self.best = decoded.encoding;
        self.personal_mode = decoded.encoding.mode;
        self.personal_parameter = decoded.encoding.parameter;
    }

    pub(crate) fn build_area1(&mut self) {
        const ALL: [u8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];
        self.area1 = Area::build(&self.values, &self.masks, &ALL);
    }

    /// Areas of both subsets of a 2-subset `partition`, built on first use.
    pub(crate) fn ensure_area2(&mut self, partition: usize) -> &[Area; 2] {
        if self.built2 & (1 << partition) == 0 {
            for subset in 0..2 {
                let mut pixels = [0u8; 16];
                let mut n = 1;
                for pixel in 0..16 {
                    if partition_subset(2, partition, pixel) != subset {
                        continue;
                    }
                    if is_anchor(2, partition, pixel) {
                        pixels[0] = pixel as u8;
                    } else {
                        pixels[n] = pixel as u8;
                        n += 1;
                    }
                }
                self.areas2[partition][subset] = Area::build(&self.values, &self.masks, &pixels[..n]);
            }
            self.built2 |= 1 << partition;
        }

        &self.areas2[partition]
    }

    /// Areas of a 2-subset `partition` if they are built already.
    pub(crate) fn area2(&self, partition: usize) -> Option<&[Area; 2]> {
        (self.built2 & (1u64 << partition) != 0).then(|| &self.areas2[partition])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{CH_A, CH_B, CH_G, CH_R};

    fn source(mask: u8) -> SourceBlock {
        let mut pixels = [[0u8; 16]; 4];
        for (y, row) in pixels.iter_mut().enumerate() {
            for x in 0..4 {
                row[x * 4..x * 4 + 4].copy_from_slice(&[10 + y as u8, 20, 30, 40 + x as u8]);
            }
        }
        SourceBlock {
            pixels,
            mask: [[mask as i8; 16]; 4],
        }
    }

    #[test]
    fn loads_bgra_as_agrb() {
        let mut cell = Cell::default();
        cell.load(&source(0xFF));

        assert_eq!(cell.values[0][CH_B], 10);
        assert_eq!(cell.values[0][CH_G], 20);
        assert_eq!(cell.values[0][CH_R], 30);
        assert_eq!(cell.values[0][CH_A], 40);
        assert_eq!(cell.values[7][CH_A], 43);
        assert_eq!(cell.values[7][CH_B], 11);
        assert_eq!(cell.masks[5], [-1; 4]);
    }

    #[test]
    fn hidden_channels_are_zeroed() {
        let mut cell = Cell::default();
        cell.load(&source(0));

        assert_eq!(cell.values, [[0; 4]; 16]);
        assert_eq!(cell.masks, [[0; 4]; 16]);
    }

    #[test]
    fn partition_areas_start_at_their_anchor() {
        let mut cell = Cell::default();
        cell.load(&source(0xFF));
        assert!(cell.area2(7).is_none());

        for partition in 0..64 {
            let areas = *cell.ensure_area2(partition);
            assert_eq!(areas[0].count + areas[1].count, 16);
            assert_eq!(areas[0].pixel_set() & areas[1].pixel_set(), 0);
            for (subset, area) in areas.iter().enumerate() {
                assert!(is_anchor(2, partition, area.zero_index));
                assert_eq!(partition_subset(2, partition, area.zero_index), subset);
            }
        }
        assert_eq!(cell.built2, u64::MAX);
        assert!(cell.area2(7).is_some());
    }
}
