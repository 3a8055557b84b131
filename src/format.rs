//! Fixed facts of the BC7 block format shared by the decoder and the encoder.

/// Channel slots inside the engine. Source pixels arrive as BGRA and are kept as AGRB.
pub(crate) const CH_A: usize = 0;
pub(crate) const CH_G: usize = 1;
pub(crate) const CH_R: usize = 2;
pub(crate) const CH_B: usize = 3;

pub(crate) static WEIGHT2: [i32; 4] = [0, 21, 43, 64];
pub(crate) static WEIGHT3: [i32; 8] = [0, 9, 18, 27, 37, 46, 55, 64];
pub(crate) static WEIGHT4: [i32; 16] = [0, 4, 9, 13, 17, 21, 26, 30, 34, 38, 43, 47, 51, 55, 60, 64];

/// Endpoint pair per channel, `[channel][endpoint]`, as fully expanded 8-bit values.
pub(crate) type Endpoints = [[u8; 2]; 4];

/// Mode value used for blocks whose selector byte has no bit set.
pub(crate) const MODE_INVALID: u8 = 8;

/// How a mode stores its parity bits.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum ParityBits {
    None,
    /// One bit per subset, shared by both endpoints.
    Shared,
    /// One bit per endpoint.
    Unique,
}

/// Bit layout of one mode.
#[derive(Copy, Clone, Debug)]
pub(crate) struct ModeInfo {
    pub subsets: usize,
    pub partition_bits: u32,
    pub rotation_bits: u32,
    pub selector_bits: u32,
    pub color_bits: u32,
    pub alpha_bits: u32,
    pub parity: ParityBits,
    pub index_bits: u32,
    pub index_bits2: u32,
}

pub(crate) static MODE_INFO: [ModeInfo; 8] = [
    ModeInfo::new(3, 4, 0, 0, 4, 0, ParityBits::Unique, 3, 0),
    ModeInfo::new(2, 6, 0, 0, 6, 0, ParityBits::Shared, 3, 0),
    ModeInfo::new(3, 6, 0, 0, 5, 0, ParityBits::None, 2, 0),
    ModeInfo::new(2, 6, 0, 0, 7, 0, ParityBits::Unique, 2, 0),
    ModeInfo::new(1, 0, 2, 1, 5, 6, ParityBits::None, 2, 3),
    ModeInfo::new(1, 0, 2, 0, 7, 8, ParityBits::None, 2, 2),
    ModeInfo::new(1, 0, 0, 0, 7, 7, ParityBits::Unique, 4, 0),
    ModeInfo::new(2, 6, 0, 0, 5, 5, ParityBits::Unique, 2, 0),
];

impl ModeInfo {
    #[allow(clippy::too_many_arguments)]
    const fn new(
        subsets: usize,
        partition_bits: u32,
        rotation_bits: u32,
        selector_bits: u32,
        color_bits: u32,
        alpha_bits: u32,
        parity: ParityBits,
        index_bits: u32,
        index_bits2: u32,
    ) -> Self {
        Self {
            subsets,
            partition_bits,
            rotation_bits,
            selector_bits,
            color_bits,
            alpha_bits,
            parity,
            index_bits,
            index_bits2,
        }
    }
}

/// Encoding of a block as the search engine tracks it.
///
/// `parameter` is the partition for multi-subset modes and the rotation (plus the index
/// selector in bit 2 for mode 4) for the rotation modes. Endpoints of the rotation modes are
/// kept in the encoded frame, that is with the scalar channel already moved into the alpha slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct Encoding {
    pub mode: u8,
    pub parameter: u32,
    pub colors: [Endpoints; 3],
}

impl Default for Encoding {
    fn default() -> Self {
        Self {
            mode: MODE_INVALID,
            parameter: 0,
            colors: [[[0; 2]; 4]; 3],
        }
    }
}

#[inline(always)]
pub(crate) fn interpolate(a: i32, b: i32, weight: i32) -> i32 {
    (a * (64 - weight) + b * weight + 32) >> 6
}

/// Expands a `bits` wide value to 8 bits by replicating its top bits.
#[inline(always)]
pub(crate) const fn expand(value: i32, bits: u32) -> i32 {
    let value = value << (8 - bits);
    value | (value >> bits)
}

/// Source channel that occupies the alpha slot under a rotation.
#[inline(always)]
pub(crate) const fn rotation_channel(rotation: u32) -> usize {
    match rotation & 3 {
        1 => CH_R,
        2 => CH_G,
        3 => CH_B,
        _ => CH_A,
    }
}

/// Swaps the alpha slot with the rotated channel. The operation is its own inverse.
#[inline(always)]
pub(crate) fn rotate(endpoints: &Endpoints, rotation: u32) -> Endpoints {
    let mut rotated = *endpoints;
    rotated.swap(CH_A, rotation_channel(rotation));
    rotated
}

/// Subset of a pixel inside a partition, `subsets` being 2 or 3.
#[inline(always)]
pub(crate) fn partition_subset(subsets: usize, partition: usize, pixel: usize) -> usize {
    (PARTITION_SETS[subsets - 2][partition][pixel >> 2][pixel & 3] & 0x03) as usize
}

/// Whether a pixel is a fix-up anchor, stored with one index bit less.
#[inline(always)]
pub(crate) fn is_anchor(subsets: usize, partition: usize, pixel: usize) -> bool {
    if subsets == 1 {
        pixel == 0
    } else {
        PARTITION_SETS[subsets - 2][partition][pixel >> 2][pixel & 3] & 0x80 != 0
    }
}

// There are 64 possible partition sets for a two-region tile.
// Each 4x4 block represents a single shape.
// Here also every fix-up index has MSB bit set.
pub(crate) static PARTITION_SETS: [[[[u8; 4]; 4]; 64]; 2] = [
    [
        // Partition table for 2-subset BPTC
        [[128, 0, 1, 1], [0, 0, 1, 1], [0, 0, 1, 1], [0, 0, 1, 129]], //  0
        [[128, 0, 0, 1], [0, 0, 0, 1], [0, 0, 0, 1], [0, 0, 0, 129]], //  1
        [[128, 1, 1, 1], [0, 1, 1, 1], [0, 1, 1, 1], [0, 1, 1, 129]], //  2
        [[128, 0, 0, 1], [0, 0, 1, 1], [0, 0, 1, 1], [0, 1, 1, 129]], //  3
        [[128, 0, 0, 0], [0, 0, 0, 1], [0, 0, 0, 1], [0, 0, 1, 129]], //  4
        [[128, 0, 1, 1], [0, 1, 1, 1], [0, 1, 1, 1], [1, 1, 1, 129]], //  5
        [[128, 0, 0, 1], [0, 0, 1, 1], [0, 1, 1, 1], [1, 1, 1, 129]], //  6
        [[128, 0, 0, 0], [0, 0, 0, 1], [0, 0, 1, 1], [0, 1, 1, 129]], //  7
        [[128, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 1], [0, 0, 1, 129]], //  8
        [[128, 0, 1, 1], [0, 1, 1, 1], [1, 1, 1, 1], [1, 1, 1, 129]], //  9
        [[128, 0, 0, 0], [0, 0, 0, 1], [0, 1, 1, 1], [1, 1, 1, 129]], // 10
        [[128, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 1], [0, 1, 1, 129]], // 11
        [[128, 0, 0, 1], [0, 1, 1, 1], [1, 1, 1, 1], [1, 1, 1, 129]], // 12
        [[128, 0, 0, 0], [0, 0, 0, 0], [1, 1, 1, 1], [1, 1, 1, 129]], // 13
        [[128, 0, 0, 0], [1, 1, 1, 1], [1, 1, 1, 1], [1, 1, 1, 129]], // 14
        [[128, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [1, 1, 1, 129]], // 15
        [[128, 0, 0, 0], [1, 0, 0, 0], [1, 1, 1, 0], [1, 1, 1, 129]], // 16
        [[128, 1, 129, 1], [0, 0, 0, 1], [0, 0, 0, 0], [0, 0, 0, 0]], // 17
        [[128, 0, 0, 0], [0, 0, 0, 0], [129, 0, 0, 0], [1, 1, 1, 0]], // 18
        [[128, 1, 129, 1], [0, 0, 1, 1], [0, 0, 0, 1], [0, 0, 0, 0]], // 19
        [[128, 0, 129, 1], [0, 0, 0, 1], [0, 0, 0, 0], [0, 0, 0, 0]], // 20
        [[128, 0, 0, 0], [1, 0, 0, 0], [129, 1, 0, 0], [1, 1, 1, 0]], // 21
        [[128, 0, 0, 0], [0, 0, 0, 0], [129, 0, 0, 0], [1, 1, 0, 0]], // 22
        [[128, 1, 1, 1], [0, 0, 1, 1], [0, 0, 1, 1], [0, 0, 0, 129]], // 23
        [[128, 0, 129, 1], [0, 0, 0, 1], [0, 0, 0, 1], [0, 0, 0, 0]], // 24
        [[128, 0, 0, 0], [1, 0, 0, 0], [129, 0, 0, 0], [1, 1, 0, 0]], // 25
        [[128, 1, 129, 0], [0, 1, 1, 0], [0, 1, 1, 0], [0, 1, 1, 0]], // 26
        [[128, 0, 129, 1], [0, 1, 1, 0], [0, 1, 1, 0], [1, 1, 0, 0]], // 27
        [[128, 0, 0, 1], [0, 1, 1, 1], [129, 1, 1, 0], [1, 0, 0, 0]], // 28
        [[128, 0, 0, 0], [1, 1, 1, 1], [129, 1, 1, 1], [0, 0, 0, 0]], // 29
        [[128, 1, 129, 1], [0, 0, 0, 1], [1, 0, 0, 0], [1, 1, 1, 0]], // 30
        [[128, 0, 129, 1], [1, 0, 0, 1], [1, 0, 0, 1], [1, 1, 0, 0]], // 31
        [[128, 1, 0, 1], [0, 1, 0, 1], [0, 1, 0, 1], [0, 1, 0, 129]], // 32
        [[128, 0, 0, 0], [1, 1, 1, 1], [0, 0, 0, 0], [1, 1, 1, 129]], // 33
        [[128, 1, 0, 1], [1, 0, 129, 0], [0, 1, 0, 1], [1, 0, 1, 0]], // 34
        [[128, 0, 1, 1], [0, 0, 1, 1], [129, 1, 0, 0], [1, 1, 0, 0]], // 35
        [[128, 0, 129, 1], [1, 1, 0, 0], [0, 0, 1, 1], [1, 1, 0, 0]], // 36
        [[128, 1, 0, 1], [0, 1, 0, 1], [129, 0, 1, 0], [1, 0, 1, 0]], // 37
        [[128, 1, 1, 0], [1, 0, 0, 1], [0, 1, 1, 0], [1, 0, 0, 129]], // 38
        [[128, 1, 0, 1], [1, 0, 1, 0], [1, 0, 1, 0], [0, 1, 0, 129]], // 39
        [[128, 1, 129, 1], [0, 0, 1, 1], [1, 1, 0, 0], [1, 1, 1, 0]], // 40
        [[128, 0, 0, 1], [0, 0, 1, 1], [129, 1, 0, 0], [1, 0, 0, 0]], // 41
        [[128, 0, 129, 1], [0, 0, 1, 0], [0, 1, 0, 0], [1, 1, 0, 0]], // 42
        [[128, 0, 129, 1], [1, 0, 1, 1], [1, 1, 0, 1], [1, 1, 0, 0]], // 43
        [[128, 1, 129, 0], [1, 0, 0, 1], [1, 0, 0, 1], [0, 1, 1, 0]], // 44
        [[128, 0, 1, 1], [1, 1, 0, 0], [1, 1, 0, 0], [0, 0, 1, 129]], // 45
        [[128, 1, 1, 0], [0, 1, 1, 0], [1, 0, 0, 1], [1, 0, 0, 129]], // 46
        [[128, 0, 0, 0], [0, 1, 129, 0], [0, 1, 1, 0], [0, 0, 0, 0]], // 47
        [[128, 1, 0, 0], [1, 1, 129, 0], [0, 1, 0, 0], [0, 0, 0, 0]], // 48
        [[128, 0, 129, 0], [0, 1, 1, 1], [0, 0, 1, 0], [0, 0, 0, 0]], // 49
        [[128, 0, 0, 0], [0, 0, 129, 0], [0, 1, 1, 1], [0, 0, 1, 0]], // 50
        [[128, 0, 0, 0], [0, 1, 0, 0], [129, 1, 1, 0], [0, 1, 0, 0]], // 51
        [[128, 1, 1, 0], [1, 1, 0, 0], [1, 0, 0, 1], [0, 0, 1, 129]], // 52
        [[128, 0, 1, 1], [0, 1, 1, 0], [1, 1, 0, 0], [1, 0, 0, 129]], // 53
        [[128, 1, 129, 0], [0, 0, 1, 1], [1, 0, 0, 1], [1, 1, 0, 0]], // 54
        [[128, 0, 129, 1], [1, 0, 0, 1], [1, 1, 0, 0], [0, 1, 1, 0]], // 55
        [[128, 1, 1, 0], [1, 1, 0, 0], [1, 1, 0, 0], [1, 0, 0, 129]], // 56
        [[128, 1, 1, 0], [0, 0, 1, 1], [0, 0, 1, 1], [1, 0, 0, 129]], // 57
        [[128, 1, 1, 1], [1, 1, 1, 0], [1, 0, 0, 0], [0, 0, 0, 129]], // 58
        [[128, 0, 0, 1], [1, 0, 0, 0], [1, 1, 1, 0], [0, 1, 1, 129]], // 59
        [[128, 0, 0, 0], [1, 1, 1, 1], [0, 0, 1, 1], [0, 0, 1, 129]], // 60
        [[128, 0, 129, 1], [0, 0, 1, 1], [1, 1, 1, 1], [0, 0, 0, 0]], // 61
        [[128, 0, 129, 0], [0, 0, 1, 0], [1, 1, 1, 0], [1, 1, 1, 0]], // 62
        [[128, 1, 0, 0], [0, 1, 0, 0], [0, 1, 1, 1], [0, 1, 1, 129]], // 63
    ],
    [
        // Partition table for 3-subset BPTC
        [[128, 0, 1, 129], [0, 0, 1, 1], [0, 2, 2, 1], [2, 2, 2, 130]], //  0
        [[128, 0, 0, 129], [0, 0, 1, 1], [130, 2, 1, 1], [2, 2, 2, 1]], //  1
        [[128, 0, 0, 0], [2, 0, 0, 1], [130, 2, 1, 1], [2, 2, 1, 129]], //  2
        [[128, 2, 2, 130], [0, 0, 2, 2], [0, 0, 1, 1], [0, 1, 1, 129]], //  3
        [[128, 0, 0, 0], [0, 0, 0, 0], [129, 1, 2, 2], [1, 1, 2, 130]], //  4
        [[128, 0, 1, 129], [0, 0, 1, 1], [0, 0, 2, 2], [0, 0, 2, 130]], //  5
        [[128, 0, 2, 130], [0, 0, 2, 2], [1, 1, 1, 1], [1, 1, 1, 129]], //  6
        [[128, 0, 1, 1], [0, 0, 1, 1], [130, 2, 1, 1], [2, 2, 1, 129]], //  7
        [[128, 0, 0, 0], [0, 0, 0, 0], [129, 1, 1, 1], [2, 2, 2, 130]], //  8
        [[128, 0, 0, 0], [1, 1, 1, 1], [129, 1, 1, 1], [2, 2, 2, 130]], //  9
        [[128, 0, 0, 0], [1, 1, 129, 1], [2, 2, 2, 2], [2, 2, 2, 130]], // 10
        [[128, 0, 1, 2], [0, 0, 129, 2], [0, 0, 1, 2], [0, 0, 1, 130]], // 11
        [[128, 1, 1, 2], [0, 1, 129, 2], [0, 1, 1, 2], [0, 1, 1, 130]], // 12
        [[128, 1, 2, 2], [0, 129, 2, 2], [0, 1, 2, 2], [0, 1, 2, 130]], // 13
        [[128, 0, 1, 129], [0, 1, 1, 2], [1, 1, 2, 2], [1, 2, 2, 130]], // 14
        [[128, 0, 1, 129], [2, 0, 0, 1], [130, 2, 0, 0], [2, 2, 2, 0]], // 15
        [[128, 0, 0, 129], [0, 0, 1, 1], [0, 1, 1, 2], [1, 1, 2, 130]], // 16
        [[128, 1, 1, 129], [0, 0, 1, 1], [130, 0, 0, 1], [2, 2, 0, 0]], // 17
        [[128, 0, 0, 0], [1, 1, 2, 2], [129, 1, 2, 2], [1, 1, 2, 130]], // 18
        [[128, 0, 2, 130], [0, 0, 2, 2], [0, 0, 2, 2], [1, 1, 1, 129]], // 19
        [[128, 1, 1, 129], [0, 1, 1, 1], [0, 2, 2, 2], [0, 2, 2, 130]], // 20
        [[128, 0, 0, 129], [0, 0, 0, 1], [130, 2, 2, 1], [2, 2, 2, 1]], // 21
        [[128, 0, 0, 0], [0, 0, 129, 1], [0, 1, 2, 2], [0, 1, 2, 130]], // 22
        [[128, 0, 0, 0], [1, 1, 0, 0], [130, 2, 129, 0], [2, 2, 1, 0]], // 23
        [[128, 1, 2, 130], [0, 129, 2, 2], [0, 0, 1, 1], [0, 0, 0, 0]], // 24
        [[128, 0, 1, 2], [0, 0, 1, 2], [129, 1, 2, 2], [2, 2, 2, 130]], // 25
        [[128, 1, 1, 0], [1, 2, 130, 1], [129, 2, 2, 1], [0, 1, 1, 0]], // 26
        [[128, 0, 0, 0], [0, 1, 129, 0], [1, 2, 130, 1], [1, 2, 2, 1]], // 27
        [[128, 0, 2, 2], [1, 1, 0, 2], [129, 1, 0, 2], [0, 0, 2, 130]], // 28
        [[128, 1, 1, 0], [0, 129, 1, 0], [2, 0, 0, 2], [2, 2, 2, 130]], // 29
        [[128, 0, 1, 1], [0, 1, 2, 2], [0, 1, 130, 2], [0, 0, 1, 129]], // 30
        [[128, 0, 0, 0], [2, 0, 0, 0], [130, 2, 1, 1], [2, 2, 2, 129]], // 31
        [[128, 0, 0, 0], [0, 0, 0, 2], [129, 1, 2, 2], [1, 2, 2, 130]], // 32
        [[128, 2, 2, 130], [0, 0, 2, 2], [0, 0, 1, 2], [0, 0, 1, 129]], // 33
        [[128, 0, 1, 129], [0, 0, 1, 2], [0, 0, 2, 2], [0, 2, 2, 130]], // 34
        [[128, 1, 2, 0], [0, 129, 2, 0], [0, 1, 130, 0], [0, 1, 2, 0]], // 35
        [[128, 0, 0, 0], [1, 1, 129, 1], [2, 2, 130, 2], [0, 0, 0, 0]], // 36
        [[128, 1, 2, 0], [1, 2, 0, 1], [130, 0, 129, 2], [0, 1, 2, 0]], // 37
        [[128, 1, 2, 0], [2, 0, 1, 2], [129, 130, 0, 1], [0, 1, 2, 0]], // 38
        [[128, 0, 1, 1], [2, 2, 0, 0], [1, 1, 130, 2], [0, 0, 1, 129]], // 39
        [[128, 0, 1, 1], [1, 1, 130, 2], [2, 2, 0, 0], [0, 0, 1, 129]], // 40
        [[128, 1, 0, 129], [0, 1, 0, 1], [2, 2, 2, 2], [2, 2, 2, 130]], // 41
        [[128, 0, 0, 0], [0, 0, 0, 0], [130, 1, 2, 1], [2, 1, 2, 129]], // 42
        [[128, 0, 2, 2], [1, 129, 2, 2], [0, 0, 2, 2], [1, 1, 2, 130]], // 43
        [[128, 0, 2, 130], [0, 0, 1, 1], [0, 0, 2, 2], [0, 0, 1, 129]], // 44
        [[128, 2, 2, 0], [1, 2, 130, 1], [0, 2, 2, 0], [1, 2, 2, 129]], // 45
        [[128, 1, 0, 1], [2, 2, 130, 2], [2, 2, 2, 2], [0, 1, 0, 129]], // 46
        [[128, 0, 0, 0], [2, 1, 2, 1], [130, 1, 2, 1], [2, 1, 2, 129]], // 47
        [[128, 1, 0, 129], [0, 1, 0, 1], [0, 1, 0, 1], [2, 2, 2, 130]], // 48
        [[128, 2, 2, 130], [0, 1, 1, 1], [0, 2, 2, 2], [0, 1, 1, 129]], // 49
        [[128, 0, 0, 2], [1, 129, 1, 2], [0, 0, 0, 2], [1, 1, 1, 130]], // 50
        [[128, 0, 0, 0], [2, 129, 1, 2], [2, 1, 1, 2], [2, 1, 1, 130]], // 51
        [[128, 2, 2, 2], [0, 129, 1, 1], [0, 1, 1, 1], [0, 2, 2, 130]], // 52
        [[128, 0, 0, 2], [1, 1, 1, 2], [129, 1, 1, 2], [0, 0, 0, 130]], // 53
        [[128, 1, 1, 0], [0, 129, 1, 0], [0, 1, 1, 0], [2, 2, 2, 130]], // 54
        [[128, 0, 0, 0], [0, 0, 0, 0], [2, 1, 129, 2], [2, 1, 1, 130]], // 55
        [[128, 1, 1, 0], [0, 129, 1, 0], [2, 2, 2, 2], [2, 2, 2, 130]], // 56
        [[128, 0, 2, 2], [0, 0, 1, 1], [0, 0, 129, 1], [0, 0, 2, 130]], // 57
        [[128, 0, 2, 2], [1, 1, 2, 2], [129, 1, 2, 2], [0, 0, 2, 130]], // 58
        [[128, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [2, 129, 1, 130]], // 59
        [[128, 0, 0, 130], [0, 0, 0, 1], [0, 0, 0, 2], [0, 0, 0, 129]], // 60
        [[128, 2, 2, 2], [1, 2, 2, 2], [0, 2, 2, 2], [129, 2, 2, 130]], // 61
        [[128, 1, 0, 129], [2, 2, 2, 2], [2, 2, 2, 2], [2, 2, 2, 130]], // 62
        [[128, 1, 1, 129], [2, 0, 1, 1], [130, 2, 0, 1], [2, 2, 2, 0]], // 63
    ],
];

/// Little endian bit packer of one block.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct BitWriter {
    bits: u128,
    position: u32,
}

impl BitWriter {
    #[inline(always)]
    pub(crate) fn write(&mut self, value: u64, count: u32) {
        debug_assert!(count == 64 || value >> count == 0);
        debug_assert!(self.position + count <= 128);
        self.bits |= (value as u128) << self.position;
        self.position += count;
    }

    /// Writes `bits` per pixel from `table`, one bit less for the anchor pixels.
    pub(crate) fn write_indices(&mut self, table: u64, bits: u32, anchor: impl Fn(usize) -> bool) {
        let mask = (1u64 << bits) - 1;
        for pixel in 0..16 {
            let index = (table >> (pixel as u32 * bits)) & mask;
            let count = bits - anchor(pixel) as u32;
            self.write(index, count);
        }
    }

    pub(crate) fn finish(self) -> [u8; 16] {
        debug_assert_eq!(self.position, 128);
        self.bits.to_le_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_replicates_top_bits() {
        assert_eq!(expand(0x7F, 7), 0xFF);
        assert_eq!(expand(0x40, 7), 0x81);
        assert_eq!(expand(0x1F, 5), 0xFF);
        assert_eq!(expand(0x10, 5), 0x84);
        assert_eq!(expand(0xAB, 8), 0xAB);
    }

    #[test]
    fn interpolation_weights_are_symmetric() {
        for weights in [&WEIGHT2[..], &WEIGHT3[..], &WEIGHT4[..]] {
            let n = weights.len();
            for k in 0..n {
                assert_eq!(weights[k] + weights[n - 1 - k], 64);
            }
        }
    }

    #[test]
    fn every_partition_has_one_anchor_per_subset() {
        for subsets in 2..=3 {
            for partition in 0..64 {
                let mut anchors = [0; 3];
                for pixel in 0..16 {
                    if is_anchor(subsets, partition, pixel) {
                        anchors[partition_subset(subsets, partition, pixel)] += 1;
                    }
                }
                assert_eq!(&anchors[..subsets], &[1, 1, 1][..subsets]);
                assert!(is_anchor(subsets, partition, 0));
                assert_eq!(partition_subset(subsets, partition, 0), 0);
            }
        }
    }

    #[test]
    fn writer_packs_from_the_lowest_bit() {
        let mut writer = BitWriter::default();
        writer.write(1 << 6, 7);
        writer.write(0x7F, 7);
        writer.write((1 << 51) - 1, 51);
        writer.write_indices(0xFFFF_FFFF_FFFF_FFF7, 4, |pixel| pixel == 0);

        let bytes = writer.finish();
        assert_eq!(bytes[0], 0xC0);
        assert_eq!(bytes[1], 0xFF);
        assert_eq!(u128::from_le_bytes(bytes) >> 14, (1u128 << 114) - 1);
    }

    #[test]
    fn rotation_is_an_involution() {
        let endpoints: Endpoints = [[1, 2], [3, 4], [5, 6], [7, 8]];
        for rotation in 0..4 {
            assert_eq!(rotate(&rotate(&endpoints, rotation), rotation), endpoints);
        }
        assert_eq!(rotate(&endpoints, 1)[CH_A], [5, 6]);
        assert_eq!(rotate(&endpoints, 2)[CH_A], [3, 4]);
        assert_eq!(rotate(&endpoints, 3)[CH_A], [7, 8]);
    }
}
