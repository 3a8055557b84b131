//! Stable least significant digit sorts of candidate lists.

/// Candidate with a full 32-bit error.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct Node {
    pub error: i32,
    pub color: i32,
}

/// Candidate packed into one word, error in the upper half and color in the lower half.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[repr(transparent)]
pub(crate) struct NodeShort(pub u32);

impl NodeShort {
    #[inline(always)]
    pub(crate) const fn new(error: u16, color: u16) -> Self {
        Self(((error as u32) << 16) | color as u32)
    }

    #[inline(always)]
    pub(crate) const fn error(self) -> u32 {
        self.0 >> 16
    }

    #[inline(always)]
    pub(crate) const fn color(self) -> u32 {
        self.0 & 0xFFFF
    }
}

trait SortKey: Copy {
    fn key(&self) -> u32;
}

impl SortKey for Node {
    #[inline(always)]
    fn key(&self) -> u32 {
        self.error as u32
    }
}

impl SortKey for NodeShort {
    #[inline(always)]
    fn key(&self) -> u32 {
        self.0
    }
}

/// Sorts by the key bits from `first` upward, `radix` bits per pass.
///
/// Passes whose digit is zero in every key are skipped. Returns whichever buffer holds the result.
fn digit_sort<'a, T: SortKey>(
    input: &'a mut [T],
    work: &'a mut [T],
    radix: u32,
    first: u32,
) -> &'a mut [T] {
    let n = input.len();
    debug_assert!(work.len() >= n);

    let buckets = 1usize << radix;
    let mask = (buckets - 1) as u32;

    let mut counts = [0u32; 128];

    let mut a = input;
    let mut b = &mut work[..n];

    let any = a.iter().fold(0u32, |acc, node| acc | node.key());

    let mut shift = first;
    while shift < 32 {
        if (any >> shift) & mask != 0 {
            counts[..buckets].fill(0);

            for node in a.iter() {
                counts[((node.key() >> shift) & mask) as usize] += 1;
            }

            let mut total = 0;
            for count in counts[..buckets].iter_mut() {
                let old = *count;
                *count = total;
                total += old;
            }

            for node in a.iter() {
                let slot = &mut counts[((node.key() >> shift) & mask) as usize];
                b[*slot as usize] = *node;
                *slot += 1;
            }

            std::mem::swap(&mut a, &mut b);
        }

        shift += radix;
    }

    a
}

/// Sorts by error over all 32 bits with 7-bit digits.
pub(crate) fn radix_sort<'a>(input: &'a mut [Node], work: &'a mut [Node]) -> &'a mut [Node] {
    digit_sort(input, work, 7, 0)
}

/// Sorts by the error half only with 6-bit digits.
pub(crate) fn radix_sort_short<'a>(
    input: &'a mut [NodeShort],
    work: &'a mut [NodeShort],
) -> &'a mut [NodeShort] {
    digit_sort(input, work, 6, 16)
}
