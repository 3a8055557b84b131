//! Batched evaluation of candidate endpoint pairs against the rows of a levels table.
//!
//! Each row holds the denoised distance of one pixel value to every endpoint pair. A batch sums
//! the squared distances of `BATCH` neighbouring pairs over all rows at once, the loops are laid
//! out so the compiler can keep the lanes in vector registers.

/// Number of candidate pairs evaluated together.
pub(crate) const BATCH: usize = 16;

/// Saturating 16-bit sums for the pairs `base + lane * STEP`, `lane < lanes`.
///
/// Returns the sums and a flag per lane whose sum is below `top`. Stops as soon as no lane is
/// below `top` any more, the sums are partial in that case and the flags are zero.
#[inline(always)]
pub(crate) fn batch_short<const STEP: usize>(
    rows: &[&[u8]],
    base: usize,
    lanes: usize,
    top: u16,
) -> ([u16; BATCH], u32) {
    debug_assert!(lanes <= BATCH);

    let valid = if lanes >= 32 { u32::MAX } else { (1u32 << lanes) - 1 };

    let mut sums = [0u16; BATCH];
    let mut flags = valid;

    for row in rows {
        let row = &row[base..];

        for (lane, sum) in sums.iter_mut().enumerate().take(lanes) {
            let delta = row[lane * STEP] as u16;
            *sum = sum.saturating_add(delta * delta);
        }

        flags = 0;
        for (lane, &sum) in sums.iter().enumerate().take(lanes) {
            flags |= ((sum < top) as u32) << lane;
        }

        if flags == 0 {
            break;
        }
    }

    (sums, flags & valid)
}

/// Full 32-bit sums for the pairs `base + lane * STEP`, flags for lanes below `bound`.
#[inline(always)]
pub(crate) fn batch_full<const STEP: usize>(
    rows: &[&[u8]],
    base: usize,
    lanes: usize,
    bound: u32,
) -> ([u32; BATCH], u32) {
    debug_assert!(lanes <= BATCH);

    let valid = if lanes >= 32 { u32::MAX } else { (1u32 << lanes) - 1 };

    let mut sums = [0u32; BATCH];
    let mut flags = valid;

    for row in rows {
        let row = &row[base..];

        for (lane, sum) in sums.iter_mut().enumerate().take(lanes) {
            let delta = row[lane * STEP] as u32;
            *sum += delta * delta;
        }

        flags = 0;
        for (lane, &sum) in sums.iter().enumerate().take(lanes) {
            flags |= ((sum < bound) as u32) << lane;
        }

        if flags == 0 {
            break;
        }
    }

    (sums, flags & valid)
}

/// Smallest full sum over the pairs `base + lane * STEP`, or `best` if none is smaller.
#[inline(always)]
pub(crate) fn batch_minimum<const STEP: usize>(
    rows: &[&[u8]],
    base: usize,
    lanes: usize,
    best: u32,
) -> u32 {
    let (sums, flags) = batch_full::<STEP>(rows, base, lanes, best);

    let mut best = best;
    let mut flags = flags;
    while flags != 0 {
        let lane = flags.trailing_zeros() as usize;
        best = best.min(sums[lane]);
        flags &= flags - 1;
    }
    best
}
