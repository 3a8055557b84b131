//! Diagnostic tallies that worker threads update concurrently.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

/// Partial error evaluations of the rotation mode search, per channel combination.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum SearchPath {
    Ag = 0,
    Ar = 1,
    Agr = 2,
    Agb = 3,
    Agrb = 4,
}

/// Optional counters injected into a [`crate::Compressor`].
///
/// Every update is a relaxed `fetch_add`, they carry no ordering with the produced blocks.
/// Leaving the compressor without counters skips all of them.
#[derive(Debug, Default)]
pub struct Counters {
    modes: [AtomicU64; 9],
    already_encoded: AtomicU64,
    compressed: AtomicU64,
    glitches: AtomicU64,
    levels: [AtomicU64; 17],
    estimate_short: AtomicU64,
    estimate_full: AtomicU64,
    minimum: AtomicU64,
    search_paths: [[AtomicU64; 5]; 4],
}

impl Counters {
    /// Creates a zeroed set of counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks that ended up in `mode`, 8 counts blocks without a valid mode.
    pub fn mode(&self, mode: usize) -> u64 {
        self.modes.get(mode).map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Blocks whose destination already reproduced the source exactly.
    pub fn already_encoded(&self) -> u64 {
        self.already_encoded.load(Ordering::Relaxed)
    }

    /// Blocks that went through the search.
    pub fn compressed(&self) -> u64 {
        self.compressed.load(Ordering::Relaxed)
    }

    /// Blocks with a visible channel off by more than the glitch tolerance.
    pub fn glitches(&self) -> u64 {
        self.glitches.load(Ordering::Relaxed)
    }

    /// Logs every counter at `info` level.
    pub fn report(&self) {
        let modes: Vec<u64> = (0..self.modes.len()).map(|m| self.mode(m)).collect();
        info!(
            transparent = ?[modes[4], modes[6], modes[5], modes[7]],
            opaque = ?[modes[1], modes[3], modes[2], modes[0]],
            invalid = modes[8],
            "mode selection (transparent 4/6/5/7, opaque 1/3/2/0)"
        );
        info!(
            already = self.already_encoded(),
            compress = self.compressed(),
            bad = self.glitches(),
            "compress"
        );

        for (rotation, paths) in self.search_paths.iter().enumerate() {
            info!(
                rotation,
                ag = paths[SearchPath::Ag as usize].load(Ordering::Relaxed),
                ar = paths[SearchPath::Ar as usize].load(Ordering::Relaxed),
                agr = paths[SearchPath::Agr as usize].load(Ordering::Relaxed),
                agb = paths[SearchPath::Agb as usize].load(Ordering::Relaxed),
                agrb = paths[SearchPath::Agrb as usize].load(Ordering::Relaxed),
                "mode 5 partial errors"
            );
        }

        let levels: Vec<u64> = self
            .levels
            .iter()
            .skip(1)
            .map(|c| c.load(Ordering::Relaxed))
            .collect();
        info!(
            minimum = self.minimum.load(Ordering::Relaxed),
            full = self.estimate_full.load(Ordering::Relaxed),
            short = self.estimate_short.load(Ordering::Relaxed),
            levels = ?levels,
            "estimate"
        );
    }

    pub(crate) fn add_mode(&self, mode: u8) {
        if let Some(counter) = self.modes.get(mode as usize) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn add_already_encoded(&self) {
        self.already_encoded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_compressed(&self) {
        self.compressed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_glitch(&self) {
        self.glitches.fetch_add(1, Ordering::Relaxed);
    }

    /// One enumeration over `rows` visible pixels.
    pub(crate) fn add_levels(&self, rows: usize, short: bool) {
        if let Some(counter) = self.levels.get(rows) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
        if short {
            self.estimate_short.fetch_add(1, Ordering::Relaxed);
        } else {
            self.estimate_full.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn add_minimum(&self) {
        self.minimum.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_search_path(&self, rotation: u32, path: SearchPath) {
        self.search_paths[(rotation & 3) as usize][path as usize].fetch_add(1, Ordering::Relaxed);
    }
}
