use bytemuck::{Pod, Zeroable};

/// Effort settings of the BC7 encoder.
///
/// The three flags build on each other: `draft` runs the fast heuristics, `normal` adds the
/// thorough search of the winning mode and the full search of mode 5, `slow` also runs the
/// full search of mode 6. Settings without `draft` leave every destination block untouched.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Bc7Settings {
    draft: u32,
    normal: u32,
    slow: u32,
}

impl Bc7Settings {
    /// Fast heuristics only.
    pub const fn draft() -> Self {
        Self {
            draft: true as _,
            normal: false as _,
            slow: false as _,
        }
    }

    /// Fast heuristics and the thorough searches of the rotation mode.
    pub const fn normal() -> Self {
        Self {
            draft: true as _,
            normal: true as _,
            slow: false as _,
        }
    }

    /// Every search stage.
    pub const fn slow() -> Self {
        Self {
            draft: true as _,
            normal: true as _,
            slow: true as _,
        }
    }

    /// Settings that keep the destination as it is.
    pub const fn none() -> Self {
        Self {
            draft: false as _,
            normal: false as _,
            slow: false as _,
        }
    }

    #[inline(always)]
    pub const fn is_draft(&self) -> bool {
        self.draft != 0
    }

    #[inline(always)]
    pub const fn is_normal(&self) -> bool {
        self.draft != 0 && self.normal != 0
    }

    #[inline(always)]
    pub const fn is_slow(&self) -> bool {
        self.is_normal() && self.slow != 0
    }

    pub(crate) const fn name(&self) -> &'static str {
        if self.is_slow() {
            "slow"
        } else if self.is_normal() {
            "normal"
        } else if self.is_draft() {
            "draft"
        } else {
            "none"
        }
    }
}

impl Default for Bc7Settings {
    fn default() -> Self {
        Self::normal()
    }
}
