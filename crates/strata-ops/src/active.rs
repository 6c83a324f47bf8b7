//! Per-sample write enables for area kernels.
//!
//! An [`ActiveChannels`] vector says which destination samples a kernel may
//! modify. Samples are addressed by index in the destination's interleaved
//! layout (color components, then alpha).

use strata_core::FormatDescriptor;

/// Maximum samples per pixel (RGB + alpha).
pub const MAX_CHANNELS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActiveChannels {
    affect: [bool; MAX_CHANNELS],
}

impl Default for ActiveChannels {
    fn default() -> Self {
        Self::ALL
    }
}

impl ActiveChannels {
    /// Every sample writable.
    pub const ALL: Self = Self {
        affect: [true; MAX_CHANNELS],
    };

    pub const fn from_array(affect: [bool; MAX_CHANNELS]) -> Self {
        Self { affect }
    }

    #[inline]
    pub fn is_active(&self, index: usize) -> bool {
        self.affect.get(index).copied().unwrap_or(false)
    }

    pub fn set(&mut self, index: usize, active: bool) {
        if let Some(slot) = self.affect.get_mut(index) {
            *slot = active;
        }
    }

    /// True if the first `channels` samples are all writable.
    pub fn all_active(&self, channels: usize) -> bool {
        self.affect.iter().take(channels).all(|a| *a)
    }

    /// Copy with the alpha sample of `format` made read-only.
    pub fn lock_alpha(mut self, format: FormatDescriptor) -> Self {
        if let Some(a) = format.alpha_index() {
            self.set(a, false);
        }
        self
    }

    pub fn as_array(&self) -> [bool; MAX_CHANNELS] {
        self.affect
    }
}
