//! Compile-time defaults and the construction-time engine configuration.
//!
//! Every buffer in the engine is sized once from an [`EngineConfig`]; nothing
//! grows afterwards.

use crate::error::ConfigError;

/// Sample rate used when the host does not say otherwise.
pub const DEFAULT_SAMPLE_RATE: f32 = 48_000.0;
/// Highest sample rate a configuration accepts.
pub const MAX_SAMPLE_RATE: f32 = 384_000.0;
/// Samples per audio callback on the pedal hardware.
pub const AUDIO_BLOCK_SIZE: usize = 48;
/// Early tier block (low latency head of the IR).
pub const EARLY_BLOCK_SIZE: usize = 64;
/// Late tier block (efficient tail).
pub const LATE_BLOCK_SIZE: usize = 1024;
pub const MAX_PREDELAY_MS: f32 = 500.0;
/// Longest IR (per channel) accepted by a load.
pub const MAX_IR_LENGTH: usize = 4096;
/// Depth of the spectrum publication queue between control and audio threads.
pub const PUBLISH_SLOTS: usize = 4;

/// How a mono IR is turned into a stereo image.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum PseudoStereo {
    /// Mid/side width on the predelayed input before convolution.
    #[default]
    InputWidth,
    /// Derive a decorrelated right-channel IR from the mono one; the width
    /// knob then rebuilds spectra instead of touching the input.
    DecorrelatedIr { seed: u64 },
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f32,
    pub early_block: usize,
    pub late_block: usize,
    pub max_predelay_ms: f32,
    pub max_ir_len: usize,
    pub pseudo_stereo: PseudoStereo,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            early_block: EARLY_BLOCK_SIZE,
            late_block: LATE_BLOCK_SIZE,
            max_predelay_ms: MAX_PREDELAY_MS,
            max_ir_len: MAX_IR_LENGTH,
            pseudo_stereo: PseudoStereo::InputWidth,
        }
    }
}

impl EngineConfig {
    #[inline] pub fn with_sample_rate(mut self, sr: f32) -> Self { self.sample_rate = sr; self }
    #[inline] pub fn with_blocks(mut self, early: usize, late: usize) -> Self { self.early_block = early; self.late_block = late; self }
    #[inline] pub fn with_max_predelay_ms(mut self, ms: f32) -> Self { self.max_predelay_ms = ms; self }
    #[inline] pub fn with_max_ir_len(mut self, len: usize) -> Self { self.max_ir_len = len; self }
    #[inline] pub fn with_pseudo_stereo(mut self, mode: PseudoStereo) -> Self { self.pseudo_stereo = mode; self }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(ConfigError::SampleRate(self.sample_rate));
        }
        if self.sample_rate > MAX_SAMPLE_RATE {
            return Err(ConfigError::SampleRateTooHigh { rate: self.sample_rate, max: MAX_SAMPLE_RATE });
        }
        for (tier, size) in [("early", self.early_block), ("late", self.late_block)] {
            if size < 2 || !size.is_power_of_two() {
                return Err(ConfigError::BlockSize { tier, size });
            }
        }
        if self.late_block < 2 * self.early_block {
            return Err(ConfigError::TierOrder { early: self.early_block, late: self.late_block });
        }
        if !(self.max_predelay_ms.is_finite() && self.max_predelay_ms >= 0.0) {
            return Err(ConfigError::Predelay(self.max_predelay_ms));
        }
        if self.max_ir_len == 0 {
            return Err(ConfigError::ZeroIrCapacity);
        }
        Ok(())
    }

    /// Predelay ring capacity in samples, `ceil(max_ms · sr / 1000)`, at least 1.
    #[inline]
    pub fn predelay_capacity(&self) -> usize {
        ((self.max_predelay_ms * self.sample_rate / 1000.0).ceil() as usize).max(1)
    }

    /// IR samples the two tiers can hold together.
    #[inline]
    pub fn tier_coverage(&self) -> usize {
        self.early_block + self.late_block
    }

    /// Length for generated IRs: all of it reaches the convolver, so the IR
    /// length knob acts over its whole range.
    #[inline]
    pub fn bank_ir_len(&self) -> usize {
        self.tier_coverage().min(self.max_ir_len)
    }

    /// Delay applied to the early tier so both segments line up.
    #[inline]
    pub fn alignment_delay(&self) -> usize {
        self.late_block - 2 * self.early_block
    }

    /// Input-to-output delay of the wet path, in samples (predelay excluded).
    #[inline]
    pub fn latency(&self) -> usize {
        self.late_block - self.early_block - 1
    }
}
