//! Reverb parameters: ranges, defaults, clamping and the lock-free shared copy.
//!
//! Design
//! - Every setter clamps; there is no invalid-parameter error path
//! - NaN clamps to the range minimum, infinities to the nearest bound
//! - `SharedParams` holds one atomic per field; the control loop writes, the
//!   audio callback takes a `snapshot()` once per block (last writer wins)

use echoverb_core::dsp::clamp;
use portable_atomic::{AtomicBool, AtomicF32, Ordering};

/// Closed interval a parameter is clamped into.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
}

impl ParamRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn clamp(&self, v: f32) -> f32 {
        clamp(v, self.min, self.max)
    }

    /// Linear map of a normalized `[0, 1]` control value into the range.
    #[inline]
    pub fn from_normalized(&self, v: f32) -> f32 {
        self.min + clamp(v, 0.0, 1.0) * (self.max - self.min)
    }
}

pub const DRY_WET: ParamRange = ParamRange::new(0.0, 1.0);
pub const PREDELAY_MS: ParamRange = ParamRange::new(0.0, 500.0);
pub const IR_LENGTH: ParamRange = ParamRange::new(0.0, 1.0);
pub const LOW_CUT_HZ: ParamRange = ParamRange::new(20.0, 2000.0);
pub const HIGH_CUT_HZ: ParamRange = ParamRange::new(1000.0, 20_000.0);
pub const STEREO_WIDTH: ParamRange = ParamRange::new(0.0, 2.0);
pub const OUTPUT_LEVEL: ParamRange = ParamRange::new(0.0, 1.0);

/// Lower end of the IR-length knob; a fully counter-clockwise knob still
/// keeps a tenth of the IR.
pub const IR_LENGTH_KNOB: ParamRange = ParamRange::new(0.1, 1.0);

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ReverbParameters {
    pub dry_wet: f32,
    pub predelay_ms: f32,
    pub ir_length_factor: f32,
    pub low_cut_hz: f32,
    pub high_cut_hz: f32,
    pub stereo_width: f32,
    pub output_level: f32,
    pub freeze: bool,
}

impl Default for ReverbParameters {
    fn default() -> Self {
        Self {
            dry_wet: 0.5,
            predelay_ms: 0.0,
            ir_length_factor: 1.0,
            low_cut_hz: 100.0,
            high_cut_hz: 10_000.0,
            stereo_width: 1.0,
            output_level: 1.0,
            freeze: false,
        }
    }
}

impl ReverbParameters {
    /// Copy with every field clamped into its documented range.
    pub fn clamped(self) -> Self {
        Self {
            dry_wet: DRY_WET.clamp(self.dry_wet),
            predelay_ms: PREDELAY_MS.clamp(self.predelay_ms),
            ir_length_factor: IR_LENGTH.clamp(self.ir_length_factor),
            low_cut_hz: LOW_CUT_HZ.clamp(self.low_cut_hz),
            high_cut_hz: HIGH_CUT_HZ.clamp(self.high_cut_hz),
            stereo_width: STEREO_WIDTH.clamp(self.stereo_width),
            output_level: OUTPUT_LEVEL.clamp(self.output_level),
            freeze: self.freeze,
        }
    }

    /// Map the six pedal knobs (normalized `[0, 1]`) to physical values:
    /// dry/wet, predelay, IR length, low cut, high cut, output level.
    /// Width and freeze are left at `base`.
    pub fn from_knobs(knobs: [f32; 6], base: ReverbParameters) -> Self {
        Self {
            dry_wet: DRY_WET.from_normalized(knobs[0]),
            predelay_ms: PREDELAY_MS.from_normalized(knobs[1]),
            ir_length_factor: IR_LENGTH_KNOB.from_normalized(knobs[2]),
            low_cut_hz: LOW_CUT_HZ.from_normalized(knobs[3]),
            high_cut_hz: HIGH_CUT_HZ.from_normalized(knobs[4]),
            output_level: OUTPUT_LEVEL.from_normalized(knobs[5]),
            ..base
        }
    }
}

// ----------------------------- Shared (lock-free) copy -----------------------------

/// Atomic mirror of [`ReverbParameters`] for cross-thread use.
#[derive(Debug)]
pub struct SharedParams {
    dry_wet: AtomicF32,
    predelay_ms: AtomicF32,
    ir_length_factor: AtomicF32,
    low_cut_hz: AtomicF32,
    high_cut_hz: AtomicF32,
    stereo_width: AtomicF32,
    output_level: AtomicF32,
    freeze: AtomicBool,
}

impl Default for SharedParams {
    fn default() -> Self {
        Self::new(ReverbParameters::default())
    }
}

impl SharedParams {
    pub fn new(p: ReverbParameters) -> Self {
        let p = p.clamped();
        Self {
            dry_wet: AtomicF32::new(p.dry_wet),
            predelay_ms: AtomicF32::new(p.predelay_ms),
            ir_length_factor: AtomicF32::new(p.ir_length_factor),
            low_cut_hz: AtomicF32::new(p.low_cut_hz),
            high_cut_hz: AtomicF32::new(p.high_cut_hz),
            stereo_width: AtomicF32::new(p.stereo_width),
            output_level: AtomicF32::new(p.output_level),
            freeze: AtomicBool::new(p.freeze),
        }
    }

    #[inline] pub fn set_dry_wet(&self, v: f32) { self.dry_wet.store(DRY_WET.clamp(v), Ordering::Relaxed); }
    #[inline] pub fn set_predelay_ms(&self, v: f32) { self.predelay_ms.store(PREDELAY_MS.clamp(v), Ordering::Relaxed); }
    #[inline] pub fn set_ir_length_factor(&self, v: f32) { self.ir_length_factor.store(IR_LENGTH.clamp(v), Ordering::Relaxed); }
    #[inline] pub fn set_low_cut_hz(&self, v: f32) { self.low_cut_hz.store(LOW_CUT_HZ.clamp(v), Ordering::Relaxed); }
    #[inline] pub fn set_high_cut_hz(&self, v: f32) { self.high_cut_hz.store(HIGH_CUT_HZ.clamp(v), Ordering::Relaxed); }
    #[inline] pub fn set_stereo_width(&self, v: f32) { self.stereo_width.store(STEREO_WIDTH.clamp(v), Ordering::Relaxed); }
    #[inline] pub fn set_output_level(&self, v: f32) { self.output_level.store(OUTPUT_LEVEL.clamp(v), Ordering::Relaxed); }
    #[inline] pub fn set_freeze(&self, on: bool) { self.freeze.store(on, Ordering::Relaxed); }

    #[inline] pub fn ir_length_factor(&self) -> f32 { self.ir_length_factor.load(Ordering::Relaxed) }
    #[inline] pub fn stereo_width(&self) -> f32 { self.stereo_width.load(Ordering::Relaxed) }
    #[inline] pub fn freeze(&self) -> bool { self.freeze.load(Ordering::Relaxed) }

    /// Store a whole snapshot (clamped).
    pub fn store(&self, p: &ReverbParameters) {
        self.set_dry_wet(p.dry_wet);
        self.set_predelay_ms(p.predelay_ms);
        self.set_ir_length_factor(p.ir_length_factor);
        self.set_low_cut_hz(p.low_cut_hz);
        self.set_high_cut_hz(p.high_cut_hz);
        self.set_stereo_width(p.stereo_width);
        self.set_output_level(p.output_level);
        self.set_freeze(p.freeze);
    }

    pub fn snapshot(&self) -> ReverbParameters {
        ReverbParameters {
            dry_wet: self.dry_wet.load(Ordering::Relaxed),
            predelay_ms: self.predelay_ms.load(Ordering::Relaxed),
            ir_length_factor: self.ir_length_factor.load(Ordering::Relaxed),
            low_cut_hz: self.low_cut_hz.load(Ordering::Relaxed),
            high_cut_hz: self.high_cut_hz.load(Ordering::Relaxed),
            stereo_width: self.stereo_width.load(Ordering::Relaxed),
            output_level: self.output_level.load(Ordering::Relaxed),
            freeze: self.freeze.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_match_documented_ranges() {
        let p = ReverbParameters {
            low_cut_hz: 5.0,
            stereo_width: 3.0,
            ir_length_factor: -0.2,
            high_cut_hz: 50_000.0,
            predelay_ms: 900.0,
            dry_wet: f32::NAN,
            output_level: f32::NEG_INFINITY,
            freeze: true,
        }
        .clamped();
        assert_eq!(p.low_cut_hz, 20.0);
        assert_eq!(p.stereo_width, 2.0);
        assert_eq!(p.ir_length_factor, 0.0);
        assert_eq!(p.high_cut_hz, 20_000.0);
        assert_eq!(p.predelay_ms, 500.0);
        assert_eq!(p.dry_wet, 0.0);
        assert_eq!(p.output_level, 0.0);
        assert!(p.freeze);
    }

    #[test]
    fn shared_setters_clamp_and_snapshot() {
        let s = SharedParams::default();
        s.set_low_cut_hz(5.0);
        s.set_stereo_width(3.0);
        s.set_ir_length_factor(-0.2);
        s.set_freeze(true);
        let p = s.snapshot();
        assert_eq!(p.low_cut_hz, 20.0);
        assert_eq!(p.stereo_width, 2.0);
        assert_eq!(p.ir_length_factor, 0.0);
        assert!(p.freeze);

        s.store(&ReverbParameters::default());
        assert_eq!(s.snapshot(), ReverbParameters::default());
    }

    #[test]
    fn knob_mapping_endpoints() {
        let lo = ReverbParameters::from_knobs([0.0; 6], ReverbParameters::default());
        assert_eq!(lo.ir_length_factor, 0.1);
        assert_eq!(lo.low_cut_hz, 20.0);
        assert_eq!(lo.high_cut_hz, 1000.0);

        let hi = ReverbParameters::from_knobs([1.0; 6], ReverbParameters::default());
        assert_eq!(hi.predelay_ms, 500.0);
        assert_eq!(hi.low_cut_hz, 2000.0);
        assert_eq!(hi.high_cut_hz, 20_000.0);
        assert_eq!(hi.stereo_width, 1.0);
    }
}
