//! IR storage and the frequency-domain spectra the convolver multiplies by.
//!
//! Contents
//! - [`ImpulseResponse`] : validated time-domain IR (mono stored on both channels)
//! - [`TierSpectrum`]    : left/right half-spectra of one tier's IR segment
//! - [`SpectrumSet`]     : everything the audio path needs for one IR (both tiers)
//! - [`SpectrumBuilder`] : slices, pads and transforms an IR into a `SpectrumSet`
//!
//! Building a set is O(B log B) per tier and belongs on the control path; the
//! audio path only ever swaps a finished set in.

use echoverb_core::fft::Fft;
use echoverb_core::spectral::{split_pair, HalfSpectrum};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{EngineConfig, PseudoStereo};
use crate::error::IrError;

fn validate(samples: &[f32], max: usize) -> Result<(), IrError> {
    if samples.is_empty() {
        return Err(IrError::Empty);
    }
    if samples.len() > max {
        return Err(IrError::TooLong { len: samples.len(), max });
    }
    if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
        return Err(IrError::NonFinite { index });
    }
    Ok(())
}

/// A validated impulse response, replaced wholesale on reload.
#[derive(Clone, Debug, PartialEq)]
pub struct ImpulseResponse {
    left: Vec<f32>,
    right: Vec<f32>,
    true_stereo: bool,
}

impl ImpulseResponse {
    /// Mono IR, stored as both channels.
    pub fn mono(samples: &[f32], max_len: usize) -> Result<Self, IrError> {
        validate(samples, max_len)?;
        Ok(Self { left: samples.to_vec(), right: samples.to_vec(), true_stereo: false })
    }

    pub fn stereo(left: &[f32], right: &[f32], max_len: usize) -> Result<Self, IrError> {
        if left.len() != right.len() {
            return Err(IrError::LengthMismatch { left: left.len(), right: right.len() });
        }
        validate(left, max_len)?;
        validate(right, max_len)?;
        Ok(Self { left: left.to_vec(), right: right.to_vec(), true_stereo: true })
    }

    #[inline] pub fn len(&self) -> usize { self.left.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.left.is_empty() }
    #[inline] pub fn is_true_stereo(&self) -> bool { self.true_stereo }
    #[inline] pub fn left(&self) -> &[f32] { &self.left }
    #[inline] pub fn right(&self) -> &[f32] { &self.right }

    /// `floor(len · factor)`, clamped to `[0, len]`.
    pub fn effective_len(&self, factor: f32) -> usize {
        let f = echoverb_core::dsp::clamp(factor, 0.0, 1.0);
        ((self.len() as f32 * f).floor() as usize).min(self.len())
    }
}

/// Derive a right-channel IR from a mono one: a width-dependent index skew
/// plus a small seeded gain jitter per sample. Width 1 copies the input.
pub fn decorrelate(mono: &[f32], width: f32, seed: u64, out: &mut Vec<f32>) {
    out.clear();
    let n = mono.len();
    if n == 0 {
        return;
    }
    let spread = width - 1.0;
    if spread == 0.0 {
        out.extend_from_slice(mono);
        return;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    out.extend((0..n).map(|i| {
        let offset = (i as f32 * 0.01 * spread) as isize;
        let idx = (i as isize + offset).rem_euclid(n as isize) as usize;
        let factor = 1.0 + 0.2 * spread * (rng.gen::<f32>() - 0.5);
        mono[idx] * factor
    }));
}

/// Left/right half-spectra of one tier's IR segment, `2B`-point transforms.
#[derive(Clone, Debug, PartialEq)]
pub struct TierSpectrum {
    pub left: HalfSpectrum,
    pub right: HalfSpectrum,
}

impl TierSpectrum {
    pub fn new(block: usize) -> Self {
        Self { left: HalfSpectrum::new(2 * block), right: HalfSpectrum::new(2 * block) }
    }

    pub fn clear(&mut self) {
        self.left.clear();
        self.right.clear();
    }
}

/// Spectra for both tiers plus the flags the audio path needs.
#[derive(Clone, Debug, PartialEq)]
pub struct SpectrumSet {
    pub early: TierSpectrum,
    pub late: TierSpectrum,
    /// An IR has been loaded; otherwise the engine passes input through.
    pub loaded: bool,
    /// Apply the width knob to the convolver input (mono IR, `InputWidth`).
    pub input_width: bool,
    /// IR samples actually covered after length factor and tier capacity.
    pub active_len: usize,
}

impl SpectrumSet {
    /// Silent, "no IR loaded" set sized for `cfg`.
    pub fn empty(cfg: &EngineConfig) -> Self {
        Self {
            early: TierSpectrum::new(cfg.early_block),
            late: TierSpectrum::new(cfg.late_block),
            loaded: false,
            input_width: false,
            active_len: 0,
        }
    }
}

/// Turns an [`ImpulseResponse`] into a [`SpectrumSet`]. Owns its own
/// transforms and scratch, so it can live on any non-audio thread.
pub struct SpectrumBuilder {
    early_block: usize,
    late_block: usize,
    pseudo: PseudoStereo,
    fft_early: Fft,
    fft_late: Fft,
    re: Vec<f32>,
    im: Vec<f32>,
    synth_right: Vec<f32>,
}

impl SpectrumBuilder {
    pub fn new(cfg: &EngineConfig) -> Self {
        let late_fft = 2 * cfg.late_block;
        Self {
            early_block: cfg.early_block,
            late_block: cfg.late_block,
            pseudo: cfg.pseudo_stereo,
            fft_early: Fft::new(2 * cfg.early_block),
            fft_late: Fft::new(late_fft),
            re: vec![0.0; late_fft],
            im: vec![0.0; late_fft],
            synth_right: Vec::with_capacity(cfg.max_ir_len),
        }
    }

    #[inline] pub fn pseudo_stereo(&self) -> PseudoStereo { self.pseudo }

    /// True when a width change alters the spectra of a mono IR.
    #[inline]
    pub fn width_rebuilds(&self) -> bool {
        matches!(self.pseudo, PseudoStereo::DecorrelatedIr { .. })
    }

    /// Slice `ir` (after the length factor) into the early `[0, E)` and late
    /// `[E, E + L)` segments, zero-pad each to `2·B`, transform, and write the
    /// half-spectra into `out`.
    pub fn build(&mut self, ir: &ImpulseResponse, length_factor: f32, width: f32, out: &mut SpectrumSet) {
        let eff = ir.effective_len(length_factor);
        let left = &ir.left()[..eff];

        let right: &[f32] = if ir.is_true_stereo() {
            &ir.right()[..eff]
        } else if let PseudoStereo::DecorrelatedIr { seed } = self.pseudo {
            decorrelate(left, width, seed, &mut self.synth_right);
            &self.synth_right
        } else {
            left
        };

        let (e, l) = (self.early_block, self.late_block);
        let early_end = eff.min(e);
        let late_end = eff.min(e + l);

        let (re, im) = (&mut self.re[..2 * e], &mut self.im[..2 * e]);
        self.fft_early.forward_real_pair(&left[..early_end], &right[..early_end], re, im);
        split_pair(re, im, &mut out.early.left, &mut out.early.right);

        let late_l = if late_end > e { &left[e..late_end] } else { &[][..] };
        let late_r = if late_end > e { &right[e..late_end] } else { &[][..] };
        self.fft_late.forward_real_pair(late_l, late_r, &mut self.re, &mut self.im);
        split_pair(&self.re, &self.im, &mut out.late.left, &mut out.late.right);

        out.loaded = true;
        out.input_width = !ir.is_true_stereo() && self.pseudo == PseudoStereo::InputWidth;
        out.active_len = late_end;

        if eff > late_end {
            debug!("IR truncated to tier capacity: {eff} -> {late_end} samples");
        }
        debug!(
            "spectra rebuilt: {} IR, {} of {} samples active (factor {:.2})",
            if ir.is_true_stereo() { "stereo" } else { "mono" },
            late_end,
            ir.len(),
            length_factor
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_cfg() -> EngineConfig {
        EngineConfig::default().with_blocks(4, 8).with_max_ir_len(64)
    }

    #[test]
    fn validation_errors() {
        assert_eq!(ImpulseResponse::mono(&[], 8), Err(IrError::Empty));
        assert_eq!(ImpulseResponse::mono(&[0.0; 9], 8), Err(IrError::TooLong { len: 9, max: 8 }));
        assert_eq!(
            ImpulseResponse::mono(&[0.0, f32::NAN], 8),
            Err(IrError::NonFinite { index: 1 })
        );
        assert_eq!(
            ImpulseResponse::stereo(&[0.0; 3], &[0.0; 2], 8),
            Err(IrError::LengthMismatch { left: 3, right: 2 })
        );
    }

    #[test]
    fn effective_len_floors_and_clamps() {
        let ir = ImpulseResponse::mono(&[1.0; 10], 16).unwrap();
        assert_eq!(ir.effective_len(0.55), 5);
        assert_eq!(ir.effective_len(1.5), 10);
        assert_eq!(ir.effective_len(-1.0), 0);
        assert_eq!(ir.right(), ir.left());
    }

    #[test]
    fn early_segment_spectrum_of_impulse_is_flat() {
        let cfg = small_cfg();
        let mut b = SpectrumBuilder::new(&cfg);
        let mut set = SpectrumSet::empty(&cfg);
        let ir = ImpulseResponse::mono(&[1.0], 64).unwrap();
        b.build(&ir, 1.0, 1.0, &mut set);

        assert!(set.loaded && set.input_width);
        for k in 0..set.early.left.bins() {
            assert!((set.early.left.re()[k] - 1.0).abs() < 1e-6);
            assert!(set.early.left.im()[k].abs() < 1e-6);
        }
        assert!(set.late.left.is_silent() || set.late.left.re().iter().all(|v| v.abs() < 1e-7));
    }

    #[test]
    fn late_segment_starts_at_early_block() {
        let cfg = small_cfg();
        let mut b = SpectrumBuilder::new(&cfg);
        let mut set = SpectrumSet::empty(&cfg);
        // sample 4 is the first late sample; as a late-segment impulse at 0
        // its spectrum is flat
        let mut ir = vec![0.0; 20];
        ir[4] = 0.5;
        let ir = ImpulseResponse::stereo(&ir, &ir, 64).unwrap();
        b.build(&ir, 1.0, 1.0, &mut set);

        assert!(!set.input_width);
        assert_eq!(set.active_len, 12);
        assert!(set.early.right.re().iter().all(|v| v.abs() < 1e-7));
        for k in 0..set.late.right.bins() {
            assert!((set.late.right.re()[k] - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn decorrelate_is_identity_at_unity_and_seeded_otherwise() {
        let mono: Vec<f32> = (0..200).map(|i| (i as f32 * 0.1).sin()).collect();
        let mut a = Vec::new();
        decorrelate(&mono, 1.0, 9, &mut a);
        assert_eq!(a, mono);

        let mut b = Vec::new();
        let mut c = Vec::new();
        decorrelate(&mono, 1.8, 9, &mut b);
        decorrelate(&mono, 1.8, 9, &mut c);
        assert_eq!(b, c);
        assert_ne!(b, mono);

        // narrowing skews the other way without leaving the buffer
        decorrelate(&mono, 0.0, 9, &mut c);
        assert_eq!(c.len(), mono.len());
    }
}
