//! Convolution reverb: the per-sample signal chain and the single-owner engine.
//!
//! Design
//! - [`ReverbCore`] is the audio-side state (predelay, convolver, post filter)
//!   and the per-tick chain; it never allocates and never logs
//! - [`ConvolutionReverb`] owns a core plus the IR, the spectrum builder and
//!   the current spectra; suitable when one thread does everything (tests,
//!   offline rendering, the C ABI). Split use goes through [`crate::control`]
//!
//! Per tick: predelay → (input width for mono IRs) → both tiers → low/high
//! cut → output width → dry/wet mix → output level.

use echoverb_core::dsp::mix_dry_wet;
use log::{info, warn};

use crate::config::EngineConfig;
use crate::error::{ConfigError, IrError};
use crate::graph::StereoProcessor;
use crate::params::{
    ReverbParameters, DRY_WET, HIGH_CUT_HZ, IR_LENGTH, LOW_CUT_HZ, OUTPUT_LEVEL, PREDELAY_MS,
    STEREO_WIDTH,
};
use crate::partition::PartitionedConvolver;
use crate::post::PostFilter;
use crate::predelay::PredelayBuffer;
use crate::spectrum::{ImpulseResponse, SpectrumBuilder, SpectrumSet};
use crate::stereo::apply_width;

/// Audio-side DSP state shared by [`ConvolutionReverb`] and
/// [`crate::control::ReverbProcessor`].
pub struct ReverbCore {
    predelay: PredelayBuffer,
    conv: PartitionedConvolver,
    post: PostFilter,
}

impl ReverbCore {
    /// `cfg` must already be validated.
    pub fn new(cfg: &EngineConfig, params: &ReverbParameters) -> Self {
        let mut core = Self {
            predelay: PredelayBuffer::new(cfg.predelay_capacity(), cfg.sample_rate),
            conv: PartitionedConvolver::new(cfg),
            post: PostFilter::new(params.low_cut_hz, params.high_cut_hz, cfg.sample_rate),
        };
        core.predelay.set_delay_ms(params.predelay_ms);
        core
    }

    /// Pull the control-rate parameters into the DSP blocks. Cheap when
    /// nothing changed; call once per audio block.
    #[inline]
    pub fn prepare(&mut self, p: &ReverbParameters) {
        self.predelay.set_delay_ms(p.predelay_ms);
        self.post.set_low_cut(p.low_cut_hz);
        self.post.set_high_cut(p.high_cut_hz);
    }

    #[inline] pub fn latency(&self) -> usize { self.conv.latency() }
    #[inline] pub fn predelay_samples(&self) -> usize { self.predelay.delay_samples() }

    /// One stereo tick. Without a loaded IR the input passes through, scaled
    /// only by the output level.
    #[inline]
    pub fn tick(&mut self, l: f32, r: f32, p: &ReverbParameters, set: &SpectrumSet) -> (f32, f32) {
        if !set.loaded {
            return (l * p.output_level, r * p.output_level);
        }
        let (dl, dr) = self.predelay.process(l, r);
        let (cl, cr) = if set.input_width { apply_width(dl, dr, p.stereo_width) } else { (dl, dr) };
        let (wl, wr) = self.conv.process(cl, cr, set, p.freeze);
        let (fl, fr) = self.post.process(wl, wr);
        let (xl, xr) = apply_width(fl, fr, p.stereo_width);
        (
            mix_dry_wet(l, xl, p.dry_wet) * p.output_level,
            mix_dry_wet(r, xr, p.dry_wet) * p.output_level,
        )
    }

    /// Process a block (planar). `out_*` may be longer than the inputs; only
    /// the common prefix is written.
    pub fn run_block(
        &mut self,
        in_l: &[f32],
        in_r: &[f32],
        out_l: &mut [f32],
        out_r: &mut [f32],
        p: &ReverbParameters,
        set: &SpectrumSet,
    ) {
        self.prepare(p);
        let frames = in_l.iter().zip(in_r).zip(out_l.iter_mut().zip(out_r.iter_mut()));
        for ((&l, &r), (ol, or)) in frames {
            (*ol, *or) = self.tick(l, r, p, set);
        }
    }

    /// Clear predelay, accumulators, alignment delay and filter state.
    pub fn reset(&mut self) {
        self.predelay.clear();
        self.conv.reset();
        self.post.reset();
    }
}

// ------------------------------ Single-owner engine ------------------------------

/// The whole reverb in one object, driven from a single thread.
///
/// IR loads and the IR-length setter rebuild spectra synchronously; every
/// other setter is O(1). All setters clamp.
pub struct ConvolutionReverb {
    cfg: EngineConfig,
    params: ReverbParameters,
    core: ReverbCore,
    ir: Option<ImpulseResponse>,
    builder: SpectrumBuilder,
    spectra: SpectrumSet,
}

impl ConvolutionReverb {
    pub fn try_new(cfg: EngineConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let params = ReverbParameters::default();
        Ok(Self {
            core: ReverbCore::new(&cfg, &params),
            builder: SpectrumBuilder::new(&cfg),
            spectra: SpectrumSet::empty(&cfg),
            ir: None,
            params,
            cfg,
        })
    }

    /// # Panics
    /// On an invalid configuration (see [`EngineConfig::validate`]).
    pub fn new(cfg: EngineConfig) -> Self {
        match Self::try_new(cfg) {
            Ok(engine) => engine,
            Err(e) => panic!("invalid engine configuration: {e}"),
        }
    }

    #[inline] pub fn config(&self) -> &EngineConfig { &self.cfg }
    #[inline] pub fn parameters(&self) -> ReverbParameters { self.params }
    #[inline] pub fn is_ir_loaded(&self) -> bool { self.spectra.loaded }
    #[inline] pub fn is_true_stereo(&self) -> bool { self.ir.as_ref().is_some_and(ImpulseResponse::is_true_stereo) }
    #[inline] pub fn ir(&self) -> Option<&ImpulseResponse> { self.ir.as_ref() }
    #[inline] pub fn spectra(&self) -> &SpectrumSet { &self.spectra }

    /// Wet-path latency in samples (predelay excluded).
    #[inline] pub fn latency(&self) -> usize { self.core.latency() }

    // ----- IR loading -----

    pub fn try_load_ir(&mut self, mono: &[f32]) -> Result<(), IrError> {
        let ir = ImpulseResponse::mono(mono, self.cfg.max_ir_len).inspect_err(|e| warn!("mono IR rejected: {e}"))?;
        info!("loaded mono IR, {} samples", ir.len());
        self.install(ir);
        Ok(())
    }

    pub fn try_load_stereo_ir(&mut self, left: &[f32], right: &[f32]) -> Result<(), IrError> {
        let ir = ImpulseResponse::stereo(left, right, self.cfg.max_ir_len)
            .inspect_err(|e| warn!("stereo IR rejected: {e}"))?;
        info!("loaded stereo IR, {} samples", ir.len());
        self.install(ir);
        Ok(())
    }

    /// Boolean form for the IR source collaborator; `false` leaves the
    /// previous IR in place.
    pub fn load_ir(&mut self, mono: &[f32]) -> bool {
        self.try_load_ir(mono).is_ok()
    }

    pub fn load_stereo_ir(&mut self, left: &[f32], right: &[f32]) -> bool {
        self.try_load_stereo_ir(left, right).is_ok()
    }

    fn install(&mut self, ir: ImpulseResponse) {
        self.ir = Some(ir);
        self.update_ir_frequency_domain();
    }

    /// Recompute both tiers' spectra from the stored IR and current IR-length
    /// factor. Not for the audio thread.
    pub fn update_ir_frequency_domain(&mut self) {
        if let Some(ir) = &self.ir {
            self.builder.build(ir, self.params.ir_length_factor, self.params.stereo_width, &mut self.spectra);
        }
    }

    // ----- Parameters -----

    #[inline] pub fn set_dry_wet(&mut self, v: f32) { self.params.dry_wet = DRY_WET.clamp(v); }
    #[inline] pub fn set_freeze(&mut self, on: bool) { self.params.freeze = on; }
    #[inline] pub fn set_output_level(&mut self, v: f32) { self.params.output_level = OUTPUT_LEVEL.clamp(v); }

    pub fn set_predelay_ms(&mut self, ms: f32) {
        self.params.predelay_ms = PREDELAY_MS.clamp(ms);
        self.core.predelay.set_delay_ms(self.params.predelay_ms);
    }

    pub fn set_low_cut(&mut self, hz: f32) {
        self.params.low_cut_hz = LOW_CUT_HZ.clamp(hz);
        self.core.post.set_low_cut(self.params.low_cut_hz);
    }

    pub fn set_high_cut(&mut self, hz: f32) {
        self.params.high_cut_hz = HIGH_CUT_HZ.clamp(hz);
        self.core.post.set_high_cut(self.params.high_cut_hz);
    }

    /// Changing the factor rebuilds the spectra.
    pub fn set_ir_length(&mut self, factor: f32) {
        let factor = IR_LENGTH.clamp(factor);
        if factor != self.params.ir_length_factor {
            self.params.ir_length_factor = factor;
            self.update_ir_frequency_domain();
        }
    }

    /// With a decorrelated mono IR a width change rebuilds the spectra.
    pub fn set_stereo_width(&mut self, width: f32) {
        let width = STEREO_WIDTH.clamp(width);
        if width != self.params.stereo_width {
            self.params.stereo_width = width;
            if self.builder.width_rebuilds() && !self.is_true_stereo() {
                self.update_ir_frequency_domain();
            }
        }
    }

    /// Apply a whole snapshot through the individual setters.
    pub fn apply_parameters(&mut self, p: &ReverbParameters) {
        self.set_dry_wet(p.dry_wet);
        self.set_predelay_ms(p.predelay_ms);
        self.set_low_cut(p.low_cut_hz);
        self.set_high_cut(p.high_cut_hz);
        self.set_output_level(p.output_level);
        self.set_freeze(p.freeze);
        // both may rebuild; do it once
        let (factor, width) = (IR_LENGTH.clamp(p.ir_length_factor), STEREO_WIDTH.clamp(p.stereo_width));
        let rebuild = factor != self.params.ir_length_factor
            || (width != self.params.stereo_width && self.builder.width_rebuilds() && !self.is_true_stereo());
        self.params.ir_length_factor = factor;
        self.params.stereo_width = width;
        if rebuild {
            self.update_ir_frequency_domain();
        }
    }

    pub fn reset_parameters(&mut self) {
        info!("parameters reset to defaults");
        self.apply_parameters(&ReverbParameters::default());
    }

    // ----- Audio -----

    #[inline]
    pub fn process(&mut self, l: f32, r: f32) -> (f32, f32) {
        self.core.tick(l, r, &self.params, &self.spectra)
    }

    pub fn process_block(&mut self, in_l: &[f32], in_r: &[f32], out_l: &mut [f32], out_r: &mut [f32]) {
        self.core.run_block(in_l, in_r, out_l, out_r, &self.params, &self.spectra);
    }

    /// Clear all signal state; IR and parameters are kept.
    pub fn reset(&mut self) {
        self.core.reset();
    }
}

impl StereoProcessor for ConvolutionReverb {
    fn process_block(&mut self, in_l: &[f32], in_r: &[f32], out_l: &mut [f32], out_r: &mut [f32]) {
        ConvolutionReverb::process_block(self, in_l, in_r, out_l, out_r);
    }

    fn reset(&mut self) {
        ConvolutionReverb::reset(self);
    }

    fn is_ir_loaded(&self) -> bool {
        self.spectra.loaded
    }

    fn is_frozen(&self) -> bool {
        self.params.freeze
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::{generate, IrMode};
    use crate::config::PseudoStereo;
    use crate::control::IrSource;
    use echoverb_core::spectral::HalfSpectrum;

    fn small() -> ConvolutionReverb {
        ConvolutionReverb::new(EngineConfig::default().with_blocks(8, 32).with_max_ir_len(256))
    }

    #[test]
    fn passes_through_without_ir() {
        let mut rv = small();
        rv.set_dry_wet(1.0);
        assert!(!rv.is_ir_loaded());
        for i in 0..100 {
            let x = (i as f32 * 0.37).sin();
            assert_eq!(rv.process(x, -x), (x, -x));
        }
    }

    #[test]
    fn rejected_load_keeps_previous_ir() {
        let mut rv = small();
        assert!(rv.load_ir(&[1.0, 0.5]));
        let before = rv.spectra().clone();
        assert!(!rv.load_ir(&[]));
        assert!(!rv.load_ir(&vec![0.1; 257]));
        assert!(!rv.load_stereo_ir(&[1.0], &[1.0, 2.0]));
        assert!(!rv.load_ir(&[0.0, f32::INFINITY]));
        assert_eq!(rv.spectra(), &before);
        assert!(!rv.is_true_stereo());
        assert_eq!(
            rv.try_load_ir(&vec![0.0; 300]),
            Err(IrError::TooLong { len: 300, max: 256 })
        );
    }

    #[test]
    fn setters_clamp_to_ranges() {
        let mut rv = small();
        rv.set_low_cut(5.0);
        rv.set_stereo_width(3.0);
        rv.set_ir_length(-0.2);
        rv.set_high_cut(0.0);
        rv.set_predelay_ms(f32::NAN);
        let p = rv.parameters();
        assert_eq!(p.low_cut_hz, 20.0);
        assert_eq!(p.stereo_width, 2.0);
        assert_eq!(p.ir_length_factor, 0.0);
        assert_eq!(p.high_cut_hz, 1000.0);
        assert_eq!(p.predelay_ms, 0.0);
    }

    #[test]
    fn zero_length_factor_silences_wet() {
        let mut rv = small();
        rv.load_ir(&[1.0; 40]);
        rv.set_dry_wet(1.0);
        rv.set_ir_length(0.0);
        for _ in 0..200 {
            let (l, r) = rv.process(1.0, 1.0);
            assert_eq!((l, r), (0.0, 0.0));
        }
    }

    #[test]
    fn ir_length_knob_shortens_bank_ir() {
        let cfg = EngineConfig::default();
        let mut rv = ConvolutionReverb::new(cfg);
        let IrSource::Stereo { left, right } = generate(IrMode::LongDecay, cfg.bank_ir_len()) else {
            panic!("generated IRs are stereo");
        };
        assert!(rv.load_stereo_ir(&left, &right));
        let full = rv.spectra().clone();
        assert_eq!(full.active_len, cfg.tier_coverage());

        rv.set_ir_length(0.3);
        assert_eq!(rv.spectra().active_len, 326);
        assert_ne!(rv.spectra(), &full);

        rv.set_ir_length(0.6);
        assert_eq!(rv.spectra().active_len, 652);
    }

    #[test]
    fn reset_parameters_restores_defaults() {
        let mut rv = small();
        rv.set_dry_wet(0.9);
        rv.set_freeze(true);
        rv.set_output_level(0.1);
        rv.reset_parameters();
        assert_eq!(rv.parameters(), ReverbParameters::default());
    }

    #[test]
    fn decorrelated_width_changes_right_spectrum() {
        let cfg = EngineConfig::default()
            .with_blocks(8, 32)
            .with_max_ir_len(256)
            .with_pseudo_stereo(PseudoStereo::DecorrelatedIr { seed: 3 });
        let mut rv = ConvolutionReverb::new(cfg);
        let ir: Vec<f32> = (0..40).map(|i| (-(i as f32) / 10.0).exp()).collect();
        rv.load_ir(&ir);
        assert!(!rv.spectra().input_width);
        let close = |a: &HalfSpectrum, b: &HalfSpectrum| {
            a.re().iter().zip(b.re()).chain(a.im().iter().zip(b.im())).all(|(x, y)| (x - y).abs() < 1e-5)
        };
        let unity = rv.spectra().late.left.clone();
        assert!(close(&rv.spectra().late.right, &unity));

        rv.set_stereo_width(1.8);
        assert!(!close(&rv.spectra().late.right, &unity));
        assert!(close(&rv.spectra().late.left, &unity));
    }
}
