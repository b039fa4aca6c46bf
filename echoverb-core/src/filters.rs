//! Filters: a TPT (state-variable) filter for the wet-path tone stage.
//!
//! Goals
//! - `no_std`-friendly, allocation free
//! - Stable under per-block cutoff changes (knob sweeps while playing)
//! - Clear APIs and predictable parameterization
//!
//! Contents
//! - `SvfMode` : LP/HP output tap selection
//! - `SvfTpt`  : State-Variable Filter via Topology Preserving Transform
//!
//! Notes
//! - `SvfTpt` uses the "g = tan(π fc / sr)" formulation with `k = 1/Q`,
//!   solved without the unit delay in the feedback path (trapezoidal
//!   integrators), so it stays stable up to the `tpt_g` cutoff limit.

use crate::dsp::{kill_denormals, tpt_g};

/// SVF output tap selection.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SvfMode {
    Lowpass,
    Highpass,
}

/// Topology-Preserving Transform SVF (State-Variable Filter).
///
/// Parameters:
/// - `cut_hz`  : cutoff frequency in Hz (limited below Nyquist by `tpt_g`)
/// - `q`       : quality factor; 0.707 gives a Butterworth response
///
/// Internals:
/// - `g = tan(π fc / sr)`
/// - `k = 1 / Q`
#[derive(Copy, Clone, Debug)]
pub struct SvfTpt {
    sr: f32,
    cut: f32,
    q: f32,
    // derived
    k: f32,
    a1: f32,
    a2: f32,
    a3: f32,
    // states
    ic1eq: f32,
    ic2eq: f32,
}

impl SvfTpt {
    #[inline]
    pub fn new(cut_hz: f32, q: f32, sr: f32) -> Self {
        let mut s = Self {
            sr: sr.max(1.0),
            cut: cut_hz.max(0.0),
            q: q.max(1e-4),
            k: 0.0,
            a1: 0.0,
            a2: 0.0,
            a3: 0.0,
            ic1eq: 0.0,
            ic2eq: 0.0,
        };
        s.recalc();
        s
    }

    #[inline] pub fn set_sample_rate(&mut self, sr: f32) { self.sr = sr.max(1.0); self.recalc(); }
    #[inline] pub fn set_q(&mut self, q: f32) { self.q = q.max(1e-4); self.recalc(); }
    #[inline] pub fn cutoff_hz(&self) -> f32 { self.cut }

    /// Change the cutoff. A no-op when the value is unchanged, so callers
    /// may forward the knob value every block without paying for `tan`.
    #[inline]
    pub fn set_cutoff_hz(&mut self, cut_hz: f32) {
        let cut = cut_hz.max(0.0);
        if cut != self.cut {
            self.cut = cut;
            self.recalc();
        }
    }

    /// Clear the integrator states; coefficients are kept.
    #[inline]
    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }

    #[inline]
    fn recalc(&mut self) {
        let g = tpt_g(self.cut, self.sr);
        self.k = 1.0 / self.q;
        self.a1 = 1.0 / (1.0 + g * (g + self.k));
        self.a2 = g * self.a1;
        self.a3 = g * self.a2;
    }

    /// Process one sample, returning the `(lp, hp)` taps.
    #[inline]
    pub fn process_both(&mut self, x: f32) -> (f32, f32) {
        let v3 = x - self.ic2eq;
        let v1 = self.a1 * self.ic1eq + self.a2 * v3;
        let v2 = self.ic2eq + self.a2 * self.ic1eq + self.a3 * v3;

        self.ic1eq = kill_denormals(2.0 * v1 - self.ic1eq);
        self.ic2eq = kill_denormals(2.0 * v2 - self.ic2eq);

        let lp = v2;
        let hp = x - self.k * v1 - v2;
        (lp, hp)
    }

    /// Process one sample, returning only the mode requested.
    #[inline]
    pub fn process(&mut self, x: f32, mode: SvfMode) -> f32 {
        let (lp, hp) = self.process_both(x);
        match mode {
            SvfMode::Lowpass => lp,
            SvfMode::Highpass => hp,
        }
    }

    #[inline] pub fn process_lp(&mut self, x: f32) -> f32 { self.process(x, SvfMode::Lowpass) }
    #[inline] pub fn process_hp(&mut self, x: f32) -> f32 { self.process(x, SvfMode::Highpass) }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{sin, TAU};
    #[cfg(not(feature = "std"))]
    use num_traits::float::FloatCore;

    fn sine_peak(svf: &mut SvfTpt, mode: SvfMode, hz: f32, sr: f32) -> f32 {
        let mut peak = 0.0_f32;
        let n = sr as usize / 4;
        for i in 0..n {
            let x = sin(TAU * hz * i as f32 / sr);
            let y = svf.process(x, mode);
            // skip the transient
            if i > n / 2 {
                peak = peak.max(y.abs());
            }
        }
        peak
    }

    #[test]
    fn svf_lp_settles_to_unity_dc() {
        let sr = 48000.0;
        let mut svf = SvfTpt::new(1000.0, 0.707, sr);
        let mut acc = 0.0;
        for _ in 0..(sr as usize) {
            acc = svf.process_lp(1.0);
        }
        assert!((acc - 1.0).abs() < 1e-3, "lp dc={acc}");
    }

    #[test]
    fn svf_hp_blocks_dc() {
        let sr = 48000.0;
        let mut svf = SvfTpt::new(100.0, 0.707, sr);
        let mut y = 1.0;
        for _ in 0..(sr as usize) {
            y = svf.process_hp(1.0);
        }
        assert!(y.abs() < 1e-3, "hp dc={y}");
    }

    #[test]
    fn svf_lp_attenuates_above_cutoff() {
        let sr = 48000.0;
        let mut pass = SvfTpt::new(10_000.0, 0.707, sr);
        let mut stop = SvfTpt::new(500.0, 0.707, sr);
        let p = sine_peak(&mut pass, SvfMode::Lowpass, 200.0, sr);
        let s = sine_peak(&mut stop, SvfMode::Lowpass, 8_000.0, sr);
        assert!(p > 0.95, "passband peak {p}");
        assert!(s < 0.02, "stopband peak {s}");
    }

    #[test]
    fn reset_clears_state() {
        let mut svf = SvfTpt::new(1000.0, 0.707, 48000.0);
        for _ in 0..64 {
            svf.process_lp(1.0);
        }
        svf.reset();
        assert_eq!(svf.process_lp(0.0), 0.0);
    }

    #[test]
    fn stable_at_cutoff_limit() {
        let sr = 32000.0;
        let mut svf = SvfTpt::new(20_000.0, 0.707, sr);
        let mut y = 0.0;
        for i in 0..10_000 {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            y = svf.process_lp(x);
        }
        assert!(y.is_finite() && y.abs() < 4.0, "y={y}");
    }
}
