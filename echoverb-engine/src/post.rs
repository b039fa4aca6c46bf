//! Wet-path tone stage: low-cut (HP) into high-cut (LP) per channel.

use echoverb_core::filters::SvfTpt;

use crate::params::{HIGH_CUT_HZ, LOW_CUT_HZ};

/// Fixed resonance of both stages.
pub const POST_Q: f32 = 0.707;

#[derive(Copy, Clone, Debug)]
pub struct PostFilter {
    low_cut: [SvfTpt; 2],
    high_cut: [SvfTpt; 2],
}

impl PostFilter {
    pub fn new(low_cut_hz: f32, high_cut_hz: f32, sr: f32) -> Self {
        let lc = SvfTpt::new(LOW_CUT_HZ.clamp(low_cut_hz), POST_Q, sr);
        let hc = SvfTpt::new(HIGH_CUT_HZ.clamp(high_cut_hz), POST_Q, sr);
        Self { low_cut: [lc; 2], high_cut: [hc; 2] }
    }

    #[inline] pub fn low_cut_hz(&self) -> f32 { self.low_cut[0].cutoff_hz() }
    #[inline] pub fn high_cut_hz(&self) -> f32 { self.high_cut[0].cutoff_hz() }

    /// Clamped to `[20, 2000]` Hz; both channels follow.
    #[inline]
    pub fn set_low_cut(&mut self, hz: f32) {
        let hz = LOW_CUT_HZ.clamp(hz);
        for f in &mut self.low_cut {
            f.set_cutoff_hz(hz);
        }
    }

    /// Clamped to `[1000, 20000]` Hz; both channels follow.
    #[inline]
    pub fn set_high_cut(&mut self, hz: f32) {
        let hz = HIGH_CUT_HZ.clamp(hz);
        for f in &mut self.high_cut {
            f.set_cutoff_hz(hz);
        }
    }

    #[inline]
    pub fn process(&mut self, l: f32, r: f32) -> (f32, f32) {
        let l = self.high_cut[0].process_lp(self.low_cut[0].process_hp(l));
        let r = self.high_cut[1].process_lp(self.low_cut[1].process_hp(r));
        (l, r)
    }

    pub fn reset(&mut self) {
        for f in self.low_cut.iter_mut().chain(self.high_cut.iter_mut()) {
            f.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_clamp() {
        let mut pf = PostFilter::new(100.0, 10_000.0, 48_000.0);
        pf.set_low_cut(5.0);
        pf.set_high_cut(90_000.0);
        assert_eq!(pf.low_cut_hz(), 20.0);
        assert_eq!(pf.high_cut_hz(), 20_000.0);
    }

    #[test]
    fn removes_dc_and_keeps_midrange() {
        let sr = 48_000.0;
        let mut pf = PostFilter::new(100.0, 10_000.0, sr);
        let mut last = (1.0, 1.0);
        for _ in 0..48_000 {
            last = pf.process(1.0, 1.0);
        }
        assert!(last.0.abs() < 1e-3 && last.1.abs() < 1e-3);

        pf.reset();
        let mut peak = 0.0_f32;
        for i in 0..24_000 {
            let x = (echoverb_core::dsp::TAU * 1000.0 * i as f32 / sr).sin();
            let (l, _) = pf.process(x, x);
            if i > 12_000 {
                peak = peak.max(l.abs());
            }
        }
        assert!(peak > 0.9 && peak < 1.1, "peak={peak}");
    }
}
