//! Dual-tier partitioned block convolver.
//!
//! Each [`Partition`] runs uniform block convolution at its own block size
//! `B`: inputs collect in a `B`-sample accumulator, every full block is
//! zero-padded to `2B`, transformed (left and right packed into one complex
//! FFT), multiplied by the stored IR half-spectra, transformed back and
//! overlap-added into a `2B` output accumulator. A tier's output trails its
//! input by `B − 1` samples.
//!
//! [`PartitionedConvolver`] runs two tiers: the early tier convolves IR
//! samples `[0, E)`, the late tier `[E, E + L)`. The early output goes
//! through an `L − 2E` alignment delay so both segments meet, for a total
//! latency of `L − E − 1`.
//!
//! Nothing here allocates after construction.

use echoverb_core::fft::Fft;
use echoverb_core::spectral::{merge_pair, mul_in_place, split_pair, HalfSpectrum};

use crate::config::EngineConfig;
use crate::predelay::DelayLine;
use crate::spectrum::{SpectrumSet, TierSpectrum};

/// One tier: input accumulator, overlap-add output accumulator and the
/// transform scratch for its block size.
pub struct Partition {
    block: usize,
    in_l: Box<[f32]>,
    in_r: Box<[f32]>,
    write: usize,
    out_l: Box<[f32]>,
    out_r: Box<[f32]>,
    read: usize,
    fft: Fft,
    re: Box<[f32]>,
    im: Box<[f32]>,
    xl: HalfSpectrum,
    xr: HalfSpectrum,
}

impl Partition {
    /// # Panics
    /// If `block` is not a power of two.
    pub fn new(block: usize) -> Self {
        let n = 2 * block;
        let zeros = |len: usize| vec![0.0_f32; len].into_boxed_slice();
        Self {
            block,
            in_l: zeros(block),
            in_r: zeros(block),
            write: 0,
            out_l: zeros(n),
            out_r: zeros(n),
            read: 0,
            fft: Fft::new(n),
            re: zeros(n),
            im: zeros(n),
            xl: HalfSpectrum::new(n),
            xr: HalfSpectrum::new(n),
        }
    }

    #[inline] pub fn block_size(&self) -> usize { self.block }
    #[inline] pub fn write_cursor(&self) -> usize { self.write }

    /// Advance one sample. With `capture == false` the input accumulator is
    /// left untouched (the cursor still moves), so its current contents are
    /// convolved again at the next boundary.
    #[inline]
    pub fn tick(&mut self, l: f32, r: f32, capture: bool, spec: &TierSpectrum) -> (f32, f32) {
        if capture {
            self.in_l[self.write] = l;
            self.in_r[self.write] = r;
        }
        self.write += 1;
        if self.write == self.block {
            self.write = 0;
            self.convolve_block(spec);
        }
        let y = (self.out_l[self.read], self.out_r[self.read]);
        self.read += 1;
        y
    }

    fn convolve_block(&mut self, spec: &TierSpectrum) {
        let b = self.block;

        self.fft.forward_real_pair(&self.in_l, &self.in_r, &mut self.re, &mut self.im);
        split_pair(&self.re, &self.im, &mut self.xl, &mut self.xr);
        mul_in_place(&mut self.xl, &spec.left);
        mul_in_place(&mut self.xr, &spec.right);
        merge_pair(&self.xl, &self.xr, &mut self.re, &mut self.im);
        self.fft.inverse(&mut self.re, &mut self.im);

        // drop the consumed half, then overlap-add the new 2B product
        self.out_l.copy_within(b.., 0);
        self.out_r.copy_within(b.., 0);
        self.out_l[b..].fill(0.0);
        self.out_r[b..].fill(0.0);
        for (o, y) in self.out_l.iter_mut().zip(self.re.iter()) {
            *o += *y;
        }
        for (o, y) in self.out_r.iter_mut().zip(self.im.iter()) {
            *o += *y;
        }
        self.read = 0;
    }

    pub fn reset(&mut self) {
        self.in_l.fill(0.0);
        self.in_r.fill(0.0);
        self.out_l.fill(0.0);
        self.out_r.fill(0.0);
        self.write = 0;
        self.read = 0;
    }
}

/// Early + late tier convolver with early-path alignment.
pub struct PartitionedConvolver {
    early: Partition,
    late: Partition,
    align_l: DelayLine,
    align_r: DelayLine,
}

impl PartitionedConvolver {
    /// `cfg` must have passed [`EngineConfig::validate`].
    pub fn new(cfg: &EngineConfig) -> Self {
        let align = cfg.alignment_delay();
        Self {
            early: Partition::new(cfg.early_block),
            late: Partition::new(cfg.late_block),
            align_l: DelayLine::new(align),
            align_r: DelayLine::new(align),
        }
    }

    /// Samples between a tier input and the matching wet output.
    #[inline]
    pub fn latency(&self) -> usize {
        self.late.block_size() - self.early.block_size() - 1
    }

    /// One stereo tick. While `freeze` is set the early tier is fed silence
    /// and the late tier holds its captured block.
    #[inline]
    pub fn process(&mut self, l: f32, r: f32, set: &SpectrumSet, freeze: bool) -> (f32, f32) {
        let (el, er) = if freeze {
            self.early.tick(0.0, 0.0, true, &set.early)
        } else {
            self.early.tick(l, r, true, &set.early)
        };
        let (ll, lr) = self.late.tick(l, r, !freeze, &set.late);
        (self.align_l.process(el) + ll, self.align_r.process(er) + lr)
    }

    pub fn reset(&mut self) {
        self.early.reset();
        self.late.reset();
        self.align_l.clear();
        self.align_r.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::{ImpulseResponse, SpectrumBuilder};

    fn run(conv: &mut PartitionedConvolver, set: &SpectrumSet, input: &[f32]) -> Vec<(f32, f32)> {
        input.iter().map(|&x| conv.process(x, x, set, false)).collect()
    }

    #[test]
    fn single_tier_latency_is_block_minus_one() {
        let mut p = Partition::new(8);
        let mut spec = TierSpectrum::new(8);
        // unit impulse IR on both channels
        let fft = Fft::new(16);
        let (mut re, mut im) = (vec![0.0; 16], vec![0.0; 16]);
        fft.forward_real_pair(&[1.0], &[1.0], &mut re, &mut im);
        split_pair(&re, &im, &mut spec.left, &mut spec.right);

        let mut out = Vec::new();
        for n in 0..32 {
            let x = if n == 0 { 1.0 } else { 0.0 };
            out.push(p.tick(x, -x, true, &spec));
        }
        for (n, (l, r)) in out.iter().enumerate() {
            let want = if n == 7 { 1.0 } else { 0.0 };
            assert!((l - want).abs() < 1e-5, "n={n} l={l}");
            assert!((r + want).abs() < 1e-5, "n={n} r={r}");
        }
    }

    #[test]
    fn write_cursor_stays_below_block() {
        let mut p = Partition::new(4);
        let spec = TierSpectrum::new(4);
        for _ in 0..37 {
            p.tick(0.1, 0.1, true, &spec);
            assert!(p.write_cursor() < 4);
        }
    }

    #[test]
    fn two_tiers_reproduce_ir_after_latency() {
        let cfg = EngineConfig::default().with_blocks(4, 16).with_max_ir_len(64);
        let mut builder = SpectrumBuilder::new(&cfg);
        let mut set = SpectrumSet::empty(&cfg);
        let ir: Vec<f32> = (0..20).map(|i| 1.0 / (i as f32 + 1.0)).collect();
        builder.build(&ImpulseResponse::mono(&ir, 64).unwrap(), 1.0, 1.0, &mut set);

        let mut conv = PartitionedConvolver::new(&cfg);
        let lat = conv.latency();
        assert_eq!(lat, 11);

        let mut input = vec![0.0; 64];
        input[0] = 1.0;
        let out = run(&mut conv, &set, &input);
        for (n, (l, r)) in out.iter().enumerate() {
            let want = if n >= lat && n - lat < ir.len() { ir[n - lat] } else { 0.0 };
            assert!((l - want).abs() < 1e-5, "n={n} l={l} want={want}");
            assert!((r - want).abs() < 1e-5, "n={n} r={r} want={want}");
        }
    }

    #[test]
    fn reset_silences_pending_tail() {
        let cfg = EngineConfig::default().with_blocks(4, 8).with_max_ir_len(16);
        let mut builder = SpectrumBuilder::new(&cfg);
        let mut set = SpectrumSet::empty(&cfg);
        builder.build(&ImpulseResponse::mono(&[1.0; 12], 16).unwrap(), 1.0, 1.0, &mut set);

        let mut conv = PartitionedConvolver::new(&cfg);
        run(&mut conv, &set, &[1.0; 5]);
        conv.reset();
        let out = run(&mut conv, &set, &[0.0; 32]);
        assert!(out.iter().all(|&(l, r)| l == 0.0 && r == 0.0));
    }
}
