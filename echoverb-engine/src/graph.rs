//! Realtime pedal wrapper.
//!
//! This module defines the minimal `StereoProcessor` trait and a lightweight
//! `Pedal<P>` wrapper that owns a processor, handles true bypass, watches the
//! input for a stereo signal and publishes status flags for display/LED code.
//!
//! Design goals
//! - No dynamic allocations in the audio thread
//! - Status is plain atomics: readers poll, nobody gets called back
//! - Generic over the processor, so the single-owner engine and the split
//!   audio-side processor share the same glue

use std::sync::Arc;

use portable_atomic::{AtomicBool, Ordering};

use crate::config::AUDIO_BLOCK_SIZE;
use crate::stereo::StereoDetector;

/// Anything that can turn a planar stereo block into another one.
pub trait StereoProcessor {
    /// Process `in_*` into `out_*` (equal lengths).
    fn process_block(&mut self, in_l: &[f32], in_r: &[f32], out_l: &mut [f32], out_r: &mut [f32]);

    /// Clear signal state (delay lines, accumulators, filters).
    fn reset(&mut self);

    fn is_ir_loaded(&self) -> bool;

    fn is_frozen(&self) -> bool;
}

/// Queryable engine status for display and LED collaborators.
#[derive(Debug, Default)]
pub struct PedalStatus {
    bypass: AtomicBool,
    stereo_input: AtomicBool,
    ir_loaded: AtomicBool,
    freeze: AtomicBool,
}

impl PedalStatus {
    #[inline] pub fn bypass(&self) -> bool { self.bypass.load(Ordering::Relaxed) }
    #[inline] pub fn stereo_input(&self) -> bool { self.stereo_input.load(Ordering::Relaxed) }
    #[inline] pub fn ir_loaded(&self) -> bool { self.ir_loaded.load(Ordering::Relaxed) }
    #[inline] pub fn freeze(&self) -> bool { self.freeze.load(Ordering::Relaxed) }

    /// Requested by the control loop, honoured at the next block.
    #[inline] pub fn set_bypass(&self, on: bool) { self.bypass.store(on, Ordering::Relaxed); }

    /// Flip bypass (footswitch press); returns the new state.
    #[inline]
    pub fn toggle_bypass(&self) -> bool {
        !self.bypass.fetch_xor(true, Ordering::Relaxed)
    }
}

/// Scratch size used to split interleaved buffers into planar chunks.
pub const INTERLEAVE_CHUNK: usize = 4 * AUDIO_BLOCK_SIZE;

/// Owns a processor and wraps it with bypass and stereo detection.
pub struct Pedal<P: StereoProcessor> {
    inner: P,
    status: Arc<PedalStatus>,
    detector: StereoDetector,
    scratch: [[f32; INTERLEAVE_CHUNK]; 4],
}

impl<P: StereoProcessor> Pedal<P> {
    pub fn new(inner: P) -> Self {
        let status = Arc::new(PedalStatus::default());
        status.ir_loaded.store(inner.is_ir_loaded(), Ordering::Relaxed);
        Self {
            inner,
            status,
            detector: StereoDetector::default(),
            scratch: [[0.0; INTERLEAVE_CHUNK]; 4],
        }
    }

    /// Shared handle for the control/display side.
    #[inline] pub fn status(&self) -> Arc<PedalStatus> { Arc::clone(&self.status) }
    #[inline] pub fn inner(&self) -> &P { &self.inner }
    #[inline] pub fn inner_mut(&mut self) -> &mut P { &mut self.inner }

    pub fn reset(&mut self) {
        self.inner.reset();
        self.status.stereo_input.store(false, Ordering::Relaxed);
    }

    /// Planar block. Bypass copies input to output; the processor does not
    /// run while bypassed.
    pub fn process_block(&mut self, in_l: &[f32], in_r: &[f32], out_l: &mut [f32], out_r: &mut [f32]) {
        let n = in_l.len().min(in_r.len()).min(out_l.len()).min(out_r.len());
        Self::run(
            &mut self.inner,
            &self.status,
            &self.detector,
            &in_l[..n],
            &in_r[..n],
            &mut out_l[..n],
            &mut out_r[..n],
        );
    }

    /// Interleaved frames with `channels` per frame. Mono input feeds both
    /// sides and takes the left output; channels past the second are
    /// silenced on output and ignored on input.
    pub fn process_interleaved(&mut self, input: &[f32], output: &mut [f32], channels: usize) {
        if channels == 0 {
            return;
        }
        let frames = (input.len() / channels).min(output.len() / channels);
        let mut done = 0;
        while done < frames {
            let n = (frames - done).min(INTERLEAVE_CHUNK);
            let [il, ir, ol, or] = &mut self.scratch;
            for f in 0..n {
                let base = (done + f) * channels;
                il[f] = input[base];
                ir[f] = if channels > 1 { input[base + 1] } else { input[base] };
            }
            let (il, ir, ol, or) = (&il[..n], &ir[..n], &mut ol[..n], &mut or[..n]);
            Self::run(&mut self.inner, &self.status, &self.detector, il, ir, ol, or);
            for f in 0..n {
                let base = (done + f) * channels;
                output[base] = ol[f];
                if channels > 1 {
                    output[base + 1] = or[f];
                }
                for c in 2..channels {
                    output[base + c] = 0.0;
                }
            }
            done += n;
        }
    }

    fn run(
        inner: &mut P,
        status: &PedalStatus,
        detector: &StereoDetector,
        in_l: &[f32],
        in_r: &[f32],
        out_l: &mut [f32],
        out_r: &mut [f32],
    ) {
        // only judge blocks long enough to fill the window
        if in_l.len() > detector.window {
            if let Some(stereo) = detector.detect(in_l, in_r) {
                status.stereo_input.store(stereo, Ordering::Relaxed);
            }
        }
        if status.bypass() {
            out_l.copy_from_slice(in_l);
            out_r.copy_from_slice(in_r);
        } else {
            inner.process_block(in_l, in_r, out_l, out_r);
        }
        status.ir_loaded.store(inner.is_ir_loaded(), Ordering::Relaxed);
        status.freeze.store(inner.is_frozen(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Halves the signal; reports a loaded IR.
    struct Half {
        resets: usize,
    }

    impl StereoProcessor for Half {
        fn process_block(&mut self, in_l: &[f32], in_r: &[f32], out_l: &mut [f32], out_r: &mut [f32]) {
            for i in 0..in_l.len() {
                out_l[i] = 0.5 * in_l[i];
                out_r[i] = 0.5 * in_r[i];
            }
        }
        fn reset(&mut self) { self.resets += 1; }
        fn is_ir_loaded(&self) -> bool { true }
        fn is_frozen(&self) -> bool { false }
    }

    #[test]
    fn bypass_copies_input() {
        let mut pedal = Pedal::new(Half { resets: 0 });
        let status = pedal.status();
        let input = [0.25_f32; 48];
        let (mut l, mut r) = ([0.0; 48], [0.0; 48]);

        pedal.process_block(&input, &input, &mut l, &mut r);
        assert_eq!(l[0], 0.125);
        assert!(status.ir_loaded());

        assert!(status.toggle_bypass());
        pedal.process_block(&input, &input, &mut l, &mut r);
        assert_eq!(l, input);
        assert_eq!(r, input);
    }

    #[test]
    fn detects_stereo_input() {
        let mut pedal = Pedal::new(Half { resets: 0 });
        let status = pedal.status();
        let left = [0.5_f32; 48];
        let right = [-0.5_f32; 48];
        let (mut l, mut r) = ([0.0; 48], [0.0; 48]);

        pedal.process_block(&left, &left, &mut l, &mut r);
        assert!(!status.stereo_input());
        pedal.process_block(&left, &right, &mut l, &mut r);
        assert!(status.stereo_input());
        // silence keeps the last verdict
        pedal.process_block(&[0.0; 48], &[0.0; 48], &mut l, &mut r);
        assert!(status.stereo_input());

        pedal.reset();
        assert!(!status.stereo_input());
        assert_eq!(pedal.inner().resets, 1);
    }

    #[test]
    fn interleaved_handles_mono_and_extra_channels() {
        let mut pedal = Pedal::new(Half { resets: 0 });
        let input: Vec<f32> = (0..600).map(|i| i as f32).collect();

        let mut out = vec![9.0; 600];
        pedal.process_interleaved(&input, &mut out, 1);
        assert_eq!(out[10], 5.0);

        let mut out = vec![9.0; 600];
        pedal.process_interleaved(&input, &mut out, 3);
        assert_eq!(&out[..6], &[0.0, 0.5, 0.0, 1.5, 2.0, 0.0]);
        assert_eq!(out[597], 298.5);
        assert_eq!(out[599], 0.0);
    }
}
