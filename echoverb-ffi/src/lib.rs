//! C ABI wrapper for the Echoverb convolution reverb.
//!
//! Exposes an opaque pedal handle: create/destroy, stereo block processing
//! (planar or interleaved), IR loading, knob setters and status queries.
//!
//! ABI notes
//! - All functions are `extern "C"` and `#[no_mangle]`.
//! - Opaque handle type: `EchoverbPedal` (heap-allocated; you own/delete it).
//! - Every function tolerates a null handle and returns a neutral value.
//!
//! Threading
//! - The handle is NOT thread-safe; IR loads rebuild spectra in the calling
//!   thread, so hosts with a separate control thread should serialize calls.

use std::slice;

use echoverb_engine::bank::generate;
use echoverb_engine::{ConvolutionReverb, EngineConfig, IrMode, IrSource, Pedal};
use log::warn;

/// Opaque pedal handed to C.
pub struct EchoverbPedal {
    inner: Pedal<ConvolutionReverb>,
}

impl EchoverbPedal {
    fn new(sample_rate: f32) -> Option<Self> {
        let cfg = EngineConfig::default().with_sample_rate(sample_rate);
        match ConvolutionReverb::try_new(cfg) {
            Ok(rv) => Some(Self { inner: Pedal::new(rv) }),
            Err(e) => {
                warn!("echoverb_create: {e}");
                None
            }
        }
    }

    #[inline]
    fn reverb(&mut self) -> &mut ConvolutionReverb {
        self.inner.inner_mut()
    }
}

#[inline]
fn handle<'a>(p: *mut EchoverbPedal) -> Option<&'a mut EchoverbPedal> {
    // SAFETY: non-null handles come from `echoverb_create` and are used from one thread.
    unsafe { p.as_mut() }
}

#[inline]
fn handle_ref<'a>(p: *const EchoverbPedal) -> Option<&'a EchoverbPedal> {
    // SAFETY: as above.
    unsafe { p.as_ref() }
}

#[inline]
fn samples<'a>(p: *const f32, len: usize) -> Option<&'a [f32]> {
    // SAFETY: caller guarantees `len` readable floats behind a non-null pointer.
    (!p.is_null()).then(|| unsafe { slice::from_raw_parts(p, len) })
}

#[inline]
fn samples_mut<'a>(p: *mut f32, len: usize) -> Option<&'a mut [f32]> {
    // SAFETY: caller guarantees `len` writable floats that alias no input.
    (!p.is_null()).then(|| unsafe { slice::from_raw_parts_mut(p, len) })
}

// --- Creation / destruction -------------------------------------------------------

/// Create a pedal at `sample_rate` with default engine configuration.
/// Returns null when the sample rate is rejected.
#[no_mangle]
pub extern "C" fn echoverb_create(sample_rate: f32) -> *mut EchoverbPedal {
    EchoverbPedal::new(sample_rate).map_or(std::ptr::null_mut(), |p| Box::into_raw(Box::new(p)))
}

/// Destroy a pedal previously returned by `echoverb_create`.
#[no_mangle]
pub extern "C" fn echoverb_destroy(pedal: *mut EchoverbPedal) {
    if !pedal.is_null() {
        // SAFETY: pointer came from `Box::into_raw` in `echoverb_create`.
        unsafe { drop(Box::from_raw(pedal)) };
    }
}

/// Clear all audio history (convolution state, predelay, filters).
/// IR and parameters are kept.
#[no_mangle]
pub extern "C" fn echoverb_reset(pedal: *mut EchoverbPedal) {
    if let Some(p) = handle(pedal) {
        p.inner.reset();
    }
}

// --- Processing -------------------------------------------------------------------

/// Process `frames` stereo frames from planar buffers.
/// Returns the number of frames processed (0 on error).
#[no_mangle]
pub extern "C" fn echoverb_process_planar(
    pedal: *mut EchoverbPedal,
    in_l: *const f32,
    in_r: *const f32,
    out_l: *mut f32,
    out_r: *mut f32,
    frames: u32,
) -> u32 {
    let n = frames as usize;
    let (Some(p), Some(il), Some(ir), Some(ol), Some(or)) = (
        handle(pedal),
        samples(in_l, n),
        samples(in_r, n),
        samples_mut(out_l, n),
        samples_mut(out_r, n),
    ) else {
        return 0;
    };
    p.inner.process_block(il, ir, ol, or);
    frames
}

/// Process `frames` interleaved frames with `channels` per frame. A mono
/// stream feeds both sides and receives the left output.
/// Returns the number of frames processed (0 on error).
#[no_mangle]
pub extern "C" fn echoverb_process_interleaved(
    pedal: *mut EchoverbPedal,
    input: *const f32,
    output: *mut f32,
    frames: u32,
    channels: u32,
) -> u32 {
    if channels == 0 {
        return 0;
    }
    let len = frames as usize * channels as usize;
    let (Some(p), Some(inp), Some(out)) = (handle(pedal), samples(input, len), samples_mut(output, len)) else {
        return 0;
    };
    p.inner.process_interleaved(inp, out, channels as usize);
    frames
}

// --- Impulse responses ------------------------------------------------------------

/// Load a mono IR of `len` samples. On failure the previous IR stays active.
#[no_mangle]
pub extern "C" fn echoverb_load_ir(pedal: *mut EchoverbPedal, ir: *const f32, len: u32) -> bool {
    match (handle(pedal), samples(ir, len as usize)) {
        (Some(p), Some(ir)) => p.reverb().load_ir(ir),
        _ => false,
    }
}

/// Load a true-stereo IR, `len` samples per channel.
#[no_mangle]
pub extern "C" fn echoverb_load_stereo_ir(
    pedal: *mut EchoverbPedal,
    left: *const f32,
    right: *const f32,
    len: u32,
) -> bool {
    let n = len as usize;
    match (handle(pedal), samples(left, n), samples(right, n)) {
        (Some(p), Some(l), Some(r)) => p.reverb().load_stereo_ir(l, r),
        _ => false,
    }
}

/// Load the built-in IR for a pedal mode: 0 full bridge, 1 short echo,
/// 2 long decay. Unknown modes return false.
#[no_mangle]
pub extern "C" fn echoverb_load_ir_mode(pedal: *mut EchoverbPedal, mode: u32) -> bool {
    let (Some(p), Some(&mode)) = (handle(pedal), IrMode::ALL.get(mode as usize)) else {
        return false;
    };
    let rv = p.reverb();
    match generate(mode, rv.config().bank_ir_len()) {
        IrSource::Mono(ir) => rv.load_ir(&ir),
        IrSource::Stereo { left, right } => rv.load_stereo_ir(&left, &right),
    }
}

// --- Parameters -------------------------------------------------------------------

macro_rules! setter {
    ($(#[$doc:meta])* $name:ident => $method:ident) => {
        $(#[$doc])*
        #[no_mangle]
        pub extern "C" fn $name(pedal: *mut EchoverbPedal, value: f32) {
            if let Some(p) = handle(pedal) {
                p.reverb().$method(value);
            }
        }
    };
}

setter!(/// Wet fraction, 0..1.
    echoverb_set_dry_wet => set_dry_wet);
setter!(/// Predelay in milliseconds, 0..500.
    echoverb_set_predelay_ms => set_predelay_ms);
setter!(/// Fraction of the loaded IR to use, 0..1. Rebuilds the spectra.
    echoverb_set_ir_length => set_ir_length);
setter!(/// Low-cut corner in Hz, 20..2000.
    echoverb_set_low_cut => set_low_cut);
setter!(/// High-cut corner in Hz, 1000..20000.
    echoverb_set_high_cut => set_high_cut);
setter!(/// Mid/side width, 0..2.
    echoverb_set_stereo_width => set_stereo_width);
setter!(/// Output level, 0..1.
    echoverb_set_output_level => set_output_level);

#[no_mangle]
pub extern "C" fn echoverb_set_freeze(pedal: *mut EchoverbPedal, on: bool) {
    if let Some(p) = handle(pedal) {
        p.reverb().set_freeze(on);
    }
}

/// Flip freeze; returns the new state.
#[no_mangle]
pub extern "C" fn echoverb_toggle_freeze(pedal: *mut EchoverbPedal) -> bool {
    let Some(p) = handle(pedal) else { return false };
    let rv = p.reverb();
    let on = !rv.parameters().freeze;
    rv.set_freeze(on);
    on
}

/// Restore every knob to its default.
#[no_mangle]
pub extern "C" fn echoverb_reset_parameters(pedal: *mut EchoverbPedal) {
    if let Some(p) = handle(pedal) {
        p.reverb().reset_parameters();
    }
}

#[no_mangle]
pub extern "C" fn echoverb_set_bypass(pedal: *mut EchoverbPedal, on: bool) {
    if let Some(p) = handle(pedal) {
        p.inner.status().set_bypass(on);
    }
}

/// Flip bypass; returns the new state.
#[no_mangle]
pub extern "C" fn echoverb_toggle_bypass(pedal: *mut EchoverbPedal) -> bool {
    handle(pedal).is_some_and(|p| p.inner.status().toggle_bypass())
}

// --- Status -----------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn echoverb_is_ir_loaded(pedal: *const EchoverbPedal) -> bool {
    handle_ref(pedal).is_some_and(|p| p.inner.inner().is_ir_loaded())
}

#[no_mangle]
pub extern "C" fn echoverb_is_frozen(pedal: *const EchoverbPedal) -> bool {
    handle_ref(pedal).is_some_and(|p| p.inner.inner().parameters().freeze)
}

#[no_mangle]
pub extern "C" fn echoverb_is_bypassed(pedal: *const EchoverbPedal) -> bool {
    handle_ref(pedal).is_some_and(|p| p.inner.status().bypass())
}

/// Whether the last processed blocks carried distinct left/right input.
#[no_mangle]
pub extern "C" fn echoverb_is_stereo_input(pedal: *const EchoverbPedal) -> bool {
    handle_ref(pedal).is_some_and(|p| p.inner.status().stereo_input())
}

/// Wet-path latency in samples.
#[no_mangle]
pub extern "C" fn echoverb_latency_samples(pedal: *const EchoverbPedal) -> u32 {
    handle_ref(pedal).map_or(0, |p| p.inner.inner().latency() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn null_handle_is_inert() {
        let null = ptr::null_mut();
        echoverb_reset(null);
        echoverb_set_dry_wet(null, 0.3);
        assert!(!echoverb_load_ir_mode(null, 0));
        assert!(!echoverb_is_ir_loaded(null));
        assert_eq!(echoverb_latency_samples(null), 0);
        echoverb_destroy(null);
    }

    #[test]
    fn rejects_bad_sample_rate() {
        assert!(echoverb_create(0.0).is_null());
        assert!(echoverb_create(1.0e12).is_null());
        assert!(echoverb_create(f32::INFINITY).is_null());
    }

    #[test]
    fn dry_signal_passes_through_planar() {
        let p = echoverb_create(48_000.0);
        assert!(!p.is_null());
        echoverb_set_dry_wet(p, 0.0);
        assert!(echoverb_load_ir_mode(p, 1));
        assert!(echoverb_is_ir_loaded(p));

        let il: Vec<f32> = (0..96).map(|i| (i as f32 * 0.1).sin() * 0.5).collect();
        let ir = il.clone();
        let (mut ol, mut or) = (vec![0.0; 96], vec![0.0; 96]);
        let n = echoverb_process_planar(p, il.as_ptr(), ir.as_ptr(), ol.as_mut_ptr(), or.as_mut_ptr(), 96);
        assert_eq!(n, 96);
        for i in 0..96 {
            assert!((ol[i] - il[i]).abs() < 1e-6);
            assert!((or[i] - ir[i]).abs() < 1e-6);
        }
        echoverb_destroy(p);
    }

    #[test]
    fn unknown_mode_and_bad_ir_are_rejected() {
        let p = echoverb_create(48_000.0);
        assert!(!echoverb_load_ir_mode(p, 7));
        let nan = [f32::NAN; 4];
        assert!(!echoverb_load_ir(p, nan.as_ptr(), 4));
        assert!(!echoverb_is_ir_loaded(p));
        echoverb_destroy(p);
    }

    #[test]
    fn toggles_report_new_state() {
        let p = echoverb_create(44_100.0);
        assert!(echoverb_toggle_freeze(p));
        assert!(echoverb_is_frozen(p));
        assert!(!echoverb_toggle_freeze(p));
        assert!(echoverb_toggle_bypass(p));
        assert!(echoverb_is_bypassed(p));
        echoverb_set_bypass(p, false);
        assert!(!echoverb_is_bypassed(p));
        assert_eq!(echoverb_latency_samples(p), 959);
        echoverb_destroy(p);
    }

    #[test]
    fn interleaved_mono_stream() {
        let p = echoverb_create(48_000.0);
        let impulse = [1.0_f32];
        assert!(echoverb_load_ir(p, impulse.as_ptr(), 1));
        echoverb_set_dry_wet(p, 1.0);
        echoverb_set_low_cut(p, 20.0);
        echoverb_set_high_cut(p, 20_000.0);

        let input = vec![0.25_f32; 48];
        let mut output = vec![1.0_f32; 48];
        assert_eq!(echoverb_process_interleaved(p, input.as_ptr(), output.as_mut_ptr(), 48, 1), 48);
        // wet path is still inside its latency window
        assert!(output.iter().all(|v| v.abs() < 1e-6));
        echoverb_destroy(p);
    }
}
