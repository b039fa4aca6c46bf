//! Scalar helpers shared by the transform, the filters and the engine.
//!
//! The trig backend is picked at compile time:
//! - `micromath` : micromath's `F32Ext` (small, approximate, `no_std`)
//! - `no-std`    : libm
//! - otherwise   : std's inherent float methods
//!
//! `fast-math` swaps `tan` in [`tpt_g`] for a parabolic sine/cosine pair. It
//! only ever touches filter coefficients, never the FFT twiddles.

#![allow(clippy::excessive_precision)]

use core::f32::consts::PI;

use cfg_if::cfg_if;

#[cfg(not(feature = "std"))]
use num_traits::float::FloatCore;

cfg_if! {
    if #[cfg(feature = "micromath")] {
        mod backend {
            use micromath::F32Ext;
            #[inline] pub fn sin(x: f32) -> f32 { F32Ext::sin(x) }
            #[inline] pub fn cos(x: f32) -> f32 { F32Ext::cos(x) }
            #[inline] pub fn tan(x: f32) -> f32 { F32Ext::sin(x) / F32Ext::cos(x) }
        }
    } else if #[cfg(feature = "no-std")] {
        mod backend {
            #[inline] pub fn sin(x: f32) -> f32 { libm::sinf(x) }
            #[inline] pub fn cos(x: f32) -> f32 { libm::cosf(x) }
            #[inline] pub fn tan(x: f32) -> f32 { libm::tanf(x) }
        }
    } else {
        mod backend {
            #[inline] pub fn sin(x: f32) -> f32 { x.sin() }
            #[inline] pub fn cos(x: f32) -> f32 { x.cos() }
            #[inline] pub fn tan(x: f32) -> f32 { x.tan() }
        }
    }
}

pub const TAU: f32 = 2.0 * PI;

/// Magnitudes below this are flushed to zero by [`kill_denormals`].
pub const DENORMAL_FLOOR: f32 = 1.0e-20;

/// Clamp `x` into `[lo, hi]`. NaN maps to `lo`.
#[inline]
pub fn clamp(x: f32, lo: f32, hi: f32) -> f32 {
    if x.is_nan() || x < lo { lo } else if x > hi { hi } else { x }
}

#[inline]
pub fn kill_denormals(x: f32) -> f32 {
    if x.abs() < DENORMAL_FLOOR { 0.0 } else { x }
}

/// Linear dry/wet crossfade: `dry·(1−amount) + wet·amount`.
///
/// Written as two products (not `dry + (wet − dry)·amount`) so that
/// `amount = 0` returns `dry` and `amount = 1` returns `wet` bit-for-bit.
#[inline]
pub fn mix_dry_wet(dry: f32, wet: f32, amount: f32) -> f32 {
    dry * (1.0 - amount) + wet * amount
}

#[inline]
pub fn sin(x: f32) -> f32 {
    backend::sin(x)
}

/// `(sin x, cos x)` through the selected backend.
#[inline]
pub fn sin_cos(x: f32) -> (f32, f32) {
    (backend::sin(x), backend::cos(x))
}

/// Parabolic sine with one refinement step, |error| < 1.1e-3.
#[cfg(feature = "fast-math")]
#[inline]
fn parabolic_sin(x: f32) -> f32 {
    const B: f32 = 4.0 / PI;
    const C: f32 = -4.0 / (PI * PI);
    const P: f32 = 0.225;
    let x = x - TAU * ((x + PI) / TAU).floor();
    let y = B * x + C * x * x.abs();
    P * (y * y.abs() - y) + y
}

/// Bilinear pre-warp `g = tan(π·fc/sr)` for the TPT state-variable filter.
/// `cut_hz` is held below 0.49·sr so the result stays finite.
#[inline]
pub fn tpt_g(cut_hz: f32, sr: f32) -> f32 {
    let x = PI * (clamp(cut_hz, 0.0, 0.49 * sr) / sr);
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            parabolic_sin(x) / parabolic_sin(x + 0.5 * PI)
        } else {
            backend::tan(x)
        }
    }
}
