#![cfg_attr(not(feature = "std"), no_std)]
//! Echoverb Core: no_std-ready DSP primitives for partitioned convolution reverb.
//!
//! Features
//! - `std`      : (default) use the Rust standard library
//! - `no-std`   : build with `#![no_std]` and use `libm`/`micromath` math backends
//! - `fast-math`: parabolic sin/cos behind the filter coefficient `tan`
//! - `simd`     : `wide::f32x4` path for the per-bin spectral multiply
//!
//! Modules
//! - [`dsp`]      : math backend, small utilities (clamp, denormals, mix, tpt_g)
//! - [`fft`]      : fixed-size radix-2 complex FFT with precomputed tables
//! - [`spectral`] : half-spectrum storage and packed-pair split/multiply/merge
//! - [`filters`]  : TPT state-variable filter
//!
//! Design
//! - Tables and spectra are allocated once at construction; the per-sample and
//!   per-block paths never touch the allocator
//! - Clear separation between math helpers and the transform/filter building blocks
//! - Friendly to embedded / real-time targets

extern crate alloc;

pub mod dsp;
pub mod fft;
pub mod filters;
pub mod spectral;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::dsp::{clamp, kill_denormals, mix_dry_wet, tpt_g, TAU};
    pub use crate::fft::Fft;
    pub use crate::filters::{SvfMode, SvfTpt};
    pub use crate::spectral::{merge_pair, mul_in_place, split_pair, HalfSpectrum};
}
