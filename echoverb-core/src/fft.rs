//! Fixed-size radix-2 complex FFT.
//!
//! Design
//! - Size is chosen at runtime, tables (twiddles + bit-reversal) are built
//!   once in [`Fft::new`]; `forward`/`inverse` never allocate
//! - Split real/imaginary buffers (`&mut [f32]` each) rather than an
//!   interleaved complex type, which keeps the spectral code SIMD friendly
//! - `inverse` includes the `1/N` scale, so `inverse(forward(x)) == x`
//!
//! Real signals are handled by the caller packing two of them into one
//! complex transform (see [`Fft::forward_real_pair`] and
//! [`crate::spectral::split_pair`]).

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::dsp::{sin_cos, TAU};

#[derive(Clone, Debug)]
pub struct Fft {
    n: usize,
    /// `cos(2πk/N)` for `k in 0..N/2`
    cos: Box<[f32]>,
    /// `sin(2πk/N)` for `k in 0..N/2`
    sin: Box<[f32]>,
    rev: Box<[u32]>,
}

impl Fft {
    /// Build tables for an `n`-point transform.
    ///
    /// # Panics
    /// If `n` is not a power of two or is smaller than 2.
    pub fn new(n: usize) -> Self {
        assert!(n >= 2 && n.is_power_of_two(), "FFT size must be a power of two >= 2, got {n}");

        let half = n / 2;
        let mut cos = Vec::with_capacity(half);
        let mut sin = Vec::with_capacity(half);
        for k in 0..half {
            let (s, c) = sin_cos(TAU * k as f32 / n as f32);
            cos.push(c);
            sin.push(s);
        }

        let bits = n.trailing_zeros();
        let rev = (0..n)
            .map(|i| (i.reverse_bits() >> (usize::BITS - bits)) as u32)
            .collect::<Vec<_>>();

        Self {
            n,
            cos: cos.into_boxed_slice(),
            sin: sin.into_boxed_slice(),
            rev: rev.into_boxed_slice(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    /// Always false; an `Fft` has at least two points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// In-place forward transform, `X[k] = Σ x[n]·e^(−2πikn/N)`.
    #[inline]
    pub fn forward(&self, re: &mut [f32], im: &mut [f32]) {
        self.transform(re, im, -1.0);
    }

    /// In-place inverse transform including the `1/N` scale.
    pub fn inverse(&self, re: &mut [f32], im: &mut [f32]) {
        self.transform(re, im, 1.0);
        let scale = 1.0 / self.n as f32;
        for (r, i) in re.iter_mut().zip(im.iter_mut()) {
            *r *= scale;
            *i *= scale;
        }
    }

    /// Transform a real signal, zero-padding `input` up to `N`.
    ///
    /// # Panics
    /// If `input` is longer than `N`.
    pub fn forward_real(&self, input: &[f32], re: &mut [f32], im: &mut [f32]) {
        self.load(input, re);
        im.fill(0.0);
        self.forward(re, im);
    }

    /// Transform two real signals at once as `a + i·b`, zero-padding both.
    /// Separate the result with [`crate::spectral::split_pair`].
    pub fn forward_real_pair(&self, a: &[f32], b: &[f32], re: &mut [f32], im: &mut [f32]) {
        self.load(a, re);
        self.load(b, im);
        self.forward(re, im);
    }

    fn load(&self, input: &[f32], dst: &mut [f32]) {
        assert!(input.len() <= self.n, "input of {} samples exceeds FFT size {}", input.len(), self.n);
        dst[..input.len()].copy_from_slice(input);
        dst[input.len()..].fill(0.0);
    }

    fn transform(&self, re: &mut [f32], im: &mut [f32], sign: f32) {
        let n = self.n;
        debug_assert!(re.len() == n && im.len() == n, "buffers must hold exactly {n} points");

        for i in 0..n {
            let j = self.rev[i] as usize;
            if j > i {
                re.swap(i, j);
                im.swap(i, j);
            }
        }

        let mut size = 2;
        while size <= n {
            let half = size / 2;
            let step = n / size;
            for start in (0..n).step_by(size) {
                for j in 0..half {
                    let wr = self.cos[j * step];
                    let wi = sign * self.sin[j * step];
                    let a = start + j;
                    let b = a + half;
                    let tr = re[b] * wr - im[b] * wi;
                    let ti = re[b] * wi + im[b] * wr;
                    re[b] = re[a] - tr;
                    im[b] = im[a] - ti;
                    re[a] += tr;
                    im[a] += ti;
                }
            }
            size <<= 1;
        }
    }
}
