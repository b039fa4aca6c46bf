//! Half-spectrum storage and packed-pair helpers.
//!
//! A real sequence of length `N` has a Hermitian spectrum, so only bins
//! `0..=N/2` carry information. Two real sequences `a`, `b` are transformed
//! together as `z = a + i·b`; [`split_pair`] recovers both half-spectra from
//! the one complex transform and [`merge_pair`] goes the other way, so one
//! inverse transform returns both output channels (`re` = left, `im` = right).

use alloc::boxed::Box;
use alloc::vec;

/// Bins `0..=N/2` of the spectrum of a real length-`N` sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct HalfSpectrum {
    re: Box<[f32]>,
    im: Box<[f32]>,
}

impl HalfSpectrum {
    /// Zeroed half-spectrum for an `fft_len`-point transform.
    pub fn new(fft_len: usize) -> Self {
        let bins = fft_len / 2 + 1;
        Self {
            re: vec![0.0; bins].into_boxed_slice(),
            im: vec![0.0; bins].into_boxed_slice(),
        }
    }

    #[inline] pub fn bins(&self) -> usize { self.re.len() }
    #[inline] pub fn fft_len(&self) -> usize { (self.re.len() - 1) * 2 }
    #[inline] pub fn re(&self) -> &[f32] { &self.re }
    #[inline] pub fn im(&self) -> &[f32] { &self.im }

    #[inline]
    pub fn clear(&mut self) {
        self.re.fill(0.0);
        self.im.fill(0.0);
    }

    pub fn copy_from(&mut self, other: &HalfSpectrum) {
        self.re.copy_from_slice(&other.re);
        self.im.copy_from_slice(&other.im);
    }

    /// True when every bin is exactly zero.
    pub fn is_silent(&self) -> bool {
        self.re.iter().chain(self.im.iter()).all(|&v| v == 0.0)
    }
}

/// Separate the spectrum of `a + i·b` into the half-spectra of `a` and `b`.
///
/// With `p = Z[k]` and `q = Z[(N−k) mod N]`:
/// `A[k] = (p + conj q)/2`, `B[k] = (p − conj q)/(2i)`.
pub fn split_pair(re: &[f32], im: &[f32], a: &mut HalfSpectrum, b: &mut HalfSpectrum) {
    let n = re.len();
    debug_assert_eq!(a.fft_len(), n);
    debug_assert_eq!(b.fft_len(), n);

    for k in 0..a.bins() {
        let j = (n - k) % n;
        let (pr, pi) = (re[k], im[k]);
        let (qr, qi) = (re[j], im[j]);
        a.re[k] = 0.5 * (pr + qr);
        a.im[k] = 0.5 * (pi - qi);
        b.re[k] = 0.5 * (pi + qi);
        b.im[k] = 0.5 * (qr - pr);
    }
}

/// Build the full spectrum of `a + i·b` from the half-spectra of two real
/// sequences. The inverse transform of the result carries `a` in its real
/// part and `b` in its imaginary part.
pub fn merge_pair(a: &HalfSpectrum, b: &HalfSpectrum, re: &mut [f32], im: &mut [f32]) {
    let n = re.len();
    let half = n / 2;
    debug_assert_eq!(a.fft_len(), n);
    debug_assert_eq!(b.fft_len(), n);

    for k in 0..=half {
        re[k] = a.re[k] - b.im[k];
        im[k] = a.im[k] + b.re[k];
    }
    for k in 1..half {
        re[n - k] = a.re[k] + b.im[k];
        im[n - k] = b.re[k] - a.im[k];
    }
}

/// Per-bin complex multiply `x[k] ← x[k]·h[k]`, i.e. `(ac−bd) + (ad+bc)i`.
#[inline]
pub fn mul_in_place(x: &mut HalfSpectrum, h: &HalfSpectrum) {
    debug_assert_eq!(x.bins(), h.bins());
    mul_bins(&mut x.re, &mut x.im, &h.re, &h.im);
}

#[cfg(not(feature = "simd"))]
#[inline]
fn mul_bins(xr: &mut [f32], xi: &mut [f32], hr: &[f32], hi: &[f32]) {
    for k in 0..xr.len() {
        let (a, b) = (xr[k], xi[k]);
        let (c, d) = (hr[k], hi[k]);
        xr[k] = a * c - b * d;
        xi[k] = a * d + b * c;
    }
}

#[cfg(feature = "simd")]
#[inline]
fn mul_bins(xr: &mut [f32], xi: &mut [f32], hr: &[f32], hi: &[f32]) {
    use wide::f32x4;

    let lanes = xr.len() / 4 * 4;
    for k in (0..lanes).step_by(4) {
        let a = f32x4::from([xr[k], xr[k + 1], xr[k + 2], xr[k + 3]]);
        let b = f32x4::from([xi[k], xi[k + 1], xi[k + 2], xi[k + 3]]);
        let c = f32x4::from([hr[k], hr[k + 1], hr[k + 2], hr[k + 3]]);
        let d = f32x4::from([hi[k], hi[k + 1], hi[k + 2], hi[k + 3]]);
        xr[k..k + 4].copy_from_slice(&(a * c - b * d).to_array());
        xi[k..k + 4].copy_from_slice(&(a * d + b * c).to_array());
    }
    // odd bin count (N/2 + 1): scalar tail
    for k in lanes..xr.len() {
        let (a, b) = (xr[k], xi[k]);
        let (c, d) = (hr[k], hi[k]);
        xr[k] = a * c - b * d;
        xi[k] = a * d + b * c;
    }
}
