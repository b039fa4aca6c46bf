//! Mid/side width and stereo-input detection.

/// `mid = (L+R)/2`, `side = (L−R)/2 · width`, returns `(mid+side, mid−side)`.
/// Width 1 is returned untouched so the identity is exact.
#[inline]
pub fn apply_width(l: f32, r: f32, width: f32) -> (f32, f32) {
    if width == 1.0 {
        return (l, r);
    }
    let mid = 0.5 * (l + r);
    let side = 0.5 * (l - r) * width;
    (mid + side, mid - side)
}

/// Decides whether an input block carries a real stereo signal by comparing
/// the summed absolute L−R difference with the summed mean magnitude over
/// the first `window` samples.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StereoDetector {
    pub window: usize,
    pub ratio: f32,
    pub floor: f32,
}

impl Default for StereoDetector {
    fn default() -> Self {
        Self { window: 16, ratio: 0.1, floor: 0.001 }
    }
}

impl StereoDetector {
    /// `None` when the block is too quiet (or too short) to judge.
    pub fn detect(&self, left: &[f32], right: &[f32]) -> Option<bool> {
        let n = self.window.min(left.len()).min(right.len());
        if n == 0 {
            return None;
        }
        let (mut diff, mut mag) = (0.0_f32, 0.0_f32);
        for (l, r) in left[..n].iter().zip(&right[..n]) {
            diff += (l - r).abs();
            mag += 0.5 * (l.abs() + r.abs());
        }
        if mag > self.floor {
            Some(diff / mag > self.ratio)
        } else {
            None
        }
    }
}
