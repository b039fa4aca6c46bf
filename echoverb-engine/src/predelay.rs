//! Delay lines: the stereo predelay ring and a fixed alignment delay.
//!
//! Both are allocated once at construction; `process`/`write`/`read` are
//! branch-light and never allocate.

use echoverb_core::dsp::clamp;

/// Fixed delay of exactly `len` samples (`len = 0` passes through).
#[derive(Clone, Debug)]
pub struct DelayLine {
    buf: Box<[f32]>,
    pos: usize,
}

impl DelayLine {
    pub fn new(len: usize) -> Self {
        Self { buf: vec![0.0; len].into_boxed_slice(), pos: 0 }
    }

    #[inline] pub fn len(&self) -> usize { self.buf.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.buf.is_empty() }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        if self.buf.is_empty() {
            return x;
        }
        let y = self.buf[self.pos];
        self.buf[self.pos] = x;
        self.pos += 1;
        if self.pos == self.buf.len() {
            self.pos = 0;
        }
        y
    }

    pub fn clear(&mut self) {
        self.buf.fill(0.0);
        self.pos = 0;
    }
}

/// Stereo predelay ring buffer.
///
/// `write` advances the head and stores the new pair; `read` returns the pair
/// written `delay` ticks ago, so a delay of 0 returns the sample just written.
#[derive(Clone, Debug)]
pub struct PredelayBuffer {
    left: Box<[f32]>,
    right: Box<[f32]>,
    head: usize,
    delay: usize,
    sr: f32,
}

impl PredelayBuffer {
    /// Ring of `capacity` samples per channel (at least 1).
    pub fn new(capacity: usize, sr: f32) -> Self {
        let cap = capacity.max(1);
        Self {
            left: vec![0.0; cap].into_boxed_slice(),
            right: vec![0.0; cap].into_boxed_slice(),
            head: 0,
            delay: 0,
            sr,
        }
    }

    #[inline] pub fn capacity(&self) -> usize { self.left.len() }
    #[inline] pub fn delay_samples(&self) -> usize { self.delay }

    /// `delay = round(ms · sr / 1000)`, clamped to `[0, capacity − 1]`.
    pub fn set_delay_ms(&mut self, ms: f32) {
        let max = self.capacity() - 1;
        let samples = (clamp(ms, 0.0, f32::MAX) * self.sr / 1000.0).round();
        self.delay = if samples >= max as f32 { max } else { samples as usize };
    }

    #[inline]
    pub fn set_delay_samples(&mut self, n: usize) {
        self.delay = n.min(self.capacity() - 1);
    }

    #[inline]
    pub fn write(&mut self, l: f32, r: f32) {
        self.head += 1;
        if self.head == self.left.len() {
            self.head = 0;
        }
        self.left[self.head] = l;
        self.right[self.head] = r;
    }

    #[inline]
    pub fn read(&self) -> (f32, f32) {
        let cap = self.left.len();
        let idx = (self.head + cap - self.delay) % cap;
        (self.left[idx], self.right[idx])
    }

    /// Write then read in one call, the per-tick order the engine uses.
    #[inline]
    pub fn process(&mut self, l: f32, r: f32) -> (f32, f32) {
        self.write(l, r);
        self.read()
    }

    pub fn clear(&mut self) {
        self.left.fill(0.0);
        self.right.fill(0.0);
        self.head = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_line_delays_exactly() {
        let mut d = DelayLine::new(3);
        let out: Vec<f32> = [1.0, 2.0, 3.0, 4.0, 5.0].iter().map(|&x| d.process(x)).collect();
        assert_eq!(out, vec![0.0, 0.0, 0.0, 1.0, 2.0]);

        let mut pass = DelayLine::new(0);
        assert_eq!(pass.process(0.25), 0.25);
    }

    #[test]
    fn zero_delay_returns_current_sample() {
        let mut p = PredelayBuffer::new(8, 48_000.0);
        assert_eq!(p.process(0.5, -0.5), (0.5, -0.5));
    }

    #[test]
    fn impulse_appears_after_k_samples() {
        let mut p = PredelayBuffer::new(64, 48_000.0);
        p.set_delay_samples(10);
        let mut hit = None;
        for n in 0..40 {
            let x = if n == 0 { 1.0 } else { 0.0 };
            let (l, r) = p.process(x, x);
            if l != 0.0 {
                assert_eq!(r, 1.0);
                hit = Some(n);
                break;
            }
        }
        assert_eq!(hit, Some(10));
    }

    #[test]
    fn delay_ms_rounds_and_clamps() {
        let mut p = PredelayBuffer::new(24_000, 48_000.0);
        p.set_delay_ms(10.0);
        assert_eq!(p.delay_samples(), 480);
        p.set_delay_ms(0.01);
        assert_eq!(p.delay_samples(), 0);
        p.set_delay_ms(10_000.0);
        assert_eq!(p.delay_samples(), 23_999);
        p.set_delay_ms(f32::NAN);
        assert_eq!(p.delay_samples(), 0);
        p.set_delay_ms(-5.0);
        assert_eq!(p.delay_samples(), 0);
    }

    #[test]
    fn wraps_around_capacity() {
        let mut p = PredelayBuffer::new(4, 48_000.0);
        p.set_delay_samples(3);
        let mut out = Vec::new();
        for n in 0..10 {
            out.push(p.process(n as f32, 0.0).0);
        }
        assert_eq!(&out[3..], &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }
}
