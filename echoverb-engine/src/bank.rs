//! IR bank: the three pedal modes and their impulse responses.
//!
//! Each slot holds a mono or stereo IR; until a file loader fills a slot it
//! carries a generated placeholder (exponential decay with spaced
//! reflections, right channel gently modulated), energy-normalized and sized
//! to what the convolver tiers cover (`EngineConfig::bank_ir_len`).

use core::fmt;

use log::info;

use crate::control::IrSource;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum IrMode {
    #[default]
    FullBridge,
    ShortEcho,
    LongDecay,
}

impl IrMode {
    pub const ALL: [IrMode; 3] = [IrMode::FullBridge, IrMode::ShortEcho, IrMode::LongDecay];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Next mode in footswitch order, wrapping.
    #[inline]
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for IrMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IrMode::FullBridge => "full bridge",
            IrMode::ShortEcho => "short echo",
            IrMode::LongDecay => "long decay",
        })
    }
}

/// Scale both channels so the louder one has unit energy.
fn normalize_energy(left: &mut [f32], right: &mut [f32]) {
    let energy = |s: &[f32]| s.iter().map(|v| v * v).sum::<f32>();
    let e = energy(left).max(energy(right));
    if e > 0.0 {
        let g = 1.0 / e.sqrt();
        left.iter_mut().chain(right.iter_mut()).for_each(|v| *v *= g);
    }
}

/// Generated placeholder IR for `mode`, `len` samples per channel.
pub fn generate(mode: IrMode, len: usize) -> IrSource {
    let n = len as f32;
    let (mut left, mut right): (Vec<f32>, Vec<f32>) = (0..len)
        .map(|i| {
            let t = i as f32;
            match mode {
                IrMode::FullBridge => {
                    let mut decay = (-3.0 * t / n).exp();
                    // reflection cluster every 100 ms at 48 kHz
                    if i % 4800 < 100 {
                        decay *= 1.5;
                    }
                    let l = decay * if i == 0 { 1.0 } else { 0.7 };
                    (l, l * (1.0 + 0.1 * (t * 0.01).sin()))
                }
                IrMode::ShortEcho => {
                    let mut decay = (-6.0 * t / n).exp();
                    if i % 2400 < 200 && i < 24_000 {
                        decay *= 2.0;
                    }
                    let l = decay * if i == 0 { 1.0 } else { 0.8 };
                    (l, l * (1.0 + 0.1 * (t * 0.015).sin()))
                }
                IrMode::LongDecay => {
                    let decay = (-2.0 * t / n).exp();
                    let diffusion = 0.3 * (t * 0.003).sin() * (t * 0.005).sin();
                    let l = (decay + diffusion * decay) * if i == 0 { 0.9 } else { 0.6 };
                    (l, l * (1.0 + 0.12 * (t * 0.008).sin()))
                }
            }
        })
        .unzip();
    normalize_energy(&mut left, &mut right);
    IrSource::Stereo { left, right }
}

/// One IR per mode plus the active selection.
#[derive(Clone, Debug)]
pub struct IrBank {
    slots: [IrSource; 3],
    mode: IrMode,
    max_len: usize,
}

impl IrBank {
    /// Bank filled with generated IRs of `max_len` samples.
    pub fn generated(max_len: usize) -> Self {
        Self {
            slots: IrMode::ALL.map(|m| generate(m, max_len)),
            mode: IrMode::default(),
            max_len,
        }
    }

    #[inline] pub fn mode(&self) -> IrMode { self.mode }
    #[inline] pub fn current(&self) -> &IrSource { &self.slots[self.mode.index()] }
    #[inline] pub fn slot(&self, mode: IrMode) -> &IrSource { &self.slots[mode.index()] }

    pub fn select(&mut self, mode: IrMode) -> &IrSource {
        if mode != self.mode {
            info!("IR mode: {mode}");
        }
        self.mode = mode;
        self.current()
    }

    /// Advance to the next mode and return its IR.
    pub fn cycle(&mut self) -> &IrSource {
        self.select(self.mode.next())
    }

    /// Replace a slot (e.g. with a file from the loader). Longer IRs are cut
    /// to the bank's capacity.
    pub fn store(&mut self, mode: IrMode, source: IrSource) {
        let cut = |mut v: Vec<f32>, max: usize| {
            v.truncate(max);
            v
        };
        let source = match source {
            IrSource::Mono(s) => IrSource::Mono(cut(s, self.max_len)),
            IrSource::Stereo { left, right } => IrSource::Stereo {
                left: cut(left, self.max_len),
                right: cut(right, self.max_len),
            },
        };
        self.slots[mode.index()] = source;
    }
}
