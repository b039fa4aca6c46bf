//! Error types of the engine.

use thiserror::Error;

/// Construction-time configuration problems.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("sample rate must be finite and positive, got {0}")]
    SampleRate(f32),
    #[error("sample rate {rate} Hz is above the supported maximum of {max} Hz")]
    SampleRateTooHigh { rate: f32, max: f32 },
    #[error("{tier} block size must be a power of two >= 2, got {size}")]
    BlockSize { tier: &'static str, size: usize },
    #[error("late block ({late}) must be at least twice the early block ({early})")]
    TierOrder { early: usize, late: usize },
    #[error("maximum predelay must be finite and non-negative, got {0} ms")]
    Predelay(f32),
    #[error("IR capacity must be at least one sample")]
    ZeroIrCapacity,
}

/// Reasons an IR load or publication is refused. The previously loaded IR
/// stays active in every case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IrError {
    #[error("impulse response is empty")]
    Empty,
    #[error("impulse response has {len} samples, capacity is {max}")]
    TooLong { len: usize, max: usize },
    #[error("stereo impulse response channels differ in length ({left} vs {right})")]
    LengthMismatch { left: usize, right: usize },
    #[error("impulse response sample {index} is not finite")]
    NonFinite { index: usize },
    #[error("audio side has not consumed earlier spectra yet")]
    PublishBusy,
}
