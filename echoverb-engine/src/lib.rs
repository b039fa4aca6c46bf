//! Echoverb Engine: dual-tier partitioned convolution reverb for a stereo pedal.
//!
//! Crate layout:
//! - [`config`]    : compile-time defaults and `EngineConfig`
//! - [`error`]     : `ConfigError`, `IrError`
//! - [`params`]    : parameter ranges, `ReverbParameters`, lock-free `SharedParams`
//! - [`spectrum`]  : IR storage, tier spectra and the spectrum builder
//! - [`predelay`]  : predelay ring and fixed alignment delay
//! - [`partition`] : per-tier block convolution and the two-tier convolver
//! - [`post`]      : low-cut/high-cut tone stage
//! - [`stereo`]    : mid/side width and stereo-input detection
//! - [`reverb`]    : per-tick chain (`ReverbCore`) and single-owner `ConvolutionReverb`
//! - [`control`]   : controller/processor split for separate control and audio threads
//! - [`graph`]     : `StereoProcessor` trait and the `Pedal` wrapper (bypass, status)
//! - [`bank`]      : IR modes and generated placeholder IRs
//!
//! The engine avoids heap allocations in the audio thread: every buffer is
//! sized from the `EngineConfig` at construction, and new spectra arrive
//! fully built from the control side.

pub mod bank;
pub mod config;
pub mod control;
pub mod error;
pub mod graph;
pub mod params;
pub mod partition;
pub mod post;
pub mod predelay;
pub mod reverb;
pub mod spectrum;
pub mod stereo;


// Re-export some commonly used items to make downstream imports ergonomic.
pub use bank::{IrBank, IrMode};
pub use config::{EngineConfig, PseudoStereo};
pub use control::{split, IrSource, ReverbController, ReverbProcessor};
pub use error::{ConfigError, IrError};
pub use graph::{Pedal, PedalStatus, StereoProcessor};
pub use params::{ReverbParameters, SharedParams};
pub use reverb::ConvolutionReverb;
