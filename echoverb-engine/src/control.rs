//! Control/audio split: a controller for the slow loop, a processor for the
//! audio callback.
//!
//! Design
//! - Scalar parameters travel through [`SharedParams`] atomics (last writer wins)
//! - Spectra are built on the control side into a boxed [`SpectrumSet`] and
//!   handed over through an `rtrb` SPSC queue; the processor swaps the newest
//!   one in at the start of a block and sends the retired box back through a
//!   second queue, so the audio thread never allocates or frees
//! - The controller keeps returned boxes as build targets for later reloads
//!
//! ```text
//!   control loop                               audio callback
//!   ReverbController ──(publish: Box<Set>)──▶  ReverbProcessor
//!                    ◀──(retired: Box<Set>)──
//!                    ──(SharedParams atomics)─▶
//! ```

use std::mem;
use std::sync::Arc;

use log::{debug, info, warn};
use portable_atomic::{AtomicBool, Ordering};
use rtrb::{Consumer, Producer, PushError, RingBuffer};

use crate::config::{EngineConfig, PUBLISH_SLOTS};
use crate::error::{ConfigError, IrError};
use crate::graph::StereoProcessor;
use crate::params::{ReverbParameters, SharedParams, IR_LENGTH, STEREO_WIDTH};
use crate::reverb::ReverbCore;
use crate::spectrum::{ImpulseResponse, SpectrumBuilder, SpectrumSet};

/// A decoded, normalized IR handed over by the file/USB loader.
#[derive(Clone, Debug, PartialEq)]
pub enum IrSource {
    Mono(Vec<f32>),
    Stereo { left: Vec<f32>, right: Vec<f32> },
}

/// State both sides can see.
#[derive(Debug, Default)]
struct Shared {
    params: SharedParams,
    reset: AtomicBool,
}

/// Build a connected controller/processor pair for `cfg`.
pub fn split(cfg: EngineConfig) -> Result<(ReverbController, ReverbProcessor), ConfigError> {
    cfg.validate()?;
    let shared = Arc::new(Shared::default());
    let (publish, incoming) = RingBuffer::<Box<SpectrumSet>>::new(PUBLISH_SLOTS);
    // one more than can ever be in flight towards the processor
    let (retired, recycled) = RingBuffer::<Box<SpectrumSet>>::new(PUBLISH_SLOTS + 1);

    let snapshot = shared.params.snapshot();
    let processor = ReverbProcessor {
        core: ReverbCore::new(&cfg, &snapshot),
        shared: Arc::clone(&shared),
        current: Box::new(SpectrumSet::empty(&cfg)),
        incoming,
        retired,
        snapshot,
    };
    let controller = ReverbController {
        builder: SpectrumBuilder::new(&cfg),
        cfg,
        shared,
        ir: None,
        publish,
        recycled,
        spare: Vec::with_capacity(PUBLISH_SLOTS + 2),
        built: None,
        pending: false,
    };
    Ok((controller, processor))
}

// ----------------------------------- Controller -----------------------------------

/// Control-loop side: parameter setters, IR reloads, spectrum publication.
pub struct ReverbController {
    cfg: EngineConfig,
    shared: Arc<Shared>,
    ir: Option<ImpulseResponse>,
    builder: SpectrumBuilder,
    publish: Producer<Box<SpectrumSet>>,
    recycled: Consumer<Box<SpectrumSet>>,
    spare: Vec<Box<SpectrumSet>>,
    /// `(length factor, width)` the last published set was built with.
    built: Option<(f32, f32)>,
    /// A rebuild could not be published yet; retried by `poll`.
    pending: bool,
}

impl ReverbController {
    #[inline] pub fn config(&self) -> &EngineConfig { &self.cfg }
    #[inline] pub fn parameters(&self) -> ReverbParameters { self.shared.params.snapshot() }
    #[inline] pub fn ir(&self) -> Option<&ImpulseResponse> { self.ir.as_ref() }
    #[inline] pub fn is_ir_loaded(&self) -> bool { self.ir.is_some() }
    #[inline] pub fn has_pending_rebuild(&self) -> bool { self.pending }
    #[inline] pub fn latency(&self) -> usize { self.cfg.latency() }

    // ----- scalar parameters (O(1)) -----

    #[inline] pub fn set_dry_wet(&self, v: f32) { self.shared.params.set_dry_wet(v); }
    #[inline] pub fn set_predelay_ms(&self, v: f32) { self.shared.params.set_predelay_ms(v); }
    #[inline] pub fn set_low_cut(&self, hz: f32) { self.shared.params.set_low_cut_hz(hz); }
    #[inline] pub fn set_high_cut(&self, hz: f32) { self.shared.params.set_high_cut_hz(hz); }
    #[inline] pub fn set_output_level(&self, v: f32) { self.shared.params.set_output_level(v); }
    #[inline] pub fn set_freeze(&self, on: bool) { self.shared.params.set_freeze(on); }

    /// Flip freeze (footswitch press); returns the new state.
    pub fn toggle_freeze(&self) -> bool {
        let on = !self.shared.params.freeze();
        self.shared.params.set_freeze(on);
        on
    }

    // ----- parameters that may rebuild spectra -----

    pub fn set_ir_length(&mut self, factor: f32) {
        self.shared.params.set_ir_length_factor(factor);
        self.refresh();
    }

    pub fn set_stereo_width(&mut self, width: f32) {
        self.shared.params.set_stereo_width(width);
        self.refresh();
    }

    /// Store a whole snapshot; rebuilds at most once.
    pub fn apply_parameters(&mut self, p: &ReverbParameters) {
        self.shared.params.store(p);
        self.refresh();
    }

    pub fn reset_parameters(&mut self) {
        info!("parameters reset to defaults");
        self.apply_parameters(&ReverbParameters::default());
    }

    /// Ask the processor to clear its signal state at its next block.
    pub fn request_reset(&self) {
        self.shared.reset.store(true, Ordering::Release);
    }

    // ----- IR reloads -----

    /// Validate, build and publish a new IR. On error the previously
    /// published IR stays active.
    pub fn request_ir_reload(&mut self, source: IrSource) -> Result<(), IrError> {
        let max = self.cfg.max_ir_len;
        let ir = match &source {
            IrSource::Mono(s) => ImpulseResponse::mono(s, max),
            IrSource::Stereo { left, right } => ImpulseResponse::stereo(left, right, max),
        }
        .inspect_err(|e| warn!("IR rejected: {e}"))?;

        let (factor, width) = self.knobs();
        self.publish_built(&ir, factor, width)?;
        info!(
            "published {} IR, {} samples",
            if ir.is_true_stereo() { "stereo" } else { "mono" },
            ir.len()
        );
        self.ir = Some(ir);
        self.pending = false;
        Ok(())
    }

    pub fn load_ir(&mut self, mono: &[f32]) -> bool {
        self.request_ir_reload(IrSource::Mono(mono.to_vec())).is_ok()
    }

    pub fn load_stereo_ir(&mut self, left: &[f32], right: &[f32]) -> bool {
        self.request_ir_reload(IrSource::Stereo { left: left.to_vec(), right: right.to_vec() }).is_ok()
    }

    /// Collect retired spectra and retry a deferred rebuild. Call from the
    /// control loop.
    pub fn poll(&mut self) {
        self.reclaim();
        if self.pending {
            self.refresh();
        }
    }

    fn knobs(&self) -> (f32, f32) {
        let p = &self.shared.params;
        (IR_LENGTH.clamp(p.ir_length_factor()), STEREO_WIDTH.clamp(p.stereo_width()))
    }

    /// Rebuild if the length factor changed, or the width changed and the
    /// builder derives the right channel from it.
    fn refresh(&mut self) {
        let Some(ir) = self.ir.take() else { return };
        let (factor, width) = self.knobs();
        let stale = match self.built {
            None => true,
            Some((f, w)) => {
                f != factor || (w != width && self.builder.width_rebuilds() && !ir.is_true_stereo())
            }
        };
        if stale || self.pending {
            self.pending = self.publish_built(&ir, factor, width).is_err();
            if self.pending {
                debug!("spectrum rebuild deferred, publish queue full");
            }
        }
        self.ir = Some(ir);
    }

    fn publish_built(&mut self, ir: &ImpulseResponse, factor: f32, width: f32) -> Result<(), IrError> {
        self.reclaim();
        if self.publish.slots() == 0 {
            return Err(IrError::PublishBusy);
        }
        let mut target = self.spare.pop().unwrap_or_else(|| Box::new(SpectrumSet::empty(&self.cfg)));
        self.builder.build(ir, factor, width, &mut target);
        match self.publish.push(target) {
            Ok(()) => {
                self.built = Some((factor, width));
                Ok(())
            }
            Err(PushError::Full(target)) => {
                self.spare.push(target);
                Err(IrError::PublishBusy)
            }
        }
    }

    fn reclaim(&mut self) {
        while let Ok(set) = self.recycled.pop() {
            self.spare.push(set);
        }
    }
}

// ----------------------------------- Processor ------------------------------------

/// Audio-callback side. Owns every buffer it touches; `begin_block` and
/// `process*` never allocate, free, lock or log.
pub struct ReverbProcessor {
    core: ReverbCore,
    shared: Arc<Shared>,
    current: Box<SpectrumSet>,
    incoming: Consumer<Box<SpectrumSet>>,
    retired: Producer<Box<SpectrumSet>>,
    snapshot: ReverbParameters,
}

impl ReverbProcessor {
    /// Swap in the newest published spectra, honour a pending reset and
    /// take this block's parameter snapshot.
    pub fn begin_block(&mut self) {
        // a set is only taken when its predecessor can be handed back
        while self.retired.slots() > 0 {
            let Ok(next) = self.incoming.pop() else { break };
            let old = mem::replace(&mut self.current, next);
            let handed_back = self.retired.push(old);
            debug_assert!(handed_back.is_ok(), "retired queue had a free slot");
        }
        if self.shared.reset.swap(false, Ordering::Acquire) {
            self.core.reset();
        }
        self.snapshot = self.shared.params.snapshot();
        self.core.prepare(&self.snapshot);
    }

    /// One stereo tick with the parameters captured by `begin_block`.
    #[inline]
    pub fn process(&mut self, l: f32, r: f32) -> (f32, f32) {
        self.core.tick(l, r, &self.snapshot, &self.current)
    }

    #[inline] pub fn latency(&self) -> usize { self.core.latency() }
    #[inline] pub fn parameters(&self) -> &ReverbParameters { &self.snapshot }
}

impl StereoProcessor for ReverbProcessor {
    fn process_block(&mut self, in_l: &[f32], in_r: &[f32], out_l: &mut [f32], out_r: &mut [f32]) {
        self.begin_block();
        let frames = in_l.iter().zip(in_r).zip(out_l.iter_mut().zip(out_r.iter_mut()));
        for ((&l, &r), (ol, or)) in frames {
            (*ol, *or) = self.core.tick(l, r, &self.snapshot, &self.current);
        }
    }

    fn reset(&mut self) {
        self.core.reset();
    }

    fn is_ir_loaded(&self) -> bool {
        self.current.loaded
    }

    fn is_frozen(&self) -> bool {
        self.snapshot.freeze
    }
}
