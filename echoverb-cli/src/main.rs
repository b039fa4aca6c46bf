//! Echoverb CLI: real-time player for the convolution reverb pedal engine.
//!
//! A synthetic plucked excitation runs through `Pedal<ReverbProcessor>` inside
//! the cpal output callback; the main thread acts as the pedal's control loop
//! (parameter snapshot, IR mode cycling, freeze, meter logging).

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, ValueEnum};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{error, info, warn};
use portable_atomic::{AtomicF32, Ordering};

use echoverb_engine::graph::INTERLEAVE_CHUNK;
use echoverb_engine::{
    split, EngineConfig, IrBank, IrMode, Pedal, PseudoStereo, ReverbParameters, ReverbProcessor,
};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ModeArg {
    FullBridge,
    ShortEcho,
    LongDecay,
}

impl From<ModeArg> for IrMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::FullBridge => IrMode::FullBridge,
            ModeArg::ShortEcho => IrMode::ShortEcho,
            ModeArg::LongDecay => IrMode::LongDecay,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "echoverb", about = "Play a plucked excitation through the Echoverb convolution reverb")]
struct Args {
    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,
    /// Output device name (default device otherwise)
    #[arg(long)]
    device: Option<String>,
    #[arg(long)]
    sample_rate: Option<u32>,
    #[arg(long)]
    channels: Option<u16>,
    /// Stop after this many seconds
    #[arg(long)]
    duration: Option<u64>,

    /// IR bank slot to start with
    #[arg(long, value_enum, default_value = "full-bridge")]
    ir_mode: ModeArg,
    /// Cycle to the next IR mode every N seconds
    #[arg(long)]
    cycle_every: Option<u64>,
    /// Derive the right IR channel from mono IRs with this seed
    #[arg(long)]
    decorrelate: Option<u64>,

    #[arg(long, default_value_t = 0.5)]
    dry_wet: f32,
    #[arg(long, default_value_t = 0.0)]
    predelay_ms: f32,
    #[arg(long, default_value_t = 1.0)]
    ir_length: f32,
    #[arg(long, default_value_t = 100.0)]
    low_cut: f32,
    #[arg(long, default_value_t = 10_000.0)]
    high_cut: f32,
    #[arg(long, default_value_t = 1.0)]
    width: f32,
    #[arg(long, default_value_t = 1.0)]
    output_level: f32,
    /// Engage freeze after this many seconds
    #[arg(long)]
    freeze_after: Option<u64>,

    /// Plucks per second
    #[arg(long, default_value_t = 1.5)]
    pluck_rate: f32,
    /// Feed different noise to left and right
    #[arg(long)]
    stereo_input: bool,
    /// Final gain before the device
    #[arg(long, default_value_t = 0.5)]
    gain: f32,
}

impl Args {
    fn parameters(&self) -> ReverbParameters {
        ReverbParameters {
            dry_wet: self.dry_wet,
            predelay_ms: self.predelay_ms,
            ir_length_factor: self.ir_length,
            low_cut_hz: self.low_cut,
            high_cut_hz: self.high_cut,
            stereo_width: self.width,
            output_level: self.output_level,
            freeze: false,
        }
    }
}

// ----------------------------- Excitation -----------------------------

/// Decaying noise bursts at a fixed rate, like a muted string pick.
struct Exciter {
    seed_l: u32,
    seed_r: u32,
    env: f32,
    decay: f32,
    period: usize,
    count: usize,
    stereo: bool,
}

impl Exciter {
    fn new(sr: f32, rate_hz: f32, stereo: bool) -> Self {
        Self {
            seed_l: 0x1234_5678,
            seed_r: 0x9e37_79b9,
            env: 0.0,
            // ~30 ms to -60 dB
            decay: (-6.9 / (0.03 * sr)).exp(),
            period: (sr / rate_hz.max(0.05)) as usize,
            count: 0,
            stereo,
        }
    }

    #[inline]
    fn lcg(seed: &mut u32) -> f32 {
        *seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (*seed >> 8) as f32 / (1u32 << 23) as f32 - 1.0
    }

    #[inline]
    fn next(&mut self) -> (f32, f32) {
        if self.count == 0 {
            self.env = 0.8;
        }
        self.count = (self.count + 1) % self.period.max(1);
        let l = Self::lcg(&mut self.seed_l) * self.env;
        let r = if self.stereo { Self::lcg(&mut self.seed_r) * self.env } else { l };
        self.env *= self.decay;
        (l, r)
    }
}

// ----------------------------- Device setup -----------------------------

fn list_output_devices() -> Result<()> {
    let host = cpal::default_host();
    println!("Available output devices:");
    for dev in host.output_devices()? {
        println!("- {}", dev.name()?);
    }
    Ok(())
}

fn pick_device(args: &Args) -> Result<cpal::Device> {
    let host = cpal::default_host();
    if let Some(name) = &args.device {
        for d in host.output_devices()? {
            if d.name()? == *name {
                return Ok(d);
            }
        }
        bail!("requested device not found: {name}");
    }
    host.default_output_device().ok_or_else(|| anyhow!("no default output device"))
}

fn choose_config(
    device: &cpal::Device,
    req_sr: Option<u32>,
    req_ch: Option<u16>,
) -> Result<cpal::SupportedStreamConfig> {
    if req_sr.is_none() && req_ch.is_none() {
        return Ok(device.default_output_config()?);
    }

    let mut best: Option<(u64, cpal::SupportedStreamConfigRange)> = None;
    for range in device.supported_output_configs()? {
        let ch = range.channels();
        let sr_min = range.min_sample_rate().0;
        let sr_max = range.max_sample_rate().0;

        let ch_pen = req_ch.map_or(0, |c| u64::from(ch.abs_diff(c)));
        let sr_pen = req_sr.map_or(0, |sr| {
            if (sr_min..=sr_max).contains(&sr) { 0 } else { u64::from(sr_min.abs_diff(sr).min(sr_max.abs_diff(sr))) }
        });

        let score = sr_pen.saturating_mul(1000) + ch_pen;
        if best.as_ref().map_or(true, |(s, _)| score < *s) {
            best = Some((score, range));
        }
    }

    let (_, range) = best.ok_or_else(|| anyhow!("no supported output configs"))?;
    let pick_sr = match req_sr {
        Some(sr) => cpal::SampleRate(sr.clamp(range.min_sample_rate().0, range.max_sample_rate().0)),
        None => range.max_sample_rate(),
    };
    Ok(range.with_sample_rate(pick_sr))
}

fn build_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    mut pedal: Pedal<ReverbProcessor>,
    mut exciter: Exciter,
    gain: f32,
    peak: Arc<AtomicF32>,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::FromSample<f32> + cpal::SizedSample + Send + 'static,
{
    let channels = usize::from(cfg.channels.max(1));
    let mut in_l = [0.0_f32; INTERLEAVE_CHUNK];
    let mut in_r = [0.0_f32; INTERLEAVE_CHUNK];
    let mut out_l = [0.0_f32; INTERLEAVE_CHUNK];
    let mut out_r = [0.0_f32; INTERLEAVE_CHUNK];

    let stream = device.build_output_stream(
        cfg,
        move |output: &mut [T], _| {
            for chunk in output.chunks_mut(channels * INTERLEAVE_CHUNK) {
                let frames = chunk.len() / channels;
                for f in 0..frames {
                    (in_l[f], in_r[f]) = exciter.next();
                }
                pedal.process_block(&in_l[..frames], &in_r[..frames], &mut out_l[..frames], &mut out_r[..frames]);

                let mut block_peak = 0.0_f32;
                for (f, frame) in chunk.chunks_mut(channels).enumerate() {
                    let l = (out_l[f] * gain).clamp(-1.0, 1.0);
                    let r = (out_r[f] * gain).clamp(-1.0, 1.0);
                    block_peak = block_peak.max(l.abs()).max(r.abs());
                    for (c, s) in frame.iter_mut().enumerate() {
                        *s = T::from_sample(match c {
                            0 => l,
                            1 => r,
                            _ => 0.0,
                        });
                    }
                }
                peak.fetch_max(block_peak, Ordering::Relaxed);
            }
        },
        |e: cpal::StreamError| error!("stream error: {e}"),
        None,
    )?;
    Ok(stream)
}

// ----------------------------- Main / control loop -----------------------------

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.list_devices {
        return list_output_devices();
    }

    let device = pick_device(&args)?;
    let sup_cfg = choose_config(&device, args.sample_rate, args.channels)?;
    let sample_format = sup_cfg.sample_format();
    let mut cfg = sup_cfg.config();
    if let Some(sr) = args.sample_rate {
        cfg.sample_rate = cpal::SampleRate(sr);
    }
    if let Some(ch) = args.channels {
        cfg.channels = ch;
    }
    let sr = cfg.sample_rate.0 as f32;

    let pseudo = args
        .decorrelate
        .map_or(PseudoStereo::InputWidth, |seed| PseudoStereo::DecorrelatedIr { seed });
    let engine_cfg = EngineConfig::default().with_sample_rate(sr).with_pseudo_stereo(pseudo);
    let (mut ctl, processor) = split(engine_cfg).context("invalid engine configuration")?;

    let mut bank = IrBank::generated(engine_cfg.bank_ir_len());
    ctl.apply_parameters(&args.parameters());
    ctl.request_ir_reload(bank.select(args.ir_mode.into()).clone())
        .context("loading initial IR")?;

    let pedal = Pedal::new(processor);
    let status = pedal.status();
    let peak = Arc::new(AtomicF32::new(0.0));
    let exciter = Exciter::new(sr, args.pluck_rate, args.stereo_input);

    info!("device: {}", device.name()?);
    info!("stream: {cfg:?} ({sample_format:?})");
    info!(
        "IR: {} | latency {} samples ({:.1} ms)",
        bank.mode(),
        ctl.latency(),
        ctl.latency() as f32 * 1000.0 / sr
    );

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &cfg, pedal, exciter, args.gain, Arc::clone(&peak))?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &cfg, pedal, exciter, args.gain, Arc::clone(&peak))?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &cfg, pedal, exciter, args.gain, Arc::clone(&peak))?,
        other => bail!("unsupported device sample format: {other:?}"),
    };
    stream.play().context("starting stream")?;

    let start = Instant::now();
    let mut last_meter = start;
    let mut last_cycle = start;
    loop {
        thread::sleep(Duration::from_millis(100));
        ctl.poll();
        let elapsed = start.elapsed();

        if let Some(after) = args.freeze_after {
            if !ctl.parameters().freeze && elapsed >= Duration::from_secs(after) {
                ctl.set_freeze(true);
                info!("freeze engaged");
            }
        }

        if let Some(every) = args.cycle_every {
            if last_cycle.elapsed() >= Duration::from_secs(every.max(1)) {
                last_cycle = Instant::now();
                let source = bank.cycle().clone();
                if let Err(e) = ctl.request_ir_reload(source) {
                    warn!("IR mode change to {} failed: {e}", bank.mode());
                }
            }
        }

        if last_meter.elapsed() >= Duration::from_secs(1) {
            last_meter = Instant::now();
            info!(
                "peak {:.3} | IR {} | stereo in {} | freeze {} | bypass {}",
                peak.swap(0.0, Ordering::Relaxed),
                if status.ir_loaded() { "on" } else { "off" },
                status.stereo_input(),
                status.freeze(),
                status.bypass()
            );
        }

        if args.duration.is_some_and(|d| elapsed >= Duration::from_secs(d)) {
            break;
        }
    }
    drop(stream);
    Ok(())
}
