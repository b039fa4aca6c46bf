//! One 48-sample audio block through the full reverb, against its
//! real-time budget of 1 ms at 48 kHz.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use echoverb_engine::bank::generate;
use echoverb_engine::config::{EngineConfig, AUDIO_BLOCK_SIZE};
use echoverb_engine::{split, ConvolutionReverb, IrMode, IrSource, StereoProcessor};

fn input_block() -> (Vec<f32>, Vec<f32>) {
    let l = (0..AUDIO_BLOCK_SIZE).map(|i| (i as f32 * 0.05).sin()).collect();
    let r = (0..AUDIO_BLOCK_SIZE).map(|i| (i as f32 * 0.07).cos()).collect();
    (l, r)
}

fn bench_engine_block(c: &mut Criterion) {
    let cfg = EngineConfig::default();
    let mut rv = ConvolutionReverb::new(cfg);
    if let IrSource::Stereo { left, right } = generate(IrMode::FullBridge, cfg.bank_ir_len()) {
        rv.load_stereo_ir(&left, &right);
    }
    rv.set_dry_wet(0.5);

    let (in_l, in_r) = input_block();
    let (mut out_l, mut out_r) = (vec![0.0; AUDIO_BLOCK_SIZE], vec![0.0; AUDIO_BLOCK_SIZE]);
    c.bench_function("engine_block_48", |b| {
        b.iter(|| {
            rv.process_block(black_box(&in_l), black_box(&in_r), &mut out_l, &mut out_r);
        })
    });
}

fn bench_processor_block(c: &mut Criterion) {
    let cfg = EngineConfig::default();
    let Ok((mut ctl, mut proc_)) = split(cfg) else { return };
    let _ = ctl.request_ir_reload(generate(IrMode::LongDecay, cfg.bank_ir_len()));

    let (in_l, in_r) = input_block();
    let (mut out_l, mut out_r) = (vec![0.0; AUDIO_BLOCK_SIZE], vec![0.0; AUDIO_BLOCK_SIZE]);
    c.bench_function("processor_block_48", |b| {
        b.iter(|| {
            proc_.process_block(black_box(&in_l), black_box(&in_r), &mut out_l, &mut out_r);
        })
    });
}

criterion_group!(benches, bench_engine_block, bench_processor_block);
criterion_main!(benches);
