//! FFT and spectral multiply benchmarks at the two tier sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use echoverb_core::prelude::*;

fn bench_forward_inverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("fft_roundtrip");
    for n in [128usize, 2048] {
        let fft = Fft::new(n);
        let mut re: Vec<f32> = (0..n).map(|i| (i as f32 * 0.01).sin()).collect();
        let mut im = vec![0.0; n];
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                fft.forward(black_box(&mut re), black_box(&mut im));
                fft.inverse(black_box(&mut re), black_box(&mut im));
            })
        });
    }
    group.finish();
}

fn bench_packed_block(c: &mut Criterion) {
    // one late-tier block: pack, transform, split, 2x multiply, merge, inverse
    let n = 2048;
    let fft = Fft::new(n);
    let left: Vec<f32> = (0..n / 2).map(|i| (i as f32 * 0.03).sin()).collect();
    let right: Vec<f32> = (0..n / 2).map(|i| (i as f32 * 0.05).cos()).collect();
    let mut hl = HalfSpectrum::new(n);
    let mut hr = HalfSpectrum::new(n);
    let mut re = vec![0.0; n];
    let mut im = vec![0.0; n];
    fft.forward_real_pair(&left, &right, &mut re, &mut im);
    split_pair(&re, &im, &mut hl, &mut hr);

    let mut xl = HalfSpectrum::new(n);
    let mut xr = HalfSpectrum::new(n);
    c.bench_function("packed_block_2048", |b| {
        b.iter(|| {
            fft.forward_real_pair(&left, &right, &mut re, &mut im);
            split_pair(&re, &im, &mut xl, &mut xr);
            mul_in_place(&mut xl, &hl);
            mul_in_place(&mut xr, &hr);
            merge_pair(&xl, &xr, &mut re, &mut im);
            fft.inverse(black_box(&mut re), black_box(&mut im));
        })
    });
}

criterion_group!(benches, bench_forward_inverse, bench_packed_block);
criterion_main!(benches);
