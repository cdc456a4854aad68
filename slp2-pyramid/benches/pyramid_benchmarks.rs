use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::Matrix3;
use slp2_core::{Image, KeypointMethod, SamplingConfig};
use slp2_pyramid::{OrientedFilterBank, PyramidBuilder, Slp2Pyramid, WaveletTransform};

/// Benchmark image with blobs, a gradient and fine texture
fn create_benchmark_image(width: usize, height: usize, complexity: &str) -> Image {
    match complexity {
        "simple" => Image::from_fn(width, height, |x, y| {
            let dx = x as f64 - width as f64 / 2.0;
            let dy = y as f64 - height as f64 / 2.0;
            (-(dx * dx + dy * dy) / 200.0).exp()
        }),
        "realistic" => Image::from_fn(width, height, |x, y| {
            let gradient = x as f64 / width as f64 * 0.2;
            let noise = ((x * 31 + y * 17) % 7) as f64 / 70.0;
            let blobs: f64 = (0..20)
                .map(|i| {
                    let cx = ((i * width / 20) % width) as f64;
                    let cy = ((i * 7 * height / 20) % height) as f64;
                    let r2 = (x as f64 - cx).powi(2) + (y as f64 - cy).powi(2);
                    0.5 * (-r2 / (20.0 + 4.0 * i as f64)).exp()
                })
                .sum();
            (0.3 + gradient + noise + blobs).min(1.0)
        }),
        _ => Image::zeros(width, height),
    }
}

fn create_pyramid(sampling: SamplingConfig) -> Slp2Pyramid {
    PyramidBuilder::new().levels(4).sampling(sampling).build().unwrap()
}

/// Benchmark transform over image sizes and sampling densities
fn bench_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform");
    group.sample_size(20);

    for &(width, height) in &[(128, 128), (256, 256), (512, 512)] {
        for sampling in SamplingConfig::ALL {
            let pyr = create_pyramid(sampling);
            let locs = pyr.init_default().unwrap();
            let img = create_benchmark_image(width, height, "realistic");

            group.bench_with_input(
                BenchmarkId::new(format!("{}x{}", width, height), sampling),
                &(pyr, locs, img),
                |b, (pyr, locs, img)| b.iter(|| black_box(pyr.transform(black_box(img), locs).unwrap())),
            );
        }
    }

    group.finish();
}

/// Benchmark individual pipeline stages
fn bench_pipeline_stages(c: &mut Criterion) {
    let pyr = create_pyramid(SamplingConfig::Default);
    let locs = pyr.init_default().unwrap();
    let img = create_benchmark_image(256, 256, "realistic");
    let (features, _) = pyr.transform(&img, &locs).unwrap();

    let mut group = c.benchmark_group("pipeline_stages");

    group.bench_function("init", |b| {
        b.iter(|| black_box(pyr.init(SamplingConfig::Extended).unwrap()))
    });

    group.bench_function("wavelet_forward", |b| {
        let bank = OrientedFilterBank::default();
        b.iter(|| black_box(bank.forward(black_box(&img), 4).unwrap()))
    });

    group.bench_function("keypoints_gale", |b| {
        b.iter(|| black_box(pyr.keypoints(&features, KeypointMethod::Gale, 0.0).unwrap()))
    });

    group.bench_function("keypoints_forshaw", |b| {
        b.iter(|| black_box(pyr.keypoints(&features, KeypointMethod::Forshaw, 10.0).unwrap()))
    });

    group.finish();
}

/// Benchmark analytic versus resampled warps
fn bench_global_warp(c: &mut Criterion) {
    let pyr = create_pyramid(SamplingConfig::Default);
    let locs = pyr.init_default().unwrap();
    let img = create_benchmark_image(256, 256, "simple");
    let (features, _) = pyr.transform(&img, &locs).unwrap();
    let rotation = Matrix3::new(0.95, -0.31, 40.0, 0.31, 0.95, -30.0, 0.0, 0.0, 1.0);

    let mut group = c.benchmark_group("global_warp");
    group.sample_size(20);
    for resample in [false, true] {
        group.bench_with_input(BenchmarkId::new("resample", resample), &resample, |b, &resample| {
            b.iter(|| black_box(pyr.global_warp(&img, &features, &rotation, resample).unwrap()))
        });
    }
    group.finish();
}

/// Benchmark the half-octave interleaved pyramid against a plain transform
fn bench_interleaved(c: &mut Criterion) {
    let pyr = create_pyramid(SamplingConfig::Default);
    let locs = pyr.init_default().unwrap();
    let img = create_benchmark_image(256, 256, "realistic");

    let mut group = c.benchmark_group("interleaved");
    group.sample_size(20);
    group.bench_function("octave_only", |b| b.iter(|| black_box(pyr.transform(&img, &locs).unwrap())));
    group.bench_function("interleaved", |b| b.iter(|| black_box(pyr.interleaved(&img, &locs).unwrap())));
    group.finish();
}

criterion_group!(benches, bench_transform, bench_pipeline_stages, bench_global_warp, bench_interleaved);
criterion_main!(benches);
