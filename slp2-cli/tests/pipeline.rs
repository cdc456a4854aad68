use nalgebra::Matrix3;
use slp2_cli::{vis, HistogramOptions, KeypointMethod, PyramidConfig, SamplingConfig, Slp2};
use slp2_core::{Image, ScoredGrid};
use slp2_hist::HistogramGenerator;
use slp2_pyramid::{PyramidBuilder, Slp2Config};

fn scene(width: usize, height: usize) -> Image {
    Image::from_fn(width, height, |x, y| {
        let (fx, fy) = (x as f64, y as f64);
        let rings = 0.15 * ((fx * 0.11).sin() + (fy * 0.07).cos());
        let blob = |cx: f64, cy: f64, s: f64| (-((fx - cx).powi(2) + (fy - cy).powi(2)) / s).exp();
        let v = 0.4 + rings + 0.4 * blob(0.3 * width as f64, 0.3 * height as f64, 120.0)
            + 0.3 * blob(0.7 * width as f64, 0.6 * height as f64, 600.0);
        v.clamp(0.0, 1.0)
    })
}

fn reference_config() -> Slp2Config {
    Slp2Config {
        pyramid: PyramidConfig { nlevels: 4, first_level: 0, full: true, verbose: false },
        sampling: SamplingConfig::Normal,
        histogram: HistogramOptions { nbins: 24, full: true, best: true },
        ..Slp2Config::new()
    }
}

#[test]
fn reference_scenario_yields_one_finite_scalar_per_location() {
    let slp2 = Slp2::new(reference_config()).unwrap();
    let img = scene(512, 512);
    let output = slp2.run(&img).unwrap();

    assert_eq!(output.features.level_indices(), vec![0, 1, 2, 3]);
    let grid = output.features.grid();
    let scalars = output.histogram.scalars();
    assert_eq!(output.histogram.len(), 1);
    assert_eq!(scalars.len(), grid.rows * grid.cols);
    assert!(scalars.iter().all(|v| v.is_finite() && *v >= 0.0));
    assert!(scalars.iter().any(|v| *v > 0.0));
}

#[test]
fn identity_warp_with_resampling_reproduces_the_transform() {
    let slp2 = Slp2::new(reference_config()).unwrap();
    let img = scene(256, 256);
    let (features, _) = slp2.transform(&img).unwrap();
    let warped = slp2.global_warp(&img, &features, &Matrix3::identity(), true).unwrap();
    assert!(warped.max_abs_difference(&features).unwrap() < 1e-9);
}

#[test]
fn small_rotation_keeps_interior_energy() {
    let slp2 = Slp2::new(Slp2Config::new()).unwrap();
    let img = scene(256, 256);
    let (features, _) = slp2.transform(&img).unwrap();
    let (c, s) = (0.1f64.cos(), 0.1f64.sin());
    // Rotation about the image centre
    let rot = Matrix3::new(c, -s, 128.0 - 128.0 * c + 128.0 * s, s, c, 128.0 - 128.0 * s - 128.0 * c, 0.0, 0.0, 1.0);
    let resampled = slp2.global_warp(&img, &features, &rot, true).unwrap();
    let analytic = slp2.global_warp(&img, &features, &rot, false).unwrap();
    let energy = |f: &slp2_core::FeaturePyramid| -> f64 {
        let level = f.level(2).unwrap();
        let grid = f.grid();
        (grid.rows / 4..3 * grid.rows / 4)
            .flat_map(|r| (grid.cols / 4..3 * grid.cols / 4).map(move |c| (r, c)))
            .map(|(r, c)| level.mean_magnitude(r, c))
            .sum()
    };
    let (e0, e1, e2) = (energy(&features), energy(&resampled), energy(&analytic));
    assert!((e1 - e0).abs() / e0 < 0.5, "{} vs {}", e1, e0);
    assert!((e2 - e0).abs() / e0 < 0.5, "{} vs {}", e2, e0);
}

#[test]
fn pipeline_is_deterministic() {
    let slp2 = Slp2::new(Slp2Config::extended_preset()).unwrap();
    let img = scene(192, 160);
    let a = slp2.run(&img).unwrap();
    let b = slp2.run(&img).unwrap();
    assert_eq!(a.features, b.features);
    assert_eq!(a.histogram, b.histogram);
    assert_eq!(a.keypoints, b.keypoints);
}

#[test]
fn non_square_image_runs_end_to_end() {
    let slp2 = Slp2::new(reference_config()).unwrap();
    // Top 200 rows of the square reference scene
    let img = scene(512, 512).crop_rows(0, 200).unwrap();
    assert_eq!(img.dimensions(), (512, 200));
    let output = slp2.run(&img).unwrap();
    let grid = output.features.grid();
    assert_eq!((grid.cols, grid.rows), (64, 25));
    assert_eq!(output.histogram.scalars().len(), 64 * 25);
}

#[test]
fn histogram_keypoints_are_strict_maxima() {
    let slp2 = Slp2::new(Slp2Config::new()).unwrap();
    let img = scene(256, 256);
    let (features, _) = slp2.transform(&img).unwrap();
    let hist = HistogramGenerator::histgen_with(&features, 12, false, false).unwrap();
    let kps = slp2.pyramid().keypoints(&hist, KeypointMethod::Gale, 0.0).unwrap();
    let grid = hist.grid();
    for k in &kps {
        let (r, c) = grid.locate(k.x, k.y);
        let (r, c) = (r.round() as usize, c.round() as usize);
        let layer = hist.layers().iter().position(|l| l.level == k.level).unwrap();
        for nl in layer.saturating_sub(1)..=(layer + 1).min(hist.layer_count() - 1) {
            for nr in r.saturating_sub(1)..=(r + 1).min(grid.rows - 1) {
                for nc in c.saturating_sub(1)..=(c + 1).min(grid.cols - 1) {
                    if (nl, nr, nc) != (layer, r, c) {
                        assert!(k.strength > hist.response(nl, nr, nc));
                    }
                }
            }
        }
    }
}

#[test]
fn forshaw_suppression_only_removes_keypoints() {
    let img = scene(256, 256);
    let loose = PyramidBuilder::new().method(KeypointMethod::Forshaw).build().unwrap();
    let locs = loose.init_default().unwrap();
    let (features, _) = loose.transform(&img, &locs).unwrap();
    let all = loose.configured_keypoints(&features).unwrap();
    let strict = loose.keypoints(&features, KeypointMethod::Forshaw, 1.0).unwrap();
    assert!(strict.len() <= all.len());
    assert!(strict.iter().all(|k| all.contains(k)));
}

#[test]
fn visualizations_cover_every_layer() {
    let slp2 = Slp2::new(Slp2Config::histogram_preset()).unwrap();
    let img = scene(128, 128);
    let output = slp2.run(&img).unwrap();
    let grid = output.features.grid();

    let maps = vis::draw_maps(&output.features, 2);
    assert_eq!(maps.dimensions(), ((grid.cols as u32 * 2 + 1) * 4, grid.rows as u32 * 2));

    let hist = vis::histvis(&output.histogram, 3);
    assert_eq!(hist.dimensions(), (grid.cols as u32 * 3 + 1, grid.rows as u32 * 3));

    let overlay = vis::draw_keypoints(&img, &output.keypoints);
    assert_eq!(overlay.dimensions(), (128, 128));
}

#[test]
fn interleaved_pyramid_through_facade() {
    let slp2 = Slp2::new(Slp2Config::new()).unwrap();
    let inter = slp2.interleaved(&scene(256, 256)).unwrap();
    assert_eq!(inter.layer_count(), 8);
    let kps = slp2.keypoints(&inter).unwrap();
    assert!(kps.iter().all(|k| k.level < 8));
}
