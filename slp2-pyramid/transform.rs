use std::collections::BTreeMap;
use std::sync::Arc;

use log::{log, Level};
use rayon::prelude::*;
use slp2_core::{
    AnchorGrid, Complex64, FeatureLevel, FeaturePyramid, Image, PyramidConfig, SampleLocationSet, Slp2Error,
    Slp2Result, SUBBAND_ORIENTATIONS,
};

use crate::pyramid::ImagePyramid;
use crate::types::{SubbandLevel, TransformAux};
use crate::wavelet::{Decomposition, WaveletTransform};

/// Drives the wavelet adapter and samples its coefficients on the log-polar grid
#[derive(Clone)]
pub struct TransformEngine {
    config: PyramidConfig,
    anchor_stride: usize,
    adapter: Arc<dyn WaveletTransform>,
}

impl std::fmt::Debug for TransformEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformEngine")
            .field("config", &self.config)
            .field("anchor_stride", &self.anchor_stride)
            .field("adapter", &self.adapter.name())
            .finish()
    }
}

impl TransformEngine {
    pub fn new(config: PyramidConfig, anchor_stride: usize, adapter: Arc<dyn WaveletTransform>) -> Slp2Result<Self> {
        config.validate()?;
        if anchor_stride == 0 {
            return Err(Slp2Error::parameter("anchor_stride", "must be at least 1"));
        }
        Ok(Self { config, anchor_stride, adapter })
    }

    pub fn config(&self) -> &PyramidConfig {
        &self.config
    }

    pub fn anchor_stride(&self) -> usize {
        self.anchor_stride
    }

    pub fn adapter_name(&self) -> &str {
        self.adapter.name()
    }

    fn log_level(&self) -> Level {
        if self.config.verbose {
            Level::Info
        } else {
            Level::Debug
        }
    }

    /// Sample the wavelet coefficients of `image` at every anchor and offset
    pub fn transform(&self, image: &Image, locs: &SampleLocationSet) -> Slp2Result<(FeaturePyramid, TransformAux)> {
        let grid = AnchorGrid::for_image(image.width(), image.height(), self.anchor_stride)?;
        self.transform_in_frame(image, locs, grid, 1.0, image.dimensions())
    }

    /// Transform an image that is the reference frame scaled down by `frame_scale`.
    ///
    /// Anchors stay on `grid` in reference coordinates; offsets are applied in
    /// the scaled image so each level keeps its own log-polar geometry.
    pub(crate) fn transform_in_frame(
        &self,
        image: &Image,
        locs: &SampleLocationSet,
        grid: AnchorGrid,
        frame_scale: f64,
        reference_size: (usize, usize),
    ) -> Slp2Result<(FeaturePyramid, TransformAux)> {
        locs.check_compatible(&self.config)?;
        ImagePyramid::check_supports_levels(image.width(), image.height(), self.config.nlevels)?;

        let Decomposition { subbands, lowpass } = self.adapter.forward(image, self.config.nlevels)?;
        self.check_decomposition(&subbands)?;

        log!(
            self.log_level(),
            "{}: {}x{} image, {} levels, {}x{} anchors, {} offsets",
            self.adapter.name(),
            image.width(),
            image.height(),
            locs.levels().len(),
            grid.rows,
            grid.cols,
            locs.offsets_per_level()
        );

        let sampled: Vec<FeatureLevel> = locs
            .levels()
            .par_iter()
            .map(|lg| {
                let subband = &subbands[lg.level];
                let per_anchor = lg.offsets.len() * SUBBAND_ORIENTATIONS;
                let mut data = vec![Complex64::new(0.0, 0.0); grid.len() * per_anchor];
                data.par_chunks_mut(grid.cols * per_anchor)
                    .enumerate()
                    .for_each(|(row, chunk)| {
                        for col in 0..grid.cols {
                            let (ax, ay) = grid.position(row, col);
                            let (ax, ay) = (ax / frame_scale, ay / frame_scale);
                            let out = &mut chunk[col * per_anchor..(col + 1) * per_anchor];
                            for (oi, o) in lg.offsets.iter().enumerate() {
                                let u = (ax + o.dx) / lg.scale;
                                let v = (ay + o.dy) / lg.scale;
                                for (d, plane) in subband.orientations.iter().enumerate() {
                                    let c = ImagePyramid::bilinear_sample(plane, subband.cols, subband.rows, u, v);
                                    out[oi * SUBBAND_ORIENTATIONS + d] = c * o.weight;
                                }
                            }
                        }
                    });
                log!(self.log_level(), "level {} sampled at scale {}", lg.level, lg.scale);
                FeatureLevel::new(lg.level, lg.scale, grid, lg.offsets.len(), SUBBAND_ORIENTATIONS, data)
            })
            .collect();

        let levels: BTreeMap<usize, FeatureLevel> = sampled.into_iter().map(|l| (l.level, l)).collect();
        let sample_coordinates = locs
            .levels()
            .iter()
            .map(|lg| (lg.level, lg.coefficient_offsets()))
            .collect();

        let features = FeaturePyramid::new(levels, grid, self.config.first_level, reference_size, locs.clone())
            .with_frame_scale(frame_scale);
        Ok((features, TransformAux { subbands, lowpass, sample_coordinates }))
    }

    /// Fail fast on adapters that do not deliver six orientations per level
    fn check_decomposition(&self, subbands: &[SubbandLevel]) -> Slp2Result<()> {
        if subbands.len() != self.config.nlevels {
            return Err(Slp2Error::InvalidConfiguration {
                setting: "decomposition levels",
                value: subbands.len().to_string(),
            });
        }
        for s in subbands {
            if s.orientations.len() != SUBBAND_ORIENTATIONS {
                return Err(Slp2Error::InvalidConfiguration {
                    setting: "orientations",
                    value: s.orientations.len().to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::SamplingGridGenerator;
    use crate::types::LowpassResidual;
    use crate::wavelet::OrientedFilterBank;
    use slp2_core::{ErrorKind, SamplingConfig};

    fn test_image(width: usize, height: usize) -> Image {
        Image::from_fn(width, height, |x, y| {
            let (fx, fy) = (x as f64 / 9.0, y as f64 / 13.0);
            (0.5 + 0.25 * fx.sin() * fy.cos() + 0.25 * ((x * y) % 17) as f64 / 17.0).clamp(0.0, 1.0)
        })
    }

    fn engine(config: PyramidConfig) -> TransformEngine {
        TransformEngine::new(config, 8, Arc::new(OrientedFilterBank::default())).unwrap()
    }

    /// Adapter returning four orientations
    struct FourBand;

    impl WaveletTransform for FourBand {
        fn name(&self) -> &str {
            "four-band"
        }

        fn forward(&self, image: &Image, nlevels: usize) -> Slp2Result<Decomposition> {
            let subbands = (0..nlevels)
                .map(|level| SubbandLevel {
                    level,
                    rows: 2,
                    cols: 2,
                    orientations: vec![vec![Complex64::new(0.0, 0.0); 4]; 4],
                })
                .collect();
            Ok(Decomposition {
                subbands,
                lowpass: LowpassResidual { rows: 1, cols: 1, data: vec![image.get(0, 0)] },
            })
        }
    }

    #[test]
    fn test_partial_range_levels() {
        let cfg = PyramidConfig { nlevels: 4, first_level: 1, full: false, verbose: true };
        let locs = SamplingGridGenerator::init(&cfg, SamplingConfig::Default).unwrap();
        let (features, aux) = engine(cfg).transform(&test_image(96, 80), &locs).unwrap();
        assert_eq!(features.level_indices(), vec![1, 2, 3]);
        assert_eq!(aux.subbands.len(), 4);
        assert_eq!(aux.sample_coordinates.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_full_range_levels() {
        let cfg = PyramidConfig { nlevels: 3, first_level: 2, full: true, verbose: false };
        let locs = SamplingGridGenerator::init(&cfg, SamplingConfig::Extended).unwrap();
        let (features, _) = engine(cfg).transform(&test_image(64, 64), &locs).unwrap();
        assert_eq!(features.level_indices(), vec![0, 1, 2]);
        assert_eq!(features.first_level(), 2);
        let level = features.level(0).unwrap();
        assert_eq!(level.n_offsets, 1 + 16 * 3);
        assert_eq!(level.n_orientations, 6);
        assert_eq!(level.data().len(), 8 * 8 * level.n_offsets * 6);
    }

    #[test]
    fn test_transform_is_deterministic() {
        let cfg = PyramidConfig { nlevels: 3, ..PyramidConfig::default() };
        let locs = SamplingGridGenerator::init(&cfg, SamplingConfig::Normal).unwrap();
        let img = test_image(72, 64);
        let e = engine(cfg);
        let (a, aux_a) = e.transform(&img, &locs).unwrap();
        let (b, aux_b) = e.transform(&img, &locs).unwrap();
        assert_eq!(a, b);
        assert_eq!(aux_a, aux_b);
    }

    #[test]
    fn test_centre_sample_matches_coefficient() {
        let cfg = PyramidConfig { nlevels: 2, ..PyramidConfig::default() };
        let locs = SamplingGridGenerator::init(&cfg, SamplingConfig::Default).unwrap();
        let img = test_image(64, 64);
        // Stride 4 puts anchor (1, 1) at image (5.5, 5.5) = level 0 coefficient (2.75, 2.75)
        let e = TransformEngine::new(cfg, 4, Arc::new(OrientedFilterBank::default())).unwrap();
        let (features, aux) = e.transform(&img, &locs).unwrap();
        let sb = &aux.subbands[0];
        let expected = ImagePyramid::bilinear_sample(&sb.orientations[3], sb.cols, sb.rows, 2.75, 2.75);
        let got = features.level(0).unwrap().value(1, 1, 0, 3);
        assert!((got - expected).norm() < 1e-12);
    }

    #[test]
    fn test_grid_reuse_across_images() {
        let cfg = PyramidConfig { nlevels: 3, ..PyramidConfig::default() };
        let locs = SamplingGridGenerator::init(&cfg, SamplingConfig::Normal).unwrap();
        let e = engine(cfg);
        let base = test_image(64, 64);
        let (_, aux_a) = e.transform(&base, &locs).unwrap();
        let inverted = Image::from_fn(64, 64, |x, y| 1.0 - base.get(x, y));
        let (_, aux_b) = e.transform(&inverted, &locs).unwrap();
        assert_eq!(aux_a.sample_coordinates, aux_b.sample_coordinates);
    }

    #[test]
    fn test_image_too_small() {
        let cfg = PyramidConfig { nlevels: 4, ..PyramidConfig::default() };
        let locs = SamplingGridGenerator::init(&cfg, SamplingConfig::Default).unwrap();
        let err = engine(cfg).transform(&test_image(48, 200), &locs).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DimensionError);
    }

    #[test]
    fn test_grid_from_other_config_rejected() {
        let cfg = PyramidConfig { nlevels: 3, ..PyramidConfig::default() };
        let other = PyramidConfig { nlevels: 2, ..cfg };
        let locs = SamplingGridGenerator::init(&other, SamplingConfig::Default).unwrap();
        let err = engine(cfg).transform(&test_image(64, 64), &locs).unwrap_err();
        assert!(matches!(err, Slp2Error::GridMismatch { .. }));
        assert_eq!(err.kind(), ErrorKind::DimensionError);
    }

    #[test]
    fn test_unsupported_orientation_count() {
        let cfg = PyramidConfig { nlevels: 2, ..PyramidConfig::default() };
        let locs = SamplingGridGenerator::init(&cfg, SamplingConfig::Default).unwrap();
        let e = TransformEngine::new(cfg, 8, Arc::new(FourBand)).unwrap();
        let err = e.transform(&test_image(64, 64), &locs).unwrap_err();
        assert!(matches!(err, Slp2Error::InvalidConfiguration { setting: "orientations", .. }));
    }

    #[test]
    fn test_zero_stride_rejected() {
        let err = TransformEngine::new(PyramidConfig::default(), 0, Arc::new(OrientedFilterBank::default()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }
}
