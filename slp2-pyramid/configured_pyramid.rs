use std::sync::Arc;

use nalgebra::Matrix3;
use slp2_core::{
    FeaturePyramid, Image, Keypoint, KeypointMethod, SampleLocationSet, SamplingConfig, ScoredGrid, Slp2Result,
};

use crate::config::Slp2Config;
use crate::interleaved::InterleavedPyramid;
use crate::keypoints::KeypointDetector;
use crate::pyramid::ImagePyramid;
use crate::sampling::SamplingGridGenerator;
use crate::transform::TransformEngine;
use crate::types::{ScaleLevel, TransformAux};
use crate::warp::WarpResampler;
use crate::wavelet::{OrientedFilterBank, WaveletTransform};

/// A pyramid transform that has been configured with a specific `Slp2Config`.
///
/// Holds configuration only. Sample locations are returned by [`init`](Self::init)
/// and passed back into every call, so one object serves any number of
/// images concurrently.
#[derive(Debug, Clone)]
pub struct Slp2Pyramid {
    config: Slp2Config,
    engine: TransformEngine,
}

impl Slp2Pyramid {
    /// Validate `config` and use the built-in filter bank
    pub fn new(config: Slp2Config) -> Slp2Result<Self> {
        Self::with_adapter(config, Arc::new(OrientedFilterBank::default()))
    }

    pub fn with_adapter(config: Slp2Config, adapter: Arc<dyn WaveletTransform>) -> Slp2Result<Self> {
        config.validate()?;
        let engine = TransformEngine::new(config.pyramid, config.anchor_stride, adapter)?;
        Ok(Self { config, engine })
    }

    pub fn config(&self) -> &Slp2Config {
        &self.config
    }

    pub fn engine(&self) -> &TransformEngine {
        &self.engine
    }

    pub fn adapter_name(&self) -> &str {
        self.engine.adapter_name()
    }

    /// Sample locations for `sampling`
    pub fn init(&self, sampling: SamplingConfig) -> Slp2Result<SampleLocationSet> {
        SamplingGridGenerator::init(&self.config.pyramid, sampling)
    }

    /// Sample locations for a configuration name such as `"normal"`
    pub fn init_named(&self, name: &str) -> Slp2Result<SampleLocationSet> {
        SamplingGridGenerator::init_named(&self.config.pyramid, name)
    }

    /// Sample locations for the configured sampling density
    pub fn init_default(&self) -> Slp2Result<SampleLocationSet> {
        self.init(self.config.sampling)
    }

    pub fn transform(&self, image: &Image, locs: &SampleLocationSet) -> Slp2Result<(FeaturePyramid, TransformAux)> {
        self.engine.transform(image, locs)
    }

    /// Half-octave interleaved pyramid of `image`
    pub fn interleaved(&self, image: &Image, locs: &SampleLocationSet) -> Slp2Result<InterleavedPyramid> {
        InterleavedPyramid::build(&self.engine, image, locs)
    }

    pub fn keypoints<G>(&self, data: &G, method: KeypointMethod, edge_suppression: f64) -> Slp2Result<Vec<Keypoint>>
    where
        G: ScoredGrid + ?Sized,
    {
        KeypointDetector::detect(data, method, edge_suppression)
    }

    /// Keypoints with the configured method and edge suppression
    pub fn configured_keypoints<G>(&self, data: &G) -> Slp2Result<Vec<Keypoint>>
    where
        G: ScoredGrid + ?Sized,
    {
        KeypointDetector::detect(data, self.config.method, self.config.edge_suppression)
    }

    /// `features` (from `image`) re-expressed under the affine map `matrix`
    pub fn global_warp(
        &self,
        image: &Image,
        features: &FeaturePyramid,
        matrix: &Matrix3<f64>,
        resample: bool,
    ) -> Slp2Result<FeaturePyramid> {
        WarpResampler::global_warp(&self.engine, image, features, matrix, resample)
    }

    /// Sub-band geometry of every level for an image of the given size
    pub fn scale_levels(&self, width: usize, height: usize) -> Vec<ScaleLevel> {
        ImagePyramid::generate_scale_levels(width, height, self.config.pyramid.nlevels)
    }

    pub fn config_summary(&self) -> String {
        self.config.summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slp2_core::ErrorKind;

    fn textured(width: usize, height: usize) -> Image {
        Image::from_fn(width, height, |x, y| {
            let (fx, fy) = (x as f64, y as f64);
            let blob = (-((fx - 40.0).powi(2) + (fy - 30.0).powi(2)) / 50.0).exp();
            0.5 + 0.25 * (fx * 0.3).sin() * (fy * 0.2).cos() + 0.25 * blob
        })
    }

    fn small(nlevels: usize) -> Slp2Pyramid {
        crate::builder::PyramidBuilder::new().levels(nlevels).build().unwrap()
    }

    #[test]
    fn test_pipeline_objects_are_value_like() {
        let pyr = small(3);
        let locs = pyr.init_default().unwrap();
        let img = textured(96, 80);
        let (a, _) = pyr.transform(&img, &locs).unwrap();
        let (b, _) = pyr.transform(&img, &locs).unwrap();
        assert_eq!(a, b);
        let ka = pyr.configured_keypoints(&a).unwrap();
        let kb = pyr.keypoints(&b, KeypointMethod::Gale, 0.0).unwrap();
        assert_eq!(ka, kb);
    }

    #[test]
    fn test_init_named_errors() {
        let pyr = Slp2Pyramid::new(Slp2Config::new()).unwrap();
        assert_eq!(pyr.init_named("bogus").unwrap_err().kind(), ErrorKind::InvalidConfiguration);
        assert!(pyr.init_named("extended").is_ok());
    }

    #[test]
    fn test_scale_levels() {
        let pyr = Slp2Pyramid::new(Slp2Config::new()).unwrap();
        let levels = pyr.scale_levels(512, 200);
        assert_eq!(levels.len(), 4);
        assert_eq!((levels[3].width, levels[3].height), (32, 13));
    }

    #[test]
    fn test_global_warp_identity() {
        let pyr = small(2);
        let locs = pyr.init(SamplingConfig::Normal).unwrap();
        let img = textured(64, 64);
        let (features, _) = pyr.transform(&img, &locs).unwrap();
        let warped = pyr.global_warp(&img, &features, &Matrix3::identity(), false).unwrap();
        assert_eq!(warped, features);
    }
}
