use std::path::Path;

use log::info;
use nalgebra::Matrix3;
use slp2_core::{FeaturePyramid, Image, Keypoint, SampleLocationSet, ScoredGrid, Slp2Error};
use slp2_hist::{Histogram, HistogramGenerator};
use slp2_pyramid::{InterleavedPyramid, Slp2Config, Slp2Pyramid, TransformAux};

pub mod vis;

pub use slp2_core::{self, init_thread_pool, HistogramOptions, KeypointMethod, PyramidConfig, SamplingConfig};
pub use slp2_hist;
pub use slp2_pyramid::{self, PyramidBuilder};

#[derive(Debug)]
pub enum CliError {
    Slp2(Slp2Error),
    ThreadPool(rayon::ThreadPoolBuildError),
    Image(image::ImageError),
    Io(std::io::Error),
    Config(String),
    Usage(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Slp2(e) => write!(f, "SLP2 error: {}", e),
            CliError::ThreadPool(e) => write!(f, "Thread pool error: {}", e),
            CliError::Image(e) => write!(f, "Image error: {}", e),
            CliError::Io(e) => write!(f, "I/O error: {}", e),
            CliError::Config(msg) => write!(f, "Config error: {}", msg),
            CliError::Usage(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl From<Slp2Error> for CliError {
    fn from(err: Slp2Error) -> Self {
        CliError::Slp2(err)
    }
}

impl From<rayon::ThreadPoolBuildError> for CliError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        CliError::ThreadPool(err)
    }
}

impl From<image::ImageError> for CliError {
    fn from(err: image::ImageError) -> Self {
        CliError::Image(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err)
    }
}

pub type CliResult<T> = Result<T, CliError>;

/// Everything one `run` produces for an image
#[derive(Debug, Clone)]
pub struct Slp2Output {
    pub features: FeaturePyramid,
    pub aux: TransformAux,
    pub histogram: Histogram,
    pub keypoints: Vec<Keypoint>,
}

/// High-level SLP2 pipeline: sampling grid, transform, histograms and keypoints
#[derive(Debug, Clone)]
pub struct Slp2 {
    pyramid: Slp2Pyramid,
    locations: SampleLocationSet,
}

impl Slp2 {
    /// Validate `config` and build its sample locations once
    pub fn new(config: Slp2Config) -> CliResult<Self> {
        let pyramid = Slp2Pyramid::new(config)?;
        let locations = pyramid.init_default()?;
        Ok(Self { pyramid, locations })
    }

    pub fn config(&self) -> &Slp2Config {
        self.pyramid.config()
    }

    pub fn pyramid(&self) -> &Slp2Pyramid {
        &self.pyramid
    }

    pub fn sample_locations(&self) -> &SampleLocationSet {
        &self.locations
    }

    pub fn transform(&self, img: &Image) -> CliResult<(FeaturePyramid, TransformAux)> {
        Ok(self.pyramid.transform(img, &self.locations)?)
    }

    /// Histograms with the configured options
    pub fn histgen(&self, features: &FeaturePyramid) -> CliResult<Histogram> {
        Ok(HistogramGenerator::histgen(features, self.config().histogram)?)
    }

    /// Keypoints with the configured method on any scored grid
    pub fn keypoints<G: ScoredGrid + ?Sized>(&self, data: &G) -> CliResult<Vec<Keypoint>> {
        Ok(self.pyramid.configured_keypoints(data)?)
    }

    pub fn interleaved(&self, img: &Image) -> CliResult<InterleavedPyramid> {
        Ok(self.pyramid.interleaved(img, &self.locations)?)
    }

    pub fn global_warp(
        &self,
        img: &Image,
        features: &FeaturePyramid,
        matrix: &Matrix3<f64>,
        resample: bool,
    ) -> CliResult<FeaturePyramid> {
        Ok(self.pyramid.global_warp(img, features, matrix, resample)?)
    }

    /// Transform, histogram and detect keypoints on the feature pyramid
    pub fn run(&self, img: &Image) -> CliResult<Slp2Output> {
        let (features, aux) = self.transform(img)?;
        let histogram = self.histgen(&features)?;
        let keypoints = self.keypoints(&features)?;
        info!(
            "{}x{}: {} levels, {} histogram layers, {} keypoints",
            img.width(),
            img.height(),
            features.len(),
            histogram.len(),
            keypoints.len()
        );
        Ok(Slp2Output { features, aux, histogram, keypoints })
    }
}

/// Load any supported image file as normalized grayscale
pub fn load_image<P: AsRef<Path>>(path: P) -> CliResult<Image> {
    let luma = image::ImageReader::open(path)?.decode()?.to_luma8();
    let (w, h) = luma.dimensions();
    Ok(Image::from_luma8(w as usize, h as usize, luma.as_raw())?)
}

/// Load a `.toml` or `.json` configuration file
pub fn load_config<P: AsRef<Path>>(path: P) -> CliResult<Slp2Config> {
    let path = path.as_ref();
    let loaded = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Slp2Config::load_toml(path),
        Some("json") => Slp2Config::load_json(path),
        _ => {
            return Err(CliError::Config(format!(
                "{}: expected a .toml or .json file",
                path.display()
            )))
        }
    };
    loaded.map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversions() {
        let err: CliError = Slp2Error::parameter("nbins", "too small").into();
        assert!(err.to_string().contains("nbins"));
        let err: CliError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, CliError::Io(_)));
    }

    #[test]
    fn test_load_config_rejects_unknown_extension() {
        let err = load_config("settings.yaml").unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_missing_image() {
        assert!(load_image("/nonexistent/slp2.png").is_err());
    }

    #[test]
    fn test_new_validates() {
        let cfg = Slp2Config { anchor_stride: 0, ..Slp2Config::new() };
        assert!(matches!(Slp2::new(cfg), Err(CliError::Slp2(_))));
    }
}
