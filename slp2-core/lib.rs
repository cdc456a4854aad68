mod error;
mod features;
mod grid;

pub use error::{ErrorKind, Slp2Error, Slp2Result};
pub use features::{FeatureLevel, FeaturePyramid, ScoredGrid};
pub use grid::{AnchorGrid, LevelGrid, SampleLocationSet, SampleOffset};
pub use num_complex::Complex64;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of oriented sub-bands produced per level by the wavelet adapter
pub const SUBBAND_ORIENTATIONS: usize = 6;

/// Smallest coefficient grid side accepted at the coarsest level
pub const MIN_COARSE_SIZE: usize = 4;

/// Centre angle (radians) of oriented sub-band `d`: 15°, 45°, ..., 165°
pub fn subband_angle(d: usize) -> f64 {
    (15.0 + 30.0 * d as f64).to_radians()
}

/// Sampling period in image pixels of the coefficients at `level`
pub fn level_scale(level: usize) -> f64 {
    (1u64 << (level + 1)) as f64
}

/// Minimum image side supporting `nlevels` dyadic decompositions
pub fn min_image_size(nlevels: usize) -> usize {
    MIN_COARSE_SIZE << nlevels
}

/// Row-major single-channel image with intensities nominally in [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: usize,
    height: usize,
    data: Vec<f64>,
}

impl Image {
    pub fn new(width: usize, height: usize, data: Vec<f64>) -> Slp2Result<Self> {
        if width == 0 || height == 0 {
            return Err(Slp2Error::ImageTooSmall { width, height, levels: 0, min_size: 1 });
        }
        if data.len() != width * height {
            return Err(Slp2Error::InvalidImageData {
                expected_len: width * height,
                actual_len: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    pub fn zeros(width: usize, height: usize) -> Self {
        Self { width, height, data: vec![0.0; width * height] }
    }

    /// Build an image by evaluating `f(x, y)` at every pixel
    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { width, height, data }
    }

    /// Convert 8-bit grayscale samples to [0, 1]
    pub fn from_luma8(width: usize, height: usize, pixels: &[u8]) -> Slp2Result<Self> {
        let data = pixels.iter().map(|&p| p as f64 / 255.0).collect();
        Self::new(width, height, data)
    }

    /// Copy of rows `[top, top + rows)`
    pub fn crop_rows(&self, top: usize, rows: usize) -> Slp2Result<Self> {
        if top + rows > self.height {
            return Err(Slp2Error::parameter(
                "rows",
                format!("crop {}..{} exceeds height {}", top, top + rows, self.height),
            ));
        }
        let start = top * self.width;
        Self::new(self.width, rows, self.data[start..start + rows * self.width].to_vec())
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data[y * self.width + x]
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }
}

/// Detected extremum of a scored-location grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    pub level: usize,
    pub strength: f64,
    pub orientation: Option<f64>,
}

/// Level range of a pyramid.
///
/// With `full` set every level in `[0, nlevels)` is kept and `first_level`
/// only marks where keypoint reporting starts. Otherwise only
/// `[first_level, nlevels)` is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PyramidConfig {
    pub nlevels: usize,
    pub first_level: usize,
    pub full: bool,
    pub verbose: bool,
}

impl Default for PyramidConfig {
    fn default() -> Self {
        Self {
            nlevels: 4,
            first_level: 0,
            full: true,
            verbose: false,
        }
    }
}

impl PyramidConfig {
    pub fn validate(&self) -> Slp2Result<()> {
        if self.nlevels == 0 {
            return Err(Slp2Error::parameter("nlevels", "must be at least 1"));
        }
        if self.nlevels > 16 {
            return Err(Slp2Error::parameter("nlevels", format!("{} exceeds 16", self.nlevels)));
        }
        if self.first_level >= self.nlevels {
            return Err(Slp2Error::parameter(
                "first_level",
                format!("{} must be below nlevels {}", self.first_level, self.nlevels),
            ));
        }
        Ok(())
    }

    /// Levels materialized by the transform
    pub fn retained_levels(&self) -> std::ops::Range<usize> {
        if self.full {
            0..self.nlevels
        } else {
            self.first_level..self.nlevels
        }
    }
}

/// Named log-polar sampling densities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SamplingConfig {
    #[default]
    Default,
    Extended,
    Normal,
}

impl SamplingConfig {
    pub const ALL: [SamplingConfig; 3] = [
        SamplingConfig::Default,
        SamplingConfig::Extended,
        SamplingConfig::Normal,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SamplingConfig::Default => "default",
            SamplingConfig::Extended => "extended",
            SamplingConfig::Normal => "normal",
        }
    }
}

impl std::str::FromStr for SamplingConfig {
    type Err = Slp2Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name() == s)
            .ok_or_else(|| Slp2Error::InvalidConfiguration {
                setting: "sampling config",
                value: s.to_string(),
            })
    }
}

impl std::fmt::Display for SamplingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Keypoint selection strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum KeypointMethod {
    /// Strict 3x3x3 maxima
    #[default]
    Gale,
    /// Maxima with curvature-ratio edge suppression
    Forshaw,
}

impl KeypointMethod {
    pub fn name(&self) -> &'static str {
        match self {
            KeypointMethod::Gale => "gale",
            KeypointMethod::Forshaw => "forshaw",
        }
    }
}

impl std::str::FromStr for KeypointMethod {
    type Err = Slp2Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gale" => Ok(KeypointMethod::Gale),
            "forshaw" => Ok(KeypointMethod::Forshaw),
            other => Err(Slp2Error::parameter(
                "method",
                format!("unknown keypoint method '{}' (expected gale or forshaw)", other),
            )),
        }
    }
}

impl std::fmt::Display for KeypointMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Binning and reduction policy of the histogram generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HistogramOptions {
    pub nbins: usize,
    /// Accumulate all levels into one histogram per anchor
    pub full: bool,
    /// Keep only the dominant bin
    pub best: bool,
}

impl Default for HistogramOptions {
    fn default() -> Self {
        Self { nbins: 12, full: true, best: false }
    }
}

impl HistogramOptions {
    pub fn validate(&self) -> Slp2Result<()> {
        if self.nbins < 2 {
            return Err(Slp2Error::parameter("nbins", format!("{} must be at least 2", self.nbins)));
        }
        Ok(())
    }
}

/// Default worker count for the global pool
pub fn default_threads() -> usize {
    num_cpus::get().max(1)
}

/// Initialize Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
}
