use slp2_core::{
    default_threads, HistogramOptions, KeypointMethod, PyramidConfig, SamplingConfig, Slp2Error, Slp2Result,
};

use crate::builder::PyramidBuilder;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default spacing of the shared anchor grid in pixels
pub const DEFAULT_ANCHOR_STRIDE: usize = 8;

/// Complete pipeline configuration with all settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Slp2Config {
    /// Level range
    pub pyramid: PyramidConfig,
    pub sampling: SamplingConfig,
    pub anchor_stride: usize,
    pub histogram: HistogramOptions,
    /// Keypoint selection
    pub method: KeypointMethod,
    pub edge_suppression: f64,
    pub n_threads: usize,
    /// Metadata
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub description: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub version: Option<String>,
}

impl Default for Slp2Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Slp2Config {
    /// Four full levels, default sampling, gale keypoints
    pub fn new() -> Self {
        Self {
            pyramid: PyramidConfig::default(),
            sampling: SamplingConfig::Default,
            anchor_stride: DEFAULT_ANCHOR_STRIDE,
            histogram: HistogramOptions::default(),
            method: KeypointMethod::Gale,
            edge_suppression: 0.0,
            n_threads: 1,
            name: None,
            description: None,
            version: None,
        }
    }

    /// Fine angular sampling feeding best-bin histograms
    pub fn histogram_preset() -> Self {
        Self {
            sampling: SamplingConfig::Normal,
            histogram: HistogramOptions { nbins: 24, full: true, best: true },
            n_threads: default_threads(),
            name: Some("Histogram".to_string()),
            description: Some("Normal sampling with 24-bin best-orientation histograms".to_string()),
            version: Some("1.0".to_string()),
            ..Self::new()
        }
    }

    /// Three rings, 16 angles and edge-suppressed keypoints
    pub fn extended_preset() -> Self {
        Self {
            sampling: SamplingConfig::Extended,
            method: KeypointMethod::Forshaw,
            edge_suppression: 10.0,
            n_threads: default_threads(),
            name: Some("Extended".to_string()),
            description: Some("Extended sampling with forshaw edge suppression".to_string()),
            version: Some("1.0".to_string()),
            ..Self::new()
        }
    }

    /// Only the coarse levels on a sparse anchor grid
    pub fn coarse_preset() -> Self {
        Self {
            pyramid: PyramidConfig { nlevels: 5, first_level: 2, full: false, verbose: false },
            anchor_stride: 16,
            n_threads: default_threads(),
            name: Some("Coarse".to_string()),
            description: Some("Levels 2-4 only, 16 pixel anchor spacing".to_string()),
            version: Some("1.0".to_string()),
            ..Self::new()
        }
    }

    /// Add metadata to configuration
    pub fn with_metadata(mut self, name: &str, description: &str) -> Self {
        self.name = Some(name.to_string());
        self.description = Some(description.to_string());
        self.version = Some("1.0".to_string());
        self
    }

    pub fn to_builder(self) -> PyramidBuilder {
        PyramidBuilder::from_config(self)
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "Slp2Config: levels={} first={} full={}, sampling={}, stride={}, hist=[bins:{}, full:{}, best:{}], keypoints={} (edge {}), threads={}",
            self.pyramid.nlevels,
            self.pyramid.first_level,
            self.pyramid.full,
            self.sampling,
            self.anchor_stride,
            self.histogram.nbins,
            self.histogram.full,
            self.histogram.best,
            self.method,
            self.edge_suppression,
            self.n_threads
        )
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Slp2Result<()> {
        self.pyramid.validate()?;
        self.histogram.validate()?;
        if self.anchor_stride == 0 {
            return Err(Slp2Error::parameter("anchor_stride", "must be at least 1"));
        }
        if !self.edge_suppression.is_finite() || self.edge_suppression < 0.0 {
            return Err(Slp2Error::parameter(
                "edge_suppression",
                format!("{} must be finite and non-negative", self.edge_suppression),
            ));
        }
        if self.n_threads == 0 {
            return Err(Slp2Error::InvalidConfiguration { setting: "n_threads", value: "0".to_string() });
        }
        Ok(())
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from JSON file
    #[cfg(feature = "serde")]
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save configuration to TOML file
    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Load configuration from TOML file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}
