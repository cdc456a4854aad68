use std::sync::Arc;

use slp2_core::{HistogramOptions, KeypointMethod, SamplingConfig, Slp2Result};

use crate::config::Slp2Config;
use crate::configured_pyramid::Slp2Pyramid;
use crate::wavelet::{OrientedFilterBank, WaveletTransform};

/// Builder for creating an `Slp2Pyramid`
#[derive(Clone)]
pub struct PyramidBuilder {
    config: Slp2Config,
    adapter: Option<Arc<dyn WaveletTransform>>,
}

impl std::fmt::Debug for PyramidBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PyramidBuilder")
            .field("config", &self.config)
            .field("adapter", &self.adapter.as_ref().map(|a| a.name().to_string()))
            .finish()
    }
}

impl Default for PyramidBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PyramidBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self { config: Slp2Config::new(), adapter: None }
    }

    /// Total number of dyadic levels
    pub fn levels(mut self, nlevels: usize) -> Self {
        self.config.pyramid.nlevels = nlevels;
        self
    }

    pub fn first_level(mut self, level: usize) -> Self {
        self.config.pyramid.first_level = level;
        self
    }

    /// Keep every level, not just `[first_level, nlevels)`
    pub fn full(mut self, full: bool) -> Self {
        self.config.pyramid.full = full;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.pyramid.verbose = verbose;
        self
    }

    pub fn sampling(mut self, sampling: SamplingConfig) -> Self {
        self.config.sampling = sampling;
        self
    }

    /// Spacing of the anchor grid in pixels
    pub fn anchor_stride(mut self, stride: usize) -> Self {
        self.config.anchor_stride = stride;
        self
    }

    pub fn histogram(mut self, nbins: usize, full: bool, best: bool) -> Self {
        self.config.histogram = HistogramOptions { nbins, full, best };
        self
    }

    pub fn method(mut self, method: KeypointMethod) -> Self {
        self.config.method = method;
        self
    }

    pub fn edge_suppression(mut self, edge: f64) -> Self {
        self.config.edge_suppression = edge;
        self
    }

    /// Set the number of threads for parallel processing
    pub fn threads(mut self, n_threads: usize) -> Self {
        self.config.n_threads = n_threads;
        self
    }

    /// Replace the built-in oriented filter bank
    pub fn adapter(mut self, adapter: Arc<dyn WaveletTransform>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Apply the histogram preset, keeping the adapter
    pub fn preset_histogram(mut self) -> Self {
        self.config = Slp2Config::histogram_preset();
        self
    }

    pub fn preset_extended(mut self) -> Self {
        self.config = Slp2Config::extended_preset();
        self
    }

    pub fn preset_coarse(mut self) -> Self {
        self.config = Slp2Config::coarse_preset();
        self
    }

    /// Build the `Slp2Pyramid`
    pub fn build(self) -> Slp2Result<Slp2Pyramid> {
        let adapter = self
            .adapter
            .unwrap_or_else(|| Arc::new(OrientedFilterBank::default()) as Arc<dyn WaveletTransform>);
        Slp2Pyramid::with_adapter(self.config, adapter)
    }

    /// Generate a summary of the builder's configuration
    pub fn summary(&self) -> String {
        self.config.summary()
    }

    /// Create a builder from an existing `Slp2Config`
    pub fn from_config(config: Slp2Config) -> Self {
        Self { config, adapter: None }
    }

    /// Convert the builder into an `Slp2Config`
    pub fn to_config(self) -> Slp2Config {
        self.config
    }
}
