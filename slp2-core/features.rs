use std::collections::BTreeMap;

use num_complex::Complex64;

use crate::grid::{AnchorGrid, SampleLocationSet};
use crate::subband_angle;

/// Numeric response per anchor location per layer.
///
/// Implemented by every structure keypoints can be detected on. Layers are
/// ordered from fine to coarse and share one anchor grid.
///
/// Layers are numbered `0..layer_count()` and anchors lie inside
/// `anchor_grid()`. Callers stay inside both ranges.
pub trait ScoredGrid: Sync {
    fn anchor_grid(&self) -> AnchorGrid;

    fn layer_count(&self) -> usize;

    /// Pyramid level reported for keypoints found on `layer`
    ///
    /// # Panics
    ///
    /// Panics if `layer >= layer_count()`.
    fn layer_level(&self, layer: usize) -> usize;

    /// Scalar score of an anchor
    ///
    /// # Panics
    ///
    /// Panics if `layer >= layer_count()` or the anchor lies outside `anchor_grid()`.
    fn response(&self, layer: usize, row: usize, col: usize) -> f64;

    /// Dominant direction at an anchor, if the grid carries one
    ///
    /// # Panics
    ///
    /// May panic under the same conditions as [`ScoredGrid::response`].
    fn orientation(&self, _layer: usize, _row: usize, _col: usize) -> Option<f64> {
        None
    }

    /// Whether maxima on `layer` are reported (they still serve as neighbors)
    ///
    /// # Panics
    ///
    /// May panic if `layer >= layer_count()`.
    fn reports_layer(&self, _layer: usize) -> bool {
        true
    }
}

/// Sampled coefficients of one level, laid out `[row][col][offset][orientation]`
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureLevel {
    pub level: usize,
    pub scale: f64,
    pub n_offsets: usize,
    pub n_orientations: usize,
    grid: AnchorGrid,
    data: Vec<Complex64>,
}

impl FeatureLevel {
    pub fn new(
        level: usize,
        scale: f64,
        grid: AnchorGrid,
        n_offsets: usize,
        n_orientations: usize,
        data: Vec<Complex64>,
    ) -> Self {
        debug_assert_eq!(data.len(), grid.len() * n_offsets * n_orientations);
        Self { level, scale, n_offsets, n_orientations, grid, data }
    }

    pub fn grid(&self) -> AnchorGrid {
        self.grid
    }

    pub fn data(&self) -> &[Complex64] {
        &self.data
    }

    #[inline]
    pub fn samples_per_anchor(&self) -> usize {
        self.n_offsets * self.n_orientations
    }

    /// All samples of one anchor, offset-major
    #[inline]
    pub fn anchor_samples(&self, row: usize, col: usize) -> &[Complex64] {
        let n = self.samples_per_anchor();
        let start = self.grid.index(row, col) * n;
        &self.data[start..start + n]
    }

    #[inline]
    pub fn value(&self, row: usize, col: usize, offset: usize, orientation: usize) -> Complex64 {
        self.anchor_samples(row, col)[offset * self.n_orientations + orientation]
    }

    pub fn mean_magnitude(&self, row: usize, col: usize) -> f64 {
        let samples = self.anchor_samples(row, col);
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().map(|v| v.norm()).sum::<f64>() / samples.len() as f64
    }
}

/// Per-level sampled feature tensors produced by one transform call
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePyramid {
    levels: BTreeMap<usize, FeatureLevel>,
    grid: AnchorGrid,
    first_level: usize,
    image_size: (usize, usize),
    sample_locations: SampleLocationSet,
    frame_scale: f64,
}

impl FeaturePyramid {
    pub fn new(
        levels: BTreeMap<usize, FeatureLevel>,
        grid: AnchorGrid,
        first_level: usize,
        image_size: (usize, usize),
        sample_locations: SampleLocationSet,
    ) -> Self {
        Self { levels, grid, first_level, image_size, sample_locations, frame_scale: 1.0 }
    }

    /// Mark the pyramid as sampled from the reference image scaled down by `frame_scale`
    pub fn with_frame_scale(mut self, frame_scale: f64) -> Self {
        self.frame_scale = frame_scale;
        self
    }

    pub fn level(&self, level: usize) -> Option<&FeatureLevel> {
        self.levels.get(&level)
    }

    /// Levels in ascending order
    pub fn levels(&self) -> impl Iterator<Item = &FeatureLevel> {
        self.levels.values()
    }

    pub fn level_indices(&self) -> Vec<usize> {
        self.levels.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn grid(&self) -> AnchorGrid {
        self.grid
    }

    pub fn first_level(&self) -> usize {
        self.first_level
    }

    /// (width, height) of the image this pyramid was sampled from
    pub fn image_size(&self) -> (usize, usize) {
        self.image_size
    }

    pub fn sample_locations(&self) -> &SampleLocationSet {
        &self.sample_locations
    }

    /// Downscale of the transformed image relative to `image_size`; 1 for a plain transform
    pub fn frame_scale(&self) -> f64 {
        self.frame_scale
    }

    /// Largest element-wise difference, or `None` when layouts or frames differ
    pub fn max_abs_difference(&self, other: &FeaturePyramid) -> Option<f64> {
        if self.grid != other.grid
            || self.frame_scale != other.frame_scale
            || self.level_indices() != other.level_indices()
        {
            return None;
        }
        let mut worst = 0.0f64;
        for (a, b) in self.levels.values().zip(other.levels.values()) {
            if a.data.len() != b.data.len() {
                return None;
            }
            for (x, y) in a.data.iter().zip(&b.data) {
                worst = worst.max((x - y).norm());
            }
        }
        Some(worst)
    }

    fn layer(&self, layer: usize) -> &FeatureLevel {
        self.levels
            .values()
            .nth(layer)
            .unwrap_or_else(|| panic!("layer {} out of range ({} levels)", layer, self.levels.len()))
    }
}

impl ScoredGrid for FeaturePyramid {
    fn anchor_grid(&self) -> AnchorGrid {
        self.grid
    }

    fn layer_count(&self) -> usize {
        self.levels.len()
    }

    fn layer_level(&self, layer: usize) -> usize {
        self.layer(layer).level
    }

    fn response(&self, layer: usize, row: usize, col: usize) -> f64 {
        self.layer(layer).mean_magnitude(row, col)
    }

    /// Angle of the strongest sub-band at the anchor centre
    fn orientation(&self, layer: usize, row: usize, col: usize) -> Option<f64> {
        let level = self.layer(layer);
        let centre = &level.anchor_samples(row, col)[..level.n_orientations];
        let mut best: Option<(usize, f64)> = None;
        for (d, v) in centre.iter().enumerate() {
            let m = v.norm();
            if best.map_or(true, |(_, bm)| m > bm) {
                best = Some((d, m));
            }
        }
        best.map(|(d, _)| subband_angle(d))
    }

    fn reports_layer(&self, layer: usize) -> bool {
        self.layer(layer).level >= self.first_level
    }
}
