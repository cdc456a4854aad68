//! Phase histograms over sampled feature pyramids.
//!
//! Every sampled complex value votes its magnitude into the bin containing
//! its phase. Histograms are kept per level or summed over all levels, and
//! can be reduced to their dominant bin. [`Histogram`] is a [`ScoredGrid`],
//! so keypoints can be detected on it directly.

use std::f64::consts::TAU;

use log::debug;
use rayon::prelude::*;
use slp2_core::{AnchorGrid, Complex64, FeatureLevel, FeaturePyramid, HistogramOptions, ScoredGrid, Slp2Result};

/// Bin of a phase in radians; wrapped into `[0, 2π)` first.
///
/// Bin `b` covers `(b·w, (b+1)·w]` with `w = 2π / nbins`, so a phase on a
/// boundary falls into the lower bin and phase 0 into bin 0.
#[inline]
pub fn phase_bin(phase: f64, nbins: usize) -> usize {
    let width = TAU / nbins as f64;
    let wrapped = phase.rem_euclid(TAU);
    let bin = (wrapped / width).ceil() as i64 - 1;
    (bin.max(0) as usize).min(nbins - 1)
}

/// Index and value of the first maximal bin
#[inline]
pub fn best_bin(bins: &[f64]) -> (usize, f64) {
    let mut best = (0, f64::NEG_INFINITY);
    for (i, &v) in bins.iter().enumerate() {
        if v > best.1 {
            best = (i, v);
        }
    }
    best
}

/// Centre angle of bin `bin`
pub fn bin_centre(bin: usize, nbins: usize) -> f64 {
    (bin as f64 + 0.5) * TAU / nbins as f64
}

/// Per-anchor content of one histogram layer, row-major
#[derive(Debug, Clone, PartialEq)]
pub enum HistogramData {
    /// `nbins` values per anchor
    Bins(Vec<f64>),
    /// Dominant bin per anchor
    Best { values: Vec<f64>, bins: Vec<usize> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramLayer {
    /// Source level, or the finest contributing level when aggregated
    pub level: usize,
    pub aggregated: bool,
    pub data: HistogramData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    options: HistogramOptions,
    grid: AnchorGrid,
    first_level: usize,
    layers: Vec<HistogramLayer>,
}

impl Histogram {
    pub fn options(&self) -> HistogramOptions {
        self.options
    }

    pub fn nbins(&self) -> usize {
        self.options.nbins
    }

    pub fn grid(&self) -> AnchorGrid {
        self.grid
    }

    pub fn layers(&self) -> &[HistogramLayer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Whether each anchor holds a single best-bin scalar
    pub fn is_reduced(&self) -> bool {
        self.options.best
    }

    /// Bin vector at an anchor, `None` for reduced histograms
    pub fn bins(&self, layer: usize, row: usize, col: usize) -> Option<&[f64]> {
        match &self.layers.get(layer)?.data {
            HistogramData::Bins(data) => {
                let n = self.options.nbins;
                let start = (row * self.grid.cols + col) * n;
                data.get(start..start + n)
            }
            HistogramData::Best { .. } => None,
        }
    }

    /// Dominant bin and its value at an anchor
    pub fn best(&self, layer: usize, row: usize, col: usize) -> Option<(usize, f64)> {
        let idx = row * self.grid.cols + col;
        match &self.layers.get(layer)?.data {
            HistogramData::Bins(_) => self.bins(layer, row, col).map(best_bin),
            HistogramData::Best { values, bins } => Some((*bins.get(idx)?, *values.get(idx)?)),
        }
    }

    /// Reduced values of every layer, row-major
    pub fn scalars(&self) -> Vec<f64> {
        self.layers
            .iter()
            .flat_map(|l| match &l.data {
                HistogramData::Best { values, .. } => values.clone(),
                HistogramData::Bins(_) => Vec::new(),
            })
            .collect()
    }

    fn layer(&self, layer: usize) -> &HistogramLayer {
        self.layers
            .get(layer)
            .unwrap_or_else(|| panic!("layer {} out of range ({} layers)", layer, self.layers.len()))
    }
}

impl ScoredGrid for Histogram {
    fn anchor_grid(&self) -> AnchorGrid {
        self.grid
    }

    fn layer_count(&self) -> usize {
        self.layers.len()
    }

    fn layer_level(&self, layer: usize) -> usize {
        self.layer(layer).level
    }

    /// Total mass, or the best value when reduced
    fn response(&self, layer: usize, row: usize, col: usize) -> f64 {
        let idx = self.grid.index(row, col);
        match &self.layer(layer).data {
            HistogramData::Bins(data) => {
                let n = self.options.nbins;
                data[idx * n..(idx + 1) * n].iter().sum()
            }
            HistogramData::Best { values, .. } => values[idx],
        }
    }

    fn orientation(&self, layer: usize, row: usize, col: usize) -> Option<f64> {
        self.best(layer, row, col)
            .map(|(bin, _)| bin_centre(bin, self.options.nbins))
    }

    fn reports_layer(&self, layer: usize) -> bool {
        let l = self.layer(layer);
        l.aggregated || l.level >= self.first_level
    }
}

pub struct HistogramGenerator;

impl HistogramGenerator {
    pub fn histgen(features: &FeaturePyramid, options: HistogramOptions) -> Slp2Result<Histogram> {
        options.validate()?;
        let grid = features.grid();
        let levels: Vec<&FeatureLevel> = features.levels().collect();

        let layers: Vec<HistogramLayer> = if options.full {
            match levels.first() {
                Some(finest) => vec![Self::build_layer(&levels, finest.level, true, grid, options)],
                None => Vec::new(),
            }
        } else {
            levels
                .par_iter()
                .map(|l| Self::build_layer(std::slice::from_ref(l), l.level, false, grid, options))
                .collect()
        };

        debug!(
            "histgen: {} layers, {} bins, full={}, best={}",
            layers.len(),
            options.nbins,
            options.full,
            options.best
        );
        Ok(Histogram { options, grid, first_level: features.first_level(), layers })
    }

    /// Positional form of [`Self::histgen`]
    pub fn histgen_with(features: &FeaturePyramid, nbins: usize, full: bool, best: bool) -> Slp2Result<Histogram> {
        Self::histgen(features, HistogramOptions { nbins, full, best })
    }

    fn build_layer(
        sources: &[&FeatureLevel],
        level: usize,
        aggregated: bool,
        grid: AnchorGrid,
        options: HistogramOptions,
    ) -> HistogramLayer {
        let n = options.nbins;
        let mut bins = vec![0.0; grid.len() * n];
        bins.par_chunks_mut(grid.cols * n)
            .enumerate()
            .for_each(|(row, chunk)| {
                for col in 0..grid.cols {
                    let out = &mut chunk[col * n..(col + 1) * n];
                    for src in sources {
                        Self::accumulate(src.anchor_samples(row, col), out);
                    }
                }
            });

        let data = if options.best {
            let (bins, values) = bins.chunks(n).map(best_bin).unzip();
            HistogramData::Best { values, bins }
        } else {
            HistogramData::Bins(bins)
        };
        HistogramLayer { level, aggregated, data }
    }

    #[inline]
    fn accumulate(samples: &[Complex64], out: &mut [f64]) {
        let n = out.len();
        for v in samples {
            out[phase_bin(v.arg(), n)] += v.norm();
        }
    }
}
