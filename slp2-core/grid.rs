use std::sync::Arc;

use crate::error::{Slp2Error, Slp2Result};
use crate::{PyramidConfig, SamplingConfig};

/// One log-polar sample position relative to an anchor, in image pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleOffset {
    pub dx: f64,
    pub dy: f64,
    pub weight: f64,
}

impl SampleOffset {
    pub fn radius(&self) -> f64 {
        self.dx.hypot(self.dy)
    }
}

/// Sample pattern of a single pyramid level
#[derive(Debug, Clone, PartialEq)]
pub struct LevelGrid {
    pub level: usize,
    /// Coefficient sampling period in image pixels
    pub scale: f64,
    pub offsets: Vec<SampleOffset>,
}

impl LevelGrid {
    /// Offsets expressed in coefficient units of this level
    pub fn coefficient_offsets(&self) -> Vec<[f64; 2]> {
        self.offsets
            .iter()
            .map(|o| [o.dx / self.scale, o.dy / self.scale])
            .collect()
    }
}

/// Per-level sampling geometry, independent of image content.
///
/// Cloning is cheap: the level grids are shared.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleLocationSet {
    config: SamplingConfig,
    pyramid: PyramidConfig,
    levels: Arc<Vec<LevelGrid>>,
}

impl SampleLocationSet {
    pub fn new(config: SamplingConfig, pyramid: PyramidConfig, levels: Vec<LevelGrid>) -> Self {
        Self { config, pyramid, levels: Arc::new(levels) }
    }

    pub fn config(&self) -> SamplingConfig {
        self.config
    }

    pub fn pyramid(&self) -> &PyramidConfig {
        &self.pyramid
    }

    pub fn levels(&self) -> &[LevelGrid] {
        &self.levels
    }

    pub fn level(&self, level: usize) -> Option<&LevelGrid> {
        self.levels.iter().find(|g| g.level == level)
    }

    pub fn level_indices(&self) -> Vec<usize> {
        self.levels.iter().map(|g| g.level).collect()
    }

    /// Samples per anchor, identical on every level
    pub fn offsets_per_level(&self) -> usize {
        self.levels.first().map_or(0, |g| g.offsets.len())
    }

    /// Checks that this grid was generated for `pyramid`'s level layout
    pub fn check_compatible(&self, pyramid: &PyramidConfig) -> Slp2Result<()> {
        let expected: Vec<usize> = pyramid.retained_levels().collect();
        let found = self.level_indices();
        if self.pyramid.nlevels != pyramid.nlevels || expected != found {
            return Err(Slp2Error::GridMismatch {
                expected: format!("{} levels {:?}", pyramid.nlevels, expected),
                found: format!("{} levels {:?}", self.pyramid.nlevels, found),
            });
        }
        Ok(())
    }
}

/// Regular lattice of anchor locations shared by all levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorGrid {
    pub rows: usize,
    pub cols: usize,
    pub stride: usize,
}

impl AnchorGrid {
    pub fn for_image(width: usize, height: usize, stride: usize) -> Slp2Result<Self> {
        if stride == 0 {
            return Err(Slp2Error::parameter("anchor_stride", "must be at least 1"));
        }
        let (rows, cols) = (height / stride, width / stride);
        if rows == 0 || cols == 0 {
            return Err(Slp2Error::ImageTooSmall { width, height, levels: 0, min_size: stride });
        }
        Ok(Self { rows, cols, stride })
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row-major index of anchor (row, col)
    ///
    /// # Panics
    ///
    /// Panics if the anchor lies outside the grid.
    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        assert!(
            row < self.rows && col < self.cols,
            "anchor ({}, {}) outside {}x{} grid",
            row,
            col,
            self.rows,
            self.cols
        );
        row * self.cols + col
    }

    /// Image position (x, y) of anchor (row, col)
    #[inline]
    pub fn position(&self, row: usize, col: usize) -> (f64, f64) {
        let half = (self.stride as f64 - 1.0) / 2.0;
        (
            (col * self.stride) as f64 + half,
            (row * self.stride) as f64 + half,
        )
    }

    /// Fractional (row, col) of an image position; inverse of `position`
    #[inline]
    pub fn locate(&self, x: f64, y: f64) -> (f64, f64) {
        let half = (self.stride as f64 - 1.0) / 2.0;
        ((y - half) / self.stride as f64, (x - half) / self.stride as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_positions_round_trip() {
        let grid = AnchorGrid::for_image(64, 40, 8).unwrap();
        assert_eq!((grid.rows, grid.cols), (5, 8));
        let (x, y) = grid.position(2, 3);
        assert_eq!((x, y), (27.5, 19.5));
        assert_eq!(grid.locate(x, y), (2.0, 3.0));
    }

    #[test]
    fn test_anchor_index_is_row_major() {
        let grid = AnchorGrid { rows: 3, cols: 5, stride: 4 };
        assert_eq!(grid.index(0, 0), 0);
        assert_eq!(grid.index(2, 4), 14);
        assert!(std::panic::catch_unwind(|| grid.index(3, 0)).is_err());
        assert!(std::panic::catch_unwind(|| grid.index(0, 5)).is_err());
    }

    #[test]
    fn test_anchor_grid_rejects_bad_stride() {
        assert!(AnchorGrid::for_image(64, 64, 0).is_err());
        assert!(AnchorGrid::for_image(4, 64, 8).is_err());
    }

    #[test]
    fn test_grid_compatibility() {
        let pyramid = PyramidConfig { nlevels: 3, first_level: 1, full: false, verbose: false };
        let levels = (1..3)
            .map(|level| LevelGrid { level, scale: crate::level_scale(level), offsets: vec![] })
            .collect();
        let set = SampleLocationSet::new(SamplingConfig::Default, pyramid, levels);
        assert!(set.check_compatible(&pyramid).is_ok());

        let full = PyramidConfig { full: true, ..pyramid };
        assert!(matches!(set.check_compatible(&full), Err(Slp2Error::GridMismatch { .. })));
    }
}
