use std::f64::consts::SQRT_2;

use log::debug;
use slp2_core::{AnchorGrid, FeaturePyramid, Image, SampleLocationSet, ScoredGrid, Slp2Result};

use crate::pyramid::ImagePyramid;
use crate::transform::TransformEngine;

/// Octave pyramid plus a second one sampled half an octave coarser.
///
/// The half-octave pyramid is computed from the image downscaled by √2 and
/// sampled on the same anchor grid, so both share one set of anchors. As a
/// [`ScoredGrid`] the layers alternate octave / half-octave from fine to
/// coarse and report half-octave level indices `2l` and `2l + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct InterleavedPyramid {
    octave: FeaturePyramid,
    half_octave: FeaturePyramid,
}

impl InterleavedPyramid {
    pub fn build(engine: &TransformEngine, image: &Image, locs: &SampleLocationSet) -> Slp2Result<Self> {
        let (octave, _) = engine.transform(image, locs)?;
        let reduced = ImagePyramid::downsample_image(image, SQRT_2)?;
        debug!(
            "interleaved: {}x{} -> {}x{}",
            image.width(),
            image.height(),
            reduced.width(),
            reduced.height()
        );
        let (half_octave, _) =
            engine.transform_in_frame(&reduced, locs, octave.grid(), SQRT_2, image.dimensions())?;
        Ok(Self { octave, half_octave })
    }

    pub fn octave(&self) -> &FeaturePyramid {
        &self.octave
    }

    pub fn half_octave(&self) -> &FeaturePyramid {
        &self.half_octave
    }

    /// Pyramid and its own layer index backing interleaved `layer`
    fn source(&self, layer: usize) -> (&FeaturePyramid, usize) {
        if layer % 2 == 0 {
            (&self.octave, layer / 2)
        } else {
            (&self.half_octave, layer / 2)
        }
    }
}

impl ScoredGrid for InterleavedPyramid {
    fn anchor_grid(&self) -> AnchorGrid {
        self.octave.grid()
    }

    fn layer_count(&self) -> usize {
        self.octave.len() + self.half_octave.len()
    }

    fn layer_level(&self, layer: usize) -> usize {
        let (pyr, inner) = self.source(layer);
        2 * pyr.layer_level(inner) + layer % 2
    }

    fn response(&self, layer: usize, row: usize, col: usize) -> f64 {
        let (pyr, inner) = self.source(layer);
        pyr.response(inner, row, col)
    }

    fn orientation(&self, layer: usize, row: usize, col: usize) -> Option<f64> {
        let (pyr, inner) = self.source(layer);
        pyr.orientation(inner, row, col)
    }

    fn reports_layer(&self, layer: usize) -> bool {
        let (pyr, inner) = self.source(layer);
        pyr.reports_layer(inner)
    }
}
