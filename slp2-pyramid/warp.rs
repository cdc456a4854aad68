use std::collections::BTreeMap;
use std::f64::consts::PI;

use log::debug;
use nalgebra::{Matrix2, Matrix3, Vector3};
use rayon::prelude::*;
use slp2_core::{
    subband_angle, Complex64, FeatureLevel, FeaturePyramid, Image, LevelGrid, Slp2Error, Slp2Result,
};

use crate::pyramid::ImagePyramid;
use crate::transform::TransformEngine;

const LAST_ROW_TOLERANCE: f64 = 1e-12;

/// Validated 2-D affine map in homogeneous form
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineWarp {
    matrix: Matrix3<f64>,
    inverse: Matrix3<f64>,
}

impl AffineWarp {
    pub fn new(matrix: Matrix3<f64>) -> Slp2Result<Self> {
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(Slp2Error::parameter("affine", "entries must be finite"));
        }
        let last = matrix.row(2);
        if last[0].abs() > LAST_ROW_TOLERANCE
            || last[1].abs() > LAST_ROW_TOLERANCE
            || (last[2] - 1.0).abs() > LAST_ROW_TOLERANCE
        {
            return Err(Slp2Error::parameter(
                "affine",
                format!("last row must be [0, 0, 1], got [{}, {}, {}]", last[0], last[1], last[2]),
            ));
        }
        let linear = matrix.fixed_view::<2, 2>(0, 0).into_owned();
        if linear.determinant().abs() <= f64::EPSILON {
            return Err(Slp2Error::parameter("affine", "linear part is singular"));
        }
        let inverse = matrix
            .try_inverse()
            .ok_or_else(|| Slp2Error::parameter("affine", "matrix is not invertible"))?;
        Ok(Self { matrix, inverse })
    }

    /// Row-major 3x3 entries
    pub fn from_rows(rows: [[f64; 3]; 3]) -> Slp2Result<Self> {
        Self::new(Matrix3::from_fn(|r, c| rows[r][c]))
    }

    pub fn identity() -> Self {
        Self { matrix: Matrix3::identity(), inverse: Matrix3::identity() }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn inverse(&self) -> &Matrix3<f64> {
        &self.inverse
    }

    /// Linear part of the inverse map, `L^-1`
    pub fn linear_inverse(&self) -> Matrix2<f64> {
        self.inverse.fixed_view::<2, 2>(0, 0).into_owned()
    }

    /// Rotation component of the linear part, in radians
    pub fn rotation_angle(&self) -> f64 {
        self.matrix[(1, 0)].atan2(self.matrix[(0, 0)])
    }

    #[inline]
    pub fn apply_inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let v = self.inverse * Vector3::new(x, y, 1.0);
        (v[0], v[1])
    }

    /// Remap `image` so that output pixel `x` shows source position `A^-1 x`
    pub fn warp_image(&self, image: &Image) -> Image {
        let (width, height) = image.dimensions();
        let data: Vec<f64> = (0..height)
            .into_par_iter()
            .flat_map_iter(|y| {
                (0..width).map(move |x| {
                    let (sx, sy) = self.apply_inverse(x as f64, y as f64);
                    ImagePyramid::bilinear_sample_or_zero(image, sx, sy)
                })
            })
            .collect();
        Image::from_fn(width, height, |x, y| data[y * width + x])
    }
}

/// Re-expresses a feature pyramid under a global affine warp
pub struct WarpResampler;

impl WarpResampler {
    /// Warp `features` (sampled from `image`) by `matrix`.
    ///
    /// With `resample` the image itself is warped and transformed again in
    /// the frame `features` was sampled in, so a half-octave pyramid is
    /// rebuilt from the warped image downscaled by its frame scale. Otherwise existing samples are re-indexed analytically, see
    /// [`Self::warp_features`].
    pub fn global_warp(
        engine: &TransformEngine,
        image: &Image,
        features: &FeaturePyramid,
        matrix: &Matrix3<f64>,
        resample: bool,
    ) -> Slp2Result<FeaturePyramid> {
        let warp = AffineWarp::new(*matrix)?;
        if resample {
            if image.dimensions() != features.image_size() {
                return Err(Slp2Error::GridMismatch {
                    expected: format!("{:?} image", features.image_size()),
                    found: format!("{:?} image", image.dimensions()),
                });
            }
            let frame_scale = features.frame_scale();
            let mut warped = warp.warp_image(image);
            if frame_scale > 1.0 {
                warped = ImagePyramid::downsample_image(&warped, frame_scale)?;
            }
            debug!(
                "global warp: resampled {}x{} image, frame scale {}",
                image.width(),
                image.height(),
                frame_scale
            );
            let (out, _) = engine.transform_in_frame(
                &warped,
                features.sample_locations(),
                features.grid(),
                frame_scale,
                features.image_size(),
            )?;
            Ok(out)
        } else {
            Ok(Self::warp_features(features, &warp))
        }
    }

    /// Analytic approximation of a warped pyramid.
    ///
    /// Each output anchor `a` reads the source pyramid bilinearly at anchor
    /// position `A^-1 a`. Offset `o` is replaced by the source offset nearest
    /// to `L^-1 o` and orientation `d` by the sub-band nearest to `θ_d - φ`
    /// (modulo π), where `L` is the linear part and `φ` its rotation. Anchors
    /// mapping outside the source grid read zero. Coefficient phases are not
    /// adjusted.
    pub fn warp_features(features: &FeaturePyramid, warp: &AffineWarp) -> FeaturePyramid {
        let grid = features.grid();
        let linear_inv = warp.linear_inverse();
        let phi = warp.rotation_angle();

        let levels: BTreeMap<usize, FeatureLevel> = features
            .levels()
            .collect::<Vec<_>>()
            .par_iter()
            .map(|src| {
                let offsets = features
                    .sample_locations()
                    .level(src.level)
                    .map(|lg| Self::offset_permutation(lg, &linear_inv))
                    .unwrap_or_else(|| (0..src.n_offsets).collect());
                let orientations = Self::orientation_permutation(src.n_orientations, phi);
                let per_anchor = src.samples_per_anchor();

                let mut data = vec![Complex64::new(0.0, 0.0); grid.len() * per_anchor];
                data.par_chunks_mut(grid.cols * per_anchor)
                    .enumerate()
                    .for_each(|(row, chunk)| {
                        for col in 0..grid.cols {
                            let (x, y) = grid.position(row, col);
                            let (sx, sy) = warp.apply_inverse(x, y);
                            let (sr, sc) = grid.locate(sx, sy);
                            if !(0.0..=(grid.rows - 1) as f64).contains(&sr)
                                || !(0.0..=(grid.cols - 1) as f64).contains(&sc)
                            {
                                continue;
                            }
                            let out = &mut chunk[col * per_anchor..(col + 1) * per_anchor];
                            for (o, &so) in offsets.iter().enumerate() {
                                for (d, &sd) in orientations.iter().enumerate() {
                                    out[o * src.n_orientations + d] = Self::sample_anchor(src, sr, sc, so, sd);
                                }
                            }
                        }
                    });
                let level = FeatureLevel::new(src.level, src.scale, grid, src.n_offsets, src.n_orientations, data);
                (src.level, level)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect();

        FeaturePyramid::new(
            levels,
            grid,
            features.first_level(),
            features.image_size(),
            features.sample_locations().clone(),
        )
        .with_frame_scale(features.frame_scale())
    }

    /// Bilinear interpolation of one sample across neighbouring anchors
    fn sample_anchor(level: &FeatureLevel, row: f64, col: f64, offset: usize, orientation: usize) -> Complex64 {
        let grid = level.grid();
        let r0 = row.floor() as usize;
        let c0 = col.floor() as usize;
        let r1 = (r0 + 1).min(grid.rows - 1);
        let c1 = (c0 + 1).min(grid.cols - 1);
        let fr = row - r0 as f64;
        let fc = col - c0 as f64;
        let v = |r, c| level.value(r, c, offset, orientation);
        let top = v(r0, c0) * (1.0 - fc) + v(r0, c1) * fc;
        let bottom = v(r1, c0) * (1.0 - fc) + v(r1, c1) * fc;
        top * (1.0 - fr) + bottom * fr
    }

    /// For each offset, the index of the offset nearest to `L^-1 o`
    pub fn offset_permutation(level: &LevelGrid, linear_inv: &Matrix2<f64>) -> Vec<usize> {
        level
            .offsets
            .iter()
            .map(|o| {
                let tx = linear_inv[(0, 0)] * o.dx + linear_inv[(0, 1)] * o.dy;
                let ty = linear_inv[(1, 0)] * o.dx + linear_inv[(1, 1)] * o.dy;
                let mut best = (0, f64::INFINITY);
                for (i, c) in level.offsets.iter().enumerate() {
                    let d = (c.dx - tx).hypot(c.dy - ty);
                    if d < best.1 {
                        best = (i, d);
                    }
                }
                best.0
            })
            .collect()
    }

    /// For each sub-band, the sub-band nearest to its direction rotated by `-phi`
    pub fn orientation_permutation(n_orientations: usize, phi: f64) -> Vec<usize> {
        (0..n_orientations)
            .map(|d| {
                let target = subband_angle(d) - phi;
                let mut best = (0, f64::INFINITY);
                for s in 0..n_orientations {
                    let delta = (target - subband_angle(s)).rem_euclid(PI);
                    let dist = delta.min(PI - delta);
                    if dist < best.1 - 1e-12 {
                        best = (s, dist);
                    }
                }
                best.0
            })
            .collect()
    }
}
