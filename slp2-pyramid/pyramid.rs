use std::ops::{Add, Mul};

use slp2_core::{level_scale, min_image_size, Image, Slp2Error, Slp2Result};

use crate::types::ScaleLevel;

/// 5-tap binomial smoothing kernel
const BINOMIAL: [f64; 5] = [1.0 / 16.0, 4.0 / 16.0, 6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0];

/// Dyadic image pyramid helpers shared by the wavelet adapter, warp and interleaving
pub struct ImagePyramid;

impl ImagePyramid {
    /// Coefficient grid shape of each decomposition level
    pub fn generate_scale_levels(width: usize, height: usize, nlevels: usize) -> Vec<ScaleLevel> {
        (0..nlevels)
            .map(|level| {
                let div = 1usize << (level + 1);
                ScaleLevel {
                    level,
                    scale: level_scale(level),
                    width: width.div_ceil(div),
                    height: height.div_ceil(div),
                }
            })
            .collect()
    }

    /// Fails with `ImageTooSmall` when `nlevels` decompositions do not fit
    pub fn check_supports_levels(width: usize, height: usize, nlevels: usize) -> Slp2Result<()> {
        let min_size = min_image_size(nlevels);
        if width < min_size || height < min_size {
            return Err(Slp2Error::ImageTooSmall { width, height, levels: nlevels, min_size });
        }
        Ok(())
    }

    /// Separable binomial blur with edge clamping
    pub fn binomial_blur(data: &[f64], width: usize, height: usize) -> Vec<f64> {
        let mut tmp = vec![0.0; data.len()];
        for y in 0..height {
            let row = &data[y * width..(y + 1) * width];
            for x in 0..width {
                let mut acc = 0.0;
                for (k, w) in BINOMIAL.iter().enumerate() {
                    let xx = (x as isize + k as isize - 2).clamp(0, width as isize - 1) as usize;
                    acc += w * row[xx];
                }
                tmp[y * width + x] = acc;
            }
        }

        let mut out = vec![0.0; data.len()];
        for y in 0..height {
            for x in 0..width {
                let mut acc = 0.0;
                for (k, w) in BINOMIAL.iter().enumerate() {
                    let yy = (y as isize + k as isize - 2).clamp(0, height as isize - 1) as usize;
                    acc += w * tmp[yy * width + x];
                }
                out[y * width + x] = acc;
            }
        }
        out
    }

    /// Keep every other sample in both directions
    pub fn decimate<T: Copy>(data: &[T], width: usize, height: usize) -> (Vec<T>, usize, usize) {
        let (w2, h2) = (width.div_ceil(2), height.div_ceil(2));
        let mut out = Vec::with_capacity(w2 * h2);
        for y in (0..height).step_by(2) {
            for x in (0..width).step_by(2) {
                out.push(data[y * width + x]);
            }
        }
        (out, w2, h2)
    }

    /// Resample the whole image by `1 / factor` using bilinear interpolation.
    ///
    /// Output pixel `x` reads source position `x * factor`.
    pub fn downsample_image(img: &Image, factor: f64) -> Slp2Result<Image> {
        if !factor.is_finite() || factor < 1.0 {
            return Err(Slp2Error::parameter("factor", format!("{} must be >= 1", factor)));
        }
        let target_width = (img.width() as f64 / factor).floor() as usize;
        let target_height = (img.height() as f64 / factor).floor() as usize;
        let data = (0..target_height)
            .flat_map(|y| (0..target_width).map(move |x| (x, y)))
            .map(|(x, y)| {
                Self::bilinear_sample(
                    img.data(),
                    img.width(),
                    img.height(),
                    x as f64 * factor,
                    y as f64 * factor,
                )
            })
            .collect();
        Image::new(target_width, target_height, data)
    }

    /// Sample at fractional coordinates, clamping to the border
    #[inline]
    pub fn bilinear_sample<T>(data: &[T], width: usize, height: usize, x: f64, y: f64) -> T
    where
        T: Copy + Add<Output = T> + Mul<f64, Output = T>,
    {
        let x = x.clamp(0.0, (width - 1) as f64);
        let y = y.clamp(0.0, (height - 1) as f64);
        let x1 = x.floor() as usize;
        let y1 = y.floor() as usize;
        let x2 = (x1 + 1).min(width - 1);
        let y2 = (y1 + 1).min(height - 1);

        let fx = x - x1 as f64;
        let fy = y - y1 as f64;

        let p11 = data[y1 * width + x1];
        let p12 = data[y1 * width + x2];
        let p21 = data[y2 * width + x1];
        let p22 = data[y2 * width + x2];

        let top = p11 * (1.0 - fx) + p12 * fx;
        let bottom = p21 * (1.0 - fx) + p22 * fx;

        top * (1.0 - fy) + bottom * fy
    }

    /// Sample at fractional coordinates, reading zero outside the image
    #[inline]
    pub fn bilinear_sample_or_zero(img: &Image, x: f64, y: f64) -> f64 {
        let max_x = (img.width() - 1) as f64;
        let max_y = (img.height() - 1) as f64;
        if !(0.0..=max_x).contains(&x) || !(0.0..=max_y).contains(&y) {
            return 0.0;
        }
        Self::bilinear_sample(img.data(), img.width(), img.height(), x, y)
    }
}
