//! Complex oriented wavelet decomposition.
//!
//! The transform engine only depends on the [`WaveletTransform`] trait: any
//! operator producing six complex oriented sub-bands per dyadic level can be
//! plugged in. [`OrientedFilterBank`] is the built-in adapter. Each level
//! removes the binomial lowpass from the current image, filters the detail
//! with six separable complex Gabor kernels centred on 15°, 45°, ..., 165°
//! and keeps every other coefficient, so coefficient `u` of level `l` sits at
//! image coordinate `u * 2^(l+1)`.

use rayon::prelude::*;
use slp2_core::{subband_angle, Complex64, Image, Slp2Error, Slp2Result, SUBBAND_ORIENTATIONS};

use crate::pyramid::ImagePyramid;
use crate::types::{LowpassResidual, SubbandLevel};

/// Output of a forward transform
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    pub subbands: Vec<SubbandLevel>,
    pub lowpass: LowpassResidual,
}

/// Black-box complex wavelet operator
pub trait WaveletTransform: Send + Sync {
    fn name(&self) -> &str;

    /// Decompose `image` into `nlevels` levels of complex oriented sub-bands
    fn forward(&self, image: &Image, nlevels: usize) -> Slp2Result<Decomposition>;
}

/// Separable complex Gabor filter bank on a binomial detail pyramid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedFilterBank {
    /// Gaussian envelope width in pixels of the level being filtered
    pub sigma: f64,
    /// Carrier frequency in radians per pixel
    pub frequency: f64,
}

impl Default for OrientedFilterBank {
    fn default() -> Self {
        Self { sigma: 1.5, frequency: 1.2 }
    }
}

impl OrientedFilterBank {
    pub fn new(sigma: f64, frequency: f64) -> Slp2Result<Self> {
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(Slp2Error::parameter("sigma", format!("{} must be positive", sigma)));
        }
        if !(frequency.is_finite() && frequency > 0.0 && frequency < std::f64::consts::PI) {
            return Err(Slp2Error::parameter(
                "frequency",
                format!("{} must lie in (0, pi)", frequency),
            ));
        }
        Ok(Self { sigma, frequency })
    }

    fn radius(&self) -> isize {
        (3.0 * self.sigma).ceil() as isize
    }

    /// 1-D complex kernel `g(t) exp(i k t)` for t in [-radius, radius]
    fn kernel(&self, k: f64) -> Vec<Complex64> {
        let r = self.radius();
        let gauss: Vec<f64> = (-r..=r)
            .map(|t| (-(t * t) as f64 / (2.0 * self.sigma * self.sigma)).exp())
            .collect();
        let norm: f64 = gauss.iter().sum();
        (-r..=r)
            .zip(gauss)
            .map(|(t, g)| Complex64::from_polar(g / norm, k * t as f64))
            .collect()
    }

    /// Filter with orientation `d` and keep even rows and columns
    fn filter_decimated(&self, detail: &[f64], width: usize, height: usize, d: usize) -> Vec<Complex64> {
        let theta = subband_angle(d);
        let hx = self.kernel(self.frequency * theta.cos());
        let hy = self.kernel(self.frequency * theta.sin());
        let r = self.radius();
        let (w2, h2) = (width.div_ceil(2), height.div_ceil(2));

        // Horizontal pass on even columns only
        let mut rows = vec![Complex64::new(0.0, 0.0); height * w2];
        for y in 0..height {
            let src = &detail[y * width..(y + 1) * width];
            for (cx, x) in (0..width).step_by(2).enumerate() {
                let mut acc = Complex64::new(0.0, 0.0);
                for (i, h) in hx.iter().enumerate() {
                    let xx = (x as isize + i as isize - r).clamp(0, width as isize - 1) as usize;
                    acc += *h * src[xx];
                }
                rows[y * w2 + cx] = acc;
            }
        }

        // Vertical pass on even rows only
        let mut out = vec![Complex64::new(0.0, 0.0); h2 * w2];
        for (cy, y) in (0..height).step_by(2).enumerate() {
            for cx in 0..w2 {
                let mut acc = Complex64::new(0.0, 0.0);
                for (i, h) in hy.iter().enumerate() {
                    let yy = (y as isize + i as isize - r).clamp(0, height as isize - 1) as usize;
                    acc += *h * rows[yy * w2 + cx];
                }
                out[cy * w2 + cx] = acc;
            }
        }
        out
    }
}

impl WaveletTransform for OrientedFilterBank {
    fn name(&self) -> &str {
        "oriented-gabor"
    }

    fn forward(&self, image: &Image, nlevels: usize) -> Slp2Result<Decomposition> {
        ImagePyramid::check_supports_levels(image.width(), image.height(), nlevels)?;

        let mut lowpass = image.data().to_vec();
        let (mut width, mut height) = image.dimensions();
        let mut subbands = Vec::with_capacity(nlevels);

        for level in 0..nlevels {
            let blurred = ImagePyramid::binomial_blur(&lowpass, width, height);
            let detail: Vec<f64> = lowpass.iter().zip(&blurred).map(|(a, b)| a - b).collect();

            let orientations: Vec<Vec<Complex64>> = (0..SUBBAND_ORIENTATIONS)
                .into_par_iter()
                .map(|d| self.filter_decimated(&detail, width, height, d))
                .collect();

            subbands.push(SubbandLevel {
                level,
                rows: height.div_ceil(2),
                cols: width.div_ceil(2),
                orientations,
            });

            let (next, w2, h2) = ImagePyramid::decimate(&blurred, width, height);
            lowpass = next;
            width = w2;
            height = h2;
        }

        Ok(Decomposition {
            subbands,
            lowpass: LowpassResidual { rows: height, cols: width, data: lowpass },
        })
    }
}
