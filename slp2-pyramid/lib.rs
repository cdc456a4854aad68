//! Log-polar complex wavelet feature pyramid.
//!
//! [`SamplingGridGenerator`] builds the per-level sample pattern once,
//! [`TransformEngine`] samples the wavelet coefficients of an image on it,
//! [`KeypointDetector`] finds scale-space maxima over any [`ScoredGrid`] and
//! [`WarpResampler`] re-expresses a pyramid under an affine map.
//! [`Slp2Pyramid`] bundles the stages behind one validated configuration.

pub mod builder;
pub mod config;
pub mod configured_pyramid;
pub mod interleaved;
pub mod keypoints;
pub mod pyramid;
pub mod sampling;
pub mod transform;
pub mod types;
pub mod warp;
pub mod wavelet;

pub use builder::PyramidBuilder;
pub use config::{Slp2Config, DEFAULT_ANCHOR_STRIDE};
pub use configured_pyramid::Slp2Pyramid;
pub use interleaved::InterleavedPyramid;
pub use keypoints::{max_curvature_ratio, KeypointDetector};
pub use pyramid::ImagePyramid;
pub use sampling::{SamplingGridGenerator, SamplingSpec, SAMPLING_SPECS};
pub use transform::TransformEngine;
pub use types::{LowpassResidual, ScaleLevel, SubbandLevel, TransformAux};
pub use warp::{AffineWarp, WarpResampler};
pub use wavelet::{Decomposition, OrientedFilterBank, WaveletTransform};

pub use slp2_core::{
    FeaturePyramid, HistogramOptions, Image, Keypoint, KeypointMethod, PyramidConfig, SampleLocationSet,
    SamplingConfig, ScoredGrid, Slp2Error, Slp2Result,
};
