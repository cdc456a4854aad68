use std::collections::BTreeMap;

use slp2_core::Complex64;

/// Complex coefficients of one decomposition level, one plane per orientation
#[derive(Debug, Clone, PartialEq)]
pub struct SubbandLevel {
    pub level: usize,
    pub rows: usize,
    pub cols: usize,
    pub orientations: Vec<Vec<Complex64>>,
}

/// Lowpass image left after the last decomposition level
#[derive(Debug, Clone, PartialEq)]
pub struct LowpassResidual {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

/// Dyadic geometry of a pyramid level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleLevel {
    pub level: usize,
    pub scale: f64,
    pub width: usize,
    pub height: usize,
}

/// Intermediate data of a transform call that is not part of the features.
///
/// Everything here is recomputable from the image and configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformAux {
    pub subbands: Vec<SubbandLevel>,
    pub lowpass: LowpassResidual,
    /// Offsets used per retained level, in coefficient units
    pub sample_coordinates: BTreeMap<usize, Vec<[f64; 2]>>,
}
