use std::f64::consts::{PI, SQRT_2};

use log::debug;
use slp2_core::{
    level_scale, LevelGrid, PyramidConfig, SampleLocationSet, SampleOffset, SamplingConfig, Slp2Result,
};

/// Log-polar density parameters of a named sampling configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingSpec {
    pub config: SamplingConfig,
    pub angles: usize,
    pub rings: usize,
    /// Radius ratio between consecutive rings
    pub ring_ratio: f64,
}

/// Handler table for every recognised sampling configuration
pub static SAMPLING_SPECS: [SamplingSpec; 3] = [
    SamplingSpec { config: SamplingConfig::Default, angles: 12, rings: 2, ring_ratio: 2.0 },
    SamplingSpec { config: SamplingConfig::Extended, angles: 16, rings: 3, ring_ratio: 2.0 },
    SamplingSpec { config: SamplingConfig::Normal, angles: 24, rings: 2, ring_ratio: SQRT_2 },
];

impl SamplingSpec {
    pub fn for_config(config: SamplingConfig) -> &'static SamplingSpec {
        match config {
            SamplingConfig::Default => &SAMPLING_SPECS[0],
            SamplingConfig::Extended => &SAMPLING_SPECS[1],
            SamplingConfig::Normal => &SAMPLING_SPECS[2],
        }
    }

    /// Centre plus every ring sample
    pub fn offsets_per_level(&self) -> usize {
        1 + self.angles * self.rings
    }

    /// Centre first, then ring-major, angle-minor
    fn level_offsets(&self, scale: f64) -> Vec<SampleOffset> {
        let mut offsets = Vec::with_capacity(self.offsets_per_level());
        offsets.push(SampleOffset { dx: 0.0, dy: 0.0, weight: 1.0 });
        for ring in 0..self.rings {
            let radius = scale * self.ring_ratio.powi(ring as i32);
            let weight = (-((ring * ring) as f64) / (2.0 * self.rings as f64)).exp();
            for k in 0..self.angles {
                let angle = 2.0 * PI * k as f64 / self.angles as f64;
                let (s, c) = angle.sin_cos();
                offsets.push(SampleOffset { dx: radius * c, dy: radius * s, weight });
            }
        }
        offsets
    }
}

/// Builds the log-polar sample pattern of every retained level
pub struct SamplingGridGenerator;

impl SamplingGridGenerator {
    pub fn init(pyramid: &PyramidConfig, config: SamplingConfig) -> Slp2Result<SampleLocationSet> {
        pyramid.validate()?;
        let spec = SamplingSpec::for_config(config);
        let levels: Vec<LevelGrid> = pyramid
            .retained_levels()
            .map(|level| {
                let scale = level_scale(level);
                LevelGrid { level, scale, offsets: spec.level_offsets(scale) }
            })
            .collect();
        debug!(
            "sampling grid '{}': {} levels x {} offsets",
            config,
            levels.len(),
            spec.offsets_per_level()
        );
        Ok(SampleLocationSet::new(config, *pyramid, levels))
    }

    /// Parse a configuration name, then [`Self::init`]
    pub fn init_named(pyramid: &PyramidConfig, name: &str) -> Slp2Result<SampleLocationSet> {
        Self::init(pyramid, name.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slp2_core::ErrorKind;

    fn pyramid(full: bool, first_level: usize) -> PyramidConfig {
        PyramidConfig { nlevels: 4, first_level, full, verbose: false }
    }

    #[test]
    fn test_every_config_has_a_spec() {
        for config in SamplingConfig::ALL {
            assert_eq!(SamplingSpec::for_config(config).config, config);
        }
    }

    #[test]
    fn test_grid_levels_follow_config() {
        let set = SamplingGridGenerator::init(&pyramid(false, 1), SamplingConfig::Default).unwrap();
        assert_eq!(set.level_indices(), vec![1, 2, 3]);
        let set = SamplingGridGenerator::init(&pyramid(true, 2), SamplingConfig::Default).unwrap();
        assert_eq!(set.level_indices(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_log_polar_geometry() {
        let set = SamplingGridGenerator::init(&pyramid(true, 0), SamplingConfig::Default).unwrap();
        let level = set.level(2).unwrap();
        assert_eq!(level.offsets.len(), 1 + 12 * 2);
        assert_eq!(level.offsets[0].radius(), 0.0);
        // Rings are geometric in the level scale
        assert!((level.offsets[1].radius() - 8.0).abs() < 1e-12);
        assert!((level.offsets[13].radius() - 16.0).abs() < 1e-12);
        // Scale-consistent in coefficient units
        let c0 = set.level(0).unwrap().coefficient_offsets();
        let c3 = set.level(3).unwrap().coefficient_offsets();
        for (a, b) in c0.iter().zip(&c3) {
            assert!((a[0] - b[0]).abs() < 1e-12 && (a[1] - b[1]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_angles_evenly_spaced() {
        let set = SamplingGridGenerator::init(&pyramid(true, 0), SamplingConfig::Normal).unwrap();
        let offsets = &set.level(0).unwrap().offsets;
        assert_eq!(offsets.len(), 49);
        let step = 2.0 * PI / 24.0;
        for k in 0..24 {
            let o = offsets[1 + k];
            let angle = o.dy.atan2(o.dx).rem_euclid(2.0 * PI);
            assert!((angle - step * k as f64).abs() < 1e-9);
        }
    }

    #[test]
    fn test_extended_is_denser_than_default() {
        let p = pyramid(true, 0);
        let d = SamplingGridGenerator::init(&p, SamplingConfig::Default).unwrap();
        let e = SamplingGridGenerator::init(&p, SamplingConfig::Extended).unwrap();
        assert!(e.offsets_per_level() > d.offsets_per_level());
        let max_r = |s: &SampleLocationSet| {
            s.level(0).unwrap().offsets.iter().map(|o| o.radius()).fold(0.0, f64::max)
        };
        assert!(max_r(&e) > max_r(&d));
    }

    #[test]
    fn test_init_is_deterministic() {
        let p = pyramid(true, 0);
        let a = SamplingGridGenerator::init(&p, SamplingConfig::Extended).unwrap();
        let b = SamplingGridGenerator::init(&p, SamplingConfig::Extended).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_name_rejected() {
        let err = SamplingGridGenerator::init_named(&pyramid(true, 0), "sparse").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
    }
}
