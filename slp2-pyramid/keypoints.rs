use log::debug;
use rayon::prelude::*;
use slp2_core::{AnchorGrid, Keypoint, KeypointMethod, ScoredGrid, Slp2Error, Slp2Result};

/// Extra acceptance test applied to a strict maximum
type CandidateFilter = fn(&[f64], AnchorGrid, usize, usize, f64) -> bool;

/// Candidate filter of every keypoint method
fn method_handler(method: KeypointMethod) -> CandidateFilter {
    match method {
        KeypointMethod::Gale => accept_all,
        KeypointMethod::Forshaw => passes_edge_test,
    }
}

fn accept_all(_map: &[f64], _grid: AnchorGrid, _row: usize, _col: usize, _edge: f64) -> bool {
    true
}

/// Largest principal-curvature ratio tolerated for a given edge suppression.
///
/// Zero disables the test; larger values tighten it towards 1.
pub fn max_curvature_ratio(edge_suppression: f64) -> f64 {
    if edge_suppression <= 0.0 {
        f64::INFINITY
    } else {
        1.0 + 10.0 / edge_suppression
    }
}

/// Hessian trace and determinant of a response map by clamped central differences
pub fn response_hessian(map: &[f64], grid: AnchorGrid, row: usize, col: usize) -> (f64, f64) {
    let at = |r: isize, c: isize| {
        let r = r.clamp(0, grid.rows as isize - 1) as usize;
        let c = c.clamp(0, grid.cols as isize - 1) as usize;
        map[r * grid.cols + c]
    };
    let (r, c) = (row as isize, col as isize);
    let v = at(r, c);
    let dxx = at(r, c + 1) - 2.0 * v + at(r, c - 1);
    let dyy = at(r + 1, c) - 2.0 * v + at(r - 1, c);
    let dxy = (at(r + 1, c + 1) - at(r + 1, c - 1) - at(r - 1, c + 1) + at(r - 1, c - 1)) / 4.0;
    (dxx + dyy, dxx * dyy - dxy * dxy)
}

/// Rejects maxima on ridges: tr^2 / det must stay below (r + 1)^2 / r
fn passes_edge_test(map: &[f64], grid: AnchorGrid, row: usize, col: usize, edge_suppression: f64) -> bool {
    let ratio = max_curvature_ratio(edge_suppression);
    if ratio.is_infinite() {
        return true;
    }
    let (trace, det) = response_hessian(map, grid, row, col);
    if det <= 0.0 {
        return false;
    }
    trace * trace / det < (ratio + 1.0) * (ratio + 1.0) / ratio
}

/// Local-extremum keypoint detection over any scored-location grid
pub struct KeypointDetector;

impl KeypointDetector {
    pub fn detect<G>(data: &G, method: KeypointMethod, edge_suppression: f64) -> Slp2Result<Vec<Keypoint>>
    where
        G: ScoredGrid + ?Sized,
    {
        if !edge_suppression.is_finite() || edge_suppression < 0.0 {
            return Err(Slp2Error::parameter(
                "edge_suppression",
                format!("{} must be a non-negative number", edge_suppression),
            ));
        }
        let filter = method_handler(method);

        let grid = data.anchor_grid();
        let maps = Self::response_maps(data);

        let keypoints: Vec<Keypoint> = (0..maps.len())
            .into_par_iter()
            .filter(|&layer| data.reports_layer(layer))
            .flat_map_iter(|layer| {
                let mut found = Vec::new();
                for row in 0..grid.rows {
                    for col in 0..grid.cols {
                        if !Self::is_strict_maximum(&maps, grid, layer, row, col) {
                            continue;
                        }
                        if !filter(&maps[layer], grid, row, col, edge_suppression) {
                            continue;
                        }
                        let (x, y) = grid.position(row, col);
                        found.push(Keypoint {
                            x,
                            y,
                            level: data.layer_level(layer),
                            strength: maps[layer][row * grid.cols + col],
                            orientation: data.orientation(layer, row, col),
                        });
                    }
                }
                found
            })
            .collect();

        debug!(
            "{} keypoints from {} layers ({}, edge suppression {})",
            keypoints.len(),
            maps.len(),
            method,
            edge_suppression
        );
        Ok(keypoints)
    }

    /// Parse the method name, then [`Self::detect`]
    pub fn detect_named<G>(data: &G, method: &str, edge_suppression: f64) -> Slp2Result<Vec<Keypoint>>
    where
        G: ScoredGrid + ?Sized,
    {
        Self::detect(data, method.parse()?, edge_suppression)
    }

    /// Row-major response map of every layer
    pub fn response_maps<G>(data: &G) -> Vec<Vec<f64>>
    where
        G: ScoredGrid + ?Sized,
    {
        let grid = data.anchor_grid();
        (0..data.layer_count())
            .into_par_iter()
            .map(|layer| {
                (0..grid.rows)
                    .flat_map(|r| (0..grid.cols).map(move |c| (r, c)))
                    .map(|(r, c)| data.response(layer, r, c))
                    .collect()
            })
            .collect()
    }

    /// Strictly greater than every existing neighbour in the 3x3x3 block
    pub fn is_strict_maximum(maps: &[Vec<f64>], grid: AnchorGrid, layer: usize, row: usize, col: usize) -> bool {
        let v = maps[layer][row * grid.cols + col];
        let layers = layer.saturating_sub(1)..=(layer + 1).min(maps.len() - 1);
        for l in layers {
            for r in row.saturating_sub(1)..=(row + 1).min(grid.rows - 1) {
                for c in col.saturating_sub(1)..=(col + 1).min(grid.cols - 1) {
                    if l == layer && r == row && c == col {
                        continue;
                    }
                    if !(v > maps[l][r * grid.cols + c]) {
                        return false;
                    }
                }
            }
        }
        true
    }
}
