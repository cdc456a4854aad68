//! Rendering of keypoints, response maps and best-bin histograms.

use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};
use slp2_core::{level_scale, Image, Keypoint, ScoredGrid};
use slp2_hist::{bin_centre, Histogram};

const LEVEL_COLORS: [[u8; 3]; 6] = [
    [255, 0, 0],
    [255, 160, 0],
    [255, 255, 0],
    [0, 220, 0],
    [0, 160, 255],
    [200, 0, 255],
];

/// Convert a normalized image to 8-bit grayscale
pub fn to_gray(img: &Image) -> GrayImage {
    GrayImage::from_fn(img.width() as u32, img.height() as u32, |x, y| {
        Luma([(img.get(x as usize, y as usize).clamp(0.0, 1.0) * 255.0).round() as u8])
    })
}

/// Circles sized by level with a tick along the orientation, if any
pub fn draw_keypoints(img: &Image, keypoints: &[Keypoint]) -> RgbaImage {
    let mut output = image::DynamicImage::ImageLuma8(to_gray(img)).into_rgba8();
    for kp in keypoints {
        let [r, g, b] = LEVEL_COLORS[kp.level % LEVEL_COLORS.len()];
        let color = Rgba([r, g, b, 255]);
        let radius = level_scale(kp.level).max(2.0);
        draw_hollow_circle_mut(&mut output, (kp.x.round() as i32, kp.y.round() as i32), radius as i32, color);
        if let Some(theta) = kp.orientation {
            let end = (kp.x + radius * theta.cos(), kp.y + radius * theta.sin());
            draw_line_segment_mut(
                &mut output,
                (kp.x as f32, kp.y as f32),
                (end.0 as f32, end.1 as f32),
                color,
            );
        }
    }
    output
}

/// Response of every layer as a normalized tile, tiles left to right.
///
/// Each anchor becomes a `cell`x`cell` block; a one pixel gap separates tiles.
pub fn draw_maps<G: ScoredGrid + ?Sized>(data: &G, cell: u32) -> GrayImage {
    let grid = data.anchor_grid();
    let cell = cell.max(1);
    let layers = data.layer_count() as u32;
    let tile_w = grid.cols as u32 * cell;
    let tile_h = grid.rows as u32 * cell;
    let mut out = GrayImage::new((tile_w + 1) * layers.max(1), tile_h.max(1));

    for layer in 0..data.layer_count() {
        let values: Vec<f64> = (0..grid.rows)
            .flat_map(|r| (0..grid.cols).map(move |c| (r, c)))
            .map(|(r, c)| data.response(layer, r, c))
            .collect();
        let (lo, hi) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let span = if hi > lo { hi - lo } else { 1.0 };
        let x0 = layer as u32 * (tile_w + 1);
        for (i, v) in values.iter().enumerate() {
            let level = (((v - lo) / span) * 255.0).round() as u8;
            let (r, c) = ((i / grid.cols) as u32, (i % grid.cols) as u32);
            for dy in 0..cell {
                for dx in 0..cell {
                    out.put_pixel(x0 + c * cell + dx, r * cell + dy, Luma([level]));
                }
            }
        }
    }
    out
}

/// Best-bin map per layer: hue from the bin angle, brightness from strength
pub fn histvis(hist: &Histogram, cell: u32) -> RgbImage {
    let grid = hist.grid();
    let cell = cell.max(1);
    let layers = hist.len() as u32;
    let tile_w = grid.cols as u32 * cell;
    let tile_h = grid.rows as u32 * cell;
    let mut out = RgbImage::new((tile_w + 1) * layers.max(1), tile_h.max(1));

    for layer in 0..hist.len() {
        let best: Vec<(usize, f64)> = (0..grid.rows)
            .flat_map(|r| (0..grid.cols).map(move |c| (r, c)))
            .map(|(r, c)| hist.best(layer, r, c).unwrap_or((0, 0.0)))
            .collect();
        let max = best.iter().map(|b| b.1).fold(0.0, f64::max);
        let x0 = layer as u32 * (tile_w + 1);
        for (i, &(bin, value)) in best.iter().enumerate() {
            let hue = bin_centre(bin, hist.nbins()) / std::f64::consts::TAU;
            let brightness = if max > 0.0 { value / max } else { 0.0 };
            let color = hsv_to_rgb(hue, 1.0, brightness);
            let (r, c) = ((i / grid.cols) as u32, (i % grid.cols) as u32);
            for dy in 0..cell {
                for dx in 0..cell {
                    out.put_pixel(x0 + c * cell + dx, r * cell + dy, color);
                }
            }
        }
    }
    out
}

/// `h`, `s`, `v` in [0, 1]
fn hsv_to_rgb(h: f64, s: f64, v: f64) -> Rgb<u8> {
    let h6 = (h.rem_euclid(1.0)) * 6.0;
    let c = v * s;
    let x = c * (1.0 - (h6 % 2.0 - 1.0).abs());
    let (r, g, b) = match h6 as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = v - c;
    let to_u8 = |t: f64| ((t + m).clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgb([to_u8(r), to_u8(g), to_u8(b)])
}
