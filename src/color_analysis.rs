// src/color_analysis.rs
//
// Shirt colour extraction from a player's bounding box.
//
// Only the upper half of the box is sampled, which is mostly shirt. Those
// pixels are split into two colour clusters; the cluster that dominates the
// crop border is the background (grass, stands) and the other cluster's
// centroid is the shirt colour.
//
// A box that clips to nothing, or to too few pixels to cluster, yields no
// colour. The caller decides what label such a player gets.

use crate::analysis::clustering::{ColorClusterer, KMeans};
use crate::types::{BBox, Rgb};
use image::RgbImage;
use tracing::debug;

// ============================================================================
// CROPPING
// ============================================================================

/// Pixel-aligned crop rectangle, `[x0, x1) x [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Crop {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

impl Crop {
    fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    fn height(&self) -> u32 {
        self.y1 - self.y0
    }
}

/// Upper half of `bbox` clipped to the frame; `None` when nothing remains.
fn shirt_region(bbox: &BBox, width: u32, height: u32) -> Option<Crop> {
    let clip = |v: f32, max: u32| -> u32 {
        if v.is_nan() || v <= 0.0 {
            0
        } else {
            (v as u32).min(max)
        }
    };
    let x0 = clip(bbox.x1, width);
    let x1 = clip(bbox.x2, width);
    let y0 = clip(bbox.y1, height);
    let y1 = clip(bbox.y2, height);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    let half = (y1 - y0) / 2;
    if half == 0 {
        return None;
    }
    Some(Crop {
        x0,
        y0,
        x1,
        y1: y0 + half,
    })
}

// ============================================================================
// SHIRT COLOUR
// ============================================================================

/// Smallest crop that is worth clustering into shirt and background.
const MIN_CROP_PIXELS: usize = 4;

/// Representative shirt colour of the player inside `bbox`.
pub fn shirt_color(frame: &RgbImage, bbox: &BBox, seed: u64) -> Option<Rgb> {
    let crop = shirt_region(bbox, frame.width(), frame.height())?;

    let mut pixels: Vec<Rgb> = Vec::with_capacity((crop.width() * crop.height()) as usize);
    for y in crop.y0..crop.y1 {
        for x in crop.x0..crop.x1 {
            let p = frame.get_pixel(x, y);
            pixels.push([p[0] as f32, p[1] as f32, p[2] as f32]);
        }
    }
    if pixels.len() < MIN_CROP_PIXELS {
        debug!("Crop {:?} too small for colour clustering", crop);
        return None;
    }

    let mut kmeans = KMeans::new(2).n_init(1).seed(seed);
    let centers = match kmeans.fit(&pixels) {
        Ok(c) => c,
        Err(e) => {
            debug!("Shirt clustering failed: {}", e);
            return None;
        }
    };

    let background = border_majority(kmeans.labels(), crop.width() as usize, crop.height() as usize);
    let shirt = 1 - background;
    Some(centers[shirt])
}

/// Cluster (0 or 1) that holds most pixels on the crop border.
/// Ties go to cluster 0.
fn border_majority(labels: &[usize], width: usize, height: usize) -> usize {
    let mut votes = [0usize; 2];
    for y in 0..height {
        for x in 0..width {
            let on_border = x == 0 || y == 0 || x + 1 == width || y + 1 == height;
            if on_border {
                votes[labels[y * width + x].min(1)] += 1;
            }
        }
    }
    if votes[1] > votes[0] {
        1
    } else {
        0
    }
}
