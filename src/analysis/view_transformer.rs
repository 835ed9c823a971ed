// src/analysis/view_transformer.rs
//
// Perspective mapping from camera pixels to metric pitch coordinates.
//
// Calibration is a fixed quadrilateral: four pixel vertices of a visible
// pitch region paired with their known positions in metres. A homography is
// fitted once as the exact four-point solution. Points outside the pixel quadrilateral are
// not mapped, since the plane model is only trusted inside the region it
// was fitted on. Points on the boundary count as inside.

use crate::error::{PipelineError, Result};
use crate::track_store::TrackStore;
use crate::types::{EntityClass, Point};
use nalgebra::{Matrix3, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Quadrilateral corners in image pixels, in boundary order
    pub pixel_vertices: [[f64; 2]; 4],
    /// The same corners on the pitch plane, metres
    pub pitch_vertices: [[f64; 2]; 4],
}

impl Default for ViewConfig {
    fn default() -> Self {
        let court_width = 68.0;
        let court_length = 23.32;
        Self {
            pixel_vertices: [[110.0, 1035.0], [265.0, 275.0], [910.0, 260.0], [1640.0, 915.0]],
            pitch_vertices: [
                [0.0, court_width],
                [0.0, 0.0],
                [court_length, 0.0],
                [court_length, court_width],
            ],
        }
    }
}

// Calibration vertices must reproject within this many metres
const MAX_CALIBRATION_ERROR: f64 = 1e-3;
const MIN_POLYGON_AREA: f64 = 1e-6;
const BOUNDARY_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewStats {
    pub mapped: usize,
    /// Positions outside the calibrated quadrilateral
    pub outside: usize,
}

pub struct ViewTransformer {
    homography: Matrix3<f64>,
    polygon: [[f64; 2]; 4],
}

impl ViewTransformer {
    /// Fit the pixel-to-pitch homography. Degenerate calibrations (collinear
    /// or repeated vertices) are rejected.
    pub fn new(config: &ViewConfig) -> Result<Self> {
        for (name, quad) in [("pixel", &config.pixel_vertices), ("pitch", &config.pitch_vertices)] {
            let area = polygon_area(quad).abs();
            if area < MIN_POLYGON_AREA {
                return Err(PipelineError::Calibration(format!(
                    "{} quadrilateral is degenerate (area {:.3e})",
                    name, area
                )));
            }
        }

        let homography = fit_quad_homography(&config.pixel_vertices, &config.pitch_vertices)?;

        debug!("View homography: {:?}", homography);
        Ok(Self {
            homography,
            polygon: config.pixel_vertices,
        })
    }

    /// Pitch coordinate for a pixel point, or `None` when the point lies
    /// outside the calibrated quadrilateral.
    pub fn transform(&self, point: &Point) -> Option<Point> {
        if !point_in_polygon(&self.polygon, point) {
            return None;
        }
        project(&self.homography, point.x, point.y)
    }

    /// Fill `transformed_position` from `adjusted_position` for every class.
    pub fn add_transformed_positions(&self, store: &mut TrackStore) -> ViewStats {
        let mut stats = ViewStats::default();
        for class in EntityClass::ALL {
            for frame in store.frames_mut(class) {
                for record in frame.values_mut() {
                    let Some(adjusted) = record.adjusted_position else {
                        continue;
                    };
                    record.transformed_position = self.transform(&adjusted);
                    if record.transformed_position.is_some() {
                        stats.mapped += 1;
                    } else {
                        stats.outside += 1;
                    }
                }
            }
        }
        info!(
            "View transform: {} positions mapped, {} outside calibration",
            stats.mapped, stats.outside
        );
        stats
    }
}

fn project(h: &Matrix3<f64>, x: f64, y: f64) -> Option<Point> {
    let p = h * Vector3::new(x, y, 1.0);
    if p[2].abs() < 1e-15 {
        return None;
    }
    let out = Point::new(p[0] / p[2], p[1] / p[2]);
    (out.x.is_finite() && out.y.is_finite()).then_some(out)
}

// ============================================================================
// HOMOGRAPHY FIT
// ============================================================================

/// Move the centroid to the origin and scale so the farthest vertex lies at
/// unit distance. Returns the transform and the conditioned vertices.
fn condition(quad: &[[f64; 2]; 4]) -> (Matrix3<f64>, [[f64; 2]; 4]) {
    let cx = quad.iter().map(|p| p[0]).sum::<f64>() / 4.0;
    let cy = quad.iter().map(|p| p[1]).sum::<f64>() / 4.0;
    let reach = quad
        .iter()
        .map(|p| (p[0] - cx).hypot(p[1] - cy))
        .fold(0.0f64, f64::max);
    let s = if reach > 0.0 { 1.0 / reach } else { 1.0 };

    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    (t, quad.map(|p| [s * (p[0] - cx), s * (p[1] - cy)]))
}

/// Exact homography through four vertex pairs, with the bottom-right entry
/// fixed to 1. Solved as an 8x8 linear system in conditioned coordinates,
/// then every pixel vertex must land on its pitch vertex.
fn fit_quad_homography(pixel: &[[f64; 2]; 4], pitch: &[[f64; 2]; 4]) -> Result<Matrix3<f64>> {
    let (t_pixel, src) = condition(pixel);
    let (t_pitch, dst) = condition(pitch);

    // u = (h0 x + h1 y + h2) / (h6 x + h7 y + 1), likewise v with h3..h5
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for (i, ([x, y], [u, v])) in src.iter().zip(&dst).enumerate() {
        a.row_mut(2 * i)
            .copy_from_slice(&[*x, *y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y]);
        a.row_mut(2 * i + 1)
            .copy_from_slice(&[0.0, 0.0, 0.0, *x, *y, 1.0, -v * x, -v * y]);
        b[2 * i] = *u;
        b[2 * i + 1] = *v;
    }

    let h = a
        .lu()
        .solve(&b)
        .ok_or_else(|| PipelineError::Calibration("vertices admit no homography".into()))?;
    let conditioned = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);

    let t_pitch_inv = t_pitch
        .try_inverse()
        .ok_or_else(|| PipelineError::Calibration("pitch vertices are degenerate".into()))?;
    let homography = t_pitch_inv * conditioned * t_pixel;

    let scale = homography[(2, 2)];
    if scale.abs() < 1e-15 {
        return Err(PipelineError::Calibration("homography is singular".into()));
    }
    let homography = homography / scale;

    for (src, dst) in pixel.iter().zip(pitch) {
        let p = project(&homography, src[0], src[1]).ok_or_else(|| {
            PipelineError::Calibration(format!("vertex {:?} maps to infinity", src))
        })?;
        let err = p.distance(&Point::from(*dst));
        if !(err <= MAX_CALIBRATION_ERROR) {
            return Err(PipelineError::Calibration(format!(
                "vertex {:?} reprojects with error {:.3e} m",
                src, err
            )));
        }
    }
    Ok(homography)
}

// ============================================================================
// POLYGON TESTS
// ============================================================================

fn polygon_area(poly: &[[f64; 2]; 4]) -> f64 {
    let mut sum = 0.0;
    for i in 0..poly.len() {
        let a = poly[i];
        let b = poly[(i + 1) % poly.len()];
        sum += a[0] * b[1] - b[0] * a[1];
    }
    0.5 * sum
}

fn on_segment(a: [f64; 2], b: [f64; 2], p: &Point) -> bool {
    let cross = (b[0] - a[0]) * (p.y - a[1]) - (b[1] - a[1]) * (p.x - a[0]);
    let len = ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2)).sqrt().max(1.0);
    if cross.abs() > BOUNDARY_TOLERANCE * len {
        return false;
    }
    p.x >= a[0].min(b[0]) - BOUNDARY_TOLERANCE
        && p.x <= a[0].max(b[0]) + BOUNDARY_TOLERANCE
        && p.y >= a[1].min(b[1]) - BOUNDARY_TOLERANCE
        && p.y <= a[1].max(b[1]) + BOUNDARY_TOLERANCE
}

/// Ray casting with explicit boundary inclusion.
fn point_in_polygon(poly: &[[f64; 2]; 4], p: &Point) -> bool {
    let n = poly.len();
    for i in 0..n {
        if on_segment(poly[i], poly[(i + 1) % n], p) {
            return true;
        }
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (poly[i][0], poly[i][1]);
        let (xj, yj) = (poly[j][0], poly[j][1]);
        if (yi > p.y) != (yj > p.y) {
            let x_cross = (xj - xi) * (p.y - yi) / (yj - yi) + xi;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
