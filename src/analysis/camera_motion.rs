// src/analysis/camera_motion.rs
//
// Camera pan estimation from raw frame pixel data.
//
// Sparse corners are selected only inside column bands of the frame that
// show static background (stands, advertising boards), never the central
// pitch where players move. Those corners are tracked frame-to-frame with
// pyramidal Lucas-Kanade optical flow and the mean displacement of the
// surviving corners is the frame's camera movement.
//
// Small mean displacements are treated as a still camera: the corners keep
// drifting with the flow but the frame reports zero movement, so sensor
// noise is not integrated into the cumulative offset. When a movement is
// accepted the corners are re-seeded from the current frame, which keeps
// the feature set fresh as the background pans out of view.
//
// Too few trackable corners (flat image, heavy blur, cut) degrades the frame
// to zero movement instead of failing the run.

use crate::error::{PipelineError, Result};
use crate::types::Point;
use image::RgbImage;
use opencv::{
    core::{self, Mat, Point2f, Rect, Scalar, Size, TermCriteria, TermCriteria_Type, Vector},
    imgproc,
    prelude::*,
    video,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraMotionConfig {
    /// Column bands `[start, end)` treated as static background.
    /// Bands beyond the frame width are clipped.
    pub mask_columns: Vec<[u32; 2]>,
    /// Maximum number of corners kept per seeding
    pub max_features: usize,
    /// Corners weaker than this fraction of the strongest are rejected
    pub quality_level: f32,
    /// Minimum spacing between accepted corners (px)
    pub min_feature_distance: f32,
    /// Side of the structure-tensor window (px, odd)
    pub block_size: usize,
    /// Side of the Lucas-Kanade patch (px, odd)
    pub lk_window: usize,
    /// Pyramid levels above full resolution
    pub pyramid_levels: usize,
    pub lk_max_iterations: usize,
    /// Convergence threshold on the per-iteration update (px)
    pub lk_epsilon: f32,
    /// Mean displacement at or below this is a still camera (px/frame)
    pub min_movement_px: f32,
    /// Fewer surviving corners than this degrades the frame to zero motion
    pub min_tracked_features: usize,
}

impl Default for CameraMotionConfig {
    fn default() -> Self {
        Self {
            mask_columns: vec![[0, 20], [900, 1050]],
            max_features: 100,
            quality_level: 0.3,
            min_feature_distance: 3.0,
            block_size: 7,
            lk_window: 15,
            pyramid_levels: 2,
            lk_max_iterations: 10,
            lk_epsilon: 0.03,
            min_movement_px: 5.0,
            min_tracked_features: 1,
        }
    }
}

// ============================================================================
// TYPES
// ============================================================================

/// Image-space displacement of the static background between a frame and
/// its predecessor (new minus old), in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraMovement {
    pub dx: f32,
    pub dy: f32,
}

impl CameraMovement {
    pub fn new(dx: f32, dy: f32) -> Self {
        Self { dx, dy }
    }

    pub fn magnitude(&self) -> f32 {
        (self.dx * self.dx + self.dy * self.dy).sqrt()
    }
}

/// Per-frame movement plus counts for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct CameraMotionEstimate {
    pub movements: Vec<CameraMovement>,
    /// Frames whose movement exceeded the still-camera threshold
    pub moving_frames: usize,
    /// Frames degraded to zero for lack of trackable corners
    pub degraded_frames: usize,
}

/// Running sum of per-frame movements. Entry `i` is the total background
/// displacement from frame 0 to frame `i`.
pub fn cumulative_offsets(movements: &[CameraMovement]) -> Vec<Point> {
    let mut x = 0.0f64;
    let mut y = 0.0f64;
    movements
        .iter()
        .map(|m| {
            x += m.dx as f64;
            y += m.dy as f64;
            Point::new(x, y)
        })
        .collect()
}

// ============================================================================
// GRAYSCALE FRAME WRAPPER
// ============================================================================

/// Row-major grayscale frame: pixel at (x, y) = data[y * width + x]
#[derive(Clone)]
pub struct GrayFrame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

impl GrayFrame {
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            data,
            width,
            height,
        }
    }

    fn to_mat(&self) -> Result<Mat> {
        let flat = Mat::from_slice(self.data.as_slice())?;
        let mat = flat.reshape(1, self.height as i32)?;
        Ok(mat.try_clone()?)
    }
}

/// Single-channel copy of a decoded RGB frame
fn rgb_to_gray(image: &RgbImage) -> Result<Mat> {
    let flat = Mat::from_slice(image.as_raw().as_slice())?;
    let rgb = flat.reshape(3, image.height() as i32)?;
    let mut gray = Mat::default();
    imgproc::cvt_color(&rgb, &mut gray, imgproc::COLOR_RGB2GRAY, 0)?;
    Ok(gray)
}

// ============================================================================
// CAMERA MOTION ESTIMATOR
// ============================================================================

pub struct CameraMotionEstimator {
    config: CameraMotionConfig,
}

impl CameraMotionEstimator {
    pub fn new(config: CameraMotionConfig) -> Self {
        Self { config }
    }

    /// Estimate per-frame camera movement over decoded RGB frames.
    /// Frame 0 always reports zero movement.
    pub fn estimate_frames(&self, frames: &[RgbImage]) -> Result<CameraMotionEstimate> {
        self.run(frames.iter().map(rgb_to_gray))
    }

    /// Same as [`estimate_frames`](Self::estimate_frames) over grayscale frames.
    pub fn estimate(&self, frames: &[GrayFrame]) -> Result<CameraMotionEstimate> {
        self.run(frames.iter().map(GrayFrame::to_mat))
    }

    fn run<I: Iterator<Item = Result<Mat>>>(&self, mut frames: I) -> Result<CameraMotionEstimate> {
        let mut prev = frames.next().ok_or(PipelineError::EmptyFrames)??;
        let size = (prev.cols(), prev.rows());

        let mut estimate = CameraMotionEstimate {
            movements: vec![CameraMovement::default()],
            ..Default::default()
        };

        let mut features = self.seed_corners(&prev)?;

        for (offset, frame) in frames.enumerate() {
            let frame_idx = offset + 1;
            let curr = frame?;
            if (curr.cols(), curr.rows()) != size {
                return Err(PipelineError::FrameSizeMismatch {
                    frame: frame_idx,
                    expected: (size.0 as u32, size.1 as u32),
                    got: (curr.cols() as u32, curr.rows() as u32),
                });
            }

            if features.is_empty() {
                features = self.seed_corners(&prev)?;
            }

            let tracked = self.track_corners(&prev, &curr, &features)?;

            if tracked.is_empty() || tracked.len() < self.config.min_tracked_features {
                debug!(
                    "Frame {}: {} of {} corners tracked, assuming still camera",
                    frame_idx,
                    tracked.len(),
                    features.len()
                );
                estimate.degraded_frames += 1;
                estimate.movements.push(CameraMovement::default());
                features = self.seed_corners(&curr)?;
                prev = curr;
                continue;
            }

            let n = tracked.len() as f32;
            let dx = tracked.iter().map(|(p, q)| q.x - p.x).sum::<f32>() / n;
            let dy = tracked.iter().map(|(p, q)| q.y - p.y).sum::<f32>() / n;
            let movement = CameraMovement::new(dx, dy);

            if movement.magnitude() > self.config.min_movement_px {
                estimate.moving_frames += 1;
                estimate.movements.push(movement);
                features = self.seed_corners(&curr)?;
            } else {
                estimate.movements.push(CameraMovement::default());
                features = tracked.into_iter().map(|(_, q)| q).collect();
            }
            prev = curr;
        }

        info!(
            "Camera motion: {} frames, {} moving, {} degraded",
            estimate.movements.len(),
            estimate.moving_frames,
            estimate.degraded_frames
        );
        Ok(estimate)
    }

    /// 8-bit mask, 255 inside the configured column bands.
    fn column_mask(&self, cols: i32, rows: i32) -> Result<Option<Mat>> {
        let mut mask = Mat::new_rows_cols_with_default(rows, cols, core::CV_8UC1, Scalar::all(0.0))?;
        let mut any = false;
        for band in &self.config.mask_columns {
            let start = (band[0] as i32).min(cols);
            let end = (band[1] as i32).min(cols);
            if end > start {
                imgproc::rectangle(
                    &mut mask,
                    Rect::new(start, 0, end - start, rows),
                    Scalar::all(255.0),
                    -1,
                    imgproc::LINE_8,
                    0,
                )?;
                any = true;
            }
        }
        Ok(any.then_some(mask))
    }

    /// Shi-Tomasi corners inside the background mask, strongest first.
    fn seed_corners(&self, gray: &Mat) -> Result<Vec<Point2f>> {
        let Some(mask) = self.column_mask(gray.cols(), gray.rows())? else {
            return Ok(Vec::new());
        };
        let mut corners = Vector::<Point2f>::new();
        imgproc::good_features_to_track(
            gray,
            &mut corners,
            self.config.max_features as i32,
            self.config.quality_level as f64,
            self.config.min_feature_distance as f64,
            &mask,
            self.config.block_size as i32,
            false,
            0.04,
        )?;
        Ok(corners.to_vec())
    }

    /// Pyramidal Lucas-Kanade from `prev` to `curr`. Returns (old, new)
    /// pairs for the corners whose status is set and which land inside the
    /// frame.
    fn track_corners(
        &self,
        prev: &Mat,
        curr: &Mat,
        features: &[Point2f],
    ) -> Result<Vec<(Point2f, Point2f)>> {
        if features.is_empty() {
            return Ok(Vec::new());
        }
        let prev_pts = Vector::<Point2f>::from_slice(features);
        let mut next_pts = Vector::<Point2f>::new();
        let mut status = Vector::<u8>::new();
        let mut err = Vector::<f32>::new();

        let criteria = TermCriteria::new(
            TermCriteria_Type::COUNT as i32 | TermCriteria_Type::EPS as i32,
            self.config.lk_max_iterations as i32,
            self.config.lk_epsilon as f64,
        )?;
        let window = self.config.lk_window as i32;

        video::calc_optical_flow_pyr_lk(
            prev,
            curr,
            &prev_pts,
            &mut next_pts,
            &mut status,
            &mut err,
            Size::new(window, window),
            self.config.pyramid_levels as i32,
            criteria,
            0,
            1e-4,
        )?;

        let (w, h) = (curr.cols() as f32, curr.rows() as f32);
        let tracked = features
            .iter()
            .zip(next_pts.iter())
            .zip(status.iter())
            .filter(|(_, ok)| *ok != 0)
            .map(|((p, q), _)| (*p, q))
            .filter(|(_, q)| {
                q.x.is_finite() && q.y.is_finite() && q.x >= 0.0 && q.y >= 0.0 && q.x < w && q.y < h
            })
            .collect();
        Ok(tracked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: usize = 200;
    const H: usize = 120;

    /// Smooth 2D texture whose content is moved right by `shift_x` pixels.
    fn textured(shift_x: f32) -> GrayFrame {
        let mut data = vec![0u8; W * H];
        for y in 0..H {
            for x in 0..W {
                let sx = x as f32 - shift_x;
                let v = 128.0 + 50.0 * (sx / 6.0).sin() + 50.0 * (y as f32 / 7.0).sin();
                data[y * W + x] = v.round().clamp(0.0, 255.0) as u8;
            }
        }
        GrayFrame::new(data, W, H)
    }

    fn test_config() -> CameraMotionConfig {
        CameraMotionConfig {
            mask_columns: vec![[10, 60], [140, 180]],
            min_movement_px: 2.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_still_camera_reports_zero() {
        let est = CameraMotionEstimator::new(test_config());
        let frame = textured(0.0);
        let result = est.estimate(&[frame.clone(), frame.clone(), frame]).unwrap();

        assert_eq!(result.movements.len(), 3);
        assert!(result.movements.iter().all(|m| *m == CameraMovement::default()));
        assert_eq!(result.moving_frames, 0);
        assert_eq!(result.degraded_frames, 0);
    }

    #[test]
    fn test_horizontal_pan_is_recovered() {
        let est = CameraMotionEstimator::new(test_config());
        let result = est.estimate(&[textured(0.0), textured(6.0)]).unwrap();

        let m = result.movements[1];
        assert!((m.dx - 6.0).abs() < 1.0, "expected dx ~ 6, got {}", m.dx);
        assert!(m.dy.abs() < 1.0, "expected dy ~ 0, got {}", m.dy);
        assert_eq!(result.moving_frames, 1);
    }

    #[test]
    fn test_flat_frames_degrade_to_zero() {
        let est = CameraMotionEstimator::new(test_config());
        let flat = GrayFrame::new(vec![90u8; W * H], W, H);
        let result = est.estimate(&[flat.clone(), flat.clone(), flat]).unwrap();

        assert!(result.movements.iter().all(|m| *m == CameraMovement::default()));
        assert_eq!(result.degraded_frames, 2);
    }

    #[test]
    fn test_features_stay_inside_mask() {
        let est = CameraMotionEstimator::new(test_config());
        let gray = textured(0.0).to_mat().unwrap();
        let features = est.seed_corners(&gray).unwrap();

        assert!(!features.is_empty());
        assert!(features.len() <= 100);
        for f in &features {
            let x = f.x;
            assert!((10.0..60.0).contains(&x) || (140.0..180.0).contains(&x), "x = {}", x);
        }
    }

    #[test]
    fn test_no_mask_band_means_no_corners() {
        let est = CameraMotionEstimator::new(CameraMotionConfig {
            mask_columns: vec![[500, 600]],
            ..test_config()
        });
        let gray = textured(0.0).to_mat().unwrap();
        assert!(est.seed_corners(&gray).unwrap().is_empty());

        let result = est.estimate(&[textured(0.0), textured(6.0)]).unwrap();
        assert_eq!(result.movements[1], CameraMovement::default());
        assert_eq!(result.degraded_frames, 1);
    }

    #[test]
    fn test_rgb_frames_match_gray_estimate() {
        let est = CameraMotionEstimator::new(test_config());
        let to_rgb = |g: &GrayFrame| {
            RgbImage::from_fn(W as u32, H as u32, |x, y| {
                let v = g.data[y as usize * W + x as usize];
                image::Rgb([v, v, v])
            })
        };
        let frames = [to_rgb(&textured(0.0)), to_rgb(&textured(6.0))];
        let result = est.estimate_frames(&frames).unwrap();

        assert!((result.movements[1].dx - 6.0).abs() < 1.0);
        assert_eq!(result.moving_frames, 1);
    }

    #[test]
    fn test_empty_and_mismatched_input() {
        let est = CameraMotionEstimator::new(test_config());
        assert!(matches!(est.estimate(&[]), Err(PipelineError::EmptyFrames)));

        let small = GrayFrame::new(vec![0u8; 50 * 50], 50, 50);
        let err = est.estimate(&[textured(0.0), small]).unwrap_err();
        assert!(matches!(err, PipelineError::FrameSizeMismatch { frame: 1, .. }));
    }

    #[test]
    fn test_cumulative_offsets_running_sum() {
        let moves = vec![
            CameraMovement::new(0.0, 0.0),
            CameraMovement::new(6.0, -1.0),
            CameraMovement::new(0.0, 0.0),
            CameraMovement::new(-2.0, 3.0),
        ];
        let offsets = cumulative_offsets(&moves);
        assert_eq!(offsets[1], Point::new(6.0, -1.0));
        assert_eq!(offsets[2], Point::new(6.0, -1.0));
        assert_eq!(offsets[3], Point::new(4.0, 2.0));
    }
}
