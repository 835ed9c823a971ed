// src/analysis/ball_interpolator.rs
//
// Fills frames where the ball was not detected.
//
// Interior gaps (a valid detection on both sides) are linearly interpolated
// per box coordinate and rounded to whole pixels. Leading and trailing gaps
// hold the nearest valid box; nothing is extrapolated. A track with no
// detection at all stays empty.

use crate::track_store::{FrameTracks, TrackRecord};
use crate::types::{BBox, TrackId};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BallInterpolation {
    /// Frames that carried a real detection
    pub detected_frames: usize,
    /// Frames filled by interpolation or hold
    pub filled_frames: usize,
}

fn lerp_bbox(a: &BBox, b: &BBox, t: f32) -> BBox {
    let lerp = |x: f32, y: f32| (x + (y - x) * t).round();
    BBox::new(
        lerp(a.x1, b.x1),
        lerp(a.y1, b.y1),
        lerp(a.x2, b.x2),
        lerp(a.y2, b.y2),
    )
}

/// Make the ball track dense over every frame.
pub fn interpolate_ball_positions(frames: &mut [FrameTracks], ball_id: TrackId) -> BallInterpolation {
    let detected: Vec<(usize, BBox)> = frames
        .iter()
        .enumerate()
        .filter_map(|(i, f)| f.get(&ball_id).map(|r| (i, r.bbox)))
        .collect();

    if detected.is_empty() {
        warn!("Ball track {} has no detections; trajectory left empty", ball_id);
        return BallInterpolation::default();
    }

    let mut filled = 0;
    // Index into `detected` of the first detection at or after the current frame
    let mut next_idx = 0;

    for (i, frame) in frames.iter_mut().enumerate() {
        while next_idx < detected.len() && detected[next_idx].0 < i {
            next_idx += 1;
        }
        if next_idx < detected.len() && detected[next_idx].0 == i {
            continue;
        }

        let prev = next_idx.checked_sub(1).map(|k| detected[k]);
        let next = detected.get(next_idx).copied();

        let bbox = match (prev, next) {
            (Some((p, a)), Some((q, b))) => {
                let t = (i - p) as f32 / (q - p) as f32;
                lerp_bbox(&a, &b, t)
            }
            (Some((_, a)), None) => a,
            (None, Some((_, b))) => b,
            (None, None) => continue,
        };

        frame.insert(ball_id, TrackRecord::new(bbox));
        filled += 1;
    }

    debug!(
        "Ball interpolation: {} detected, {} filled over {} frames",
        detected.len(),
        filled,
        frames.len()
    );

    BallInterpolation {
        detected_frames: detected.len(),
        filled_frames: filled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ball_frames(n: usize, detections: &[(usize, BBox)]) -> Vec<FrameTracks> {
        let mut frames = vec![FrameTracks::new(); n];
        for (i, b) in detections {
            frames[*i].insert(1, TrackRecord::new(*b));
        }
        frames
    }

    #[test]
    fn test_gap_is_linear_with_exact_midpoint() {
        let b0 = BBox::new(100.0, 200.0, 120.0, 230.0);
        let b10 = BBox::new(200.0, 300.0, 220.0, 330.0);
        let mut frames = ball_frames(11, &[(0, b0), (10, b10)]);

        let stats = interpolate_ball_positions(&mut frames, 1);
        assert_eq!(stats.detected_frames, 2);
        assert_eq!(stats.filled_frames, 9);

        for (i, frame) in frames.iter().enumerate() {
            let b = frame[&1].bbox;
            let step = 10.0 * i as f32;
            assert_eq!(b, BBox::new(100.0 + step, 200.0 + step, 120.0 + step, 230.0 + step));
        }
        assert_eq!(frames[5][&1].bbox, BBox::new(150.0, 250.0, 170.0, 280.0));
    }

    #[test]
    fn test_edges_hold_nearest_detection() {
        let b = BBox::new(10.0, 10.0, 20.0, 20.0);
        let c = BBox::new(40.0, 40.0, 50.0, 50.0);
        let mut frames = ball_frames(8, &[(2, b), (5, c)]);
        interpolate_ball_positions(&mut frames, 1);

        assert_eq!(frames[0][&1].bbox, b);
        assert_eq!(frames[1][&1].bbox, b);
        assert_eq!(frames[6][&1].bbox, c);
        assert_eq!(frames[7][&1].bbox, c);
    }

    #[test]
    fn test_no_detections_leaves_track_empty() {
        let mut frames = ball_frames(4, &[]);
        let stats = interpolate_ball_positions(&mut frames, 1);
        assert_eq!(stats, BallInterpolation::default());
        assert!(frames.iter().all(|f| f.is_empty()));
    }

    #[test]
    fn test_other_ids_untouched() {
        let mut frames = ball_frames(3, &[(0, BBox::new(0.0, 0.0, 2.0, 2.0))]);
        frames[1].insert(9, TrackRecord::new(BBox::new(5.0, 5.0, 6.0, 6.0)));
        interpolate_ball_positions(&mut frames, 1);
        assert_eq!(frames[1].len(), 2);
        assert!(!frames[2].contains_key(&9));
    }

    proptest! {
        #[test]
        fn prop_interior_frames_stay_between_bounds(
            x0 in 0i32..1000, y0 in 0i32..1000,
            x1 in 0i32..1000, y1 in 0i32..1000,
            gap in 1usize..40,
        ) {
            let a = BBox::new(x0 as f32, y0 as f32, x0 as f32 + 10.0, y0 as f32 + 10.0);
            let b = BBox::new(x1 as f32, y1 as f32, x1 as f32 + 10.0, y1 as f32 + 10.0);
            let n = gap + 2;
            let mut frames = ball_frames(n, &[(0, a), (n - 1, b)]);
            interpolate_ball_positions(&mut frames, 1);

            let mut last_x = a.x1;
            for frame in &frames {
                let bb = frame[&1].bbox;
                prop_assert!(bb.x1 >= a.x1.min(b.x1) && bb.x1 <= a.x1.max(b.x1));
                prop_assert!(bb.y1 >= a.y1.min(b.y1) && bb.y1 <= a.y1.max(b.y1));
                prop_assert_eq!(bb.x1.fract(), 0.0);
                if b.x1 >= a.x1 {
                    prop_assert!(bb.x1 >= last_x);
                } else {
                    prop_assert!(bb.x1 <= last_x);
                }
                last_x = bb.x1;
            }
        }
    }
}
