// src/analysis/speed_distance.rs
//
// Windowed speed and cumulative distance from pitch-plane positions.
//
// Each track's frames are cut into non-overlapping windows of W frames.
// Window k starts at frame kW and ends at frame min(kW + W, n - 1); the
// straight-line distance between the two endpoint positions, over the
// elapsed time, is the window's speed. Every frame inside the window gets
// that one speed and the cumulative distance including the window, so
// speed is piecewise-constant and distance never decreases.
//
// A window whose endpoint is missing or off-pitch is skipped. Frames in a
// skipped window keep the distance accumulated so far (once there is one)
// but get no speed.
//
// Tracks are independent, so they are measured in parallel and written back
// sequentially.

use crate::error::{PipelineError, Result};
use crate::track_store::{FrameTracks, TrackStore};
use crate::types::{EntityClass, TrackId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicsConfig {
    /// Frames per measurement window
    pub window_frames: usize,
    /// Entity classes that get speed and distance
    pub classes: Vec<EntityClass>,
}

impl Default for KinematicsConfig {
    fn default() -> Self {
        Self {
            window_frames: 5,
            classes: vec![EntityClass::Players, EntityClass::Referees],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KinematicsStats {
    pub windows_measured: usize,
    pub windows_skipped: usize,
}

/// One frame's output for one track.
struct FrameKinematics {
    frame: usize,
    speed: Option<f64>,
    distance: f64,
}

struct TrackKinematics {
    track_id: TrackId,
    frames: Vec<FrameKinematics>,
    measured: usize,
    skipped: usize,
}

pub struct SpeedDistanceEstimator {
    config: KinematicsConfig,
    frame_rate: f64,
}

impl SpeedDistanceEstimator {
    pub fn new(config: KinematicsConfig, frame_rate: f64) -> Result<Self> {
        if config.window_frames == 0 {
            return Err(PipelineError::InvalidConfig("kinematics.window_frames must be > 0".into()));
        }
        if !(frame_rate > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "frame rate must be positive, got {}",
                frame_rate
            )));
        }
        Ok(Self { config, frame_rate })
    }

    /// Fill `speed` and `distance` for every track of the configured classes.
    pub fn add_speed_and_distance(&self, store: &mut TrackStore) -> KinematicsStats {
        let mut stats = KinematicsStats::default();

        for &class in &self.config.classes {
            let ids: Vec<TrackId> = store.track_ids(class).into_iter().collect();
            let frames = store.frames(class);

            let results: Vec<TrackKinematics> = ids
                .par_iter()
                .map(|&id| self.measure_track(frames, id))
                .collect();

            let frames = store.frames_mut(class);
            for track in results {
                stats.windows_measured += track.measured;
                stats.windows_skipped += track.skipped;
                for k in track.frames {
                    if let Some(record) = frames[k.frame].get_mut(&track.track_id) {
                        record.speed = k.speed;
                        record.distance = Some(k.distance);
                    }
                }
            }
            debug!("Kinematics for {}: {} tracks", class, ids.len());
        }

        info!(
            "Speed/distance: {} windows measured, {} skipped",
            stats.windows_measured, stats.windows_skipped
        );
        stats
    }

    fn measure_track(&self, frames: &[FrameTracks], track_id: TrackId) -> TrackKinematics {
        let n = frames.len();
        let w = self.config.window_frames;
        let mut out = TrackKinematics {
            track_id,
            frames: Vec::new(),
            measured: 0,
            skipped: 0,
        };
        let mut total: Option<f64> = None;

        for start in (0..n).step_by(w) {
            let end = (start + w).min(n.saturating_sub(1));
            if end <= start {
                continue;
            }
            let present: Vec<usize> = (start..end).filter(|&f| frames[f].contains_key(&track_id)).collect();
            if present.is_empty() {
                continue;
            }

            let pitch_at = |f: usize| frames[f].get(&track_id).and_then(|r| r.transformed_position);
            match (pitch_at(start), pitch_at(end)) {
                (Some(a), Some(b)) => {
                    let meters = a.distance(&b);
                    let seconds = (end - start) as f64 / self.frame_rate;
                    let speed_kmh = meters / seconds * 3.6;
                    let cumulative = total.unwrap_or(0.0) + meters;
                    total = Some(cumulative);
                    out.measured += 1;
                    out.frames.extend(present.into_iter().map(|frame| FrameKinematics {
                        frame,
                        speed: Some(speed_kmh),
                        distance: cumulative,
                    }));
                }
                _ => {
                    out.skipped += 1;
                    if let Some(cumulative) = total {
                        out.frames.extend(present.into_iter().map(|frame| FrameKinematics {
                            frame,
                            speed: None,
                            distance: cumulative,
                        }));
                    }
                }
            }
        }

        // The last frame only closes a window, so it carries the final total.
        let last = n.saturating_sub(1);
        if let Some(cumulative) = total {
            if frames[last].contains_key(&track_id) {
                out.frames.push(FrameKinematics {
                    frame: last,
                    speed: None,
                    distance: cumulative,
                });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BBox, Point};
    use proptest::prelude::*;

    /// Player 7 walks along x; `None` entries are off-pitch frames.
    fn store_from_positions(positions: &[Option<f64>]) -> TrackStore {
        let mut store = TrackStore::with_frames(positions.len());
        for (f, x) in positions.iter().enumerate() {
            store.insert(EntityClass::Players, f, 7, BBox::default()).unwrap();
            store.record_mut(EntityClass::Players, f, 7).unwrap().transformed_position =
                x.map(|x| Point::new(x, 10.0));
        }
        store
    }

    fn estimator() -> SpeedDistanceEstimator {
        SpeedDistanceEstimator::new(KinematicsConfig::default(), 24.0).unwrap()
    }

    fn record(store: &TrackStore, f: usize) -> (Option<f64>, Option<f64>) {
        let r = store.get(EntityClass::Players, f, 7).unwrap();
        (r.speed, r.distance)
    }

    #[test]
    fn test_constant_speed_per_window() {
        let positions: Vec<Option<f64>> = (0..11).map(|i| Some(i as f64)).collect();
        let mut store = store_from_positions(&positions);
        let stats = estimator().add_speed_and_distance(&mut store);

        assert_eq!(stats.windows_measured, 2);
        // 5 m over 5 frames at 24 fps
        let expected = 5.0 / (5.0 / 24.0) * 3.6;
        for f in 0..5 {
            let (speed, dist) = record(&store, f);
            assert!((speed.unwrap() - expected).abs() < 1e-9);
            assert_eq!(dist, Some(5.0));
        }
        for f in 5..10 {
            assert_eq!(record(&store, f).1, Some(10.0));
        }
        // Last frame closes a window but starts none
        assert_eq!(record(&store, 10), (None, Some(10.0)));
    }

    #[test]
    fn test_undefined_endpoint_skips_window_and_carries_distance() {
        let mut positions: Vec<Option<f64>> = (0..11).map(|i| Some(i as f64)).collect();
        positions[10] = None;
        let mut store = store_from_positions(&positions);
        let stats = estimator().add_speed_and_distance(&mut store);

        assert_eq!(stats, KinematicsStats { windows_measured: 1, windows_skipped: 1 });
        for f in 5..10 {
            assert_eq!(record(&store, f), (None, Some(5.0)));
        }
        assert_eq!(record(&store, 10), (None, Some(5.0)));
    }

    #[test]
    fn test_track_absent_at_last_frame_gets_no_trailing_distance() {
        let mut store = TrackStore::with_frames(11);
        for f in 0..10 {
            store.insert(EntityClass::Players, f, 7, BBox::default()).unwrap();
            store.record_mut(EntityClass::Players, f, 7).unwrap().transformed_position =
                Some(Point::new(f as f64, 0.0));
        }
        estimator().add_speed_and_distance(&mut store);
        assert_eq!(record(&store, 4).1, Some(5.0));
        assert_eq!(record(&store, 9), (None, Some(5.0)));
        assert_eq!(store.frames(EntityClass::Players)[10].len(), 0);
    }

    #[test]
    fn test_short_track_reports_nothing() {
        let mut store = TrackStore::with_frames(11);
        for f in 0..3 {
            store.insert(EntityClass::Players, f, 7, BBox::default()).unwrap();
            store.record_mut(EntityClass::Players, f, 7).unwrap().transformed_position =
                Some(Point::new(f as f64, 0.0));
        }
        estimator().add_speed_and_distance(&mut store);
        for f in 0..3 {
            assert_eq!(record(&store, f), (None, None));
        }
    }

    #[test]
    fn test_unconfigured_classes_untouched() {
        let mut store = TrackStore::with_frames(6);
        for f in 0..6 {
            store.insert(EntityClass::Ball, f, 1, BBox::default()).unwrap();
            store.record_mut(EntityClass::Ball, f, 1).unwrap().transformed_position =
                Some(Point::new(f as f64, 0.0));
        }
        estimator().add_speed_and_distance(&mut store);
        assert!(store.get(EntityClass::Ball, 0, 1).unwrap().speed.is_none());
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let zero_window = KinematicsConfig {
            window_frames: 0,
            ..Default::default()
        };
        assert!(SpeedDistanceEstimator::new(zero_window, 24.0).is_err());
        assert!(SpeedDistanceEstimator::new(KinematicsConfig::default(), 0.0).is_err());
    }

    proptest! {
        #[test]
        fn prop_distance_monotonic_and_speed_windowed(
            xs in proptest::collection::vec(proptest::option::weighted(0.85, -50.0f64..50.0), 2..60),
            window in 1usize..8,
        ) {
            let mut store = store_from_positions(&xs);
            let config = KinematicsConfig { window_frames: window, ..Default::default() };
            SpeedDistanceEstimator::new(config, 25.0).unwrap().add_speed_and_distance(&mut store);

            let mut last = 0.0f64;
            for f in 0..xs.len() {
                let (speed, dist) = record(&store, f);
                if let Some(s) = speed {
                    prop_assert!(s >= 0.0);
                    let window_start = f - f % window;
                    prop_assert_eq!(record(&store, window_start).0, Some(s));
                }
                if let Some(d) = dist {
                    prop_assert!(d >= last);
                    last = d;
                }
            }
        }
    }
}
