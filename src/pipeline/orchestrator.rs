// src/pipeline/orchestrator.rs
//
// Runs the post-processing stages over a whole video in a fixed order:
//
//   ball interpolation → positions → camera motion → adjusted positions
//     → pitch transform → speed/distance → teams → possession → alerts
//
// Each stage finishes over every frame before the next begins and writes
// only its own fields of the track store. Calibration is fitted once when
// the pipeline is built.

use crate::analysis::ball_assigner::PlayerBallAssigner;
use crate::analysis::ball_interpolator::interpolate_ball_positions;
use crate::analysis::camera_motion::{CameraMotionEstimator, CameraMovement};
use crate::analysis::match_alerts::AlertMonitor;
use crate::analysis::position_adjuster::add_adjusted_positions;
use crate::analysis::speed_distance::SpeedDistanceEstimator;
use crate::analysis::team_assigner::TeamAssigner;
use crate::analysis::view_transformer::ViewTransformer;
use crate::error::{PipelineError, Result};
use crate::pipeline::event_bus::{EventBus, MatchEvent};
use crate::pipeline::metrics::{MetricsSummary, PipelineMetrics};
use crate::report::MatchReport;
use crate::track_store::TrackStore;
use crate::types::{Config, EntityClass, Rgb, Team};
use image::RgbImage;
use serde::Serialize;
use std::time::Instant;
use tracing::info;

const MAX_PENDING_EVENTS: usize = 4096;

#[derive(Debug, Clone, Serialize)]
pub struct MatchOutput {
    /// Team in control, one entry per frame
    pub possession: Vec<Team>,
    pub camera_movement: Vec<CameraMovement>,
    /// Centroid colour per team, indexed by `Team::index()`
    pub team_colors: Option<[Rgb; 2]>,
    pub events: Vec<MatchEvent>,
    pub report: MatchReport,
    pub metrics: MetricsSummary,
}

pub struct MatchPipeline {
    config: Config,
    camera: CameraMotionEstimator,
    view: ViewTransformer,
    kinematics: SpeedDistanceEstimator,
    possession: PlayerBallAssigner,
}

impl MatchPipeline {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let view = ViewTransformer::new(&config.view)?;
        let kinematics = SpeedDistanceEstimator::new(config.kinematics.clone(), config.video.frame_rate)?;

        Ok(Self {
            camera: CameraMotionEstimator::new(config.camera_motion.clone()),
            possession: PlayerBallAssigner::new(config.possession.clone()),
            view,
            kinematics,
            config,
        })
    }

    /// Enrich `store` in place and return the per-frame match series.
    pub fn run(&self, frames: &[RgbImage], store: &mut TrackStore) -> Result<MatchOutput> {
        if frames.is_empty() {
            return Err(PipelineError::EmptyFrames);
        }
        if frames.len() != store.frame_count() {
            return Err(PipelineError::FrameCountMismatch {
                class: "video".to_string(),
                expected: store.frame_count(),
                got: frames.len(),
            });
        }
        let metrics = PipelineMetrics::new();
        let m = &metrics;
        m.add(&m.total_frames, frames.len());
        info!("Processing {} frames", frames.len());

        let ball = interpolate_ball_positions(store.frames_mut(EntityClass::Ball), self.config.ball.track_id);
        m.add(&m.ball_frames_interpolated, ball.filled_frames);

        store.assign_positions();

        let started = Instant::now();
        let camera = self.camera.estimate_frames(frames)?;
        m.set_timing(&m.camera_time_us, started.elapsed().as_micros() as u64);
        m.add(&m.camera_frames_moving, camera.moving_frames);
        m.add(&m.camera_frames_degraded, camera.degraded_frames);

        add_adjusted_positions(store, &camera.movements)?;

        let view = self.view.add_transformed_positions(store);
        m.add(&m.positions_outside_pitch, view.outside);

        let kin = self.kinematics.add_speed_and_distance(store);
        m.add(&m.kinematic_windows_measured, kin.windows_measured);
        m.add(&m.kinematic_windows_skipped, kin.windows_skipped);

        let started = Instant::now();
        let teams = TeamAssigner::new(self.config.teams.clone()).assign_teams(frames, store)?;
        m.set_timing(&m.teams_time_us, started.elapsed().as_micros() as u64);
        m.add(&m.degenerate_crops, teams.degenerate_crops);

        let possession = self.possession.assign_possession(store, self.config.ball.track_id);
        m.add(&m.possession_frames_carried, possession.carried_frames);

        let mut bus = EventBus::new(MAX_PENDING_EVENTS);
        let monitor = AlertMonitor::new(self.config.report.clone(), self.config.video.frame_rate);
        let alerts = monitor.scan(&possession.sequence, store, &mut bus);
        m.add(&m.alerts_published, alerts);

        let report = MatchReport::build(store, &possession.sequence, &self.config.report);
        info!(
            "Possession: team 1 {:.1}%, team 2 {:.1}%",
            report.possession.team1, report.possession.team2
        );

        Ok(MatchOutput {
            possession: possession.sequence,
            camera_movement: camera.movements,
            team_colors: teams.team_colors,
            events: bus.drain(),
            report,
            metrics: m.summary(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BBox, TrackId};
    use image::Rgb as Pixel;

    const GRASS: [u8; 3] = [40, 140, 40];
    const RED: [u8; 3] = [220, 30, 30];
    const BLUE: [u8; 3] = [30, 40, 210];
    const FRAMES: usize = 20;

    fn players() -> [(TrackId, BBox, [u8; 3]); 3] {
        [
            (1, BBox::new(100.0, 100.0, 140.0, 200.0), RED),
            (2, BBox::new(300.0, 100.0, 340.0, 200.0), BLUE),
            (3, BBox::new(500.0, 100.0, 540.0, 200.0), RED),
        ]
    }

    fn render() -> RgbImage {
        let mut img = RgbImage::from_pixel(640, 360, Pixel(GRASS));
        for (_, b, shirt) in players() {
            for y in b.y1 as u32 + 3..(b.y1 + b.height() / 2.0) as u32 {
                for x in b.x1 as u32 + 4..b.x2 as u32 - 4 {
                    img.put_pixel(x, y, Pixel(shirt));
                }
            }
        }
        img
    }

    /// A (track 1) has the ball for frames 0-9, B (track 2) for 10-19.
    /// Ball detections are missing at frames 5 and 15.
    fn scene() -> (Vec<RgbImage>, TrackStore) {
        let mut store = TrackStore::with_frames(FRAMES);
        for f in 0..FRAMES {
            for (id, bbox, _) in players() {
                store.insert(EntityClass::Players, f, id, bbox).unwrap();
            }
            if f == 5 || f == 15 {
                continue;
            }
            let ball = if f < 10 {
                BBox::new(145.0, 195.0, 155.0, 205.0)
            } else {
                BBox::new(285.0, 195.0, 295.0, 205.0)
            };
            store.insert(EntityClass::Ball, f, 1, ball).unwrap();
        }
        (vec![render(); FRAMES], store)
    }

    #[test]
    fn test_possession_handover_end_to_end() {
        let (frames, mut store) = scene();
        let pipeline = MatchPipeline::new(Config::default()).unwrap();
        let output = pipeline.run(&frames, &mut store).unwrap();

        let mut expected = vec![Team::One; 10];
        expected.extend(vec![Team::Two; 10]);
        assert_eq!(output.possession, expected);
        assert_eq!(output.report.possession.team1, 50.0);
        assert_eq!(output.report.possession.team2, 50.0);

        assert_eq!(store.get(EntityClass::Players, 0, 3).unwrap().team, Some(Team::One));
        assert_eq!(store.get(EntityClass::Players, 0, 2).unwrap().team, Some(Team::Two));
        assert!(store.get(EntityClass::Players, 4, 1).unwrap().has_ball);
        assert!(store.get(EntityClass::Players, 15, 2).unwrap().has_ball);

        assert_eq!(output.metrics.ball_frames_interpolated, 2);
        assert_eq!(output.camera_movement.len(), FRAMES);
        assert!(output.camera_movement.iter().all(|m| *m == CameraMovement::default()));
    }

    #[test]
    fn test_every_record_gets_a_position() {
        let (frames, mut store) = scene();
        MatchPipeline::new(Config::default())
            .unwrap()
            .run(&frames, &mut store)
            .unwrap();
        for class in EntityClass::ALL {
            for frame in store.frames(class) {
                for r in frame.values() {
                    assert!(r.position.is_some());
                    assert!(r.adjusted_position.is_some());
                }
            }
        }
    }

    #[test]
    fn test_repeated_runs_report_their_own_metrics() {
        let pipeline = MatchPipeline::new(Config::default()).unwrap();
        let (frames, mut store) = scene();
        let first = pipeline.run(&frames, &mut store).unwrap().metrics;
        let (frames, mut store) = scene();
        let second = pipeline.run(&frames, &mut store).unwrap().metrics;

        assert_eq!(first.total_frames, FRAMES as u64);
        assert_eq!(second.total_frames, first.total_frames);
        assert_eq!(second.ball_frames_interpolated, first.ball_frames_interpolated);
        assert_eq!(second.kinematic_windows_measured, first.kinematic_windows_measured);
        assert_eq!(second.kinematic_windows_skipped, first.kinematic_windows_skipped);
        assert_eq!(second.degenerate_crops, first.degenerate_crops);
        assert_eq!(second.possession_frames_carried, first.possession_frames_carried);
        assert_eq!(second.alerts_published, first.alerts_published);
    }

    #[test]
    fn test_frame_count_must_match_store() {
        let (frames, mut store) = scene();
        let pipeline = MatchPipeline::new(Config::default()).unwrap();
        assert!(matches!(
            pipeline.run(&frames[..10], &mut store),
            Err(PipelineError::FrameCountMismatch { .. })
        ));
        assert!(matches!(pipeline.run(&[], &mut store), Err(PipelineError::EmptyFrames)));
    }

    #[test]
    fn test_degenerate_calibration_fails_at_construction() {
        let mut config = Config::default();
        config.view.pixel_vertices = [[0.0, 0.0]; 4];
        assert!(matches!(MatchPipeline::new(config), Err(PipelineError::Calibration(_))));
    }
}
