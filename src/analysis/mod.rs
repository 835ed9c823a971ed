// src/analysis/mod.rs
//
// Post-processing stages, in pipeline order.
//
// Signal flow:
//   Ball detections   → ball_interpolator ──────────────┐
//   Raw frames        → camera_motion → position_adjuster ┼→ view_transformer → speed_distance
//   Player crops      → team_assigner (clustering) ──────┤
//   Ball + players    → ball_assigner ────────────────────┴→ match_alerts
//
// Orchestrated by pipeline::orchestrator::MatchPipeline.

pub mod ball_assigner;
pub mod ball_interpolator;
pub mod camera_motion;
pub mod clustering;
pub mod match_alerts;
pub mod position_adjuster;
pub mod speed_distance;
pub mod team_assigner;
pub mod view_transformer;

pub use ball_assigner::{ContactPoint, PlayerBallAssigner, PossessionConfig, PossessionResult};
pub use camera_motion::{CameraMotionConfig, CameraMotionEstimator, CameraMovement, GrayFrame};
pub use clustering::{ClusterError, ColorClusterer, KMeans};
pub use speed_distance::{KinematicsConfig, SpeedDistanceEstimator};
pub use team_assigner::{TeamAssigner, TeamConfig};
pub use view_transformer::{ViewConfig, ViewTransformer};
