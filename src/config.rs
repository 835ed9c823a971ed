use crate::error::PipelineError;
use crate::types::Config;
use anyhow::{Context, Result};
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| format!("reading config {}", path))?;
        let config: Config =
            serde_yaml::from_str(&contents).with_context(|| format!("parsing config {}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no stage can run with.
    pub fn validate(&self) -> std::result::Result<(), PipelineError> {
        let invalid = |msg: String| Err(PipelineError::InvalidConfig(msg));

        if !(self.video.frame_rate > 0.0) {
            return invalid(format!("video.frame_rate must be > 0, got {}", self.video.frame_rate));
        }
        if self.kinematics.window_frames == 0 {
            return invalid("kinematics.window_frames must be > 0".to_string());
        }
        if !(self.possession.max_player_ball_distance > 0.0) {
            return invalid(format!(
                "possession.max_player_ball_distance must be > 0, got {}",
                self.possession.max_player_ball_distance
            ));
        }

        let cm = &self.camera_motion;
        if cm.max_features == 0 {
            return invalid("camera_motion.max_features must be > 0".to_string());
        }
        if !(cm.quality_level > 0.0 && cm.quality_level <= 1.0) {
            return invalid(format!("camera_motion.quality_level must be in (0, 1], got {}", cm.quality_level));
        }
        if cm.block_size < 3 || cm.lk_window < 3 {
            return invalid("camera_motion.block_size and lk_window must be >= 3".to_string());
        }
        if cm.lk_max_iterations == 0 {
            return invalid("camera_motion.lk_max_iterations must be > 0".to_string());
        }
        if cm.min_movement_px < 0.0 {
            return invalid(format!("camera_motion.min_movement_px must be >= 0, got {}", cm.min_movement_px));
        }
        if let Some(band) = cm.mask_columns.iter().find(|b| b[0] >= b[1]) {
            return invalid(format!("camera_motion.mask_columns band {:?} is empty", band));
        }

        let r = &self.report;
        if !(r.slow_speed_kmh > 0.0) || !(r.possession_alert_seconds > 0.0) || !(r.slow_alert_seconds > 0.0) {
            return invalid("report thresholds and windows must be > 0".to_string());
        }
        if !(r.dominance_ratio > 0.0 && r.dominance_ratio < 1.0) {
            return invalid(format!("report.dominance_ratio must be in (0, 1), got {}", r.dominance_ratio));
        }
        if self.teams.restarts == 0 || self.teams.max_iter == 0 {
            return invalid("teams.restarts and teams.max_iter must be > 0".to_string());
        }
        Ok(())
    }
}
