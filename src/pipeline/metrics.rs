// src/pipeline/metrics.rs
//
// Run observability. Counts every locally recovered degradation so a run
// that "succeeded" on bad input is visible in the output and the logs.
// One instance is created per run, so `started_at` marks the run start.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub total_frames: Arc<AtomicU64>,
    pub ball_frames_interpolated: Arc<AtomicU64>,
    pub camera_frames_moving: Arc<AtomicU64>,
    pub camera_frames_degraded: Arc<AtomicU64>,
    pub positions_outside_pitch: Arc<AtomicU64>,
    pub kinematic_windows_measured: Arc<AtomicU64>,
    pub kinematic_windows_skipped: Arc<AtomicU64>,
    pub degenerate_crops: Arc<AtomicU64>,
    pub possession_frames_carried: Arc<AtomicU64>,
    pub alerts_published: Arc<AtomicU64>,
    pub camera_time_us: Arc<AtomicU64>,
    pub teams_time_us: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            total_frames: Arc::new(AtomicU64::new(0)),
            ball_frames_interpolated: Arc::new(AtomicU64::new(0)),
            camera_frames_moving: Arc::new(AtomicU64::new(0)),
            camera_frames_degraded: Arc::new(AtomicU64::new(0)),
            positions_outside_pitch: Arc::new(AtomicU64::new(0)),
            kinematic_windows_measured: Arc::new(AtomicU64::new(0)),
            kinematic_windows_skipped: Arc::new(AtomicU64::new(0)),
            degenerate_crops: Arc::new(AtomicU64::new(0)),
            possession_frames_carried: Arc::new(AtomicU64::new(0)),
            alerts_published: Arc::new(AtomicU64::new(0)),
            camera_time_us: Arc::new(AtomicU64::new(0)),
            teams_time_us: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn add(&self, counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn set_timing(&self, counter: &AtomicU64, duration_us: u64) {
        counter.store(duration_us, Ordering::Relaxed);
    }

    pub fn fps(&self) -> f64 {
        let frames = self.total_frames.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames.load(Ordering::Relaxed),
            fps: self.fps(),
            ball_frames_interpolated: self.ball_frames_interpolated.load(Ordering::Relaxed),
            camera_frames_moving: self.camera_frames_moving.load(Ordering::Relaxed),
            camera_frames_degraded: self.camera_frames_degraded.load(Ordering::Relaxed),
            positions_outside_pitch: self.positions_outside_pitch.load(Ordering::Relaxed),
            kinematic_windows_measured: self.kinematic_windows_measured.load(Ordering::Relaxed),
            kinematic_windows_skipped: self.kinematic_windows_skipped.load(Ordering::Relaxed),
            degenerate_crops: self.degenerate_crops.load(Ordering::Relaxed),
            possession_frames_carried: self.possession_frames_carried.load(Ordering::Relaxed),
            alerts_published: self.alerts_published.load(Ordering::Relaxed),
            camera_time_us: self.camera_time_us.load(Ordering::Relaxed),
            teams_time_us: self.teams_time_us.load(Ordering::Relaxed),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub fps: f64,
    pub ball_frames_interpolated: u64,
    pub camera_frames_moving: u64,
    pub camera_frames_degraded: u64,
    pub positions_outside_pitch: u64,
    pub kinematic_windows_measured: u64,
    pub kinematic_windows_skipped: u64,
    pub degenerate_crops: u64,
    pub possession_frames_carried: u64,
    pub alerts_published: u64,
    pub camera_time_us: u64,
    pub teams_time_us: u64,
    pub elapsed_secs: f64,
}
