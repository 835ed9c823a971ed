// src/types.rs
//
// Shared value types and the top-level configuration. Stage-specific
// configuration lives next to each stage in `analysis/` and is aggregated
// here so a single YAML file drives the whole run.

use crate::analysis::ball_assigner::PossessionConfig;
use crate::analysis::camera_motion::CameraMotionConfig;
use crate::analysis::speed_distance::KinematicsConfig;
use crate::analysis::team_assigner::TeamConfig;
use crate::analysis::view_transformer::ViewConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Persistent identity assigned by the external detector+tracker.
/// Unique only within one entity class.
pub type TrackId = u32;

/// Colour in RGB channel space, 0.0-255.0 per channel.
pub type Rgb = [f32; 3];

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub video: VideoConfig,
    pub ball: BallConfig,
    pub camera_motion: CameraMotionConfig,
    pub view: ViewConfig,
    pub kinematics: KinematicsConfig,
    pub teams: TeamConfig,
    pub possession: PossessionConfig,
    pub report: ReportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Directory of decoded frame images, one file per frame, sorted by name
    pub frames_dir: String,
    /// Detector+tracker output (JSON, see `video_processor::DetectionSet`)
    pub detections_path: String,
    pub output_dir: String,
    /// Source frame rate (frames per second)
    pub frame_rate: f64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            frames_dir: "input_frames".to_string(),
            detections_path: "detections.json".to_string(),
            output_dir: "output".to_string(),
            frame_rate: 24.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BallConfig {
    /// Track ID the detector assigns to the match ball
    pub track_id: TrackId,
}

impl Default for BallConfig {
    fn default() -> Self {
        Self { track_id: 1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Speeds below this count as slow activity (km/h)
    pub slow_speed_kmh: f64,
    /// Trailing window for the possession dominance alert
    pub possession_alert_seconds: f64,
    /// Share of the trailing window one team must exceed
    pub dominance_ratio: f64,
    /// Consecutive slow time before a low-speed alert
    pub slow_alert_seconds: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            slow_speed_kmh: 6.0,
            possession_alert_seconds: 10.0,
            dominance_ratio: 0.6,
            slow_alert_seconds: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ============================================================================
// ENTITY CLASSES AND TEAMS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityClass {
    Players,
    Referees,
    Ball,
}

impl EntityClass {
    pub const ALL: [EntityClass; 3] = [EntityClass::Players, EntityClass::Referees, EntityClass::Ball];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityClass::Players => "players",
            EntityClass::Referees => "referees",
            EntityClass::Ball => "ball",
        }
    }
}

impl fmt::Display for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Team label. Serialized as the integer 1 or 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Team {
    One,
    Two,
}

impl Team {
    pub fn label(self) -> u8 {
        match self {
            Team::One => 1,
            Team::Two => 2,
        }
    }

    /// Team for a 0-based cluster index.
    pub fn from_index(index: usize) -> Self {
        if index == 0 {
            Team::One
        } else {
            Team::Two
        }
    }

    pub fn index(self) -> usize {
        match self {
            Team::One => 0,
            Team::Two => 1,
        }
    }
}

impl From<Team> for u8 {
    fn from(team: Team) -> u8 {
        team.label()
    }
}

impl TryFrom<u8> for Team {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Team::One),
            2 => Ok(Team::Two),
            other => Err(format!("team label must be 1 or 2, got {}", other)),
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "team {}", self.label())
    }
}

// ============================================================================
// GEOMETRY
// ============================================================================

/// A 2D point. Pixels for raw/adjusted positions, metres on the pitch plane.
/// Serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn offset_by(&self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }
}

impl From<[f64; 2]> for Point {
    fn from(p: [f64; 2]) -> Self {
        Point::new(p[0], p[1])
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// Axis-aligned box in raw pixel space. Serialized as `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.x1 as f64 + self.x2 as f64) * 0.5,
            (self.y1 as f64 + self.y2 as f64) * 0.5,
        )
    }

    /// Bottom-centre of the box, where a player's feet touch the pitch.
    pub fn foot_position(&self) -> Point {
        Point::new((self.x1 as f64 + self.x2 as f64) * 0.5, self.y2 as f64)
    }

    pub fn bottom_left(&self) -> Point {
        Point::new(self.x1 as f64, self.y2 as f64)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.x2 as f64, self.y2 as f64)
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn as_array(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

impl From<[f32; 4]> for BBox {
    fn from(b: [f32; 4]) -> Self {
        BBox::new(b[0], b[1], b[2], b[3])
    }
}

impl From<BBox> for [f32; 4] {
    fn from(b: BBox) -> Self {
        b.as_array()
    }
}
