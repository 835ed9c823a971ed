// src/lib.rs
//
// Post-processing for broadcast football detections: camera-motion
// compensation, pitch-plane positions, speed and distance, team identity
// and ball possession for every tracked player, referee and ball.

pub mod analysis;
pub mod color_analysis;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod track_store;
pub mod types;
pub mod video_processor;

pub use error::{PipelineError, Result};
pub use pipeline::{MatchOutput, MatchPipeline};
pub use track_store::{FrameTracks, TrackRecord, TrackStore};
pub use types::{BBox, Config, EntityClass, Point, Team, TrackId};
