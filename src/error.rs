// src/error.rs
//
// Structural failures and errors raised by opencv. Detection noise (missing
// ball, lost features, off-pitch positions, bad crops) is recovered inside
// each stage and never reaches this type.

use crate::types::{EntityClass, TrackId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no frames supplied")]
    EmptyFrames,

    #[error("{class}: expected {expected} frames, got {got}")]
    FrameCountMismatch {
        class: String,
        expected: usize,
        got: usize,
    },

    #[error("frame {frame} is {got:?}, expected {expected:?} (width, height)")]
    FrameSizeMismatch {
        frame: usize,
        expected: (u32, u32),
        got: (u32, u32),
    },

    #[error("{class} track {track_id} is not present at frame {frame}")]
    UnknownTrack {
        class: EntityClass,
        track_id: TrackId,
        frame: usize,
    },

    #[error("calibration failed: {0}")]
    Calibration(String),

    #[error("optical flow: {0}")]
    Vision(#[from] opencv::Error),

    #[error("override for track {track_id}, which never appears as a player")]
    UnknownOverride { track_id: TrackId },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
