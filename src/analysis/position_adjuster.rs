// src/analysis/position_adjuster.rs
//
// Removes the camera pan from every tracked position so that positions from
// different frames share one image frame of reference (frame 0).

use crate::analysis::camera_motion::{cumulative_offsets, CameraMovement};
use crate::error::{PipelineError, Result};
use crate::track_store::TrackStore;
use crate::types::EntityClass;
use tracing::debug;

/// Set `adjusted_position = position - cumulative camera offset` for every
/// record that has a position, across all classes.
pub fn add_adjusted_positions(store: &mut TrackStore, movements: &[CameraMovement]) -> Result<()> {
    if movements.len() != store.frame_count() {
        return Err(PipelineError::FrameCountMismatch {
            class: "camera_movement".to_string(),
            expected: store.frame_count(),
            got: movements.len(),
        });
    }

    let offsets = cumulative_offsets(movements);
    let mut adjusted = 0usize;

    for class in EntityClass::ALL {
        for (frame, offset) in store.frames_mut(class).iter_mut().zip(&offsets) {
            for record in frame.values_mut() {
                if let Some(pos) = record.position {
                    record.adjusted_position = Some(pos.offset_by(-offset.x, -offset.y));
                    adjusted += 1;
                }
            }
        }
    }

    debug!("Adjusted {} positions for camera movement", adjusted);
    Ok(())
}
