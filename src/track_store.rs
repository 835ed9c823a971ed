// src/track_store.rs
//
// Arena of per-frame track records, indexed by (entity class, frame, track ID).
//
// The detector populates the bounding boxes once for the whole video; every
// stage afterwards enriches records in place, writing only the fields it
// owns. No stage removes a track: absence of an ID in a frame means the
// entity was not detected there.

use crate::error::{PipelineError, Result};
use crate::types::{BBox, EntityClass, Point, Rgb, Team, TrackId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// All tracks of one class in one frame.
pub type FrameTracks = BTreeMap<TrackId, TrackRecord>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub bbox: BBox,
    /// Representative pixel point derived from `bbox`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    /// `position` minus the cumulative camera offset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjusted_position: Option<Point>,
    /// Pitch coordinate in metres; `None` outside the calibrated region
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformed_position: Option<Point>,
    /// km/h
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Cumulative metres since the track's first measured window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<Team>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_color: Option<Rgb>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub has_ball: bool,
}

impl TrackRecord {
    pub fn new(bbox: BBox) -> Self {
        Self {
            bbox,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TrackStore {
    players: Vec<FrameTracks>,
    referees: Vec<FrameTracks>,
    ball: Vec<FrameTracks>,
}

impl TrackStore {
    /// Build from detector output. All classes must cover the same frames.
    pub fn new(
        players: Vec<FrameTracks>,
        referees: Vec<FrameTracks>,
        ball: Vec<FrameTracks>,
    ) -> Result<Self> {
        let expected = players.len();
        for (class, len) in [(EntityClass::Referees, referees.len()), (EntityClass::Ball, ball.len())] {
            if len != expected {
                return Err(PipelineError::FrameCountMismatch {
                    class: class.to_string(),
                    expected,
                    got: len,
                });
            }
        }
        Ok(Self {
            players,
            referees,
            ball,
        })
    }

    /// Store with `frame_count` empty frames for every class.
    pub fn with_frames(frame_count: usize) -> Self {
        Self {
            players: vec![FrameTracks::new(); frame_count],
            referees: vec![FrameTracks::new(); frame_count],
            ball: vec![FrameTracks::new(); frame_count],
        }
    }

    pub fn frame_count(&self) -> usize {
        self.players.len()
    }

    pub fn frames(&self, class: EntityClass) -> &[FrameTracks] {
        match class {
            EntityClass::Players => &self.players,
            EntityClass::Referees => &self.referees,
            EntityClass::Ball => &self.ball,
        }
    }

    /// Mutable per-frame view. A slice, so stages cannot add or drop frames.
    pub fn frames_mut(&mut self, class: EntityClass) -> &mut [FrameTracks] {
        match class {
            EntityClass::Players => &mut self.players,
            EntityClass::Referees => &mut self.referees,
            EntityClass::Ball => &mut self.ball,
        }
    }

    /// Record a detection. Used by loaders and test fixtures.
    pub fn insert(&mut self, class: EntityClass, frame: usize, track_id: TrackId, bbox: BBox) -> Result<()> {
        let frame_count = self.frame_count();
        let frames = self.frames_mut(class);
        let slot = frames.get_mut(frame).ok_or(PipelineError::FrameCountMismatch {
            class: class.to_string(),
            expected: frame_count,
            got: frame + 1,
        })?;
        slot.insert(track_id, TrackRecord::new(bbox));
        Ok(())
    }

    pub fn get(&self, class: EntityClass, frame: usize, track_id: TrackId) -> Option<&TrackRecord> {
        self.frames(class).get(frame).and_then(|f| f.get(&track_id))
    }

    /// Record that a later stage expects to exist. Missing IDs are a data
    /// contract violation and surface as `UnknownTrack`.
    pub fn record_mut(
        &mut self,
        class: EntityClass,
        frame: usize,
        track_id: TrackId,
    ) -> Result<&mut TrackRecord> {
        self.frames_mut(class)
            .get_mut(frame)
            .and_then(|f| f.get_mut(&track_id))
            .ok_or(PipelineError::UnknownTrack {
                class,
                track_id,
                frame,
            })
    }

    /// Every track ID seen at least once for the class.
    pub fn track_ids(&self, class: EntityClass) -> BTreeSet<TrackId> {
        self.frames(class)
            .iter()
            .flat_map(|f| f.keys().copied())
            .collect()
    }

    /// Frames in which the track appears, in order.
    pub fn track_series(&self, class: EntityClass, track_id: TrackId) -> Vec<(usize, &TrackRecord)> {
        self.frames(class)
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.get(&track_id).map(|r| (i, r)))
            .collect()
    }

    /// Derive `position` from `bbox`: foot midpoint for people, centre for the ball.
    pub fn assign_positions(&mut self) {
        for class in EntityClass::ALL {
            for frame in self.frames_mut(class) {
                for record in frame.values_mut() {
                    record.position = Some(match class {
                        EntityClass::Ball => record.bbox.center(),
                        EntityClass::Players | EntityClass::Referees => record.bbox.foot_position(),
                    });
                }
            }
        }
    }
}
