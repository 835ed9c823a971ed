// src/analysis/ball_assigner.rs
//
// Per-frame ball possession.
//
// The player whose contact point is nearest the ball centre, and strictly
// closer than the possession threshold, has the ball. Its team is the
// frame's possession label. Frames with no qualifying player (or no ball)
// repeat the previous label, and the sequence starts from team 1, so every
// frame carries a label.

use crate::track_store::{FrameTracks, TrackStore};
use crate::types::{BBox, EntityClass, Point, Team, TrackId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Which point of a player's box is measured against the ball.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactPoint {
    /// Nearer of the two bottom corners (either foot)
    FootCorners,
    BoxCenter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PossessionConfig {
    /// Pixels; a player must be strictly closer than this to hold the ball
    pub max_player_ball_distance: f64,
    pub contact_point: ContactPoint,
}

impl Default for PossessionConfig {
    fn default() -> Self {
        Self {
            max_player_ball_distance: 70.0,
            contact_point: ContactPoint::FootCorners,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PossessionResult {
    /// Team in control, one entry per frame
    pub sequence: Vec<Team>,
    /// Frames that repeated the previous label
    pub carried_frames: usize,
}

pub struct PlayerBallAssigner {
    config: PossessionConfig,
}

impl PlayerBallAssigner {
    pub fn new(config: PossessionConfig) -> Self {
        Self { config }
    }

    fn contact_distance(&self, player: &BBox, ball: &Point) -> f64 {
        match self.config.contact_point {
            ContactPoint::FootCorners => {
                let left = player.bottom_left().distance(ball);
                let right = player.bottom_right().distance(ball);
                left.min(right)
            }
            ContactPoint::BoxCenter => player.center().distance(ball),
        }
    }

    /// Nearest player within the threshold. Ties go to the lower track ID.
    pub fn assign_ball_to_player(&self, players: &FrameTracks, ball_bbox: &BBox) -> Option<TrackId> {
        let ball = ball_bbox.center();
        let mut best: Option<(TrackId, f64)> = None;
        for (&id, record) in players {
            let d = self.contact_distance(&record.bbox, &ball);
            if d < self.config.max_player_ball_distance && best.map_or(true, |(_, bd)| d < bd) {
                best = Some((id, d));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Set `has_ball` on the possessing player of each frame and build the
    /// possession sequence.
    pub fn assign_possession(&self, store: &mut TrackStore, ball_id: TrackId) -> PossessionResult {
        let n = store.frame_count();
        let ball_boxes: Vec<Option<BBox>> = store
            .frames(EntityClass::Ball)
            .iter()
            .map(|f| f.get(&ball_id).map(|r| r.bbox))
            .collect();

        let mut result = PossessionResult {
            sequence: Vec::with_capacity(n),
            carried_frames: 0,
        };
        let mut current = Team::One;

        let players = store.frames_mut(EntityClass::Players);
        for (frame_idx, (frame, ball)) in players.iter_mut().zip(&ball_boxes).enumerate() {
            let holder = ball.and_then(|b| self.assign_ball_to_player(frame, &b));
            let team = holder.and_then(|id| {
                let record = frame.get_mut(&id)?;
                record.has_ball = true;
                record.team
            });

            match team {
                Some(team) => current = team,
                None => {
                    result.carried_frames += 1;
                    if ball.is_none() {
                        debug!("Frame {}: no ball, possession stays with {}", frame_idx, current);
                    }
                }
            }
            result.sequence.push(current);
        }

        info!(
            "Possession assigned over {} frames ({} carried forward)",
            n, result.carried_frames
        );
        result
    }
}
