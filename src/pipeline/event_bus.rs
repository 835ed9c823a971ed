// src/pipeline/event_bus.rs
//
// Decoupled event system. Alert detectors publish match events here
// instead of writing into the report directly.

use crate::types::{Team, TrackId};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchEvent {
    /// One team held the ball for more than the configured share of the
    /// trailing window ending at `frame`.
    PossessionDominance { team: Team, frame: usize, share: f64 },

    /// A player stayed below the slow-speed threshold from `since_frame`
    /// through `frame`.
    SustainedLowSpeed {
        track_id: TrackId,
        since_frame: usize,
        frame: usize,
    },
}

pub struct EventBus {
    events: VecDeque<MatchEvent>,
    max_pending: usize,
}

impl EventBus {
    pub fn new(max_pending: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_pending.min(1024)),
            max_pending: max_pending.max(1),
        }
    }

    pub fn publish(&mut self, event: MatchEvent) {
        if self.events.len() >= self.max_pending {
            warn!("Event bus full ({} events), dropping oldest", self.max_pending);
            self.events.pop_front();
        }
        match &event {
            MatchEvent::PossessionDominance { team, frame, share } => {
                info!("Frame {}: {} dominates possession ({:.0}%)", frame, team, share * 100.0)
            }
            MatchEvent::SustainedLowSpeed {
                track_id,
                since_frame,
                frame,
            } => info!(
                "Frame {}: player {} slow since frame {}",
                frame, track_id, since_frame
            ),
        }
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> Vec<MatchEvent> {
        self.events.drain(..).collect()
    }
}
