// src/report.rs
//
// Match-level aggregates over the enriched track store: possession
// percentages, per-player speed and distance summaries, and the per-frame
// speed table written alongside the tracks.

use crate::track_store::TrackStore;
use crate::types::{EntityClass, ReportConfig, Team, TrackId};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PossessionShare {
    /// Percent of frames, 0-100
    pub team1: f64,
    pub team2: f64,
}

/// Percentage of frames controlled by each team. Empty input gives 0/0.
pub fn possession_share(sequence: &[Team]) -> PossessionShare {
    if sequence.is_empty() {
        return PossessionShare::default();
    }
    let total = sequence.len() as f64;
    let team1 = sequence.iter().filter(|&&t| t == Team::One).count() as f64;
    PossessionShare {
        team1: team1 / total * 100.0,
        team2: (total - team1) / total * 100.0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSummary {
    pub track_id: TrackId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<Team>,
    pub frames_tracked: usize,
    /// Mean over frames that have a speed (km/h)
    pub average_speed_kmh: Option<f64>,
    /// Frames with a speed below the slow threshold
    pub slow_frames: usize,
    /// Last cumulative distance (m)
    pub total_distance_m: f64,
}

pub fn summarize_tracks(store: &TrackStore, class: EntityClass, slow_speed_kmh: f64) -> Vec<TrackSummary> {
    store
        .track_ids(class)
        .into_iter()
        .map(|track_id| {
            let series = store.track_series(class, track_id);
            let speeds: Vec<f64> = series.iter().filter_map(|(_, r)| r.speed).collect();
            let average_speed_kmh = if speeds.is_empty() {
                None
            } else {
                Some(speeds.iter().sum::<f64>() / speeds.len() as f64)
            };
            TrackSummary {
                track_id,
                team: series.iter().find_map(|(_, r)| r.team),
                frames_tracked: series.len(),
                average_speed_kmh,
                slow_frames: speeds.iter().filter(|&&s| s < slow_speed_kmh).count(),
                total_distance_m: series.iter().rev().find_map(|(_, r)| r.distance).unwrap_or(0.0),
            }
        })
        .collect()
}

/// Speed of every track that has one, per frame.
pub fn per_frame_speeds(store: &TrackStore, class: EntityClass) -> Vec<BTreeMap<TrackId, f64>> {
    store
        .frames(class)
        .iter()
        .map(|frame| {
            frame
                .iter()
                .filter_map(|(&id, r)| r.speed.map(|s| (id, s)))
                .collect()
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub frames: usize,
    pub possession: PossessionShare,
    pub players: Vec<TrackSummary>,
    /// Player with the largest total distance
    pub top_performer: Option<TrackId>,
}

impl MatchReport {
    pub fn build(store: &TrackStore, possession: &[Team], config: &ReportConfig) -> Self {
        let players = summarize_tracks(store, EntityClass::Players, config.slow_speed_kmh);
        let mut top: Option<&TrackSummary> = None;
        for p in &players {
            if top.map_or(true, |t| p.total_distance_m > t.total_distance_m) {
                top = Some(p);
            }
        }
        let top_performer = top.filter(|t| t.total_distance_m > 0.0).map(|t| t.track_id);

        Self {
            frames: store.frame_count(),
            possession: possession_share(possession),
            players,
            top_performer,
        }
    }
}
