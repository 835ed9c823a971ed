// src/analysis/team_assigner.rs
//
// Two-team partition of players by shirt colour.
//
// The first frame with at least two usable shirt colours is the reference:
// its colours are clustered into two team centroids. Team 1 is whichever
// centroid the lowest player track ID of that frame falls into, so labels
// do not depend on clustering order.
//
// Every track is classified once, on its first appearance, and the label is
// cached for the rest of the run. A track whose first crop is unusable gets
// the default team, which is cached the same way. Manual overrides (e.g. a
// goalkeeper in a third kit) bypass classification entirely.

use crate::analysis::clustering::{ColorClusterer, KMeans};
use crate::color_analysis::shirt_color;
use crate::error::{PipelineError, Result};
use crate::track_store::{FrameTracks, TrackStore};
use crate::types::{BBox, EntityClass, Rgb, Team, TrackId};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamConfig {
    /// Lloyd iterations per k-means run
    pub max_iter: usize,
    /// k-means restarts for the team split; best inertia wins
    pub restarts: usize,
    pub seed: u64,
    /// Tracks pinned to a team regardless of colour
    pub overrides: BTreeMap<TrackId, Team>,
    /// Label for tracks that cannot be classified
    pub default_team: Team,
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            max_iter: 300,
            restarts: 10,
            seed: 0,
            overrides: BTreeMap::new(),
            default_team: Team::One,
        }
    }
}

/// Outcome of a team assignment run.
#[derive(Debug, Clone, Default)]
pub struct TeamAssignment {
    pub reference_frame: Option<usize>,
    /// Centroid colour per team, indexed by `Team::index()`
    pub team_colors: Option<[Rgb; 2]>,
    pub degenerate_crops: usize,
}

pub struct TeamAssigner<C: ColorClusterer = KMeans> {
    config: TeamConfig,
    clusterer: C,
    /// Team for each cluster index of `clusterer`
    cluster_teams: [Team; 2],
    team_colors: Option<[Rgb; 2]>,
    cache: BTreeMap<TrackId, Team>,
    degenerate_crops: usize,
}

impl TeamAssigner<KMeans> {
    pub fn new(config: TeamConfig) -> Self {
        let kmeans = KMeans::new(2)
            .max_iter(config.max_iter)
            .n_init(config.restarts)
            .seed(config.seed);
        Self::with_clusterer(config, kmeans)
    }
}

impl<C: ColorClusterer> TeamAssigner<C> {
    pub fn with_clusterer(config: TeamConfig, clusterer: C) -> Self {
        Self {
            config,
            clusterer,
            cluster_teams: [Team::One, Team::Two],
            team_colors: None,
            cache: BTreeMap::new(),
            degenerate_crops: 0,
        }
    }

    /// Fit the two team centroids from one frame. Returns `Ok(false)` when
    /// the frame has fewer than two usable shirt colours.
    pub fn fit_team_colors(&mut self, frame: &RgbImage, players: &FrameTracks) -> Result<bool> {
        let colors: Vec<(TrackId, Rgb)> = players
            .iter()
            .filter_map(|(&id, r)| shirt_color(frame, &r.bbox, self.config.seed).map(|c| (id, c)))
            .collect();
        if colors.len() < 2 {
            return Ok(false);
        }

        let samples: Vec<Rgb> = colors.iter().map(|(_, c)| *c).collect();
        let centers = match self.clusterer.fit(&samples) {
            Ok(c) if c.len() == 2 => c,
            Ok(c) => {
                return Err(PipelineError::InvalidConfig(format!(
                    "team clustering returned {} centroids, expected 2",
                    c.len()
                )))
            }
            Err(e) => {
                debug!("Team clustering skipped frame: {}", e);
                return Ok(false);
            }
        };

        // `colors` is ordered by track ID, so the first entry anchors team 1
        let anchor = self.clusterer.predict(&samples[0]).unwrap_or(0).min(1);
        self.cluster_teams = if anchor == 0 {
            [Team::One, Team::Two]
        } else {
            [Team::Two, Team::One]
        };

        let mut team_colors = [[0.0; 3]; 2];
        for (cluster, center) in centers.iter().enumerate() {
            team_colors[self.cluster_teams[cluster].index()] = *center;
        }
        self.team_colors = Some(team_colors);
        debug!(
            "Team colours: 1 = {:?}, 2 = {:?} (anchor track {})",
            team_colors[0], team_colors[1], colors[0].0
        );
        Ok(true)
    }

    /// Team for a player, classifying it on first sight.
    pub fn player_team(&mut self, frame: &RgbImage, bbox: &BBox, track_id: TrackId) -> Team {
        if let Some(&team) = self.config.overrides.get(&track_id) {
            return team;
        }
        if let Some(&team) = self.cache.get(&track_id) {
            return team;
        }

        // Without fitted colours there is nothing to classify against
        if self.team_colors.is_none() {
            self.cache.insert(track_id, self.config.default_team);
            return self.config.default_team;
        }

        let classified = shirt_color(frame, bbox, self.config.seed)
            .and_then(|c| self.clusterer.predict(&c))
            .map(|cluster| self.cluster_teams[cluster.min(1)]);

        let team = classified.unwrap_or_else(|| {
            self.degenerate_crops += 1;
            debug!(
                "Track {}: no usable shirt colour, using {}",
                track_id, self.config.default_team
            );
            self.config.default_team
        });
        self.cache.insert(track_id, team);
        team
    }

    /// Label every player record with `team` and `team_color`.
    pub fn assign_teams(&mut self, frames: &[RgbImage], store: &mut TrackStore) -> Result<TeamAssignment> {
        if frames.len() != store.frame_count() {
            return Err(PipelineError::FrameCountMismatch {
                class: "video".to_string(),
                expected: store.frame_count(),
                got: frames.len(),
            });
        }

        let known = store.track_ids(EntityClass::Players);
        if let Some(&missing) = self.config.overrides.keys().find(|id| !known.contains(id)) {
            return Err(PipelineError::UnknownOverride { track_id: missing });
        }

        let mut reference_frame = None;
        for (idx, (image, players)) in frames.iter().zip(store.frames(EntityClass::Players)).enumerate() {
            if players.len() >= 2 && self.fit_team_colors(image, players)? {
                reference_frame = Some(idx);
                break;
            }
        }
        if reference_frame.is_none() {
            warn!("No frame with two usable shirt colours; all players get the default team");
        }

        let player_frames = store.frames_mut(EntityClass::Players);
        for (image, players) in frames.iter().zip(player_frames.iter_mut()) {
            for (&id, record) in players.iter_mut() {
                let team = self.player_team(image, &record.bbox, id);
                record.team = Some(team);
                record.team_color = self.team_colors.map(|c| c[team.index()]);
            }
        }

        info!(
            "Teams assigned to {} tracks (reference frame {:?}, {} degenerate crops)",
            known.len(),
            reference_frame,
            self.degenerate_crops
        );
        Ok(TeamAssignment {
            reference_frame,
            team_colors: self.team_colors,
            degenerate_crops: self.degenerate_crops,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb as Pixel;

    const GRASS: [u8; 3] = [40, 140, 40];
    const RED: [u8; 3] = [220, 30, 30];
    const BLUE: [u8; 3] = [30, 40, 210];

    fn paint_shirt(img: &mut RgbImage, bbox: &BBox, shirt: [u8; 3]) {
        let y_mid = (bbox.y1 + bbox.height() / 2.0) as u32;
        for y in bbox.y1 as u32 + 3..y_mid {
            for x in bbox.x1 as u32 + 4..bbox.x2 as u32 - 4 {
                img.put_pixel(x, y, Pixel(shirt));
            }
        }
    }

    fn boxes() -> [(TrackId, BBox, [u8; 3]); 3] {
        [
            (4, BBox::new(20.0, 20.0, 50.0, 80.0), BLUE),
            (7, BBox::new(80.0, 20.0, 110.0, 80.0), RED),
            (9, BBox::new(140.0, 20.0, 170.0, 80.0), BLUE),
        ]
    }

    fn scene(frames: usize) -> (Vec<RgbImage>, TrackStore) {
        let mut store = TrackStore::with_frames(frames);
        let mut images = Vec::new();
        for f in 0..frames {
            let mut img = RgbImage::from_pixel(200, 120, Pixel(GRASS));
            for (id, bbox, shirt) in boxes() {
                paint_shirt(&mut img, &bbox, shirt);
                store.insert(EntityClass::Players, f, id, bbox).unwrap();
            }
            images.push(img);
        }
        (images, store)
    }

    #[test]
    fn test_lowest_track_id_anchors_team_one() {
        let (images, mut store) = scene(2);
        let result = TeamAssigner::new(TeamConfig::default())
            .assign_teams(&images, &mut store)
            .unwrap();

        assert_eq!(result.reference_frame, Some(0));
        let team = |id| store.get(EntityClass::Players, 1, id).unwrap().team;
        assert_eq!(team(4), Some(Team::One));
        assert_eq!(team(9), Some(Team::One));
        assert_eq!(team(7), Some(Team::Two));

        let colors = result.team_colors.unwrap();
        assert!(colors[0][2] > 200.0, "team 1 should be blue: {:?}", colors[0]);
        assert!(colors[1][0] > 200.0, "team 2 should be red: {:?}", colors[1]);
        let rec = store.get(EntityClass::Players, 0, 7).unwrap();
        assert_eq!(rec.team_color, Some(colors[1]));
    }

    #[test]
    fn test_team_is_fixed_after_first_assignment() {
        let (mut images, mut store) = scene(3);
        // Track 7 changes to blue from frame 1 onwards
        let bbox = boxes()[1].1;
        for img in images.iter_mut().skip(1) {
            paint_shirt(img, &bbox, BLUE);
        }
        TeamAssigner::new(TeamConfig::default())
            .assign_teams(&images, &mut store)
            .unwrap();

        for f in 0..3 {
            assert_eq!(store.get(EntityClass::Players, f, 7).unwrap().team, Some(Team::Two));
        }
    }

    #[test]
    fn test_override_pins_track() {
        let (images, mut store) = scene(1);
        let mut config = TeamConfig::default();
        config.overrides.insert(9, Team::Two);
        TeamAssigner::new(config).assign_teams(&images, &mut store).unwrap();
        assert_eq!(store.get(EntityClass::Players, 0, 9).unwrap().team, Some(Team::Two));
    }

    #[test]
    fn test_override_for_unknown_track_fails() {
        let (images, mut store) = scene(1);
        let mut config = TeamConfig::default();
        config.overrides.insert(99, Team::Two);
        let err = TeamAssigner::new(config).assign_teams(&images, &mut store).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownOverride { track_id: 99 }));
    }

    #[test]
    fn test_degenerate_first_crop_gets_default_team() {
        let (images, mut store) = scene(2);
        store.insert(EntityClass::Players, 0, 12, BBox::new(500.0, 500.0, 520.0, 540.0)).unwrap();
        store.insert(EntityClass::Players, 1, 12, BBox::new(20.0, 20.0, 50.0, 80.0)).unwrap();
        let config = TeamConfig {
            default_team: Team::Two,
            ..Default::default()
        };
        let result = TeamAssigner::new(config).assign_teams(&images, &mut store).unwrap();

        assert_eq!(result.degenerate_crops, 1);
        assert_eq!(store.get(EntityClass::Players, 0, 12).unwrap().team, Some(Team::Two));
        assert_eq!(store.get(EntityClass::Players, 1, 12).unwrap().team, Some(Team::Two));
    }

    #[test]
    fn test_no_reference_frame_counts_no_crops() {
        // One player per frame: no frame can fit two team colours
        let mut store = TrackStore::with_frames(3);
        let mut images = Vec::new();
        for f in 0..3 {
            let (id, bbox, shirt) = boxes()[f];
            let mut img = RgbImage::from_pixel(200, 120, Pixel(GRASS));
            paint_shirt(&mut img, &bbox, shirt);
            store.insert(EntityClass::Players, f, id, bbox).unwrap();
            images.push(img);
        }
        let result = TeamAssigner::new(TeamConfig::default())
            .assign_teams(&images, &mut store)
            .unwrap();

        assert_eq!(result.reference_frame, None);
        assert_eq!(result.team_colors, None);
        assert_eq!(result.degenerate_crops, 0);
        let rec = store.get(EntityClass::Players, 2, 9).unwrap();
        assert_eq!(rec.team, Some(Team::One));
        assert_eq!(rec.team_color, None);
    }

    #[test]
    fn test_frame_count_mismatch() {
        let (images, mut store) = scene(2);
        let err = TeamAssigner::new(TeamConfig::default())
            .assign_teams(&images[..1], &mut store)
            .unwrap_err();
        assert!(matches!(err, PipelineError::FrameCountMismatch { .. }));
    }
}
