// src/video_processor.rs
//
// File I/O for the batch runner: decoded frame images from a directory,
// detector output as JSON, and the enriched results written back as JSON.

use crate::pipeline::orchestrator::MatchOutput;
use crate::report::per_frame_speeds;
use crate::track_store::{FrameTracks, TrackRecord, TrackStore};
use crate::types::{BBox, Config, EntityClass, TrackId};
use anyhow::{bail, Context, Result};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

/// Detector+tracker output: per class, one map of track ID to box per frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSet {
    pub players: Vec<BTreeMap<TrackId, BBox>>,
    pub referees: Vec<BTreeMap<TrackId, BBox>>,
    pub ball: Vec<BTreeMap<TrackId, BBox>>,
}

impl DetectionSet {
    pub fn into_store(self) -> crate::error::Result<TrackStore> {
        let to_frames = |frames: Vec<BTreeMap<TrackId, BBox>>| -> Vec<FrameTracks> {
            frames
                .into_iter()
                .map(|f| f.into_iter().map(|(id, b)| (id, TrackRecord::new(b))).collect())
                .collect()
        };
        TrackStore::new(to_frames(self.players), to_frames(self.referees), to_frames(self.ball))
    }
}

pub struct VideoProcessor {
    config: Config,
}

impl VideoProcessor {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Frame images in the frames directory, ordered by file name.
    pub fn find_frame_files(&self) -> Result<Vec<PathBuf>> {
        let image_extensions = ["png", "jpg", "jpeg", "bmp", "PNG", "JPG", "JPEG", "BMP"];
        let mut frames = Vec::new();

        for entry in WalkDir::new(&self.config.video.frames_dir)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(ext) = path.extension() {
                if image_extensions.contains(&ext.to_str().unwrap_or("")) {
                    frames.push(path.to_path_buf());
                }
            }
        }

        info!("Found {} frame images in {}", frames.len(), self.config.video.frames_dir);
        Ok(frames)
    }

    pub fn load_frames(&self) -> Result<Vec<RgbImage>> {
        let files = self.find_frame_files()?;
        if files.is_empty() {
            bail!("no frame images found in {}", self.config.video.frames_dir);
        }
        files
            .iter()
            .map(|path| {
                image::open(path)
                    .map(|img| img.to_rgb8())
                    .with_context(|| format!("decoding {}", path.display()))
            })
            .collect()
    }

    pub fn load_detections(&self) -> Result<TrackStore> {
        let path = &self.config.video.detections_path;
        let contents = fs::read_to_string(path).with_context(|| format!("reading detections {}", path))?;
        let detections: DetectionSet =
            serde_json::from_str(&contents).with_context(|| format!("parsing detections {}", path))?;
        let store = detections.into_store()?;
        info!(
            "Loaded detections for {} frames ({} players, {} referees)",
            store.frame_count(),
            store.track_ids(EntityClass::Players).len(),
            store.track_ids(EntityClass::Referees).len()
        );
        Ok(store)
    }

    /// Write tracks.json, possession.json, player_speeds.json and report.json.
    pub fn write_outputs(&self, store: &TrackStore, output: &MatchOutput) -> Result<()> {
        let dir = Path::new(&self.config.video.output_dir);
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

        write_json(&dir.join("tracks.json"), store)?;
        write_json(&dir.join("possession.json"), &output.possession)?;
        write_json(
            &dir.join("player_speeds.json"),
            &per_frame_speeds(store, EntityClass::Players),
        )?;
        write_json(&dir.join("report.json"), output)?;

        info!("Results written to {}", dir.display());
        Ok(())
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), value)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detections_json_builds_store() {
        let json = r#"{
            "players": [{"3": [0, 0, 10, 20]}, {"3": [1, 0, 11, 20], "5": [50, 50, 60, 80]}],
            "referees": [{}, {}],
            "ball": [{"1": [5, 5, 7, 7]}, {}]
        }"#;
        let set: DetectionSet = serde_json::from_str(json).unwrap();
        let store = set.into_store().unwrap();

        assert_eq!(store.frame_count(), 2);
        assert_eq!(
            store.get(EntityClass::Players, 1, 5).unwrap().bbox,
            BBox::new(50.0, 50.0, 60.0, 80.0)
        );
        assert!(store.get(EntityClass::Ball, 1, 1).is_none());
    }

    #[test]
    fn test_mismatched_class_lengths_rejected() {
        let json = r#"{"players": [{}, {}], "referees": [{}], "ball": [{}, {}]}"#;
        let set: DetectionSet = serde_json::from_str(json).unwrap();
        assert!(set.into_store().is_err());
    }

    #[test]
    fn test_frames_are_found_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["frame_002.png", "frame_000.png", "frame_001.png"] {
            RgbImage::new(4, 4).save(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut config = Config::default();
        config.video.frames_dir = dir.path().to_string_lossy().into_owned();
        let processor = VideoProcessor::new(config);

        let files = processor.find_frame_files().unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["frame_000.png", "frame_001.png", "frame_002.png"]);
        assert_eq!(processor.load_frames().unwrap().len(), 3);
    }
}
