// src/main.rs

use anyhow::Result;
use match_kinematics::video_processor::VideoProcessor;
use match_kinematics::{Config, MatchPipeline};
use std::env;
use tracing::{info, warn};

const CONFIG_ENV: &str = "MATCH_KINEMATICS_CONFIG";

fn main() -> Result<()> {
    let config_path = env::var(CONFIG_ENV).unwrap_or_else(|_| "config.yaml".to_string());
    let config = Config::load(&config_path)?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("match_kinematics={}", config.logging.level).into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Match kinematics starting");
    info!("✓ Configuration loaded from {}", config_path);
    info!(
        "Thresholds: possession < {:.0} px, window {} frames @ {:.1} fps, slow < {:.1} km/h",
        config.possession.max_player_ball_distance,
        config.kinematics.window_frames,
        config.video.frame_rate,
        config.report.slow_speed_kmh
    );

    let processor = VideoProcessor::new(config.clone());
    let mut store = processor.load_detections()?;
    let frames = processor.load_frames()?;
    info!("✓ {} frames decoded", frames.len());

    let pipeline = MatchPipeline::new(config)?;
    let output = pipeline.run(&frames, &mut store)?;

    for event in &output.events {
        info!("Alert: {:?}", event);
    }
    if output.team_colors.is_none() {
        warn!("Team colours could not be determined");
    }
    info!(
        "Done in {:.1}s: possession {:.1}% / {:.1}%, top performer {:?}",
        output.metrics.elapsed_secs,
        output.report.possession.team1,
        output.report.possession.team2,
        output.report.top_performer
    );

    processor.write_outputs(&store, &output)?;
    Ok(())
}
