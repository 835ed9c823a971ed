// src/analysis/match_alerts.rs
//
// Alerts over the finished per-frame series.
//
// Possession dominance: a trailing window of frames is slid over the
// possession sequence; when one team's share of the window rises above the
// configured ratio an event is published. It re-arms once the share drops
// back to or below the ratio.
//
// Sustained low speed: per player, frames with a measured speed below the
// slow threshold form a run; frames with no speed are ignored. A run that
// reaches the configured duration publishes one event. A faster frame ends
// the run and re-arms the alert.

use crate::pipeline::event_bus::{EventBus, MatchEvent};
use crate::track_store::TrackStore;
use crate::types::{EntityClass, ReportConfig, Team};
use tracing::debug;

pub struct AlertMonitor {
    config: ReportConfig,
    frame_rate: f64,
}

impl AlertMonitor {
    pub fn new(config: ReportConfig, frame_rate: f64) -> Self {
        Self { config, frame_rate }
    }

    fn frames_for(&self, seconds: f64) -> usize {
        ((seconds * self.frame_rate).round() as usize).max(1)
    }

    /// Publish every alert for the run. Returns the number published.
    pub fn scan(&self, possession: &[Team], store: &TrackStore, bus: &mut EventBus) -> usize {
        self.possession_dominance(possession, bus) + self.sustained_low_speed(store, bus)
    }

    pub fn possession_dominance(&self, possession: &[Team], bus: &mut EventBus) -> usize {
        let window = self.frames_for(self.config.possession_alert_seconds);
        if possession.len() < window {
            debug!(
                "Possession sequence shorter than alert window ({} < {})",
                possession.len(),
                window
            );
            return 0;
        }

        let mut counts = [0usize; 2];
        let mut dominant = [false; 2];
        let mut published = 0;

        for (frame, team) in possession.iter().enumerate() {
            counts[team.index()] += 1;
            if frame >= window {
                counts[possession[frame - window].index()] -= 1;
            }
            if frame + 1 < window {
                continue;
            }

            for team in [Team::One, Team::Two] {
                let share = counts[team.index()] as f64 / window as f64;
                let now = share > self.config.dominance_ratio;
                if now && !dominant[team.index()] {
                    bus.publish(MatchEvent::PossessionDominance { team, frame, share });
                    published += 1;
                }
                dominant[team.index()] = now;
            }
        }
        published
    }

    pub fn sustained_low_speed(&self, store: &TrackStore, bus: &mut EventBus) -> usize {
        let needed = self.frames_for(self.config.slow_alert_seconds);
        let mut published = 0;

        for track_id in store.track_ids(EntityClass::Players) {
            let mut run_start: Option<usize> = None;
            let mut run_len = 0usize;
            let mut fired = false;

            for (frame, record) in store.track_series(EntityClass::Players, track_id) {
                let Some(speed) = record.speed else {
                    continue;
                };
                if speed < self.config.slow_speed_kmh {
                    let since_frame = *run_start.get_or_insert(frame);
                    run_len += 1;
                    if run_len >= needed && !fired {
                        bus.publish(MatchEvent::SustainedLowSpeed {
                            track_id,
                            since_frame,
                            frame,
                        });
                        fired = true;
                        published += 1;
                    }
                } else {
                    run_start = None;
                    run_len = 0;
                    fired = false;
                }
            }
        }
        published
    }
}
