//! Race - Race configuration and session state
//!
//! Holds the buses of the current race, the idle/running/finished state
//! machine and the per-frame update. Collaborators (random source, frame
//! scheduler, geometry) are passed in on every call.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::race_server::bus::{Bus, BusSnapshot, MotionProfile};
use crate::race_server::random::RandomSource;
use crate::race_server::schedule::{FrameId, FrameScheduler};
use crate::race_server::track::{self, TrackGeometry};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid option bounds: {min}..={max}")]
    OptionBounds { min: usize, max: usize },
    #[error("Fallback duration must be positive, got {0} ms")]
    FallbackDuration(f64),
    #[error("Lane easing must be in (0, 1], got {0}")]
    LaneEasing(f64),
}

/// Race configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    pub min_options: usize,
    pub max_options: usize,
    /// Race duration when the audio clip length is unknown
    pub fallback_duration_ms: f64,
    /// Minimum label length in characters
    pub label_min_len: usize,
    /// Share of the remaining distance to the lane slot covered per frame
    pub lane_easing: f64,
    pub start_x: f64,
    pub min_track_span: f64,
    pub finish_margin: f64,
    pub default_bus_width: f64,
    pub lane_offset: f64,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            min_options: 2,
            max_options: 20,
            fallback_duration_ms: 8000.0,
            label_min_len: 26,
            lane_easing: 0.15,
            start_x: 90.0,
            min_track_span: 120.0,
            finish_margin: 10.0,
            default_bus_width: 180.0,
            lane_offset: 40.0,
        }
    }
}

impl RaceConfig {
    /// Parse and validate a config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: RaceConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_options == 0 || self.min_options > self.max_options {
            return Err(ConfigError::OptionBounds {
                min: self.min_options,
                max: self.max_options,
            });
        }
        if !(self.fallback_duration_ms.is_finite() && self.fallback_duration_ms > 0.0) {
            return Err(ConfigError::FallbackDuration(self.fallback_duration_ms));
        }
        if !(self.lane_easing > 0.0 && self.lane_easing <= 1.0) {
            return Err(ConfigError::LaneEasing(self.lane_easing));
        }
        Ok(())
    }
}

/// Race status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaceState {
    Idle,
    Running,
    Finished,
}

/// Text shown under the track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceMessage {
    Ready,
    Started,
    Winner(String),
}

impl fmt::Display for RaceMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RaceMessage::Ready => write!(f, "Ready to start."),
            RaceMessage::Started => write!(f, "Engines started!"),
            RaceMessage::Winner(name) => write!(f, "Winner: {}", name),
        }
    }
}

/// What a frame did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Not running; nothing moved
    Ignored,
    /// Moved; another frame is scheduled
    Continue,
    /// Race over; no frame is scheduled
    Finished { winner: usize },
}

/// Complete race session
#[derive(Debug, Clone)]
pub struct RaceSession {
    pub config: RaceConfig,
    pub state: RaceState,
    pub buses: Vec<Bus>,
    pub start_time_ms: f64,
    pub duration_ms: f64,
    pub winner_index: Option<usize>,
    pub message: RaceMessage,
    /// Race time fraction reached by the last frame
    pub progress_time: f64,
    frame: Option<FrameId>,
}

impl RaceSession {
    pub fn new(config: RaceConfig) -> Self {
        let duration_ms = config.fallback_duration_ms;
        Self {
            config,
            state: RaceState::Idle,
            buses: Vec::new(),
            start_time_ms: 0.0,
            duration_ms,
            winner_index: None,
            message: RaceMessage::Ready,
            progress_time: 0.0,
            frame: None,
        }
    }

    /// Replace all buses with fresh ones for `names`
    pub fn rebuild(&mut self, names: &[String]) {
        self.buses = track::build_buses(names, &self.config);
    }

    /// Stop any race and put every bus back on the start line
    pub fn reset(&mut self, geometry: &TrackGeometry, scheduler: &mut dyn FrameScheduler) {
        self.state = RaceState::Idle;
        if let Some(id) = self.frame.take() {
            scheduler.cancel_frame(id);
        }
        self.message = RaceMessage::Ready;
        self.progress_time = 0.0;
        for bus in &mut self.buses {
            bus.reset(geometry.start_x);
        }
        self.position_by_rank(geometry);
    }

    /// Pick the winner and draw every bus's motion profile
    pub fn assign_profiles(&mut self, rng: &mut dyn RandomSource) -> Option<usize> {
        if self.buses.is_empty() {
            self.winner_index = None;
            return None;
        }

        let winner = rng.next_index(self.buses.len());
        for (index, bus) in self.buses.iter_mut().enumerate() {
            bus.profile = MotionProfile::draw(rng, index == winner);
        }
        self.winner_index = Some(winner);
        Some(winner)
    }

    /// Enter the running state at `now_ms` and ask for the first frame
    pub fn begin(&mut self, now_ms: f64, duration_ms: f64, scheduler: &mut dyn FrameScheduler) {
        self.state = RaceState::Running;
        self.message = RaceMessage::Started;
        self.start_time_ms = now_ms;
        self.duration_ms = duration_ms;
        self.progress_time = 0.0;
        self.frame = Some(scheduler.request_frame());
    }

    /// Race time fraction at `now_ms`, clamped to `[0, 1]`
    pub fn progress_time(&self, now_ms: f64) -> f64 {
        ((now_ms - self.start_time_ms) / self.duration_ms).clamp(0.0, 1.0)
    }

    /// Per-frame update
    pub fn advance(
        &mut self,
        now_ms: f64,
        geometry: &TrackGeometry,
        scheduler: &mut dyn FrameScheduler,
    ) -> FrameOutcome {
        if self.state != RaceState::Running {
            return FrameOutcome::Ignored;
        }

        let t = self.progress_time(now_ms);
        self.progress_time = t;

        for bus in &mut self.buses {
            bus.x = geometry.x_at(bus.profile.progress_at(t));
        }

        self.compute_ranks();
        self.position_by_rank(geometry);

        if let Some(id) = self.frame.take() {
            scheduler.cancel_frame(id);
        }

        if t >= 1.0 {
            self.state = RaceState::Finished;
            let winner = self.winner_index.filter(|i| *i < self.buses.len()).unwrap_or(0);
            if let Some(bus) = self.buses.get_mut(winner) {
                bus.x = geometry.finish_x;
                self.message = RaceMessage::Winner(bus.name.clone());
            }
            return FrameOutcome::Finished { winner };
        }

        self.frame = Some(scheduler.request_frame());
        FrameOutcome::Continue
    }

    /// Rank by descending `x`. The sort is stable, so tied buses keep their
    /// creation order.
    pub fn compute_ranks(&mut self) {
        let mut order: Vec<usize> = (0..self.buses.len()).collect();
        order.sort_by(|&a, &b| self.buses[b].x.total_cmp(&self.buses[a].x));
        for (rank, index) in order.into_iter().enumerate() {
            self.buses[index].rank = rank;
        }
    }

    /// Ease every bus toward the lane slot of its rank
    pub fn position_by_rank(&mut self, geometry: &TrackGeometry) {
        let count = self.buses.len();
        let easing = self.config.lane_easing;
        for bus in &mut self.buses {
            bus.ease_toward(geometry.lane_slot(bus.rank, count), easing);
        }
    }

    pub fn frame_pending(&self) -> bool {
        self.frame.is_some()
    }

    pub fn winner(&self) -> Option<&Bus> {
        self.winner_index.and_then(|i| self.buses.get(i))
    }

    /// Get compact snapshot for IPC transfer
    pub fn get_snapshot(&self, audio_playing: bool) -> RaceSnapshot {
        RaceSnapshot {
            state: self.state,
            message: self.message.to_string(),
            progress_time: self.progress_time,
            frame_pending: self.frame_pending(),
            audio_playing,
            winner: match self.state {
                RaceState::Finished => self.winner().map(|bus| bus.name.clone()),
                _ => None,
            },
            buses: self.buses.iter().map(BusSnapshot::from).collect(),
        }
    }
}

/// Compact race snapshot for IPC transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub state: RaceState,
    pub message: String,
    pub progress_time: f64,
    pub frame_pending: bool,
    pub audio_playing: bool,
    pub winner: Option<String>,
    pub buses: Vec<BusSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race_server::random::{ScriptedRandom, SeededRandom};
    use crate::race_server::schedule::PendingFrame;
    use crate::race_server::track::TrackLayout;

    fn geometry() -> TrackGeometry {
        TrackGeometry::from_layout(&TrackLayout::default(), &RaceConfig::default())
    }

    fn session(names: &[&str]) -> RaceSession {
        let mut session = RaceSession::new(RaceConfig::default());
        let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        session.rebuild(&names);
        session
    }

    fn assert_ranks_are_permutation(session: &RaceSession) {
        let mut ranks: Vec<usize> = session.buses.iter().map(|b| b.rank).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, (0..session.buses.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_config_defaults_round_trip() {
        let json = serde_json::to_string(&RaceConfig::default()).unwrap();
        assert_eq!(RaceConfig::from_json(&json).unwrap(), RaceConfig::default());

        let partial = RaceConfig::from_json(r#"{ "max_options": 8 }"#).unwrap();
        assert_eq!(partial.max_options, 8);
        assert_eq!(partial.min_options, 2);
    }

    #[test]
    fn test_config_rejects_invalid() {
        assert!(matches!(
            RaceConfig::from_json(r#"{ "min_options": 5, "max_options": 3 }"#),
            Err(ConfigError::OptionBounds { .. })
        ));
        assert!(matches!(
            RaceConfig::from_json(r#"{ "fallback_duration_ms": 0 }"#),
            Err(ConfigError::FallbackDuration(_))
        ));
        assert!(matches!(
            RaceConfig::from_json(r#"{ "lane_easing": 1.5 }"#),
            Err(ConfigError::LaneEasing(_))
        ));
        assert!(matches!(RaceConfig::from_json("not json"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_message_text() {
        assert_eq!(RaceMessage::Ready.to_string(), "Ready to start.");
        assert_eq!(RaceMessage::Started.to_string(), "Engines started!");
        assert_eq!(RaceMessage::Winner("B".into()).to_string(), "Winner: B");
    }

    #[test]
    fn test_assign_profiles_single_winner() {
        let mut session = session(&["A", "B", "C", "D"]);
        let mut rng = SeededRandom::from_seed_u64(3);
        for _ in 0..50 {
            let winner = session.assign_profiles(&mut rng).unwrap();
            let winners: Vec<usize> = session
                .buses
                .iter()
                .enumerate()
                .filter(|(_, b)| b.profile.final_factor == 1.0)
                .map(|(i, _)| i)
                .collect();
            assert_eq!(winners, vec![winner]);
        }
    }

    #[test]
    fn test_ties_keep_creation_order() {
        let mut session = session(&["A", "B", "C"]);
        for bus in &mut session.buses {
            bus.x = 50.0;
        }
        session.buses[2].x = 60.0;
        session.compute_ranks();
        assert_eq!(session.buses[2].rank, 0);
        assert_eq!(session.buses[0].rank, 1);
        assert_eq!(session.buses[1].rank, 2);
    }

    #[test]
    fn test_advance_ignored_when_idle() {
        let mut session = session(&["A", "B"]);
        let mut frames = PendingFrame::new();
        assert_eq!(session.advance(100.0, &geometry(), &mut frames), FrameOutcome::Ignored);
        assert_eq!(frames.requested(), 0);
    }

    #[test]
    fn test_full_race_ranks_and_finish() {
        let geometry = geometry();
        let mut session = session(&["A", "B", "C", "D", "E"]);
        let mut frames = PendingFrame::new();
        let mut rng = ScriptedRandom::new(vec![0.5, 0.1, 0.7, 0.3, 0.9, 0.2, 0.6, 0.4, 0.8]);

        session.reset(&geometry, &mut frames);
        let winner = session.assign_profiles(&mut rng).unwrap();
        assert_eq!(winner, 2);
        session.begin(1000.0, 4000.0, &mut frames);
        assert!(frames.pending().is_some());

        let mut now = 1000.0;
        loop {
            now += 16.0;
            match session.advance(now, &geometry, &mut frames) {
                FrameOutcome::Continue => {
                    assert_ranks_are_permutation(&session);
                    assert!(frames.pending().is_some());
                }
                FrameOutcome::Finished { winner: w } => {
                    assert_eq!(w, winner);
                    break;
                }
                FrameOutcome::Ignored => panic!("frame ignored while running"),
            }
        }

        assert_eq!(session.state, RaceState::Finished);
        assert_eq!(frames.pending(), None);
        assert_eq!(session.buses[winner].x, geometry.finish_x);
        assert_eq!(session.buses[winner].rank, 0);
        assert_eq!(session.message, RaceMessage::Winner("C".into()));
        for (index, bus) in session.buses.iter().enumerate() {
            if index != winner {
                let progress = geometry.progress_of(bus.x);
                assert!(progress <= bus.profile.final_factor + 1e-9);
                assert!(bus.x < geometry.finish_x);
            }
        }

        // No further movement once finished
        assert_eq!(session.advance(now + 16.0, &geometry, &mut frames), FrameOutcome::Ignored);
    }

    #[test]
    fn test_reset_mid_race() {
        let geometry = geometry();
        let mut session = session(&["A", "B", "C"]);
        let mut frames = PendingFrame::new();
        let mut rng = SeededRandom::from_seed_u64(5);

        session.assign_profiles(&mut rng);
        session.begin(0.0, 8000.0, &mut frames);
        session.advance(3000.0, &geometry, &mut frames);
        assert!(frames.pending().is_some());

        session.reset(&geometry, &mut frames);
        assert_eq!(session.state, RaceState::Idle);
        assert_eq!(frames.pending(), None);
        assert_eq!(session.message.to_string(), "Ready to start.");
        for (index, bus) in session.buses.iter().enumerate() {
            assert_eq!(bus.x, geometry.start_x);
            assert_eq!(bus.rank, index);
        }
    }

    #[test]
    fn test_snapshot_reports_winner_only_when_finished() {
        let geometry = geometry();
        let mut session = session(&["A", "B"]);
        let mut frames = PendingFrame::new();
        let mut rng = ScriptedRandom::new(vec![0.0]);

        session.assign_profiles(&mut rng);
        session.begin(0.0, 1000.0, &mut frames);
        let snapshot = session.get_snapshot(true);
        assert_eq!(snapshot.winner, None);
        assert!(snapshot.frame_pending);
        assert_eq!(snapshot.message, "Engines started!");

        session.advance(1000.0, &geometry, &mut frames);
        let snapshot = session.get_snapshot(false);
        assert_eq!(snapshot.state, RaceState::Finished);
        assert_eq!(snapshot.winner.as_deref(), Some("A"));
        assert_eq!(snapshot.message, "Winner: A");
        assert!(!snapshot.frame_pending);
    }
}
