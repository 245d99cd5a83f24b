//! Simulation - Race server and user actions
//!
//! Owns the race session together with its collaborators and provides the
//! interface used by the desktop commands: create options, edit options,
//! start, frame, reset and resize.

use std::time::Duration;

use crate::race_server::audio::AudioClip;
use crate::race_server::race::{FrameOutcome, RaceConfig, RaceSession, RaceSnapshot, RaceState};
use crate::race_server::random::RandomSource;
use crate::race_server::schedule::FrameScheduler;
use crate::race_server::track::{self, TrackGeometry, TrackLayout};

/// Main race server
pub struct RaceServer<R, A, S> {
    session: RaceSession,
    /// Raw option inputs as typed by the user
    options: Vec<String>,
    layout: TrackLayout,
    geometry: TrackGeometry,
    rng: R,
    audio: A,
    scheduler: S,
}

impl<R, A, S> RaceServer<R, A, S>
where
    R: RandomSource,
    A: AudioClip,
    S: FrameScheduler,
{
    /// Create a server with default option inputs laid out on the start line
    pub fn new(config: RaceConfig, rng: R, audio: A, scheduler: S) -> Self {
        let layout = TrackLayout::default();
        let geometry = TrackGeometry::from_layout(&layout, &config);
        let options = track::default_options(config.min_options as i64, &config);

        let mut server = Self {
            session: RaceSession::new(config),
            options,
            layout,
            geometry,
            rng,
            audio,
            scheduler,
        };
        server.rebuild_and_reset();
        server
    }

    pub fn config(&self) -> &RaceConfig {
        &self.session.config
    }

    /// Swap the configuration. Stops any race and rebuilds the track.
    pub fn set_config(&mut self, config: RaceConfig) {
        self.geometry = TrackGeometry::from_layout(&self.layout, &config);
        self.session.config = config;
        self.rebuild_and_reset();
        log::info!("Race configuration updated");
    }

    /// Replace the option inputs with `count` prefilled defaults
    pub fn create_options(&mut self, count: i64) -> &[String] {
        self.options = track::default_options(count, self.config());
        self.rebuild_and_reset();
        log::info!("Created {} options", self.options.len());
        &self.options
    }

    /// Store edited option inputs. Takes effect on the next start.
    pub fn set_options(&mut self, names: Vec<String>) {
        self.options = names;
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Names the next race will use
    pub fn option_names(&self) -> Vec<String> {
        track::normalize_options(&self.options, self.config())
    }

    /// Start a race at `now_ms`. Returns `false` if one is already running.
    pub fn start(&mut self, now_ms: f64) -> bool {
        if self.session.state == RaceState::Running {
            log::debug!("Start ignored: race already running");
            return false;
        }

        self.rebuild_and_reset();
        self.session.assign_profiles(&mut self.rng);

        let duration_ms = self.resolve_duration_ms();
        if let Err(e) = self.audio.play_from_start() {
            log::warn!("Race audio did not start, racing silently: {}", e);
        }

        self.session.begin(now_ms, duration_ms, &mut self.scheduler);
        log::info!(
            "Race started: {} buses, {} ms, winner {:?}",
            self.session.buses.len(),
            duration_ms,
            self.session.winner().map(|bus| &bus.name)
        );
        true
    }

    /// Deliver a display frame
    pub fn frame(&mut self, now_ms: f64) -> FrameOutcome {
        let outcome = self
            .session
            .advance(now_ms, &self.geometry, &mut self.scheduler);

        if let FrameOutcome::Finished { winner } = outcome {
            log::info!(
                "Race finished: {}",
                self.session.buses.get(winner).map_or("", |bus| bus.name.as_str())
            );
        }
        outcome
    }

    /// Halt any race, stop the audio and return every bus to the start
    pub fn reset(&mut self) {
        self.session.reset(&self.geometry, &mut self.scheduler);
        self.audio.stop();
        log::info!("Race reset");
    }

    /// New surface measurements. Rebuilds the track and resets.
    pub fn resize(&mut self, layout: TrackLayout) {
        self.layout = layout;
        self.geometry = TrackGeometry::from_layout(&layout, self.config());
        if !self.session.buses.is_empty() {
            self.rebuild_and_reset();
        }
    }

    pub fn state(&self) -> RaceState {
        self.session.state
    }

    pub fn session(&self) -> &RaceSession {
        &self.session
    }

    pub fn geometry(&self) -> &TrackGeometry {
        &self.geometry
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Get current race snapshot
    pub fn get_snapshot(&self) -> RaceSnapshot {
        self.session.get_snapshot(self.audio.is_playing())
    }

    fn rebuild_and_reset(&mut self) {
        let names = self.option_names();
        self.session.rebuild(&names);
        self.reset();
    }

    fn resolve_duration_ms(&mut self) -> f64 {
        let fallback = self.config().fallback_duration_ms;
        match self.audio.duration() {
            Ok(duration) if duration > Duration::ZERO => duration.as_secs_f64() * 1000.0,
            Ok(_) => fallback,
            Err(e) => {
                log::warn!("Race audio duration unknown ({}), using {} ms", e, fallback);
                fallback
            }
        }
    }
}
