//! Audio - The race soundtrack as seen by the race server
//!
//! The clip's natural length sets the race duration. Decoding and output
//! live outside the crate; the server only asks for the duration, starts
//! playback from the top and stops it again.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    #[error("Audio clip unavailable")]
    Unavailable,
    #[error("Audio clip failed to load: {0}")]
    LoadFailed(String),
    #[error("Invalid clip duration: {0}")]
    InvalidDuration(f64),
    #[error("Playback blocked: {0}")]
    PlaybackBlocked(String),
}

/// A single audio clip played once per race
pub trait AudioClip {
    /// Resolve the clip length. Any wait for metadata is bounded by the
    /// implementation.
    fn duration(&mut self) -> Result<Duration, AudioError>;

    /// Rewind and start playback
    fn play_from_start(&mut self) -> Result<(), AudioError>;

    /// Stop playback and rewind
    fn stop(&mut self);

    fn is_playing(&self) -> bool;
}

/// Convert a reported length in seconds, rejecting unusable values
pub fn duration_from_secs(secs: f64) -> Result<Duration, AudioError> {
    if secs > 0.0 {
        Duration::try_from_secs_f64(secs).map_err(|_| AudioError::InvalidDuration(secs))
    } else {
        Err(AudioError::InvalidDuration(secs))
    }
}

/// No audio at all: duration is never known and playback never starts
#[derive(Debug, Default)]
pub struct SilentClip;

impl AudioClip for SilentClip {
    fn duration(&mut self) -> Result<Duration, AudioError> {
        Err(AudioError::Unavailable)
    }

    fn play_from_start(&mut self) -> Result<(), AudioError> {
        Err(AudioError::PlaybackBlocked("no audio output".to_string()))
    }

    fn stop(&mut self) {}

    fn is_playing(&self) -> bool {
        false
    }
}

/// Clip owned by the webview. The webview reports the metadata duration and
/// whether its `play()` was refused before each start, and mirrors
/// `is_playing` onto its audio element.
#[derive(Debug, Default)]
pub struct ReportedClip {
    duration_secs: Option<f64>,
    load_error: Option<String>,
    blocked: Option<String>,
    playing: bool,
}

impl ReportedClip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report_duration(&mut self, secs: Option<f64>) {
        self.duration_secs = secs;
        self.load_error = None;
    }

    pub fn report_error(&mut self, message: impl Into<String>) {
        self.duration_secs = None;
        self.load_error = Some(message.into());
    }

    /// Record whether the webview's last `play()` was refused
    pub fn report_playback(&mut self, blocked: Option<String>) {
        self.blocked = blocked;
    }
}

impl AudioClip for ReportedClip {
    fn duration(&mut self) -> Result<Duration, AudioError> {
        if let Some(message) = &self.load_error {
            return Err(AudioError::LoadFailed(message.clone()));
        }
        match self.duration_secs {
            Some(secs) => duration_from_secs(secs),
            None => Err(AudioError::Unavailable),
        }
    }

    fn play_from_start(&mut self) -> Result<(), AudioError> {
        if let Some(reason) = &self.blocked {
            self.playing = false;
            return Err(AudioError::PlaybackBlocked(reason.clone()));
        }
        self.playing = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}
