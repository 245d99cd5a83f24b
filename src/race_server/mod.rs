//! Race Server Module
//!
//! Bus race picker core: builds one bus per option, animates them frame by
//! frame and declares the winner drawn at race start. Rendering and audio
//! output stay with the host.

pub mod audio;
pub mod bus;
pub mod race;
pub mod random;
pub mod schedule;
pub mod simulation;
pub mod track;

pub use audio::{AudioClip, AudioError, ReportedClip, SilentClip};
pub use bus::{Bus, BusSnapshot, MotionProfile};
pub use race::{
    ConfigError, FrameOutcome, RaceConfig, RaceMessage, RaceSession, RaceSnapshot, RaceState,
};
pub use random::{RandomSource, ScriptedRandom, SeededRandom};
pub use schedule::{FrameId, FrameScheduler, PendingFrame};
pub use simulation::RaceServer;
pub use track::{TrackGeometry, TrackLayout};
