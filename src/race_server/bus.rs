//! Bus - Individual racer state and motion
//!
//! Each bus carries its display data (name, label, color, lane), its live
//! position and rank, and the motion profile drawn at race start. The
//! profile alone decides where the bus is at any point of the race.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::race_server::random::RandomSource;

/// Random parameters shaping one bus's progress curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionProfile {
    /// Fraction of the track reached when the race ends
    pub final_factor: f64,
    pub wobble_amp: f64,
    pub wobble_freq: f64,
    pub wobble_phase: f64,
    /// Center of the speed burst, in race time
    pub surge_time: f64,
    pub surge_amp: f64,
    pub surge_width: f64,
}

impl MotionProfile {
    pub const WINNER_FACTOR: f64 = 1.0;
    pub const LOSER_FACTOR: (f64, f64) = (0.9, 0.98);
    pub const WOBBLE_AMP: (f64, f64) = (0.04, 0.09);
    pub const WOBBLE_FREQ: (f64, f64) = (1.0, 3.5);
    pub const WOBBLE_PHASE: (f64, f64) = (0.0, 1.0);
    pub const SURGE_TIME: (f64, f64) = (0.2, 0.8);
    pub const SURGE_AMP: (f64, f64) = (0.03, 0.09);
    pub const SURGE_WIDTH: (f64, f64) = (0.08, 0.2);

    /// Draw a profile. Losers draw their final factor first; the winner's is
    /// fixed and consumes no draw.
    pub fn draw(rng: &mut dyn RandomSource, is_winner: bool) -> Self {
        let final_factor = if is_winner {
            Self::WINNER_FACTOR
        } else {
            rng.next_range(Self::LOSER_FACTOR.0, Self::LOSER_FACTOR.1)
        };

        Self {
            final_factor,
            wobble_amp: rng.next_range(Self::WOBBLE_AMP.0, Self::WOBBLE_AMP.1),
            wobble_freq: rng.next_range(Self::WOBBLE_FREQ.0, Self::WOBBLE_FREQ.1),
            wobble_phase: rng.next_range(Self::WOBBLE_PHASE.0, Self::WOBBLE_PHASE.1),
            surge_time: rng.next_range(Self::SURGE_TIME.0, Self::SURGE_TIME.1),
            surge_amp: rng.next_range(Self::SURGE_AMP.0, Self::SURGE_AMP.1),
            surge_width: rng.next_range(Self::SURGE_WIDTH.0, Self::SURGE_WIDTH.1),
        }
    }

    /// Track fraction at race time `t` in `[0, 1]`.
    ///
    /// Wobble and surge are damped by `(1 - t)`, so at `t = 1` the result is
    /// exactly `final_factor`. Never exceeds `final_factor`.
    pub fn progress_at(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        let damping = 1.0 - t;
        let wobble = self.wobble_amp
            * (2.0 * PI * (self.wobble_freq * t + self.wobble_phase)).sin()
            * damping;
        let surge = self.surge_amp
            * (-((t - self.surge_time) / self.surge_width).powi(2)).exp()
            * damping;

        (t * self.final_factor + wobble + surge).clamp(0.0, self.final_factor)
    }
}

impl Default for MotionProfile {
    /// Straight line to the finish, used before the first race
    fn default() -> Self {
        Self {
            final_factor: 1.0,
            wobble_amp: 0.0,
            wobble_freq: 0.0,
            wobble_phase: 0.0,
            surge_time: 0.5,
            surge_amp: 0.0,
            surge_width: 1.0,
        }
    }
}

/// Complete state for a single bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bus {
    /// Normalized option name
    pub name: String,
    /// Repeating uppercase label painted on the bus body
    pub label: String,
    /// CSS color from the palette
    pub color: String,
    /// Creation index
    pub lane: usize,
    pub x: f64,
    pub y: f64,
    /// Live standing, 0 = leading
    pub rank: usize,
    pub profile: MotionProfile,
}

impl Bus {
    pub fn new(lane: usize, name: String, label: String, color: String) -> Self {
        Self {
            name,
            label,
            color,
            lane,
            x: 0.0,
            y: 0.0,
            rank: lane,
            profile: MotionProfile::default(),
        }
    }

    /// Back to the start line, standing in creation order
    pub fn reset(&mut self, start_x: f64) {
        self.x = start_x;
        self.rank = self.lane;
    }

    /// Ease `y` part of the way toward `target_y`
    pub fn ease_toward(&mut self, target_y: f64, easing: f64) {
        self.y += (target_y - self.y) * easing;
    }
}

/// Compact bus state for IPC transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusSnapshot {
    pub name: String,
    pub label: String,
    pub color: String,
    pub lane: usize,
    pub x: f64,
    pub y: f64,
    pub rank: usize,
}

impl From<&Bus> for BusSnapshot {
    fn from(bus: &Bus) -> Self {
        Self {
            name: bus.name.clone(),
            label: bus.label.clone(),
            color: bus.color.clone(),
            lane: bus.lane,
            x: bus.x,
            y: bus.y,
            rank: bus.rank,
        }
    }
}
