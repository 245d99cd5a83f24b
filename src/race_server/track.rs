//! Track - Options, bus construction and track geometry
//!
//! Turns the user's option inputs into one bus per option and converts the
//! measurements reported by the rendering surface into the numbers the
//! animator works with.

use serde::{Deserialize, Serialize};

use crate::race_server::bus::Bus;
use crate::race_server::race::RaceConfig;

/// Bus body colors, assigned by `index % 10`
pub const BUS_COLORS: [&str; 10] = [
    "#f4b400", "#f57c00", "#e53935", "#43a047", "#1e88e5", "#8e24aa", "#00acc1", "#f06292",
    "#7cb342", "#5c6bc0",
];

const LABEL_SEPARATOR: &str = " · ";
const LABEL_FALLBACK: &str = "Option";

/// Clamp a requested option count into the configured bounds
pub fn clamp_option_count(count: i64, config: &RaceConfig) -> usize {
    count.clamp(config.min_options as i64, config.max_options as i64) as usize
}

/// Placeholder name for the option at `index`
pub fn default_option_name(index: usize) -> String {
    format!("Option {}", index + 1)
}

/// Fresh option inputs, prefilled with their placeholder names
pub fn default_options(count: i64, config: &RaceConfig) -> Vec<String> {
    (0..clamp_option_count(count, config))
        .map(default_option_name)
        .collect()
}

/// Trim names, fill blanks with placeholders, and pad or truncate the list
/// to the configured bounds
pub fn normalize_options(inputs: &[String], config: &RaceConfig) -> Vec<String> {
    let count = clamp_option_count(inputs.len() as i64, config);

    (0..count)
        .map(|index| match inputs.get(index).map(|name| name.trim()) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => default_option_name(index),
        })
        .collect()
}

/// Repeat `name` with a separator until it is at least `min_len` characters,
/// then uppercase it
pub fn repeating_label(name: &str, min_len: usize) -> String {
    let clean = match name.trim() {
        "" => LABEL_FALLBACK,
        trimmed => trimmed,
    };

    let mut text = clean.to_string();
    let mut len = text.chars().count();
    let step = LABEL_SEPARATOR.chars().count() + clean.chars().count();
    while len < min_len {
        text.push_str(LABEL_SEPARATOR);
        text.push_str(clean);
        len += step;
    }
    text.to_uppercase()
}

/// Palette color for the bus at `index`
pub fn bus_color(index: usize) -> &'static str {
    BUS_COLORS[index % BUS_COLORS.len()]
}

/// One fresh bus per name, laid out in creation order
pub fn build_buses(names: &[String], config: &RaceConfig) -> Vec<Bus> {
    names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            Bus::new(
                index,
                name.clone(),
                repeating_label(name, config.label_min_len),
                bus_color(index).to_string(),
            )
        })
        .collect()
}

/// Raw measurements from the rendering surface, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackLayout {
    pub track_left: f64,
    pub track_height: f64,
    pub finish_line_left: f64,
    /// Rendered bus width, if any bus has been laid out yet
    pub bus_width: Option<f64>,
}

impl Default for TrackLayout {
    fn default() -> Self {
        Self {
            track_left: 0.0,
            track_height: 600.0,
            finish_line_left: 1000.0,
            bus_width: None,
        }
    }
}

/// Track coordinates consumed by the animator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackGeometry {
    pub start_x: f64,
    pub finish_x: f64,
    pub track_height: f64,
    lane_offset: f64,
}

impl TrackGeometry {
    pub fn from_layout(layout: &TrackLayout, config: &RaceConfig) -> Self {
        let start_x = config.start_x;
        let bus_width = layout
            .bus_width
            .filter(|width| *width > 0.0)
            .unwrap_or(config.default_bus_width);
        let finish_x =
            layout.finish_line_left - layout.track_left - bus_width - config.finish_margin;

        Self {
            start_x,
            finish_x: finish_x.max(start_x + config.min_track_span),
            track_height: layout.track_height,
            lane_offset: config.lane_offset,
        }
    }

    /// Horizontal coordinate for a track fraction
    pub fn x_at(&self, progress: f64) -> f64 {
        self.start_x + (self.finish_x - self.start_x) * progress
    }

    /// Inverse of `x_at`
    pub fn progress_of(&self, x: f64) -> f64 {
        (x - self.start_x) / (self.finish_x - self.start_x)
    }

    /// Vertical slot for a bus standing at `rank` among `count`
    pub fn lane_slot(&self, rank: usize, count: usize) -> f64 {
        let gap = self.track_height / (count as f64 + 1.0);
        gap * (rank as f64 + 1.0) - self.lane_offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_clamp_option_count() {
        let config = RaceConfig::default();
        for requested in 1..=100 {
            let count = clamp_option_count(requested, &config);
            assert!((2..=20).contains(&count));
        }
        assert_eq!(clamp_option_count(-5, &config), 2);
        assert_eq!(clamp_option_count(7, &config), 7);
        assert_eq!(default_options(3, &config), names(&["Option 1", "Option 2", "Option 3"]));
    }

    #[test]
    fn test_normalize_options() {
        let config = RaceConfig::default();
        let normalized = normalize_options(&names(&["  Pizza ", "", "   "]), &config);
        assert_eq!(normalized, names(&["Pizza", "Option 2", "Option 3"]));

        let padded = normalize_options(&names(&["Solo"]), &config);
        assert_eq!(padded, names(&["Solo", "Option 2"]));

        let many: Vec<String> = (0..30).map(|i| format!("n{}", i)).collect();
        let truncated = normalize_options(&many, &config);
        assert_eq!(truncated.len(), 20);
        assert_eq!(truncated[19], "n19");
    }

    #[test]
    fn test_repeating_label() {
        let label = repeating_label("Tacos", 26);
        assert_eq!(label, "TACOS · TACOS · TACOS · TACOS");
        assert!(label.chars().count() >= 26);

        let long = "A very long option name indeed";
        assert_eq!(repeating_label(long, 26), long.to_uppercase());

        assert!(repeating_label("  ", 26).starts_with("OPTION · OPTION"));
    }

    #[test]
    fn test_build_buses_cycles_palette() {
        let config = RaceConfig::default();
        let list: Vec<String> = (0..12).map(default_option_name).collect();
        let buses = build_buses(&list, &config);

        assert_eq!(buses.len(), 12);
        assert_eq!(buses[0].color, BUS_COLORS[0]);
        assert_eq!(buses[10].color, BUS_COLORS[0]);
        assert_eq!(buses[11].color, BUS_COLORS[1]);
        for (index, bus) in buses.iter().enumerate() {
            assert_eq!(bus.lane, index);
            assert_eq!(bus.rank, index);
        }
    }

    #[test]
    fn test_build_buses_is_idempotent() {
        let config = RaceConfig::default();
        let list = names(&["A", "B", "C"]);
        let first = build_buses(&list, &config);
        let second = build_buses(&list, &config);

        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.label, b.label);
            assert_eq!(a.lane, b.lane);
            assert_eq!(a.color, b.color);
        }
    }

    #[test]
    fn test_geometry_from_layout() {
        let config = RaceConfig::default();
        let layout = TrackLayout {
            track_left: 20.0,
            track_height: 400.0,
            finish_line_left: 1220.0,
            bus_width: None,
        };
        let geometry = TrackGeometry::from_layout(&layout, &config);
        assert_eq!(geometry.start_x, 90.0);
        assert_eq!(geometry.finish_x, 1220.0 - 20.0 - 180.0 - 10.0);
        assert_eq!(geometry.x_at(0.0), 90.0);
        assert_eq!(geometry.x_at(1.0), geometry.finish_x);

        // Narrow surfaces still leave a minimum span
        let narrow = TrackLayout {
            finish_line_left: 100.0,
            bus_width: Some(60.0),
            ..layout
        };
        let geometry = TrackGeometry::from_layout(&narrow, &config);
        assert_eq!(geometry.finish_x, 210.0);
    }

    #[test]
    fn test_lane_slot() {
        let config = RaceConfig::default();
        let layout = TrackLayout {
            track_height: 400.0,
            ..TrackLayout::default()
        };
        let geometry = TrackGeometry::from_layout(&layout, &config);
        assert_eq!(geometry.lane_slot(0, 3), 60.0);
        assert_eq!(geometry.lane_slot(2, 3), 260.0);
    }
}
