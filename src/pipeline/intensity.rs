//! Loudness measurement and loudness-to-color lookup.
//!
//! A chunk's level is its RMS converted to dBFS. Colors come from an ascending
//! threshold table: the entry with the highest threshold not above the level
//! wins.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest RMS value fed to the logarithm.
pub const FLOOR_EPSILON: f32 = 1e-10;

/// Level of a silent chunk: `20 * log10(FLOOR_EPSILON)`.
pub const SILENCE_FLOOR_DB: f32 = -200.0;

/// An 8-bit RGB color, written `[r, g, b]` in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const YELLOW: Rgb = Rgb(255, 255, 0);
    pub const ORANGE: Rgb = Rgb(255, 165, 0);
    pub const RED: Rgb = Rgb(255, 0, 0);
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// dBFS-like loudness of one chunk.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct IntensityLevel(pub f32);

impl IntensityLevel {
    pub const FLOOR: IntensityLevel = IntensityLevel(SILENCE_FLOOR_DB);

    pub fn db(self) -> f32 {
        self.0
    }
}

impl fmt::Display for IntensityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} dBFS", self.0)
    }
}

/// Root-mean-square of `samples`; 0.0 for an empty slice.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_of_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_of_squares / samples.len() as f64).sqrt() as f32
}

/// Computes `20 * log10(max(rms, FLOOR_EPSILON))`.
///
/// Silence maps to [`SILENCE_FLOOR_DB`], never to negative infinity.
pub fn compute_level(samples: &[f32]) -> IntensityLevel {
    let rms = rms(samples);
    if !rms.is_finite() || rms <= FLOOR_EPSILON {
        return IntensityLevel::FLOOR;
    }
    IntensityLevel((20.0 * rms.log10()).max(SILENCE_FLOOR_DB))
}

/// Ordered `(threshold, color)` pairs with strictly increasing thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorThresholdTable {
    entries: Vec<(f32, Rgb)>,
}

impl ColorThresholdTable {
    /// Builds a table from ascending `(threshold_db, color)` pairs.
    ///
    /// # Errors
    /// - `InvalidConfig` if the table is empty, a threshold is not finite, or
    ///   thresholds are not strictly increasing
    pub fn new(entries: Vec<(f32, Rgb)>) -> Result<Self> {
        if entries.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "color threshold table is empty".to_string(),
            ));
        }

        if let Some((db, _)) = entries.iter().find(|(db, _)| !db.is_finite()) {
            return Err(PipelineError::InvalidConfig(format!(
                "color threshold {db} is not a finite number"
            )));
        }

        if let Some(pair) = entries.windows(2).find(|pair| pair[0].0 >= pair[1].0) {
            return Err(PipelineError::InvalidConfig(format!(
                "color thresholds must be strictly increasing ({} dB is followed by {} dB)",
                pair[0].0, pair[1].0
            )));
        }

        Ok(Self { entries })
    }

    /// Builds a table whose lowest entry is `floor_color` at [`SILENCE_FLOOR_DB`].
    ///
    /// Levels below the first configured threshold therefore get `floor_color`.
    ///
    /// # Errors
    /// - `InvalidConfig` if a threshold is at or below the silence floor, or
    ///   for any reason [`ColorThresholdTable::new`] rejects
    pub fn with_floor(floor_color: Rgb, thresholds: &[(f32, Rgb)]) -> Result<Self> {
        if let Some((db, _)) = thresholds.iter().find(|(db, _)| *db <= SILENCE_FLOOR_DB) {
            return Err(PipelineError::InvalidConfig(format!(
                "color threshold {db} dB must be above the silence floor ({SILENCE_FLOOR_DB} dB)"
            )));
        }

        let mut entries = Vec::with_capacity(thresholds.len() + 1);
        entries.push((SILENCE_FLOOR_DB, floor_color));
        entries.extend_from_slice(thresholds);
        Self::new(entries)
    }

    pub fn entries(&self) -> &[(f32, Rgb)] {
        &self.entries
    }
}

/// Returns the color of the highest threshold `<= level`.
///
/// Levels below every threshold get the lowest entry's color.
pub fn map_to_color(level: IntensityLevel, table: &ColorThresholdTable) -> Rgb {
    // number of thresholds <= level; NaN compares false and lands on the lowest entry
    let above = table.entries.partition_point(|(threshold, _)| *threshold <= level.db());
    let index = above.saturating_sub(1);
    table.entries[index].1
}
