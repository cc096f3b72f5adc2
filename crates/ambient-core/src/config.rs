//! Runtime configuration for the ambient engine.
//!
//! Every section deserializes with `#[serde(default)]`, so a partial TOML or
//! JSON document only overrides the fields it names.

use crate::constants::*;
use crate::EngineError;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterConfig {
    pub default_volume: f32,
    pub fade_in_sec: f64,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            default_volume: DEFAULT_MASTER_VOLUME,
            fade_in_sec: START_FADE_SEC,
        }
    }
}

/// Shape of the looping noise floor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParams {
    pub buffer_sec: f32,
    pub cutoff_hz: f32,
    pub trim_gain: f32,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            buffer_sec: NOISE_BUFFER_SEC,
            cutoff_hz: NOISE_LOWPASS_HZ,
            trim_gain: NOISE_TRIM_GAIN,
        }
    }
}

/// Envelope and timing of generated notes. The pitch set itself is fixed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteParams {
    pub peak_gain: f32,
    pub attack_sec: f64,
    pub release_sec: f64,
    pub floor_gain: f32,
    pub octave_drop_probability: f32,
    pub min_gap_sec: f64,
    pub max_gap_sec: f64,
}

impl Default for NoteParams {
    fn default() -> Self {
        Self {
            peak_gain: NOTE_PEAK_GAIN,
            attack_sec: NOTE_ATTACK_SEC,
            release_sec: NOTE_RELEASE_SEC,
            floor_gain: NOTE_FLOOR_GAIN,
            octave_drop_probability: OCTAVE_DROP_PROBABILITY,
            min_gap_sec: MIN_NOTE_GAP_SEC,
            max_gap_sec: MAX_NOTE_GAP_SEC,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub schedule_ahead_sec: f64,
    pub poll_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            schedule_ahead_sec: SCHEDULE_AHEAD_SEC,
            poll_interval_ms: POLL_INTERVAL_MS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SootheConfig {
    pub volume: f32,
    pub ramp_sec: f64,
}

impl Default for SootheConfig {
    fn default() -> Self {
        Self {
            volume: SOOTHE_VOLUME,
            ramp_sec: SOOTHE_RAMP_SEC,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientConfig {
    pub master: MasterConfig,
    pub noise: NoiseParams,
    pub notes: NoteParams,
    pub scheduler: SchedulerConfig,
    pub soothe: SootheConfig,
    /// Fixed RNG seed for reproducible soundscapes; random when absent.
    pub seed: Option<u64>,
}

impl AmbientConfig {
    /// Reject values the engine cannot honour (out-of-range gains, empty or
    /// inverted gap ranges, non-positive envelope segments).
    pub fn validate(&self) -> Result<(), EngineError> {
        fn check(ok: bool, what: &str) -> Result<(), EngineError> {
            if ok {
                Ok(())
            } else {
                Err(EngineError::InvalidConfig(what.to_string()))
            }
        }
        // Every float must be finite; TOML happily parses `inf` and `nan`.
        let unit = |v: f32| (0.0..=1.0).contains(&v);
        let secs = |v: f64| v.is_finite() && v >= 0.0;
        let positive_secs = |v: f64| v.is_finite() && v > 0.0;

        check(unit(self.master.default_volume), "master.default_volume must be in [0, 1]")?;
        check(secs(self.master.fade_in_sec), "master.fade_in_sec must be finite and >= 0")?;

        check(
            self.noise.buffer_sec > 0.0 && self.noise.buffer_sec <= MAX_NOISE_BUFFER_SEC,
            "noise.buffer_sec must be in (0, 60]",
        )?;
        check(
            self.noise.cutoff_hz.is_finite() && self.noise.cutoff_hz > 0.0,
            "noise.cutoff_hz must be finite and > 0",
        )?;
        check(unit(self.noise.trim_gain), "noise.trim_gain must be in [0, 1]")?;

        let n = &self.notes;
        check(unit(n.peak_gain), "notes.peak_gain must be in [0, 1]")?;
        check(positive_secs(n.attack_sec), "notes.attack_sec must be finite and > 0")?;
        check(positive_secs(n.release_sec), "notes.release_sec must be finite and > 0")?;
        check(
            n.floor_gain > 0.0 && n.floor_gain < n.peak_gain,
            "notes.floor_gain must be in (0, peak_gain)",
        )?;
        check(
            unit(n.octave_drop_probability),
            "notes.octave_drop_probability must be in [0, 1]",
        )?;
        check(positive_secs(n.min_gap_sec), "notes.min_gap_sec must be finite and > 0")?;
        check(
            n.max_gap_sec.is_finite() && n.max_gap_sec >= n.min_gap_sec,
            "notes.max_gap_sec must be finite and >= notes.min_gap_sec",
        )?;

        check(
            self.scheduler.schedule_ahead_sec > 0.0
                && self.scheduler.schedule_ahead_sec <= MAX_SCHEDULE_AHEAD_SEC,
            "scheduler.schedule_ahead_sec must be in (0, 5]",
        )?;
        check(
            self.scheduler.poll_interval_ms > 0,
            "scheduler.poll_interval_ms must be > 0",
        )?;

        check(unit(self.soothe.volume), "soothe.volume must be in [0, 1]")?;
        check(secs(self.soothe.ramp_sec), "soothe.ramp_sec must be finite and >= 0")?;
        Ok(())
    }
}
