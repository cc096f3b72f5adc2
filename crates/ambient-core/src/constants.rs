//! Tuning constants for the ambient engine.
//!
//! These are the defaults behind [`crate::AmbientConfig`]; the config is what
//! the engine actually reads at runtime.

// Master bus
pub const DEFAULT_MASTER_VOLUME: f32 = 0.5;
pub const START_FADE_SEC: f64 = 0.5; // fade-in applied by start()

// Noise bed
pub const NOISE_BUFFER_SEC: f32 = 2.0; // looped, so short is fine
pub const NOISE_LOWPASS_HZ: f32 = 400.0; // well below the melody range
pub const NOISE_TRIM_GAIN: f32 = 0.05;
pub const MAX_NOISE_BUFFER_SEC: f32 = 60.0;

// Notes
pub const ROOT_MIDI: i32 = 60; // C4
/// C major pentatonic over one and a half octaves (semitones above the root).
pub const PENTATONIC_DEGREES: [i32; 8] = [0, 2, 4, 7, 9, 12, 14, 16];
pub const NOTE_PEAK_GAIN: f32 = 0.1;
pub const NOTE_ATTACK_SEC: f64 = 2.0;
pub const NOTE_RELEASE_SEC: f64 = 4.0;
pub const NOTE_FLOOR_GAIN: f32 = 0.001; // exponential ramps cannot reach 0
pub const OCTAVE_DROP_PROBABILITY: f32 = 0.3;
pub const MIN_NOTE_GAP_SEC: f64 = 2.0;
pub const MAX_NOTE_GAP_SEC: f64 = 6.0;

// Scheduler
pub const SCHEDULE_AHEAD_SEC: f64 = 0.1;
pub const POLL_INTERVAL_MS: u64 = 25;
pub const MAX_SCHEDULE_AHEAD_SEC: f64 = 5.0;

// Soothing response to anxious text
pub const SOOTHE_VOLUME: f32 = 0.1;
pub const SOOTHE_RAMP_SEC: f64 = 2.0;
