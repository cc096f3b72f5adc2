//! The seam between the engine and whatever produces sound.
//!
//! A host (browser, cpal, offline renderer) opens one [`AudioDevice`]; the
//! engine builds its graph through it. Times are seconds on the device clock,
//! which is sample accurate and only advances while the device is running.

use crate::music::NoteEvent;
use crate::noise::NoiseBed;
use crate::EngineError;
use std::future::Future;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceState {
    Running,
    /// Imposed by the host (autoplay policy, paused stream); no sound and no
    /// clock progress until resumed.
    Suspended,
    Closed,
}

/// Something able to open the audio output.
pub trait AudioHost {
    type Device: AudioDevice;

    fn open(&mut self) -> Result<Self::Device, EngineError>;
}

pub trait AudioDevice {
    type Gain: GainStage;
    type Source: SourceHandle;
    /// Completes once the device is running. Must not borrow the device so
    /// single-threaded callers can release their own borrows while waiting.
    type Resume: Future<Output = Result<(), EngineError>> + 'static;

    fn current_time(&self) -> f64;
    fn sample_rate(&self) -> f32;
    fn state(&self) -> DeviceState;
    fn resume(&self) -> Self::Resume;

    /// Create the gain stage connected straight to the device output.
    fn create_master(&mut self, initial: f32) -> Result<Self::Gain, EngineError>;

    /// Start `bed` looping through its low-pass filter and trim into `into`.
    fn play_noise(&mut self, bed: &NoiseBed, into: &Self::Gain) -> Result<Self::Source, EngineError>;

    /// Schedule a self-terminating sine tone with the note's envelope into `into`.
    fn play_note(&mut self, note: &NoteEvent, into: &Self::Gain) -> Result<(), EngineError>;
}

/// An automatable gain parameter.
pub trait GainStage {
    /// Instantaneous value at the device's current time.
    fn value(&self) -> f32;
    fn cancel_scheduled_values(&self, from: f64);
    fn set_value_at_time(&self, value: f32, time: f64);
    fn linear_ramp_to_value_at_time(&self, value: f32, time: f64);
}

/// A playing source that can be stopped early.
pub trait SourceHandle {
    /// Stopping twice may report an error; callers treat that as harmless.
    fn stop(&mut self) -> Result<(), EngineError>;
}
