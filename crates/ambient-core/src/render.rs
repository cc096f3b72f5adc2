//! Pure-Rust rendering of the ambient graph.
//!
//! `SoftwareDevice` is a cheap clonable handle onto a shared [`Mixer`]. The
//! engine drives it through the [`AudioDevice`] trait from its own thread while
//! a realtime callback (cpal) or a test pulls samples with [`SoftwareDevice::render`].
//! The device clock is the number of rendered frames, so it is sample accurate
//! and stands still while suspended.

use crate::automation::ParamTimeline;
use crate::device::{AudioDevice, AudioHost, DeviceState, GainStage, SourceHandle};
use crate::music::NoteEvent;
use crate::noise::NoiseBed;
use crate::EngineError;
use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type, Q_BUTTERWORTH_F32};
use std::f32::consts::TAU;
use std::future::{ready, Ready};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct NoiseVoice {
    id: u64,
    samples: Vec<f32>,
    pos: usize,
    filter: DirectForm2Transposed<f32>,
    trim: f32,
}

impl NoiseVoice {
    #[inline]
    fn next_sample(&mut self) -> f32 {
        let x = self.samples[self.pos];
        self.pos += 1;
        if self.pos == self.samples.len() {
            self.pos = 0;
        }
        self.filter.run(x) * self.trim
    }
}

struct ToneVoice {
    start: f64,
    stop: f64,
    phase: f32,     // radians
    phase_inc: f32, // radians per sample
    envelope: ParamTimeline,
}

/// Render state shared between the control side and the audio callback.
pub struct Mixer {
    sample_rate: f32,
    frames: u64,
    state: DeviceState,
    master: Option<ParamTimeline>,
    noise: Vec<NoiseVoice>,
    tones: Vec<ToneVoice>,
    next_source_id: u64,
    notes_scheduled: usize,
    last_note_start: Option<f64>,
}

impl Mixer {
    fn new(sample_rate: f32, state: DeviceState) -> Self {
        Self {
            sample_rate,
            frames: 0,
            state,
            master: None,
            noise: Vec::new(),
            tones: Vec::new(),
            next_source_id: 0,
            notes_scheduled: 0,
            last_note_start: None,
        }
    }

    #[inline]
    fn now(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    fn render(&mut self, out: &mut [f32]) {
        if self.state != DeviceState::Running {
            out.fill(0.0);
            return;
        }
        for sample in out.iter_mut() {
            let t = self.now();
            let mut mix = 0.0f32;
            for voice in &mut self.noise {
                mix += voice.next_sample();
            }
            for tone in &mut self.tones {
                if t < tone.start || t >= tone.stop {
                    continue;
                }
                mix += tone.phase.sin() * tone.envelope.value_at(t);
                tone.phase += tone.phase_inc;
                if tone.phase > TAU {
                    tone.phase -= TAU;
                }
            }
            let master = self.master.as_ref().map_or(0.0, |m| m.value_at(t));
            *sample = mix * master;
            self.frames += 1;
        }
        let now = self.now();
        self.tones.retain(|tone| tone.stop > now);
        if let Some(master) = &mut self.master {
            master.prune_before(now);
        }
    }
}

#[derive(Clone)]
pub struct SoftwareDevice {
    mixer: Arc<Mutex<Mixer>>,
    resume_allowed: Arc<AtomicBool>,
}

impl SoftwareDevice {
    pub fn new(sample_rate: f32, state: DeviceState) -> Self {
        Self {
            mixer: Arc::new(Mutex::new(Mixer::new(sample_rate, state))),
            resume_allowed: Arc::new(AtomicBool::new(true)),
        }
    }

    fn mixer(&self) -> MutexGuard<'_, Mixer> {
        self.mixer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fill `out` with mono frames, advancing the clock by `out.len()` frames
    /// while running.
    pub fn render(&self, out: &mut [f32]) {
        self.mixer().render(out);
    }

    pub fn render_seconds(&self, seconds: f64) -> Vec<f32> {
        let frames = (seconds * self.sample_rate() as f64).round() as usize;
        let mut out = vec![0.0; frames];
        self.render(&mut out);
        out
    }

    pub fn set_state(&self, state: DeviceState) {
        self.mixer().state = state;
    }

    /// Whether `resume()` succeeds; lets callers model a host that refuses to
    /// resume outside a user gesture.
    pub fn set_resume_allowed(&self, allowed: bool) {
        self.resume_allowed.store(allowed, Ordering::SeqCst);
    }

    pub fn active_noise_voices(&self) -> usize {
        self.mixer().noise.len()
    }

    pub fn active_notes(&self) -> usize {
        self.mixer().tones.len()
    }

    /// Total number of `play_note` calls accepted since the device opened.
    pub fn notes_scheduled(&self) -> usize {
        self.mixer().notes_scheduled
    }

    /// Start time of the most recently scheduled note.
    pub fn last_note_start(&self) -> Option<f64> {
        self.mixer().last_note_start
    }

    pub fn master_value(&self) -> Option<f32> {
        let mixer = self.mixer();
        let now = mixer.now();
        mixer.master.as_ref().map(|m| m.value_at(now))
    }
}

impl AudioDevice for SoftwareDevice {
    type Gain = SoftwareGain;
    type Source = SoftwareSource;
    type Resume = Ready<Result<(), EngineError>>;

    fn current_time(&self) -> f64 {
        self.mixer().now()
    }

    fn sample_rate(&self) -> f32 {
        self.mixer().sample_rate
    }

    fn state(&self) -> DeviceState {
        self.mixer().state
    }

    fn resume(&self) -> Self::Resume {
        let mut mixer = self.mixer();
        let state = mixer.state;
        match state {
            DeviceState::Running => ready(Ok(())),
            DeviceState::Closed => ready(Err(EngineError::ResumeRefused(
                "device is closed".into(),
            ))),
            DeviceState::Suspended if self.resume_allowed.load(Ordering::SeqCst) => {
                mixer.state = DeviceState::Running;
                ready(Ok(()))
            }
            DeviceState::Suspended => ready(Err(EngineError::ResumeRefused(
                "resume not allowed by host".into(),
            ))),
        }
    }

    fn create_master(&mut self, initial: f32) -> Result<Self::Gain, EngineError> {
        let mut mixer = self.mixer();
        let now = mixer.now();
        let mut master = ParamTimeline::new(initial);
        master.set_value_at_time(initial, now);
        mixer.master = Some(master);
        Ok(SoftwareGain {
            mixer: Arc::clone(&self.mixer),
        })
    }

    fn play_noise(&mut self, bed: &NoiseBed, _into: &Self::Gain) -> Result<Self::Source, EngineError> {
        if bed.samples.is_empty() {
            return Err(EngineError::Graph("empty noise buffer".into()));
        }
        let mut mixer = self.mixer();
        let coeffs = Coefficients::<f32>::from_params(
            Type::LowPass,
            mixer.sample_rate.hz(),
            bed.cutoff_hz.hz(),
            Q_BUTTERWORTH_F32,
        )
        .map_err(|e| EngineError::Graph(format!("low-pass at {} Hz: {:?}", bed.cutoff_hz, e)))?;
        let id = mixer.next_source_id;
        mixer.next_source_id += 1;
        mixer.noise.push(NoiseVoice {
            id,
            samples: bed.samples.clone(),
            pos: 0,
            filter: DirectForm2Transposed::<f32>::new(coeffs),
            trim: bed.trim_gain,
        });
        Ok(SoftwareSource {
            id,
            mixer: Arc::clone(&self.mixer),
            stopped: false,
        })
    }

    fn play_note(&mut self, note: &NoteEvent, _into: &Self::Gain) -> Result<(), EngineError> {
        let mut mixer = self.mixer();
        let nyquist = mixer.sample_rate / 2.0;
        if !(note.frequency_hz > 0.0 && note.frequency_hz < nyquist) {
            return Err(EngineError::Graph(format!(
                "note frequency {} Hz outside (0, {nyquist})",
                note.frequency_hz
            )));
        }
        let start = note.start_time_sec;
        let peak_at = start + note.attack_sec;
        let mut envelope = ParamTimeline::new(0.0);
        envelope.set_value_at_time(0.0, start);
        envelope.linear_ramp_to_value_at_time(note.peak_gain, peak_at);
        envelope.exponential_ramp_to_value_at_time(note.floor_gain, note.stop_time_sec());
        let phase_inc = TAU * note.frequency_hz / mixer.sample_rate;
        mixer.tones.push(ToneVoice {
            start,
            stop: note.stop_time_sec(),
            phase: 0.0,
            phase_inc,
            envelope,
        });
        mixer.notes_scheduled += 1;
        mixer.last_note_start = Some(start);
        Ok(())
    }
}

/// Handle onto the mixer's master bus.
pub struct SoftwareGain {
    mixer: Arc<Mutex<Mixer>>,
}

impl SoftwareGain {
    fn with_master(&self, f: impl FnOnce(&mut ParamTimeline, f64)) {
        let mut mixer = self.mixer.lock().unwrap_or_else(PoisonError::into_inner);
        let now = mixer.now();
        if let Some(master) = &mut mixer.master {
            f(master, now);
        }
    }
}

impl GainStage for SoftwareGain {
    fn value(&self) -> f32 {
        let mut value = 0.0;
        self.with_master(|m, now| value = m.value_at(now));
        value
    }

    fn cancel_scheduled_values(&self, from: f64) {
        self.with_master(|m, _| m.cancel_scheduled_values(from));
    }

    fn set_value_at_time(&self, value: f32, time: f64) {
        self.with_master(|m, _| m.set_value_at_time(value, time));
    }

    fn linear_ramp_to_value_at_time(&self, value: f32, time: f64) {
        self.with_master(|m, _| m.linear_ramp_to_value_at_time(value, time));
    }
}

pub struct SoftwareSource {
    id: u64,
    mixer: Arc<Mutex<Mixer>>,
    stopped: bool,
}

impl SourceHandle for SoftwareSource {
    fn stop(&mut self) -> Result<(), EngineError> {
        if self.stopped {
            return Err(EngineError::Graph(format!("source {} already stopped", self.id)));
        }
        self.stopped = true;
        let mut mixer = self.mixer.lock().unwrap_or_else(PoisonError::into_inner);
        mixer.noise.retain(|v| v.id != self.id);
        Ok(())
    }
}

/// Options for [`OfflineHost`].
#[derive(Clone, Debug)]
pub struct OfflineConfig {
    pub sample_rate: f32,
    /// Devices open suspended, as browsers do before a user gesture.
    pub start_suspended: bool,
    pub refuse_resume: bool,
    /// `open` fails as if the machine had no audio output.
    pub unavailable: bool,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 8_000.0,
            start_suspended: false,
            refuse_resume: false,
            unavailable: false,
        }
    }
}

/// Host that opens software devices nobody listens to; the caller renders
/// them by hand. Handy for tests and for rendering a soundscape to a file.
pub struct OfflineHost {
    config: OfflineConfig,
    opened: usize,
}

impl OfflineHost {
    pub fn new(config: OfflineConfig) -> Self {
        Self { config, opened: 0 }
    }

    /// How many devices have been opened so far.
    pub fn opened(&self) -> usize {
        self.opened
    }

    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.config.unavailable = unavailable;
    }
}

impl Default for OfflineHost {
    fn default() -> Self {
        Self::new(OfflineConfig::default())
    }
}

impl AudioHost for OfflineHost {
    type Device = SoftwareDevice;

    fn open(&mut self) -> Result<Self::Device, EngineError> {
        if self.config.unavailable {
            return Err(EngineError::DeviceUnavailable("offline host has no output".into()));
        }
        let state = if self.config.start_suspended {
            DeviceState::Suspended
        } else {
            DeviceState::Running
        };
        let device = SoftwareDevice::new(self.config.sample_rate, state);
        device.set_resume_allowed(!self.config.refuse_resume);
        self.opened += 1;
        log::debug!(
            "offline device #{} opened at {} Hz ({:?})",
            self.opened,
            self.config.sample_rate,
            state
        );
        Ok(device)
    }
}
