use crate::config::NoteParams;
use crate::constants::{PENTATONIC_DEGREES, ROOT_MIDI};
use rand::prelude::*;

/// A single melodic tone handed to the audio device for playback.
///
/// Fields:
/// - `frequency_hz`: pitch in Hertz, always from the pentatonic set or an octave below
/// - `peak_gain`: envelope level reached at the end of the attack
/// - `start_time_sec`: absolute start time on the device clock, in seconds
/// - `attack_sec`: linear rise from silence to `peak_gain`
/// - `release_sec`: exponential fall from `peak_gain` down to `floor_gain`
/// - `floor_gain`: level the release decays to before the oscillator stops
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NoteEvent {
    pub frequency_hz: f32,
    pub peak_gain: f32,
    pub start_time_sec: f64,
    pub attack_sec: f64,
    pub release_sec: f64,
    pub floor_gain: f32,
}

impl NoteEvent {
    /// Device time at which the note's oscillator stops itself.
    pub fn stop_time_sec(&self) -> f64 {
        self.start_time_sec + self.attack_sec + self.release_sec
    }
}

/// The eight allowed note frequencies, lowest first.
pub fn pentatonic_scale_hz() -> [f32; 8] {
    PENTATONIC_DEGREES.map(|degree| midi_to_hz((ROOT_MIDI + degree) as f32))
}

/// Lookahead note scheduler.
///
/// Keeps a `next_note_time` watermark on the device clock. Each `tick` tops up
/// the queue with every note whose start falls inside `now + schedule_ahead`,
/// advancing the watermark by a random gap each time. Musical timing therefore
/// depends only on the device clock; how often `tick` runs only needs to be
/// comfortably shorter than the lookahead window.
///
/// Typical usage:
/// - Construct with `NoteScheduler::new(params, schedule_ahead_sec, seed)`
/// - Call `reset(now)` when playback (re)starts
/// - Call `tick(now, &mut out_events)` on every poll and play what it pushes
pub struct NoteScheduler {
    params: NoteParams,
    schedule_ahead_sec: f64,
    scale: [f32; 8],
    rng: StdRng,
    next_note_time: f64,
}

impl NoteScheduler {
    pub fn new(params: NoteParams, schedule_ahead_sec: f64, seed: u64) -> Self {
        Self {
            params,
            schedule_ahead_sec,
            scale: pentatonic_scale_hz(),
            rng: StdRng::seed_from_u64(seed),
            next_note_time: 0.0,
        }
    }

    pub fn scale(&self) -> &[f32; 8] {
        &self.scale
    }

    pub fn next_note_time(&self) -> f64 {
        self.next_note_time
    }

    /// Move the watermark to `now_sec` so the next tick emits a note right away.
    pub fn reset(&mut self, now_sec: f64) {
        self.next_note_time = now_sec;
    }

    /// Push every note due before `now_sec + schedule_ahead` into `out_events`.
    /// Returns how many were pushed.
    pub fn tick(&mut self, now_sec: f64, out_events: &mut Vec<NoteEvent>) -> usize {
        let horizon = now_sec + self.schedule_ahead_sec;
        let mut pushed = 0;
        while self.next_note_time < horizon {
            let note = self.note_at(self.next_note_time);
            out_events.push(note);
            pushed += 1;
            let gap = self
                .rng
                .gen_range(self.params.min_gap_sec..=self.params.max_gap_sec);
            self.next_note_time += gap;
        }
        pushed
    }

    fn note_at(&mut self, start_time_sec: f64) -> NoteEvent {
        let base = self.scale[self.rng.gen_range(0..self.scale.len())];
        let drop_octave = self.rng.gen::<f32>() < self.params.octave_drop_probability;
        NoteEvent {
            frequency_hz: if drop_octave { base / 2.0 } else { base },
            peak_gain: self.params.peak_gain,
            start_time_sec,
            attack_sec: self.params.attack_sec,
            release_sec: self.params.release_sec,
            floor_gain: self.params.floor_gain,
        }
    }
}

/// Convert a MIDI note number to Hertz (A4=440 Hz).
///
/// Monotonic and exhibits octave symmetry: +12 semitones doubles the frequency.
pub fn midi_to_hz(midi: f32) -> f32 {
    440.0 * (2.0_f32).powf((midi - 69.0) / 12.0)
}
