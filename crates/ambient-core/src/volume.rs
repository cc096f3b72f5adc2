use crate::device::GainStage;

/// The single loudness control every sound passes through.
///
/// Changes are always ramps that start from the value the stage has right
/// now. Any ramp still in flight is cancelled first, so overlapping requests
/// never fight each other: the latest call wins.
pub struct MasterVolume<G: GainStage> {
    gain: G,
}

impl<G: GainStage> MasterVolume<G> {
    /// Take ownership of `gain` and pin it at `initial` right away.
    pub fn new(gain: G, initial: f32, now: f64) -> Self {
        let initial = initial.clamp(0.0, 1.0);
        gain.cancel_scheduled_values(now);
        gain.set_value_at_time(initial, now);
        Self { gain }
    }

    pub fn gain(&self) -> &G {
        &self.gain
    }

    pub fn value(&self) -> f32 {
        self.gain.value()
    }

    /// Ramp linearly to `level` over `ramp_sec`, starting at `now`.
    ///
    /// `level` is clamped to [0, 1]; a non-finite level is ignored. Negative or
    /// non-finite ramp lengths are treated as zero, which sets the value at `now`.
    pub fn set_volume(&self, level: f32, ramp_sec: f64, now: f64) {
        if !level.is_finite() {
            log::warn!("ignoring non-finite master volume {level}");
            return;
        }
        let level = level.clamp(0.0, 1.0);
        let ramp_sec = if ramp_sec.is_finite() { ramp_sec.max(0.0) } else { 0.0 };

        let current = self.gain.value();
        self.gain.cancel_scheduled_values(now);
        self.gain.set_value_at_time(current, now);
        if ramp_sec > 0.0 {
            self.gain.linear_ramp_to_value_at_time(level, now + ramp_sec);
        } else {
            self.gain.set_value_at_time(level, now);
        }
        log::debug!("master volume {current:.3} -> {level:.3} over {ramp_sec:.2}s");
    }

    /// Drop to silence at `now` and ramp up to `level`, replacing any ramp in
    /// flight. Used when playback starts so sound never appears at full level.
    pub fn fade_in(&self, level: f32, ramp_sec: f64, now: f64) {
        let level = if level.is_finite() { level.clamp(0.0, 1.0) } else { 0.0 };
        self.gain.cancel_scheduled_values(now);
        self.gain.set_value_at_time(0.0, now);
        if ramp_sec > 0.0 {
            self.gain.linear_ramp_to_value_at_time(level, now + ramp_sec);
        } else {
            self.gain.set_value_at_time(level, now);
        }
    }
}
