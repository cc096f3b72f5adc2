use crate::config::NoiseParams;
use rand::Rng;

/// One loop of raw noise plus the shaping the device applies when playing it.
///
/// The buffer is plain uniform noise in [-1, 1]; the low-pass at `cutoff_hz`
/// and the `trim_gain` are what turn it into a soft room tone, so devices must
/// always route it through both.
#[derive(Clone, Debug)]
pub struct NoiseBed {
    pub samples: Vec<f32>,
    pub sample_rate: f32,
    pub cutoff_hz: f32,
    pub trim_gain: f32,
}

impl NoiseBed {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, sample_rate: f32, params: &NoiseParams) -> Self {
        let len = ((params.buffer_sec * sample_rate) as usize).max(1);
        let samples = (0..len).map(|_| rng.gen_range(-1.0f32..=1.0)).collect();
        Self {
            samples,
            sample_rate,
            cutoff_hz: params.cutoff_hz,
            trim_gain: params.trim_gain,
        }
    }

    pub fn duration_sec(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate
    }
}
