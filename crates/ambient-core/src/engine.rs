use crate::config::AmbientConfig;
use crate::device::{AudioDevice, AudioHost, DeviceState, SourceHandle};
use crate::mood;
use crate::music::{NoteEvent, NoteScheduler};
use crate::noise::NoiseBed;
use crate::task::RepeatingTask;
use crate::volume::MasterVolume;
use crate::EngineError;
use instant::Instant;
use rand::prelude::*;
use std::time::Duration;

type DeviceOf<H> = <H as AudioHost>::Device;
type GainOf<H> = <DeviceOf<H> as AudioDevice>::Gain;
type SourceOf<H> = <DeviceOf<H> as AudioDevice>::Source;
/// Future returned by [`AmbientEngine::prepare_start`].
pub type ResumeOf<H> = <DeviceOf<H> as AudioDevice>::Resume;

/// The generative ambient soundscape.
///
/// Owns the host, the lazily opened output device and its master gain stage,
/// the looping noise voice and the note scheduler. One engine per output;
/// hand it by reference to whatever UI controller toggles the music.
///
/// Typical usage:
/// - `AmbientEngine::new(host, config)`
/// - `start().await` on a user gesture, `stop()` to silence it
/// - call `poll(Instant::now())` whenever `next_deadline()` passes
/// - `set_volume(level, ramp)` or `soothe_if_anxious(text)` at any time
pub struct AmbientEngine<H: AudioHost> {
    host: H,
    config: AmbientConfig,
    device: Option<DeviceOf<H>>,
    master: Option<MasterVolume<GainOf<H>>>,
    noise: Option<SourceOf<H>>,
    scheduler: NoteScheduler,
    task: RepeatingTask,
    rng: StdRng,
    playing: bool,
    pending: Vec<NoteEvent>,
}

impl<H: AudioHost> AmbientEngine<H> {
    pub fn new(host: H, config: AmbientConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(rand::random);
        let scheduler = NoteScheduler::new(
            config.notes.clone(),
            config.scheduler.schedule_ahead_sec,
            seed,
        );
        let task = RepeatingTask::new(Duration::from_millis(config.scheduler.poll_interval_ms));
        // Noise gets its own stream so note choices don't depend on buffer length.
        let rng = StdRng::seed_from_u64(seed ^ 0x9E37_79B9_7F4A_7C15);
        log::debug!("ambient engine created (seed {seed})");
        Ok(Self {
            host,
            config,
            device: None,
            master: None,
            noise: None,
            scheduler,
            task,
            rng,
            playing: false,
            pending: Vec::new(),
        })
    }

    pub fn config(&self) -> &AmbientConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// The output device, once `init` has opened it.
    pub fn device(&self) -> Option<&DeviceOf<H>> {
        self.device.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn master_value(&self) -> Option<f32> {
        self.master.as_ref().map(|m| m.value())
    }

    /// Device time of the next note the scheduler will emit.
    pub fn next_note_time(&self) -> f64 {
        self.scheduler.next_note_time()
    }

    /// When the host should call `poll` next; `None` while stopped.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.task.next_deadline()
    }

    pub fn poll_interval(&self) -> Duration {
        self.task.period()
    }

    /// Open the output device and its master stage. Does nothing if already
    /// open; after a failure the next call tries again.
    pub fn init(&mut self) -> Result<(), EngineError> {
        if self.device.is_some() {
            return Ok(());
        }
        let mut device = self.host.open().map_err(|e| {
            log::error!("audio init failed: {e}");
            e
        })?;
        let now = device.current_time();
        let volume = self.config.master.default_volume;
        let gain = device.create_master(volume)?;
        self.master = Some(MasterVolume::new(gain, volume, now));
        log::info!(
            "audio device ready: {} Hz, {:?}",
            device.sample_rate(),
            device.state()
        );
        self.device = Some(device);
        Ok(())
    }

    /// Start playback. A second call while playing does nothing.
    ///
    /// If the host holds the device suspended this waits for it to resume; a
    /// refusal comes back as [`EngineError::ResumeRefused`] with the engine
    /// still stopped, so the caller can retry from a later user gesture.
    pub async fn start(&mut self) -> Result<(), EngineError> {
        if let Some(resume) = self.prepare_start()? {
            resume.await.map_err(|e| {
                log::warn!("audio resume failed: {e}");
                e
            })?;
        }
        self.finish_start()
    }

    /// First half of [`start`](Self::start): initialise and, if the device is
    /// suspended, hand back the future that resumes it. The future borrows
    /// nothing, so callers sharing the engine can release it while waiting.
    pub fn prepare_start(&mut self) -> Result<Option<ResumeOf<H>>, EngineError> {
        self.init()?;
        if self.playing {
            return Ok(None);
        }
        let Some(device) = self.device.as_ref() else {
            return Err(EngineError::DeviceUnavailable("device not initialised".into()));
        };
        match device.state() {
            DeviceState::Running => Ok(None),
            DeviceState::Suspended => {
                log::info!("audio device suspended, resuming");
                Ok(Some(device.resume()))
            }
            DeviceState::Closed => Err(EngineError::DeviceUnavailable("audio device closed".into())),
        }
    }

    /// Second half of [`start`](Self::start): begin playback on a running
    /// device. Does nothing if already playing.
    pub fn finish_start(&mut self) -> Result<(), EngineError> {
        if self.playing {
            return Ok(());
        }
        let (Some(device), Some(master)) = (self.device.as_mut(), self.master.as_ref()) else {
            return Err(EngineError::DeviceUnavailable("device not initialised".into()));
        };
        if device.state() != DeviceState::Running {
            return Err(EngineError::ResumeRefused("audio device is still suspended".into()));
        }

        let now = device.current_time();
        let bed = NoiseBed::generate(&mut self.rng, device.sample_rate(), &self.config.noise);
        let source = device.play_noise(&bed, master.gain())?;
        self.playing = true;
        master.fade_in(
            self.config.master.default_volume,
            self.config.master.fade_in_sec,
            now,
        );
        self.noise = Some(source);
        self.scheduler.reset(now);
        self.task.arm(Instant::now());
        log::info!("ambient engine playing at {now:.3}s");
        self.tick();
        Ok(())
    }

    /// Stop playback: release the noise voice and cancel the scheduler task.
    /// Notes already handed to the device finish their envelopes. Safe to call
    /// at any time, including when nothing is playing.
    pub fn stop(&mut self) {
        let was_playing = self.playing;
        self.playing = false;
        if let Some(mut noise) = self.noise.take() {
            if let Err(e) = noise.stop() {
                log::debug!("noise voice stop ignored: {e}");
            }
        }
        self.task.cancel();
        if was_playing {
            log::info!("ambient engine stopped");
        }
    }

    /// Ramp the master volume to `level` over `ramp_sec`, replacing any ramp
    /// in flight. Before the device exists this is a no-op.
    pub fn set_volume(&mut self, level: f32, ramp_sec: f64) {
        match (self.device.as_ref(), self.master.as_ref()) {
            (Some(device), Some(master)) => master.set_volume(level, ramp_sec, device.current_time()),
            _ => log::debug!("set_volume({level}) before init ignored"),
        }
    }

    /// Dim the mix when `text` reads as anxious and music is playing.
    /// Returns whether it dimmed.
    pub fn soothe_if_anxious(&mut self, text: &str) -> bool {
        if !self.playing || !mood::is_anxious(text) {
            return false;
        }
        let soothe = &self.config.soothe;
        let (volume, ramp) = (soothe.volume, soothe.ramp_sec);
        log::info!("anxious text detected, dimming to {volume} over {ramp}s");
        self.set_volume(volume, ramp);
        true
    }

    /// Run the scheduler if its task is due. Returns the notes issued.
    pub fn poll(&mut self, now: Instant) -> usize {
        if self.task.poll(now) {
            self.tick()
        } else {
            0
        }
    }

    /// One scheduler pass: hand the device every note due inside the
    /// lookahead window. Does nothing while stopped.
    pub fn tick(&mut self) -> usize {
        if !self.playing {
            return 0;
        }
        let (Some(device), Some(master)) = (self.device.as_mut(), self.master.as_ref()) else {
            return 0;
        };
        let now = device.current_time();
        self.pending.clear();
        self.scheduler.tick(now, &mut self.pending);
        let mut issued = 0;
        for note in &self.pending {
            match device.play_note(note, master.gain()) {
                Ok(()) => issued += 1,
                Err(e) => log::warn!("dropping note at {:.3}s: {e}", note.start_time_sec),
            }
        }
        if issued > 0 {
            log::trace!(
                "scheduled {issued} note(s) at {now:.3}s, next at {:.3}s",
                self.scheduler.next_note_time()
            );
        }
        issued
    }
}
