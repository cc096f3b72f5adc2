// ---------------- Native audio (cpal) ----------------
//
// The default output device wraps a `SoftwareDevice`; the cpal callback pulls
// mono frames from it and fans them out to every channel.

use ambient_core::{
    AudioDevice, AudioHost, DeviceState, EngineError, NoiseBed, NoteEvent, SoftwareDevice,
    SoftwareGain, SoftwareSource,
};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::future::{ready, Ready};

#[derive(Default)]
pub struct CpalHost;

impl AudioHost for CpalHost {
    type Device = CpalDevice;

    fn open(&mut self) -> Result<CpalDevice, EngineError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| EngineError::DeviceUnavailable("no default output device".into()))?;
        let supported = device
            .default_output_config()
            .map_err(|e| EngineError::DeviceUnavailable(e.to_string()))?;
        let sample_rate = supported.sample_rate().0 as f32;
        let format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();

        // Held suspended until the engine asks to resume, like a fresh AudioContext.
        let software = SoftwareDevice::new(sample_rate, DeviceState::Suspended);
        let stream = match format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, software.clone()),
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, software.clone()),
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, software.clone()),
            other => {
                return Err(EngineError::DeviceUnavailable(format!(
                    "unsupported sample format {other:?}"
                )))
            }
        }
        .map_err(|e| EngineError::DeviceUnavailable(e.to_string()))?;
        if let Err(e) = stream.pause() {
            log::debug!("stream pause after build: {e}");
        }

        log::info!(
            "output: {} ({} Hz, {} ch, {:?})",
            device.name().unwrap_or_else(|_| "unknown".into()),
            sample_rate,
            config.channels,
            format
        );
        Ok(CpalDevice { software, stream })
    }
}

pub struct CpalDevice {
    software: SoftwareDevice,
    stream: cpal::Stream,
}

impl AudioDevice for CpalDevice {
    type Gain = SoftwareGain;
    type Source = SoftwareSource;
    type Resume = Ready<Result<(), EngineError>>;

    fn current_time(&self) -> f64 {
        self.software.current_time()
    }

    fn sample_rate(&self) -> f32 {
        self.software.sample_rate()
    }

    fn state(&self) -> DeviceState {
        self.software.state()
    }

    fn resume(&self) -> Self::Resume {
        if self.software.state() == DeviceState::Running {
            return ready(Ok(()));
        }
        match self.stream.play() {
            Ok(()) => {
                self.software.set_state(DeviceState::Running);
                ready(Ok(()))
            }
            Err(e) => ready(Err(EngineError::ResumeRefused(e.to_string()))),
        }
    }

    fn create_master(&mut self, initial: f32) -> Result<SoftwareGain, EngineError> {
        self.software.create_master(initial)
    }

    fn play_noise(&mut self, bed: &NoiseBed, into: &SoftwareGain) -> Result<SoftwareSource, EngineError> {
        self.software.play_noise(bed, into)
    }

    fn play_note(&mut self, note: &NoteEvent, into: &SoftwareGain) -> Result<(), EngineError> {
        self.software.play_note(note, into)
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    software: SoftwareDevice,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = (config.channels as usize).max(1);
    let mut mono: Vec<f32> = Vec::new();
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            mono.resize(data.len() / channels, 0.0);
            software.render(&mut mono);
            for (frame, &s) in data.chunks_mut(channels).zip(mono.iter()) {
                let v = T::from_sample(s.clamp(-1.0, 1.0));
                for out in frame.iter_mut() {
                    *out = v;
                }
            }
        },
        |err| log::error!("audio stream error: {err}"),
        None,
    )
}
