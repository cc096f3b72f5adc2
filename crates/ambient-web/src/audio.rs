use ambient_core::{
    AudioDevice, AudioHost, DeviceState, EngineError, GainStage, NoiseBed, NoteEvent,
    SourceHandle,
};
use std::future::Future;
use std::pin::Pin;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys as web;

fn graph_err(what: &str, e: JsValue) -> EngineError {
    log::error!("{} error: {:?}", what, e);
    EngineError::Graph(format!("{what}: {e:?}"))
}

fn create_gain(audio_ctx: &web::AudioContext, value: f32, label: &str) -> Result<web::GainNode, EngineError> {
    let g = web::GainNode::new(audio_ctx).map_err(|e| graph_err(&format!("{label} GainNode"), e))?;
    g.gain().set_value(value);
    Ok(g)
}

/// Opens one `AudioContext` per call. Browsers create it suspended until a
/// user gesture, which the engine handles through `resume`.
#[derive(Default)]
pub struct WebHost;

impl AudioHost for WebHost {
    type Device = WebDevice;

    fn open(&mut self) -> Result<WebDevice, EngineError> {
        let ctx = web::AudioContext::new().map_err(|e| {
            log::error!("AudioContext error: {:?}", e);
            EngineError::DeviceUnavailable(format!("{e:?}"))
        })?;
        Ok(WebDevice { ctx })
    }
}

pub struct WebDevice {
    ctx: web::AudioContext,
}

impl AudioDevice for WebDevice {
    type Gain = WebGain;
    type Source = WebSource;
    type Resume = Pin<Box<dyn Future<Output = Result<(), EngineError>>>>;

    fn current_time(&self) -> f64 {
        self.ctx.current_time()
    }

    fn sample_rate(&self) -> f32 {
        self.ctx.sample_rate()
    }

    fn state(&self) -> DeviceState {
        match self.ctx.state() {
            web::AudioContextState::Running => DeviceState::Running,
            web::AudioContextState::Suspended => DeviceState::Suspended,
            _ => DeviceState::Closed,
        }
    }

    fn resume(&self) -> Self::Resume {
        let promise = self.ctx.resume();
        Box::pin(async move {
            let refused = |e: JsValue| EngineError::ResumeRefused(format!("{e:?}"));
            JsFuture::from(promise.map_err(refused)?)
                .await
                .map(|_| ())
                .map_err(refused)
        })
    }

    fn create_master(&mut self, initial: f32) -> Result<WebGain, EngineError> {
        let node = create_gain(&self.ctx, initial, "Master")?;
        node.connect_with_audio_node(&self.ctx.destination())
            .map_err(|e| graph_err("master connect", e))?;
        Ok(WebGain { node })
    }

    // buffer source (loop) -> low-pass -> trim -> master
    fn play_noise(&mut self, bed: &NoiseBed, into: &WebGain) -> Result<WebSource, EngineError> {
        let len = bed.samples.len() as u32;
        let buffer = self
            .ctx
            .create_buffer(1, len, bed.sample_rate)
            .map_err(|e| graph_err("noise AudioBuffer", e))?;
        let mut samples = bed.samples.clone();
        buffer
            .copy_to_channel(&mut samples, 0)
            .map_err(|e| graph_err("noise copy", e))?;

        let source = self
            .ctx
            .create_buffer_source()
            .map_err(|e| graph_err("AudioBufferSourceNode", e))?;
        source.set_buffer(Some(&buffer));
        source.set_loop(true);

        let filter = web::BiquadFilterNode::new(&self.ctx).map_err(|e| graph_err("BiquadFilterNode", e))?;
        filter.set_type(web::BiquadFilterType::Lowpass);
        filter.frequency().set_value(bed.cutoff_hz);
        let trim = create_gain(&self.ctx, bed.trim_gain, "noise trim")?;

        source
            .connect_with_audio_node(&filter)
            .map_err(|e| graph_err("noise connect", e))?;
        filter
            .connect_with_audio_node(&trim)
            .map_err(|e| graph_err("noise connect", e))?;
        trim.connect_with_audio_node(&into.node)
            .map_err(|e| graph_err("noise connect", e))?;
        source.start().map_err(|e| graph_err("noise start", e))?;
        Ok(WebSource {
            node: source,
            stopped: false,
        })
    }

    fn play_note(&mut self, note: &NoteEvent, into: &WebGain) -> Result<(), EngineError> {
        let osc = web::OscillatorNode::new(&self.ctx).map_err(|e| graph_err("OscillatorNode", e))?;
        osc.set_type(web::OscillatorType::Sine);
        osc.frequency().set_value(note.frequency_hz);

        let env = create_gain(&self.ctx, 0.0, "note")?;
        let t0 = note.start_time_sec;
        let t_end = note.stop_time_sec();
        let param = env.gain();
        param
            .set_value_at_time(0.0, t0)
            .and_then(|p| p.linear_ramp_to_value_at_time(note.peak_gain, t0 + note.attack_sec))
            .and_then(|p| p.exponential_ramp_to_value_at_time(note.floor_gain, t_end))
            .map_err(|e| graph_err("note envelope", e))?;

        osc.connect_with_audio_node(&env)
            .map_err(|e| graph_err("note connect", e))?;
        env.connect_with_audio_node(&into.node)
            .map_err(|e| graph_err("note connect", e))?;
        osc.start_with_when(t0).map_err(|e| graph_err("note start", e))?;
        osc.stop_with_when(t_end).map_err(|e| graph_err("note stop", e))?;
        Ok(())
    }
}

pub struct WebGain {
    node: web::GainNode,
}

impl GainStage for WebGain {
    fn value(&self) -> f32 {
        self.node.gain().value()
    }

    fn cancel_scheduled_values(&self, from: f64) {
        if let Err(e) = self.node.gain().cancel_scheduled_values(from) {
            log::warn!("cancelScheduledValues failed: {:?}", e);
        }
    }

    fn set_value_at_time(&self, value: f32, time: f64) {
        if let Err(e) = self.node.gain().set_value_at_time(value, time) {
            log::warn!("setValueAtTime failed: {:?}", e);
        }
    }

    fn linear_ramp_to_value_at_time(&self, value: f32, time: f64) {
        if let Err(e) = self.node.gain().linear_ramp_to_value_at_time(value, time) {
            log::warn!("linearRampToValueAtTime failed: {:?}", e);
        }
    }
}

pub struct WebSource {
    node: web::AudioBufferSourceNode,
    stopped: bool,
}

impl SourceHandle for WebSource {
    fn stop(&mut self) -> Result<(), EngineError> {
        if self.stopped {
            return Err(EngineError::Graph("noise source already stopped".into()));
        }
        self.stopped = true;
        self.node.stop().map_err(|e| EngineError::Graph(format!("{e:?}")))?;
        self.node.disconnect().map_err(|e| EngineError::Graph(format!("{e:?}")))
    }
}
