#![cfg(target_arch = "wasm32")]
mod audio;
mod timer;

use ambient_core::{AmbientConfig, AmbientEngine, EngineError};
use audio::WebHost;
use instant::Instant;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use timer::Interval;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("ambient-web loaded");
    Ok(())
}

fn to_js(e: EngineError) -> JsValue {
    log::warn!("[ambient] {}", e);
    JsValue::from_str(&e.to_string())
}

struct Player {
    engine: AmbientEngine<WebHost>,
    // Live only while playing; dropping it clears the interval.
    ticker: Option<Interval>,
    // Bumped by stop() so a start() still waiting on resume gives up.
    generation: u64,
}

fn arm_ticker(inner: &Rc<RefCell<Player>>) -> anyhow::Result<()> {
    let mut player = inner.borrow_mut();
    if player.ticker.is_some() {
        return Ok(());
    }
    let period_ms = player.engine.poll_interval().as_millis() as i32;
    let weak: Weak<RefCell<Player>> = Rc::downgrade(inner);
    let interval = Interval::new(period_ms, move || {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        if let Ok(mut p) = inner.try_borrow_mut() {
            p.engine.poll(Instant::now());
        }
    })
    .map_err(|e| anyhow::anyhow!(format!("setInterval: {:?}", e)))?;
    player.ticker = Some(interval);
    Ok(())
}

/// Page-facing handle for the music toggle and the chat view.
#[wasm_bindgen]
pub struct AmbientPlayer {
    inner: Rc<RefCell<Player>>,
}

#[wasm_bindgen]
impl AmbientPlayer {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<AmbientPlayer, JsValue> {
        let engine = AmbientEngine::new(WebHost, AmbientConfig::default()).map_err(to_js)?;
        Ok(Self {
            inner: Rc::new(RefCell::new(Player {
                engine,
                ticker: None,
                generation: 0,
            })),
        })
    }

    /// Resolves once sound is playing; rejects with the reason otherwise.
    /// Call from a click handler so the browser lets the context resume.
    pub fn start(&self) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            let (resume, generation) = {
                let mut player = inner.borrow_mut();
                let resume = player.engine.prepare_start().map_err(to_js)?;
                (resume, player.generation)
            };
            if let Some(resume) = resume {
                resume.await.map_err(to_js)?;
            }
            {
                let mut player = inner.borrow_mut();
                if player.generation != generation {
                    log::info!("[ambient] stopped while resuming; not starting");
                    return Ok(JsValue::FALSE);
                }
                player.engine.finish_start().map_err(to_js)?;
            }
            if let Err(e) = arm_ticker(&inner) {
                // Never report playing without a ticker.
                log::error!("[ambient] {e:#}");
                inner.borrow_mut().engine.stop();
                return Err(JsValue::from_str(&e.to_string()));
            }
            Ok(JsValue::TRUE)
        })
    }

    pub fn stop(&self) {
        let mut player = self.inner.borrow_mut();
        player.generation += 1;
        player.engine.stop();
        player.ticker = None;
    }

    #[wasm_bindgen(js_name = setVolume)]
    pub fn set_volume(&self, level: f32, ramp_sec: f64) {
        self.inner.borrow_mut().engine.set_volume(level, ramp_sec);
    }

    /// Feed a chat message; dims the music if it reads as anxious.
    pub fn soothe(&self, text: &str) -> bool {
        self.inner.borrow_mut().engine.soothe_if_anxious(text)
    }

    #[wasm_bindgen(js_name = isPlaying)]
    pub fn is_playing(&self) -> bool {
        self.inner.borrow().engine.is_playing()
    }
}
