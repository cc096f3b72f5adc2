// Engine lifecycle tests driven through the offline software device.
// Time only moves when a test renders frames, so every check is exact.

use ambient_core::*;
use instant::Instant;
use pollster::block_on;
use std::time::Duration;

const STEP_SEC: f64 = 0.025; // one scheduler period of device time
const DEFAULT_VOLUME: f32 = ambient_core::constants::DEFAULT_MASTER_VOLUME;

fn make_engine(offline: OfflineConfig) -> AmbientEngine<OfflineHost> {
    let config = AmbientConfig {
        seed: Some(7),
        ..AmbientConfig::default()
    };
    AmbientEngine::new(OfflineHost::new(offline), config).expect("default config is valid")
}

fn started_engine() -> (AmbientEngine<OfflineHost>, SoftwareDevice) {
    let mut engine = make_engine(OfflineConfig::default());
    block_on(engine.start()).expect("offline start");
    let device = engine.device().expect("device opened by start").clone();
    (engine, device)
}

/// Render `seconds` of audio, running one scheduler pass per period like the
/// host loop would.
fn run_for(engine: &mut AmbientEngine<OfflineHost>, device: &SoftwareDevice, seconds: f64) {
    let steps = (seconds / STEP_SEC).round() as usize;
    for _ in 0..steps {
        device.render_seconds(STEP_SEC);
        engine.tick();
    }
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

#[test]
fn stop_without_start_is_harmless() {
    let mut engine = make_engine(OfflineConfig::default());
    engine.stop();
    engine.stop();
    assert!(!engine.is_playing());
    assert!(engine.device().is_none());
    assert_eq!(engine.next_deadline(), None);
}

#[test]
fn set_volume_before_init_is_ignored() {
    let mut engine = make_engine(OfflineConfig::default());
    engine.set_volume(0.1, 2.0);
    assert!(engine.master_value().is_none());
    assert_eq!(engine.host().opened(), 0);
}

#[test]
fn init_is_idempotent_and_sets_default_volume() {
    let mut engine = make_engine(OfflineConfig::default());
    engine.init().unwrap();
    engine.init().unwrap();
    assert_eq!(engine.host().opened(), 1);
    assert_eq!(engine.master_value(), Some(DEFAULT_VOLUME));
    assert!(!engine.is_playing());
}

#[test]
fn double_start_keeps_a_single_noise_voice() {
    let (mut engine, device) = started_engine();
    block_on(engine.start()).unwrap();
    assert!(engine.is_playing());
    assert_eq!(device.active_noise_voices(), 1);
    assert_eq!(device.notes_scheduled(), 1);
    assert_eq!(engine.host().opened(), 1);
}

#[test]
fn start_fades_in_from_silence() {
    let (_engine, device) = started_engine();
    assert_eq!(device.master_value(), Some(0.0));
    device.render_seconds(0.25);
    assert!(close(device.master_value().unwrap(), 0.25));
    device.render_seconds(0.25);
    assert!(close(device.master_value().unwrap(), DEFAULT_VOLUME));
    device.render_seconds(1.0);
    assert!(close(device.master_value().unwrap(), DEFAULT_VOLUME));
}

#[test]
fn noise_is_audible_once_faded_in() {
    let (_engine, device) = started_engine();
    let out = device.render_seconds(1.0);
    let tail = &out[out.len() / 2..];
    let rms = (tail.iter().map(|s| s * s).sum::<f32>() / tail.len() as f32).sqrt();
    assert!(rms > 1e-4, "noise bed silent: rms {rms}");
}

#[test]
fn first_note_is_scheduled_at_start_time() {
    let mut engine = make_engine(OfflineConfig::default());
    engine.init().unwrap();
    let device = engine.device().unwrap().clone();
    device.render_seconds(3.0);
    let t0 = device.current_time();

    block_on(engine.start()).unwrap();
    let first = device.last_note_start().expect("a note right away");
    assert!(first >= t0 && first <= t0 + 0.1, "first note at {first}, start at {t0}");
    let gap = engine.next_note_time() - first;
    assert!((2.0..=6.0).contains(&gap), "gap {gap}");
}

#[test]
fn consecutive_notes_are_two_to_six_seconds_apart() {
    let (mut engine, device) = started_engine();
    let mut starts = vec![device.last_note_start().unwrap()];
    for _ in 0..(120.0 / STEP_SEC) as usize {
        device.render_seconds(STEP_SEC);
        engine.tick();
        let last = device.last_note_start().unwrap();
        if last != *starts.last().unwrap() {
            starts.push(last);
        }
    }
    assert!(starts.len() >= 20, "only {} notes in two minutes", starts.len());
    assert_eq!(starts.len(), device.notes_scheduled());
    for pair in starts.windows(2) {
        let gap = pair[1] - pair[0];
        assert!((2.0..=6.0).contains(&gap), "gap {gap}");
    }
}

#[test]
fn notes_are_issued_ahead_of_their_start() {
    let (mut engine, device) = started_engine();
    for _ in 0..(60.0 / STEP_SEC) as usize {
        device.render_seconds(STEP_SEC);
        let before = device.notes_scheduled();
        engine.tick();
        if device.notes_scheduled() > before {
            let now = device.current_time();
            let start = device.last_note_start().unwrap();
            assert!(start >= now && start < now + 0.1, "note at {start}, now {now}");
        }
    }
}

#[test]
fn nothing_is_scheduled_after_stop() {
    let (mut engine, device) = started_engine();
    run_for(&mut engine, &device, 10.0);
    engine.stop();
    assert_eq!(engine.next_deadline(), None);

    let count = device.notes_scheduled();
    let base = Instant::now();
    for k in 1..=40u32 {
        device.render_seconds(STEP_SEC);
        assert_eq!(engine.poll(base + Duration::from_millis(25) * k), 0);
        assert_eq!(engine.tick(), 0);
    }
    assert_eq!(device.notes_scheduled(), count);
}

#[test]
fn stop_releases_noise_but_lets_notes_ring_out() {
    let (mut engine, device) = started_engine();
    device.render_seconds(0.01);
    engine.stop();
    assert!(!engine.is_playing());
    assert_eq!(device.active_noise_voices(), 0);
    // The first note was already handed over and keeps decaying.
    assert_eq!(device.active_notes(), 1);
    device.render_seconds(6.0);
    assert_eq!(device.active_notes(), 0);
}

#[test]
fn restart_after_stop_resets_cursor_and_reuses_device() {
    let (mut engine, device) = started_engine();
    device.render_seconds(0.01);
    engine.stop();
    engine.stop();
    device.render_seconds(30.0);

    block_on(engine.start()).unwrap();
    let now = device.current_time();
    assert_eq!(device.last_note_start(), Some(now));
    assert!(engine.next_note_time() >= now + 2.0);
    assert_eq!(device.active_noise_voices(), 1);
    assert_eq!(engine.host().opened(), 1);
    // No catch-up burst for the 30 s spent stopped.
    assert_eq!(device.notes_scheduled(), 2);
}

#[test]
fn poll_runs_the_scheduler_on_its_cadence() {
    let (mut engine, _device) = started_engine();
    let due = engine.next_deadline().expect("armed by start");
    engine.poll(due - Duration::from_millis(1));
    assert_eq!(engine.next_deadline(), Some(due));
    engine.poll(due);
    assert_eq!(engine.next_deadline(), Some(due + engine.poll_interval()));
}

#[test]
fn dimming_mid_playback_reaches_target_without_reverting() {
    let (mut engine, device) = started_engine();
    run_for(&mut engine, &device, 1.0);
    assert!(close(device.master_value().unwrap(), DEFAULT_VOLUME));

    engine.set_volume(0.1, 2.0);
    let mut prev = device.master_value().unwrap();
    for _ in 0..(2.0 / STEP_SEC).round() as usize {
        device.render_seconds(STEP_SEC);
        engine.tick();
        let v = device.master_value().unwrap();
        assert!(v <= prev + 1e-6, "volume rose from {prev} to {v}");
        prev = v;
    }
    assert!(close(device.master_value().unwrap(), 0.1));
    run_for(&mut engine, &device, 1.0);
    assert!(close(device.master_value().unwrap(), 0.1));
}

#[test]
fn rapid_volume_changes_converge_on_the_last_one() {
    let (mut engine, device) = started_engine();
    device.render_seconds(1.0);
    engine.set_volume(1.0, 1.0);
    engine.set_volume(0.2, 1.0);
    let mut prev = device.master_value().unwrap();
    for _ in 0..60 {
        device.render_seconds(0.025);
        let v = device.master_value().unwrap();
        assert!(v <= prev + 1e-6, "moved back towards the first target");
        prev = v;
    }
    assert!(close(prev, 0.2));
}

#[test]
fn volume_can_change_while_stopped() {
    let (mut engine, device) = started_engine();
    engine.stop();
    engine.set_volume(0.3, 0.0);
    assert!(close(device.master_value().unwrap(), 0.3));
}

#[test]
fn unavailable_device_fails_fast_and_can_retry() {
    let mut engine = make_engine(OfflineConfig {
        unavailable: true,
        ..OfflineConfig::default()
    });
    let err = block_on(engine.start()).unwrap_err();
    assert!(matches!(err, EngineError::DeviceUnavailable(_)));
    assert!(!engine.is_playing());
    assert!(engine.device().is_none());
    engine.stop();

    engine.host_mut().set_unavailable(false);
    block_on(engine.start()).unwrap();
    assert!(engine.is_playing());
}

#[test]
fn suspended_device_is_resumed_by_start() {
    let mut engine = make_engine(OfflineConfig {
        start_suspended: true,
        ..OfflineConfig::default()
    });
    engine.init().unwrap();
    assert_eq!(engine.device().unwrap().state(), DeviceState::Suspended);
    block_on(engine.start()).unwrap();
    assert!(engine.is_playing());
    assert_eq!(engine.device().unwrap().state(), DeviceState::Running);
}

#[test]
fn refused_resume_is_reported_and_retryable() {
    let mut engine = make_engine(OfflineConfig {
        start_suspended: true,
        refuse_resume: true,
        ..OfflineConfig::default()
    });
    let err = block_on(engine.start()).unwrap_err();
    assert!(matches!(err, EngineError::ResumeRefused(_)));
    assert!(!engine.is_playing());
    let device = engine.device().unwrap().clone();
    assert_eq!(device.active_noise_voices(), 0);
    assert_eq!(engine.next_deadline(), None);

    // A later user gesture lets the host resume.
    device.set_resume_allowed(true);
    block_on(engine.start()).unwrap();
    assert!(engine.is_playing());
    assert_eq!(device.active_noise_voices(), 1);
}

#[test]
fn finish_start_requires_a_running_device() {
    let mut engine = make_engine(OfflineConfig {
        start_suspended: true,
        ..OfflineConfig::default()
    });
    engine.init().unwrap();
    assert!(matches!(
        engine.finish_start(),
        Err(EngineError::ResumeRefused(_))
    ));
    assert!(!engine.is_playing());

    let resume = engine.prepare_start().unwrap().expect("suspended device needs a resume");
    block_on(resume).unwrap();
    engine.finish_start().unwrap();
    assert!(engine.is_playing());
    assert!(engine.prepare_start().unwrap().is_none());
}

#[test]
fn soothing_only_happens_while_playing() {
    let mut engine = make_engine(OfflineConfig::default());
    assert!(!engine.soothe_if_anxious("I had a nightmare"));

    block_on(engine.start()).unwrap();
    let device = engine.device().unwrap().clone();
    device.render_seconds(1.0);
    assert!(!engine.soothe_if_anxious("a quiet walk by the lake"));
    assert!(close(device.master_value().unwrap(), DEFAULT_VOLUME));

    assert!(engine.soothe_if_anxious("我好害怕"));
    device.render_seconds(2.0);
    assert!(close(device.master_value().unwrap(), 0.1));

    engine.stop();
    assert!(!engine.soothe_if_anxious("panic"));
}

#[test]
fn restart_restores_default_volume_after_soothing() {
    let (mut engine, device) = started_engine();
    device.render_seconds(1.0);
    engine.soothe_if_anxious("so much stress");
    device.render_seconds(2.0);
    engine.stop();
    block_on(engine.start()).unwrap();
    device.render_seconds(0.5);
    assert!(close(device.master_value().unwrap(), DEFAULT_VOLUME));
}

#[test]
fn invalid_config_is_rejected_at_construction() {
    let mut config = AmbientConfig::default();
    config.scheduler.schedule_ahead_sec = 0.0;
    assert!(matches!(
        AmbientEngine::new(OfflineHost::default(), config),
        Err(EngineError::InvalidConfig(_))
    ));
}

#[test]
fn stop_right_after_finish_start_rolls_back_cleanly() {
    // A host that cannot set up its poll timer backs out this way.
    let mut engine = make_engine(OfflineConfig::default());
    assert!(engine.prepare_start().unwrap().is_none());
    engine.finish_start().unwrap();
    engine.stop();

    let device = engine.device().unwrap().clone();
    assert!(!engine.is_playing());
    assert_eq!(device.active_noise_voices(), 0);
    assert_eq!(engine.next_deadline(), None);
    assert_eq!(engine.poll(Instant::now() + Duration::from_secs(1)), 0);

    device.render_seconds(1.0);
    block_on(engine.start()).unwrap();
    assert!(engine.is_playing());
    assert_eq!(device.active_noise_voices(), 1);
    assert!(engine.next_deadline().is_some());
}
