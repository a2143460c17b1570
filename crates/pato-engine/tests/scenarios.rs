//! End-to-end ducking scenarios through the full engine.
//!
//! Each test stands up a registry, a broadcast source, and an engine,
//! then checks the numeric behavior of the control law at the block
//! level: pass-through when idle, steady-state reduction when the
//! sidechain is hot, and the hold/release tail after it goes quiet.

use std::sync::Arc;

use pato_core::{DuckerConfig, db_to_linear};
use pato_engine::{
    BroadcastSource, DuckingEngine, EngineConfig, EngineControl, MemoryRegistry, SourceRegistry,
};

const SAMPLE_RATE: u32 = 48000;
/// 1 ms at 48 kHz.
const MS_SAMPLES: usize = 48;

/// The reference config from the design scenarios: 1 ms everywhere,
/// open == close at -30 dB, 2:1 over -18 dB, limiter at 0 dB.
fn scenario_config() -> DuckerConfig {
    DuckerConfig {
        ratio: 2.0,
        threshold_db: -18.0,
        limiter_threshold_db: 0.0,
        open_threshold_db: -30.0,
        close_threshold_db: -30.0,
        attack_ms: 1.0,
        hold_ms: 1.0,
        release_ms: 1.0,
        sample_rate: SAMPLE_RATE,
        channels: 2,
    }
}

struct Rig {
    engine: DuckingEngine,
    control: EngineControl,
    music: Arc<BroadcastSource>,
}

fn bound_rig(ducker: DuckerConfig) -> Rig {
    let registry = Arc::new(MemoryRegistry::new());
    let music = Arc::new(BroadcastSource::new());
    registry.insert("music", &music);

    let config = EngineConfig {
        ducker,
        source: Some("music".into()),
    };
    let (engine, control) = DuckingEngine::new(&config, registry).expect("engine");
    control.tick(0.0);
    assert!(control.is_bound(), "rig must start bound");
    Rig {
        engine,
        control,
        music,
    }
}

fn deliver_constant(music: &BroadcastSource, level: f32, frames: usize) {
    let block = vec![level; frames];
    music.deliver(&[&block, &block], frames, false);
}

/// Run one stereo block of constant `level` primary audio and return
/// the left channel output.
fn process_constant(engine: &mut DuckingEngine, level: f32, frames: usize) -> Vec<f32> {
    let mut left = vec![level; frames];
    let mut right = vec![level; frames];
    {
        let mut channels: Vec<&mut [f32]> = vec![&mut left, &mut right];
        engine.process_block(&mut channels);
    }
    left
}

#[test]
fn silent_sidechain_leaves_primary_unchanged() {
    let mut rig = bound_rig(scenario_config());
    let frames = 480;

    // The sidechain delivers frames, but they are silence.
    deliver_constant(&rig.music, 0.0, frames);

    let primary = db_to_linear(-6.0);
    let out = process_constant(&mut rig.engine, primary, frames);
    assert!(
        out.iter().all(|&s| s == primary),
        "silent sidechain must not alter the primary stream"
    );
}

#[test]
fn muted_sidechain_counts_as_silence() {
    let mut rig = bound_rig(scenario_config());
    let frames = 480;

    // Loud frames flagged muted must behave exactly like silence.
    let loud = vec![0.9f32; frames];
    rig.music.deliver(&[&loud, &loud], frames, true);

    let out = process_constant(&mut rig.engine, 0.5, frames);
    assert!(out.iter().all(|&s| s == 0.5));
}

#[test]
fn sustained_sidechain_reaches_steady_state_reduction() {
    let mut rig = bound_rig(scenario_config());
    let frames = 480;

    // Sidechain at -10 dB, above the -30 dB open threshold.
    deliver_constant(&rig.music, db_to_linear(-10.0), frames);
    let out = process_constant(&mut rig.engine, 1.0, frames);

    // 0 dB over a -18 dB knee at 2:1: delta 18 dB, reduction 9 dB,
    // gain about 0.3548, reached once the 1 ms attack completes.
    let expected = 1.0 / db_to_linear(9.0);
    for (i, &sample) in out.iter().enumerate().skip(2 * MS_SAMPLES) {
        assert!(
            (sample - expected).abs() < 2e-3,
            "sample {i}: {sample} vs {expected}"
        );
    }
    // The attack is a ramp, not a jump.
    assert!(out[0] > expected);
}

#[test]
fn duck_holds_then_releases_after_sidechain_stops() {
    let mut rig = bound_rig(scenario_config());
    let frames = 480;

    // Engage the duck fully.
    deliver_constant(&rig.music, db_to_linear(-10.0), frames);
    let _ = process_constant(&mut rig.engine, 1.0, frames);

    // Sidechain drops below the close threshold (silence).
    deliver_constant(&rig.music, 0.0, frames);
    let out = process_constant(&mut rig.engine, 1.0, frames);

    let ducked = 1.0 / db_to_linear(9.0);

    // The duck stays engaged for exactly hold_ms (1 ms = 48 samples).
    for (i, &sample) in out.iter().take(MS_SAMPLES).enumerate() {
        assert!(
            (sample - ducked).abs() < 2e-3,
            "sample {i} released during hold: {sample}"
        );
    }

    // After hold plus the 1 ms release ramp, the duck is fully gone.
    for (i, &sample) in out.iter().enumerate().skip(2 * MS_SAMPLES + 1) {
        assert!(
            (sample - 1.0).abs() < 1e-6,
            "sample {i} still ducked after release: {sample}"
        );
    }

    // In between, the gain ramps monotonically upward.
    for i in MS_SAMPLES..(2 * MS_SAMPLES) {
        assert!(out[i] <= out[i + 1] + 1e-6, "release not monotonic at {i}");
    }
}

#[test]
fn underrun_releases_instead_of_blocking() {
    let mut rig = bound_rig(scenario_config());
    let frames = 480;

    // Duck fully, then process with *no* sidechain delivery: the pull
    // underruns, reads silence, and the duck releases normally.
    deliver_constant(&rig.music, db_to_linear(-10.0), frames);
    let _ = process_constant(&mut rig.engine, 1.0, frames);

    let out = process_constant(&mut rig.engine, 1.0, frames);
    assert!((out[frames - 1] - 1.0).abs() < 1e-6, "underrun must decay to unity");
}

#[test]
fn reconfiguration_is_deterministic() {
    let frames = 480;
    let run = || {
        let mut rig = bound_rig(scenario_config());
        // Re-applying the identical config must not perturb anything.
        rig.control.update(&EngineConfig {
            ducker: scenario_config(),
            source: Some("music".into()),
        });
        rig.control.tick(0.0);
        deliver_constant(&rig.music, db_to_linear(-10.0), frames);
        process_constant(&mut rig.engine, 0.8, frames)
    };

    let a = run();
    let b = run();
    assert_eq!(a, b, "identical config and input must give identical output");
}

#[test]
fn ratio_one_only_limits() {
    let mut config = scenario_config();
    config.ratio = 1.0;
    config.limiter_threshold_db = -12.0;
    let mut rig = bound_rig(config);
    let frames = 480;

    deliver_constant(&rig.music, db_to_linear(-10.0), frames);
    let out = process_constant(&mut rig.engine, 1.0, frames);

    // With ratio 1 the only reduction left is the limiter: 0 dB input
    // against a -12 dB ceiling pins the output to the ceiling.
    let expected = db_to_linear(-12.0);
    let last = out[frames - 1];
    assert!((last - expected).abs() < 2e-3, "got {last}, want {expected}");
}

#[test]
fn block_size_growth_is_handled() {
    let mut rig = bound_rig(scenario_config());

    for &frames in &[64usize, 256, 128, 1024] {
        deliver_constant(&rig.music, db_to_linear(-10.0), frames);
        let out = process_constant(&mut rig.engine, 0.9, frames);
        assert_eq!(out.len(), frames);
        assert!(out.iter().all(|s| s.is_finite()));
    }
}

#[test]
fn source_appearing_late_gets_bound() {
    let registry = Arc::new(MemoryRegistry::new());
    let config = EngineConfig {
        ducker: scenario_config(),
        source: Some("latecomer".into()),
    };
    let (mut engine, control) =
        DuckingEngine::new(&config, Arc::clone(&registry) as Arc<dyn SourceRegistry>)
            .expect("engine");

    // Nothing to bind yet: pure pass-through.
    control.tick(0.0);
    assert!(!control.is_bound());
    let out = process_constant(&mut engine, 0.7, 128);
    assert!(out.iter().all(|&s| s == 0.7));

    // The source shows up; the next due tick binds it.
    let late = Arc::new(BroadcastSource::new());
    registry.insert("latecomer", &late);
    control.tick(4.0);
    assert!(control.is_bound());

    let loud = vec![0.9f32; 128];
    late.deliver(&[&loud, &loud], 128, false);
    let out = process_constant(&mut engine, 0.9, 128);
    assert!(out[127] < 0.9, "duck must engage after late binding");
}

#[test]
fn dropped_source_returns_to_passthrough() {
    let mut rig = bound_rig(scenario_config());
    let frames = 128;

    deliver_constant(&rig.music, db_to_linear(-10.0), frames);
    let _ = process_constant(&mut rig.engine, 1.0, frames);

    // Host destroys the source; the weak binding expires and the
    // engine passes audio through (gate state freezes, no reduction).
    drop(rig.music);
    assert!(!rig.control.is_bound());

    let out = process_constant(&mut rig.engine, 0.6, frames);
    assert!(out.iter().all(|&s| s == 0.6));
}

#[test]
fn concurrent_capture_and_processing() {
    let rig = bound_rig(scenario_config());
    let Rig {
        mut engine, music, ..
    } = rig;

    let producer = std::thread::spawn(move || {
        let block = vec![0.3f32; 256];
        for _ in 0..200 {
            music.deliver(&[&block, &block], 256, false);
            std::thread::yield_now();
        }
    });

    for _ in 0..200 {
        let out = process_constant(&mut engine, 0.9, 256);
        for &sample in &out {
            assert!(sample.is_finite());
            assert!(sample.abs() <= 0.9 + 1e-6, "ducker must never amplify");
        }
    }
    producer.join().expect("capture thread panicked");
}
