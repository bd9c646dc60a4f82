use tonemix::{DeviceSelector, EngineConfig, PortState, ToneEngine, ToneParams, Waveform};

fn engine() -> ToneEngine {
    ToneEngine::new(
        EngineConfig::default()
            .with_command_queue_capacity(16)
            .with_device(DeviceSelector::Named("tonemix-test-no-such-device".into())),
    )
}

#[test]
fn thousand_edits_on_an_unopened_engine_all_land() {
    let mut engine = engine();
    assert_eq!(engine.port().state(), PortState::Closed);
    let id = engine
        .controller()
        .add_tone(ToneParams::new(Waveform::Sine, 440.0))
        .unwrap();

    for step in 1..=1_000u32 {
        engine
            .controller()
            .set_volume(id, step as f32 / 1_000.0 * 0.9)
            .unwrap();
    }
    let extra = engine
        .controller()
        .add_tone(ToneParams::new(Waveform::Square, 220.0))
        .unwrap();
    engine.controller().remove_tone(extra).unwrap();

    engine.render_offline(64).unwrap();
    engine.port().with_mixer(|mixer| {
        assert_eq!(mixer.tone(id).map(|params| params.volume), Some(0.9));
        assert!(mixer.tone(extra).is_none());
        assert_eq!(mixer.tone_count(), 1);
    });
}

#[test]
fn edits_through_one_borrow_are_held_until_the_next_render() {
    let mut engine = engine();
    let controller = engine.controller();
    let id = controller
        .add_tone(ToneParams::new(Waveform::Triangle, 330.0))
        .unwrap();
    for step in 0..1_000u32 {
        controller.set_pan(id, (step % 200) as f32 / 100.0 - 1.0).unwrap();
        controller.set_volume(id, 0.25).unwrap();
    }
    controller.set_master_volume(0.5);
    let expected = controller.tone(id).unwrap();

    let buffer = engine.render_offline(128).unwrap();
    assert!(buffer.peak() > 0.0);
    assert_eq!(engine.controller().pending(), 0);
    engine.port().with_mixer(|mixer| {
        assert_eq!(mixer.tone(id), Some(expected));
        assert_eq!(mixer.master_volume(), 0.5);
    });
}

#[test]
fn stopped_port_keeps_accepting_edits() {
    let mut engine = engine();
    engine.port().open_simulated();
    engine.port().start().unwrap();
    let id = engine
        .controller()
        .add_tone(ToneParams::new(Waveform::Sine, 440.0))
        .unwrap();
    engine.port().stop().unwrap();

    for step in 0..1_000u32 {
        engine
            .controller()
            .set_frequency(id, 200.0 + step as f32)
            .unwrap();
    }
    engine.controller().clear_all();
    let survivor = engine
        .controller()
        .add_tone(ToneParams::new(Waveform::Sawtooth, 100.0))
        .unwrap();

    engine.render_offline(64).unwrap();
    engine.port().with_mixer(|mixer| {
        assert!(mixer.tone(id).is_none());
        assert_eq!(mixer.tone(survivor).map(|p| p.frequency), Some(100.0));
        assert_eq!(mixer.tone_count(), 1);
    });
}
