use proptest::prelude::*;
use tonemix::{pan_gains, soft_limit, split, EngineConfig, ToneParams, Waveform};

fn waveform() -> impl Strategy<Value = Waveform> {
    prop::sample::select(Waveform::ALL.to_vec())
}

proptest! {
    #[test]
    fn pan_law_preserves_power(pan in -1.0f32..=1.0) {
        let (l, r) = pan_gains(pan);
        prop_assert!((l * l + r * r - 1.0).abs() < 1e-5);
        prop_assert!((0.0..=1.0).contains(&l));
        prop_assert!((0.0..=1.0).contains(&r));
    }

    #[test]
    fn panning_right_never_raises_the_left_gain(a in -1.0f32..=1.0, b in -1.0f32..=1.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(pan_gains(high).0 <= pan_gains(low).0);
        prop_assert!(pan_gains(high).1 >= pan_gains(low).1);
    }

    #[test]
    fn limiter_bounds_the_peak(
        samples in prop::collection::vec(-8.0f32..8.0, 2..256),
        ceiling in 0.1f32..1.0,
    ) {
        let half = samples.len() / 2;
        let mut left = samples[..half].to_vec();
        let mut right = samples[half..].to_vec();
        let original_peak = samples.iter().fold(0.0f32, |p, s| p.max(s.abs()));

        let gain = soft_limit(&mut left, &mut right, ceiling);
        let peak = left.iter().chain(&right).fold(0.0f32, |p, s| p.max(s.abs()));

        prop_assert!(peak <= ceiling + 1e-5);
        if original_peak <= ceiling {
            prop_assert_eq!(gain, 1.0);
            prop_assert_eq!(&left[..], &samples[..half]);
            prop_assert_eq!(&right[..], &samples[half..]);
        } else {
            for (limited, original) in left.iter().chain(&right).zip(&samples) {
                prop_assert!((limited - original * gain).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn any_tone_set_renders_bounded_finite_audio(
        tones in prop::collection::vec(
            (waveform(), 1.0f32..20_000.0, 0.0f32..=1.0, -1.0f32..=1.0, any::<bool>()),
            0..16,
        ),
        frames in 0usize..3000,
    ) {
        let config = EngineConfig::default();
        let (mut ctl, mut mixer) = split(&config);
        for (waveform, frequency, volume, pan, active) in tones {
            let params = ToneParams::new(waveform, frequency)
                .with_volume(volume)
                .with_pan(pan)
                .with_active(active);
            ctl.add_tone(params).unwrap();
        }

        let buffer = mixer.render(frames);
        prop_assert_eq!(buffer.frames(), frames);
        for &sample in buffer.as_interleaved() {
            prop_assert!(sample.is_finite());
            prop_assert!(sample.abs() <= config.limiter_ceiling + 1e-5);
        }
    }
}
