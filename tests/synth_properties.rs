use tonemix::{generate, SynthState, Waveform};

const RATE: u32 = 44_100;

fn block(waveform: Waveform, frequency: f32, len: usize, state: &mut SynthState) -> Vec<f32> {
    let mut out = vec![0.0; len];
    generate(waveform, frequency, 1.0, RATE, &mut out, state);
    out
}

/// Normalized autocorrelation at `lag`.
fn autocorrelation(signal: &[f32], lag: usize) -> f64 {
    let n = signal.len();
    let mean = signal.iter().map(|&s| s as f64).sum::<f64>() / n as f64;
    let variance: f64 = signal.iter().map(|&s| (s as f64 - mean).powi(2)).sum();
    let covariance: f64 = (0..n - lag)
        .map(|i| (signal[i] as f64 - mean) * (signal[i + lag] as f64 - mean))
        .sum();
    covariance / variance
}

/// Mean squared first difference over variance: 2 for white noise, lower
/// the more energy sits in low frequencies.
fn roughness(signal: &[f32]) -> f64 {
    let n = signal.len() as f64;
    let mean = signal.iter().map(|&s| s as f64).sum::<f64>() / n;
    let variance = signal.iter().map(|&s| (s as f64 - mean).powi(2)).sum::<f64>() / n;
    let diff = signal
        .windows(2)
        .map(|w| (w[1] as f64 - w[0] as f64).powi(2))
        .sum::<f64>()
        / (n - 1.0);
    diff / variance
}

#[test]
fn consecutive_blocks_equal_one_long_block() {
    for waveform in Waveform::ALL.into_iter().filter(|w| w.is_periodic()) {
        let mut stitched_state = SynthState::seeded(0);
        let mut stitched = block(waveform, 440.0, 512, &mut stitched_state);
        stitched.extend(block(waveform, 440.0, 512, &mut stitched_state));

        let mut whole_state = SynthState::seeded(0);
        let whole = block(waveform, 440.0, 1024, &mut whole_state);

        for (i, (a, b)) in stitched.iter().zip(&whole).enumerate() {
            assert!(
                (a - b).abs() < 1e-5,
                "{:?} differs at sample {}: {} vs {}",
                waveform,
                i,
                a,
                b
            );
        }
        assert!((stitched_state.phase() - whole_state.phase()).abs() < 1e-9);
    }
}

#[test]
fn continuity_holds_for_uneven_block_sizes() {
    let mut state = SynthState::seeded(0);
    let mut stitched = Vec::new();
    for len in [1, 63, 500, 7, 453] {
        stitched.extend(block(Waveform::Sine, 523.25, len, &mut state));
    }
    let whole = block(Waveform::Sine, 523.25, 1024, &mut SynthState::seeded(0));
    assert!(stitched.iter().zip(&whole).all(|(a, b)| (a - b).abs() < 1e-5));
}

#[test]
fn silence_ignores_frequency_and_amplitude() {
    let mut state = SynthState::seeded(0);
    let mut out = vec![0.7; 333];
    generate(Waveform::Silence, 1234.0, 1.0, RATE, &mut out, &mut state);
    assert_eq!(out.len(), 333);
    assert!(out.iter().all(|&s| s == 0.0));
}

#[test]
fn zero_length_request_is_empty() {
    let mut state = SynthState::seeded(0);
    for waveform in Waveform::ALL {
        assert!(block(waveform, 440.0, 0, &mut state).is_empty());
    }
}

#[test]
fn periodic_waveforms_stay_within_amplitude() {
    let mut out = vec![0.0; 4096];
    for waveform in Waveform::ALL.into_iter().filter(|w| w.is_periodic()) {
        let mut state = SynthState::seeded(0);
        generate(waveform, 997.0, 0.6, RATE, &mut out, &mut state);
        assert!(out.iter().all(|s| s.abs() <= 0.6 + 1e-6), "{:?}", waveform);
    }
}

#[test]
fn above_nyquist_aliases_without_failing() {
    let out = block(Waveform::Sine, 30_000.0, 1024, &mut SynthState::seeded(0));
    assert!(out.iter().all(|s| s.is_finite() && s.abs() <= 1.0));
}

#[test]
fn white_noise_is_zero_mean_and_uncorrelated() {
    let noise = block(Waveform::WhiteNoise, 440.0, 44_100, &mut SynthState::seeded(42));
    let mean = noise.iter().map(|&s| s as f64).sum::<f64>() / noise.len() as f64;
    assert!(mean.abs() < 0.01, "mean {}", mean);

    for lag in 1..=10 {
        let r = autocorrelation(&noise, lag);
        assert!(r.abs() < 0.05, "lag {} autocorrelation {}", lag, r);
    }

    // A pitched waveform is strongly self-similar at short lags.
    let sine = block(Waveform::Sine, 440.0, 44_100, &mut SynthState::seeded(0));
    assert!(autocorrelation(&sine, 1) > 0.9);
}

#[test]
fn noise_ignores_frequency() {
    let a = block(Waveform::PinkNoise, 100.0, 2048, &mut SynthState::seeded(9));
    let b = block(Waveform::PinkNoise, 9000.0, 2048, &mut SynthState::seeded(9));
    assert_eq!(a, b);
}

#[test]
fn colored_noise_tilts_towards_low_frequencies() {
    let white = block(Waveform::WhiteNoise, 0.0, 44_100, &mut SynthState::seeded(1));
    let pink = block(Waveform::PinkNoise, 0.0, 44_100, &mut SynthState::seeded(1));
    let brown = block(Waveform::BrownianNoise, 0.0, 44_100, &mut SynthState::seeded(1));

    let (white, pink, brown) = (roughness(&white), roughness(&pink), roughness(&brown));
    assert!(white > 1.5, "white {}", white);
    assert!(pink < 1.0, "pink {}", pink);
    assert!(brown < pink, "brown {} pink {}", brown, pink);
}

#[test]
fn pink_filter_state_carries_across_blocks() {
    let mut state = SynthState::seeded(5);
    let mut stitched = block(Waveform::PinkNoise, 0.0, 300, &mut state);
    stitched.extend(block(Waveform::PinkNoise, 0.0, 724, &mut state));
    let whole = block(Waveform::PinkNoise, 0.0, 1024, &mut SynthState::seeded(5));
    assert_eq!(stitched, whole);
}
