use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tonemix::{generate, split, EngineConfig, SynthState, ToneParams, Waveform};

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("generate(Sine, 1024)", |b| {
        let mut state = SynthState::seeded(0);
        let mut out = vec![0.0f32; 1024];

        b.iter(|| generate(Waveform::Sine, black_box(440.0), 0.5, 44_100, &mut out, &mut state))
    });

    c.bench_function("generate(PinkNoise, 1024)", |b| {
        let mut state = SynthState::seeded(0);
        let mut out = vec![0.0f32; 1024];

        b.iter(|| generate(Waveform::PinkNoise, 0.0, 0.5, 44_100, &mut out, &mut state))
    });

    c.bench_function("Mixer::render_into(16 tones, 1024)", |b| {
        let config = EngineConfig::default();
        let (mut controller, mut mixer) = split(&config);
        for (i, waveform) in Waveform::ALL.iter().cycle().take(config.max_tones).enumerate() {
            let params = ToneParams::new(*waveform, 110.0 * (i + 1) as f32)
                .with_volume(0.5)
                .with_pan(i as f32 / 8.0 - 1.0);
            controller.add_tone(params).unwrap();
        }
        let mut out = vec![0.0f32; config.frames_per_period * 2];

        b.iter(|| mixer.render_into(black_box(&mut out)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
