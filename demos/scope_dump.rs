//! Render a few tones offline and print their spectrum peaks, then write the
//! mix to `scope_dump.f32` as raw interleaved little-endian stereo.
//!
//! Run with: cargo run --example scope_dump
//!
//! Play the dump back with e.g. `ffplay -f f32le -ar 44100 -ac 2 scope_dump.f32`.

use std::fs::File;
use std::io::BufWriter;

use tonemix::{EngineConfig, ToneEngine, ToneParams, Waveform};

fn main() -> tonemix::Result<()> {
    tracing_subscriber::fmt::init();

    let config = EngineConfig::default();
    let sample_rate = config.sample_rate;
    let mut engine = ToneEngine::new(config);

    let mut viz = engine.visualizer(4096);
    let mut recorder = engine.recorder(BufWriter::new(File::create("scope_dump.f32")?), 8192);

    let controller = engine.controller();
    controller.add_tone(ToneParams::new(Waveform::Sine, 440.0).with_volume(0.4).with_pan(-0.7))?;
    controller.add_tone(ToneParams::new(Waveform::Square, 1250.0).with_volume(0.1).with_pan(0.7))?;
    controller.add_tone(ToneParams::new(Waveform::BrownianNoise, 0.0).with_volume(0.1))?;

    // Two seconds, a second at a time so the recorder's tap keeps up.
    for _ in 0..2 {
        for _ in 0..(sample_rate as usize / 4096) {
            engine.render_offline(4096);
            recorder.drain()?;
        }
    }

    viz.poll();
    let spectrum = viz.spectrum();
    let mut bins: Vec<_> = spectrum.magnitudes.iter().copied().enumerate().skip(1).collect();
    bins.sort_by(|a, b| b.1.total_cmp(&a.1));

    println!("Strongest bins:");
    for (index, magnitude) in bins.into_iter().take(5) {
        println!("  {:>8.1} Hz  {:.3}", spectrum.frequency_of(index), magnitude);
    }

    let scope = viz.scope(32);
    println!("\nLeft trace:  {:?}", scope.left);
    println!("Right trace: {:?}", scope.right);

    let _writer = recorder.finish()?;
    println!("\nWrote scope_dump.f32");
    Ok(())
}
