//! Play a small chord plus some pink noise, sweeping the pan of each voice.
//!
//! Run with: cargo run --example play_tones
//!
//! Lists available devices and lets you pick one. Without a usable device the
//! engine keeps running muted and the scope printout still moves.

use std::io::{self, Write};
use std::thread::sleep;
use std::time::{Duration, Instant};

use tonemix::{DeviceSelector, EngineConfig, OutputDevice, ToneEngine, ToneParams, Waveform};

fn main() -> tonemix::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let devices = OutputDevice::list();
    let mut config = EngineConfig::default();

    if devices.is_empty() {
        eprintln!("No audio output devices found, playing muted");
    } else {
        println!("Available audio output devices:");
        for (i, device) in devices.iter().enumerate() {
            println!(
                "  [{}] {} ({}Hz, {} ch)",
                i,
                device.name(),
                device.sample_rate(),
                device.channels()
            );
        }

        print!("\nSelect device [default]: ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if let Some(device) = input.trim().parse::<usize>().ok().and_then(|i| devices.get(i)) {
            config = config
                .with_device(DeviceSelector::Named(device.name().to_string()))
                .with_sample_rate(device.sample_rate());
        } else if let Some(device) = OutputDevice::default_output() {
            config = config.with_sample_rate(device.sample_rate());
        }
    }

    let mut engine = ToneEngine::new(config);
    let mut scope = engine.visualizer(2048);

    if let Some(err) = engine.port().open_or_simulate()? {
        println!("Audio device unavailable ({}), output is muted", err);
    }
    engine.port().start()?;

    let voices = [
        (Waveform::Sine, 220.0),
        (Waveform::Triangle, 277.18),
        (Waveform::Sawtooth, 329.63),
    ];
    let mut ids = Vec::new();
    for (waveform, frequency) in voices {
        ids.push(
            engine
                .controller()
                .add_tone(ToneParams::new(waveform, frequency).with_volume(0.2))?,
        );
    }
    let noise = engine
        .controller()
        .add_tone(ToneParams::new(Waveform::PinkNoise, 0.0).with_volume(0.05))?;

    println!("Playing a chord with pink noise. Press Ctrl+C to stop\n");

    let start = Instant::now();
    loop {
        let elapsed = start.elapsed().as_secs_f32();

        for (i, &id) in ids.iter().enumerate() {
            let pan = (elapsed * 0.3 + i as f32 * 2.1).sin();
            // A full queue just means this sweep step is skipped.
            let _ = engine.controller().set_pan(id, pan);
        }
        let _ = engine.controller().set_active(noise, (elapsed as u32) % 4 < 2);

        scope.poll();
        let trace = scope.scope(48);
        let level: String = trace
            .left
            .iter()
            .map(|s| match s.abs() {
                a if a > 0.4 => '#',
                a if a > 0.2 => '+',
                a if a > 0.05 => '.',
                _ => ' ',
            })
            .collect();
        print!("\r[{}] callbacks: {}", level, engine.port().stats().callbacks);
        io::stdout().flush()?;

        sleep(Duration::from_millis(50));
    }
}
