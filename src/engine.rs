//! High-level engine API.

use std::io::Write;

use tracing::debug;

use crate::config::EngineConfig;
use crate::control::{command_queue, ToneController};
use crate::mixer::{Mixer, StereoBuffer, CHANNELS};
use crate::output::{OutputPort, PortState};
use crate::record::PcmRecorder;
use crate::visualize::Visualizer;

/// Create a connected controller/mixer pair.
///
/// The controller stays with the control surface; the mixer goes to whatever
/// drives rendering (an [`OutputPort`], a test loop, an offline bounce).
///
/// ```
/// use tonemix::{split, EngineConfig, ToneParams, Waveform};
///
/// let (mut controller, mut mixer) = split(&EngineConfig::default());
/// controller.add_tone(ToneParams::new(Waveform::Sine, 440.0)).unwrap();
///
/// let buffer = mixer.render(512);
/// assert!(buffer.peak() > 0.0);
/// ```
pub fn split(config: &EngineConfig) -> (ToneController, Mixer) {
    let (producer, consumer) = command_queue(config.command_queue_capacity);
    (
        ToneController::new(producer, config),
        Mixer::new(consumer, config),
    )
}

/// A tone generator wired to an output port.
///
/// Owns the [`ToneController`] and the [`OutputPort`]; hand out `&mut` access
/// to whichever component needs it. While the port isn't running, commands the
/// controller is holding are moved into the mixer directly, so editing a
/// stopped or closed engine never piles up.
///
/// ```no_run
/// use tonemix::{EngineConfig, ToneEngine, ToneParams, Waveform};
///
/// let mut engine = ToneEngine::new(EngineConfig::default());
/// if let Some(err) = engine.port().open_or_simulate()? {
///     eprintln!("playing muted: {}", err);
/// }
/// engine.port().start()?;
/// let id = engine.controller().add_tone(ToneParams::new(Waveform::PinkNoise, 0.0))?;
/// engine.controller().set_pan(id, -0.5)?;
/// # Ok::<(), tonemix::Error>(())
/// ```
pub struct ToneEngine {
    controller: ToneController,
    port: OutputPort,
    config: EngineConfig,
}

impl ToneEngine {
    pub fn new(config: EngineConfig) -> Self {
        let (controller, mixer) = split(&config);
        let port = OutputPort::new(mixer, &config);
        debug!(?config, "tone engine created");
        Self {
            controller,
            port,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn controller(&mut self) -> &mut ToneController {
        self.sync();
        &mut self.controller
    }

    pub fn port(&mut self) -> &mut OutputPort {
        &mut self.port
    }

    /// A visualizer fed from a new mixer tap holding `window` frames.
    ///
    /// The tap has room for a few windows so a UI polling at frame rate
    /// doesn't miss audio between polls.
    pub fn visualizer(&mut self, window: usize) -> Visualizer {
        let capacity = (window.max(self.config.frames_per_period) * CHANNELS) * 4;
        let consumer = self.port.with_mixer(|mixer| mixer.tap(capacity));
        Visualizer::new(consumer, self.config.sample_rate, window)
    }

    /// A raw PCM recorder fed from a new mixer tap of `capacity_frames` frames.
    pub fn recorder<W: Write>(&mut self, writer: W, capacity_frames: usize) -> PcmRecorder<W> {
        let consumer = self
            .port
            .with_mixer(|mixer| mixer.tap(capacity_frames * CHANNELS));
        PcmRecorder::new(consumer, writer)
    }

    /// Render `frames` frames directly, bypassing the output.
    ///
    /// Returns `None` while the port is running, since the output owns the
    /// render cadence then.
    pub fn render_offline(&mut self, frames: usize) -> Option<StereoBuffer> {
        if self.port.state() == PortState::Running {
            return None;
        }
        self.sync();
        Some(self.port.with_mixer(|mixer| mixer.render(frames)))
    }

    /// Hand held commands to the mixer. While running, the output drains the
    /// queue and only a flush is needed.
    fn sync(&mut self) {
        if self.controller.pending() == 0 {
            return;
        }
        if self.port.state() == PortState::Running {
            self.controller.flush();
            return;
        }
        let controller = &mut self.controller;
        self.port.with_mixer(|mixer| loop {
            mixer.apply_pending();
            if controller.flush() == 0 {
                mixer.apply_pending();
                break;
            }
        });
    }
}
