//! Real-time multi-tone generator.
//!
//! `tonemix` synthesizes any number of independently configured tones (pitched
//! waveforms and colored noise), pans each one with an equal-power law, mixes
//! them into a stereo stream with a buffer-wide soft limiter, and plays the
//! result on an audio device.
//!
//! The pieces, leaves first:
//! - [`synth`]: block waveform generation with phase and filter continuity
//! - [`ToneParams`] / [`ToneUpdate`]: strongly typed per-tone parameters
//! - [`Mixer`]: owns the tone table and renders stereo periods
//! - [`ToneController`]: the control surface's lock-free handle on the mixer
//! - [`OutputPort`]: device (or simulated) stream lifecycle driving the mixer
//! - [`Visualizer`] and [`PcmRecorder`]: consumers of the mixer's buffer handoff
//!
//! Design principles:
//! - The render path takes no blocking locks, does no I/O and doesn't allocate
//!   once running
//! - Parameter changes travel as messages, applied between render periods
//! - One bad tone is dropped from the mix; it never silences the others

pub mod config;
pub mod control;
pub mod device;
pub mod engine;
pub mod error;
pub mod mixer;
pub mod output;
pub mod record;
pub mod synth;
pub mod tone;
pub mod visualize;

pub use config::{DeviceSelector, EngineConfig};
pub use control::{ToneCommand, ToneController};
pub use device::OutputDevice;
pub use engine::{split, ToneEngine};
pub use error::{Error, Result};
pub use mixer::{pan_gains, soft_limit, Mixer, StereoBuffer};
pub use output::{OutputPort, PortState, PortStats};
pub use record::PcmRecorder;
pub use synth::{generate, SynthState, Waveform};
pub use tone::{ToneId, ToneParams, ToneUpdate};
pub use visualize::{Scope, Spectrum, Visualizer};
