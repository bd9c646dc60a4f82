//! Waveform synthesis.
//!
//! [`generate`] fills a mono buffer with one waveform at a given amplitude and
//! advances the caller's [`SynthState`], so consecutive calls stitch together
//! without a seam:
//!
//! - periodic kinds ([`Waveform::Sine`], [`Waveform::Square`],
//!   [`Waveform::Triangle`], [`Waveform::Sawtooth`], [`Waveform::Pulse`]) carry
//!   a running phase
//! - colored noise ([`Waveform::PinkNoise`], [`Waveform::BrownianNoise`])
//!   carries its filter memory
//! - [`Waveform::WhiteNoise`] and [`Waveform::Silence`] are stateless apart from
//!   the random generator
//!
//! Nothing here allocates.

mod noise;
mod waveform;

pub use noise::NoiseState;
pub use waveform::{generate, SynthState, Waveform};
