//! Waveform kinds and the block generator.

use core::f64::consts::{FRAC_2_PI, TAU};

use super::noise::NoiseState;

/// Ratio between the `Pulse` envelope and its carrier.
const PULSE_ENVELOPE_RATIO: f64 = 0.1;

/// The waveform a tone produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Waveform {
    #[default]
    Sine,
    /// Sign of the sine; zero crossings map to +1.
    Square,
    Triangle,
    /// Ramp from -1 to +1 once per period.
    Sawtooth,
    /// Sine carrier amplitude-modulated by `(sin(2π·0.1f·t) + 1) / 2`.
    ///
    /// This is a slow tremolo at a tenth of the carrier frequency, not a
    /// duty-cycle pulse wave.
    Pulse,
    WhiteNoise,
    PinkNoise,
    BrownianNoise,
    Silence,
}

impl Waveform {
    pub const ALL: [Waveform; 9] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Triangle,
        Waveform::Sawtooth,
        Waveform::Pulse,
        Waveform::WhiteNoise,
        Waveform::PinkNoise,
        Waveform::BrownianNoise,
        Waveform::Silence,
    ];

    /// Noise kinds ignore the tone frequency.
    #[inline]
    pub fn is_noise(self) -> bool {
        matches!(
            self,
            Waveform::WhiteNoise | Waveform::PinkNoise | Waveform::BrownianNoise
        )
    }

    /// Whether the waveform carries a running phase.
    #[inline]
    pub fn is_periodic(self) -> bool {
        !self.is_noise() && self != Waveform::Silence
    }
}

/// Running synthesis state of one tone.
#[derive(Debug, Clone)]
pub struct SynthState {
    /// Carrier phase in radians, kept in [0, 2π).
    phase: f64,
    /// `Pulse` envelope phase in radians, kept in [0, 2π).
    envelope_phase: f64,
    noise: NoiseState,
}

impl SynthState {
    /// Fresh state at phase zero with a noise source seeded by `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self {
            phase: 0.0,
            envelope_phase: 0.0,
            noise: NoiseState::seeded(seed),
        }
    }

    /// Start a periodic waveform at the given phase (radians).
    pub fn with_phase(mut self, phase: f64) -> Self {
        self.phase = phase.rem_euclid(TAU);
        self
    }

    #[inline]
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Back to phase zero with empty noise filters.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.envelope_phase = 0.0;
        self.noise.reset();
    }

    pub(crate) fn reset_noise(&mut self) {
        self.noise.reset();
    }
}

/// Fill `out` with `waveform` at `frequency` Hz scaled by `amplitude`, and
/// advance `state` by `out.len()` samples.
///
/// For periodic kinds sample `i` is evaluated at
/// `phase_in + 2π·f·i / sample_rate`, and the stored phase afterwards is
/// `phase_in + 2π·f·len / sample_rate` wrapped into [0, 2π), so generating two
/// consecutive blocks equals generating one block of their combined length.
///
/// Frequencies at or above Nyquist are not rejected; they alias. Clamping
/// `amplitude` is the caller's job.
pub fn generate(
    waveform: Waveform,
    frequency: f32,
    amplitude: f32,
    sample_rate: u32,
    out: &mut [f32],
    state: &mut SynthState,
) {
    if out.is_empty() {
        return;
    }

    let omega = TAU * frequency as f64 / sample_rate.max(1) as f64;
    let phase = state.phase;

    match waveform {
        Waveform::Sine => fill_periodic(out, phase, omega, amplitude, f64::sin),
        Waveform::Square => fill_periodic(out, phase, omega, amplitude, square),
        Waveform::Triangle => fill_periodic(out, phase, omega, amplitude, triangle),
        Waveform::Sawtooth => fill_periodic(out, phase, omega, amplitude, sawtooth),
        Waveform::Pulse => {
            let envelope_omega = omega * PULSE_ENVELOPE_RATIO;
            let envelope_phase = state.envelope_phase;
            for (i, sample) in out.iter_mut().enumerate() {
                let n = i as f64;
                let carrier = (phase + omega * n).sin();
                let envelope = ((envelope_phase + envelope_omega * n).sin() + 1.0) * 0.5;
                *sample = (carrier * envelope) as f32 * amplitude;
            }
            state.envelope_phase = advance(envelope_phase, envelope_omega, out.len());
        }
        Waveform::WhiteNoise => {
            for sample in out.iter_mut() {
                *sample = state.noise.white() * amplitude;
            }
        }
        Waveform::PinkNoise => {
            for sample in out.iter_mut() {
                *sample = state.noise.pink() * amplitude;
            }
        }
        Waveform::BrownianNoise => {
            let mut sum = 0.0f32;
            for sample in out.iter_mut() {
                *sample = state.noise.brown();
                sum += *sample;
            }
            // Re-center on the block so the integrator can't walk off into DC.
            let mean = sum / out.len() as f32;
            for sample in out.iter_mut() {
                *sample = (*sample - mean) * amplitude;
            }
        }
        Waveform::Silence => out.fill(0.0),
    }

    if waveform.is_periodic() {
        state.phase = advance(phase, omega, out.len());
    }
}

#[inline]
fn fill_periodic(out: &mut [f32], phase: f64, omega: f64, amplitude: f32, shape: fn(f64) -> f64) {
    for (i, sample) in out.iter_mut().enumerate() {
        *sample = shape(phase + omega * i as f64) as f32 * amplitude;
    }
}

#[inline]
fn advance(phase: f64, omega: f64, samples: usize) -> f64 {
    let next = (phase + omega * samples as f64).rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if next >= TAU {
        0.0
    } else {
        next
    }
}

#[inline]
fn square(theta: f64) -> f64 {
    if theta.sin() >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

#[inline]
fn triangle(theta: f64) -> f64 {
    FRAC_2_PI * theta.sin().asin()
}

#[inline]
fn sawtooth(theta: f64) -> f64 {
    let cycles = theta / TAU;
    2.0 * (cycles - (cycles + 0.5).floor())
}
