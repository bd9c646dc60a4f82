//! White, pink and Brownian noise generators.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Brownian integrator leak: `b = (b + STEP * white) / LEAK`.
const BROWN_STEP: f32 = 0.02;
const BROWN_LEAK: f32 = 1.02;
/// Brings the integrator output back to roughly unit range.
const BROWN_GAIN: f32 = 3.5;

/// Paul Kellet's refined pink filter output is around +/-9; this scales it to
/// roughly unit range.
const PINK_GAIN: f32 = 0.11;

/// Per-tone noise state: random source plus colored-noise filter memory.
#[derive(Debug, Clone)]
pub struct NoiseState {
    rng: SmallRng,
    pink: [f32; 7],
    brown: f32,
}

impl NoiseState {
    /// Create a generator whose output is fully determined by `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            pink: [0.0; 7],
            brown: 0.0,
        }
    }

    /// Clear filter memory (the random sequence keeps going).
    pub fn reset(&mut self) {
        self.pink = [0.0; 7];
        self.brown = 0.0;
    }

    /// Uniform sample in [-1, 1).
    #[inline]
    pub fn white(&mut self) -> f32 {
        self.rng.gen::<f32>() * 2.0 - 1.0
    }

    /// White noise through Paul Kellet's 7-pole pinking filter (-3dB/octave).
    #[inline]
    pub fn pink(&mut self) -> f32 {
        let white = self.white();
        let b = &mut self.pink;
        b[0] = 0.99886 * b[0] + white * 0.055_517_9;
        b[1] = 0.99332 * b[1] + white * 0.075_075_9;
        b[2] = 0.96900 * b[2] + white * 0.153_852;
        b[3] = 0.86650 * b[3] + white * 0.310_485_6;
        b[4] = 0.55000 * b[4] + white * 0.532_952_2;
        b[5] = -0.7616 * b[5] - white * 0.016_898;
        let pink = b[0] + b[1] + b[2] + b[3] + b[4] + b[5] + b[6] + white * 0.5362;
        b[6] = white * 0.115_926;
        pink * PINK_GAIN
    }

    /// One step of the leaky Brownian integrator.
    #[inline]
    pub fn brown(&mut self) -> f32 {
        let white = self.white();
        self.brown = (self.brown + BROWN_STEP * white) / BROWN_LEAK;
        self.brown * BROWN_GAIN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = NoiseState::seeded(7);
        let mut b = NoiseState::seeded(7);
        for _ in 0..256 {
            assert_eq!(a.white(), b.white());
        }
    }

    #[test]
    fn white_stays_in_unit_range() {
        let mut noise = NoiseState::seeded(1);
        for _ in 0..10_000 {
            let s = noise.white();
            assert!((-1.0..1.0).contains(&s));
        }
    }

    #[test]
    fn colored_noise_is_bounded() {
        let mut noise = NoiseState::seeded(3);
        for _ in 0..50_000 {
            assert!(noise.pink().abs() < 2.0);
            assert!(noise.brown().abs() < 2.0);
        }
    }

    #[test]
    fn reset_clears_filter_memory() {
        let mut noise = NoiseState::seeded(11);
        for _ in 0..100 {
            noise.pink();
            noise.brown();
        }
        noise.reset();
        assert_eq!(noise.pink, [0.0; 7]);
        assert_eq!(noise.brown, 0.0);
    }
}
