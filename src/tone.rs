//! Tone identity and parameters.

use core::fmt;

use crate::synth::{SynthState, Waveform};

/// Lowest frequency accepted at the control boundary, in Hz.
pub const MIN_FREQUENCY: f32 = 1.0;
/// Highest frequency accepted at the control boundary, in Hz.
///
/// Values above half the sample rate are accepted and alias; keeping tones
/// below Nyquist is the caller's responsibility.
pub const MAX_FREQUENCY: f32 = 22_000.0;

/// Stable identity of a tone for the lifetime of a session.
///
/// Ids are handed out monotonically by [`ToneController`](crate::ToneController)
/// and never reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ToneId(pub(crate) u64);

impl ToneId {
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ToneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// User-facing parameters of one tone.
///
/// A tone is audible when `enabled && active && volume > 0` and its waveform is
/// not [`Waveform::Silence`]. `enabled` is the user's "this tone is part of the
/// mix" switch; `active` is the transient play/pause state that transport and
/// scheduling code toggles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToneParams {
    /// Frequency in Hz. Ignored by the noise waveforms but still stored.
    pub frequency: f32,
    /// Linear gain in [0, 1].
    pub volume: f32,
    pub waveform: Waveform,
    /// -1 = full left, 0 = center, +1 = full right.
    pub pan: f32,
    pub enabled: bool,
    pub active: bool,
}

impl Default for ToneParams {
    fn default() -> Self {
        Self {
            frequency: 440.0,
            volume: 0.5,
            waveform: Waveform::Sine,
            pan: 0.0,
            enabled: true,
            active: true,
        }
    }
}

impl ToneParams {
    /// A centered, enabled and active tone at half volume.
    pub fn new(waveform: Waveform, frequency: f32) -> Self {
        Self {
            waveform,
            frequency,
            ..Self::default()
        }
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_pan(mut self, pan: f32) -> Self {
        self.pan = pan;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Clamp numeric fields into their documented ranges.
    ///
    /// Non-finite values are left as they are; the mixer excludes such a tone
    /// from the mix instead of guessing a value for it.
    pub fn sanitized(mut self) -> Self {
        self.frequency = clamp_finite(self.frequency, MIN_FREQUENCY, MAX_FREQUENCY);
        self.volume = clamp_finite(self.volume, 0.0, 1.0);
        self.pan = clamp_finite(self.pan, -1.0, 1.0);
        self
    }

    /// Whether this tone contributes signal to the mix.
    #[inline]
    pub fn is_audible(&self) -> bool {
        self.enabled && self.active && self.volume > 0.0 && self.waveform != Waveform::Silence
    }

    /// Whether every numeric parameter can be rendered.
    #[inline]
    pub(crate) fn is_finite(&self) -> bool {
        self.frequency.is_finite() && self.volume.is_finite() && self.pan.is_finite()
    }

    /// Apply a partial update.
    pub fn apply(&mut self, update: &ToneUpdate) {
        if let Some(frequency) = update.frequency {
            self.frequency = frequency;
        }
        if let Some(volume) = update.volume {
            self.volume = volume;
        }
        if let Some(waveform) = update.waveform {
            self.waveform = waveform;
        }
        if let Some(pan) = update.pan {
            self.pan = pan;
        }
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        if let Some(active) = update.active {
            self.active = active;
        }
    }
}

#[inline]
fn clamp_finite(value: f32, min: f32, max: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        value
    }
}

/// A partial parameter change; `None` fields keep their current value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ToneUpdate {
    pub frequency: Option<f32>,
    pub volume: Option<f32>,
    pub waveform: Option<Waveform>,
    pub pan: Option<f32>,
    pub enabled: Option<bool>,
    pub active: Option<bool>,
}

impl ToneUpdate {
    /// An update that replaces every field.
    pub fn replace(params: ToneParams) -> Self {
        Self {
            frequency: Some(params.frequency),
            volume: Some(params.volume),
            waveform: Some(params.waveform),
            pan: Some(params.pan),
            enabled: Some(params.enabled),
            active: Some(params.active),
        }
    }

    pub fn frequency(mut self, frequency: f32) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn waveform(mut self, waveform: Waveform) -> Self {
        self.waveform = Some(waveform);
        self
    }

    pub fn pan(mut self, pan: f32) -> Self {
        self.pan = Some(pan);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fold a later update into this one; fields set in `newer` win.
    pub fn merge(&mut self, newer: &ToneUpdate) {
        self.frequency = newer.frequency.or(self.frequency);
        self.volume = newer.volume.or(self.volume);
        self.waveform = newer.waveform.or(self.waveform);
        self.pan = newer.pan.or(self.pan);
        self.enabled = newer.enabled.or(self.enabled);
        self.active = newer.active.or(self.active);
    }
}

/// Render-side record of a tone: its parameters plus running synthesis state.
///
/// Owned exclusively by the [`Mixer`](crate::Mixer). The phase and noise
/// filter memory are advanced only by the render path.
#[derive(Debug)]
pub(crate) struct ToneState {
    pub(crate) id: ToneId,
    pub(crate) params: ToneParams,
    pub(crate) synth: SynthState,
}

impl ToneState {
    pub(crate) fn new(id: ToneId, params: ToneParams) -> Self {
        Self {
            id,
            params,
            synth: SynthState::seeded(id.0),
        }
    }

    pub(crate) fn update(&mut self, update: &ToneUpdate) {
        let previous = self.params.waveform;
        self.params.apply(update);
        if self.params.waveform != previous {
            // Filter memory from a different noise color would leak into the new one.
            self.synth.reset_noise();
        }
    }
}
