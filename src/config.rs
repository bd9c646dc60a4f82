//! Engine configuration.

use std::time::Duration;

/// Default output sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Default render period in frames (~23ms at 44.1kHz).
pub const DEFAULT_FRAMES_PER_PERIOD: usize = 1024;

/// Default number of tones that may exist at the same time.
pub const DEFAULT_MAX_TONES: usize = 16;

/// Default peak ceiling of the buffer-wide soft limiter.
pub const DEFAULT_LIMITER_CEILING: f32 = 0.8;

/// Default depth of the control-to-render message queue.
///
/// Large enough to absorb a burst of UI edits (e.g. dragging several sliders)
/// between two render periods.
pub const DEFAULT_COMMAND_QUEUE_CAPACITY: usize = 256;

/// Which output device the port should open.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DeviceSelector {
    /// The platform's default output device.
    #[default]
    Default,
    /// The first output device whose name matches exactly.
    Named(String),
}

/// Configuration shared by the mixer and the output port.
///
/// Built with [`Default`] and adjusted with the `with_*` setters:
///
/// ```
/// use tonemix::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_sample_rate(48_000)
///     .with_frames_per_period(512)
///     .with_max_tones(32);
/// assert_eq!(config.max_tones, 32);
/// ```
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Sample rate in Hz used by synthesis and the output stream.
    pub sample_rate: u32,
    /// Frames per render period; sizes every scratch buffer up front.
    pub frames_per_period: usize,
    /// Output stream channel count. The mixer always renders stereo.
    pub channels: u16,
    /// Maximum number of concurrent tones.
    pub max_tones: usize,
    /// Soft limiter ceiling, in (0, 1].
    pub limiter_ceiling: f32,
    /// Capacity of the control queue.
    pub command_queue_capacity: usize,
    /// Output device to open.
    pub device: DeviceSelector,
    /// Upper bound on how long the platform may take to open a stream.
    pub open_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            frames_per_period: DEFAULT_FRAMES_PER_PERIOD,
            channels: 2,
            max_tones: DEFAULT_MAX_TONES,
            limiter_ceiling: DEFAULT_LIMITER_CEILING,
            command_queue_capacity: DEFAULT_COMMAND_QUEUE_CAPACITY,
            device: DeviceSelector::Default,
            open_timeout: Duration::from_secs(2),
        }
    }
}

impl EngineConfig {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate.max(1);
        self
    }

    pub fn with_frames_per_period(mut self, frames: usize) -> Self {
        self.frames_per_period = frames.max(1);
        self
    }

    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = channels.max(1);
        self
    }

    pub fn with_max_tones(mut self, max_tones: usize) -> Self {
        self.max_tones = max_tones;
        self
    }

    /// Set the soft limiter ceiling. Non-positive or non-finite values fall
    /// back to the default.
    pub fn with_limiter_ceiling(mut self, ceiling: f32) -> Self {
        self.limiter_ceiling = if ceiling.is_finite() && ceiling > 0.0 {
            ceiling.min(1.0)
        } else {
            DEFAULT_LIMITER_CEILING
        };
        self
    }

    pub fn with_command_queue_capacity(mut self, capacity: usize) -> Self {
        self.command_queue_capacity = capacity.max(1);
        self
    }

    pub fn with_device(mut self, device: DeviceSelector) -> Self {
        self.device = device;
        self
    }

    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    /// Wall-clock length of one render period.
    pub fn period_duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames_per_period as f64 / self.sample_rate as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.frames_per_period, 1024);
        assert_eq!(config.channels, 2);
        assert_eq!(config.max_tones, 16);
        assert_eq!(config.limiter_ceiling, 0.8);
        assert_eq!(config.device, DeviceSelector::Default);
    }

    #[test]
    fn setters_clamp_degenerate_values() {
        let config = EngineConfig::default()
            .with_sample_rate(0)
            .with_frames_per_period(0)
            .with_limiter_ceiling(f32::NAN);
        assert_eq!(config.sample_rate, 1);
        assert_eq!(config.frames_per_period, 1);
        assert_eq!(config.limiter_ceiling, DEFAULT_LIMITER_CEILING);

        let config = EngineConfig::default().with_limiter_ceiling(3.0);
        assert_eq!(config.limiter_ceiling, 1.0);
    }

    #[test]
    fn period_duration_follows_rate_and_size() {
        let config = EngineConfig::default()
            .with_sample_rate(48_000)
            .with_frames_per_period(480);
        assert_eq!(config.period_duration(), Duration::from_millis(10));
    }
}
