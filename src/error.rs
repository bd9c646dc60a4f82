//! Error types surfaced by the control surface and the output port.
//!
//! Nothing in here is produced by the render path. Synthesis faults are
//! isolated per tone inside [`Mixer`](crate::Mixer) and never escape a render
//! call.

use crate::tone::ToneId;

/// Errors returned by tone control, device handling and capture.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The tone id is not (or no longer) part of the tone table.
    #[error("unknown tone {0}")]
    UnknownTone(ToneId),

    /// Adding another tone would exceed the configured concurrent-tone limit.
    #[error("tone limit of {limit} reached")]
    ToneLimit { limit: usize },

    /// The platform reports no default output device.
    #[error("no audio output device available")]
    NoDevice,

    /// No output device matches the requested name.
    #[error("output device not found: {0}")]
    DeviceNotFound(String),

    /// The device only offers a sample format the port cannot write.
    #[error("unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),

    /// The device works but can't run at the requested rate and channel count.
    ///
    /// Not a device error: falling back to muted output would hide a
    /// configuration mistake.
    #[error("output device does not support {sample_rate} Hz with {channels} channel(s)")]
    UnsupportedConfig { sample_rate: u32, channels: u16 },

    /// `start` was called on a port that has not been opened.
    #[error("output port is not open")]
    NotOpen,

    /// The simulated clock thread could not be spawned.
    #[error("failed to spawn output thread: {0}")]
    Thread(String),

    #[cfg(feature = "cpal_output")]
    #[error("failed to enumerate output devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[cfg(feature = "cpal_output")]
    #[error("failed to query default stream config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[cfg(feature = "cpal_output")]
    #[error("failed to query supported stream configs: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[cfg(feature = "cpal_output")]
    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[cfg(feature = "cpal_output")]
    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[cfg(feature = "cpal_output")]
    #[error("failed to pause output stream: {0}")]
    PauseStream(#[from] cpal::PauseStreamError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error came from the audio device layer.
    ///
    /// Device errors are recoverable: the caller can keep running on the
    /// simulated backend (see [`OutputPort::open_or_simulate`](crate::OutputPort::open_or_simulate)).
    pub fn is_device_error(&self) -> bool {
        match self {
            Error::NoDevice | Error::DeviceNotFound(_) | Error::UnsupportedSampleFormat(_) => true,
            #[cfg(feature = "cpal_output")]
            Error::Devices(_)
            | Error::DefaultConfig(_)
            | Error::SupportedConfigs(_)
            | Error::BuildStream(_)
            | Error::PlayStream(_)
            | Error::PauseStream(_) => true,
            _ => false,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
