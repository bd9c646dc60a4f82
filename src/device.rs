//! Output device discovery.
//!
//! Device choice is left to the platform audio layer; this module only lists
//! what is there and resolves a [`DeviceSelector`](crate::DeviceSelector) to a concrete device.
//!
//! # Example: list output devices
//!
//! ```no_run
//! use tonemix::OutputDevice;
//!
//! for (i, device) in OutputDevice::list().iter().enumerate() {
//!     println!("[{}] {} ({} Hz, {} ch)",
//!         i, device.name(), device.sample_rate(), device.channels());
//! }
//! ```

#[cfg(feature = "cpal_output")]
use cpal::traits::{DeviceTrait, HostTrait};
#[cfg(feature = "cpal_output")]
use tracing::debug;

#[cfg(feature = "cpal_output")]
use crate::config::DeviceSelector;
#[cfg(feature = "cpal_output")]
use crate::error::{Error, Result};

/// A discovered audio output device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputDevice {
    name: String,
    sample_rate: u32,
    channels: u16,
}

impl OutputDevice {
    /// The system's default output device, if there is one.
    #[cfg(feature = "cpal_output")]
    pub fn default_output() -> Option<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device()?;
        Self::describe(&device)
    }

    #[cfg(not(feature = "cpal_output"))]
    pub fn default_output() -> Option<Self> {
        None
    }

    /// All output devices the platform reports.
    ///
    /// Devices whose default configuration can't be queried are skipped; an
    /// enumeration failure yields an empty list.
    #[cfg(feature = "cpal_output")]
    pub fn list() -> Vec<Self> {
        let host = cpal::default_host();
        host.output_devices()
            .map(|devices| devices.filter_map(|device| Self::describe(&device)).collect())
            .unwrap_or_default()
    }

    #[cfg(not(feature = "cpal_output"))]
    pub fn list() -> Vec<Self> {
        Vec::new()
    }

    #[cfg(feature = "cpal_output")]
    fn describe(device: &cpal::Device) -> Option<Self> {
        let config = device.default_output_config().ok()?;
        let name = device.name().unwrap_or_else(|_| "Unknown".into());
        Some(Self {
            name,
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The device's default sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The device's default channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

/// Resolve `selector` to a platform device.
#[cfg(feature = "cpal_output")]
pub(crate) fn resolve(selector: &DeviceSelector) -> Result<cpal::Device> {
    let host = cpal::default_host();
    let device = match selector {
        DeviceSelector::Default => host.default_output_device().ok_or(Error::NoDevice)?,
        DeviceSelector::Named(name) => host
            .output_devices()?
            .find(|device| device.name().map(|n| &n == name).unwrap_or(false))
            .ok_or_else(|| Error::DeviceNotFound(name.clone()))?,
    };
    debug!(
        host = ?host.id(),
        device = %device.name().unwrap_or_else(|_| "Unknown".into()),
        "resolved output device"
    );
    Ok(device)
}
