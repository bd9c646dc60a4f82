//! Audio output port: owns the platform stream and drives the mixer.
//!
//! The port runs the [`Mixer`] on the platform's real-time callback thread.
//! The mixer sits behind a mutex that only the control thread ever waits on;
//! the callback uses `try_lock` and writes silence for a period it can't get
//! the lock for, so it never blocks on the control surface. In normal
//! operation nothing else takes the lock, since tone edits travel through the
//! command queue instead.
//!
//! When no device is available the port can run on a simulated clock thread
//! instead: same render cadence, output discarded. Taps, visualization and
//! recording keep working in that muted mode.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[cfg(feature = "cpal_output")]
use cpal::traits::{DeviceTrait, StreamTrait};
#[cfg(feature = "cpal_output")]
use cpal::{FromSample, SampleFormat, SizedSample};
use parking_lot::Mutex;
use tracing::{debug, info, warn};
#[cfg(feature = "cpal_output")]
use tracing::error;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::mixer::{Mixer, CHANNELS};

/// Lifecycle state of an [`OutputPort`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortState {
    Closed,
    /// A stream exists but is not pulling audio.
    Open,
    Running,
}

/// Counters maintained by the render callback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PortStats {
    /// Render periods requested by the stream (or simulated clock).
    pub callbacks: u64,
    /// Periods replaced by silence because the mixer was locked elsewhere.
    pub contended_periods: u64,
    /// Errors reported asynchronously by the platform stream.
    pub stream_errors: u64,
}

#[derive(Debug, Default)]
struct Counters {
    callbacks: AtomicU64,
    contended_periods: AtomicU64,
    stream_errors: AtomicU64,
}

enum Backend {
    #[cfg(feature = "cpal_output")]
    Device(cpal::Stream),
    Simulated(SimulatedClock),
}

/// Owns the output stream lifecycle: `open` → `start` ⇄ `stop` → `close`.
///
/// Stopping or closing keeps the mixer and its tones, so playback resumes with
/// the same configuration. All lifecycle calls belong on the control thread.
pub struct OutputPort {
    mixer: Arc<Mutex<Mixer>>,
    config: EngineConfig,
    backend: Option<Backend>,
    running: bool,
    counters: Arc<Counters>,
}

impl OutputPort {
    pub fn new(mixer: Mixer, config: &EngineConfig) -> Self {
        Self {
            mixer: Arc::new(Mutex::new(mixer)),
            config: config.clone(),
            backend: None,
            running: false,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn state(&self) -> PortState {
        match (&self.backend, self.running) {
            (None, _) => PortState::Closed,
            (Some(_), false) => PortState::Open,
            (Some(_), true) => PortState::Running,
        }
    }

    /// Whether the port runs on the simulated (muted) backend.
    pub fn is_simulated(&self) -> bool {
        matches!(self.backend, Some(Backend::Simulated(_)))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> PortStats {
        PortStats {
            callbacks: self.counters.callbacks.load(Ordering::Relaxed),
            contended_periods: self.counters.contended_periods.load(Ordering::Relaxed),
            stream_errors: self.counters.stream_errors.load(Ordering::Relaxed),
        }
    }

    /// Run `f` with exclusive access to the mixer.
    ///
    /// While the port is running, periods that coincide with `f` are rendered
    /// as silence, so keep `f` short.
    pub fn with_mixer<R>(&self, f: impl FnOnce(&mut Mixer) -> R) -> R {
        f(&mut self.mixer.lock())
    }

    /// Open the configured output device. The stream is created paused.
    #[cfg(feature = "cpal_output")]
    pub fn open(&mut self) -> Result<()> {
        if self.backend.is_some() {
            debug!("output port already open");
            return Ok(());
        }
        let stream = self.build_device_stream()?;
        self.backend = Some(Backend::Device(stream));
        info!(
            sample_rate = self.config.sample_rate,
            frames = self.config.frames_per_period,
            channels = self.config.channels,
            "output stream opened"
        );
        Ok(())
    }

    #[cfg(not(feature = "cpal_output"))]
    pub fn open(&mut self) -> Result<()> {
        if self.backend.is_some() {
            return Ok(());
        }
        Err(Error::NoDevice)
    }

    /// Open the simulated backend: a clock thread renders one period every
    /// `frames_per_period / sample_rate` seconds and discards the output.
    pub fn open_simulated(&mut self) {
        if self.backend.is_some() {
            debug!("output port already open");
            return;
        }
        self.backend = Some(Backend::Simulated(SimulatedClock::default()));
        info!("simulated output opened");
    }

    /// Open the device, falling back to the simulated backend on a device error.
    ///
    /// Returns the error that forced the fallback, if any, so the caller can
    /// tell the user playback is muted. Errors that aren't
    /// [device errors](Error::is_device_error), such as a sample rate the
    /// device can't run at, are returned and leave the port closed.
    pub fn open_or_simulate(&mut self) -> Result<Option<Error>> {
        match self.open() {
            Ok(()) => Ok(None),
            Err(err) if err.is_device_error() => {
                warn!(%err, "no usable output device, continuing muted");
                self.open_simulated();
                Ok(Some(err))
            }
            Err(err) => Err(err),
        }
    }

    /// Start pulling audio from the mixer.
    pub fn start(&mut self) -> Result<()> {
        if self.running {
            return Ok(());
        }
        match self.backend.as_mut() {
            None => return Err(Error::NotOpen),
            #[cfg(feature = "cpal_output")]
            Some(Backend::Device(stream)) => stream.play()?,
            Some(Backend::Simulated(clock)) => clock.start(
                Arc::clone(&self.mixer),
                Arc::clone(&self.counters),
                self.config.period_duration(),
                self.config.frames_per_period,
            )?,
        }
        self.running = true;
        info!("output started");
        Ok(())
    }

    /// Halt the render callback. No render happens after this returns
    /// (the simulated clock is joined; a device stream is paused).
    pub fn stop(&mut self) -> Result<()> {
        if !self.running {
            return Ok(());
        }
        match self.backend.as_mut() {
            None => {}
            #[cfg(feature = "cpal_output")]
            Some(Backend::Device(stream)) => stream.pause()?,
            Some(Backend::Simulated(clock)) => clock.stop(),
        }
        self.running = false;
        info!("output stopped");
        Ok(())
    }

    /// Stop and release the stream. The mixer and its tones are kept.
    pub fn close(&mut self) -> Result<()> {
        if self.backend.is_none() {
            return Ok(());
        }
        let stopped = self.stop();
        // Dropping the backend releases the platform stream / joins the clock.
        self.backend = None;
        self.running = false;
        info!("output closed");
        stopped
    }

    #[cfg(feature = "cpal_output")]
    fn build_device_stream(&self) -> Result<cpal::Stream> {
        let device = crate::device::resolve(&self.config.device)?;
        let (mut stream_config, sample_format) =
            negotiate(&self.config, device.supported_output_configs()?)?;
        debug!(?stream_config, ?sample_format, "negotiated output config");

        let stream = match self.build_for_format(&device, &stream_config, sample_format) {
            Err(Error::BuildStream(cpal::BuildStreamError::StreamConfigNotSupported))
                if matches!(stream_config.buffer_size, cpal::BufferSize::Fixed(_)) =>
            {
                warn!(
                    frames = self.config.frames_per_period,
                    "fixed buffer size refused, using the host default"
                );
                stream_config.buffer_size = cpal::BufferSize::Default;
                self.build_for_format(&device, &stream_config, sample_format)?
            }
            result => result?,
        };

        // Some hosts start streams on creation.
        if let Err(err) = stream.pause() {
            debug!(%err, "could not pause freshly built stream");
        }
        Ok(stream)
    }

    #[cfg(feature = "cpal_output")]
    fn build_for_format(
        &self,
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        sample_format: SampleFormat,
    ) -> Result<cpal::Stream> {
        match sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(device, config),
            SampleFormat::I16 => self.build_stream::<i16>(device, config),
            SampleFormat::I32 => self.build_stream::<i32>(device, config),
            SampleFormat::U16 => self.build_stream::<u16>(device, config),
            SampleFormat::F64 => self.build_stream::<f64>(device, config),
            other => Err(Error::UnsupportedSampleFormat(format!("{:?}", other))),
        }
    }

    #[cfg(feature = "cpal_output")]
    fn build_stream<T>(&self, device: &cpal::Device, config: &cpal::StreamConfig) -> Result<cpal::Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let mixer = Arc::clone(&self.mixer);
        let counters = Arc::clone(&self.counters);
        let error_counters = Arc::clone(&self.counters);
        let channels = config.channels as usize;
        let mut scratch = vec![0.0f32; self.config.frames_per_period * CHANNELS];

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let needed = data.len().div_ceil(channels) * CHANNELS;
                if scratch.len() < needed {
                    // Host-chosen or ignored buffer size.
                    scratch.resize(needed, 0.0);
                }
                let stereo = &mut scratch[..needed];
                render_period(&mixer, &counters, stereo);
                write_frames(data, stereo, channels);
            },
            move |err| {
                error_counters.stream_errors.fetch_add(1, Ordering::Relaxed);
                error!(%err, "output stream error");
            },
            Some(self.config.open_timeout),
        )?;
        Ok(stream)
    }
}

impl Drop for OutputPort {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(%err, "error closing output port");
        }
    }
}

/// Sample formats the port can write, most preferred first.
#[cfg(feature = "cpal_output")]
const FORMAT_PREFERENCE: [SampleFormat; 5] = [
    SampleFormat::F32,
    SampleFormat::I16,
    SampleFormat::I32,
    SampleFormat::U16,
    SampleFormat::F64,
];

/// Pick a stream config from what the device supports.
///
/// The configured sample rate and channel count are requirements; the sample
/// format and the fixed buffer size are preferences. A buffer size outside the
/// device's range falls back to the host default.
#[cfg(feature = "cpal_output")]
pub(crate) fn negotiate(
    config: &EngineConfig,
    supported: impl IntoIterator<Item = cpal::SupportedStreamConfigRange>,
) -> Result<(cpal::StreamConfig, SampleFormat)> {
    let rate = cpal::SampleRate(config.sample_rate);
    let candidates: Vec<_> = supported
        .into_iter()
        .filter(|range| range.channels() == config.channels)
        .filter(|range| range.min_sample_rate() <= rate && rate <= range.max_sample_rate())
        .collect();
    let Some(first) = candidates.first() else {
        return Err(Error::UnsupportedConfig {
            sample_rate: config.sample_rate,
            channels: config.channels,
        });
    };
    let unsupported = first.sample_format();

    let range = candidates
        .iter()
        .filter_map(|range| {
            let rank = FORMAT_PREFERENCE
                .iter()
                .position(|format| *format == range.sample_format())?;
            Some((rank, range))
        })
        .min_by_key(|(rank, _)| *rank)
        .map(|(_, range)| range)
        .ok_or_else(|| Error::UnsupportedSampleFormat(format!("{:?}", unsupported)))?;

    let frames = config.frames_per_period as u32;
    let buffer_size = match range.buffer_size() {
        cpal::SupportedBufferSize::Range { min, max } if !(*min..=*max).contains(&frames) => {
            cpal::BufferSize::Default
        }
        _ => cpal::BufferSize::Fixed(frames),
    };

    let stream_config = cpal::StreamConfig {
        channels: config.channels,
        sample_rate: rate,
        buffer_size,
    };
    Ok((stream_config, range.sample_format()))
}

/// One render period, shared by the device callback and the simulated clock.
fn render_period(mixer: &Mutex<Mixer>, counters: &Counters, out: &mut [f32]) {
    counters.callbacks.fetch_add(1, Ordering::Relaxed);
    match mixer.try_lock() {
        Some(mut mixer) => mixer.render_into(out),
        None => {
            out.fill(0.0);
            counters.contended_periods.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Map interleaved stereo onto the device's channel layout.
///
/// Mono gets the L/R average; layouts wider than stereo get L and R on the
/// first two channels and silence on the rest.
#[cfg(feature = "cpal_output")]
pub(crate) fn write_frames<T>(data: &mut [T], stereo: &[f32], channels: usize)
where
    T: SizedSample + FromSample<f32>,
{
    let channels = channels.max(1);
    for (frame, lr) in data.chunks_mut(channels).zip(stereo.chunks_exact(CHANNELS)) {
        if channels == 1 {
            frame[0] = T::from_sample((lr[0] + lr[1]) * 0.5);
            continue;
        }
        for (ch, sample) in frame.iter_mut().enumerate() {
            let value = lr.get(ch).copied().unwrap_or(0.0);
            *sample = T::from_sample(value);
        }
    }
}

/// Stand-in for a device: renders at the real-time cadence on its own thread.
#[derive(Default)]
struct SimulatedClock {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SimulatedClock {
    fn start(
        &mut self,
        mixer: Arc<Mutex<Mixer>>,
        counters: Arc<Counters>,
        period: Duration,
        frames: usize,
    ) -> Result<()> {
        if self.thread.is_some() {
            return Ok(());
        }
        self.running.store(true, Ordering::Release);
        let running = Arc::clone(&self.running);

        let handle = thread::Builder::new()
            .name("tonemix-simulated-output".into())
            .spawn(move || {
                let mut buffer = vec![0.0f32; frames * CHANNELS];
                let mut deadline = Instant::now();
                while running.load(Ordering::Acquire) {
                    render_period(&mixer, &counters, &mut buffer);
                    deadline += period;
                    let now = Instant::now();
                    if deadline > now {
                        thread::sleep(deadline - now);
                    } else {
                        // Fell behind; don't try to catch up with a burst.
                        deadline = now;
                    }
                }
            })
            .map_err(|err| {
                self.running.store(false, Ordering::Release);
                Error::Thread(err.to_string())
            })?;

        self.thread = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                warn!("simulated output thread panicked");
            }
        }
    }
}

impl Drop for SimulatedClock {
    fn drop(&mut self) {
        self.stop();
    }
}
