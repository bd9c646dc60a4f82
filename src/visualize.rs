//! Visualization sink: oscilloscope traces and a magnitude spectrum.
//!
//! A [`Visualizer`] reads the mixer's buffer handoff (a tap) on whatever thread
//! draws the UI. It only ever looks at the most recent window of audio: each
//! [`poll`](Visualizer::poll) drains everything the render path pushed and
//! drops the oldest frames beyond the window. If the UI stalls, the mixer's
//! tap just skips blocks; neither side waits on the other.

use std::collections::VecDeque;
use std::f32::consts::TAU;
use std::sync::Arc;

use rtrb::Consumer;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::mixer::CHANNELS;

/// Default number of points in a scope trace.
pub const DEFAULT_SCOPE_POINTS: usize = 1000;

/// Default analysis window in frames (also the FFT size).
pub const DEFAULT_WINDOW: usize = 2048;

/// Decimated left/right traces for a waveform display.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scope {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

/// Magnitude spectrum of the latest window.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Spectrum {
    /// Magnitudes of bins `0..window/2`, normalized so a full-scale sine
    /// peaks near 1.0.
    pub magnitudes: Vec<f32>,
    /// Width of one bin in Hz.
    pub bin_hz: f32,
}

impl Spectrum {
    /// Center frequency of bin `index`.
    pub fn frequency_of(&self, index: usize) -> f32 {
        index as f32 * self.bin_hz
    }

    /// Frequency of the strongest bin, ignoring DC.
    pub fn peak_frequency(&self) -> Option<f32> {
        self.magnitudes
            .iter()
            .enumerate()
            .skip(1)
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(index, _)| self.frequency_of(index))
    }
}

/// Consumes a mixer tap and produces display data.
pub struct Visualizer {
    consumer: Consumer<f32>,
    sample_rate: u32,
    window: usize,
    left: VecDeque<f32>,
    right: VecDeque<f32>,
    /// Half-received frame when a poll ends between left and right.
    pending_left: Option<f32>,

    fft: Arc<dyn Fft<f32>>,
    hann: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl Visualizer {
    /// `consumer` must come from [`Mixer::tap`](crate::Mixer::tap);
    /// `window` is the analysis length in frames.
    pub fn new(consumer: Consumer<f32>, sample_rate: u32, window: usize) -> Self {
        let window = window.max(2);
        let fft = FftPlanner::new().plan_fft_forward(window);
        let hann = (0..window)
            .map(|i| 0.5 - 0.5 * (TAU * i as f32 / window as f32).cos())
            .collect();

        Self {
            consumer,
            sample_rate: sample_rate.max(1),
            window,
            left: VecDeque::with_capacity(window),
            right: VecDeque::with_capacity(window),
            pending_left: None,
            fft,
            hann,
            scratch: vec![Complex::default(); window],
        }
    }

    #[inline]
    pub fn window(&self) -> usize {
        self.window
    }

    /// Frames currently held (at most `window`).
    #[inline]
    pub fn len(&self) -> usize {
        self.left.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Drain the tap, keeping only the latest `window` frames.
    ///
    /// Returns how many frames were read.
    pub fn poll(&mut self) -> usize {
        let available = self.consumer.slots();
        if available == 0 {
            return 0;
        }

        let Self {
            consumer,
            window,
            left,
            right,
            pending_left,
            ..
        } = self;

        let mut frames = 0;
        if let Ok(chunk) = consumer.read_chunk(available) {
            let (first, second) = chunk.as_slices();
            for &sample in first.iter().chain(second.iter()) {
                match pending_left.take() {
                    None => *pending_left = Some(sample),
                    Some(l) => {
                        if left.len() == *window {
                            left.pop_front();
                            right.pop_front();
                        }
                        left.push_back(l);
                        right.push_back(sample);
                        frames += 1;
                    }
                }
            }
            chunk.commit_all();
        }
        frames
    }

    /// Stride-decimated traces of the held window, at most `max_points` long.
    pub fn scope(&self, max_points: usize) -> Scope {
        let max_points = max_points.max(1);
        let stride = self.left.len().div_ceil(max_points).max(1);
        Scope {
            left: self.left.iter().step_by(stride).copied().collect(),
            right: self.right.iter().step_by(stride).copied().collect(),
        }
    }

    /// Hann-windowed FFT of the held window folded to mono.
    ///
    /// A window that isn't full yet is zero-padded at the front.
    pub fn spectrum(&mut self) -> Spectrum {
        let pad = self.window - self.left.len();
        for slot in self.scratch[..pad].iter_mut() {
            *slot = Complex::default();
        }
        for (i, (l, r)) in self.left.iter().zip(self.right.iter()).enumerate() {
            let index = pad + i;
            let mono = (l + r) / CHANNELS as f32;
            self.scratch[index] = Complex::new(mono * self.hann[index], 0.0);
        }

        self.fft.process(&mut self.scratch);

        // Hann has a coherent gain of 0.5: 2/N for the one-sided spectrum, ×2 for the window.
        let norm = 4.0 / self.window as f32;
        let magnitudes = self.scratch[..self.window / 2]
            .iter()
            .map(|c| c.norm() * norm)
            .collect();

        Spectrum {
            magnitudes,
            bin_hz: self.sample_rate as f32 / self.window as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtrb::RingBuffer;

    fn feed(frames: &[(f32, f32)], capacity: usize) -> (rtrb::Producer<f32>, Consumer<f32>) {
        let (mut producer, consumer) = RingBuffer::new(capacity);
        for &(l, r) in frames {
            producer.push(l).unwrap();
            producer.push(r).unwrap();
        }
        (producer, consumer)
    }

    #[test]
    fn poll_keeps_only_the_latest_window() {
        let frames: Vec<_> = (0..10).map(|i| (i as f32, -(i as f32))).collect();
        let (_tx, rx) = feed(&frames, 64);
        let mut viz = Visualizer::new(rx, 48_000, 4);
        assert_eq!(viz.poll(), 10);
        assert_eq!(viz.len(), 4);
        let scope = viz.scope(100);
        assert_eq!(scope.left, vec![6.0, 7.0, 8.0, 9.0]);
        assert_eq!(scope.right, vec![-6.0, -7.0, -8.0, -9.0]);
    }

    #[test]
    fn split_frames_are_reassembled() {
        let (mut tx, rx) = RingBuffer::new(8);
        let mut viz = Visualizer::new(rx, 48_000, 8);
        tx.push(0.5).unwrap();
        assert_eq!(viz.poll(), 0);
        tx.push(-0.5).unwrap();
        assert_eq!(viz.poll(), 1);
        assert_eq!(viz.scope(10).right, vec![-0.5]);
    }

    #[test]
    fn scope_is_decimated_to_max_points() {
        let frames: Vec<_> = (0..2500).map(|i| (i as f32, 0.0)).collect();
        let (_tx, rx) = feed(&frames, 5000);
        let mut viz = Visualizer::new(rx, 48_000, 4096);
        viz.poll();
        let scope = viz.scope(DEFAULT_SCOPE_POINTS);
        assert!(scope.left.len() <= DEFAULT_SCOPE_POINTS);
        assert_eq!(scope.left[..3], [0.0, 3.0, 6.0]);
    }

    #[test]
    fn silent_input_gives_flat_spectrum() {
        let (_tx, rx) = RingBuffer::<f32>::new(8);
        let mut viz = Visualizer::new(rx, 48_000, 256);
        let spectrum = viz.spectrum();
        assert_eq!(spectrum.magnitudes.len(), 128);
        assert!(spectrum.magnitudes.iter().all(|&m| m == 0.0));
        assert_eq!(spectrum.bin_hz, 187.5);
    }
}
