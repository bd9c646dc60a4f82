//! The render side: tone table, synthesis, panning, mixing and limiting.

use itertools::izip;
use rtrb::{Consumer, Producer, RingBuffer};

use crate::config::EngineConfig;
use crate::control::{ToneCommand, MAX_MASTER_VOLUME};
use crate::synth::generate;
use crate::tone::{ToneId, ToneParams, ToneState};

/// The mixer always renders interleaved stereo.
pub const CHANNELS: usize = 2;

/// Equal-power pan law.
///
/// Returns `(left_gain, right_gain)` with `left = sqrt((1 - pan) / 2)` and
/// `right = sqrt((1 + pan) / 2)`. Both gains are `sqrt(0.5)` at the center and
/// `left² + right² == 1` across the whole range. `pan` is clamped to [-1, 1].
#[inline]
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let pan = pan.clamp(-1.0, 1.0);
    (((1.0 - pan) / 2.0).sqrt(), ((1.0 + pan) / 2.0).sqrt())
}

/// Buffer-wide soft limiter.
///
/// If the largest absolute sample across both channels exceeds `ceiling`,
/// both channels are scaled by `ceiling / peak`; otherwise they are left
/// untouched. Returns the gain that was applied.
pub fn soft_limit(left: &mut [f32], right: &mut [f32], ceiling: f32) -> f32 {
    let peak = left
        .iter()
        .chain(right.iter())
        .fold(0.0f32, |peak, s| peak.max(s.abs()));

    if peak <= ceiling {
        return 1.0;
    }

    let gain = ceiling / peak;
    for sample in left.iter_mut().chain(right.iter_mut()) {
        *sample *= gain;
    }
    gain
}

/// An owned block of interleaved stereo frames.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StereoBuffer {
    samples: Vec<f32>,
}

impl StereoBuffer {
    /// A silent buffer of `frames` frames.
    pub fn silence(frames: usize) -> Self {
        Self {
            samples: vec![0.0; frames * CHANNELS],
        }
    }

    pub fn from_interleaved(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.samples.len() / CHANNELS
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_interleaved(&self) -> &[f32] {
        &self.samples
    }

    pub fn as_interleaved_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn into_interleaved(self) -> Vec<f32> {
        self.samples
    }

    pub fn left(&self) -> impl Iterator<Item = f32> + '_ {
        self.samples.iter().step_by(CHANNELS).copied()
    }

    pub fn right(&self) -> impl Iterator<Item = f32> + '_ {
        self.samples.iter().skip(1).step_by(CHANNELS).copied()
    }

    /// Largest absolute sample on either channel.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
    }

    /// Root mean square of the (left, right) channels.
    pub fn rms(&self) -> (f32, f32) {
        let frames = self.frames().max(1) as f64;
        let energy = |it: &mut dyn Iterator<Item = f32>| {
            (it.map(|s| s as f64 * s as f64).sum::<f64>() / frames).sqrt() as f32
        };
        (energy(&mut self.left()), energy(&mut self.right()))
    }
}

/// Renders the live tone set into stereo buffers.
///
/// The mixer owns every [`ToneState`] exclusively. Parameter changes arrive as
/// [`ToneCommand`]s from the paired [`ToneController`](crate::ToneController)
/// and are applied at the start of each render call, before any sample is
/// produced.
///
/// After construction the render path does not allocate: the tone table and
/// all scratch buffers are sized from [`EngineConfig`], and longer requests are
/// rendered in period-sized chunks.
pub struct Mixer {
    commands: Consumer<ToneCommand>,
    tones: Vec<ToneState>,
    max_tones: usize,
    sample_rate: u32,
    period: usize,
    ceiling: f32,
    master_volume: f32,

    mono: Vec<f32>,
    left: Vec<f32>,
    right: Vec<f32>,

    taps: Vec<Producer<f32>>,
    dropped_tap_blocks: u64,
    faulted_tones: u64,
}

impl Mixer {
    pub(crate) fn new(commands: Consumer<ToneCommand>, config: &EngineConfig) -> Self {
        let period = config.frames_per_period.max(1);
        Self {
            commands,
            tones: Vec::with_capacity(config.max_tones),
            max_tones: config.max_tones,
            sample_rate: config.sample_rate.max(1),
            period,
            ceiling: config.limiter_ceiling,
            master_volume: 1.0,
            mono: vec![0.0; period],
            left: vec![0.0; period],
            right: vec![0.0; period],
            taps: Vec::new(),
            dropped_tap_blocks: 0,
            faulted_tones: 0,
        }
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn frames_per_period(&self) -> usize {
        self.period
    }

    /// Number of tones in the render-side table (after the last drain).
    #[inline]
    pub fn tone_count(&self) -> usize {
        self.tones.len()
    }

    /// Parameters the render side currently uses for `id`.
    pub fn tone(&self, id: ToneId) -> Option<ToneParams> {
        self.tones.iter().find(|t| t.id == id).map(|t| t.params)
    }

    #[inline]
    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Blocks a tap could not take because its consumer fell behind.
    #[inline]
    pub fn dropped_tap_blocks(&self) -> u64 {
        self.dropped_tap_blocks
    }

    /// Tone-periods excluded from the mix because they produced non-finite samples.
    #[inline]
    pub fn faulted_tones(&self) -> u64 {
        self.faulted_tones
    }

    /// Register a buffer handoff and return its consumer.
    ///
    /// After every rendered chunk the interleaved stereo samples are pushed to
    /// each tap. A tap without room for a whole chunk skips it; the render path
    /// never waits on a consumer. `capacity` is in samples (frames × 2).
    ///
    /// Call this before handing the mixer to the audio thread.
    pub fn tap(&mut self, capacity: usize) -> Consumer<f32> {
        let (producer, consumer) = RingBuffer::new(capacity.max(self.period * CHANNELS));
        self.taps.push(producer);
        consumer
    }

    /// Apply every pending control command.
    pub fn apply_pending(&mut self) {
        while let Ok(command) = self.commands.pop() {
            self.apply(command);
        }
    }

    fn apply(&mut self, command: ToneCommand) {
        match command {
            ToneCommand::Add { id, params } => {
                // The controller enforces the limit; this only guards capacity.
                if self.tones.len() < self.max_tones {
                    self.tones.push(ToneState::new(id, params));
                }
            }
            ToneCommand::Remove(id) => {
                if let Some(index) = self.tones.iter().position(|t| t.id == id) {
                    self.tones.remove(index);
                }
            }
            ToneCommand::Update { id, update } => {
                if let Some(tone) = self.tones.iter_mut().find(|t| t.id == id) {
                    tone.update(&update);
                }
            }
            ToneCommand::Clear => self.tones.clear(),
            ToneCommand::SetMasterVolume(gain) => {
                self.master_volume = gain.clamp(0.0, MAX_MASTER_VOLUME);
            }
        }
    }

    /// Render into an interleaved stereo slice of any length.
    ///
    /// Pending commands are applied first. The slice is then filled in chunks
    /// of at most one period; each chunk is soft-limited on its own. A trailing
    /// odd sample is zeroed.
    pub fn render_into(&mut self, out: &mut [f32]) {
        self.apply_pending();

        let chunk_len = self.period * CHANNELS;
        for chunk in out.chunks_mut(chunk_len) {
            self.render_chunk(chunk);
            self.push_taps(chunk);
        }
    }

    /// Render `frame_count` frames into a new buffer.
    ///
    /// Allocates the returned buffer; use [`render_into`](Self::render_into) on
    /// the real-time thread.
    pub fn render(&mut self, frame_count: usize) -> StereoBuffer {
        let mut buffer = StereoBuffer::silence(frame_count);
        self.render_into(buffer.as_interleaved_mut());
        buffer
    }

    fn render_chunk(&mut self, chunk: &mut [f32]) {
        let frames = chunk.len() / CHANNELS;
        let mono = &mut self.mono[..frames];
        let left = &mut self.left[..frames];
        let right = &mut self.right[..frames];
        left.fill(0.0);
        right.fill(0.0);

        for tone in self.tones.iter_mut() {
            let params = tone.params;
            if !params.is_audible() {
                continue;
            }
            if !params.is_finite() {
                self.faulted_tones += 1;
                continue;
            }

            generate(
                params.waveform,
                params.frequency,
                params.volume.clamp(0.0, 1.0),
                self.sample_rate,
                mono,
                &mut tone.synth,
            );

            if !mono.iter().all(|s| s.is_finite()) {
                // Drop this tone for the period and start it clean next time.
                tone.synth.reset();
                self.faulted_tones += 1;
                continue;
            }

            let (left_gain, right_gain) = pan_gains(params.pan);
            for (&m, l, r) in izip!(mono.iter(), left.iter_mut(), right.iter_mut()) {
                *l += m * left_gain;
                *r += m * right_gain;
            }
        }

        if self.master_volume != 1.0 {
            let gain = self.master_volume;
            for sample in left.iter_mut().chain(right.iter_mut()) {
                *sample *= gain;
            }
        }

        soft_limit(left, right, self.ceiling);

        for (frame, &l, &r) in izip!(chunk.chunks_exact_mut(CHANNELS), left.iter(), right.iter()) {
            frame[0] = l;
            frame[1] = r;
        }
        if chunk.len() % CHANNELS != 0 {
            if let Some(last) = chunk.last_mut() {
                *last = 0.0;
            }
        }
    }

    fn push_taps(&mut self, chunk: &[f32]) {
        // Whole frames only, so consumers never lose their L/R alignment.
        let chunk = &chunk[..chunk.len() - chunk.len() % CHANNELS];
        if chunk.is_empty() {
            return;
        }
        for tap in self.taps.iter_mut() {
            if tap.slots() < chunk.len() {
                self.dropped_tap_blocks += 1;
                continue;
            }
            for &sample in chunk {
                // Room was checked above.
                let _ = tap.push(sample);
            }
        }
    }
}
