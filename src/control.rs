//! Control surface → render path messaging.
//!
//! The control surface never touches the tone table the mixer renders from.
//! Every mutation is turned into a fixed-size [`ToneCommand`] and pushed onto a
//! lock-free SPSC queue; the [`Mixer`](crate::Mixer) drains the queue at the
//! start of each render call. A render therefore sees each command either
//! fully applied or not at all.
//!
//! [`ToneController`] keeps its own copy of every tone's parameters so it can
//! answer queries and enforce the tone limit without asking the audio thread.
//!
//! Nothing drains the queue while the mixer isn't rendering (a stopped or
//! closed port). Commands that don't fit wait in the controller's backlog,
//! where edits of the same tone collapse into one pending update, and go out
//! with the next call or an explicit [`ToneController::flush`].

use std::collections::VecDeque;

use hashbrown::HashMap;
use rtrb::{Consumer, Producer, RingBuffer};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::synth::Waveform;
use crate::tone::{ToneId, ToneParams, ToneUpdate};

/// Upper bound for the global output gain.
pub const MAX_MASTER_VOLUME: f32 = 2.0;

/// A single change to the tone table, applied atomically by the mixer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ToneCommand {
    Add { id: ToneId, params: ToneParams },
    Remove(ToneId),
    Update { id: ToneId, update: ToneUpdate },
    Clear,
    SetMasterVolume(f32),
}

impl ToneCommand {
    fn tone_id(&self) -> Option<ToneId> {
        match self {
            ToneCommand::Add { id, .. } | ToneCommand::Update { id, .. } => Some(*id),
            ToneCommand::Remove(id) => Some(*id),
            ToneCommand::Clear | ToneCommand::SetMasterVolume(_) => None,
        }
    }
}

/// Create a connected command queue pair.
///
/// Returns (producer for the control surface, consumer for the render path).
pub(crate) fn command_queue(capacity: usize) -> (Producer<ToneCommand>, Consumer<ToneCommand>) {
    RingBuffer::new(capacity.max(1))
}

/// The control surface's handle on the tone table.
///
/// All methods are synchronous and return quickly: they update the local
/// parameter mirror and enqueue one command. The change becomes audible at the
/// next render period. A full queue never makes a call fail; see
/// [`flush`](Self::flush).
pub struct ToneController {
    sender: Producer<ToneCommand>,
    /// Commands the queue had no room for, oldest first. Bounded by the tone
    /// limit plus the queue capacity, however long the mixer stays idle.
    backlog: VecDeque<ToneCommand>,
    tones: HashMap<ToneId, ToneParams>,
    next_id: u64,
    max_tones: usize,
    master_volume: f32,
}

impl ToneController {
    pub(crate) fn new(sender: Producer<ToneCommand>, config: &EngineConfig) -> Self {
        Self {
            sender,
            backlog: VecDeque::new(),
            tones: HashMap::with_capacity(config.max_tones),
            next_id: 1,
            max_tones: config.max_tones,
            master_volume: 1.0,
        }
    }

    fn send(&mut self, command: ToneCommand) {
        if self.flush() > 0 {
            self.hold(command);
            return;
        }
        if let Err(rtrb::PushError::Full(command)) = self.sender.push(command) {
            debug!("control queue full, holding commands until the mixer drains it");
            self.hold(command);
        }
    }

    /// Put `command` in the backlog, folding it into what is already waiting.
    fn hold(&mut self, command: ToneCommand) {
        match command {
            ToneCommand::Update { id, update } => {
                let last = self.backlog.iter().rposition(|c| c.tone_id() == Some(id));
                if let Some(index) = last {
                    match &mut self.backlog[index] {
                        ToneCommand::Update { update: pending, .. } => {
                            pending.merge(&update);
                            return;
                        }
                        ToneCommand::Add { params, .. } => {
                            params.apply(&update);
                            return;
                        }
                        _ => {}
                    }
                }
                self.backlog.push_back(command);
            }
            ToneCommand::Remove(id) => {
                let never_sent = self
                    .backlog
                    .iter()
                    .any(|c| matches!(c, ToneCommand::Add { id: added, .. } if *added == id));
                self.backlog.retain(|c| c.tone_id() != Some(id));
                if !never_sent {
                    self.backlog.push_back(command);
                }
            }
            ToneCommand::Clear => {
                self.backlog
                    .retain(|c| matches!(c, ToneCommand::SetMasterVolume(_)));
                self.backlog.push_back(command);
            }
            ToneCommand::SetMasterVolume(gain) => {
                let held = self
                    .backlog
                    .iter()
                    .position(|c| matches!(c, ToneCommand::SetMasterVolume(_)));
                match held {
                    Some(index) => self.backlog[index] = ToneCommand::SetMasterVolume(gain),
                    None => self.backlog.push_back(command),
                }
            }
            ToneCommand::Add { .. } => self.backlog.push_back(command),
        }
    }

    /// Move as much of the backlog onto the queue as fits.
    ///
    /// Returns the number of commands still waiting. Every control call
    /// flushes first, so this only needs calling directly when edits stop
    /// while a backlog remains.
    pub fn flush(&mut self) -> usize {
        while let Some(command) = self.backlog.pop_front() {
            if let Err(rtrb::PushError::Full(command)) = self.sender.push(command) {
                self.backlog.push_front(command);
                break;
            }
        }
        self.backlog.len()
    }

    /// Commands waiting for room in the queue.
    #[inline]
    pub fn pending(&self) -> usize {
        self.backlog.len()
    }

    /// Add a tone and return its new id.
    ///
    /// Parameters are clamped into their documented ranges first. Fails with
    /// [`Error::ToneLimit`] once `max_tones` tones exist.
    pub fn add_tone(&mut self, params: ToneParams) -> Result<ToneId> {
        if self.tones.len() >= self.max_tones {
            return Err(Error::ToneLimit {
                limit: self.max_tones,
            });
        }

        let id = ToneId(self.next_id);
        let params = params.sanitized();
        self.send(ToneCommand::Add { id, params });

        self.next_id += 1;
        self.tones.insert(id, params);
        debug!(%id, ?params, "tone added");
        Ok(id)
    }

    /// Remove a tone. Its render state is dropped once the mixer sees the command.
    pub fn remove_tone(&mut self, id: ToneId) -> Result<()> {
        if !self.tones.contains_key(&id) {
            return Err(Error::UnknownTone(id));
        }
        self.send(ToneCommand::Remove(id));
        self.tones.remove(&id);
        debug!(%id, "tone removed");
        Ok(())
    }

    /// Apply a partial update and return the resulting parameters.
    pub fn update_tone(&mut self, id: ToneId, update: ToneUpdate) -> Result<ToneParams> {
        let current = *self.tones.get(&id).ok_or(Error::UnknownTone(id))?;

        let mut next = current;
        next.apply(&update);
        let next = next.sanitized();

        // Ship the clamped values, not the raw request.
        let update = ToneUpdate {
            frequency: update.frequency.map(|_| next.frequency),
            volume: update.volume.map(|_| next.volume),
            pan: update.pan.map(|_| next.pan),
            ..update
        };
        if update.is_empty() {
            return Ok(current);
        }

        self.send(ToneCommand::Update { id, update });
        self.tones.insert(id, next);
        Ok(next)
    }

    pub fn set_active(&mut self, id: ToneId, active: bool) -> Result<()> {
        self.update_tone(id, ToneUpdate::default().active(active)).map(drop)
    }

    pub fn set_enabled(&mut self, id: ToneId, enabled: bool) -> Result<()> {
        self.update_tone(id, ToneUpdate::default().enabled(enabled)).map(drop)
    }

    pub fn set_frequency(&mut self, id: ToneId, frequency: f32) -> Result<()> {
        self.update_tone(id, ToneUpdate::default().frequency(frequency)).map(drop)
    }

    pub fn set_volume(&mut self, id: ToneId, volume: f32) -> Result<()> {
        self.update_tone(id, ToneUpdate::default().volume(volume)).map(drop)
    }

    pub fn set_pan(&mut self, id: ToneId, pan: f32) -> Result<()> {
        self.update_tone(id, ToneUpdate::default().pan(pan)).map(drop)
    }

    pub fn set_waveform(&mut self, id: ToneId, waveform: Waveform) -> Result<()> {
        self.update_tone(id, ToneUpdate::default().waveform(waveform)).map(drop)
    }

    /// Pause or resume every tone at once (transport play/pause).
    pub fn set_all_active(&mut self, active: bool) {
        let mut ids: Vec<ToneId> = self.tones.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            let update = ToneUpdate::default().active(active);
            if let Some(params) = self.tones.get_mut(&id) {
                params.apply(&update);
            }
            self.send(ToneCommand::Update { id, update });
        }
    }

    /// Remove every tone.
    pub fn clear_all(&mut self) {
        self.send(ToneCommand::Clear);
        debug!(count = self.tones.len(), "all tones cleared");
        self.tones.clear();
    }

    /// Set the global gain applied after mixing and before limiting, clamped
    /// to [0, `MAX_MASTER_VOLUME`].
    pub fn set_master_volume(&mut self, gain: f32) {
        let gain = if gain.is_finite() {
            gain.clamp(0.0, MAX_MASTER_VOLUME)
        } else {
            1.0
        };
        self.send(ToneCommand::SetMasterVolume(gain));
        self.master_volume = gain;
    }

    #[inline]
    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Current parameters of a tone.
    pub fn tone(&self, id: ToneId) -> Option<ToneParams> {
        self.tones.get(&id).copied()
    }

    /// All tones, ordered by id.
    pub fn tones(&self) -> Vec<(ToneId, ToneParams)> {
        let mut tones: Vec<_> = self.tones.iter().map(|(id, p)| (*id, *p)).collect();
        tones.sort_unstable_by_key(|(id, _)| *id);
        tones
    }

    pub fn contains(&self, id: ToneId) -> bool {
        self.tones.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.tones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tones.is_empty()
    }

    #[inline]
    pub fn max_tones(&self) -> usize {
        self.max_tones
    }

    /// Free command slots.
    #[inline]
    pub fn queue_slots(&self) -> usize {
        self.sender.slots()
    }
}
