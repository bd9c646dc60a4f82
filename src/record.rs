//! Raw PCM capture of the rendered mix.
//!
//! [`PcmRecorder`] reads the same buffer handoff the visualizer uses and writes
//! interleaved little-endian `f32` stereo frames, headerless, to any writer.

use std::io::Write;

use rtrb::Consumer;
use tracing::debug;

use crate::error::Result;
use crate::mixer::CHANNELS;

pub struct PcmRecorder<W: Write> {
    consumer: Consumer<f32>,
    writer: W,
    samples_written: u64,
}

impl<W: Write> PcmRecorder<W> {
    /// `consumer` must come from [`Mixer::tap`](crate::Mixer::tap).
    pub fn new(consumer: Consumer<f32>, writer: W) -> Self {
        Self {
            consumer,
            writer,
            samples_written: 0,
        }
    }

    /// Write everything currently available. Returns the number of whole
    /// frames written by this call.
    ///
    /// Call it regularly from a non-audio thread; whatever the tap can't hold
    /// in the meantime is lost.
    pub fn drain(&mut self) -> Result<usize> {
        let available = self.consumer.slots();
        if available == 0 {
            return Ok(0);
        }

        let before = self.frames_written();
        if let Ok(chunk) = self.consumer.read_chunk(available) {
            let (first, second) = chunk.as_slices();
            let mut written = 0;
            let mut failure = None;
            for &sample in first.iter().chain(second.iter()) {
                if let Err(err) = self.writer.write_all(&sample.to_le_bytes()) {
                    failure = Some(err);
                    break;
                }
                written += 1;
            }
            // Samples that reached the writer are consumed even on failure,
            // so a retry picks up where this call stopped.
            chunk.commit(written);
            self.samples_written += written as u64;
            if let Some(err) = failure {
                return Err(err.into());
            }
        }
        Ok((self.frames_written() - before) as usize)
    }

    /// Whole stereo frames written so far.
    pub fn frames_written(&self) -> u64 {
        self.samples_written / CHANNELS as u64
    }

    /// Drain what is left, flush, and hand back the writer.
    pub fn finish(mut self) -> Result<W> {
        self.drain()?;
        self.writer.flush()?;
        debug!(frames = self.frames_written(), "pcm capture finished");
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtrb::RingBuffer;

    #[test]
    fn writes_little_endian_f32() {
        let (mut tx, rx) = RingBuffer::new(8);
        tx.push(0.5f32).unwrap();
        tx.push(-1.0f32).unwrap();

        let mut recorder = PcmRecorder::new(rx, Vec::new());
        assert_eq!(recorder.drain().unwrap(), 1);
        let bytes = recorder.finish().unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(&0.5f32.to_le_bytes());
        expected.extend_from_slice(&(-1.0f32).to_le_bytes());
        assert_eq!(bytes, expected);
    }

    /// Accepts writes until `fail_at`, which fails once.
    struct FlakyWriter {
        bytes: Vec<u8>,
        writes: usize,
        fail_at: usize,
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.writes += 1;
            if self.writes == self.fail_at {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
            }
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_is_resumed_without_duplicates() {
        let (mut tx, rx) = RingBuffer::new(8);
        for sample in [1.0f32, 2.0, 3.0, 4.0] {
            tx.push(sample).unwrap();
        }
        let writer = FlakyWriter {
            bytes: Vec::new(),
            writes: 0,
            fail_at: 3,
        };

        let mut recorder = PcmRecorder::new(rx, writer);
        assert!(recorder.drain().is_err());
        assert_eq!(recorder.frames_written(), 1);
        assert_eq!(recorder.drain().unwrap(), 1);
        let bytes = recorder.finish().unwrap().bytes;

        let decoded: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        assert_eq!(decoded, [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn empty_tap_writes_nothing() {
        let (_tx, rx) = RingBuffer::<f32>::new(8);
        let mut recorder = PcmRecorder::new(rx, Vec::new());
        assert_eq!(recorder.drain().unwrap(), 0);
        assert!(recorder.finish().unwrap().is_empty());
    }
}
