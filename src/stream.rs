use std::sync::{Arc, Mutex};

use crate::backend::{AudioBackend, BufferHandle, PlayState, SourceHandle, SourceParams};
use crate::decoder::Decoder;
use crate::error::Result;
use crate::pool::SourcePool;
use crate::refresher::{StreamRef, StreamRegistry};
use crate::types::{AudioFormat, Vec3};
use crate::voice::Voice;

/// Buffers in a streaming voice's ring.
pub const STREAM_BUFFER_COUNT: usize = 6;
/// Playback time represented by one ring buffer.
pub const STREAM_BUFFER_SECONDS: f32 = 0.125;

/// State of one streaming voice, shared between the caller's handle and the
/// refresher's registry.
pub(crate) struct StreamInner<B: AudioBackend> {
    backend: Arc<Mutex<B>>,
    pool: Arc<Mutex<SourcePool>>,
    source: SourceHandle,
    buffers: Vec<BufferHandle>,
    decoder: Box<dyn Decoder + Send>,
    format: AudioFormat,
    buffer_size: usize,
    /// Set once the decoder has signalled end-of-stream; no decode call is
    /// ever issued after this.
    finished: bool,
    underruns: u64,
}

impl<B: AudioBackend> StreamInner<B> {
    /// Allocate the buffer ring for `source`. The source is already taken
    /// from the pool; on any failure every acquired resource is returned
    /// before the error propagates.
    pub(crate) fn new(
        backend: Arc<Mutex<B>>,
        pool: Arc<Mutex<SourcePool>>,
        source: SourceHandle,
        mut decoder: Box<dyn Decoder + Send>,
    ) -> Result<Self> {
        let format = match decoder.format() {
            Ok(format) => format,
            Err(e) => {
                decoder.close();
                pool.lock().unwrap().release(source);
                return Err(e.into());
            }
        };
        let frames = (STREAM_BUFFER_SECONDS * format.sample_rate as f32) as usize;
        let buffer_size = format.frames_to_bytes(frames);

        let mut buffers = Vec::with_capacity(STREAM_BUFFER_COUNT);
        let mut be = backend.lock().unwrap();
        for _ in 0..STREAM_BUFFER_COUNT {
            match be.gen_buffer() {
                Ok(buffer) => buffers.push(buffer),
                Err(e) => {
                    for &buffer in &buffers {
                        let _ = be.delete_buffer(buffer);
                    }
                    drop(be);
                    decoder.close();
                    pool.lock().unwrap().release(source);
                    return Err(e);
                }
            }
        }
        drop(be);

        Ok(Self {
            backend,
            pool,
            source,
            buffers,
            decoder,
            format,
            buffer_size,
            finished: true,
            underruns: 0,
        })
    }

    pub(crate) fn set_params(&mut self, params: &SourceParams) -> Result<()> {
        self.backend
            .lock()
            .unwrap()
            .set_source_params(self.source, params)
    }

    /// Prime the ring from the decoder and start the hardware.
    ///
    /// Only buffers that received data are queued: a decoder that is
    /// exhausted after K quanta leaves a ring of K. A short read marks the
    /// stream finished but playback continues until the queue drains.
    pub(crate) fn play(&mut self) -> Result<()> {
        {
            let mut be = self.backend.lock().unwrap();
            be.stop(self.source)?;
            be.set_source_buffer(self.source, None)?;
        }

        self.finished = false;
        let mut data = vec![0u8; self.buffer_size];
        let mut primed = Vec::with_capacity(self.buffers.len());
        for i in 0..self.buffers.len() {
            if self.finished {
                break;
            }
            let got = self.decoder.read(&mut data)?;
            if got < data.len() {
                self.finished = true;
            }
            if got > 0 {
                self.backend
                    .lock()
                    .unwrap()
                    .buffer_data(self.buffers[i], self.format, &data[..got])?;
                primed.push(self.buffers[i]);
            }
        }

        let mut be = self.backend.lock().unwrap();
        be.queue_buffers(self.source, &primed)?;
        be.play(self.source)
    }

    /// Refill consumed buffers; called from the refresher cadence.
    ///
    /// Returns whether the voice is still active. End-of-stream is detected
    /// strictly by a read returning fewer bytes than requested, so a final
    /// read of exactly one quantum is not mistaken for exhaustion.
    pub(crate) fn process(&mut self) -> Result<bool> {
        let (state, mut pending) = {
            let be = self.backend.lock().unwrap();
            (
                be.source_state(self.source)?,
                be.buffers_processed(self.source)?,
            )
        };

        if pending > 0 {
            let mut data = vec![0u8; self.buffer_size];
            while pending > 0 {
                let buffer = self.backend.lock().unwrap().unqueue_buffer(self.source)?;
                pending -= 1;

                if self.finished {
                    continue;
                }
                let got = self.decoder.read(&mut data)?;
                self.finished = got < data.len();
                if got > 0 {
                    let mut be = self.backend.lock().unwrap();
                    be.buffer_data(buffer, self.format, &data[..got])?;
                    be.queue_buffers(self.source, &[buffer])?;
                }
            }
        }

        if state != PlayState::Playing && state != PlayState::Paused {
            let mut be = self.backend.lock().unwrap();
            if be.buffers_queued(self.source)? > 0 {
                // The hardware ran dry before the cadence caught up. Restart
                // and keep count so lag is observable.
                self.underruns += 1;
                log::debug!(
                    "stream underrun on source {:?} (total {})",
                    self.source,
                    self.underruns
                );
                be.play(self.source)?;
            }
        }

        Ok(!self.finished)
    }

    /// Halt the hardware and rewind the decoder so the stream can replay.
    /// The caller has already deregistered this voice from the refresher.
    pub(crate) fn stop(&mut self) -> Result<()> {
        self.finished = true;
        {
            let mut be = self.backend.lock().unwrap();
            be.stop(self.source)?;
            be.set_source_buffer(self.source, None)?;
        }
        self.decoder.rewind()?;
        Ok(())
    }

    /// True while the hardware reports playback, or while the stream has not
    /// yet signalled end-of-stream (covers the gap between queueing the last
    /// buffer and the hardware picking it up).
    pub(crate) fn is_playing(&self) -> Result<bool> {
        let state = self.backend.lock().unwrap().source_state(self.source)?;
        Ok(state == PlayState::Playing || !self.finished)
    }

    pub(crate) fn update(&mut self, position: Vec3) -> Result<()> {
        self.backend
            .lock()
            .unwrap()
            .set_source_position(self.source, position.to_device())
    }

    pub(crate) fn underruns(&self) -> u64 {
        self.underruns
    }

    pub(crate) fn source_handle(&self) -> SourceHandle {
        self.source
    }
}

impl<B: AudioBackend> Drop for StreamInner<B> {
    fn drop(&mut self) {
        {
            let mut be = self.backend.lock().unwrap();
            let _ = be.stop(self.source);
            let _ = be.set_source_buffer(self.source, None);
            for &buffer in &self.buffers {
                if let Err(e) = be.delete_buffer(buffer) {
                    log::warn!("failed to delete stream buffer: {e}");
                }
            }
        }
        self.decoder.close();
        self.pool.lock().unwrap().release(self.source);
    }
}

/// Caller-side handle to a streaming voice.
///
/// The voice's buffer ring is topped up by the background refresher for as
/// long as the handle (or the registry) keeps it alive. Dropping the handle
/// deregisters the voice before any hardware state is torn down.
pub struct StreamSound<B: AudioBackend> {
    inner: StreamRef<B>,
    registry: StreamRegistry<B>,
}

impl<B: AudioBackend> StreamSound<B> {
    pub(crate) fn new(inner: StreamRef<B>, registry: StreamRegistry<B>) -> Self {
        Self { inner, registry }
    }

    /// Re-prime the ring and resume playback after a `stop`.
    pub fn play(&mut self) -> Result<()> {
        self.inner.lock().unwrap().play()?;
        self.registry.add(&self.inner);
        Ok(())
    }

    /// Deregister from the refresher, halt playback and rewind the decoder.
    pub fn stop(&mut self) -> Result<()> {
        // Deregistration must happen before buffers are touched so the
        // refresher can never observe a torn-down voice.
        self.registry.remove(&self.inner);
        self.inner.lock().unwrap().stop()
    }

    pub fn is_playing(&self) -> Result<bool> {
        self.inner.lock().unwrap().is_playing()
    }

    pub fn update(&mut self, position: Vec3) -> Result<()> {
        self.inner.lock().unwrap().update(position)
    }

    /// Number of times the refresher had to restart a starved source.
    pub fn underrun_count(&self) -> u64 {
        self.inner.lock().unwrap().underruns()
    }
}

impl<B: AudioBackend> Voice for StreamSound<B> {
    fn stop(&mut self) -> Result<()> {
        StreamSound::stop(self)
    }

    fn is_playing(&self) -> Result<bool> {
        StreamSound::is_playing(self)
    }

    fn update(&mut self, position: Vec3) -> Result<()> {
        StreamSound::update(self, position)
    }
}

impl<B: AudioBackend> Drop for StreamSound<B> {
    fn drop(&mut self) {
        self.registry.remove(&self.inner);
        // Dropping our Arc last tears the voice down via StreamInner::drop.
    }
}
