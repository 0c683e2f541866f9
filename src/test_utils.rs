//! Mock backend and decoder shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;

use crate::backend::{AudioBackend, BufferHandle, PlayState, SourceHandle, SourceParams};
use crate::decoder::{Decoder, DecoderFactory};
use crate::error::{OutputError, Result};
use crate::pool::SourcePool;
use crate::types::{AudioFormat, ChannelConfig, SampleType};

pub fn mono8(sample_rate: u32) -> AudioFormat {
    AudioFormat {
        sample_rate,
        channels: ChannelConfig::Mono,
        sample_type: SampleType::Uint8,
    }
}

pub fn stereo16(sample_rate: u32) -> AudioFormat {
    AudioFormat {
        sample_rate,
        channels: ChannelConfig::Stereo,
        sample_type: SampleType::Int16,
    }
}

/// Backend with `n` sources pre-allocated into a pool, ready for voice
/// construction.
pub fn rig(n: usize) -> (Arc<Mutex<MockBackend>>, Arc<Mutex<SourcePool>>) {
    let mut backend = MockBackend::new(n);
    backend.open_device("").unwrap();
    backend.create_context().unwrap();
    let sources = (0..n).map(|_| backend.gen_source().unwrap()).collect();
    (
        Arc::new(Mutex::new(backend)),
        Arc::new(Mutex::new(SourcePool::new(sources))),
    )
}

pub struct MockSource {
    pub state: PlayState,
    pub params: Option<SourceParams>,
    pub position: Option<[f32; 3]>,
    pub attached: Option<BufferHandle>,
    /// Queued buffers the simulated hardware has not consumed yet.
    pub queue: VecDeque<BufferHandle>,
    /// Consumed buffers awaiting unqueue.
    pub done: VecDeque<BufferHandle>,
}

impl MockSource {
    fn new() -> Self {
        Self {
            state: PlayState::Initial,
            params: None,
            position: None,
            attached: None,
            queue: VecDeque::new(),
            done: VecDeque::new(),
        }
    }
}

/// In-memory stand-in for the hardware driver.
pub struct MockBackend {
    pub device_open: bool,
    pub context: bool,
    pub max_voices: usize,
    /// `gen_source` fails once this many sources exist.
    pub source_limit: usize,
    /// `gen_buffer` fails once this many buffers exist.
    pub buffer_limit: usize,
    pub fail_open: bool,
    pub fail_buffer_data: bool,
    pub sources: HashMap<SourceHandle, MockSource>,
    /// Byte length of the last upload, per live buffer.
    pub buffers: HashMap<BufferHandle, usize>,
    pub listener: Option<([f32; 3], [f32; 3], [f32; 3])>,
    next_id: u64,
}

impl MockBackend {
    pub fn new(max_voices: usize) -> Self {
        Self {
            device_open: false,
            context: false,
            max_voices,
            source_limit: usize::MAX,
            buffer_limit: usize::MAX,
            fail_open: false,
            fail_buffer_data: false,
            sources: HashMap::new(),
            buffers: HashMap::new(),
            listener: None,
            next_id: 1,
        }
    }

    /// Simulate the hardware consuming `n` queued buffers. The source stops
    /// by itself once its queue runs dry.
    pub fn finish_buffers(&mut self, source: SourceHandle, n: usize) {
        let src = self.sources.get_mut(&source).unwrap();
        for _ in 0..n {
            match src.queue.pop_front() {
                Some(buffer) => src.done.push_back(buffer),
                None => break,
            }
        }
        if src.queue.is_empty() && src.state == PlayState::Playing {
            src.state = PlayState::Stopped;
        }
    }

    /// Simulate an underrun: the hardware stops with buffers still queued.
    pub fn force_stop(&mut self, source: SourceHandle) {
        self.sources.get_mut(&source).unwrap().state = PlayState::Stopped;
    }

    fn source_ref(&self, source: SourceHandle) -> Result<&MockSource> {
        self.sources
            .get(&source)
            .ok_or_else(|| OutputError::Backend(format!("unknown source {source:?}")))
    }

    fn source_mut(&mut self, source: SourceHandle) -> Result<&mut MockSource> {
        self.sources
            .get_mut(&source)
            .ok_or_else(|| OutputError::Backend(format!("unknown source {source:?}")))
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl AudioBackend for MockBackend {
    fn open_device(&mut self, _device_name: &str) -> Result<()> {
        if self.fail_open {
            return Err(OutputError::Backend("no such device".into()));
        }
        self.device_open = true;
        Ok(())
    }

    fn create_context(&mut self) -> Result<()> {
        if !self.device_open {
            return Err(OutputError::Backend("device not open".into()));
        }
        self.context = true;
        Ok(())
    }

    fn close_device(&mut self) {
        self.device_open = false;
        self.context = false;
    }

    fn max_voices(&self) -> usize {
        self.max_voices
    }

    fn gen_source(&mut self) -> Result<SourceHandle> {
        if self.sources.len() >= self.source_limit {
            return Err(OutputError::Backend("source allocation failed".into()));
        }
        let handle = SourceHandle(self.next_id());
        self.sources.insert(handle, MockSource::new());
        Ok(handle)
    }

    fn delete_source(&mut self, source: SourceHandle) -> Result<()> {
        self.sources
            .remove(&source)
            .map(|_| ())
            .ok_or_else(|| OutputError::Backend(format!("unknown source {source:?}")))
    }

    fn gen_buffer(&mut self) -> Result<BufferHandle> {
        if self.buffers.len() >= self.buffer_limit {
            return Err(OutputError::Backend("buffer allocation failed".into()));
        }
        let handle = BufferHandle(self.next_id());
        self.buffers.insert(handle, 0);
        Ok(handle)
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) -> Result<()> {
        self.buffers
            .remove(&buffer)
            .map(|_| ())
            .ok_or_else(|| OutputError::Backend(format!("unknown buffer {buffer:?}")))
    }

    fn buffer_data(
        &mut self,
        buffer: BufferHandle,
        _format: AudioFormat,
        data: &[u8],
    ) -> Result<()> {
        if self.fail_buffer_data {
            return Err(OutputError::Backend("buffer upload failed".into()));
        }
        match self.buffers.get_mut(&buffer) {
            Some(len) => {
                *len = data.len();
                Ok(())
            }
            None => Err(OutputError::Backend(format!("unknown buffer {buffer:?}"))),
        }
    }

    fn set_source_params(&mut self, source: SourceHandle, params: &SourceParams) -> Result<()> {
        let src = self.source_mut(source)?;
        src.params = Some(*params);
        src.position = Some(params.position);
        Ok(())
    }

    fn set_source_position(&mut self, source: SourceHandle, position: [f32; 3]) -> Result<()> {
        self.source_mut(source)?.position = Some(position);
        Ok(())
    }

    fn set_source_buffer(
        &mut self,
        source: SourceHandle,
        buffer: Option<BufferHandle>,
    ) -> Result<()> {
        let src = self.source_mut(source)?;
        src.attached = buffer;
        if buffer.is_none() {
            src.queue.clear();
            src.done.clear();
        }
        Ok(())
    }

    fn queue_buffers(&mut self, source: SourceHandle, buffers: &[BufferHandle]) -> Result<()> {
        self.source_mut(source)?
            .queue
            .extend(buffers.iter().copied());
        Ok(())
    }

    fn unqueue_buffer(&mut self, source: SourceHandle) -> Result<BufferHandle> {
        self.source_mut(source)?
            .done
            .pop_front()
            .ok_or_else(|| OutputError::Backend("no processed buffers".into()))
    }

    fn buffers_processed(&self, source: SourceHandle) -> Result<usize> {
        Ok(self.source_ref(source)?.done.len())
    }

    fn buffers_queued(&self, source: SourceHandle) -> Result<usize> {
        Ok(self.source_ref(source)?.queue.len())
    }

    fn play(&mut self, source: SourceHandle) -> Result<()> {
        self.source_mut(source)?.state = PlayState::Playing;
        Ok(())
    }

    fn stop(&mut self, source: SourceHandle) -> Result<()> {
        self.source_mut(source)?.state = PlayState::Stopped;
        Ok(())
    }

    fn source_state(&self, source: SourceHandle) -> Result<PlayState> {
        Ok(self.source_ref(source)?.state)
    }

    fn set_listener(&mut self, position: [f32; 3], at: [f32; 3], up: [f32; 3]) -> Result<()> {
        self.listener = Some((position, at, up));
        Ok(())
    }
}

#[derive(Default)]
pub struct DecoderLog {
    pub opened: Option<String>,
    pub reads: usize,
    pub rewinds: usize,
    pub closed: bool,
}

/// Decoder yielding a fixed (or unbounded) number of PCM bytes.
pub struct MockDecoder {
    format: AudioFormat,
    total: Option<usize>,
    remaining: usize,
    fail_open: bool,
    log: Arc<Mutex<DecoderLog>>,
}

impl MockDecoder {
    pub fn endless(format: AudioFormat) -> Self {
        Self {
            format,
            total: None,
            remaining: 0,
            fail_open: false,
            log: Arc::default(),
        }
    }

    pub fn with_bytes(format: AudioFormat, total: usize) -> Self {
        Self {
            format,
            total: Some(total),
            remaining: total,
            fail_open: false,
            log: Arc::default(),
        }
    }

    pub fn log_handle(&self) -> Arc<Mutex<DecoderLog>> {
        Arc::clone(&self.log)
    }
}

impl Decoder for MockDecoder {
    fn open(&mut self, name: &str) -> anyhow::Result<()> {
        if self.fail_open {
            return Err(anyhow!("cannot open {name}"));
        }
        self.log.lock().unwrap().opened = Some(name.to_string());
        Ok(())
    }

    fn format(&self) -> anyhow::Result<AudioFormat> {
        Ok(self.format)
    }

    fn read(&mut self, out: &mut [u8]) -> anyhow::Result<usize> {
        self.log.lock().unwrap().reads += 1;
        match self.total {
            None => {
                out.fill(0x40);
                Ok(out.len())
            }
            Some(_) => {
                let n = out.len().min(self.remaining);
                self.remaining -= n;
                out[..n].fill(0x40);
                Ok(n)
            }
        }
    }

    fn rewind(&mut self) -> anyhow::Result<()> {
        self.log.lock().unwrap().rewinds += 1;
        if let Some(total) = self.total {
            self.remaining = total;
        }
        Ok(())
    }

    fn close(&mut self) {
        self.log.lock().unwrap().closed = true;
    }
}

/// Factory producing identically-configured mock decoders.
pub struct MockDecoderFactory {
    format: AudioFormat,
    total: Option<usize>,
    fail_open: bool,
}

impl MockDecoderFactory {
    pub fn endless(format: AudioFormat) -> Self {
        Self {
            format,
            total: None,
            fail_open: false,
        }
    }

    pub fn with_bytes(format: AudioFormat, total: usize) -> Self {
        Self {
            format,
            total: Some(total),
            fail_open: false,
        }
    }

    pub fn failing_open(format: AudioFormat) -> Self {
        Self {
            format,
            total: Some(0),
            fail_open: true,
        }
    }
}

impl DecoderFactory for MockDecoderFactory {
    fn create_decoder(&self) -> Box<dyn Decoder + Send> {
        let mut decoder = match self.total {
            Some(total) => MockDecoder::with_bytes(self.format, total),
            None => MockDecoder::endless(self.format),
        };
        decoder.fail_open = self.fail_open;
        Box::new(decoder)
    }
}
