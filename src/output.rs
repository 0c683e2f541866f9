use std::sync::{Arc, Mutex};

use crate::backend::{AudioBackend, SourceHandle, SourceParams};
use crate::decoder::{Decoder, DecoderFactory};
use crate::error::{OutputError, Result};
use crate::oneshot::OneShotSound;
use crate::pool::SourcePool;
use crate::refresher::StreamRefresher;
use crate::stream::{StreamInner, StreamSound};
use crate::types::Vec3;

/// Implementation ceiling on pooled sources, regardless of what the hardware
/// reports.
pub const MAX_SOURCES: usize = 256;

/// Top-level facade over the hardware device.
///
/// Owns the source pool and the background stream refresher; hands out
/// [`OneShotSound`] and [`StreamSound`] voices that return their source to
/// the pool when destroyed.
pub struct OutputDevice<B: AudioBackend + Send + 'static> {
    backend: Arc<Mutex<B>>,
    pool: Arc<Mutex<SourcePool>>,
    refresher: StreamRefresher<B>,
    decoders: Box<dyn DecoderFactory>,
    open: bool,
}

impl<B: AudioBackend + Send + 'static> OutputDevice<B> {
    /// Create the device facade. The refresher cadence starts immediately;
    /// the hardware stays closed until [`init`](Self::init).
    pub fn new(backend: B, decoders: impl DecoderFactory + 'static) -> Self {
        Self {
            backend: Arc::new(Mutex::new(backend)),
            pool: Arc::new(Mutex::new(SourcePool::empty())),
            refresher: StreamRefresher::new(),
            decoders: Box::new(decoders),
            open: false,
        }
    }

    /// Open the hardware device and fill the source pool, up to
    /// `min(hardware max, MAX_SOURCES)` voices. An empty `device_name`
    /// selects the platform default.
    pub fn init(&mut self, device_name: &str) -> Result<()> {
        if self.open {
            return Err(OutputError::AlreadyOpen);
        }

        let mut be = self.backend.lock().unwrap();
        be.open_device(device_name)
            .map_err(|_| OutputError::DeviceOpenFailed(device_name.to_string()))?;
        if let Err(e) = be.create_context() {
            be.close_device();
            return Err(OutputError::ContextSetupFailed(e.to_string()));
        }

        let limit = be.max_voices().min(MAX_SOURCES);
        let mut sources = Vec::with_capacity(limit);
        for _ in 0..limit {
            match be.gen_source() {
                Ok(source) => sources.push(source),
                Err(_) => break,
            }
        }
        if sources.is_empty() {
            be.close_device();
            return Err(OutputError::NoSourcesAvailable);
        }

        log::info!(
            "opened audio device \"{}\" with {} voices",
            if device_name.is_empty() {
                "default"
            } else {
                device_name
            },
            sources.len()
        );
        drop(be);

        *self.pool.lock().unwrap() = SourcePool::new(sources);
        self.open = true;
        Ok(())
    }

    /// Tear the device down. Safe to call on an already-closed device.
    ///
    /// Voices still held by the caller keep their sources; only pooled ones
    /// are deleted here.
    pub fn deinit(&mut self) {
        if !self.open {
            return;
        }

        self.refresher.remove_all();

        let sources = self.pool.lock().unwrap().drain();
        let mut be = self.backend.lock().unwrap();
        for source in sources {
            if let Err(e) = be.delete_source(source) {
                log::warn!("failed to delete pooled source: {e}");
            }
        }
        be.close_device();
        drop(be);

        self.open = false;
        log::debug!("audio device closed");
    }

    /// Play a non-positional sound, relative to the listener and without
    /// distance attenuation.
    pub fn play_sound(
        &mut self,
        name: &str,
        volume: f32,
        pitch: f32,
        looping: bool,
    ) -> Result<OneShotSound<B>> {
        self.play_oneshot(name, Self::flat_params(volume, pitch, looping))
    }

    /// Play a positional sound with linear clamped attenuation between
    /// `min_distance` (no attenuation) and `max_distance` (full attenuation).
    pub fn play_sound_3d(
        &mut self,
        name: &str,
        position: Vec3,
        volume: f32,
        pitch: f32,
        min_distance: f32,
        max_distance: f32,
        looping: bool,
    ) -> Result<OneShotSound<B>> {
        self.play_oneshot(
            name,
            Self::spatial_params(position, volume, pitch, min_distance, max_distance, looping),
        )
    }

    /// Stream a non-positional sound. Streams end when the decoder is
    /// exhausted; looping is not supported.
    pub fn stream_sound(&mut self, name: &str, volume: f32, pitch: f32) -> Result<StreamSound<B>> {
        self.open_stream(name, Self::flat_params(volume, pitch, false))
    }

    /// Stream a positional sound.
    pub fn stream_sound_3d(
        &mut self,
        name: &str,
        position: Vec3,
        volume: f32,
        pitch: f32,
        min_distance: f32,
        max_distance: f32,
    ) -> Result<StreamSound<B>> {
        self.open_stream(
            name,
            Self::spatial_params(position, volume, pitch, min_distance, max_distance, false),
        )
    }

    /// Update the listener pose. Affects positional voices on their next
    /// hardware query, not retroactively.
    pub fn update_listener(&mut self, position: Vec3, forward: Vec3, up: Vec3) -> Result<()> {
        self.backend.lock().unwrap().set_listener(
            position.to_device(),
            forward.to_device(),
            up.to_device(),
        )
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn free_voices(&self) -> usize {
        self.pool.lock().unwrap().free_count()
    }

    pub fn voice_capacity(&self) -> usize {
        self.pool.lock().unwrap().capacity()
    }

    /// Shared handle to the backend, for host integration and inspection.
    pub fn backend(&self) -> Arc<Mutex<B>> {
        Arc::clone(&self.backend)
    }

    fn flat_params(volume: f32, pitch: f32, looping: bool) -> SourceParams {
        SourceParams {
            position: [0.0; 3],
            gain: volume,
            pitch,
            reference_distance: 1.0,
            max_distance: 1000.0,
            rolloff_factor: 0.0,
            relative: true,
            looping,
        }
    }

    fn spatial_params(
        position: Vec3,
        volume: f32,
        pitch: f32,
        min_distance: f32,
        max_distance: f32,
        looping: bool,
    ) -> SourceParams {
        SourceParams {
            position: position.to_device(),
            gain: volume,
            pitch,
            reference_distance: min_distance,
            max_distance,
            rolloff_factor: 1.0,
            relative: false,
            looping,
        }
    }

    fn take_source(&self) -> Result<SourceHandle> {
        self.pool.lock().unwrap().acquire()
    }

    fn open_decoder(&self, name: &str, source: SourceHandle) -> Result<Box<dyn Decoder + Send>> {
        let mut decoder = self.decoders.create_decoder();
        match decoder.open(name) {
            Ok(()) => Ok(decoder),
            Err(e) => {
                self.pool.lock().unwrap().release(source);
                Err(e.into())
            }
        }
    }

    fn play_oneshot(&mut self, name: &str, params: SourceParams) -> Result<OneShotSound<B>> {
        let source = self.take_source()?;
        let decoder = self.open_decoder(name, source)?;
        let sound = OneShotSound::load(
            Arc::clone(&self.backend),
            Arc::clone(&self.pool),
            source,
            decoder,
        )?;
        sound.start(&params)?;
        Ok(sound)
    }

    fn open_stream(&mut self, name: &str, params: SourceParams) -> Result<StreamSound<B>> {
        let source = self.take_source()?;
        let decoder = self.open_decoder(name, source)?;
        let inner = StreamInner::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.pool),
            source,
            decoder,
        )?;
        let inner = Arc::new(Mutex::new(inner));
        {
            let mut voice = inner.lock().unwrap();
            voice.set_params(&params)?;
            voice.play()?;
        }
        self.refresher.add(&inner);
        Ok(StreamSound::new(inner, self.refresher.registry()))
    }
}

impl<B: AudioBackend + Send + 'static> Drop for OutputDevice<B> {
    fn drop(&mut self) {
        self.refresher.shutdown();
        self.deinit();
    }
}
