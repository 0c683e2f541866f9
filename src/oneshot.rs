use std::sync::{Arc, Mutex};

use crate::backend::{AudioBackend, BufferHandle, PlayState, SourceHandle, SourceParams};
use crate::decoder::Decoder;
use crate::error::Result;
use crate::pool::SourcePool;
use crate::types::Vec3;
use crate::voice::Voice;

/// Starting size of the decode accumulator; doubled as the sound grows.
const INITIAL_READ_SIZE: usize = 32768;

/// A fully pre-decoded sound bound to one hardware source and one buffer.
///
/// The whole stream is drained from the decoder before playback starts, so no
/// further buffer management is needed. Appropriate for short effects.
pub struct OneShotSound<B: AudioBackend> {
    backend: Arc<Mutex<B>>,
    pool: Arc<Mutex<SourcePool>>,
    source: SourceHandle,
    buffer: BufferHandle,
}

impl<B: AudioBackend> OneShotSound<B> {
    /// Drain `decoder` into a single hardware buffer and bind it to `source`.
    ///
    /// The source is already taken from the pool; on any failure it is
    /// returned (and a partially created buffer deleted) before the error
    /// propagates.
    pub(crate) fn load(
        backend: Arc<Mutex<B>>,
        pool: Arc<Mutex<SourcePool>>,
        source: SourceHandle,
        mut decoder: Box<dyn Decoder + Send>,
    ) -> Result<Self> {
        let loaded = Self::upload(&backend, decoder.as_mut());
        decoder.close();
        match loaded {
            Ok(buffer) => Ok(Self {
                backend,
                pool,
                source,
                buffer,
            }),
            Err(e) => {
                pool.lock().unwrap().release(source);
                Err(e)
            }
        }
    }

    fn upload(backend: &Arc<Mutex<B>>, decoder: &mut (dyn Decoder + Send)) -> Result<BufferHandle> {
        let format = decoder.format()?;

        let mut data = vec![0u8; INITIAL_READ_SIZE];
        let mut total = 0;
        loop {
            let got = decoder.read(&mut data[total..])?;
            if got == 0 {
                break;
            }
            total += got;
            data.resize(total * 2, 0);
        }
        data.truncate(total);

        let mut be = backend.lock().unwrap();
        let buffer = be.gen_buffer()?;
        if let Err(e) = be.buffer_data(buffer, format, &data) {
            let _ = be.delete_buffer(buffer);
            return Err(e);
        }
        Ok(buffer)
    }

    /// Submit playback parameters, attach the buffer and start the hardware.
    pub(crate) fn start(&self, params: &SourceParams) -> Result<()> {
        let mut be = self.backend.lock().unwrap();
        be.set_source_params(self.source, params)?;
        be.set_source_buffer(self.source, Some(self.buffer))?;
        be.play(self.source)
    }

    pub fn stop(&mut self) -> Result<()> {
        let mut be = self.backend.lock().unwrap();
        be.stop(self.source)?;
        be.set_source_buffer(self.source, None)
    }

    /// Reflects hardware state only.
    pub fn is_playing(&self) -> Result<bool> {
        let state = self.backend.lock().unwrap().source_state(self.source)?;
        Ok(state == PlayState::Playing)
    }

    /// Re-submit the voice position. Safe to call while playing or stopped.
    pub fn update(&mut self, position: Vec3) -> Result<()> {
        self.backend
            .lock()
            .unwrap()
            .set_source_position(self.source, position.to_device())
    }
}

impl<B: AudioBackend> Voice for OneShotSound<B> {
    fn stop(&mut self) -> Result<()> {
        OneShotSound::stop(self)
    }

    fn is_playing(&self) -> Result<bool> {
        OneShotSound::is_playing(self)
    }

    fn update(&mut self, position: Vec3) -> Result<()> {
        OneShotSound::update(self, position)
    }
}

impl<B: AudioBackend> Drop for OneShotSound<B> {
    fn drop(&mut self) {
        {
            let mut be = self.backend.lock().unwrap();
            let _ = be.stop(self.source);
            let _ = be.set_source_buffer(self.source, None);
            if let Err(e) = be.delete_buffer(self.buffer) {
                log::warn!("failed to delete one-shot buffer: {e}");
            }
        }
        self.pool.lock().unwrap().release(self.source);
    }
}
