use crate::error::Result;
use crate::types::AudioFormat;

/// Handle for one hardware playback voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceHandle(pub u64);

/// Handle for one hardware audio buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Hardware-reported playback state of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Initial,
    Playing,
    Paused,
    Stopped,
}

/// Spatial and gain parameters submitted to a source before playback.
///
/// Positions are already in the backend's coordinate space; the engine-side
/// transform happens before parameters cross this boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceParams {
    pub position: [f32; 3],
    pub gain: f32,
    pub pitch: f32,
    /// Distance below which no attenuation applies.
    pub reference_distance: f32,
    /// Distance beyond which attenuation is at full effect.
    pub max_distance: f32,
    /// 0.0 disables distance attenuation entirely, 1.0 applies the linear
    /// clamped model between reference and max distance.
    pub rolloff_factor: f32,
    /// Positions interpreted relative to the listener rather than in world
    /// space.
    pub relative: bool,
    pub looping: bool,
}

/// Abstraction over the hardware audio driver.
///
/// Implementations: a platform driver in the host application, `MockBackend`
/// (testing). Every call is expected to return promptly; faults are reported
/// immediately rather than deferred to a later query.
pub trait AudioBackend {
    fn open_device(&mut self, device_name: &str) -> Result<()>;
    fn create_context(&mut self) -> Result<()>;
    fn close_device(&mut self);

    /// Hardware-reported maximum number of concurrent voices.
    fn max_voices(&self) -> usize;

    fn gen_source(&mut self) -> Result<SourceHandle>;
    fn delete_source(&mut self, source: SourceHandle) -> Result<()>;

    fn gen_buffer(&mut self) -> Result<BufferHandle>;
    fn delete_buffer(&mut self, buffer: BufferHandle) -> Result<()>;

    /// Upload PCM bytes into a buffer.
    fn buffer_data(&mut self, buffer: BufferHandle, format: AudioFormat, data: &[u8])
    -> Result<()>;

    fn set_source_params(&mut self, source: SourceHandle, params: &SourceParams) -> Result<()>;
    fn set_source_position(&mut self, source: SourceHandle, position: [f32; 3]) -> Result<()>;

    /// Attach a single buffer to a source, or detach with `None`.
    /// Detaching also clears any queued buffers.
    fn set_source_buffer(&mut self, source: SourceHandle, buffer: Option<BufferHandle>)
    -> Result<()>;

    fn queue_buffers(&mut self, source: SourceHandle, buffers: &[BufferHandle]) -> Result<()>;
    fn unqueue_buffer(&mut self, source: SourceHandle) -> Result<BufferHandle>;

    /// Number of queued buffers the hardware has finished consuming.
    fn buffers_processed(&self, source: SourceHandle) -> Result<usize>;
    /// Number of buffers queued and not yet consumed.
    fn buffers_queued(&self, source: SourceHandle) -> Result<usize>;

    fn play(&mut self, source: SourceHandle) -> Result<()>;
    fn stop(&mut self, source: SourceHandle) -> Result<()>;
    fn source_state(&self, source: SourceHandle) -> Result<PlayState>;

    /// Update the listener pose. All vectors are in the backend's coordinate
    /// space.
    fn set_listener(&mut self, position: [f32; 3], at: [f32; 3], up: [f32; 3]) -> Result<()>;
}
