//! Audio output engine multiplexing a fixed pool of hardware playback voices
//! across one-shot and streamed sounds.
//!
//! This crate provides:
//! - [`OutputDevice`]: Facade over the hardware device, source pool and
//!   background stream refresher
//! - [`OneShotSound`]: Fully pre-decoded fire-and-forget or positional playback
//! - [`StreamSound`]: Incrementally decoded playback over a ring of buffers,
//!   topped up by a background cadence
//! - [`SourcePool`]: Fixed free-list of hardware voices
//! - [`AudioBackend`] / [`Decoder`]: Seams for the hardware driver and the
//!   codec layer, both mockable for testing

pub mod backend;
pub mod decoder;
pub mod error;
mod oneshot;
mod output;
mod pool;
mod refresher;
mod stream;
pub mod types;
mod voice;

#[cfg(test)]
mod test_utils;

pub use backend::{AudioBackend, BufferHandle, PlayState, SourceHandle, SourceParams};
pub use decoder::{Decoder, DecoderFactory};
pub use error::{OutputError, Result};
pub use oneshot::OneShotSound;
pub use output::{MAX_SOURCES, OutputDevice};
pub use pool::SourcePool;
pub use stream::{STREAM_BUFFER_COUNT, STREAM_BUFFER_SECONDS, StreamSound};
pub use types::{AudioFormat, ChannelConfig, SampleType, Vec3};
pub use voice::Voice;
