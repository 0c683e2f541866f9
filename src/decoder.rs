use anyhow::Result;

use crate::types::AudioFormat;

/// Abstraction over the codec layer.
///
/// A decoder yields raw PCM bytes on demand. A `read` returning fewer bytes
/// than requested signals that the stream is nearly exhausted; a read
/// returning zero means it is.
pub trait Decoder: Send {
    /// Open the named resource for decoding.
    fn open(&mut self, name: &str) -> Result<()>;

    /// Sample rate, channel layout and sample representation of the decoded
    /// stream.
    fn format(&self) -> Result<AudioFormat>;

    /// Decode up to `out.len()` bytes into `out`, returning the byte count.
    fn read(&mut self, out: &mut [u8]) -> Result<usize>;

    /// Seek back to the start of the stream.
    fn rewind(&mut self) -> Result<()>;

    /// Release the underlying resource.
    fn close(&mut self);
}

/// Creates decoder instances for the output device.
///
/// The higher-level sound manager resolves asset records to a name before
/// calling into this layer; the factory supplies a fresh decoder for each
/// playback request.
pub trait DecoderFactory: Send {
    fn create_decoder(&self) -> Box<dyn Decoder + Send>;
}
