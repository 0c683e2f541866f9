use crate::error::Result;
use crate::types::Vec3;

/// Common control surface shared by one-shot and streaming voices.
///
/// Variant-specific behavior (pre-decoded buffer vs. refreshed ring) lives on
/// the concrete types; the refresher only ever depends on the streaming side.
pub trait Voice {
    /// Halt playback.
    fn stop(&mut self) -> Result<()>;

    /// Whether the voice is audible or still has pending audio.
    fn is_playing(&self) -> Result<bool>;

    /// Move the voice. The position is given in engine space and transformed
    /// at the backend boundary.
    fn update(&mut self, position: Vec3) -> Result<()>;
}
