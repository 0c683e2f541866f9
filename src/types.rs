/// A point or direction in the engine's native coordinate space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Remap to the audio backend's axis convention.
    ///
    /// The engine's world axes map to the backend's as `(x, y, z) -> (x, z, -y)`.
    /// This is the single fixed permutation applied to every position,
    /// direction, and listener-orientation vector crossing the backend
    /// boundary.
    pub fn to_device(self) -> [f32; 3] {
        [self.x, self.z, -self.y]
    }
}

/// Channel layout of decoded audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelConfig {
    Mono,
    Stereo,
}

impl ChannelConfig {
    pub fn count(self) -> usize {
        match self {
            ChannelConfig::Mono => 1,
            ChannelConfig::Stereo => 2,
        }
    }
}

/// Sample representation of decoded audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    Uint8,
    Int16,
}

impl SampleType {
    pub fn bytes(self) -> usize {
        match self {
            SampleType::Uint8 => 1,
            SampleType::Int16 => 2,
        }
    }
}

/// Format of a decoded audio stream, reported once by the decoder at voice
/// construction and immutable for the voice's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: ChannelConfig,
    pub sample_type: SampleType,
}

impl AudioFormat {
    /// Size in bytes of one frame (one sample per channel).
    pub fn frame_size(&self) -> usize {
        self.channels.count() * self.sample_type.bytes()
    }

    pub fn frames_to_bytes(&self, frames: usize) -> usize {
        frames * self.frame_size()
    }
}
