use thiserror::Error;

use crate::types::{ChannelConfig, SampleType};

/// Errors surfaced by the audio output layer.
///
/// Construction-time failures never leak resources: any source or buffer
/// acquired before the failure is returned before the error propagates.
/// A [`OutputError::Backend`] fault leaves only the affected voice in an
/// undefined state, never the device or other voices.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("audio device already open")]
    AlreadyOpen,

    #[error("failed to open audio device \"{0}\"")]
    DeviceOpenFailed(String),

    #[error("failed to set up audio context: {0}")]
    ContextSetupFailed(String),

    #[error("could not allocate any hardware sources")]
    NoSourcesAvailable,

    #[error("no free hardware source available")]
    ResourceExhausted,

    #[error("unsupported sound format ({0:?}, {1:?})")]
    UnsupportedFormat(ChannelConfig, SampleType),

    #[error("audio backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Decoder(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, OutputError>;
