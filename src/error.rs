use crate::voice::VoiceError;
use thiserror::Error;

/// Caller-facing session errors. These are recoverable state errors:
/// they are reported as-is to the command layer and never abort the
/// session or the process.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("already connected to a voice channel")]
    AlreadyConnected,

    #[error("not connected to a voice channel")]
    NotConnected,

    #[error("already recording")]
    AlreadyRecording,

    #[error("not currently recording")]
    NotRecording,

    #[error("no archived segment matches the request")]
    SegmentNotFound,

    #[error("voice connection failed: {0}")]
    Connection(#[from] VoiceError),

    #[error("failed to create capture file: {0}")]
    CaptureFile(#[from] std::io::Error),
}
