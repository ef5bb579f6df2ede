//! Voice-source boundary
//!
//! The voice gateway itself (signaling, encryption, RTP) is out of scope;
//! the session layer only needs a connection that reports when
//! participants start and stop speaking and hands out their raw encoded
//! audio frames. Gateway adapters implement `VoiceSource` /
//! `VoiceConnection`; the in-process `LoopbackVoiceSource` serves
//! integration tests and local development.

pub mod loopback;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

pub use loopback::{LoopbackHandle, LoopbackVoiceSource};

/// Identifier of a call participant, as assigned by the voice gateway.
pub type ParticipantId = u64;

/// Speaking-start/end signals emitted by a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerEvent {
    SpeakingStarted { participant: ParticipantId },
    SpeakingEnded { participant: ParticipantId },
}

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("failed to join voice target {target}: {reason}")]
    Join { target: String, reason: String },
}

/// Entry point into a voice gateway.
#[async_trait]
pub trait VoiceSource: Send + Sync {
    /// Acquire a live connection to the given target channel.
    async fn join(&self, target: &str) -> Result<Box<dyn VoiceConnection>, VoiceError>;
}

/// A live voice connection.
pub trait VoiceConnection: Send + Sync {
    /// Take the speaker event stream. Yields `Some` on the first call
    /// only, so event wiring cannot be attached twice to one connection.
    fn take_events(&mut self) -> Option<mpsc::Receiver<SpeakerEvent>>;

    /// Subscribe to a participant's raw encoded audio frames.
    fn subscribe(&self, participant: ParticipantId) -> mpsc::Receiver<Vec<u8>>;

    /// Tear down the connection. Frame subscriptions and the event
    /// stream close after this returns.
    fn destroy(&mut self);
}
