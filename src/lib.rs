pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod transcribe;
pub mod voice;

pub use audio::{
    AudioDecoder, AudioTransformer, DecoderFactory, PassthroughDecoder, PassthroughFactory,
    WavTransformer,
};
pub use config::Config;
pub use error::SessionError;
pub use http::{create_router, AppState};
pub use session::{
    RecordingState, SegmentRecord, SegmentSelector, Session, SessionDeps, SessionManager,
    SessionStatus,
};
pub use transcribe::{
    DeepSeekSummarizer, Orchestrator, SegmentFailure, SegmentOutcome, Summarizer, Transcriber,
    WhisperTranscriber,
};
pub use voice::{
    LoopbackHandle, LoopbackVoiceSource, ParticipantId, SpeakerEvent, VoiceConnection, VoiceError,
    VoiceSource,
};
