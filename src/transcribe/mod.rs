//! Transcription and summarization
//!
//! External speech-to-text and summarization services sit behind the
//! `Transcriber` and `Summarizer` traits; the orchestrator sequences
//! convert -> compress -> duration guard -> transcribe -> summarize and
//! turns every failure into a displayable sentinel so the session always
//! has something to archive.

mod deepseek;
mod orchestrator;
mod whisper;

pub use deepseek::DeepSeekSummarizer;
pub use orchestrator::{Orchestrator, SegmentOutcome};
pub use whisper::WhisperTranscriber;

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::path::Path;

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file to text.
    async fn transcribe(&self, audio: &Path) -> Result<String>;
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize a conversation transcript.
    async fn summarize(&self, transcript: &str) -> Result<String>;
}

/// Well-formed placeholder for a failed processing step. Rendered into
/// the archived record instead of propagating an error, so every stop
/// sequence produces a displayable outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentFailure {
    Conversion,
    Compression,
    NoUsableAudio,
    Transcription,
    NoText,
    Summary,
}

impl fmt::Display for SegmentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SegmentFailure::Conversion => "[Conversion to WAV failed]",
            SegmentFailure::Compression => "[Compression failed]",
            SegmentFailure::NoUsableAudio => "[No usable audio recorded or too short]",
            SegmentFailure::Transcription => "[Transcription failed or returned empty]",
            SegmentFailure::NoText => "[No text to summarize]",
            SegmentFailure::Summary => "[Summary failed]",
        };
        f.write_str(text)
    }
}
