use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use super::{SegmentFailure, Summarizer, Transcriber};
use crate::audio::AudioTransformer;

/// The (transcript, summary) pair a stop sequence archives. Either side
/// may be a rendered `SegmentFailure` sentinel.
#[derive(Debug, Clone)]
pub struct SegmentOutcome {
    pub transcript: String,
    pub summary: String,
}

impl SegmentOutcome {
    fn failed(failure: SegmentFailure) -> Self {
        Self {
            transcript: failure.to_string(),
            summary: SegmentFailure::NoText.to_string(),
        }
    }
}

/// Sequences one finished capture file through the transform gateway and
/// the external services. Strictly sequential; each step's failure is
/// absorbed into a sentinel and stops the pipeline without touching
/// later (paid) steps.
pub struct Orchestrator {
    transform: Arc<dyn AudioTransformer>,
    transcriber: Arc<dyn Transcriber>,
    summarizer: Arc<dyn Summarizer>,
    min_duration_secs: f64,
}

impl Orchestrator {
    pub fn new(
        transform: Arc<dyn AudioTransformer>,
        transcriber: Arc<dyn Transcriber>,
        summarizer: Arc<dyn Summarizer>,
        min_duration_secs: f64,
    ) -> Self {
        Self {
            transform,
            transcriber,
            summarizer,
            min_duration_secs,
        }
    }

    pub async fn process(&self, raw: &Path) -> SegmentOutcome {
        let container = match self.transform.convert(raw).await {
            Ok(path) => path,
            Err(e) => {
                error!("conversion failed for {}: {e:#}", raw.display());
                return SegmentOutcome::failed(SegmentFailure::Conversion);
            }
        };

        let compressed = match self.transform.compress(&container).await {
            Ok(path) => path,
            Err(e) => {
                error!("compression failed for {}: {e:#}", container.display());
                return SegmentOutcome::failed(SegmentFailure::Compression);
            }
        };

        let duration = self.transform.duration(&compressed).await;
        if duration < self.min_duration_secs {
            info!(
                "segment too short to transcribe ({duration:.2}s < {:.2}s)",
                self.min_duration_secs
            );
            return SegmentOutcome::failed(SegmentFailure::NoUsableAudio);
        }

        let transcript = match self.transcriber.transcribe(&compressed).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                error!("transcription failed: {e:#}");
                return SegmentOutcome::failed(SegmentFailure::Transcription);
            }
        };

        if transcript.is_empty() {
            return SegmentOutcome {
                transcript,
                summary: SegmentFailure::NoText.to_string(),
            };
        }

        let summary = match self.summarizer.summarize(&transcript).await {
            Ok(summary) => summary.trim().to_string(),
            Err(e) => {
                error!("summarization failed: {e:#}");
                SegmentFailure::Summary.to_string()
            }
        };

        SegmentOutcome { transcript, summary }
    }
}
