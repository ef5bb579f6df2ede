use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub recording: RecordingConfig,
    pub transcription: TranscriptionConfig,
    pub summarization: SummarizationConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    /// Directory for per-segment capture files and their derived artifacts
    pub recordings_path: String,
    /// Sample rate of the decoded speaker PCM written to the capture file
    pub capture_sample_rate: u32,
    pub capture_channels: u16,
    /// Sample rate of the compressed upload (Whisper expects 16kHz mono)
    pub upload_sample_rate: u32,
    /// Segments shorter than this are not sent to the transcription service
    pub min_duration_secs: f64,
}

#[derive(Debug, Deserialize)]
pub struct RecordingConfig {
    /// How often the inactivity monitor checks for silence
    pub inactivity_check_secs: u64,
    /// Silence window after which recording auto-stops
    pub inactivity_limit_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptionConfig {
    pub api_base: String,
    pub model: String,
}

#[derive(Debug, Deserialize)]
pub struct SummarizationConfig {
    pub api_base: String,
    pub model: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl RecordingConfig {
    pub fn inactivity_check(&self) -> Duration {
        Duration::from_secs(self.inactivity_check_secs)
    }

    pub fn inactivity_limit(&self) -> Duration {
        Duration::from_secs(self.inactivity_limit_secs)
    }
}
