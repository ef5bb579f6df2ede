// Shared test support: an in-memory harness wiring a session manager to
// the loopback voice source and scriptable external services.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use voicescribe::audio::{
    AudioDecoder, AudioTransformer, DecoderFactory, PassthroughFactory, WavTransformer,
};
use voicescribe::transcribe::{Orchestrator, Summarizer, Transcriber};
use voicescribe::voice::LoopbackVoiceSource;
use voicescribe::{SessionDeps, SessionManager};

pub const CAPTURE_RATE: u32 = 48_000;
pub const CAPTURE_CHANNELS: u16 = 2;
pub const UPLOAD_RATE: u32 = 16_000;

/// Transcriber double: counts calls, replies with a scripted text or an
/// error when no reply is set.
pub struct ScriptedTranscriber {
    calls: AtomicUsize,
    response: Mutex<Option<String>>,
}

impl ScriptedTranscriber {
    pub fn replying(text: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            response: Mutex::new(Some(text.to_string())),
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            response: Mutex::new(None),
        }
    }

    pub fn set_response(&self, response: Option<&str>) {
        *self.response.lock().unwrap() = response.map(str::to_string);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, _audio: &Path) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.response.lock().unwrap().clone() {
            Some(text) => Ok(text),
            None => anyhow::bail!("transcription service unavailable"),
        }
    }
}

pub struct ScriptedSummarizer {
    calls: AtomicUsize,
    response: Mutex<Option<String>>,
}

impl ScriptedSummarizer {
    pub fn replying(text: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            response: Mutex::new(Some(text.to_string())),
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            response: Mutex::new(None),
        }
    }

    pub fn set_response(&self, response: Option<&str>) {
        *self.response.lock().unwrap() = response.map(str::to_string);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarizer for ScriptedSummarizer {
    async fn summarize(&self, _transcript: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.response.lock().unwrap().clone() {
            Some(text) => Ok(text),
            None => anyhow::bail!("summarization service unavailable"),
        }
    }
}

/// Byte value that makes `RejectingDecoder` fail a frame.
pub const UNDECODABLE: u8 = 0xFF;

/// Passthrough decoder that fails frames tagged with `UNDECODABLE`,
/// standing in for a codec hitting a corrupt stream.
pub struct RejectingDecoder;

impl AudioDecoder for RejectingDecoder {
    fn decode(&mut self, frame: &[u8]) -> Result<Vec<u8>> {
        if frame.first() == Some(&UNDECODABLE) {
            anyhow::bail!("undecodable frame");
        }
        Ok(frame.to_vec())
    }
}

pub struct RejectingFactory;

impl DecoderFactory for RejectingFactory {
    fn decoder(&self) -> Box<dyn AudioDecoder> {
        Box::new(RejectingDecoder)
    }
}

/// Real WAV transformer with injectable convert/compress failures.
pub struct FaultableTransformer {
    inner: WavTransformer,
    pub fail_convert: AtomicBool,
    pub fail_compress: AtomicBool,
}

impl FaultableTransformer {
    pub fn new() -> Self {
        Self {
            inner: WavTransformer::new(CAPTURE_RATE, CAPTURE_CHANNELS, UPLOAD_RATE),
            fail_convert: AtomicBool::new(false),
            fail_compress: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl AudioTransformer for FaultableTransformer {
    async fn convert(&self, raw: &Path) -> Result<PathBuf> {
        if self.fail_convert.load(Ordering::SeqCst) {
            anyhow::bail!("injected conversion failure");
        }
        self.inner.convert(raw).await
    }

    async fn compress(&self, container: &Path) -> Result<PathBuf> {
        if self.fail_compress.load(Ordering::SeqCst) {
            anyhow::bail!("injected compression failure");
        }
        self.inner.compress(container).await
    }

    async fn duration(&self, path: &Path) -> f64 {
        self.inner.duration(path).await
    }
}

pub struct Harness {
    pub temp: TempDir,
    pub voice: Arc<LoopbackVoiceSource>,
    pub transformer: Arc<FaultableTransformer>,
    pub transcriber: Arc<ScriptedTranscriber>,
    pub summarizer: Arc<ScriptedSummarizer>,
    pub manager: Arc<SessionManager>,
}

impl Harness {
    /// Harness whose inactivity monitor effectively never fires.
    pub fn new() -> Result<Self> {
        Self::with_inactivity(Duration::from_secs(3600), Duration::from_secs(3600))
    }

    pub fn with_inactivity(check: Duration, limit: Duration) -> Result<Self> {
        Self::build(check, limit, Arc::new(PassthroughFactory))
    }

    /// Harness with a custom frame decoder and a dormant monitor.
    pub fn with_decoders(decoders: Arc<dyn DecoderFactory>) -> Result<Self> {
        Self::build(
            Duration::from_secs(3600),
            Duration::from_secs(3600),
            decoders,
        )
    }

    fn build(
        check: Duration,
        limit: Duration,
        decoders: Arc<dyn DecoderFactory>,
    ) -> Result<Self> {
        let temp = TempDir::new()?;
        let voice = Arc::new(LoopbackVoiceSource::new());
        let transformer = Arc::new(FaultableTransformer::new());
        let transcriber = Arc::new(ScriptedTranscriber::replying("hello world"));
        let summarizer = Arc::new(ScriptedSummarizer::replying("a short summary"));

        let orchestrator = Arc::new(Orchestrator::new(
            Arc::clone(&transformer) as Arc<dyn AudioTransformer>,
            Arc::clone(&transcriber) as Arc<dyn Transcriber>,
            Arc::clone(&summarizer) as Arc<dyn Summarizer>,
            0.1,
        ));

        let deps = Arc::new(SessionDeps {
            voice: Arc::clone(&voice) as _,
            decoders,
            orchestrator,
            recordings_dir: temp.path().join("recordings"),
            inactivity_check: check,
            inactivity_limit: limit,
        });

        Ok(Self {
            temp,
            voice,
            transformer,
            transcriber,
            summarizer,
            manager: Arc::new(SessionManager::new(deps)),
        })
    }

    pub fn capture_path(&self, context: &str, segment: u64) -> PathBuf {
        self.temp
            .path()
            .join("recordings")
            .join(format!("session_{context}_{segment}.pcm"))
    }
}

/// One second of silent capture-format PCM (48kHz stereo s16le).
pub fn silence(seconds: f64) -> Vec<u8> {
    let bytes = (seconds * CAPTURE_RATE as f64 * CAPTURE_CHANNELS as f64 * 2.0) as usize;
    vec![0u8; bytes & !1]
}

/// Poll a condition until it holds or ~2 seconds elapse.
pub async fn wait_until<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
