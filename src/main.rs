use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use voicescribe::audio::PassthroughFactory;
use voicescribe::transcribe::{DeepSeekSummarizer, Orchestrator, WhisperTranscriber};
use voicescribe::voice::LoopbackVoiceSource;
use voicescribe::{create_router, AppState, Config, SessionDeps, SessionManager, WavTransformer};

#[derive(Parser)]
#[command(name = "voicescribe", about = "Voice-channel recording and transcription service")]
struct Args {
    /// Config file (without extension), as read by the config crate
    #[arg(long, default_value = "config/voicescribe")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v0.1.0", cfg.service.name);

    let openai_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
    if openai_key.is_empty() {
        warn!("OPENAI_API_KEY not set; transcription requests will fail");
    }
    let deepseek_key = std::env::var("DEEPSEEK_API_KEY").unwrap_or_default();
    if deepseek_key.is_empty() {
        warn!("DEEPSEEK_API_KEY not set; summarization requests will fail");
    }

    let transformer = Arc::new(WavTransformer::new(
        cfg.audio.capture_sample_rate,
        cfg.audio.capture_channels,
        cfg.audio.upload_sample_rate,
    ));
    let transcriber = Arc::new(WhisperTranscriber::new(
        &cfg.transcription.api_base,
        &openai_key,
        &cfg.transcription.model,
    )?);
    let summarizer = Arc::new(DeepSeekSummarizer::new(
        &cfg.summarization.api_base,
        &deepseek_key,
        &cfg.summarization.model,
    )?);
    let orchestrator = Arc::new(Orchestrator::new(
        transformer,
        transcriber,
        summarizer,
        cfg.audio.min_duration_secs,
    ));

    // The loopback source accepts joins but carries no audio; a real
    // gateway adapter replaces it (with a matching frame decoder) when
    // one is linked in.
    let deps = Arc::new(SessionDeps {
        voice: Arc::new(LoopbackVoiceSource::new()),
        decoders: Arc::new(PassthroughFactory),
        orchestrator,
        recordings_dir: PathBuf::from(&cfg.audio.recordings_path),
        inactivity_check: cfg.recording.inactivity_check(),
        inactivity_limit: cfg.recording.inactivity_limit(),
    });
    let manager = Arc::new(SessionManager::new(deps));

    let app = create_router(AppState::new(manager));
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP API listening on {addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
