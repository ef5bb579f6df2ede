//! Per-context session state machine
//!
//! One `Session` per call context, created lazily by the manager and
//! kept for the life of the process. State-changing operations (join,
//! start, stop, leave, speaker events) serialize on a single mutex; the
//! archive sits behind its own lock so segment queries never contend
//! with transitions. `stop_recording` flips the state to Idle inside the
//! critical section, before any awaited work, so speaker events arriving
//! afterwards observe Idle and are no-ops.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, error, info, warn};

use super::monitor::{self, MonitorVerdict};
use super::pipeline::SpeakerPipeline;
use super::record::{RecordingState, SegmentRecord, SegmentSelector, SessionStatus};
use crate::audio::DecoderFactory;
use crate::error::SessionError;
use crate::transcribe::Orchestrator;
use crate::voice::{ParticipantId, SpeakerEvent, VoiceConnection, VoiceSource};

/// Collaborators and tuning shared by all sessions.
pub struct SessionDeps {
    pub voice: Arc<dyn VoiceSource>,
    pub decoders: Arc<dyn DecoderFactory>,
    pub orchestrator: Arc<Orchestrator>,
    pub recordings_dir: PathBuf,
    pub inactivity_check: Duration,
    pub inactivity_limit: Duration,
}

struct SessionState {
    connection: Option<Box<dyn VoiceConnection>>,
    recording: RecordingState,
    active_file: Option<PathBuf>,
    pipelines: HashMap<ParticipantId, SpeakerPipeline>,
    segment_counter: u64,
    segment_started_at: Option<Instant>,
    last_speech_at: Option<Instant>,
    monitor: Option<tokio::task::JoinHandle<()>>,
    /// Guard: speaker-event wiring happens once per live connection and
    /// resets on leave, so a re-join observes the new connection's
    /// events without ever double-attaching.
    listeners_attached: bool,
    dispatcher_shutdown: Option<watch::Sender<bool>>,
}

pub struct Session {
    context_id: String,
    deps: Arc<SessionDeps>,
    weak: Weak<Session>,
    state: Mutex<SessionState>,
    archive: Mutex<BTreeMap<u64, SegmentRecord>>,
}

impl Session {
    pub(super) fn new(context_id: String, deps: Arc<SessionDeps>) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            context_id,
            deps,
            weak: weak.clone(),
            state: Mutex::new(SessionState {
                connection: None,
                recording: RecordingState::Idle,
                active_file: None,
                pipelines: HashMap::new(),
                segment_counter: 0,
                segment_started_at: None,
                last_speech_at: None,
                monitor: None,
                listeners_attached: false,
                dispatcher_shutdown: None,
            }),
            archive: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// Acquire a voice connection and wire speaker-event dispatch. The
    /// session is left untouched if the join fails.
    pub async fn join(&self, target: &str) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        if state.connection.is_some() {
            return Err(SessionError::AlreadyConnected);
        }

        let mut connection = self.deps.voice.join(target).await?;

        if !state.listeners_attached {
            if let Some(events) = connection.take_events() {
                let (shutdown_tx, shutdown_rx) = watch::channel(false);
                state.dispatcher_shutdown = Some(shutdown_tx);
                self.spawn_dispatcher(events, shutdown_rx);
            }
            state.listeners_attached = true;
        }

        state.connection = Some(connection);
        info!(context = self.context_id.as_str(), channel = target, "joined voice channel");
        Ok(())
    }

    /// Begin a new recording segment: allocate a fresh capture file,
    /// bump the segment counter, and start the inactivity monitor.
    pub async fn start_recording(&self) -> Result<u64, SessionError> {
        let mut state = self.state.lock().await;
        if state.connection.is_none() {
            return Err(SessionError::NotConnected);
        }
        if state.recording == RecordingState::Recording {
            return Err(SessionError::AlreadyRecording);
        }

        let segment = state.segment_counter + 1;
        let path = self
            .deps
            .recordings_dir
            .join(format!("session_{}_{}.pcm", self.context_id, segment));
        std::fs::create_dir_all(&self.deps.recordings_dir)?;
        std::fs::File::create(&path)?;

        state.segment_counter = segment;
        state.active_file = Some(path.clone());
        let now = Instant::now();
        state.segment_started_at = Some(now);
        state.last_speech_at = Some(now);
        state.recording = RecordingState::Recording;

        // Never more than one live monitor per session.
        if let Some(old) = state.monitor.take() {
            old.abort();
        }
        state.monitor = Some(monitor::spawn(
            self.weak.clone(),
            segment,
            self.deps.inactivity_check,
            self.deps.inactivity_limit,
        ));

        info!(
            context = self.context_id.as_str(),
            segment,
            file = %path.display(),
            "recording started"
        );
        Ok(segment)
    }

    /// Stop the current segment, drain it through the orchestrator, and
    /// archive the outcome. The state flips to Idle before the first
    /// await on external work; late speaker events are no-ops.
    pub async fn stop_recording(&self) -> Result<(u64, SegmentRecord), SessionError> {
        let (segment, raw_path, pipelines, monitor) = {
            let mut state = self.state.lock().await;
            if state.recording != RecordingState::Recording {
                return Err(SessionError::NotRecording);
            }
            let Some(raw_path) = state.active_file.take() else {
                return Err(SessionError::NotRecording);
            };
            state.recording = RecordingState::Idle;
            state.segment_started_at = None;
            let pipelines = std::mem::take(&mut state.pipelines);
            let monitor = state.monitor.take();
            (state.segment_counter, raw_path, pipelines, monitor)
        };

        if let Some(monitor) = monitor {
            monitor.abort();
        }

        // Clean stop: wait for each pipeline to flush before the file is
        // handed to the orchestrator.
        for (_, pipeline) in pipelines {
            pipeline.shutdown().await;
        }

        info!(context = self.context_id.as_str(), segment, "recording stopped, processing segment");

        let outcome = self.deps.orchestrator.process(&raw_path).await;
        let record = SegmentRecord {
            transcript: outcome.transcript,
            summary: outcome.summary,
            recorded_at: chrono::Utc::now(),
        };

        self.archive.lock().await.insert(segment, record.clone());
        info!(context = self.context_id.as_str(), segment, "segment archived");
        Ok((segment, record))
    }

    /// Destroy the connection. A leave while recording is a hard
    /// cancellation: pipelines are aborted without flushing and the
    /// unfinished segment is discarded with no transcription attempt.
    pub async fn leave(&self) -> Result<(), SessionError> {
        let (mut connection, pipelines, monitor, shutdown, discarded) = {
            let mut state = self.state.lock().await;
            let Some(connection) = state.connection.take() else {
                return Err(SessionError::NotConnected);
            };
            let discarded = state.recording == RecordingState::Recording;
            state.recording = RecordingState::Idle;
            state.active_file = None;
            state.segment_started_at = None;
            state.listeners_attached = false;
            let pipelines = std::mem::take(&mut state.pipelines);
            let monitor = state.monitor.take();
            let shutdown = state.dispatcher_shutdown.take();
            (connection, pipelines, monitor, shutdown, discarded)
        };

        if discarded {
            warn!(
                context = self.context_id.as_str(),
                "leaving while recording; in-flight segment discarded"
            );
        }
        if let Some(monitor) = monitor {
            monitor.abort();
        }
        for (_, pipeline) in pipelines {
            pipeline.abort();
        }
        if let Some(shutdown) = shutdown {
            let _ = shutdown.send(true);
        }
        connection.destroy();

        info!(context = self.context_id.as_str(), "left voice channel");
        Ok(())
    }

    /// Look up an archived segment by id, or the most recent one.
    pub async fn get_segment(
        &self,
        selector: SegmentSelector,
    ) -> Result<(u64, SegmentRecord), SessionError> {
        let archive = self.archive.lock().await;
        let id = match selector {
            SegmentSelector::Id(id) => id,
            SegmentSelector::Recent => *archive
                .keys()
                .next_back()
                .ok_or(SessionError::SegmentNotFound)?,
        };
        archive
            .get(&id)
            .cloned()
            .map(|record| (id, record))
            .ok_or(SessionError::SegmentNotFound)
    }

    pub async fn status(&self) -> SessionStatus {
        let state = self.state.lock().await;
        let archived = self.archive.lock().await.len();
        SessionStatus {
            connected: state.connection.is_some(),
            recording: state.recording,
            segment_counter: state.segment_counter,
            active_speakers: state.pipelines.len(),
            inactivity_monitor: state.monitor.is_some(),
            archived_segments: archived,
        }
    }

    fn spawn_dispatcher(
        &self,
        mut events: mpsc::Receiver<SpeakerEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let weak = self.weak.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    event = events.recv() => {
                        let Some(event) = event else { break };
                        let Some(session) = weak.upgrade() else { break };
                        match event {
                            SpeakerEvent::SpeakingStarted { participant } => {
                                session.handle_speaking_started(participant).await;
                            }
                            SpeakerEvent::SpeakingEnded { participant } => {
                                session.handle_speaking_ended(participant).await;
                            }
                        }
                    }
                }
            }
        });
    }

    async fn handle_speaking_started(&self, participant: ParticipantId) {
        let mut state = self.state.lock().await;
        if state.recording != RecordingState::Recording {
            return;
        }
        // Duplicate speaking-start without an end in between: exactly one
        // pipeline stays tracked.
        if state.pipelines.contains_key(&participant) {
            return;
        }
        state.last_speech_at = Some(Instant::now());

        let Some(path) = state.active_file.clone() else {
            warn!(context = self.context_id.as_str(), "recording without a capture file");
            return;
        };
        let Some(connection) = state.connection.as_ref() else {
            return;
        };

        let frames = connection.subscribe(participant);
        let decoder = self.deps.decoders.decoder();
        match SpeakerPipeline::spawn(&self.context_id, participant, frames, decoder, &path) {
            Ok(pipeline) => {
                debug!(context = self.context_id.as_str(), participant, "speaker pipeline opened");
                state.pipelines.insert(participant, pipeline);
            }
            Err(e) => {
                // Isolated to this participant; the session keeps going.
                error!(
                    context = self.context_id.as_str(),
                    participant, "failed to open speaker pipeline: {e}"
                );
            }
        }
    }

    async fn handle_speaking_ended(&self, participant: ParticipantId) {
        let mut state = self.state.lock().await;
        if state.recording != RecordingState::Recording {
            return;
        }
        if let Some(pipeline) = state.pipelines.remove(&participant) {
            debug!(context = self.context_id.as_str(), participant, "speaker pipeline released");
            pipeline.release();
        }
    }

    /// One inactivity-monitor tick. When the silence limit is exceeded
    /// the monitor's handle is detached here, inside the critical
    /// section, so the stop sequence it is about to run cannot abort the
    /// task executing it.
    pub(super) async fn monitor_tick(&self, segment: u64, limit: Duration) -> MonitorVerdict {
        let mut state = self.state.lock().await;
        if state.recording != RecordingState::Recording || state.segment_counter != segment {
            return MonitorVerdict::Stale;
        }
        match state.last_speech_at {
            Some(last) if last.elapsed() > limit => {
                state.monitor.take();
                MonitorVerdict::Fire
            }
            _ => MonitorVerdict::Wait,
        }
    }
}
