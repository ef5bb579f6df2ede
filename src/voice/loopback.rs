//! In-process voice source
//!
//! Joins always succeed and produce a connection whose speaker events
//! and audio frames are driven by a `LoopbackHandle`. Integration tests
//! script call activity through it; the default binary runs on it until
//! a real gateway adapter is wired in (joins work, no audio arrives).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::info;

use super::{ParticipantId, SpeakerEvent, VoiceConnection, VoiceError, VoiceSource};

const EVENT_BUFFER: usize = 64;
const FRAME_BUFFER: usize = 256;

struct FrameChannel {
    tx: mpsc::Sender<Vec<u8>>,
    rx: Option<mpsc::Receiver<Vec<u8>>>,
}

impl FrameChannel {
    fn new() -> Self {
        let (tx, rx) = mpsc::channel(FRAME_BUFFER);
        Self { tx, rx: Some(rx) }
    }
}

type FrameMap = Arc<Mutex<HashMap<ParticipantId, FrameChannel>>>;

pub struct LoopbackVoiceSource {
    handles: Mutex<HashMap<String, LoopbackHandle>>,
}

impl LoopbackVoiceSource {
    pub fn new() -> Self {
        Self {
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Driver side of the most recent connection to `target`.
    pub fn handle(&self, target: &str) -> Option<LoopbackHandle> {
        self.handles.lock().unwrap().get(target).cloned()
    }
}

impl Default for LoopbackVoiceSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VoiceSource for LoopbackVoiceSource {
    async fn join(&self, target: &str) -> Result<Box<dyn VoiceConnection>, VoiceError> {
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let frames: FrameMap = Arc::new(Mutex::new(HashMap::new()));

        let handle = LoopbackHandle {
            events: event_tx,
            frames: Arc::clone(&frames),
        };
        self.handles
            .lock()
            .unwrap()
            .insert(target.to_string(), handle);

        info!(channel = target, "loopback voice source joined");

        Ok(Box::new(LoopbackConnection {
            events: Some(event_rx),
            frames,
        }))
    }
}

/// Driver handle for one loopback connection. Frames sent before the
/// session subscribes are buffered in the participant's channel, so
/// scripted activity never races the event dispatch.
#[derive(Clone)]
pub struct LoopbackHandle {
    events: mpsc::Sender<SpeakerEvent>,
    frames: FrameMap,
}

impl LoopbackHandle {
    pub async fn speaking_started(&self, participant: ParticipantId) {
        let _ = self
            .events
            .send(SpeakerEvent::SpeakingStarted { participant })
            .await;
    }

    pub async fn speaking_ended(&self, participant: ParticipantId) {
        let _ = self
            .events
            .send(SpeakerEvent::SpeakingEnded { participant })
            .await;
    }

    pub async fn send_frame(&self, participant: ParticipantId, frame: Vec<u8>) {
        let tx = {
            let mut map = self.frames.lock().unwrap();
            map.entry(participant).or_insert_with(FrameChannel::new).tx.clone()
        };
        let _ = tx.send(frame).await;
    }
}

struct LoopbackConnection {
    events: Option<mpsc::Receiver<SpeakerEvent>>,
    frames: FrameMap,
}

impl VoiceConnection for LoopbackConnection {
    fn take_events(&mut self) -> Option<mpsc::Receiver<SpeakerEvent>> {
        self.events.take()
    }

    fn subscribe(&self, participant: ParticipantId) -> mpsc::Receiver<Vec<u8>> {
        let mut map = self.frames.lock().unwrap();
        let channel = map.entry(participant).or_insert_with(FrameChannel::new);
        if let Some(rx) = channel.rx.take() {
            return rx;
        }
        // Re-subscription replaces the old channel outright.
        let (tx, rx) = mpsc::channel(FRAME_BUFFER);
        *channel = FrameChannel { tx, rx: None };
        rx
    }

    fn destroy(&mut self) {
        self.events = None;
        self.frames.lock().unwrap().clear();
    }
}
