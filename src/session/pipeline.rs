//! Speaker stream multiplexer
//!
//! One pipeline task per currently-speaking participant. Each task owns
//! its own append-mode handle on the session's capture file and writes
//! one whole decoded buffer per append, so concurrent speakers
//! interleave chunk-by-chunk without corrupting each other's writes.
//! The result is time-interleaved by append order, not a sample-accurate
//! mix.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::audio::AudioDecoder;
use crate::voice::ParticipantId;

pub struct SpeakerPipeline {
    participant: ParticipantId,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SpeakerPipeline {
    /// Open the capture file in append mode and start decoding the
    /// participant's frames into it. An open failure is isolated to this
    /// participant; the caller logs it and the session continues.
    pub fn spawn(
        context_id: &str,
        participant: ParticipantId,
        mut frames: mpsc::Receiver<Vec<u8>>,
        mut decoder: Box<dyn AudioDecoder>,
        capture_file: &Path,
    ) -> std::io::Result<Self> {
        let mut file = OpenOptions::new().append(true).open(capture_file)?;
        let context = context_id.to_string();
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    frame = frames.recv() => {
                        let Some(frame) = frame else { break };
                        let pcm = match decoder.decode(&frame) {
                            Ok(pcm) => pcm,
                            Err(e) => {
                                error!(
                                    %context, participant,
                                    "decode failed, tearing down pipeline: {e:#}"
                                );
                                break;
                            }
                        };
                        if let Err(e) = file.write_all(&pcm) {
                            error!(
                                %context, participant,
                                "append failed, tearing down pipeline: {e}"
                            );
                            break;
                        }
                    }
                }
            }
            if let Err(e) = file.flush() {
                warn!(%context, participant, "failed to flush capture tail: {e}");
            }
            debug!(%context, participant, "speaker pipeline closed");
        });

        Ok(Self {
            participant,
            stop_tx: Some(stop_tx),
            task: Some(task),
        })
    }

    /// Clean stop: stop accepting frames, then wait for the task to
    /// flush and exit.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if e.is_panic() {
                    error!(participant = self.participant, "speaker pipeline panicked: {e}");
                }
            }
        }
    }

    /// Stop accepting frames and detach; the task flushes its tail on
    /// its own before exiting.
    pub fn release(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Hard teardown without waiting for a flush. Used by forced leave;
    /// any unwritten tail is deliberately discarded.
    pub fn abort(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
