//! Inactivity monitor
//!
//! A recurring check bound to one recording segment. Exactly one handle
//! lives on the session while it is recording; every path out of the
//! Recording state either aborts it or (when the monitor itself fires)
//! finds it already detached.

use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use super::session::Session;
use crate::error::SessionError;

/// Outcome of one tick's state check.
pub(super) enum MonitorVerdict {
    /// Recording ended or moved to another segment; deactivate.
    Stale,
    /// Still recording, silence window not yet exceeded.
    Wait,
    /// Silence limit reached; the session has detached this monitor's
    /// handle and expects the stop sequence to run now.
    Fire,
}

pub(super) fn spawn(
    session: Weak<Session>,
    segment: u64,
    check_every: Duration,
    silence_limit: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(check_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of an interval completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let Some(session) = session.upgrade() else {
                return;
            };

            match session.monitor_tick(segment, silence_limit).await {
                MonitorVerdict::Stale => return,
                MonitorVerdict::Wait => continue,
                MonitorVerdict::Fire => {
                    info!(
                        context = session.context_id(),
                        segment, "inactivity limit reached, stopping recording"
                    );
                    match session.stop_recording().await {
                        Ok((id, _)) => {
                            info!(context = session.context_id(), segment = id, "segment archived after inactivity stop");
                        }
                        // A manual stop won the race after we fired.
                        Err(SessionError::NotRecording) => return,
                        Err(e) => {
                            error!(context = session.context_id(), "inactivity stop failed: {e}");
                        }
                    }
                    if let Err(e) = session.leave().await {
                        warn!(context = session.context_id(), "leave after inactivity stop failed: {e}");
                    }
                    return;
                }
            }
        }
    })
}
