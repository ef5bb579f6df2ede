//! Session lifecycle and capture pipeline
//!
//! This module provides:
//! - `SessionManager`: context-id to session registry
//! - `Session`: the per-context state machine
//!   (Disconnected -> Connected/Idle <-> Connected/Recording)
//! - the speaker stream multiplexer (one decode-append pipeline per
//!   speaking participant)
//! - the inactivity monitor that auto-terminates silent recordings
//! - the append-only segment archive

mod manager;
mod monitor;
mod pipeline;
mod record;
mod session;

pub use manager::SessionManager;
pub use record::{RecordingState, SegmentRecord, SegmentSelector, SessionStatus};
pub use session::{Session, SessionDeps};
