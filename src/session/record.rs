use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recording sub-state of a connected session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingState {
    Idle,
    Recording,
}

/// Archived outcome of one completed recording segment. The transcript
/// and summary may be failure sentinels; the record is always
/// well-formed and displayable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub transcript: String,
    pub summary: String,
    pub recorded_at: DateTime<Utc>,
}

/// How a caller addresses an archived segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SegmentSelector {
    /// The most recently completed segment.
    #[default]
    Recent,
    Id(u64),
}

/// Point-in-time view of a session, for status queries and tests.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub connected: bool,
    pub recording: RecordingState,
    pub segment_counter: u64,
    pub active_speakers: usize,
    pub inactivity_monitor: bool,
    pub archived_segments: usize,
}
