//! HTTP control API
//!
//! Thin adapter over the session manager for external control surfaces:
//! - POST /sessions/:context/join - join a voice target
//! - POST /sessions/:context/record/start - start a segment
//! - POST /sessions/:context/record/stop - stop, transcribe, summarize
//! - POST /sessions/:context/leave - leave (discards in-flight audio)
//! - GET  /sessions/:context/status - session state snapshot
//! - GET  /sessions/:context/segments/recent - latest archived segment
//! - GET  /sessions/:context/segments/:id - archived segment by id
//! - GET  /health - health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
