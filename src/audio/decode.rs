//! Per-speaker frame decoding
//!
//! Each speaker pipeline owns one decoder that turns the gateway's raw
//! encoded frames into linear PCM bytes for the capture file. Gateway
//! adapters supply a matching decoder (e.g. Opus for Discord-style
//! gateways); the passthrough decoder covers sources that already
//! deliver s16le PCM, which is what the loopback source does.

use anyhow::Result;

pub trait AudioDecoder: Send {
    /// Decode one encoded frame to interleaved s16le PCM bytes.
    fn decode(&mut self, frame: &[u8]) -> Result<Vec<u8>>;
}

/// Produces a fresh decoder per speaker pipeline. Decoders are stateful
/// (codec context), so they are never shared between participants.
pub trait DecoderFactory: Send + Sync {
    fn decoder(&self) -> Box<dyn AudioDecoder>;
}

/// Identity decoder for sources that deliver PCM frames directly.
pub struct PassthroughDecoder;

impl AudioDecoder for PassthroughDecoder {
    fn decode(&mut self, frame: &[u8]) -> Result<Vec<u8>> {
        Ok(frame.to_vec())
    }
}

pub struct PassthroughFactory;

impl DecoderFactory for PassthroughFactory {
    fn decoder(&self) -> Box<dyn AudioDecoder> {
        Box::new(PassthroughDecoder)
    }
}
