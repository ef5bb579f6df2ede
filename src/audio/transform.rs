//! Audio transform gateway
//!
//! Converts a raw captured PCM file into a playable WAV container, then
//! compresses it to a low-rate mono WAV for the transcription upload,
//! and measures durations. Derived files sit next to the raw capture
//! with fixed suffixes: `session_{ctx}_{id}.pcm` -> `.wav` ->
//! `.compressed.wav`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[async_trait]
pub trait AudioTransformer: Send + Sync {
    /// Raw captured audio -> standard container at full fidelity.
    async fn convert(&self, raw: &Path) -> Result<PathBuf>;

    /// Container -> fixed low sample rate, single channel, for upload.
    async fn compress(&self, container: &Path) -> Result<PathBuf>;

    /// Duration in seconds; 0.0 if unmeasurable.
    async fn duration(&self, path: &Path) -> f64;
}

/// Native transformer for s16le PCM captures.
pub struct WavTransformer {
    capture_sample_rate: u32,
    capture_channels: u16,
    upload_sample_rate: u32,
}

impl WavTransformer {
    pub fn new(capture_sample_rate: u32, capture_channels: u16, upload_sample_rate: u32) -> Self {
        Self {
            capture_sample_rate,
            capture_channels,
            upload_sample_rate,
        }
    }

    /// Sum interleaved stereo down to mono, clamping on overflow.
    fn to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
        if channels <= 1 {
            return samples.to_vec();
        }

        let channels = channels as usize;
        let mut mono = Vec::with_capacity(samples.len() / channels);
        for chunk in samples.chunks_exact(channels) {
            let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
            mono.push(sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16);
        }
        mono
    }

    /// Downsample mono audio by decimation. Only integer ratios are
    /// supported; a non-integer ratio keeps the source rate.
    fn decimate(samples: Vec<i16>, from_rate: u32, to_rate: u32) -> (Vec<i16>, u32) {
        if from_rate <= to_rate || from_rate % to_rate != 0 {
            return (samples, from_rate);
        }

        let ratio = (from_rate / to_rate) as usize;
        let decimated = samples.into_iter().step_by(ratio).collect();
        (decimated, to_rate)
    }

    fn probe_duration(path: &Path) -> Result<f64> {
        use symphonia::core::formats::FormatOptions;
        use symphonia::core::io::MediaSourceStream;
        use symphonia::core::meta::MetadataOptions;
        use symphonia::core::probe::Hint;

        let file = std::fs::File::open(path)?;
        let stream = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe().format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;

        let track = probed
            .format
            .default_track()
            .context("no default track in probed audio")?;
        let frames = track
            .codec_params
            .n_frames
            .context("probed track reports no frame count")?;
        let rate = track
            .codec_params
            .sample_rate
            .context("probed track reports no sample rate")?;

        Ok(frames as f64 / rate as f64)
    }
}

#[async_trait]
impl AudioTransformer for WavTransformer {
    async fn convert(&self, raw: &Path) -> Result<PathBuf> {
        let bytes = std::fs::read(raw)
            .with_context(|| format!("failed to read raw capture {}", raw.display()))?;

        // Interpret as interleaved s16le; an odd trailing byte is a
        // truncated write and is dropped.
        let samples: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        let out = raw.with_extension("wav");
        let spec = hound::WavSpec {
            channels: self.capture_channels,
            sample_rate: self.capture_sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(&out, spec)
            .with_context(|| format!("failed to create WAV file {}", out.display()))?;
        for sample in samples {
            writer.write_sample(sample).context("failed to write sample to WAV")?;
        }
        writer.finalize().context("failed to finalize WAV file")?;

        info!("converted {} -> {}", raw.display(), out.display());
        Ok(out)
    }

    async fn compress(&self, container: &Path) -> Result<PathBuf> {
        let reader = hound::WavReader::open(container)
            .with_context(|| format!("failed to open WAV file {}", container.display()))?;
        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read WAV samples")?;

        let mono = Self::to_mono(&samples, spec.channels);
        let (compressed, out_rate) =
            Self::decimate(mono, spec.sample_rate, self.upload_sample_rate);

        let out = container.with_extension("compressed.wav");
        let out_spec = hound::WavSpec {
            channels: 1,
            sample_rate: out_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(&out, out_spec)
            .with_context(|| format!("failed to create WAV file {}", out.display()))?;
        for sample in compressed {
            writer.write_sample(sample).context("failed to write sample to WAV")?;
        }
        writer.finalize().context("failed to finalize WAV file")?;

        info!(
            "compressed {} -> {} ({}Hz mono)",
            container.display(),
            out.display(),
            out_rate
        );
        Ok(out)
    }

    async fn duration(&self, path: &Path) -> f64 {
        let measured = if path.extension().and_then(|e| e.to_str()) == Some("wav") {
            hound::WavReader::open(path)
                .map(|r| r.duration() as f64 / r.spec().sample_rate as f64)
                .map_err(anyhow::Error::from)
        } else {
            Self::probe_duration(path)
        };

        match measured {
            Ok(secs) => secs,
            Err(e) => {
                debug!("could not measure duration of {}: {e:#}", path.display());
                0.0
            }
        }
    }
}
