//! WAV output.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::dsp::SAMPLE_RATE;

/// Write `audio` as 16-bit PCM mono at [`SAMPLE_RATE`] Hz.
///
/// 16-bit PCM rather than float: some mobile players accept a float WAV
/// header and then play silence.
pub fn write_wav(audio: &[f32], path: &Path) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Cannot create WAV: {}", path.display()))?;
    for &s in audio {
        let s16 = (s * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        writer.write_sample(s16).context("WAV write error")?;
    }
    writer.finalize().context("WAV finalise error")?;
    info!(
        samples = audio.len(),
        seconds = audio.len() as f32 / SAMPLE_RATE as f32,
        path = %path.display(),
        "wrote WAV"
    );
    Ok(())
}
