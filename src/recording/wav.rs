//! WAV output for finished takes.

use anyhow::Result;
use hound::WavWriter;
use std::path::Path;

/// Writes mono i16 PCM samples as a 16-bit WAV file.
///
/// # Errors
/// - If the file cannot be created or written
pub fn save_wav(samples: &[i16], sample_rate: u32, path: &Path) -> Result<()> {
    let wav_spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, wav_spec)?;

    for &sample in samples {
        writer.write_sample(sample)?;
    }

    writer.finalize()?;
    tracing::info!(
        "Recording saved: {} ({} samples at {}Hz)",
        path.display(),
        samples.len(),
        sample_rate
    );
    Ok(())
}
