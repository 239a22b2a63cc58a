//! WAV renderer: encodes rendered mono samples as 16-bit PCM WAV.

use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::error::AudioError;

/// Encode mono f32 samples to a WAV byte buffer (16-bit PCM).
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, AudioError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            let pcm = (sample as f64 * 32767.0).round().clamp(-32768.0, 32767.0) as i16;
            writer.write_sample(pcm)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}
