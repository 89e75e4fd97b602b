//! Chunk → intensity reduction.
//!
//! The intensity of a chunk is the Euclidean (L2) norm of its decoded
//! amplitudes. PCM16 samples are taken as raw integer amplitudes, Float32
//! samples as delivered. It is a magnitude proxy, not a loudness unit.

use crate::traits::audio_driver::RawChunk;

pub fn chunk_intensity(chunk: RawChunk<'_>) -> f64 {
    match chunk {
        RawChunk::Pcm16(samples) => l2_norm(samples.iter().map(|&s| s as f64)),
        RawChunk::Float32(samples) => l2_norm(samples.iter().map(|&s| s as f64)),
    }
}

/// Root of the sum of squares.
pub fn l2_norm(samples: impl IntoIterator<Item = f64>) -> f64 {
    samples.into_iter().map(|s| s * s).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn silence_is_zero() {
        assert_eq!(chunk_intensity(RawChunk::Pcm16(&[0; 64])), 0.0);
        assert_eq!(chunk_intensity(RawChunk::Float32(&[])), 0.0);
    }

    #[test]
    fn pcm16_uses_integer_amplitudes() {
        assert_relative_eq!(chunk_intensity(RawChunk::Pcm16(&[3, -4])), 5.0);
    }

    #[test]
    fn constant_amplitude_scales_with_sqrt_len() {
        let chunk = vec![100i16; 400];
        assert_relative_eq!(chunk_intensity(RawChunk::Pcm16(&chunk)), 100.0 * 20.0);
    }

    #[test]
    fn extreme_pcm_does_not_overflow() {
        let chunk = vec![i16::MIN; 1024];
        assert_relative_eq!(
            chunk_intensity(RawChunk::Pcm16(&chunk)),
            32768.0 * 32.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn float_samples() {
        assert_relative_eq!(
            chunk_intensity(RawChunk::Float32(&[0.6, 0.8])),
            1.0,
            epsilon = 1e-6
        );
    }
}
