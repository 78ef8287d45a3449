//! Gzip codec for interleaved intensity/alpha cell streams.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

/// Codec failures. Both are per-fetch data errors: the offending payload is
/// dropped and the submap stays stale until the next metadata update.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to decompress cell data: {0}")]
    Decompression(#[from] std::io::Error),
    #[error("cell payload is {actual} bytes, expected {expected}")]
    PayloadSizeMismatch { expected: usize, actual: usize },
}

/// Decoded cell channels, split out of the interleaved stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileCells {
    pub intensity: Vec<u8>,
    pub alpha: Vec<u8>,
}

/// Decompress `compressed` and split it into intensity and alpha channels.
///
/// The decompressed stream must be exactly `2 * width * height` bytes,
/// interleaved (intensity, alpha) per pixel in row-major order.
pub fn decode_cells(compressed: &[u8], width: u32, height: u32) -> Result<TileCells, CodecError> {
    let mut cells = Vec::new();
    GzDecoder::new(compressed).read_to_end(&mut cells)?;

    let expected = 2 * width as usize * height as usize;
    if cells.len() != expected {
        return Err(CodecError::PayloadSizeMismatch {
            expected,
            actual: cells.len(),
        });
    }

    let pixels = expected / 2;
    let mut intensity = Vec::with_capacity(pixels);
    let mut alpha = Vec::with_capacity(pixels);
    for pair in cells.chunks_exact(2) {
        intensity.push(pair[0]);
        alpha.push(pair[1]);
    }

    Ok(TileCells { intensity, alpha })
}

/// Interleave and gzip two equal-length channels (the exact inverse of
/// [`decode_cells`]). Used by the simulated map service.
pub fn encode_cells(intensity: &[u8], alpha: &[u8]) -> std::io::Result<Vec<u8>> {
    debug_assert_eq!(intensity.len(), alpha.len());

    let mut interleaved = Vec::with_capacity(intensity.len() * 2);
    for (&i, &a) in intensity.iter().zip(alpha.iter()) {
        interleaved.push(i);
        interleaved.push(a);
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&interleaved)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_reproduces_channels() {
        let intensity: Vec<u8> = (0..=255).collect();
        let alpha: Vec<u8> = (0..=255).rev().collect();

        let compressed = encode_cells(&intensity, &alpha).unwrap();
        let cells = decode_cells(&compressed, 16, 16).unwrap();

        assert_eq!(cells.intensity, intensity);
        assert_eq!(cells.alpha, alpha);
    }

    #[test]
    fn test_size_mismatch_is_rejected() {
        // 3 pixels compressed, but declared as 2x2.
        let compressed = encode_cells(&[1, 2, 3], &[4, 5, 6]).unwrap();
        let err = decode_cells(&compressed, 2, 2).unwrap_err();

        match err {
            CodecError::PayloadSizeMismatch { expected, actual } => {
                assert_eq!(expected, 8);
                assert_eq!(actual, 6);
            }
            other => panic!("expected PayloadSizeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_truncated_stream_is_rejected() {
        let compressed = encode_cells(&[1, 2, 3, 4], &[5, 6, 7, 8]).unwrap();
        let truncated = &compressed[..compressed.len() - 3];

        assert!(matches!(
            decode_cells(truncated, 2, 2),
            Err(CodecError::Decompression(_))
        ));
    }

    #[test]
    fn test_garbage_stream_is_rejected() {
        let garbage = [0x00, 0x11, 0x22, 0x33, 0x44];
        assert!(matches!(
            decode_cells(&garbage, 1, 1),
            Err(CodecError::Decompression(_))
        ));
    }

    #[test]
    fn test_empty_tile_roundtrip() {
        let compressed = encode_cells(&[], &[]).unwrap();
        let cells = decode_cells(&compressed, 0, 0).unwrap();
        assert!(cells.intensity.is_empty());
        assert!(cells.alpha.is_empty());
    }
}
