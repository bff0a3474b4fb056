//! DEFLATE wrappers for the transfer format
//!
//! The transfer format compresses the message following the plain
//! version header with raw DEFLATE (no zlib wrapper). Streams are scoped
//! here: opened, fully drained or written, and finished on every path.

use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::error::CodecError;

/// Compress a payload with raw DEFLATE.
pub fn compress(bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

/// Fully drain a raw-DEFLATE stream into memory.
pub fn decompress<R: Read>(reader: R) -> Result<Vec<u8>, CodecError> {
    let mut decoder = DeflateDecoder::new(reader);
    let mut bytes = Vec::new();
    decoder.read_to_end(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_compress_roundtrip() {
        let payload: Vec<u8> = (0..2048u32).map(|i| (i % 251) as u8).collect();
        let compressed = compress(&payload).unwrap();
        assert!(compressed.len() < payload.len());
        let restored = decompress(compressed.as_slice()).unwrap();
        assert_eq!(restored, payload);
    }

    #[test]
    fn test_garbage_stream_is_an_io_error() {
        let result = decompress(&[0xDE, 0xAD, 0xBE, 0xEF][..]);
        assert!(matches!(result, Err(CodecError::Io(_))));
    }
}
