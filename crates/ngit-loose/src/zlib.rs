//! Zlib wrapping for object storage.
//!
//! Both directions use the zlib container format, not raw deflate.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

/// Inflate a complete zlib stream.
///
/// Trailing bytes after the stream end are ignored; zlib consumes only
/// what the stream needs, which is how pack entries are decoded in place.
pub fn inflate(compressed: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(compressed);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Deflate bytes at the given compression level.
pub fn deflate(data: &[u8], level: flate2::Compression) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), level);
    encoder.write_all(data)?;
    encoder.finish()
}
