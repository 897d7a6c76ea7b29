//! Compression utility
//!
//! Grounded in `original_source/src/net/compression.h`'s
//! `compress`/`uncompress` over codec-tagged `IOBuf`s, reimplemented
//! over `flate2`'s zlib codec (the gateway's only supported codec in
//! this crate; the original's LZ4/Snappy/LZMA2 alternatives are not
//! reimplemented).

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

/// Zlib-compresses `data` at the default compression level.
///
/// # Errors
/// Returns the underlying I/O error if the in-memory encoder fails.
pub fn compress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Decompresses a zlib-compressed buffer produced by [`compress`].
///
/// # Errors
/// Returns the underlying I/O error if `data` is not valid zlib.
pub fn uncompress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
