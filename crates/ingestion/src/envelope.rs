//! Compression envelopes around delivered payloads.

use std::io::Read;
use std::path::Path;

use bytes::Bytes;

use crate::error::RecordError;

/// Envelope recognised from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    Plain,
    Gzip,
    Bzip2,
}

impl Envelope {
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("gz") => Envelope::Gzip,
            Some(ext) if ext.eq_ignore_ascii_case("bz2") => Envelope::Bzip2,
            _ => Envelope::Plain,
        }
    }
}

/// Inflate gzip-compressed data.
pub fn decompress_gzip(data: &[u8]) -> Result<Bytes, RecordError> {
    let mut decoder = flate2::read::GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| RecordError::Envelope(format!("gzip: {}", e)))?;
    Ok(Bytes::from(decompressed))
}

/// Inflate bzip2-compressed data, the format stations deliver.
pub fn decompress_bzip2(data: &[u8]) -> Result<Bytes, RecordError> {
    let mut decoder = bzip2::read::BzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| RecordError::Envelope(format!("bz2: {}", e)))?;
    Ok(Bytes::from(decompressed))
}

/// Strip the envelope implied by `path` from `data`.
pub fn open_envelope(path: &Path, data: Bytes) -> Result<Bytes, RecordError> {
    match Envelope::detect(path) {
        Envelope::Plain => Ok(data),
        Envelope::Gzip => decompress_gzip(&data),
        Envelope::Bzip2 => decompress_bzip2(&data),
    }
}
