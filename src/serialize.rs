//! Codec for data kept in memory segments: bincode, gzip, then base64 so the result is plain
//! ASCII.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};

const BUFFER_CAPACITY: usize = 16 * 1024;

pub fn encode_segment<T: Serialize>(data: &T) -> Result<String, String> {
    let raw = bincode::serialize(data).map_err(|e| format!("bincode: {}", e))?;

    let mut encoder = GzEncoder::new(Vec::with_capacity(BUFFER_CAPACITY), Compression::best());

    encoder.write_all(&raw).map_err(|e| format!("gzip: {}", e))?;

    let compressed = encoder.finish().map_err(|e| format!("gzip: {}", e))?;

    Ok(STANDARD.encode(compressed))
}

pub fn decode_segment<T: DeserializeOwned>(data: &str) -> Result<T, String> {
    let compressed = STANDARD.decode(data.trim()).map_err(|e| format!("base64: {}", e))?;

    let mut raw = Vec::with_capacity(BUFFER_CAPACITY);

    GzDecoder::new(compressed.as_slice())
        .read_to_end(&mut raw)
        .map_err(|e| format!("gzip: {}", e))?;

    bincode::deserialize(&raw).map_err(|e| format!("bincode: {}", e))
}
