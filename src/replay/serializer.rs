use std::io::{Read as _, Write as _};

use anyhow::Context as _;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};

use super::cassette::Cassette;

/// Encodes a cassette as a single text blob: `base64(zlib(msgpack))`.
///
/// Interaction bodies can be binary (msgpack responses, compressed payloads),
/// so the inner serialization must be a binary format; the base64 layer keeps
/// the files text-safe for version control.
pub fn serialize(cassette: &Cassette) -> anyhow::Result<String> {
    let packed = rmp_serde::to_vec(cassette).context("encode cassette as msgpack")?;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&packed)
        .context("compress cassette blob")?;
    let compressed = encoder.finish().context("finish cassette compression")?;

    Ok(STANDARD.encode(compressed))
}

pub fn deserialize(blob: &str) -> anyhow::Result<Cassette> {
    let compressed = STANDARD
        .decode(blob.trim().as_bytes())
        .context("base64-decode cassette blob")?;

    let mut packed = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .read_to_end(&mut packed)
        .context("decompress cassette blob")?;

    rmp_serde::from_slice(&packed).context("decode cassette msgpack")
}
