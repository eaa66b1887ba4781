//! Payload decoding helpers shared by the recovery strategies.

use std::io::Read;

use base64::alphabet;
use base64::engine::general_purpose::GeneralPurpose;
use base64::engine::{DecodePaddingMode, GeneralPurposeConfig};
use base64::Engine;
use flate2::read::ZlibDecoder;

/// Inflated payloads larger than this are discarded as decompression bombs.
pub(crate) const INFLATE_LIMIT: u64 = 8 * 1024 * 1024;

/// Standard alphabet with padding optional. Embedded runs are routinely cut
/// off mid-quantum, so strict padding would reject most real payloads.
const FORGIVING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode a base64 run, truncating to the last complete quantum first.
pub(crate) fn decode_base64_run(run: &[u8]) -> Option<Vec<u8>> {
    let usable = run.len() - run.len() % 4;
    if usable == 0 {
        return None;
    }
    FORGIVING.decode(&run[..usable]).ok()
}

/// Inflate a zlib stream, refusing outputs beyond `limit` bytes.
pub(crate) fn inflate_limited(data: &[u8], limit: u64) -> Option<Vec<u8>> {
    let mut inflated = Vec::new();
    let mut decoder = ZlibDecoder::new(data).take(limit.saturating_add(1));
    decoder.read_to_end(&mut inflated).ok()?;
    if inflated.len() as u64 > limit {
        return None;
    }
    Some(inflated)
}
