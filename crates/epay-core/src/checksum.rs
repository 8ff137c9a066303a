use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::CoreError;

type HmacSha1 = Hmac<Sha1>;

/// Length of a hex-encoded HMAC-SHA1 checksum.
pub const CHECKSUM_HEX_LEN: usize = 40;

fn keyed(secret: &[u8]) -> HmacSha1 {
    match HmacSha1::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC accepts keys of any length"),
    }
}

/// HMAC-SHA1 of `data` keyed with `secret`, as lowercase hex.
pub fn sign(data: &[u8], secret: &[u8]) -> String {
    let mut mac = keyed(secret);
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

/// Check `candidate` against the checksum of `data`.
///
/// Only the exact lowercase hex form is accepted. The digest comparison runs
/// in constant time.
pub fn verify(data: &[u8], secret: &[u8], candidate: &str) -> bool {
    if candidate.len() != CHECKSUM_HEX_LEN
        || !candidate.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    {
        return false;
    }
    let Ok(tag) = hex::decode(candidate) else {
        return false;
    };
    let mut mac = keyed(secret);
    mac.update(data);
    mac.verify_slice(&tag).is_ok()
}

/// Like [`verify`], but reports both values on mismatch for auditing.
pub fn verify_checksum(data: &[u8], secret: &[u8], candidate: &str) -> Result<(), CoreError> {
    if verify(data, secret, candidate) {
        Ok(())
    } else {
        Err(CoreError::ChecksumMismatch {
            expected: sign(data, secret),
            received: candidate.to_string(),
        })
    }
}
