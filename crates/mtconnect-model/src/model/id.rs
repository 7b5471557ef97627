//! Identifier helpers.
//!
//! Devices are identified by a UUID. Devices that do not carry one get a
//! name-derived UUID so repeated loads of the same model agree.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Domain separator for device UUID derivation.
const DEVICE_UUID_PREFIX: &[u8] = b"mtconnect:device:";

/// Derives a version 8 UUID from input bytes using SHA-256.
///
/// ```text
/// hash = SHA-256(input_bytes)[0:16]
/// hash[6] = (hash[6] & 0x0F) | 0x80  // version 8
/// hash[8] = (hash[8] & 0x3F) | 0x80  // RFC 4122 variant
/// ```
pub fn derived_uuid(input: &[u8]) -> Uuid {
    let hash = Sha256::digest(input);
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    bytes[6] = (bytes[6] & 0x0F) | 0x80;
    bytes[8] = (bytes[8] & 0x3F) | 0x80;

    Uuid::from_bytes(bytes)
}

/// Derives the UUID of a device from its name.
pub fn device_uuid(name: &str) -> String {
    let mut input = Vec::with_capacity(DEVICE_UUID_PREFIX.len() + name.len());
    input.extend_from_slice(DEVICE_UUID_PREFIX);
    input.extend_from_slice(name.as_bytes());
    derived_uuid(&input).hyphenated().to_string()
}

/// Parses a UUID with or without hyphens.
pub fn parse_uuid(s: &str) -> Option<Uuid> {
    Uuid::try_parse(s).ok()
}

/// Hex-encoded SHA-256 digest truncated to 16 bytes.
pub fn content_hash(input: &[u8]) -> String {
    let hash = Sha256::digest(input);
    let mut s = String::with_capacity(32);
    for byte in &hash[..16] {
        s.push_str(&format!("{:02x}", byte));
    }
    s
}
