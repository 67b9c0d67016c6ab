//! Content fingerprints for reference letters and provider cache keys.

use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

/// Lower-case hex SHA-256 of raw bytes.
pub fn sha256_hex(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(bytes.as_ref()))
}

/// Deduplication key for a letter: SHA-256 over the NFC form of the extracted text.
///
/// No trimming and no case folding; two letters that differ only in
/// composed vs decomposed accents share a fingerprint, anything else does not.
pub fn fingerprint(text: &str) -> String {
    let normalized: String = text.nfc().collect();
    sha256_hex(normalized.as_bytes())
}
