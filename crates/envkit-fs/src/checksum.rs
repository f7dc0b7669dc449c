//! Hex SHA-256 digests.
//!
//! Plugin fingerprints and lockfile content hashes are lowercase hex with no
//! algorithm prefix, so they compare as plain strings.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    let digest = Sha256::digest(data.as_ref());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}
