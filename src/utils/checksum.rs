//! Checksum utility
//!
//! `original_source/src/core/Checksum.h` exposes a hardware-accelerated
//! CRC-32C; this crate uses `sha2`'s SHA-256 instead since no CRC-32C
//! crate is present anywhere in the reference pack and a cryptographic
//! digest is the closest fit already in the dependency stack for
//! integrity-checking gateway payloads.

use sha2::{Digest, Sha256};

/// Returns the SHA-256 digest of `data`, hex-encoded.
#[must_use]
pub fn digest_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    result.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(digest_hex(b"ringbus"), digest_hex(b"ringbus"));
    }

    #[test]
    fn digest_differs_for_different_input() {
        assert_ne!(digest_hex(b"a"), digest_hex(b"b"));
    }

    #[test]
    fn digest_is_64_hex_chars() {
        assert_eq!(digest_hex(b"x").len(), 64);
    }
}
