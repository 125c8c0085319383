//! Content digests used as optimistic-concurrency guards.
//!
//! A digest is BLAKE2b-256 over the canonical CBOR encoding of a config
//! value.  Two configs with identical semantic content always produce the
//! identical digest, no matter how they were constructed in memory.

use std::fmt::{Display, Formatter};

use blake2b_simd::Params;

/// Number of bytes in a config digest.
pub const CONFIG_DIGEST_LEN: usize = 32;

/// Deterministic content hash identifying a configuration value.
///
/// The all-zero digest is reserved: it is the digest of an *empty* slot and
/// is never produced by hashing real content.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ConfigDigest([u8; CONFIG_DIGEST_LEN]);

/// The digest of an empty config slot.
pub const ZERO_DIGEST: ConfigDigest = ConfigDigest([0u8; CONFIG_DIGEST_LEN]);

impl ConfigDigest {
    /// Create a digest from its raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; CONFIG_DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes of the digest.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; CONFIG_DIGEST_LEN] {
        &self.0
    }

    /// Is this the reserved empty-slot digest?
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == ZERO_DIGEST
    }
}

impl Default for ConfigDigest {
    /// The default digest is the empty-slot digest.
    fn default() -> Self {
        ZERO_DIGEST
    }
}

impl Display for ConfigDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl From<[u8; CONFIG_DIGEST_LEN]> for ConfigDigest {
    fn from(bytes: [u8; CONFIG_DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}

/// Hash the given canonical encoding down to a config digest.
pub(crate) fn digest_bytes(value: &[u8]) -> ConfigDigest {
    let hash = Params::new().hash_length(CONFIG_DIGEST_LEN).hash(value);
    let mut bytes = [0u8; CONFIG_DIGEST_LEN];
    for (slot, byte) in bytes.iter_mut().zip(hash.as_bytes()) {
        *slot = *byte;
    }
    ConfigDigest(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_digest_is_default() {
        assert_eq!(ConfigDigest::default(), ZERO_DIGEST);
        assert!(ZERO_DIGEST.is_zero());
    }

    #[test]
    fn test_hashing_never_yields_zero() {
        // Hash of anything, including empty input, is not the reserved digest.
        assert!(!digest_bytes(&[]).is_zero());
        assert!(!digest_bytes(b"config").is_zero());
    }

    #[test]
    fn test_display_is_prefixed_hex() {
        let digest = ConfigDigest::new([0xab; CONFIG_DIGEST_LEN]);

        assert_eq!(digest.to_string(), format!("0x{}", "ab".repeat(32)));
    }
}
