//! Fixed-width peer identity of a home chain node.
//!
//! Peer identifiers have a total, deterministic order (raw byte value, most
//! significant byte first).  Everything that needs a stable node sequence
//! (observer bitmap indexing, ordinal id assignment, canonical DON member
//! lists) derives it from this order.

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use crate::error::{Error, Result};

/// Number of bytes in a peer identifier.
pub const PEER_ID_LEN: usize = 32;

/// Fixed-width identifier of a node on the peer-to-peer network.
///
/// The derived `Ord` compares the raw bytes most-significant-byte first,
/// which is exactly the canonical node order used across the crate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId([u8; PEER_ID_LEN]);

impl PeerId {
    /// Create a peer id from its raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; PEER_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes of the peer id.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; PEER_ID_LEN] {
        &self.0
    }

    /// Parse a peer id from a hex string (64 hex characters, no prefix).
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid hex or is not exactly
    /// 32 bytes long.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let bytes = hex::decode(hex)
            .map_err(|err| Error::MalformedConfig(format!("peer id is not valid hex: {err}")))?;
        let bytes: [u8; PEER_ID_LEN] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            Error::MalformedConfig(format!(
                "peer id must be {PEER_ID_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl Display for PeerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl From<[u8; PEER_ID_LEN]> for PeerId {
    fn from(bytes: [u8; PEER_ID_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<u64> for PeerId {
    /// Derive a peer id from a small integer seed.
    ///
    /// The seed is placed big-endian in the least significant bytes, so the
    /// numeric order of seeds and the byte order of the derived ids agree.
    fn from(seed: u64) -> Self {
        let mut bytes = [0u8; PEER_ID_LEN];
        for (slot, byte) in bytes
            .iter_mut()
            .skip(PEER_ID_LEN - std::mem::size_of::<u64>())
            .zip(seed.to_be_bytes())
        {
            *slot = byte;
        }
        Self(bytes)
    }
}

impl FromStr for PeerId {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        Self::from_hex(input)
    }
}

/// Sort peer identifiers into the canonical node order.
///
/// The order is total and reproducible: the same input set always yields the
/// identical output sequence, ascending by raw byte value.
#[must_use]
pub fn canonical_peer_order<I>(peers: I) -> Vec<PeerId>
where I: IntoIterator<Item = PeerId> {
    let mut ordered: Vec<PeerId> = peers.into_iter().collect();
    ordered.sort_unstable();
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_ids_sort_ascending() {
        // Seeds 1..=4, deliberately shuffled on input.
        let shuffled = vec![
            PeerId::from(3),
            PeerId::from(1),
            PeerId::from(4),
            PeerId::from(2),
        ];

        let ordered = canonical_peer_order(shuffled);

        assert_eq!(
            ordered,
            vec![
                PeerId::from(1),
                PeerId::from(2),
                PeerId::from(3),
                PeerId::from(4)
            ]
        );
    }

    #[test]
    fn test_order_is_deterministic() {
        let peers = vec![PeerId::from(9), PeerId::from(7), PeerId::from(8)];

        let first = canonical_peer_order(peers.clone());
        let second = canonical_peer_order(peers);

        assert_eq!(first, second);
    }

    #[test]
    fn test_hex_round_trip() -> anyhow::Result<()> {
        let hex = "ab".repeat(PEER_ID_LEN);
        let peer = PeerId::from_hex(&hex)?;

        assert_eq!(peer.to_string(), hex);
        assert_eq!(peer, hex.parse()?);

        Ok(())
    }

    #[test]
    fn test_rejects_wrong_length() {
        let err = PeerId::from_hex("abcd");

        assert!(matches!(err, Err(Error::MalformedConfig(_))));
    }
}
