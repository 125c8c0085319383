//! Per-DON, per-plugin-type OCR configuration and its two-slot state.
//!
//! A config slot pair is keyed by `(DonId, PluginType)`.  The `candidate`
//! slot holds a proposed config, the `active` slot the one in effect; each
//! non-empty slot is identified by the digest of its content.

use minicbor::Encoder;

use crate::{
    chain_config::ChainSelector,
    digest::{digest_bytes, ConfigDigest, ZERO_DIGEST},
    error::{Error, Result},
    peer_id::PeerId,
    plugin_type::PluginType,
};

/// A single node entry of an OCR configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrNode {
    /// Peer id of the node.
    pub peer_id: PeerId,
    /// Key the node signs observations with.
    pub signer_key: Vec<u8>,
    /// Key the node transmits reports with.
    pub transmitter_key: Vec<u8>,
}

/// One OCR configuration value for a `(DON, plugin type)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrConfig {
    /// Plugin type this config is for.
    pub plugin_type: PluginType,
    /// Chain the configured DON serves.
    pub chain_selector: ChainSelector,
    /// Maximum tolerated count of faulty DON members.
    pub f_role_don: u8,
    /// Version of the offchain configuration format.
    pub offchain_config_version: u64,
    /// Address of the offramp contract on the destination chain.
    pub offramp_address: Vec<u8>,
    /// Address of the RMN home contract.
    pub rmn_home_address: Vec<u8>,
    /// Participating nodes, in signing order.
    pub nodes: Vec<OcrNode>,
    /// Opaque offchain configuration bytes.
    pub offchain_config: Vec<u8>,
}

impl OcrConfig {
    /// Compute the content digest of this config.
    ///
    /// The digest is BLAKE2b-256 over the canonical CBOR encoding produced by
    /// [`Self::canonical_bytes`], so it depends on every field and on nothing
    /// else.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be encoded.
    pub fn digest(&self) -> Result<ConfigDigest> {
        Ok(digest_bytes(&self.canonical_bytes()?))
    }

    /// The canonical CBOR encoding of this config.
    ///
    /// Fields are always written in the same fixed order, so in-memory field
    /// ordering can never influence the encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer: Vec<u8> = Vec::new();
        let mut encoder = Encoder::new(&mut buffer);

        encoder
            .array(8)?
            .u8(self.plugin_type.wire_value())?
            .u64(self.chain_selector.get())?
            .u8(self.f_role_don)?
            .u64(self.offchain_config_version)?
            .bytes(&self.offramp_address)?
            .bytes(&self.rmn_home_address)?;
        encoder.array(self.nodes.len() as u64)?;
        for node in &self.nodes {
            encoder
                .array(3)?
                .bytes(node.peer_id.as_bytes())?
                .bytes(&node.signer_key)?
                .bytes(&node.transmitter_key)?;
        }
        encoder.bytes(&self.offchain_config)?;

        Ok(buffer)
    }

    /// Validate this config before it can become a candidate.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is for the wrong plugin type, names no
    /// chain, has a fault threshold its node set cannot tolerate, repeats a
    /// peer id, or is missing an address.
    pub fn validate(&self, plugin_type: PluginType) -> Result<()> {
        if self.plugin_type != plugin_type {
            return Err(Error::MalformedConfig(format!(
                "config is for plugin type {}, submitted for {plugin_type}",
                self.plugin_type
            )));
        }
        if self.chain_selector.get() == 0 {
            return Err(Error::MalformedConfig(
                "chain selector must not be zero".to_string(),
            ));
        }
        if self.f_role_don == 0 {
            return Err(Error::MalformedConfig("f must be positive".to_string()));
        }
        let needed = 3 * usize::from(self.f_role_don) + 1;
        if self.nodes.len() < needed {
            return Err(Error::MalformedConfig(format!(
                "{} nodes cannot tolerate f {}, need at least {needed}",
                self.nodes.len(),
                self.f_role_don
            )));
        }
        let mut peers: Vec<PeerId> = self.nodes.iter().map(|node| node.peer_id).collect();
        peers.sort_unstable();
        peers.dedup();
        if peers.len() != self.nodes.len() {
            return Err(Error::MalformedConfig(
                "duplicate peer id in node list".to_string(),
            ));
        }
        if self.offramp_address.is_empty() {
            return Err(Error::MalformedConfig(
                "offramp address must not be empty".to_string(),
            ));
        }
        if self.rmn_home_address.is_empty() {
            return Err(Error::MalformedConfig(
                "RMN home address must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// A config value together with the digest identifying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredConfig {
    /// Digest of `config`'s content.
    pub digest: ConfigDigest,
    /// The stored config value.
    pub config: OcrConfig,
}

/// The two config slots of one `(DON, plugin type)` pair.
///
/// At most one candidate and at most one active config exist at any time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigSlots {
    /// The config currently in effect, if any.
    pub active: Option<StoredConfig>,
    /// The proposed-but-not-live config, if any.
    pub candidate: Option<StoredConfig>,
}

impl ConfigSlots {
    /// Digest of the active slot; the zero digest when empty.
    #[must_use]
    pub fn active_digest(&self) -> ConfigDigest {
        self.active
            .as_ref()
            .map_or(ZERO_DIGEST, |stored| stored.digest)
    }

    /// Digest of the candidate slot; the zero digest when empty.
    #[must_use]
    pub fn candidate_digest(&self) -> ConfigDigest {
        self.candidate
            .as_ref()
            .map_or(ZERO_DIGEST, |stored| stored.digest)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A valid config with `3f + 1` distinct nodes.
    pub(crate) fn test_config(plugin_type: PluginType, f_role_don: u8) -> OcrConfig {
        let node_count = u64::from(f_role_don) * 3 + 1;
        let nodes = (1..=node_count)
            .map(|seed| OcrNode {
                peer_id: PeerId::from(seed),
                signer_key: vec![0x51; 20],
                transmitter_key: vec![0x71; 20],
            })
            .collect();

        OcrConfig {
            plugin_type,
            chain_selector: ChainSelector::new(1),
            f_role_don,
            offchain_config_version: 30,
            offramp_address: vec![0x0f; 20],
            rmn_home_address: vec![0x1f; 20],
            nodes,
            offchain_config: b"offchain config".to_vec(),
        }
    }

    #[test]
    fn test_digest_is_content_addressed() -> anyhow::Result<()> {
        let config = test_config(PluginType::Commit, 1);
        let same_content = test_config(PluginType::Commit, 1);

        assert_eq!(config.digest()?, same_content.digest()?);

        Ok(())
    }

    #[test]
    fn test_digest_changes_with_any_field() -> anyhow::Result<()> {
        let base = test_config(PluginType::Commit, 1);
        let base_digest = base.digest()?;

        let mut changed = base.clone();
        changed.offchain_config_version += 1;
        assert_ne!(changed.digest()?, base_digest);

        let mut changed = base.clone();
        changed.plugin_type = PluginType::Exec;
        assert_ne!(changed.digest()?, base_digest);

        let mut changed = base.clone();
        changed.offchain_config.push(0);
        assert_ne!(changed.digest()?, base_digest);

        let mut changed = base;
        changed.nodes.reverse();
        assert_ne!(changed.digest()?, base_digest);

        Ok(())
    }

    #[test]
    fn test_digest_is_never_zero() -> anyhow::Result<()> {
        assert!(!test_config(PluginType::Exec, 1).digest()?.is_zero());

        Ok(())
    }

    #[test]
    fn test_validate_accepts_well_formed_config() {
        assert!(test_config(PluginType::Commit, 1)
            .validate(PluginType::Commit)
            .is_ok());
    }

    #[test]
    fn test_validate_rejects_plugin_type_mismatch() {
        assert!(test_config(PluginType::Commit, 1)
            .validate(PluginType::Exec)
            .is_err());
    }

    #[test]
    fn test_validate_rejects_undersized_node_set() {
        let mut config = test_config(PluginType::Commit, 1);
        config.nodes.pop();

        assert!(config.validate(PluginType::Commit).is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_peers() {
        let mut config = test_config(PluginType::Commit, 1);
        if let Some(first) = config.nodes.first().cloned() {
            config.nodes.push(first);
        }
        // Keep 3f + 1 satisfied while introducing the duplicate.
        config.f_role_don = 1;

        assert!(config.validate(PluginType::Commit).is_err());
    }

    #[test]
    fn test_empty_slots_have_zero_digests() {
        let slots = ConfigSlots::default();

        assert!(slots.active_digest().is_zero());
        assert!(slots.candidate_digest().is_zero());
    }
}
