//! Logical node-info records derived from the RMN home roster.
//!
//! Projection is a pure function: it owns no state and is recomputed from
//! scratch on every poll cycle.

use std::{
    collections::{BTreeMap, HashSet},
    fmt::{Display, Formatter},
};

use ed25519_dalek::VerifyingKey;

use crate::{
    chain_config::{ChainConfig, ChainSelector},
    error::{Error, Result},
    peer_id::{canonical_peer_order, PeerId},
    rmn_home::{RmnHomeDynamicConfig, RmnHomeStaticConfig},
};

/// Ordinal identifier of a node, assigned by canonical peer order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Create a node id from its raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw value of the node id.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical info record of a single roster node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    /// Ordinal identifier, stable for a given roster.
    pub id: NodeId,
    /// Peer id of the node.
    pub peer_id: PeerId,
    /// Source chains this node either observes or reads.
    pub supported_source_chains: HashSet<ChainSelector>,
    /// Offchain public key of the node.
    pub offchain_public_key: VerifyingKey,
}

/// Project the RMN home roster into logical node-info records.
///
/// Ordinal ids follow canonical peer order.  A node's supported source
/// chains are the union of the chains whose observer bitmap selects it (by
/// its roster index) and the chains whose reader set contains it.
///
/// # Errors
///
/// Returns an error if a roster entry's offchain public key is not a valid
/// Ed25519 public key.
pub fn project_node_info(
    static_config: &RmnHomeStaticConfig, dynamic_config: &RmnHomeDynamicConfig,
    chain_configs: &BTreeMap<ChainSelector, ChainConfig>,
) -> Result<Vec<NodeInfo>> {
    let ordered = canonical_peer_order(static_config.nodes.iter().map(|node| node.peer_id));
    let ordinals: BTreeMap<PeerId, u32> = ordered
        .into_iter()
        .enumerate()
        .map(|(position, peer_id)| (peer_id, position as u32))
        .collect();

    let mut nodes = Vec::with_capacity(static_config.nodes.len());
    for (index, node) in static_config.nodes.iter().enumerate() {
        let offchain_public_key =
            VerifyingKey::from_bytes(&node.offchain_public_key).map_err(|err| {
                Error::MalformedConfig(format!(
                    "node {}: invalid offchain public key: {err}",
                    node.peer_id
                ))
            })?;

        let mut supported_source_chains = HashSet::new();
        for source_chain in &dynamic_config.source_chains {
            if source_chain.observer_bitmap.bit(index as u64) {
                supported_source_chains.insert(source_chain.chain_selector);
            }
        }
        for (selector, chain_config) in chain_configs {
            if chain_config.readers.contains(&node.peer_id) {
                supported_source_chains.insert(*selector);
            }
        }

        let id = ordinals
            .get(&node.peer_id)
            .copied()
            .map(NodeId::new)
            .ok_or(Error::Internal)?;

        nodes.push(NodeInfo {
            id,
            peer_id: node.peer_id,
            supported_source_chains,
            offchain_public_key,
        });
    }

    nodes.sort_unstable_by_key(|node| node.id);

    Ok(nodes)
}

#[cfg(test)]
pub(crate) mod tests {
    use ed25519_dalek::SigningKey;
    use num_bigint::BigUint;

    use super::*;
    use crate::{peer_id::PEER_ID_LEN, rmn_home::RmnHomeConfigBuilder};

    /// A valid Ed25519 public key derived from a fixed seed.
    pub(crate) fn test_public_key(seed: u8) -> [u8; PEER_ID_LEN] {
        SigningKey::from_bytes(&[seed; PEER_ID_LEN])
            .verifying_key()
            .to_bytes()
    }

    #[test]
    fn test_single_observer_node() -> anyhow::Result<()> {
        let peer_id = PeerId::from_hex(&"ab".repeat(PEER_ID_LEN))?;
        let builder = RmnHomeConfigBuilder::new()
            .node(peer_id, test_public_key(1))
            .source_chain(ChainSelector::new(1), 0, BigUint::from(1u8));

        let nodes = project_node_info(
            &builder.build_static(),
            &builder.build_dynamic(),
            &BTreeMap::new(),
        )?;

        assert_eq!(nodes.len(), 1);
        let node = nodes.first().ok_or_else(|| anyhow::anyhow!("no node"))?;
        assert_eq!(node.id, NodeId::new(0));
        assert_eq!(node.peer_id, peer_id);
        assert_eq!(
            node.supported_source_chains,
            HashSet::from([ChainSelector::new(1)])
        );

        Ok(())
    }

    #[test]
    fn test_ordinals_follow_canonical_order() -> anyhow::Result<()> {
        // Roster order 2, 1.  Ordinals must still be assigned 1 -> 0, 2 -> 1.
        let builder = RmnHomeConfigBuilder::new()
            .node(PeerId::from(2), test_public_key(2))
            .node(PeerId::from(1), test_public_key(1));

        let nodes = project_node_info(
            &builder.build_static(),
            &builder.build_dynamic(),
            &BTreeMap::new(),
        )?;

        let ids: Vec<(NodeId, PeerId)> = nodes.iter().map(|node| (node.id, node.peer_id)).collect();
        assert_eq!(
            ids,
            vec![
                (NodeId::new(0), PeerId::from(1)),
                (NodeId::new(1), PeerId::from(2))
            ]
        );

        Ok(())
    }

    #[test]
    fn test_reader_sets_count_as_supported_chains() -> anyhow::Result<()> {
        let builder = RmnHomeConfigBuilder::new()
            .node(PeerId::from(1), test_public_key(1))
            .node(PeerId::from(2), test_public_key(2))
            // Only node 1 (bit 0) observes chain 7.
            .source_chain(ChainSelector::new(7), 0, BigUint::from(1u8));

        let chain_configs = BTreeMap::from([(
            ChainSelector::new(9),
            ChainConfig {
                readers: vec![PeerId::from(2)],
                f_chain: 1,
                config: Vec::new(),
            },
        )]);

        let nodes = project_node_info(
            &builder.build_static(),
            &builder.build_dynamic(),
            &chain_configs,
        )?;

        let chains: Vec<&HashSet<ChainSelector>> = nodes
            .iter()
            .map(|node| &node.supported_source_chains)
            .collect();
        assert_eq!(
            chains,
            vec![
                &HashSet::from([ChainSelector::new(7)]),
                &HashSet::from([ChainSelector::new(9)])
            ]
        );

        Ok(())
    }

    #[test]
    fn test_invalid_public_key_is_malformed() -> anyhow::Result<()> {
        // Roughly half of all 32-byte values do not decode to a curve point,
        // so scanning the first byte always finds one.
        let invalid_key = (0u8..=u8::MAX)
            .map(|byte| {
                let mut key = [0u8; PEER_ID_LEN];
                if let Some(first) = key.first_mut() {
                    *first = byte;
                }
                key
            })
            .find(|key| VerifyingKey::from_bytes(key).is_err())
            .ok_or_else(|| anyhow::anyhow!("no invalid key found"))?;

        let builder = RmnHomeConfigBuilder::new().node(PeerId::from(1), invalid_key);

        let result = project_node_info(
            &builder.build_static(),
            &builder.build_dynamic(),
            &BTreeMap::new(),
        );

        assert!(matches!(result, Err(Error::MalformedConfig(_))));

        Ok(())
    }
}
