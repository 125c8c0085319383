//! Static and dynamic configuration of the risk-management overlay network.
//!
//! The static config fixes the node roster; its list order is the
//! authoritative bit-index mapping for every observer bitmap.  The dynamic
//! config selects, per source chain, which roster nodes observe it.

use num_bigint::BigUint;

use crate::{
    chain_config::ChainSelector,
    error::{Error, Result},
    peer_id::{PeerId, PEER_ID_LEN},
};

/// One roster entry of the risk-management network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RmnHomeNode {
    /// Peer id of the node.
    pub peer_id: PeerId,
    /// Raw offchain public key bytes of the node.
    pub offchain_public_key: [u8; PEER_ID_LEN],
}

/// The node roster of the risk-management network.
///
/// The order of `nodes` is load-bearing: bit *k* of any observer bitmap
/// paired with this config refers to `nodes[k]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RmnHomeStaticConfig {
    /// Roster entries, in bit-index order.
    pub nodes: Vec<RmnHomeNode>,
    /// Opaque offchain configuration bytes.
    pub offchain_config: Vec<u8>,
}

/// Observer selection for a single source chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RmnHomeSourceChain {
    /// The observed source chain.
    pub chain_selector: ChainSelector,
    /// Maximum tolerated count of faulty observers on this chain.
    pub f_observe: u64,
    /// Bit *k* set means the node at roster index *k* observes this chain.
    pub observer_bitmap: BigUint,
}

/// Per-source-chain observer configuration of the risk-management network.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RmnHomeDynamicConfig {
    /// Observer selections, one per observed source chain.
    pub source_chains: Vec<RmnHomeSourceChain>,
    /// Opaque offchain configuration bytes.
    pub offchain_config: Vec<u8>,
}

/// Builder assembling the static and dynamic RMN home config records.
///
/// Insertion order is preserved exactly; for nodes it fixes the observer
/// bitmap bit indices.  The builder itself stays permissive: the Byzantine
/// observer-count contract is checked where configs are accepted, not here.
#[derive(Debug, Clone, Default)]
pub struct RmnHomeConfigBuilder {
    /// Roster entries added so far, in insertion order.
    nodes: Vec<RmnHomeNode>,
    /// Source chain entries added so far, in insertion order.
    source_chains: Vec<RmnHomeSourceChain>,
    /// Offchain config bytes for the static record.
    static_offchain_config: Vec<u8>,
    /// Offchain config bytes for the dynamic record.
    dynamic_offchain_config: Vec<u8>,
}

impl RmnHomeConfigBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a roster node.  Its bit index is the number of nodes added
    /// before it.
    #[must_use]
    pub fn node(mut self, peer_id: PeerId, offchain_public_key: [u8; PEER_ID_LEN]) -> Self {
        self.nodes.push(RmnHomeNode {
            peer_id,
            offchain_public_key,
        });
        self
    }

    /// Append an observer selection for a source chain.
    #[must_use]
    pub fn source_chain(
        mut self, chain_selector: ChainSelector, f_observe: u64, observer_bitmap: BigUint,
    ) -> Self {
        self.source_chains.push(RmnHomeSourceChain {
            chain_selector,
            f_observe,
            observer_bitmap,
        });
        self
    }

    /// Sets the opaque offchain config bytes of the static record.
    #[must_use]
    pub fn static_offchain_config(mut self, config: Vec<u8>) -> Self {
        self.static_offchain_config = config;
        self
    }

    /// Sets the opaque offchain config bytes of the dynamic record.
    #[must_use]
    pub fn dynamic_offchain_config(mut self, config: Vec<u8>) -> Self {
        self.dynamic_offchain_config = config;
        self
    }

    /// Build the static config record.
    #[must_use]
    pub fn build_static(&self) -> RmnHomeStaticConfig {
        RmnHomeStaticConfig {
            nodes: self.nodes.clone(),
            offchain_config: self.static_offchain_config.clone(),
        }
    }

    /// Build the dynamic config record.
    #[must_use]
    pub fn build_dynamic(&self) -> RmnHomeDynamicConfig {
        RmnHomeDynamicConfig {
            source_chains: self.source_chains.clone(),
            offchain_config: self.dynamic_offchain_config.clone(),
        }
    }
}

/// Number of observers selected by a bitmap.
pub(crate) fn observer_count(bitmap: &BigUint) -> u64 {
    bitmap
        .iter_u32_digits()
        .map(|digit| u64::from(digit.count_ones()))
        .sum()
}

/// Validate a static/dynamic config pair at its acceptance boundary.
///
/// # Errors
///
/// Returns an error if the roster repeats a peer id, a bitmap addresses a
/// bit beyond the roster, or a source chain's observer count cannot tolerate
/// its `f_observe`.
pub(crate) fn validate_rmn_home(
    static_config: &RmnHomeStaticConfig, dynamic_config: &RmnHomeDynamicConfig,
) -> Result<()> {
    let mut peers: Vec<PeerId> = static_config
        .nodes
        .iter()
        .map(|node| node.peer_id)
        .collect();
    peers.sort_unstable();
    peers.dedup();
    if peers.len() != static_config.nodes.len() {
        return Err(Error::MalformedConfig(
            "duplicate peer id in RMN home roster".to_string(),
        ));
    }

    let roster_len = static_config.nodes.len() as u64;
    for source_chain in &dynamic_config.source_chains {
        if source_chain.chain_selector.get() == 0 {
            return Err(Error::MalformedConfig(
                "chain selector must not be zero".to_string(),
            ));
        }
        if source_chain.observer_bitmap.bits() > roster_len {
            return Err(Error::MalformedConfig(format!(
                "chain {}: observer bitmap addresses a node beyond the {roster_len}-node roster",
                source_chain.chain_selector
            )));
        }
        let observers = observer_count(&source_chain.observer_bitmap);
        let needed = source_chain
            .f_observe
            .saturating_mul(2)
            .saturating_add(1);
        if observers < needed {
            return Err(Error::MalformedConfig(format!(
                "chain {}: {observers} observers cannot tolerate fObserve {}, need at least {needed}",
                source_chain.chain_selector, source_chain.f_observe
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_preserves_insertion_order() {
        // Deliberately NOT canonical peer order.
        let builder = RmnHomeConfigBuilder::new()
            .node(PeerId::from(9), [9; PEER_ID_LEN])
            .node(PeerId::from(1), [1; PEER_ID_LEN])
            .node(PeerId::from(5), [5; PEER_ID_LEN]);

        let static_config = builder.build_static();
        let peers: Vec<PeerId> = static_config
            .nodes
            .iter()
            .map(|node| node.peer_id)
            .collect();

        assert_eq!(
            peers,
            vec![PeerId::from(9), PeerId::from(1), PeerId::from(5)]
        );
    }

    #[test]
    fn test_observer_count() {
        assert_eq!(observer_count(&BigUint::from(0u8)), 0);
        assert_eq!(observer_count(&BigUint::from(0b1011u8)), 3);
        assert_eq!(observer_count(&(BigUint::from(1u8) << 130usize)), 1);
    }

    #[test]
    fn test_validate_accepts_tolerant_observer_set() {
        let builder = RmnHomeConfigBuilder::new()
            .node(PeerId::from(1), [1; PEER_ID_LEN])
            .node(PeerId::from(2), [2; PEER_ID_LEN])
            .node(PeerId::from(3), [3; PEER_ID_LEN])
            .source_chain(ChainSelector::new(1), 1, BigUint::from(0b111u8));

        assert!(validate_rmn_home(&builder.build_static(), &builder.build_dynamic()).is_ok());
    }

    #[test]
    fn test_validate_rejects_too_few_observers() {
        let builder = RmnHomeConfigBuilder::new()
            .node(PeerId::from(1), [1; PEER_ID_LEN])
            .node(PeerId::from(2), [2; PEER_ID_LEN])
            .source_chain(ChainSelector::new(1), 1, BigUint::from(0b11u8));

        assert!(matches!(
            validate_rmn_home(&builder.build_static(), &builder.build_dynamic()),
            Err(Error::MalformedConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bit_beyond_roster() {
        let builder = RmnHomeConfigBuilder::new()
            .node(PeerId::from(1), [1; PEER_ID_LEN])
            .source_chain(ChainSelector::new(1), 0, BigUint::from(0b10u8));

        assert!(validate_rmn_home(&builder.build_static(), &builder.build_dynamic()).is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_roster_entry() {
        let builder = RmnHomeConfigBuilder::new()
            .node(PeerId::from(1), [1; PEER_ID_LEN])
            .node(PeerId::from(1), [2; PEER_ID_LEN]);

        assert!(validate_rmn_home(&builder.build_static(), &builder.build_dynamic()).is_err());
    }
}
