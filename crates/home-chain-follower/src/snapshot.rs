//! Immutable aggregate of the home chain state as of one poll cycle.
//!
//! A snapshot is assembled from a single, self-consistent set of ledger
//! reads and then never mutated: the reader replaces the published snapshot
//! wholesale, so no query can ever observe a mix of two ledger states.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{
    chain_config::{ChainConfig, ChainSelector},
    config::ConfigSlots,
    don::{DonId, DonRecord},
    node_info::NodeInfo,
    peer_id::PeerId,
    plugin_type::PluginType,
    rmn_home::{RmnHomeDynamicConfig, RmnHomeStaticConfig},
};

/// All home chain state known as of the last successful poll.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    /// Registered DONs, ascending by identifier.
    dons: Vec<DonRecord>,
    /// Config slot pairs, one per `(DON, plugin type)`.
    don_configs: HashMap<(DonId, PluginType), ConfigSlots>,
    /// Chain configs, keyed by selector.
    chain_configs: BTreeMap<ChainSelector, ChainConfig>,
    /// RMN home roster config.
    rmn_static: RmnHomeStaticConfig,
    /// RMN home observer config.
    rmn_dynamic: RmnHomeDynamicConfig,
    /// Node info records projected from the roster.
    nodes: Vec<NodeInfo>,
}

impl Snapshot {
    /// Assemble a snapshot from one cycle's reads.
    pub(crate) fn new(
        dons: Vec<DonRecord>, don_configs: HashMap<(DonId, PluginType), ConfigSlots>,
        chain_configs: BTreeMap<ChainSelector, ChainConfig>, rmn_static: RmnHomeStaticConfig,
        rmn_dynamic: RmnHomeDynamicConfig, nodes: Vec<NodeInfo>,
    ) -> Self {
        Self {
            dons,
            don_configs,
            chain_configs,
            rmn_static,
            rmn_dynamic,
            nodes,
        }
    }

    /// Registered DONs, ascending by identifier.
    #[must_use]
    pub fn dons(&self) -> &[DonRecord] {
        &self.dons
    }

    /// Config slots of one `(DON, plugin type)` pair, if known.
    #[must_use]
    pub fn ocr_configs(&self, don_id: DonId, plugin_type: PluginType) -> Option<&ConfigSlots> {
        self.don_configs.get(&(don_id, plugin_type))
    }

    /// Config of one chain, if known.
    #[must_use]
    pub fn chain_config(&self, selector: ChainSelector) -> Option<&ChainConfig> {
        self.chain_configs.get(&selector)
    }

    /// All chain configs, keyed by selector.
    #[must_use]
    pub fn chain_configs(&self) -> &BTreeMap<ChainSelector, ChainConfig> {
        &self.chain_configs
    }

    /// The RMN home static/dynamic config pair.
    #[must_use]
    pub fn rmn_home(&self) -> (&RmnHomeStaticConfig, &RmnHomeDynamicConfig) {
        (&self.rmn_static, &self.rmn_dynamic)
    }

    /// Node info records, ascending by ordinal id.
    #[must_use]
    pub fn nodes(&self) -> &[NodeInfo] {
        &self.nodes
    }

    /// Node info of one peer, if it is part of the roster.
    #[must_use]
    pub fn node(&self, peer_id: PeerId) -> Option<&NodeInfo> {
        self.nodes.iter().find(|node| node.peer_id == peer_id)
    }

    /// Source chains supported by one peer, if it is part of the roster.
    #[must_use]
    pub fn supported_source_chains(&self, peer_id: PeerId) -> Option<&HashSet<ChainSelector>> {
        self.node(peer_id).map(|node| &node.supported_source_chains)
    }

    /// Every chain the home chain state knows about: chains with a config
    /// plus chains observed by the RMN.
    #[must_use]
    pub fn known_chains(&self) -> Vec<ChainSelector> {
        let mut chains: Vec<ChainSelector> = self
            .chain_configs
            .keys()
            .copied()
            .chain(
                self.rmn_dynamic
                    .source_chains
                    .iter()
                    .map(|source_chain| source_chain.chain_selector),
            )
            .collect();
        chains.sort_unstable();
        chains.dedup();
        chains
    }

    /// The fault threshold of every configured chain.
    #[must_use]
    pub fn f_chain(&self) -> BTreeMap<ChainSelector, u8> {
        self.chain_configs
            .iter()
            .map(|(selector, chain_config)| (*selector, chain_config.f_chain))
            .collect()
    }
}
