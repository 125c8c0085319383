//! Home chain follower.
//!
//! Reads and caches the configuration state of a decentralized oracle
//! network's home chain: the candidate/active config-promotion registry, the
//! risk-management (RMN) network's static/dynamic configs, per-chain reader
//! sets, and the node-info view derived from them.
//!
//! The three moving parts:
//!
//! - [`ConfigRegistry`]: the two-phase (candidate/active) promotion state
//!   machine, guarded by content digests for optimistic concurrency.  It
//!   doubles as the in-process [`HomeLedger`] implementation.
//! - [`HomeChainReader`]: polls a [`HomeLedger`] on a fixed interval and
//!   serves an immutable, atomically-replaced [`Snapshot`] to any number of
//!   concurrent readers.
//! - [`RmnHomeConfigBuilder`]: assembles the RMN roster and per-source-chain
//!   observer configs, whose list order fixes the observer bitmap indices.

mod chain_config;
mod config;
mod digest;
mod don;
mod error;
mod ledger;
mod node_info;
mod peer_id;
mod plugin_type;
mod reader;
mod registry;
mod rmn_home;
mod snapshot;
mod stats;

pub use chain_config::{ChainConfig, ChainSelector};
pub use config::{ConfigSlots, OcrConfig, OcrNode, StoredConfig};
pub use digest::{ConfigDigest, CONFIG_DIGEST_LEN, ZERO_DIGEST};
pub use don::{DonId, DonRecord};
pub use error::{Error, Result};
pub use ledger::HomeLedger;
pub use node_info::{project_node_info, NodeId, NodeInfo};
pub use peer_id::{canonical_peer_order, PeerId, PEER_ID_LEN};
pub use plugin_type::PluginType;
pub use reader::{HomeChainReader, HomeChainReaderConfig};
pub use registry::ConfigRegistry;
pub use rmn_home::{
    RmnHomeConfigBuilder, RmnHomeDynamicConfig, RmnHomeNode, RmnHomeSourceChain,
    RmnHomeStaticConfig,
};
pub use snapshot::Snapshot;
pub use stats::ReaderStats;
