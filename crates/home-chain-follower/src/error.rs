//! Library Crates Defined Errors

use thiserror::Error;

use crate::{
    chain_config::ChainSelector, digest::ConfigDigest, don::DonId, peer_id::PeerId,
    plugin_type::PluginType,
};

/// Crate error type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// A digest-guarded write was submitted against stale state.
    #[error("Config digest mismatch: caller expected `{expected}`, stored `{stored}`")]
    DigestMismatch {
        /// The digest the caller expected to find in the guarded slot.
        expected: ConfigDigest,
        /// The digest actually stored in the guarded slot.
        stored: ConfigDigest,
    },
    /// No configuration slots exist for the given DON / plugin type pair.
    #[error("No configuration for DON {0}, plugin type {1}")]
    DonConfigNotFound(DonId, PluginType),
    /// No chain config is registered for the given chain selector.
    #[error("No chain config for chain selector {0}")]
    ChainConfigNotFound(ChainSelector),
    /// The given peer is not part of the current home chain state.
    #[error("Node {0} is not part of the current home chain state")]
    NodeNotFound(PeerId),
    /// Transient failure communicating with the home ledger.
    #[error("Home ledger unavailable: {0}")]
    LedgerUnavailable(String),
    /// A configuration value failed validation or decoding.
    #[error("Malformed config: {0}")]
    MalformedConfig(String),
    /// Data encoding/decoding error.
    #[error("Codec error: {0:?}")]
    Codec(String),
    /// The home chain reader has been closed.
    #[error("Home chain reader is closed")]
    Closed,
    /// The home chain reader has not yet completed a successful poll cycle.
    #[error("Home chain reader has no snapshot yet")]
    NotReady,
    /// The home chain reader poll task is already running.
    #[error("Home chain reader already started")]
    AlreadyStarted,
    /// Internal Error
    #[error("Internal error")]
    Internal,
}

impl From<minicbor::encode::Error<core::convert::Infallible>> for Error {
    fn from(err: minicbor::encode::Error<core::convert::Infallible>) -> Self {
        Error::Codec(err.to_string())
    }
}

/// Crate result type.
pub type Result<T> = std::result::Result<T, Error>;
