//! Abstract surface of the home chain ledger collaborator.
//!
//! The reader polls this surface; off-chain participants drive the write
//! operations.  Implementations are expected to serialize conflicting writes
//! and evaluate digest guards atomically, so a write whose precondition no
//! longer holds at commit time is rejected rather than applied.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::{
    chain_config::{ChainConfig, ChainSelector},
    config::{ConfigSlots, OcrConfig},
    digest::ConfigDigest,
    don::{DonId, DonRecord},
    error::Result,
    plugin_type::PluginType,
    rmn_home::{RmnHomeDynamicConfig, RmnHomeStaticConfig},
};

/// The home chain ledger surface consumed by this crate.
#[async_trait]
pub trait HomeLedger: Send + Sync {
    /// Write `config` into the candidate slot of `(don_id, plugin_type)`.
    ///
    /// The write only succeeds if the slot's current digest equals
    /// `expected_prior_candidate_digest` (the zero digest means the slot must
    /// currently be empty).  Returns the digest of the written candidate.
    ///
    /// # Errors
    ///
    /// Fails on a digest mismatch, an unknown key, or an invalid config.
    async fn set_candidate(
        &self, don_id: DonId, plugin_type: PluginType, config: OcrConfig,
        expected_prior_candidate_digest: ConfigDigest,
    ) -> Result<ConfigDigest>;

    /// Atomically promote the candidate to active and clear the candidate.
    ///
    /// Succeeds only if the stored candidate digest equals `candidate_digest`
    /// AND the stored active digest equals `expected_prior_active_digest`.
    /// State is unchanged on failure.
    ///
    /// # Errors
    ///
    /// Fails on a digest mismatch or an unknown key.
    async fn promote_candidate_and_revoke_active(
        &self, don_id: DonId, plugin_type: PluginType, candidate_digest: ConfigDigest,
        expected_prior_active_digest: ConfigDigest,
    ) -> Result<()>;

    /// Get the current candidate digest; the zero digest when the slot is
    /// empty.
    ///
    /// # Errors
    ///
    /// Fails only for an unknown DON / plugin type pair.
    async fn get_candidate_digest(
        &self, don_id: DonId, plugin_type: PluginType,
    ) -> Result<ConfigDigest>;

    /// Point-in-time read of both config slots.
    ///
    /// # Errors
    ///
    /// Fails only for an unknown DON / plugin type pair.
    async fn get_all_configs(&self, don_id: DonId, plugin_type: PluginType)
        -> Result<ConfigSlots>;

    /// All registered DONs, ascending by identifier.
    ///
    /// # Errors
    ///
    /// Fails if the ledger cannot be reached.
    async fn list_dons(&self) -> Result<Vec<DonRecord>>;

    /// All registered chain configs, keyed by chain selector.
    ///
    /// # Errors
    ///
    /// Fails if the ledger cannot be reached.
    async fn list_chain_configs(&self) -> Result<BTreeMap<ChainSelector, ChainConfig>>;

    /// The current RMN home static/dynamic config pair.
    ///
    /// Both configs are empty until a pair has been accepted.
    ///
    /// # Errors
    ///
    /// Fails if the ledger cannot be reached.
    async fn get_rmn_home(&self) -> Result<(RmnHomeStaticConfig, RmnHomeDynamicConfig)>;
}
