//! The candidate/active configuration-promotion registry.
//!
//! All state lives behind a single write lock, so every digest guard is
//! checked and applied as one atomic step and conflicting writes serialize.
//! That is the same consistency model remote ledgers are assumed to provide.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use strum::IntoEnumIterator;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    chain_config::{ChainConfig, ChainSelector},
    config::{ConfigSlots, OcrConfig, StoredConfig},
    digest::ConfigDigest,
    don::{DonId, DonRecord},
    error::{Error, Result},
    ledger::HomeLedger,
    peer_id::PeerId,
    plugin_type::PluginType,
    rmn_home::{validate_rmn_home, RmnHomeDynamicConfig, RmnHomeStaticConfig},
};

/// Registry state, guarded as one unit.
#[derive(Debug, Default)]
struct RegistryState {
    /// Registered DONs, ascending by identifier.
    dons: BTreeMap<DonId, DonRecord>,
    /// Config slot pairs, one per `(DON, plugin type)`.
    configs: HashMap<(DonId, PluginType), ConfigSlots>,
    /// Chain configs, keyed by selector.
    chain_configs: BTreeMap<ChainSelector, ChainConfig>,
    /// The accepted RMN home config pair, if any.
    rmn_home: Option<(RmnHomeStaticConfig, RmnHomeDynamicConfig)>,
}

/// The candidate/active promotion state machine for per-DON, per-plugin-type
/// configuration.
///
/// Doubles as the in-process [`HomeLedger`] implementation; a production
/// deployment substitutes a remote ledger behind the same trait.
#[derive(Debug, Default)]
pub struct ConfigRegistry {
    /// The guarded registry state.
    state: RwLock<RegistryState>,
}

impl ConfigRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new DON and return its identifier.
    ///
    /// The identifier is `1 + max(existing identifiers)` (1 for the first
    /// DON) and is never reused.  Members are stored in canonical peer
    /// order, and empty config slots are created for every plugin type.
    ///
    /// # Errors
    ///
    /// Returns an error if the member set is empty or repeats a peer id.
    pub async fn create_don(&self, f_role_don: u8, members: Vec<PeerId>) -> Result<DonId> {
        if members.is_empty() {
            return Err(Error::MalformedConfig(
                "a DON needs at least one member".to_string(),
            ));
        }
        let mut unique = members.clone();
        unique.sort_unstable();
        unique.dedup();
        if unique.len() != members.len() {
            return Err(Error::MalformedConfig(
                "duplicate peer id in DON member set".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        let don_id = state
            .dons
            .keys()
            .next_back()
            .copied()
            .map_or(DonId::new(1), DonId::next);
        state
            .dons
            .insert(don_id, DonRecord::new(don_id, f_role_don, members));
        for plugin_type in PluginType::iter() {
            state
                .configs
                .insert((don_id, plugin_type), ConfigSlots::default());
        }

        debug!(don = %don_id, "registered new DON");
        Ok(don_id)
    }

    /// Digest-guarded write of a candidate config.
    ///
    /// Returns the digest of the written candidate.  Resubmitting the same
    /// config with the then-current prior digest succeeds idempotently.
    ///
    /// # Errors
    ///
    /// `DigestMismatch` if the stored candidate digest does not equal
    /// `expected_prior_candidate_digest`; not-found for an unknown key;
    /// `MalformedConfig` for an invalid config.  State is unchanged on
    /// failure.
    pub async fn set_candidate(
        &self, don_id: DonId, plugin_type: PluginType, config: OcrConfig,
        expected_prior_candidate_digest: ConfigDigest,
    ) -> Result<ConfigDigest> {
        config.validate(plugin_type)?;
        let digest = config.digest()?;

        let mut state = self.state.write().await;
        let slots = state
            .configs
            .get_mut(&(don_id, plugin_type))
            .ok_or(Error::DonConfigNotFound(don_id, plugin_type))?;

        let stored = slots.candidate_digest();
        if stored != expected_prior_candidate_digest {
            return Err(Error::DigestMismatch {
                expected: expected_prior_candidate_digest,
                stored,
            });
        }

        slots.candidate = Some(StoredConfig { digest, config });

        debug!(don = %don_id, plugin = %plugin_type, %digest, "candidate config set");
        Ok(digest)
    }

    /// Digest-guarded removal of a candidate config.
    ///
    /// # Errors
    ///
    /// `DigestMismatch` if `digest` is the zero digest or does not equal the
    /// stored candidate digest; not-found for an unknown key.
    pub async fn revoke_candidate(
        &self, don_id: DonId, plugin_type: PluginType, digest: ConfigDigest,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let slots = state
            .configs
            .get_mut(&(don_id, plugin_type))
            .ok_or(Error::DonConfigNotFound(don_id, plugin_type))?;

        let stored = slots.candidate_digest();
        if digest.is_zero() || stored != digest {
            return Err(Error::DigestMismatch {
                expected: digest,
                stored,
            });
        }

        slots.candidate = None;

        debug!(don = %don_id, plugin = %plugin_type, %digest, "candidate config revoked");
        Ok(())
    }

    /// Atomically promote the candidate to active and clear the candidate.
    ///
    /// An empty candidate is not a promotable value, so the zero digest is
    /// rejected before any slot is compared.
    ///
    /// # Errors
    ///
    /// `DigestMismatch` unless the stored candidate digest equals
    /// `candidate_digest` AND the stored active digest equals
    /// `expected_prior_active_digest`; not-found for an unknown key.  State
    /// is unchanged on failure.
    pub async fn promote_candidate_and_revoke_active(
        &self, don_id: DonId, plugin_type: PluginType, candidate_digest: ConfigDigest,
        expected_prior_active_digest: ConfigDigest,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let slots = state
            .configs
            .get_mut(&(don_id, plugin_type))
            .ok_or(Error::DonConfigNotFound(don_id, plugin_type))?;

        let stored_candidate = slots.candidate_digest();
        if candidate_digest.is_zero() || stored_candidate != candidate_digest {
            return Err(Error::DigestMismatch {
                expected: candidate_digest,
                stored: stored_candidate,
            });
        }
        let stored_active = slots.active_digest();
        if stored_active != expected_prior_active_digest {
            return Err(Error::DigestMismatch {
                expected: expected_prior_active_digest,
                stored: stored_active,
            });
        }

        slots.active = slots.candidate.take();

        debug!(
            don = %don_id,
            plugin = %plugin_type,
            digest = %candidate_digest,
            "candidate config promoted to active"
        );
        Ok(())
    }

    /// Current candidate digest; the zero digest when the slot is empty.
    ///
    /// # Errors
    ///
    /// Not-found for an unknown DON / plugin type pair.
    pub async fn get_candidate_digest(
        &self, don_id: DonId, plugin_type: PluginType,
    ) -> Result<ConfigDigest> {
        let state = self.state.read().await;
        state
            .configs
            .get(&(don_id, plugin_type))
            .map(ConfigSlots::candidate_digest)
            .ok_or(Error::DonConfigNotFound(don_id, plugin_type))
    }

    /// Point-in-time read of both config slots.
    ///
    /// # Errors
    ///
    /// Not-found for an unknown DON / plugin type pair.
    pub async fn get_all_configs(
        &self, don_id: DonId, plugin_type: PluginType,
    ) -> Result<ConfigSlots> {
        let state = self.state.read().await;
        state
            .configs
            .get(&(don_id, plugin_type))
            .cloned()
            .ok_or(Error::DonConfigNotFound(don_id, plugin_type))
    }

    /// Remove, then add chain configs, as one atomic update.
    ///
    /// # Errors
    ///
    /// Not-found when removing an unknown selector; `MalformedConfig` for an
    /// invalid added config.  State is unchanged on failure.
    pub async fn apply_chain_config_updates(
        &self, removes: &[ChainSelector], adds: Vec<(ChainSelector, ChainConfig)>,
    ) -> Result<()> {
        for (selector, chain_config) in &adds {
            chain_config.validate(*selector)?;
        }

        let mut state = self.state.write().await;
        for selector in removes {
            if !state.chain_configs.contains_key(selector) {
                return Err(Error::ChainConfigNotFound(*selector));
            }
        }
        for selector in removes {
            state.chain_configs.remove(selector);
        }
        for (selector, chain_config) in adds {
            state.chain_configs.insert(selector, chain_config);
        }

        Ok(())
    }

    /// Accept an RMN home static/dynamic config pair.
    ///
    /// This is the boundary that enforces the observer contract: for every
    /// source chain, `popcount(observer_bitmap) >= 2 * f_observe + 1`, and no
    /// bitmap may address a node beyond the roster.
    ///
    /// # Errors
    ///
    /// `MalformedConfig` if the pair violates the contract; state is
    /// unchanged on failure.
    pub async fn set_rmn_home(
        &self, static_config: RmnHomeStaticConfig, dynamic_config: RmnHomeDynamicConfig,
    ) -> Result<()> {
        validate_rmn_home(&static_config, &dynamic_config)?;

        let mut state = self.state.write().await;
        state.rmn_home = Some((static_config, dynamic_config));

        debug!("RMN home config pair accepted");
        Ok(())
    }
}

#[async_trait]
impl HomeLedger for ConfigRegistry {
    async fn set_candidate(
        &self, don_id: DonId, plugin_type: PluginType, config: OcrConfig,
        expected_prior_candidate_digest: ConfigDigest,
    ) -> Result<ConfigDigest> {
        ConfigRegistry::set_candidate(
            self,
            don_id,
            plugin_type,
            config,
            expected_prior_candidate_digest,
        )
        .await
    }

    async fn promote_candidate_and_revoke_active(
        &self, don_id: DonId, plugin_type: PluginType, candidate_digest: ConfigDigest,
        expected_prior_active_digest: ConfigDigest,
    ) -> Result<()> {
        ConfigRegistry::promote_candidate_and_revoke_active(
            self,
            don_id,
            plugin_type,
            candidate_digest,
            expected_prior_active_digest,
        )
        .await
    }

    async fn get_candidate_digest(
        &self, don_id: DonId, plugin_type: PluginType,
    ) -> Result<ConfigDigest> {
        ConfigRegistry::get_candidate_digest(self, don_id, plugin_type).await
    }

    async fn get_all_configs(
        &self, don_id: DonId, plugin_type: PluginType,
    ) -> Result<ConfigSlots> {
        ConfigRegistry::get_all_configs(self, don_id, plugin_type).await
    }

    async fn list_dons(&self) -> Result<Vec<DonRecord>> {
        let state = self.state.read().await;
        Ok(state.dons.values().cloned().collect())
    }

    async fn list_chain_configs(&self) -> Result<BTreeMap<ChainSelector, ChainConfig>> {
        let state = self.state.read().await;
        Ok(state.chain_configs.clone())
    }

    async fn get_rmn_home(&self) -> Result<(RmnHomeStaticConfig, RmnHomeDynamicConfig)> {
        let state = self.state.read().await;
        Ok(state.rmn_home.clone().unwrap_or_default())
    }
}
