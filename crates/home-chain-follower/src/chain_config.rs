//! Per-chain reader-set configuration.

use std::fmt::{Display, Formatter};

use crate::{
    error::{Error, Result},
    peer_id::PeerId,
};

/// Globally unique identifier of a chain.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainSelector(u64);

impl ChainSelector {
    /// Create a chain selector from its raw value.
    #[must_use]
    pub const fn new(selector: u64) -> Self {
        Self(selector)
    }

    /// Get the raw value of the chain selector.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for ChainSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChainSelector {
    fn from(selector: u64) -> Self {
        Self(selector)
    }
}

/// Configuration of a single chain, keyed by its selector.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChainConfig {
    /// Peer ids allowed to read this chain.
    pub readers: Vec<PeerId>,
    /// Maximum tolerated count of faulty readers on this chain.
    pub f_chain: u8,
    /// Opaque chain-specific configuration bytes.
    pub config: Vec<u8>,
}

impl ChainConfig {
    /// Validate this chain config before it is accepted by the registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the fault threshold is zero or the reader set
    /// cannot tolerate it.
    pub fn validate(&self, selector: ChainSelector) -> Result<()> {
        if selector.get() == 0 {
            return Err(Error::MalformedConfig(
                "chain selector must not be zero".to_string(),
            ));
        }
        if self.f_chain == 0 {
            return Err(Error::MalformedConfig(format!(
                "chain {selector}: fChain must be positive"
            )));
        }
        let needed = 2 * usize::from(self.f_chain) + 1;
        if self.readers.len() < needed {
            return Err(Error::MalformedConfig(format!(
                "chain {selector}: {} readers cannot tolerate fChain {}, need at least {needed}",
                self.readers.len(),
                self.f_chain
            )));
        }

        Ok(())
    }
}
