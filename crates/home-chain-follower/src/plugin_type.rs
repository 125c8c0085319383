//! Enum of the protocol plugin roles configured per DON.

use crate::error::{Error, Result};

/// The two protocol roles a DON runs, each with its own config lifecycle.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::EnumIter,
    strum::VariantNames,
    strum::EnumString,
    strum::Display,
)]
#[strum(ascii_case_insensitive)]
pub enum PluginType {
    /// The commit role: observes and commits source chain state.
    Commit,
    /// The exec role: executes committed messages on the destination chain.
    Exec,
}

impl PluginType {
    /// The wire value of this plugin type in ledger calls and digests.
    #[must_use]
    pub const fn wire_value(self) -> u8 {
        match self {
            PluginType::Commit => 0,
            PluginType::Exec => 1,
        }
    }

    /// Decode a plugin type from its wire value.
    ///
    /// # Errors
    ///
    /// Returns an error for any value other than 0 or 1.
    pub fn from_wire(value: u8) -> Result<Self> {
        match value {
            0 => Ok(PluginType::Commit),
            1 => Ok(PluginType::Exec),
            other => Err(Error::MalformedConfig(format!(
                "unknown plugin type wire value {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_from_str() -> anyhow::Result<()> {
        assert_eq!(PluginType::from_str("commit")?, PluginType::Commit);
        assert_eq!(PluginType::from_str("Exec")?, PluginType::Exec);

        Ok(())
    }

    #[test]
    fn test_wire_round_trip() -> anyhow::Result<()> {
        for plugin_type in PluginType::iter() {
            assert_eq!(
                PluginType::from_wire(plugin_type.wire_value())?,
                plugin_type
            );
        }

        assert!(PluginType::from_wire(2).is_err());

        Ok(())
    }
}
