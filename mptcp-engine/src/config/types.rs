use serde::Deserialize;

use crate::options::{MPTCP_VERSION, MP_CAPABLE_FLAGS, MP_CAPABLE_FLAGS_CS};

/// Engine configuration supplied by the harness
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Seed for the deterministic nonce source
    /// Failing runs replay byte-identically under the same seed
    pub seed: u64,
    /// MPTCP protocol version advertised in MP_CAPABLE (only 0 is supported)
    #[serde(default)]
    pub version: u8,
    /// Advertise DSS checksum support in the MP_CAPABLE flags byte
    /// Default: false (no checksum)
    #[serde(default)]
    pub dss_checksum: bool,
}

impl EngineConfig {
    /// Configuration for a harness run with no config file.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            version: MPTCP_VERSION,
            dss_checksum: false,
        }
    }

    /// Flags byte written into scripted MP_CAPABLE options.
    pub fn capable_flags(&self) -> u8 {
        if self.dss_checksum {
            MP_CAPABLE_FLAGS_CS
        } else {
            MP_CAPABLE_FLAGS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_seed_defaults() {
        let cfg = EngineConfig::with_seed(7);
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.version, 0);
        assert!(!cfg.dss_checksum);
        assert_eq!(cfg.capable_flags(), MP_CAPABLE_FLAGS);
    }

    #[test]
    fn test_checksum_sets_flag_bit() {
        let mut cfg = EngineConfig::with_seed(7);
        cfg.dss_checksum = true;
        assert_eq!(cfg.capable_flags(), MP_CAPABLE_FLAGS_CS);
    }
}
