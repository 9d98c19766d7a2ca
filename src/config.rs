//! Registration limits: defaults, TOML parsing, environment overrides.

use serde::Deserialize;

use crate::error::Error;

/// Most unacknowledged B3 data blocks CAPI supports.
pub const MAX_B_DATA_BLOCKS: u32 = 7;
/// Largest B3 data block size CAPI supports.
pub const MAX_B_DATA_LEN: u32 = 2048;

/// Capacity limits passed to the driver at registration.
/// Env overrides: CAPI_MAX_LOGICAL_CONNECTIONS, CAPI_MAX_B_DATA_BLOCKS,
/// CAPI_MAX_B_DATA_LEN.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Max. number of logical connections handled at once (default 2).
    #[serde(default = "default_max_logical_connections")]
    pub max_logical_connections: u32,
    /// Max. number of unacknowledged B3 data blocks (default and cap 7).
    #[serde(default = "default_max_b_data_blocks")]
    pub max_b_data_blocks: u32,
    /// Max. B3 data block size in bytes (default and cap 2048).
    #[serde(default = "default_max_b_data_len")]
    pub max_b_data_len: u32,
}

fn default_max_logical_connections() -> u32 {
    2
}
fn default_max_b_data_blocks() -> u32 {
    MAX_B_DATA_BLOCKS
}
fn default_max_b_data_len() -> u32 {
    MAX_B_DATA_LEN
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_logical_connections: default_max_logical_connections(),
            max_b_data_blocks: default_max_b_data_blocks(),
            max_b_data_len: default_max_b_data_len(),
        }
    }
}

impl EngineConfig {
    /// Parse from a TOML document; missing fields take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, Error> {
        toml::from_str(s).map_err(|e| Error::Capability(format!("invalid engine config: {e}")))
    }

    /// Merge defaults with environment overrides; unparsable values are
    /// ignored.
    pub fn load() -> Self {
        let mut c = Self::default();
        if let Some(v) = env_u32("CAPI_MAX_LOGICAL_CONNECTIONS") {
            c.max_logical_connections = v;
        }
        if let Some(v) = env_u32("CAPI_MAX_B_DATA_BLOCKS") {
            c.max_b_data_blocks = v;
        }
        if let Some(v) = env_u32("CAPI_MAX_B_DATA_LEN") {
            c.max_b_data_len = v;
        }
        c
    }

    /// Check the CAPI caps before anything is sent to the driver.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_logical_connections == 0 {
            return Err(Error::Capability(
                "max_logical_connections must be at least 1".into(),
            ));
        }
        if self.max_b_data_blocks == 0 || self.max_b_data_blocks > MAX_B_DATA_BLOCKS {
            return Err(Error::Capability(format!(
                "max_b_data_blocks must be 1..={MAX_B_DATA_BLOCKS}, got {}",
                self.max_b_data_blocks
            )));
        }
        if self.max_b_data_len == 0 || self.max_b_data_len > MAX_B_DATA_LEN {
            return Err(Error::Capability(format!(
                "max_b_data_len must be 1..={MAX_B_DATA_LEN}, got {}",
                self.max_b_data_len
            )));
        }
        Ok(())
    }
}

fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = EngineConfig::default();
        assert_eq!(c.max_logical_connections, 2);
        assert_eq!(c.max_b_data_blocks, 7);
        assert_eq!(c.max_b_data_len, 2048);
        c.validate().unwrap();
    }

    #[test]
    fn toml_partial_overrides() {
        let c = EngineConfig::from_toml_str("max_logical_connections = 4").unwrap();
        assert_eq!(c.max_logical_connections, 4);
        assert_eq!(c.max_b_data_blocks, 7);
    }

    #[test]
    fn toml_rejects_unknown_fields() {
        assert!(matches!(
            EngineConfig::from_toml_str("max_calls = 4"),
            Err(Error::Capability(_))
        ));
    }

    #[test]
    fn out_of_range_limits_fail_validation() {
        let c = EngineConfig {
            max_b_data_blocks: 8,
            ..EngineConfig::default()
        };
        assert!(matches!(c.validate(), Err(Error::Capability(_))));

        let c = EngineConfig {
            max_b_data_len: 4096,
            ..EngineConfig::default()
        };
        assert!(matches!(c.validate(), Err(Error::Capability(_))));

        let c = EngineConfig {
            max_logical_connections: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(c.validate(), Err(Error::Capability(_))));
    }
}
