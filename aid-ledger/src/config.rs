//! Configuration for the aid ledger

use crate::eligibility::EligibilityRules;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Actor mailbox capacity (backpressure bound)
    pub mailbox_capacity: usize,

    /// What to do with a donation larger than the remaining need
    pub funding_policy: FundingPolicy,

    /// Refuse Zakah donations to Sadaqah-only requests
    pub enforce_donation_category: bool,

    /// Hex-encoded Ed25519 seed used to sign entry hashes
    pub signing_seed_hex: Option<String>,

    /// Classifier thresholds
    pub eligibility: EligibilityRules,

    /// Ledger storage backend
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "aid-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            mailbox_capacity: 1000,
            funding_policy: FundingPolicy::default(),
            enforce_donation_category: true,
            signing_seed_hex: None,
            eligibility: EligibilityRules::default(),
            storage: StorageConfig::default(),
        }
    }
}

/// Over-funding policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FundingPolicy {
    /// Refuse the whole donation
    #[default]
    Reject,
    /// Record only the remaining need and report the rest as unallocated
    Cap,
}

/// Storage backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Process-lifetime storage
    Memory,
    /// RocksDB (requires the `rocksdb` feature)
    Rocksdb {
        /// Data directory
        data_dir: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Memory
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from `AID_LEDGER_*` variables resolved through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> crate::Result<Self> {
        let mut config = Config::default();

        if let Some(policy) = lookup("AID_LEDGER_FUNDING_POLICY") {
            config.funding_policy = match policy.to_lowercase().as_str() {
                "reject" => FundingPolicy::Reject,
                "cap" => FundingPolicy::Cap,
                other => {
                    return Err(crate::Error::Config(format!(
                        "Unknown funding policy: {}",
                        other
                    )))
                }
            };
        }

        if let Some(flag) = lookup("AID_LEDGER_ENFORCE_CATEGORY") {
            config.enforce_donation_category = flag
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid category flag: {}", e)))?;
        }

        if let Some(capacity) = lookup("AID_LEDGER_MAILBOX_CAPACITY") {
            config.mailbox_capacity = capacity
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid mailbox capacity: {}", e)))?;
        }

        if let Some(seed) = lookup("AID_LEDGER_SIGNING_SEED") {
            config.signing_seed_hex = Some(seed);
        }

        if let Some(data_dir) = lookup("AID_LEDGER_DATA_DIR") {
            config.storage = StorageConfig::Rocksdb {
                data_dir: PathBuf::from(data_dir),
            };
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "aid-ledger");
        assert_eq!(config.funding_policy, FundingPolicy::Reject);
        assert!(config.enforce_donation_category);
        assert!(matches!(config.storage, StorageConfig::Memory));
        assert_eq!(config.eligibility.sadaqah_income_threshold, dec!(1500));
    }

    #[test]
    fn test_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("ledger.toml");
        std::fs::write(
            &path,
            r#"
funding_policy = "cap"
mailbox_capacity = 64

[eligibility]
sadaqah_income_threshold = "2000"
zakah_income_ceiling = "900"
zakah_dependents_threshold = 3

[storage]
backend = "rocksdb"
data_dir = "/var/lib/aid-ledger"
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.funding_policy, FundingPolicy::Cap);
        assert_eq!(config.mailbox_capacity, 64);
        assert_eq!(config.eligibility.zakah_income_ceiling, dec!(900));
        assert!(config.enforce_donation_category);
        match config.storage {
            StorageConfig::Rocksdb { data_dir } => {
                assert_eq!(data_dir, PathBuf::from("/var/lib/aid-ledger"))
            }
            other => panic!("unexpected storage {:?}", other),
        }
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.funding_policy, FundingPolicy::Reject);
        assert!(config.signing_seed_hex.is_none());
        assert!(matches!(config.storage, StorageConfig::Memory));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("AID_LEDGER_FUNDING_POLICY", "CAP"),
            ("AID_LEDGER_ENFORCE_CATEGORY", "false"),
            ("AID_LEDGER_MAILBOX_CAPACITY", "32"),
            ("AID_LEDGER_SIGNING_SEED", "ab"),
            ("AID_LEDGER_DATA_DIR", "/tmp/aid"),
        ]))
        .unwrap();

        assert_eq!(config.funding_policy, FundingPolicy::Cap);
        assert!(!config.enforce_donation_category);
        assert_eq!(config.mailbox_capacity, 32);
        assert_eq!(config.signing_seed_hex.as_deref(), Some("ab"));
        assert!(matches!(config.storage, StorageConfig::Rocksdb { .. }));
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        for (key, value) in [
            ("AID_LEDGER_FUNDING_POLICY", "sometimes"),
            ("AID_LEDGER_ENFORCE_CATEGORY", "maybe"),
            ("AID_LEDGER_MAILBOX_CAPACITY", "-1"),
        ] {
            assert!(matches!(
                Config::from_lookup(lookup(&[(key, value)])),
                Err(crate::Error::Config(_))
            ));
        }
    }

    #[test]
    fn test_from_file_rejects_garbage() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("ledger.toml");
        std::fs::write(&path, "funding_policy = \"sometimes\"").unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(crate::Error::Config(_))
        ));
    }
}
