use config::{ConfigError, Environment, File, Map};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub ledger: aid_ledger::Config,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    /// Empty means any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Defaults, then an optional TOML file, then `AID_GATEWAY__*` variables
    ///
    /// `AID_GATEWAY__LEDGER__FUNDING_POLICY=cap` sets `ledger.funding_policy`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(env::vars().collect())
    }

    /// Same layering, reading variables from `vars` instead of the process
    pub fn from_vars(vars: Map<String, String>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            // Server defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8090)?
            .set_default("server.workers", 4)?
            // Ledger defaults
            .set_default("ledger.service_name", "aid-gateway")?
            .set_default("ledger.funding_policy", "reject")?
            .set_default("ledger.enforce_donation_category", true)?;

        if let Some(path) = vars.get("AID_GATEWAY_CONFIG") {
            builder = builder.add_source(File::with_name(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("AID_GATEWAY")
                .separator("__")
                .source(Some(vars.clone())),
        );

        // Override from environment variables
        if let Some(port) = vars.get("SERVICE_PORT") {
            builder = builder.set_override("server.port", port.as_str())?;
        }

        builder.build()?.try_deserialize()
    }
}
