//! Vault Configuration
//!
//! Supports an optional config file (TOML, JSON, or YAML) and environment
//! variables with the `OPENPROOF__` prefix, e.g. `OPENPROOF__EVENT_CAPACITY=4096`.

use openproof_core::{AgentId, AssetId};
use serde::{Deserialize, Serialize};

/// Vault configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Buffer size of the event broadcast channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Identity the vault presents to the funds mover as spender
    #[serde(default = "default_operator")]
    pub operator: AgentId,

    /// Asset payments settle in
    #[serde(default)]
    pub asset: AssetId,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
            operator: default_operator(),
            asset: AssetId::default(),
        }
    }
}

fn default_event_capacity() -> usize {
    1024
}

fn default_operator() -> AgentId {
    AgentId::from_string("openproof-vault")
}

impl VaultConfig {
    /// Load configuration from environment and optional config file
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder
            .add_source(config::File::with_name("config/openproof").required(false))
            .add_source(
                config::Environment::with_prefix("OPENPROOF")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        let vault_config: VaultConfig = config.try_deserialize().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid vault configuration, using defaults");
            VaultConfig::default()
        });

        Ok(vault_config)
    }

    /// Parse configuration from a TOML document
    pub fn from_toml(source: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Broadcast capacity, never zero
    pub fn event_capacity(&self) -> usize {
        self.event_capacity.max(1)
    }
}
