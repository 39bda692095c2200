//! Environment-driven anchoring configuration

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::index::DEFAULT_INDEX_CAPACITY;
use crate::metadata::DEFAULT_MAX_METADATA_BYTES;
use crate::public::DEFAULT_MIN_UTXO;
use crate::strategy::{LedgerMode, LedgerSettings};
use crate::wallet::SecretSource;

/// Public ledger settings
#[derive(Debug)]
pub struct PublicLedgerConfig {
    pub settings: LedgerSettings,
    pub project_id: Option<String>,
    pub address: Option<String>,
    pub wallet_seed: Option<SecretSource>,
    pub max_metadata_bytes: usize,
    pub min_utxo: u64,
}

/// Shielded ledger settings
pub struct PrivateLedgerConfig {
    pub settings: LedgerSettings,
    pub auth_token: Option<String>,
    pub sealing_key: Option<SecretSource>,
}

impl fmt::Debug for PrivateLedgerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateLedgerConfig")
            .field("settings", &self.settings)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("sealing_key", &self.sealing_key)
            .finish()
    }
}

/// Everything needed to build [`crate::LedgerHandles`]
#[derive(Debug)]
pub struct AnchorConfig {
    /// Bound on every external ledger call
    pub call_timeout: Duration,
    pub min_confirmations: u64,
    /// Most records the in-memory root index keeps
    pub index_capacity: usize,
    pub public: PublicLedgerConfig,
    pub private: PrivateLedgerConfig,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(20),
            min_confirmations: 1,
            index_capacity: DEFAULT_INDEX_CAPACITY,
            public: PublicLedgerConfig {
                settings: LedgerSettings::default(),
                project_id: None,
                address: None,
                wallet_seed: None,
                max_metadata_bytes: DEFAULT_MAX_METADATA_BYTES,
                min_utxo: DEFAULT_MIN_UTXO,
            },
            private: PrivateLedgerConfig {
                settings: LedgerSettings::default(),
                auth_token: None,
                sealing_key: None,
            },
        }
    }
}

impl AnchorConfig {
    /// Create from `TWIN_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);

        Ok(Self {
            call_timeout: Duration::from_secs(vars.parse("TWIN_CALL_TIMEOUT_SECS", 20)?),
            min_confirmations: vars.parse("TWIN_MIN_CONFIRMATIONS", 1)?,
            index_capacity: vars.parse("TWIN_INDEX_MAX_ENTRIES", DEFAULT_INDEX_CAPACITY)?,
            public: PublicLedgerConfig {
                settings: LedgerSettings {
                    mode: vars.parse("TWIN_CARDANO_MODE", LedgerMode::Auto)?,
                    endpoint: vars.get("TWIN_CARDANO_GATEWAY_URL"),
                    fallback: vars.flag("TWIN_CARDANO_FALLBACK")?,
                },
                project_id: vars.get("TWIN_CARDANO_PROJECT_ID"),
                address: vars.get("TWIN_CARDANO_ADDRESS"),
                wallet_seed: vars.secret("TWIN_WALLET_SEED_FILE", "TWIN_WALLET_SEED_HEX"),
                max_metadata_bytes: vars
                    .parse("TWIN_CARDANO_MAX_METADATA_BYTES", DEFAULT_MAX_METADATA_BYTES)?,
                min_utxo: vars.parse("TWIN_CARDANO_MIN_UTXO", DEFAULT_MIN_UTXO)?,
            },
            private: PrivateLedgerConfig {
                settings: LedgerSettings {
                    mode: vars.parse("TWIN_MIDNIGHT_MODE", LedgerMode::Auto)?,
                    endpoint: vars.get("TWIN_MIDNIGHT_NODE_URL"),
                    fallback: vars.flag("TWIN_MIDNIGHT_FALLBACK")?,
                },
                auth_token: vars.get("TWIN_MIDNIGHT_AUTH_TOKEN"),
                sealing_key: vars.secret("TWIN_SEALING_KEY_FILE", "TWIN_SEALING_KEY_HEX"),
            },
        })
    }
}

struct Vars<'a, F>(&'a F);

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Non-empty value
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn flag(&self, key: &str) -> Result<bool, ConfigError> {
        match self.get(key).map(|v| v.trim().to_ascii_lowercase()) {
            None => Ok(false),
            Some(v) if v == "1" || v == "true" || v == "yes" => Ok(true),
            Some(v) if v == "0" || v == "false" || v == "no" => Ok(false),
            Some(v) => Err(ConfigError::Invalid {
                key: key.to_string(),
                message: format!("expected a boolean, got '{}'", v),
            }),
        }
    }

    /// A mounted file wins over an inline hex variable
    fn secret(&self, file_key: &str, hex_key: &str) -> Option<SecretSource> {
        if let Some(path) = self.get(file_key) {
            return Some(SecretSource::File(PathBuf::from(path)));
        }
        self.get(hex_key)
            .map(|_| SecretSource::Env(hex_key.to_string()))
    }
}
