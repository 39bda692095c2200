//! Wallet key loading and transaction signing
//!
//! Key material enters the process only through a [`SecretProvider`]. Seeds
//! are held in [`Zeroizing`] buffers and every type here redacts its key in
//! `Debug`.

use ed25519_dalek::{Signer, SigningKey};
use std::fmt;
use std::path::PathBuf;
use zeroize::Zeroizing;

use crate::chain::VkeyWitness;
use crate::error::ConfigError;

/// Source of a 32-byte secret
pub trait SecretProvider: Send + Sync + fmt::Debug {
    /// Where the secret comes from, safe to log
    fn source_name(&self) -> String;

    /// Load and decode the secret
    fn load(&self) -> Result<Zeroizing<[u8; 32]>, ConfigError>;
}

/// Secret read from an environment variable or a mounted file, hex encoded
pub enum SecretSource {
    Env(String),
    File(PathBuf),
    Bytes(Zeroizing<[u8; 32]>),
}

impl SecretSource {
    fn fail(&self, reason: impl Into<String>) -> ConfigError {
        ConfigError::Secret {
            source_name: self.source_name(),
            reason: reason.into(),
        }
    }

    fn decode(&self, text: &str) -> Result<Zeroizing<[u8; 32]>, ConfigError> {
        let mut out = Zeroizing::new([0u8; 32]);
        hex::decode_to_slice(text.trim(), &mut out[..])
            .map_err(|_| self.fail("expected 64 hex characters"))?;
        Ok(out)
    }
}

impl fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretSource::Env(var) => f.debug_tuple("Env").field(var).finish(),
            SecretSource::File(path) => f.debug_tuple("File").field(path).finish(),
            SecretSource::Bytes(_) => f.write_str("Bytes([REDACTED])"),
        }
    }
}

impl SecretProvider for SecretSource {
    fn source_name(&self) -> String {
        match self {
            SecretSource::Env(var) => format!("env:{}", var),
            SecretSource::File(path) => format!("file:{}", path.display()),
            SecretSource::Bytes(_) => "inline".to_string(),
        }
    }

    fn load(&self) -> Result<Zeroizing<[u8; 32]>, ConfigError> {
        match self {
            SecretSource::Env(var) => {
                let text = Zeroizing::new(std::env::var(var).map_err(|_| self.fail("not set"))?);
                self.decode(&text)
            }
            SecretSource::File(path) => {
                let text = Zeroizing::new(
                    std::fs::read_to_string(path).map_err(|e| self.fail(e.kind().to_string()))?,
                );
                self.decode(&text)
            }
            SecretSource::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

/// Single-address signing wallet
pub struct Wallet {
    address: String,
    key: SigningKey,
}

impl Wallet {
    pub fn from_seed(address: impl Into<String>, seed: &[u8; 32]) -> Self {
        Self {
            address: address.into(),
            key: SigningKey::from_bytes(seed),
        }
    }

    pub fn from_provider(
        address: impl Into<String>,
        provider: &dyn SecretProvider,
    ) -> Result<Self, ConfigError> {
        let seed = provider.load()?;
        Ok(Self::from_seed(address, &seed))
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Hex-encoded verification key
    pub fn vkey_hex(&self) -> String {
        hex::encode(self.key.verifying_key().to_bytes())
    }

    /// Witness the given body hash
    pub fn sign(&self, body_hash: &[u8]) -> VkeyWitness {
        let signature = self.key.sign(body_hash);
        VkeyWitness {
            vkey: self.vkey_hex(),
            signature: hex::encode(signature.to_bytes()),
        }
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("vkey", &self.vkey_hex())
            .field("key", &"[REDACTED]")
            .finish()
    }
}
