//! Private facet sealing
//!
//! Each private facet preview is encrypted with AES-256-GCM under the
//! operator's sealing key. The associated data binds the ciphertext to its
//! scan and facet type, so a sealed facet cannot be replayed into another
//! anchor. Unsealing requires an authorized [`RevealTicket`].

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use serde::{Deserialize, Serialize};
use std::fmt;
use twin_core::{Facet, RevealTicket};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::error::{ConfigError, SealingError};
use crate::wallet::SecretProvider;

const NONCE_LEN: usize = 12;

/// Encrypted facet as carried in the shielded payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedFacet {
    pub facet_type: String,
    /// 96-bit nonce, hex
    pub nonce: String,
    /// Ciphertext with GCM tag, hex
    pub ciphertext: String,
}

/// Seals and ticket-gated opens private facets
#[derive(Clone)]
pub struct PayloadSealer {
    cipher: Aes256Gcm,
}

impl PayloadSealer {
    pub fn from_key(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
        }
    }

    pub fn from_provider(provider: &dyn SecretProvider) -> Result<Self, ConfigError> {
        let key: Zeroizing<[u8; 32]> = provider.load()?;
        Ok(Self::from_key(&key))
    }

    /// Fresh random key held only in memory.
    ///
    /// Anything sealed with it is unrecoverable once the process exits.
    pub fn ephemeral() -> Self {
        tracing::warn!("No sealing key configured; using an ephemeral key");
        let key = Aes256Gcm::generate_key(&mut OsRng);
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }

    fn aad(scan_id: &Uuid, facet_type: &str) -> String {
        format!("{}:{}", scan_id, facet_type)
    }

    /// Encrypt the canonical JSON of a facet preview
    pub fn seal(&self, scan_id: &Uuid, facet: &Facet) -> Result<SealedFacet, SealingError> {
        let plaintext = Zeroizing::new(
            serde_jcs::to_vec(&facet.payload_preview).map_err(|_| SealingError::Encrypt)?,
        );
        let aad = Self::aad(scan_id, &facet.facet_type);
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: &plaintext,
                    aad: aad.as_bytes(),
                },
            )
            .map_err(|_| SealingError::Encrypt)?;

        Ok(SealedFacet {
            facet_type: facet.facet_type.clone(),
            nonce: hex::encode(nonce),
            ciphertext: hex::encode(ciphertext),
        })
    }

    /// Decrypt a sealed facet anchored in `private_tx_id`.
    ///
    /// Refused unless `ticket` is authorized for that transaction.
    pub fn open(
        &self,
        sealed: &SealedFacet,
        scan_id: &Uuid,
        private_tx_id: &str,
        ticket: &RevealTicket,
    ) -> Result<serde_json::Value, SealingError> {
        if !ticket.authorizes(private_tx_id) {
            tracing::warn!(
                ticket_id = %ticket.ticket_id,
                tx_id = %private_tx_id,
                status = ?ticket.status,
                "Reveal refused"
            );
            return Err(SealingError::NotAuthorized);
        }

        let nonce_bytes = hex::decode(&sealed.nonce).map_err(|_| SealingError::Corrupt)?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(SealingError::Corrupt);
        }
        let ciphertext = hex::decode(&sealed.ciphertext).map_err(|_| SealingError::Corrupt)?;
        let aad = Self::aad(scan_id, &sealed.facet_type);

        let plaintext = Zeroizing::new(
            self.cipher
                .decrypt(
                    Nonce::from_slice(&nonce_bytes),
                    Payload {
                        msg: &ciphertext,
                        aad: aad.as_bytes(),
                    },
                )
                .map_err(|_| SealingError::Corrupt)?,
        );

        tracing::info!(
            ticket_id = %ticket.ticket_id,
            tx_id = %private_tx_id,
            facet_type = %sealed.facet_type,
            "Sealed facet revealed"
        );
        serde_json::from_slice(&plaintext).map_err(|_| SealingError::Corrupt)
    }
}

impl fmt::Debug for PayloadSealer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PayloadSealer([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use twin_core::RevealState;

    fn ticket(tx: &str, status: RevealState) -> RevealTicket {
        RevealTicket {
            ticket_id: Uuid::new_v4(),
            request_id: Uuid::new_v4(),
            private_tx_id: tx.to_string(),
            requester_id: "auditor".to_string(),
            status,
            issued_at: Utc::now(),
        }
    }

    #[test]
    fn test_seal_open_with_authorized_ticket() {
        let sealer = PayloadSealer::from_key(&[9u8; 32]);
        let scan = Uuid::new_v4();
        let preview = json!({"owner": "did:example:alice", "since": 2024});
        let sealed = sealer.seal(&scan, &Facet::new("ownership", preview.clone())).unwrap();

        assert!(!sealed.ciphertext.contains(&hex::encode("alice")));
        assert_eq!(sealed.nonce.len(), NONCE_LEN * 2);

        let tx = "d".repeat(64);
        let opened = sealer
            .open(&sealed, &scan, &tx, &ticket(&tx, RevealState::Authorized))
            .unwrap();
        assert_eq!(opened, preview);
    }

    #[test]
    fn test_open_refused_without_authorization() {
        let sealer = PayloadSealer::from_key(&[9u8; 32]);
        let scan = Uuid::new_v4();
        let sealed = sealer.seal(&scan, &Facet::new("pricing", json!({"eur": 120}))).unwrap();
        let tx = "d".repeat(64);

        assert_eq!(
            sealer.open(&sealed, &scan, &tx, &ticket(&tx, RevealState::Rejected)),
            Err(SealingError::NotAuthorized)
        );
        // Authorized, but for another transaction
        assert_eq!(
            sealer.open(&sealed, &scan, &tx, &ticket(&"e".repeat(64), RevealState::Authorized)),
            Err(SealingError::NotAuthorized)
        );
    }

    #[test]
    fn test_associated_data_binds_scan() {
        let sealer = PayloadSealer::from_key(&[9u8; 32]);
        let sealed = sealer
            .seal(&Uuid::new_v4(), &Facet::new("pricing", json!({"eur": 1})))
            .unwrap();
        let tx = "d".repeat(64);
        assert_eq!(
            sealer.open(&sealed, &Uuid::new_v4(), &tx, &ticket(&tx, RevealState::Authorized)),
            Err(SealingError::Corrupt)
        );
    }

    #[test]
    fn test_nonces_are_fresh() {
        let sealer = PayloadSealer::ephemeral();
        let scan = Uuid::new_v4();
        let facet = Facet::new("pricing", json!({"eur": 1}));
        let a = sealer.seal(&scan, &facet).unwrap();
        let b = sealer.seal(&scan, &facet).unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_wrong_key_is_corrupt() {
        let scan = Uuid::new_v4();
        let sealed = PayloadSealer::from_key(&[1u8; 32])
            .seal(&scan, &Facet::new("ownership", json!({"o": 1})))
            .unwrap();
        let tx = "d".repeat(64);
        assert_eq!(
            PayloadSealer::from_key(&[2u8; 32]).open(
                &sealed,
                &scan,
                &tx,
                &ticket(&tx, RevealState::Authorized)
            ),
            Err(SealingError::Corrupt)
        );
        assert_eq!(format!("{:?}", PayloadSealer::from_key(&[1u8; 32])), "PayloadSealer([REDACTED])");
    }
}
