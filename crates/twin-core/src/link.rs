//! Cross-ledger linking
//!
//! The cross-ledger root binds one public anchor and one private anchor to the
//! scan event that produced them:
//!
//! ```text
//! root = hex(SHA-256("{public_tx_id}:{private_tx_id}:{scan_id}"))
//! ```
//!
//! The scan id is rendered in lowercase hyphenated form.

use uuid::Uuid;

use crate::digest::Sha256Hash;

/// Compute the cross-ledger root for an anchored scan.
pub fn link(public_tx_id: &str, private_tx_id: &str, scan_id: &Uuid) -> Sha256Hash {
    let preimage = format!("{}:{}:{}", public_tx_id, private_tx_id, scan_id.hyphenated());
    Sha256Hash::digest(preimage.as_bytes())
}

/// Hex form of [`link`]
pub fn link_hex(public_tx_id: &str, private_tx_id: &str, scan_id: &Uuid) -> String {
    link(public_tx_id, private_tx_id, scan_id).to_hex()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sha2::{Digest, Sha256};

    #[test]
    fn test_matches_reference_preimage() {
        let scan = Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap();
        let public = "a".repeat(64);
        let private = "b".repeat(64);

        let expected = hex::encode(Sha256::digest(
            format!("{}:{}:11111111-1111-1111-1111-111111111111", public, private).as_bytes(),
        ));
        assert_eq!(link_hex(&public, &private, &scan), expected);
        assert_eq!(link_hex(&public, &private, &scan).len(), 64);
    }

    #[test]
    fn test_argument_order_matters() {
        let scan = Uuid::new_v4();
        assert_ne!(link("aa", "bb", &scan), link("bb", "aa", &scan));
    }

    proptest! {
        #[test]
        fn prop_link_is_deterministic(a in "[0-9a-f]{64}", b in "[0-9a-f]{64}", s in any::<u128>()) {
            let scan = Uuid::from_u128(s);
            prop_assert_eq!(link(&a, &b, &scan), link(&a, &b, &scan));
        }

        #[test]
        fn prop_changing_any_input_changes_root(
            a in "[0-9a-f]{64}",
            b in "[0-9a-f]{64}",
            other in "[0-9a-f]{64}",
            s in any::<u128>(),
            t in any::<u128>(),
        ) {
            let scan = Uuid::from_u128(s);
            let root = link(&a, &b, &scan);
            if other != a {
                prop_assert_ne!(root, link(&other, &b, &scan));
            }
            if other != b {
                prop_assert_ne!(root, link(&a, &other, &scan));
            }
            if t != s {
                prop_assert_ne!(root, link(&a, &b, &Uuid::from_u128(t)));
            }
        }
    }
}
