//! Link command - offline cross-ledger root computation
//!
//! ```bash
//! twin link --public <tx> --private <tx> --scan 11111111-1111-1111-1111-111111111111
//! ```

use anyhow::{Context, Result};
use clap::Args;
use twin_core::{link_hex, TxId};
use uuid::Uuid;

/// Arguments for the link command
#[derive(Args)]
pub struct LinkArgs {
    /// Public ledger transaction id
    #[arg(long = "public", value_name = "TX")]
    public_tx_id: String,

    /// Shielded ledger transaction id
    #[arg(long = "private", value_name = "TX")]
    private_tx_id: String,

    /// Scan id the anchors belong to
    #[arg(long = "scan", value_name = "UUID")]
    scan_id: Uuid,
}

pub fn run(args: LinkArgs) -> Result<()> {
    println!("{}", compute(&args)?);
    Ok(())
}

fn compute(args: &LinkArgs) -> Result<String> {
    let public = TxId::parse(args.public_tx_id.trim()).context("Invalid --public transaction id")?;
    let private =
        TxId::parse(args.private_tx_id.trim()).context("Invalid --private transaction id")?;
    Ok(link_hex(public.as_str(), private.as_str(), &args.scan_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(public: &str, private: &str) -> LinkArgs {
        LinkArgs {
            public_tx_id: public.to_string(),
            private_tx_id: private.to_string(),
            scan_id: Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap(),
        }
    }

    #[test]
    fn test_link_matches_core() {
        let (p, q) = ("a".repeat(64), "b".repeat(64));
        let root = compute(&args(&p, &q)).unwrap();
        assert_eq!(root, link_hex(&p, &q, &args(&p, &q).scan_id));
        assert_eq!(root.len(), 64);
    }

    #[test]
    fn test_link_is_order_sensitive() {
        let (p, q) = ("a".repeat(64), "b".repeat(64));
        assert_ne!(compute(&args(&p, &q)).unwrap(), compute(&args(&q, &p)).unwrap());
    }

    #[test]
    fn test_link_rejects_malformed_ids() {
        assert!(compute(&args("abc", &"b".repeat(64))).is_err());
    }
}
